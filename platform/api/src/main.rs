use anyhow::Context as _;
use tokio::select;

use crate::config::AppConfig;
use crate::global::GlobalState;

mod api;
mod config;
mod database;
mod error;
mod global;
mod lifecycle;
mod service;
mod store;
mod sweeper;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() {
	if let Err(err) = binary_helper::bootstrap::<AppConfig, GlobalState, _>(|global| async move {
		let api_future = tokio::spawn(api::run(global.clone()));
		let sweeper_future = tokio::spawn(sweeper::run(global.clone()));

		drop(global);

		select! {
			r = api_future => r.context("api server panicked")?.context("api server stopped")?,
			r = sweeper_future => r.context("sweeper panicked")?.context("sweeper stopped")?,
		}

		Ok(())
	})
	.await
	{
		tracing::error!(error = %format!("{err:#}"), "exiting");
		std::process::exit(1);
	}
}
