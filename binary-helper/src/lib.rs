use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use common::context::Context;
use common::{logging, signal};
use tokio::signal::unix::SignalKind;
use tokio::{select, time};
pub use traits::{Config, Global};

pub mod traits;

const FORCE_SHUTDOWN_AFTER: Duration = Duration::from_secs(60);

/// Parses the config, sets up logging and runs `process` until it exits or
/// the process is asked to stop.
///
/// A second interrupt while draining forces the shutdown.
pub async fn bootstrap<C, G, F>(process: impl FnOnce(Arc<G>) -> F) -> anyhow::Result<()>
where
	C: Config,
	G: Global<C> + Send + Sync + 'static,
	F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
	let (ctx, handler) = Context::new();

	let config = match C::parse().and_then(|mut config| {
		config.pre_hook()?;
		Ok(config)
	}) {
		Ok(config) => config,
		Err(err) => {
			// Make sure the failure is visible even though the configured level is unknown.
			logging::init("info", Default::default()).context("failed to init logging")?;
			tracing::error!(error = %format!("{err:#}"), "failed to parse config");
			return Err(err.context("failed to parse config"));
		}
	};

	logging::init(&config.logging().level, config.logging().mode).context("failed to init logging")?;

	tracing::info!(name = config.name(), "starting up");

	let global = Arc::new(G::new(ctx, config).await.context("failed to create global state")?);

	tracing::debug!("global state created, starting process");

	let process_future = tokio::spawn(process(global));

	let mut signal_handler = signal::SignalHandler::new()
		.with_signal(SignalKind::interrupt())
		.and_then(|handler| handler.with_signal(SignalKind::terminate()))
		.context("failed to install signal handlers")?;

	let result = select! {
		_ = signal_handler.recv() => {
			tracing::info!("shutting down");
			Ok(())
		}
		r = process_future => match r {
			Ok(Ok(())) => {
				tracing::warn!("process exited");
				Ok(())
			}
			Ok(Err(err)) => {
				tracing::error!(error = %format!("{err:#}"), "process stopped unexpectedly");
				Err(err)
			}
			Err(err) => {
				tracing::error!(error = %err, "process panicked");
				Err(err.into())
			}
		},
	};

	tracing::info!("waiting for tasks to finish");

	select! {
		_ = time::sleep(FORCE_SHUTDOWN_AFTER) => tracing::warn!("force shutting down"),
		_ = signal_handler.recv() => tracing::warn!("force shutting down"),
		_ = handler.cancel() => tracing::info!("shutdown complete"),
	}

	result
}
