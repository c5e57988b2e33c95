use std::sync::Arc;

use common::context::Context;

use crate::config::AppConfig;
use crate::store::Store;

pub struct GlobalState {
	config: AppConfig,
	ctx: Context,
	store: Arc<dyn Store>,
}

impl GlobalState {
	pub fn from_parts(config: AppConfig, ctx: Context, store: Arc<dyn Store>) -> Self {
		Self { config, ctx, store }
	}

	pub fn config(&self) -> &AppConfig {
		&self.config
	}

	pub fn ctx(&self) -> &Context {
		&self.ctx
	}

	pub fn store(&self) -> &dyn Store {
		self.store.as_ref()
	}
}

impl binary_helper::Global<AppConfig> for GlobalState {
	async fn new(ctx: Context, config: AppConfig) -> anyhow::Result<Self> {
		let store = crate::store::connect(&config.database).await?;

		Ok(Self::from_parts(config, ctx, store))
	}
}
