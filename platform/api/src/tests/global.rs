use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use common::context::{Context, Handler};
use common::logging;

use crate::config::AppConfig;
use crate::database::{AccountType, MediaItem, MediaKind, NotificationKind, User};
use crate::global::GlobalState;
use crate::lifecycle::NewUser;
use crate::service;
use crate::store::MemoryStore;

pub async fn mock_global_state(config: AppConfig) -> (Arc<GlobalState>, Handler) {
	let (ctx, handler) = Context::new();

	logging::init(&config.logging.level, config.logging.mode).expect("failed to initialize logging");

	let global = Arc::new(GlobalState::from_parts(config, ctx, Arc::new(MemoryStore::default())));

	(global, handler)
}

pub fn epoch() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Registers `name` and gives them one story so they can send requests.
pub async fn onboard(global: &GlobalState, name: &str, now: DateTime<Utc>) -> (User, MediaItem) {
	let user = service::users::register(
		global,
		NewUser {
			username: name.to_string(),
			password: "correct-horse".to_string(),
			social_id: format!("ig:{name}"),
			follower_count: 5000,
			account_type: AccountType::Creator,
		},
		now,
	)
	.await
	.expect("failed to register user");

	let item = service::media::upload(
		global,
		user.id,
		format!("https://cdn.example.com/{name}/story.jpg"),
		MediaKind::Story,
		now,
	)
	.await
	.expect("failed to upload media");

	(user, item)
}

pub async fn notification_kinds(global: &GlobalState, user: &User) -> Vec<NotificationKind> {
	service::notifications::list(global, user.id, false, None)
		.await
		.expect("failed to list notifications")
		.into_iter()
		.map(|n| n.kind)
		.collect()
}
