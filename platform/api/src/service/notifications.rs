use chrono::{DateTime, Utc};

use crate::database::{Notification, NotificationKind, Ulid};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// A notification about to be delivered.
#[derive(Debug, Clone)]
pub struct Notice {
	kind: NotificationKind,
	title: String,
	message: String,
	related_user_id: Option<Ulid>,
	related_id: Option<Ulid>,
}

impl Notice {
	pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			kind,
			title: title.into(),
			message: message.into(),
			related_user_id: None,
			related_id: None,
		}
	}

	pub fn from_user(mut self, user_id: Ulid) -> Self {
		self.related_user_id = Some(user_id);
		self
	}

	pub fn about(mut self, id: Ulid) -> Self {
		self.related_id = Some(id);
		self
	}
}

/// Delivers `notice` to `user_id`.
///
/// Notifications are a side effect of the transition that caused them, a
/// failure to store one is logged and does not fail the caller.
pub async fn notify(global: &GlobalState, user_id: Ulid, notice: Notice, now: DateTime<Utc>) {
	let notification = Notification {
		id: Ulid::new(),
		user_id,
		kind: notice.kind,
		title: notice.title,
		message: notice.message,
		related_user_id: notice.related_user_id,
		related_id: notice.related_id,
		read: false,
		created_at: now,
	};

	if let Err(err) = global.store().insert_notification(&notification).await {
		tracing::warn!(%user_id, kind = ?notification.kind, error = %err, "failed to store notification");
	}
}

pub async fn list(global: &GlobalState, user_id: Ulid, unread_only: bool, limit: Option<i64>) -> Result<Vec<Notification>> {
	let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
	Ok(global.store().notifications_for_user(user_id, unread_only, limit).await?)
}

pub async fn unread_count(global: &GlobalState, user_id: Ulid) -> Result<i64> {
	Ok(global.store().unread_count(user_id).await?)
}

pub async fn mark_read(global: &GlobalState, user_id: Ulid, id: Ulid) -> Result<()> {
	match global.store().mark_notification_read(id, user_id).await? {
		true => Ok(()),
		false => Err(ExchangeError::NotificationNotFound),
	}
}

pub async fn mark_all_read(global: &GlobalState, user_id: Ulid) -> Result<u64> {
	Ok(global.store().mark_all_read(user_id).await?)
}
