use chrono::{DateTime, Utc};

use super::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "notification_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
	RequestReceived,
	RequestAccepted,
	RequestRejected,
	RequestExpired,
	ProofPosted,
	ExchangeCompleted,
	ExchangeExpired,
	ExpiringSoon,
	StrikeAdded,
	StrikeWarning,
	AccountBanned,
	LowRating,
	PaymentCompleted,
	PaymentFailed,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Notification {
	pub id: Ulid,
	pub user_id: Ulid,
	pub kind: NotificationKind,
	pub title: String,
	pub message: String,
	/// The other user involved, if any.
	pub related_user_id: Option<Ulid>,
	/// The request, exchange or payment the notification is about.
	pub related_id: Option<Ulid>,
	pub read: bool,
	pub created_at: DateTime<Utc>,
}
