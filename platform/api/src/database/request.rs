use chrono::{DateTime, Utc};

use super::{MediaKind, Ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
	Pending,
	Accepted,
	Completed,
	Expired,
	Rejected,
}

/// A proposal from one creator to another to swap shoutouts.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ShoutoutRequest {
	pub id: Ulid,
	pub sender_id: Ulid,
	pub receiver_id: Ulid,
	/// The sender's media item the receiver is asked to repost.
	pub media_id: Ulid,
	pub media_kind: MediaKind,
	pub message: Option<String>,
	pub status: RequestStatus,
	pub created_at: DateTime<Utc>,
	/// An unanswered request expires at this time.
	pub expires_at: DateTime<Utc>,
	pub responded_at: Option<DateTime<Utc>>,
	/// Set once the request is accepted.
	pub exchange_id: Option<Ulid>,
}
