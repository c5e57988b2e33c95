use chrono::{DateTime, Utc};

use super::{MediaKind, Ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "exchange_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeStatus {
	Pending,
	Completed,
	Expired,
}

/// One participant of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "exchange_side", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
	/// The user who sent the request.
	Requester,
	/// The user who accepted it.
	Acceptor,
}

/// The paired obligation created by accepting a request: both users must post
/// proof of their shoutout before `expires_at`.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Exchange {
	pub id: Ulid,
	pub request_id: Ulid,
	pub requester_id: Ulid,
	pub acceptor_id: Ulid,
	/// What the acceptor reposts for the requester.
	pub requester_media_id: Ulid,
	pub media_kind: MediaKind,
	/// What the requester reposts for the acceptor.
	pub acceptor_media_id: Ulid,
	pub acceptor_media_kind: MediaKind,
	pub requester_posted: bool,
	pub requester_posted_at: Option<DateTime<Utc>>,
	pub requester_proof_url: Option<String>,
	pub acceptor_posted: bool,
	pub acceptor_posted_at: Option<DateTime<Utc>>,
	pub acceptor_proof_url: Option<String>,
	pub status: ExchangeStatus,
	pub accepted_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	/// When the exchange moved to a terminal state.
	pub settled_at: Option<DateTime<Utc>>,
	/// Whether the expiring soon reminder went out.
	#[serde(skip)]
	pub reminded: bool,
}
