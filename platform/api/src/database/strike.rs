use chrono::{DateTime, Utc};

use super::Ulid;

/// Strikes at which an account is banned.
pub const MAX_STRIKES: i32 = 3;

/// A ledger entry for a missed exchange.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Strike {
	pub id: Ulid,
	pub user_id: Ulid,
	pub exchange_id: Option<Ulid>,
	pub reason: String,
	/// The user's strike count after this strike.
	pub strike_number: i32,
	pub created_at: DateTime<Utc>,
}
