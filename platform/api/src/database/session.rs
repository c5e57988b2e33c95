use chrono::{DateTime, Utc};

use super::Ulid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
	/// The unique identifier for the session.
	pub id: Ulid,
	/// Foreign key to the user table.
	pub user_id: Ulid,
	/// The time the session expires.
	pub expires_at: DateTime<Utc>,
	/// The time the session was last used.
	pub last_used_at: DateTime<Utc>,
	/// Set on logout.
	pub invalidated_at: Option<DateTime<Utc>>,
}

impl Session {
	pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
		self.invalidated_at.is_none() && self.expires_at > now
	}
}
