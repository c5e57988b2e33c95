use chrono::{DateTime, Utc};

use super::Ulid;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Rating {
	pub id: Ulid,
	pub exchange_id: Ulid,
	pub rater_id: Ulid,
	pub rated_id: Ulid,
	/// 1 to 5.
	pub stars: i32,
	pub comment: Option<String>,
	pub created_at: DateTime<Utc>,
}
