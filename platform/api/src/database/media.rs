use chrono::{DateTime, Utc};

use super::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "media_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaKind {
	Story,
	Post,
	Reel,
}

impl MediaKind {
	pub const ALL: [MediaKind; 3] = [MediaKind::Story, MediaKind::Post, MediaKind::Reel];
}

/// Minimum media items a user keeps once onboarded.
pub const MIN_MEDIA_ITEMS: usize = 1;
/// Maximum media items a user may hold.
pub const MAX_MEDIA_ITEMS: usize = 3;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct MediaItem {
	pub id: Ulid,
	pub user_id: Ulid,
	/// Where the content is hosted.
	pub url: String,
	pub kind: MediaKind,
	pub created_at: DateTime<Utc>,
}
