use chrono::{DateTime, Utc};

use super::load_active_user;
use crate::database::{MediaItem, MediaKind, Ulid, MAX_MEDIA_ITEMS, MIN_MEDIA_ITEMS};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;
use crate::store::MediaDeletion;

pub async fn list(global: &GlobalState, user_id: Ulid) -> Result<Vec<MediaItem>> {
	Ok(global.store().media_for_user(user_id).await?)
}

pub async fn upload(global: &GlobalState, user_id: Ulid, url: String, kind: MediaKind, now: DateTime<Utc>) -> Result<MediaItem> {
	let owner = load_active_user(global, user_id).await?;
	let held = global.store().media_for_user(user_id).await?.len();

	let item = MediaItem::upload(&owner, url, kind, held, now)?;

	if !global.store().insert_media(&item, MAX_MEDIA_ITEMS).await? {
		return Err(crate::lifecycle::media_limit());
	}

	tracing::debug!(%user_id, media_id = %item.id, kind = ?item.kind, "media uploaded");

	Ok(item)
}

pub async fn delete(global: &GlobalState, user_id: Ulid, media_id: Ulid) -> Result<()> {
	load_active_user(global, user_id).await?;

	let item = global
		.store()
		.media_by_id(media_id)
		.await?
		.ok_or(ExchangeError::MediaNotFound)?;

	let held = global.store().media_for_user(user_id).await?.len();
	item.ensure_removable(user_id, held)?;

	match global.store().delete_media(media_id, user_id, MIN_MEDIA_ITEMS).await? {
		MediaDeletion::Deleted => {
			tracing::debug!(%user_id, %media_id, "media deleted");
			Ok(())
		}
		MediaDeletion::NotFound => Err(ExchangeError::MediaNotFound),
		MediaDeletion::LastItem => Err(crate::lifecycle::media_limit()),
	}
}
