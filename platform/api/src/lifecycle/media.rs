use chrono::{DateTime, Utc};

use super::validate_url;
use crate::database::{MediaItem, MediaKind, Ulid, User, MAX_MEDIA_ITEMS, MIN_MEDIA_ITEMS};
use crate::error::{ExchangeError, Result};

impl MediaItem {
	/// Builds a new item for `owner`, who currently holds `held` items.
	pub fn upload(owner: &User, url: String, kind: MediaKind, held: usize, now: DateTime<Utc>) -> Result<Self> {
		owner.ensure_active()?;
		validate_url(&url)?;

		let plan = owner.effective_plan(now);
		if !plan.allows(kind) {
			return Err(ExchangeError::MediaNotAllowed { plan, kind });
		}

		if held >= MAX_MEDIA_ITEMS {
			return Err(media_limit());
		}

		Ok(Self {
			id: Ulid::new(),
			user_id: owner.id,
			url,
			kind,
			created_at: now,
		})
	}

	/// Checks that `actor` may remove this item while holding `held` items.
	pub fn ensure_removable(&self, actor: Ulid, held: usize) -> Result<()> {
		if self.user_id != actor {
			return Err(ExchangeError::NotOwner);
		}

		if held <= MIN_MEDIA_ITEMS {
			return Err(media_limit());
		}

		Ok(())
	}
}

pub(crate) fn media_limit() -> ExchangeError {
	ExchangeError::MediaLimit {
		min: MIN_MEDIA_ITEMS,
		max: MAX_MEDIA_ITEMS,
	}
}
