use chrono::{DateTime, Utc};

use super::validate_text;
use crate::database::{Exchange, ExchangeStatus, Rating, Ulid, User};
use crate::error::{ExchangeError, Result};

/// Ratings at or below this score notify the rated user.
pub const LOW_RATING: i32 = 2;

impl Rating {
	/// `rater` rates their counterpart on a completed exchange.
	pub fn submit(exchange: &Exchange, rater: Ulid, stars: i32, comment: Option<String>, now: DateTime<Utc>) -> Result<Self> {
		let side = exchange.side_of(rater).ok_or(ExchangeError::NotParticipant)?;

		if exchange.status != ExchangeStatus::Completed {
			return Err(ExchangeError::ExchangeNotCompleted);
		}

		if !(1..=5).contains(&stars) {
			return Err(ExchangeError::validation("Rating must be between 1 and 5 stars"));
		}

		Ok(Self {
			id: Ulid::new(),
			exchange_id: exchange.id,
			rater_id: rater,
			rated_id: exchange.counterpart(side),
			stars,
			comment: validate_text(comment, "Comment")?,
			created_at: now,
		})
	}

	pub fn is_low(&self) -> bool {
		self.stars <= LOW_RATING
	}
}

impl User {
	pub fn apply_rating(&mut self, stars: i32, now: DateTime<Utc>) {
		self.rating_sum += i64::from(stars);
		self.rating_count += 1;
		self.updated_at = now;
	}
}
