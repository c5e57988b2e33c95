use chrono::{DateTime, Utc};

use crate::database::{User, MAX_STRIKES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeOutcome {
	/// The strike count after this strike.
	pub strike_number: i32,
	/// Whether this strike banned the account.
	pub banned: bool,
}

impl User {
	/// Records one strike. Returns `None` once the count is saturated, the
	/// account is already banned at that point.
	pub fn add_strike(&mut self, now: DateTime<Utc>) -> Option<StrikeOutcome> {
		if self.strike_count >= MAX_STRIKES {
			return None;
		}

		self.strike_count += 1;
		self.updated_at = now;

		let banned = self.strike_count >= MAX_STRIKES && !self.banned;
		if banned {
			self.ban(now);
		}

		Some(StrikeOutcome {
			strike_number: self.strike_count,
			banned,
		})
	}

	pub fn ban(&mut self, now: DateTime<Utc>) {
		self.banned = true;
		self.banned_at.get_or_insert(now);
		self.updated_at = now;
	}
}
