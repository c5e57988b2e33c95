use chrono::{DateTime, Utc};

use crate::database::{AccountType, Plan, Ulid, User};
use crate::error::{ExchangeError, Result};

const MAX_SOCIAL_ID_LEN: usize = 128;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewUser {
	pub username: String,
	pub password: String,
	pub social_id: String,
	#[serde(default)]
	pub follower_count: i64,
	pub account_type: AccountType,
}

impl User {
	/// Validates a registration and builds the new basic account.
	pub fn register(input: NewUser, now: DateTime<Utc>) -> Result<Self> {
		User::validate_username(&input.username).map_err(ExchangeError::validation)?;
		User::validate_password(&input.password).map_err(ExchangeError::validation)?;

		let social_id = input.social_id.trim();
		if social_id.is_empty() || social_id.len() > MAX_SOCIAL_ID_LEN {
			return Err(ExchangeError::validation("Social identity is not valid"));
		}

		if input.follower_count < 0 {
			return Err(ExchangeError::validation("Follower count cannot be negative"));
		}

		let password_hash = User::hash_password(&input.password).map_err(ExchangeError::PasswordHash)?;

		Ok(Self {
			id: Ulid::new(),
			username: input.username,
			social_id: social_id.to_string(),
			password_hash,
			follower_count: input.follower_count,
			account_type: input.account_type,
			plan: Plan::Basic,
			plan_expires_at: None,
			rating_sum: 0,
			rating_count: 0,
			strike_count: 0,
			banned: false,
			banned_at: None,
			requests_sent_today: 0,
			requests_accepted_today: 0,
			counter_day: now.date_naive(),
			created_at: now,
			updated_at: now,
		})
	}

	pub fn ensure_active(&self) -> Result<()> {
		match self.banned {
			true => Err(ExchangeError::AccountSuspended),
			false => Ok(()),
		}
	}
}
