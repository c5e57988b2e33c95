use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, NaiveDate, Utc};

use super::{Plan, Ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
	Creator,
	Influencer,
	Brand,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	/// The unique identifier for the user.
	pub id: Ulid,
	/// The username of the user.
	pub username: String,
	/// The id of the user's account at the social identity provider.
	pub social_id: String,
	/// The hashed password of the user. (argon2)
	pub password_hash: String,
	/// Audience size as reported at registration.
	pub follower_count: i64,
	pub account_type: AccountType,
	/// The plan the user paid for. See `effective_plan` for the plan in force.
	pub plan: Plan,
	/// When a paid plan lapses back to basic.
	pub plan_expires_at: Option<DateTime<Utc>>,
	/// Sum of all stars received.
	pub rating_sum: i64,
	/// Number of ratings received.
	pub rating_count: i64,
	/// Between 0 and 3.
	pub strike_count: i32,
	pub banned: bool,
	pub banned_at: Option<DateTime<Utc>>,
	/// Requests sent on `counter_day`.
	pub requests_sent_today: i32,
	/// Requests accepted on `counter_day`.
	pub requests_accepted_today: i32,
	/// The UTC day the daily counters belong to.
	pub counter_day: NaiveDate,
	/// The time the user was created.
	pub created_at: DateTime<Utc>,
	/// The time the user was last updated.
	pub updated_at: DateTime<Utc>,
}

impl User {
	/// Average stars received, 0 when nobody has rated the user yet.
	pub fn rating(&self) -> f64 {
		if self.rating_count == 0 {
			return 0.0;
		}

		self.rating_sum as f64 / self.rating_count as f64
	}

	/// Uses argon2 to verify the password hash against the provided password.
	pub fn verify_password(&self, password: &str) -> bool {
		let hash = match PasswordHash::new(&self.password_hash) {
			Ok(hash) => hash,
			Err(err) => {
				tracing::error!(user_id = %self.id, error = %err, "failed to parse password hash");
				return false;
			}
		};

		Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
	}

	/// Generates a new password hash using argon2.
	pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
		let salt = SaltString::generate(&mut OsRng);

		Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
	}

	pub fn validate_username(username: &str) -> Result<(), &'static str> {
		if username.len() < 3 {
			return Err("Username must be at least 3 characters long");
		}

		if username.len() > 20 {
			return Err("Username must be at most 20 characters long");
		}

		if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
			return Err("Username must only contain alphanumeric characters and underscores");
		}

		Ok(())
	}

	pub fn validate_password(password: &str) -> Result<(), &'static str> {
		if password.len() < 8 {
			return Err("Password must be at least 8 characters long");
		}

		if password.len() > 100 {
			return Err("Password must be at most 100 characters long");
		}

		Ok(())
	}
}

/// A social identity that may never register again.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BannedIdentity {
	pub social_id: String,
	pub user_id: Ulid,
	pub banned_at: DateTime<Utc>,
}
