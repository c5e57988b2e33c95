use chrono::{DateTime, Utc};

use super::load_user;
use crate::database::{Session, Strike, Ulid, User};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;
use crate::lifecycle::NewUser;
use crate::store::StoreError;

pub async fn register(global: &GlobalState, input: NewUser, now: DateTime<Utc>) -> Result<User> {
	if global.store().is_identity_banned(input.social_id.trim()).await? {
		tracing::info!(username = %input.username, "registration refused for banned identity");
		return Err(ExchangeError::IdentityBanned);
	}

	let user = User::register(input, now)?;

	match global.store().insert_user(&user).await {
		Ok(()) => {}
		Err(StoreError::Duplicate(_)) => {
			return Err(ExchangeError::Conflict("username or social identity is already registered"));
		}
		Err(err) => return Err(err.into()),
	}

	tracing::info!(user_id = %user.id, username = %user.username, "user registered");

	Ok(user)
}

/// Checks the credentials and opens a new session.
pub async fn login(global: &GlobalState, username: &str, password: &str, now: DateTime<Utc>) -> Result<(User, Session)> {
	let user = global
		.store()
		.user_by_username(username)
		.await?
		.ok_or(ExchangeError::InvalidCredentials)?;

	if !user.verify_password(password) {
		return Err(ExchangeError::InvalidCredentials);
	}

	user.ensure_active()?;

	let session = Session {
		id: Ulid::new(),
		user_id: user.id,
		expires_at: now + global.config().jwt.session_ttl(),
		last_used_at: now,
		invalidated_at: None,
	};

	global.store().insert_session(&session).await?;

	tracing::debug!(user_id = %user.id, session_id = %session.id, "session opened");

	Ok((user, session))
}

pub async fn logout(global: &GlobalState, session_id: Ulid, now: DateTime<Utc>) -> Result<()> {
	global.store().invalidate_session(session_id, now).await?;
	Ok(())
}

/// Resolves a session id taken from a token. `None` when the session is unknown, expired or logged out.
pub async fn authenticate(global: &GlobalState, session_id: Ulid, now: DateTime<Utc>) -> Result<Option<Session>> {
	let Some(session) = global.store().session_by_id(session_id).await? else {
		return Ok(None);
	};

	if !session.is_valid(now) {
		return Ok(None);
	}

	global.store().touch_session(session.id, now).await?;

	Ok(Some(session))
}

pub async fn profile(global: &GlobalState, user_id: Ulid) -> Result<User> {
	load_user(global, user_id).await
}

pub async fn strikes(global: &GlobalState, user_id: Ulid) -> Result<Vec<Strike>> {
	Ok(global.store().strikes_for_user(user_id).await?)
}
