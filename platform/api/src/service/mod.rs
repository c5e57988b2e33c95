//! Operations that combine the lifecycle with the store.
//!
//! Each operation loads what it needs, runs the pure transition, persists it
//! with the matching compare-and-set and fans out notifications. Anything
//! overdue that an operation touches is settled first.

use crate::database::{Ulid, User};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;

pub mod exchanges;
pub mod media;
pub mod notifications;
pub mod payments;
pub mod requests;
pub mod users;

pub(crate) async fn load_user(global: &GlobalState, id: Ulid) -> Result<User> {
	global.store().user_by_id(id).await?.ok_or(ExchangeError::UserNotFound)
}

/// Loads the user and refuses banned accounts.
pub(crate) async fn load_active_user(global: &GlobalState, id: Ulid) -> Result<User> {
	let user = load_user(global, id).await?;
	user.ensure_active()?;
	Ok(user)
}
