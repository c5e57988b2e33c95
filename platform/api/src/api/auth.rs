use common::http::RouteError;
use hyper::{Body, Request, StatusCode};
use routerify::prelude::RequestExt as _;

use super::error::{ApiError, Result};
use crate::database::{Session, Ulid};

#[derive(thiserror::Error, Debug, Clone)]
pub enum AuthError {
	#[error("token must be ascii only")]
	HeaderToStr,
	#[error("token must be a bearer token")]
	NotBearerToken,
	/// The user is not logged in
	#[error("not logged in")]
	NotLoggedIn,
	#[error("invalid token")]
	InvalidToken,
	#[error("session expired")]
	SessionExpired,
}

impl From<AuthError> for RouteError<ApiError> {
	#[track_caller]
	fn from(value: AuthError) -> Self {
		RouteError::new(StatusCode::UNAUTHORIZED, "unauthorized", value.to_string()).with_source(Some(ApiError::Auth(value)))
	}
}

/// The authenticated caller, stored in the request context by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthData {
	pub session: Session,
}

impl AuthData {
	pub fn user_id(&self) -> Ulid {
		self.session.user_id
	}
}

pub trait RequestAuthExt {
	/// The caller, or 401 when the request carries no valid token.
	fn auth(&self) -> Result<AuthData>;
}

impl RequestAuthExt for Request<Body> {
	fn auth(&self) -> Result<AuthData> {
		self.context::<AuthData>().ok_or_else(|| AuthError::NotLoggedIn.into())
	}
}
