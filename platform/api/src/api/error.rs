use common::http::RouteError;
use hyper::StatusCode;

use super::auth::AuthError;
use crate::error::ExchangeError;

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("failed to read http body: {0}")]
	ParseHttpBody(#[from] hyper::Error),
	#[error("failed to parse json body: {0}")]
	ParseJson(#[from] serde_json::Error),
	#[error("auth: {0}")]
	Auth(#[from] AuthError),
	#[error("{0}")]
	Exchange(#[from] ExchangeError),
}

/// Status and machine readable code for a lifecycle error.
fn classify(err: &ExchangeError) -> (StatusCode, &'static str) {
	match err {
		ExchangeError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
		ExchangeError::MediaNotAllowed { .. } => (StatusCode::FORBIDDEN, "media_not_allowed"),
		ExchangeError::RequestNotFound
		| ExchangeError::ExchangeNotFound
		| ExchangeError::UserNotFound
		| ExchangeError::MediaNotFound
		| ExchangeError::NotificationNotFound
		| ExchangeError::PaymentNotFound => (StatusCode::NOT_FOUND, "not_found"),
		ExchangeError::NotParticipant | ExchangeError::NotReceiver | ExchangeError::NotOwner => {
			(StatusCode::FORBIDDEN, "forbidden")
		}
		ExchangeError::AccountSuspended => (StatusCode::FORBIDDEN, "account_suspended"),
		ExchangeError::RecipientUnavailable => (StatusCode::CONFLICT, "recipient_unavailable"),
		ExchangeError::AlreadyRated => (StatusCode::CONFLICT, "already_rated"),
		ExchangeError::AlreadyPosted => (StatusCode::CONFLICT, "already_posted"),
		ExchangeError::RequestNotPending(_)
		| ExchangeError::ExchangeNotPending(_)
		| ExchangeError::ExchangeNotCompleted
		| ExchangeError::PaymentNotRefundable(_) => (StatusCode::CONFLICT, "invalid_state"),
		ExchangeError::RequestExpired | ExchangeError::ExchangeExpired => (StatusCode::GONE, "expired"),
		ExchangeError::MediaLimit { .. } => (StatusCode::CONFLICT, "media_limit"),
		ExchangeError::MalformedPaymentCallback(_) => (StatusCode::BAD_REQUEST, "malformed_payment_callback"),
		ExchangeError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
		ExchangeError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
		ExchangeError::IdentityBanned => (StatusCode::FORBIDDEN, "identity_banned"),
		ExchangeError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
		ExchangeError::PasswordHash(_) | ExchangeError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
	}
}

impl From<ExchangeError> for RouteError<ApiError> {
	#[track_caller]
	fn from(err: ExchangeError) -> Self {
		let (status, code) = classify(&err);

		let message = match status.is_server_error() {
			true => "Internal Server Error".to_string(),
			false => err.to_string(),
		};

		RouteError::new(status, code, message).with_source(Some(ApiError::Exchange(err)))
	}
}
