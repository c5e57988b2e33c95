use crate::database::{ExchangeStatus, MediaKind, PaymentStatus, Plan, RequestStatus};
use crate::store::StoreError;

/// Everything that can go wrong while driving the exchange lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
	#[error("daily limit of {limit} reached")]
	QuotaExceeded { limit: i32 },
	#[error("{kind:?} media is not available on the {plan:?} plan")]
	MediaNotAllowed { plan: Plan, kind: MediaKind },
	#[error("request not found")]
	RequestNotFound,
	#[error("exchange not found")]
	ExchangeNotFound,
	#[error("user not found")]
	UserNotFound,
	#[error("media item not found")]
	MediaNotFound,
	#[error("notification not found")]
	NotificationNotFound,
	#[error("payment not found")]
	PaymentNotFound,
	#[error("only participants of the exchange may do this")]
	NotParticipant,
	#[error("only the receiver may respond to this request")]
	NotReceiver,
	#[error("you do not own this resource")]
	NotOwner,
	#[error("account is suspended")]
	AccountSuspended,
	#[error("the other user cannot take part in exchanges")]
	RecipientUnavailable,
	#[error("you already rated this exchange")]
	AlreadyRated,
	#[error("you already posted proof for this exchange")]
	AlreadyPosted,
	#[error("request is {0:?}")]
	RequestNotPending(RequestStatus),
	#[error("exchange is {0:?}")]
	ExchangeNotPending(ExchangeStatus),
	#[error("exchange is not completed")]
	ExchangeNotCompleted,
	#[error("request has expired")]
	RequestExpired,
	#[error("exchange has expired")]
	ExchangeExpired,
	#[error("users hold between {min} and {max} media items")]
	MediaLimit { min: usize, max: usize },
	#[error("malformed payment callback: {0}")]
	MalformedPaymentCallback(&'static str),
	#[error("payment is {0:?}")]
	PaymentNotRefundable(PaymentStatus),
	#[error("{0}")]
	Validation(String),
	#[error("{0}")]
	Conflict(&'static str),
	#[error("this identity is banned")]
	IdentityBanned,
	#[error("invalid username or password")]
	InvalidCredentials,
	#[error("failed to hash password: {0}")]
	PasswordHash(argon2::password_hash::Error),
	#[error("store: {0}")]
	Store(#[from] StoreError),
}

impl ExchangeError {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation(message.into())
	}
}

pub type Result<T, E = ExchangeError> = std::result::Result<T, E>;
