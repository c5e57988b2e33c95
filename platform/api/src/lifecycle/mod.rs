//! The exchange state machine.
//!
//! Nothing in here performs I/O. Every transition takes the current time
//! explicitly and mutates the model in place, the store then persists the
//! result with the matching compare-and-set.

use crate::error::{ExchangeError, Result};

mod account;
mod exchange;
mod media;
mod payment;
mod quota;
mod rating;
mod request;
mod strike;

pub use account::NewUser;
pub(crate) use media::media_limit;
pub use payment::{payment_signature, verify_payment_signature, CallbackStatus};
pub use quota::QuotaKind;
pub use strike::StrikeOutcome;

/// Longest free text (request messages, rating comments) accepted.
pub const MAX_MESSAGE_LEN: usize = 500;

const MAX_URL_LEN: usize = 2048;

pub(crate) fn validate_url(url: &str) -> Result<()> {
	if url.len() > MAX_URL_LEN {
		return Err(ExchangeError::validation("URL is too long"));
	}

	let rest = url
		.strip_prefix("https://")
		.or_else(|| url.strip_prefix("http://"))
		.ok_or_else(|| ExchangeError::validation("URL must start with http:// or https://"))?;

	if rest.is_empty() || rest.chars().any(char::is_whitespace) {
		return Err(ExchangeError::validation("URL is not valid"));
	}

	Ok(())
}

pub(crate) fn validate_text(text: Option<String>, field: &str) -> Result<Option<String>> {
	let Some(text) = text else {
		return Ok(None);
	};

	let text = text.trim();
	if text.is_empty() {
		return Ok(None);
	}

	if text.chars().count() > MAX_MESSAGE_LEN {
		return Err(ExchangeError::validation(format!(
			"{field} must be at most {MAX_MESSAGE_LEN} characters long"
		)));
	}

	Ok(Some(text.to_string()))
}

#[cfg(test)]
mod tests;
