use chrono::{DateTime, Duration, Utc};

use super::{validate_text, QuotaKind};
use crate::database::{Exchange, ExchangeStatus, MediaItem, RequestStatus, ShoutoutRequest, Ulid, User};
use crate::error::{ExchangeError, Result};

impl ShoutoutRequest {
	/// Opens a request from `sender` to `receiver` offering `media`.
	///
	/// Consumes one unit of the sender's daily send quota.
	pub fn open(
		sender: &mut User,
		receiver: &User,
		media: &MediaItem,
		message: Option<String>,
		now: DateTime<Utc>,
		ttl: Duration,
	) -> Result<Self> {
		sender.ensure_active()?;

		if sender.id == receiver.id {
			return Err(ExchangeError::validation("You cannot send a request to yourself"));
		}

		if receiver.banned {
			return Err(ExchangeError::RecipientUnavailable);
		}

		if media.user_id != sender.id {
			return Err(ExchangeError::MediaNotFound);
		}

		let plan = sender.effective_plan(now);
		if !plan.allows(media.kind) {
			return Err(ExchangeError::MediaNotAllowed { plan, kind: media.kind });
		}

		let message = validate_text(message, "Message")?;

		sender.try_reserve(QuotaKind::Send, now)?;
		sender.updated_at = now;

		Ok(Self {
			id: Ulid::new(),
			sender_id: sender.id,
			receiver_id: receiver.id,
			media_id: media.id,
			media_kind: media.kind,
			message,
			status: RequestStatus::Pending,
			created_at: now,
			expires_at: now + ttl,
			responded_at: None,
			exchange_id: None,
		})
	}

	/// A pending request nobody answered in time.
	pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
		self.status == RequestStatus::Pending && now >= self.expires_at
	}

	/// Moves an overdue request to expired. Returns whether anything changed.
	pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
		if !self.is_overdue(now) {
			return false;
		}

		self.status = RequestStatus::Expired;
		self.responded_at = Some(now);
		true
	}

	fn ensure_answerable(&self, actor: Ulid, now: DateTime<Utc>) -> Result<()> {
		if actor != self.receiver_id {
			return Err(ExchangeError::NotReceiver);
		}

		if self.is_overdue(now) || self.status == RequestStatus::Expired {
			return Err(ExchangeError::RequestExpired);
		}

		if self.status != RequestStatus::Pending {
			return Err(ExchangeError::RequestNotPending(self.status));
		}

		Ok(())
	}

	/// Accepts the request on behalf of `receiver`, who offers `media` in
	/// return, and opens the exchange.
	///
	/// Consumes one unit of the receiver's daily accept quota. The exchange
	/// must be completed within `window`.
	pub fn accept(
		&mut self,
		receiver: &mut User,
		sender: &User,
		media: &MediaItem,
		now: DateTime<Utc>,
		window: Duration,
	) -> Result<Exchange> {
		receiver.ensure_active()?;
		self.ensure_answerable(receiver.id, now)?;

		if sender.banned {
			return Err(ExchangeError::RecipientUnavailable);
		}

		if media.user_id != receiver.id {
			return Err(ExchangeError::MediaNotFound);
		}

		let plan = receiver.effective_plan(now);
		if !plan.allows(media.kind) {
			return Err(ExchangeError::MediaNotAllowed { plan, kind: media.kind });
		}

		receiver.try_reserve(QuotaKind::Accept, now)?;
		receiver.updated_at = now;

		let exchange = Exchange {
			id: Ulid::new(),
			request_id: self.id,
			requester_id: self.sender_id,
			acceptor_id: self.receiver_id,
			requester_media_id: self.media_id,
			media_kind: self.media_kind,
			acceptor_media_id: media.id,
			acceptor_media_kind: media.kind,
			requester_posted: false,
			requester_posted_at: None,
			requester_proof_url: None,
			acceptor_posted: false,
			acceptor_posted_at: None,
			acceptor_proof_url: None,
			status: ExchangeStatus::Pending,
			accepted_at: now,
			expires_at: now + window,
			completed_at: None,
			settled_at: None,
			reminded: false,
		};

		self.status = RequestStatus::Accepted;
		self.responded_at = Some(now);
		self.exchange_id = Some(exchange.id);

		Ok(exchange)
	}

	pub fn reject(&mut self, actor: &User, now: DateTime<Utc>) -> Result<()> {
		actor.ensure_active()?;
		self.ensure_answerable(actor.id, now)?;

		self.status = RequestStatus::Rejected;
		self.responded_at = Some(now);
		Ok(())
	}

	pub fn involves(&self, user_id: Ulid) -> bool {
		self.sender_id == user_id || self.receiver_id == user_id
	}
}
