use chrono::{DateTime, Duration, Utc};

use super::validate_url;
use crate::database::{Exchange, ExchangeStatus, Side, Ulid};
use crate::error::{ExchangeError, Result};

impl Side {
	pub const BOTH: [Side; 2] = [Side::Requester, Side::Acceptor];
}

impl Exchange {
	pub fn side_of(&self, user_id: Ulid) -> Option<Side> {
		if user_id == self.requester_id {
			Some(Side::Requester)
		} else if user_id == self.acceptor_id {
			Some(Side::Acceptor)
		} else {
			None
		}
	}

	pub fn participant(&self, side: Side) -> Ulid {
		match side {
			Side::Requester => self.requester_id,
			Side::Acceptor => self.acceptor_id,
		}
	}

	pub fn counterpart(&self, side: Side) -> Ulid {
		match side {
			Side::Requester => self.acceptor_id,
			Side::Acceptor => self.requester_id,
		}
	}

	pub fn has_posted(&self, side: Side) -> bool {
		match side {
			Side::Requester => self.requester_posted,
			Side::Acceptor => self.acceptor_posted,
		}
	}

	/// Sides that have not posted proof yet.
	pub fn missing_sides(&self) -> Vec<Side> {
		Side::BOTH.into_iter().filter(|side| !self.has_posted(*side)).collect()
	}

	/// Still pending although the window has closed.
	pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
		self.status == ExchangeStatus::Pending && now >= self.expires_at
	}

	/// Records `user_id`'s proof. Completes the exchange when it is the second one.
	pub fn submit_proof(&mut self, user_id: Ulid, url: String, now: DateTime<Utc>) -> Result<Side> {
		let side = self.side_of(user_id).ok_or(ExchangeError::NotParticipant)?;

		if self.is_overdue(now) || self.status == ExchangeStatus::Expired {
			return Err(ExchangeError::ExchangeExpired);
		}

		if self.status != ExchangeStatus::Pending {
			return Err(ExchangeError::ExchangeNotPending(self.status));
		}

		if self.has_posted(side) {
			return Err(ExchangeError::AlreadyPosted);
		}

		validate_url(&url)?;
		self.record_proof(side, url, now);

		Ok(side)
	}

	/// Applies a proof without validation. Callers have checked the transition.
	pub(crate) fn record_proof(&mut self, side: Side, url: String, now: DateTime<Utc>) {
		match side {
			Side::Requester => {
				self.requester_posted = true;
				self.requester_posted_at = Some(now);
				self.requester_proof_url = Some(url);
			}
			Side::Acceptor => {
				self.acceptor_posted = true;
				self.acceptor_posted_at = Some(now);
				self.acceptor_proof_url = Some(url);
			}
		}

		if self.requester_posted && self.acceptor_posted {
			self.status = ExchangeStatus::Completed;
			self.completed_at = Some(now);
			self.settled_at = Some(now);
		}
	}

	/// Expires an overdue exchange and returns the sides that owe a strike.
	///
	/// Returns `None` when there is nothing to settle, so an exchange is only
	/// ever settled once.
	pub fn settle(&mut self, now: DateTime<Utc>) -> Option<Vec<Side>> {
		if !self.is_overdue(now) {
			return None;
		}

		self.status = ExchangeStatus::Expired;
		self.settled_at = Some(now);

		Some(self.missing_sides())
	}

	/// Whether the expiring soon reminder is due. Sent once, inside the last `lead` of the window.
	pub fn needs_reminder(&self, now: DateTime<Utc>, lead: Duration) -> bool {
		self.status == ExchangeStatus::Pending
			&& !self.reminded
			&& now < self.expires_at
			&& now >= self.expires_at - lead
			&& !self.missing_sides().is_empty()
	}
}
