use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::database::{BillingPeriod, Payment, PaymentGateway, PaymentStatus, Plan, Ulid, User};
use crate::error::{ExchangeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// What a gateway reported for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
	Success,
	Failed,
}

impl std::str::FromStr for CallbackStatus {
	type Err = ExchangeError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"captured" | "success" | "completed" => Ok(Self::Success),
			"failed" => Ok(Self::Failed),
			_ => Err(ExchangeError::MalformedPaymentCallback("unknown status")),
		}
	}
}

fn signing_mac(secret: &str, order_id: &str, gateway_payment_id: &str) -> HmacSha256 {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
	mac.update(order_id.as_bytes());
	mac.update(b"|");
	mac.update(gateway_payment_id.as_bytes());
	mac
}

/// hex(HMAC-SHA256(secret, "order_id|gateway_payment_id"))
pub fn payment_signature(secret: &str, order_id: &str, gateway_payment_id: &str) -> String {
	hex::encode(signing_mac(secret, order_id, gateway_payment_id).finalize().into_bytes())
}

pub fn verify_payment_signature(secret: &str, order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
	match hex::decode(signature) {
		Ok(signature) => signing_mac(secret, order_id, gateway_payment_id).verify_slice(&signature).is_ok(),
		Err(_) => false,
	}
}

impl Payment {
	pub fn initiate(
		user: &User,
		period: BillingPeriod,
		gateway: PaymentGateway,
		amount: i64,
		currency: &str,
		now: DateTime<Utc>,
	) -> Result<Self> {
		user.ensure_active()?;

		let id = Ulid::new();
		Ok(Self {
			id,
			user_id: user.id,
			order_id: format!("order_{id}"),
			gateway,
			billing_period: period,
			amount,
			currency: currency.to_string(),
			status: PaymentStatus::Pending,
			gateway_payment_id: None,
			failure_reason: None,
			created_at: now,
			processed_at: None,
		})
	}

	pub fn is_settled(&self) -> bool {
		self.status != PaymentStatus::Pending
	}

	pub fn complete(&mut self, gateway_payment_id: String, now: DateTime<Utc>) {
		self.status = PaymentStatus::Completed;
		self.gateway_payment_id = Some(gateway_payment_id);
		self.processed_at = Some(now);
	}

	pub fn fail(&mut self, gateway_payment_id: String, reason: String, now: DateTime<Utc>) {
		self.status = PaymentStatus::Failed;
		self.gateway_payment_id = Some(gateway_payment_id);
		self.failure_reason = Some(reason);
		self.processed_at = Some(now);
	}

	pub fn refund(&mut self, actor: Ulid, now: DateTime<Utc>) -> Result<()> {
		if self.user_id != actor {
			return Err(ExchangeError::NotOwner);
		}

		if self.status != PaymentStatus::Completed {
			return Err(ExchangeError::PaymentNotRefundable(self.status));
		}

		self.status = PaymentStatus::Refunded;
		self.processed_at = Some(now);
		Ok(())
	}
}

impl User {
	/// Extends (or starts) a pro period by one billing period. An active pro
	/// period is extended from its current expiry rather than from `now`.
	pub fn extend_pro(&mut self, period: BillingPeriod, now: DateTime<Utc>) {
		let start = match (self.effective_plan(now), self.plan_expires_at) {
			(Plan::Pro, Some(expires_at)) => expires_at.max(now),
			_ => now,
		};

		self.plan = Plan::Pro;
		self.plan_expires_at = Some(start + Duration::days(period.days()));
		self.updated_at = now;
	}
}
