use chrono::{DateTime, Utc};

use super::load_user;
use super::notifications::{notify, Notice};
use crate::database::{BillingPeriod, NotificationKind, Payment, PaymentGateway, Ulid};
use crate::error::{ExchangeError, Result};
use crate::global::GlobalState;
use crate::lifecycle::{verify_payment_signature, CallbackStatus};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewPayment {
	pub billing_period: BillingPeriod,
	pub gateway: PaymentGateway,
}

/// What a gateway posts back once it has processed an order.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct CallbackInput {
	pub order_id: Option<String>,
	pub gateway_payment_id: Option<String>,
	pub status: Option<String>,
	pub signature: Option<String>,
	pub reason: Option<String>,
}

fn required(field: Option<String>, name: &'static str) -> Result<String> {
	match field {
		Some(value) if !value.trim().is_empty() => Ok(value),
		_ => Err(ExchangeError::MalformedPaymentCallback(name)),
	}
}

pub async fn initiate(global: &GlobalState, actor_id: Ulid, input: NewPayment, now: DateTime<Utc>) -> Result<Payment> {
	let user = load_user(global, actor_id).await?;
	let config = &global.config().payment;

	let payment = Payment::initiate(
		&user,
		input.billing_period,
		input.gateway,
		config.price(input.billing_period),
		&config.currency,
		now,
	)?;

	global.store().insert_payment(&payment).await?;

	tracing::info!(
		user_id = %actor_id,
		order_id = %payment.order_id,
		gateway = ?payment.gateway,
		amount = payment.amount,
		"payment initiated"
	);

	Ok(payment)
}

async fn load(global: &GlobalState, order_id: &str) -> Result<Payment> {
	global
		.store()
		.payment_by_order(order_id)
		.await?
		.ok_or(ExchangeError::PaymentNotFound)
}

/// Applies a signed gateway callback. Callbacks for settled orders are no-ops.
pub async fn callback(global: &GlobalState, input: CallbackInput, now: DateTime<Utc>) -> Result<Payment> {
	let order_id = required(input.order_id, "missing order_id")?;
	let gateway_payment_id = required(input.gateway_payment_id, "missing gateway_payment_id")?;
	let status = required(input.status, "missing status")?.parse::<CallbackStatus>()?;
	let signature = required(input.signature, "missing signature")?;

	if !verify_payment_signature(
		&global.config().payment.callback_secret,
		&order_id,
		&gateway_payment_id,
		&signature,
	) {
		tracing::warn!(%order_id, "payment callback with a bad signature");
		return Err(ExchangeError::MalformedPaymentCallback("bad signature"));
	}

	let mut payment = load(global, &order_id).await?;
	if payment.is_settled() {
		tracing::debug!(%order_id, status = ?payment.status, "duplicate payment callback");
		return Ok(payment);
	}

	let notice = match status {
		CallbackStatus::Success => {
			payment.complete(gateway_payment_id, now);
			None
		}
		CallbackStatus::Failed => {
			let reason = input.reason.unwrap_or_else(|| "declined by the gateway".to_string());
			payment.fail(gateway_payment_id, reason.clone(), now);

			Some(Notice::new(
				NotificationKind::PaymentFailed,
				"Payment failed",
				format!("Your payment could not be completed: {reason}"),
			))
		}
	};

	let Some(user) = global.store().settle_payment(&payment, now).await? else {
		// Another callback for the same order got there first.
		return load(global, &order_id).await;
	};

	let notice = notice.unwrap_or_else(|| {
		let until = user.plan_expires_at.map(|at| at.format("%Y-%m-%d").to_string()).unwrap_or_default();

		Notice::new(
			NotificationKind::PaymentCompleted,
			"Welcome to Pro",
			format!("Your payment went through. Pro is active until {until}"),
		)
	});

	tracing::info!(
		%order_id,
		user_id = %user.id,
		status = ?payment.status,
		plan_expires_at = ?user.plan_expires_at,
		"payment settled"
	);

	notify(global, user.id, notice.about(payment.id), now).await;

	Ok(payment)
}

pub async fn list(global: &GlobalState, actor_id: Ulid) -> Result<Vec<Payment>> {
	Ok(global.store().payments_for_user(actor_id).await?)
}

/// Refunds a completed payment. The plan the payment bought is left as is.
pub async fn refund(global: &GlobalState, actor_id: Ulid, order_id: &str, now: DateTime<Utc>) -> Result<Payment> {
	let mut payment = load(global, order_id).await?;

	if payment.user_id != actor_id {
		return Err(ExchangeError::PaymentNotFound);
	}

	payment.refund(actor_id, now)?;

	if !global.store().refund_payment(&payment).await? {
		let current = load(global, order_id).await?;
		return Err(ExchangeError::PaymentNotRefundable(current.status));
	}

	tracing::info!(%order_id, user_id = %actor_id, "payment refunded");

	Ok(payment)
}
