use chrono::{DateTime, Utc};

use super::{BillingPeriod, Ulid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "payment_gateway", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentGateway {
	Razorpay,
	Paypal,
	Upi,
	Paytm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
	Pending,
	Completed,
	Failed,
	Refunded,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Payment {
	pub id: Ulid,
	pub user_id: Ulid,
	/// The id the gateway knows this payment by.
	pub order_id: String,
	pub gateway: PaymentGateway,
	pub billing_period: BillingPeriod,
	/// In the currency's minor unit (paise for INR).
	pub amount: i64,
	pub currency: String,
	pub status: PaymentStatus,
	pub gateway_payment_id: Option<String>,
	pub failure_reason: Option<String>,
	pub created_at: DateTime<Utc>,
	pub processed_at: Option<DateTime<Utc>>,
}
