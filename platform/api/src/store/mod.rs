//! Persistence.
//!
//! Every method that performs a lifecycle transition is a compare-and-set on
//! the current status, so concurrent callers cannot apply the same
//! transition twice.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use common::config::DatabaseConfig;

use crate::database::{
	Exchange, MediaItem, Notification, Payment, Rating, RequestStatus, Session, ShoutoutRequest, Side, Strike, Ulid, User,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const MEMORY_URI: &str = "memory://";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("{0} already exists")]
	Duplicate(&'static str),
}

/// Outcome of [`Store::accept_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
	Accepted,
	/// Somebody else answered (or expired) the request first.
	NotPending,
	/// The receiver used up today's accept quota.
	QuotaExceeded,
}

/// Outcome of [`Store::delete_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDeletion {
	Deleted,
	NotFound,
	LastItem,
}

/// A strike issued while settling an exchange.
#[derive(Debug, Clone)]
pub struct IssuedStrike {
	pub user: User,
	pub strike: Strike,
	/// This strike banned the user.
	pub banned: bool,
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
	// users

	async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>, StoreError>;

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

	async fn is_identity_banned(&self, social_id: &str) -> Result<bool, StoreError>;

	/// Resets daily counters of every user whose counter day is before `today`.
	async fn reset_daily_counters(&self, today: NaiveDate) -> Result<u64, StoreError>;

	/// Moves users whose paid plan ran out back to basic.
	async fn downgrade_lapsed_plans(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

	async fn strikes_for_user(&self, user_id: Ulid) -> Result<Vec<Strike>, StoreError>;

	// sessions

	async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

	async fn session_by_id(&self, id: Ulid) -> Result<Option<Session>, StoreError>;

	async fn touch_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<(), StoreError>;

	async fn invalidate_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<bool, StoreError>;

	// media

	async fn media_for_user(&self, user_id: Ulid) -> Result<Vec<MediaItem>, StoreError>;

	async fn media_by_id(&self, id: Ulid) -> Result<Option<MediaItem>, StoreError>;

	/// Inserts the item unless its owner already holds `max` items.
	async fn insert_media(&self, item: &MediaItem, max: usize) -> Result<bool, StoreError>;

	/// Deletes the item unless its owner would be left with fewer than `min` items.
	async fn delete_media(&self, id: Ulid, user_id: Ulid, min: usize) -> Result<MediaDeletion, StoreError>;

	// requests

	/// Inserts the request and charges the sender's send quota. Returns false
	/// (and inserts nothing) when the quota is used up.
	async fn create_request(&self, request: &ShoutoutRequest, now: DateTime<Utc>, limit: i32) -> Result<bool, StoreError>;

	async fn request_by_id(&self, id: Ulid) -> Result<Option<ShoutoutRequest>, StoreError>;

	async fn requests_sent(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError>;

	async fn requests_received(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError>;

	/// Moves a pending request to accepted, charges the receiver's accept
	/// quota and inserts the exchange, all or nothing.
	async fn accept_request(
		&self,
		request: &ShoutoutRequest,
		exchange: &Exchange,
		now: DateTime<Utc>,
		limit: i32,
	) -> Result<AcceptOutcome, StoreError>;

	/// Moves a request from `from` to `to`. Returns false if it was not in `from`.
	async fn transition_request(
		&self,
		id: Ulid,
		from: RequestStatus,
		to: RequestStatus,
		now: DateTime<Utc>,
	) -> Result<bool, StoreError>;

	/// Expires every pending request past its deadline and returns them.
	async fn expire_overdue_requests(&self, now: DateTime<Utc>) -> Result<Vec<ShoutoutRequest>, StoreError>;

	// exchanges

	async fn exchange_by_id(&self, id: Ulid) -> Result<Option<Exchange>, StoreError>;

	async fn exchanges_for_user(&self, user_id: Ulid) -> Result<Vec<Exchange>, StoreError>;

	/// Records one side's proof on a pending exchange that side has not posted
	/// on yet, completing the exchange if the other side already posted.
	/// Returns the updated exchange, or `None` if the transition no longer applies.
	async fn record_proof(
		&self,
		id: Ulid,
		side: Side,
		url: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Exchange>, StoreError>;

	async fn overdue_exchanges(&self, now: DateTime<Utc>) -> Result<Vec<Exchange>, StoreError>;

	/// Persists a settled exchange (see `Exchange::settle`), expires its
	/// request and issues one strike to each of `offenders`. Returns `None`
	/// when the exchange was no longer pending.
	async fn settle_exchange(
		&self,
		exchange: &Exchange,
		offenders: &[Ulid],
		reason: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Vec<IssuedStrike>>, StoreError>;

	/// Pending exchanges inside the last `lead` of their window that were not reminded yet.
	async fn exchanges_due_reminder(&self, now: DateTime<Utc>, lead: chrono::Duration) -> Result<Vec<Exchange>, StoreError>;

	/// Returns false if the reminder was already marked.
	async fn mark_reminded(&self, id: Ulid) -> Result<bool, StoreError>;

	// ratings

	/// Inserts the rating and folds it into the rated user's average. Returns
	/// false if the rater already rated this exchange.
	async fn insert_rating(&self, rating: &Rating) -> Result<bool, StoreError>;

	async fn ratings_for_user(&self, user_id: Ulid) -> Result<Vec<Rating>, StoreError>;

	// notifications

	async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

	async fn notifications_for_user(
		&self,
		user_id: Ulid,
		unread_only: bool,
		limit: i64,
	) -> Result<Vec<Notification>, StoreError>;

	async fn unread_count(&self, user_id: Ulid) -> Result<i64, StoreError>;

	async fn mark_notification_read(&self, id: Ulid, user_id: Ulid) -> Result<bool, StoreError>;

	async fn mark_all_read(&self, user_id: Ulid) -> Result<u64, StoreError>;

	// payments

	async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError>;

	async fn payment_by_order(&self, order_id: &str) -> Result<Option<Payment>, StoreError>;

	async fn payments_for_user(&self, user_id: Ulid) -> Result<Vec<Payment>, StoreError>;

	/// Persists a settled payment (completed or failed) if it is still
	/// pending. A completed payment extends its owner's pro period from the
	/// stored expiry in the same write. Returns the owner as stored afterwards,
	/// or `None` when the payment was already settled.
	async fn settle_payment(&self, payment: &Payment, now: DateTime<Utc>) -> Result<Option<User>, StoreError>;

	/// Moves a completed payment to refunded.
	async fn refund_payment(&self, payment: &Payment) -> Result<bool, StoreError>;
}

/// Opens the store named by `config.uri`.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
	if config.uri == MEMORY_URI {
		tracing::warn!("using the in-memory store, nothing will be persisted");
		return Ok(Arc::new(MemoryStore::default()));
	}

	Ok(Arc::new(PgStore::connect(config).await?))
}
