use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool, Postgres, Transaction};

use super::{AcceptOutcome, IssuedStrike, MediaDeletion, Store, StoreError};
use crate::database::{
	Exchange, ExchangeStatus, MediaItem, Notification, Payment, PaymentStatus, Rating, RequestStatus, Session, ShoutoutRequest, Side,
	Strike, Ulid, User, MAX_STRIKES,
};
use crate::lifecycle::QuotaKind;

pub struct PgStore {
	pool: PgPool,
}

fn duplicate(err: sqlx::Error, what: &'static str) -> StoreError {
	match &err {
		sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
		_ => StoreError::Database(err),
	}
}

impl PgStore {
	pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
		let options = PgConnectOptions::from_str(&config.uri)?
			.disable_statement_logging()
			.application_name("shoutx-api");

		let pool = PgPoolOptions::new()
			.max_connections(config.max_connections)
			.connect_with(options)
			.await?;

		tracing::info!("connected to database");

		if config.migrate {
			sqlx::migrate!("./migrations").run(&pool).await?;
			tracing::info!("database migrations applied");
		}

		Ok(Self { pool })
	}

	/// Charges one unit of a daily counter inside `tx`, resetting both
	/// counters first when they belong to another day. Returns false when the
	/// counter for today already reached `limit`.
	async fn charge(
		tx: &mut Transaction<'_, Postgres>,
		user_id: Ulid,
		kind: QuotaKind,
		now: DateTime<Utc>,
		limit: i32,
	) -> Result<bool, StoreError> {
		let query = match kind {
			QuotaKind::Send => {
				"UPDATE users SET
					requests_sent_today = CASE WHEN counter_day = $2 THEN requests_sent_today + 1 ELSE 1 END,
					requests_accepted_today = CASE WHEN counter_day = $2 THEN requests_accepted_today ELSE 0 END,
					counter_day = $2,
					updated_at = $4
				WHERE id = $1 AND (counter_day <> $2 OR requests_sent_today < $3)"
			}
			QuotaKind::Accept => {
				"UPDATE users SET
					requests_accepted_today = CASE WHEN counter_day = $2 THEN requests_accepted_today + 1 ELSE 1 END,
					requests_sent_today = CASE WHEN counter_day = $2 THEN requests_sent_today ELSE 0 END,
					counter_day = $2,
					updated_at = $4
				WHERE id = $1 AND (counter_day <> $2 OR requests_accepted_today < $3)"
			}
		};

		let charged = sqlx::query(query)
			.bind(user_id)
			.bind(now.date_naive())
			.bind(limit)
			.bind(now)
			.execute(&mut **tx)
			.await?;

		Ok(charged.rows_affected() == 1)
	}
}

#[async_trait::async_trait]
impl Store for PgStore {
	async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
		sqlx::query(
			"INSERT INTO users (
				id, username, social_id, password_hash, follower_count, account_type, plan, plan_expires_at,
				rating_sum, rating_count, strike_count, banned, banned_at,
				requests_sent_today, requests_accepted_today, counter_day, created_at, updated_at
			) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
		)
		.bind(user.id)
		.bind(&user.username)
		.bind(&user.social_id)
		.bind(&user.password_hash)
		.bind(user.follower_count)
		.bind(user.account_type)
		.bind(user.plan)
		.bind(user.plan_expires_at)
		.bind(user.rating_sum)
		.bind(user.rating_count)
		.bind(user.strike_count)
		.bind(user.banned)
		.bind(user.banned_at)
		.bind(user.requests_sent_today)
		.bind(user.requests_accepted_today)
		.bind(user.counter_day)
		.bind(user.created_at)
		.bind(user.updated_at)
		.execute(&self.pool)
		.await
		.map_err(|err| duplicate(err, "username or social identity"))?;

		Ok(())
	}

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
			.bind(username)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn is_identity_banned(&self, social_id: &str) -> Result<bool, StoreError> {
		Ok(
			sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM banned_identities WHERE social_id = $1)")
				.bind(social_id)
				.fetch_one(&self.pool)
				.await?,
		)
	}

	async fn reset_daily_counters(&self, today: NaiveDate) -> Result<u64, StoreError> {
		Ok(sqlx::query(
			"UPDATE users SET requests_sent_today = 0, requests_accepted_today = 0, counter_day = $1 WHERE counter_day < $1",
		)
		.bind(today)
		.execute(&self.pool)
		.await?
		.rows_affected())
	}

	async fn downgrade_lapsed_plans(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
		Ok(sqlx::query(
			"UPDATE users SET plan = 'BASIC', plan_expires_at = NULL, updated_at = $1
			WHERE plan = 'PRO' AND plan_expires_at IS NOT NULL AND plan_expires_at <= $1",
		)
		.bind(now)
		.execute(&self.pool)
		.await?
		.rows_affected())
	}

	async fn strikes_for_user(&self, user_id: Ulid) -> Result<Vec<Strike>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM strikes WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
			.bind(user_id)
			.fetch_all(&self.pool)
			.await?)
	}

	async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
		sqlx::query(
			"INSERT INTO sessions (id, user_id, expires_at, last_used_at, invalidated_at) VALUES ($1, $2, $3, $4, $5)",
		)
		.bind(session.id)
		.bind(session.user_id)
		.bind(session.expires_at)
		.bind(session.last_used_at)
		.bind(session.invalidated_at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	async fn session_by_id(&self, id: Ulid) -> Result<Option<Session>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn touch_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<(), StoreError> {
		sqlx::query("UPDATE sessions SET last_used_at = $2 WHERE id = $1")
			.bind(id)
			.bind(now)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	async fn invalidate_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<bool, StoreError> {
		Ok(
			sqlx::query("UPDATE sessions SET invalidated_at = $2 WHERE id = $1 AND invalidated_at IS NULL")
				.bind(id)
				.bind(now)
				.execute(&self.pool)
				.await?
				.rows_affected()
				== 1,
		)
	}

	async fn media_for_user(&self, user_id: Ulid) -> Result<Vec<MediaItem>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM media_items WHERE user_id = $1 ORDER BY created_at, id")
			.bind(user_id)
			.fetch_all(&self.pool)
			.await?)
	}

	async fn media_by_id(&self, id: Ulid) -> Result<Option<MediaItem>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM media_items WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn insert_media(&self, item: &MediaItem, max: usize) -> Result<bool, StoreError> {
		let mut tx = self.pool.begin().await?;

		// Serializes concurrent uploads by the same user.
		sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
			.bind(item.user_id)
			.execute(&mut *tx)
			.await?;

		let held: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE user_id = $1")
			.bind(item.user_id)
			.fetch_one(&mut *tx)
			.await?;

		if held as usize >= max {
			return Ok(false);
		}

		sqlx::query("INSERT INTO media_items (id, user_id, url, kind, created_at) VALUES ($1, $2, $3, $4, $5)")
			.bind(item.id)
			.bind(item.user_id)
			.bind(&item.url)
			.bind(item.kind)
			.bind(item.created_at)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(true)
	}

	async fn delete_media(&self, id: Ulid, user_id: Ulid, min: usize) -> Result<MediaDeletion, StoreError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
			.bind(user_id)
			.execute(&mut *tx)
			.await?;

		let owned: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM media_items WHERE id = $1 AND user_id = $2)")
			.bind(id)
			.bind(user_id)
			.fetch_one(&mut *tx)
			.await?;

		if !owned {
			return Ok(MediaDeletion::NotFound);
		}

		let held: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE user_id = $1")
			.bind(user_id)
			.fetch_one(&mut *tx)
			.await?;

		if held as usize <= min {
			return Ok(MediaDeletion::LastItem);
		}

		sqlx::query("DELETE FROM media_items WHERE id = $1")
			.bind(id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(MediaDeletion::Deleted)
	}

	async fn create_request(&self, request: &ShoutoutRequest, now: DateTime<Utc>, limit: i32) -> Result<bool, StoreError> {
		let mut tx = self.pool.begin().await?;

		if !Self::charge(&mut tx, request.sender_id, QuotaKind::Send, now, limit).await? {
			return Ok(false);
		}

		sqlx::query(
			"INSERT INTO shoutout_requests (
				id, sender_id, receiver_id, media_id, media_kind, message, status, created_at, expires_at, responded_at, exchange_id
			) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
		)
		.bind(request.id)
		.bind(request.sender_id)
		.bind(request.receiver_id)
		.bind(request.media_id)
		.bind(request.media_kind)
		.bind(&request.message)
		.bind(request.status)
		.bind(request.created_at)
		.bind(request.expires_at)
		.bind(request.responded_at)
		.bind(request.exchange_id)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;
		Ok(true)
	}

	async fn request_by_id(&self, id: Ulid) -> Result<Option<ShoutoutRequest>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM shoutout_requests WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn requests_sent(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError> {
		Ok(
			sqlx::query_as("SELECT * FROM shoutout_requests WHERE sender_id = $1 ORDER BY created_at DESC, id DESC")
				.bind(user_id)
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn requests_received(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError> {
		Ok(
			sqlx::query_as("SELECT * FROM shoutout_requests WHERE receiver_id = $1 ORDER BY created_at DESC, id DESC")
				.bind(user_id)
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn accept_request(
		&self,
		request: &ShoutoutRequest,
		exchange: &Exchange,
		now: DateTime<Utc>,
		limit: i32,
	) -> Result<AcceptOutcome, StoreError> {
		let mut tx = self.pool.begin().await?;

		let claimed = sqlx::query(
			"UPDATE shoutout_requests SET status = 'ACCEPTED', responded_at = $2, exchange_id = $3
			WHERE id = $1 AND status = 'PENDING' AND expires_at > $2",
		)
		.bind(request.id)
		.bind(now)
		.bind(exchange.id)
		.execute(&mut *tx)
		.await?;

		if claimed.rows_affected() != 1 {
			return Ok(AcceptOutcome::NotPending);
		}

		if !Self::charge(&mut tx, request.receiver_id, QuotaKind::Accept, now, limit).await? {
			return Ok(AcceptOutcome::QuotaExceeded);
		}

		sqlx::query(
			"INSERT INTO exchanges (
				id, request_id, requester_id, acceptor_id, requester_media_id, media_kind,
				acceptor_media_id, acceptor_media_kind, status, accepted_at, expires_at
			) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
		)
		.bind(exchange.id)
		.bind(exchange.request_id)
		.bind(exchange.requester_id)
		.bind(exchange.acceptor_id)
		.bind(exchange.requester_media_id)
		.bind(exchange.media_kind)
		.bind(exchange.acceptor_media_id)
		.bind(exchange.acceptor_media_kind)
		.bind(exchange.status)
		.bind(exchange.accepted_at)
		.bind(exchange.expires_at)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;
		Ok(AcceptOutcome::Accepted)
	}

	async fn transition_request(
		&self,
		id: Ulid,
		from: RequestStatus,
		to: RequestStatus,
		now: DateTime<Utc>,
	) -> Result<bool, StoreError> {
		Ok(sqlx::query(
			"UPDATE shoutout_requests SET status = $3, responded_at = COALESCE(responded_at, $4)
			WHERE id = $1 AND status = $2",
		)
		.bind(id)
		.bind(from)
		.bind(to)
		.bind(now)
		.execute(&self.pool)
		.await?
		.rows_affected()
			== 1)
	}

	async fn expire_overdue_requests(&self, now: DateTime<Utc>) -> Result<Vec<ShoutoutRequest>, StoreError> {
		Ok(sqlx::query_as(
			"UPDATE shoutout_requests SET status = 'EXPIRED', responded_at = $1
			WHERE status = 'PENDING' AND expires_at <= $1
			RETURNING *",
		)
		.bind(now)
		.fetch_all(&self.pool)
		.await?)
	}

	async fn exchange_by_id(&self, id: Ulid) -> Result<Option<Exchange>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM exchanges WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn exchanges_for_user(&self, user_id: Ulid) -> Result<Vec<Exchange>, StoreError> {
		Ok(sqlx::query_as(
			"SELECT * FROM exchanges WHERE requester_id = $1 OR acceptor_id = $1 ORDER BY accepted_at DESC, id DESC",
		)
		.bind(user_id)
		.fetch_all(&self.pool)
		.await?)
	}

	async fn record_proof(
		&self,
		id: Ulid,
		side: Side,
		url: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Exchange>, StoreError> {
		let (mine, theirs) = match side {
			Side::Requester => ("requester", "acceptor"),
			Side::Acceptor => ("acceptor", "requester"),
		};

		let mut tx = self.pool.begin().await?;

		let exchange: Option<Exchange> = sqlx::query_as(&format!(
			"UPDATE exchanges SET
				{mine}_posted = TRUE,
				{mine}_posted_at = $2,
				{mine}_proof_url = $3,
				status = CASE WHEN {theirs}_posted THEN 'COMPLETED'::exchange_status ELSE status END,
				completed_at = CASE WHEN {theirs}_posted THEN $2 ELSE completed_at END,
				settled_at = CASE WHEN {theirs}_posted THEN $2 ELSE settled_at END
			WHERE id = $1 AND status = 'PENDING' AND NOT {mine}_posted AND expires_at > $2
			RETURNING *"
		))
		.bind(id)
		.bind(now)
		.bind(url)
		.fetch_optional(&mut *tx)
		.await?;

		if let Some(exchange) = &exchange {
			if exchange.status == ExchangeStatus::Completed {
				sqlx::query("UPDATE shoutout_requests SET status = 'COMPLETED' WHERE id = $1 AND status = 'ACCEPTED'")
					.bind(exchange.request_id)
					.execute(&mut *tx)
					.await?;
			}
		}

		tx.commit().await?;
		Ok(exchange)
	}

	async fn overdue_exchanges(&self, now: DateTime<Utc>) -> Result<Vec<Exchange>, StoreError> {
		Ok(
			sqlx::query_as("SELECT * FROM exchanges WHERE status = 'PENDING' AND expires_at <= $1 ORDER BY expires_at")
				.bind(now)
				.fetch_all(&self.pool)
				.await?,
		)
	}

	async fn settle_exchange(
		&self,
		exchange: &Exchange,
		offenders: &[Ulid],
		reason: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Vec<IssuedStrike>>, StoreError> {
		let mut tx = self.pool.begin().await?;

		let claimed = sqlx::query("UPDATE exchanges SET status = $2, settled_at = $3 WHERE id = $1 AND status = 'PENDING'")
			.bind(exchange.id)
			.bind(exchange.status)
			.bind(exchange.settled_at.unwrap_or(now))
			.execute(&mut *tx)
			.await?;

		if claimed.rows_affected() != 1 {
			return Ok(None);
		}

		sqlx::query("UPDATE shoutout_requests SET status = 'EXPIRED' WHERE id = $1 AND status = 'ACCEPTED'")
			.bind(exchange.request_id)
			.execute(&mut *tx)
			.await?;

		let mut issued = Vec::with_capacity(offenders.len());
		for user_id in offenders {
			let before: Option<(i32, bool)> =
				sqlx::query_as("SELECT strike_count, banned FROM users WHERE id = $1 FOR UPDATE")
					.bind(user_id)
					.fetch_optional(&mut *tx)
					.await?;

			let Some((count, already_banned)) = before else {
				continue;
			};

			if count >= MAX_STRIKES {
				continue;
			}

			let user: User = sqlx::query_as(
				"UPDATE users SET
					strike_count = strike_count + 1,
					banned = banned OR strike_count + 1 >= $2,
					banned_at = CASE WHEN strike_count + 1 >= $2 THEN COALESCE(banned_at, $3) ELSE banned_at END,
					updated_at = $3
				WHERE id = $1
				RETURNING *",
			)
			.bind(user_id)
			.bind(MAX_STRIKES)
			.bind(now)
			.fetch_one(&mut *tx)
			.await?;

			let strike = Strike {
				id: Ulid::new(),
				user_id: user.id,
				exchange_id: Some(exchange.id),
				reason: reason.to_string(),
				strike_number: user.strike_count,
				created_at: now,
			};

			sqlx::query(
				"INSERT INTO strikes (id, user_id, exchange_id, reason, strike_number, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
			)
			.bind(strike.id)
			.bind(strike.user_id)
			.bind(strike.exchange_id)
			.bind(&strike.reason)
			.bind(strike.strike_number)
			.bind(strike.created_at)
			.execute(&mut *tx)
			.await?;

			let banned = user.banned && !already_banned;
			if banned {
				sqlx::query(
					"INSERT INTO banned_identities (social_id, user_id, banned_at) VALUES ($1, $2, $3)
					ON CONFLICT (social_id) DO NOTHING",
				)
				.bind(&user.social_id)
				.bind(user.id)
				.bind(now)
				.execute(&mut *tx)
				.await?;
			}

			issued.push(IssuedStrike { user, strike, banned });
		}

		tx.commit().await?;
		Ok(Some(issued))
	}

	async fn exchanges_due_reminder(&self, now: DateTime<Utc>, lead: Duration) -> Result<Vec<Exchange>, StoreError> {
		Ok(sqlx::query_as(
			"SELECT * FROM exchanges
			WHERE status = 'PENDING' AND NOT reminded AND expires_at > $1 AND expires_at <= $2
				AND NOT (requester_posted AND acceptor_posted)",
		)
		.bind(now)
		.bind(now + lead)
		.fetch_all(&self.pool)
		.await?)
	}

	async fn mark_reminded(&self, id: Ulid) -> Result<bool, StoreError> {
		Ok(sqlx::query("UPDATE exchanges SET reminded = TRUE WHERE id = $1 AND NOT reminded")
			.bind(id)
			.execute(&self.pool)
			.await?
			.rows_affected()
			== 1)
	}

	async fn insert_rating(&self, rating: &Rating) -> Result<bool, StoreError> {
		let mut tx = self.pool.begin().await?;

		let inserted = sqlx::query(
			"INSERT INTO ratings (id, exchange_id, rater_id, rated_id, stars, comment, created_at)
			VALUES ($1, $2, $3, $4, $5, $6, $7)
			ON CONFLICT (exchange_id, rater_id) DO NOTHING",
		)
		.bind(rating.id)
		.bind(rating.exchange_id)
		.bind(rating.rater_id)
		.bind(rating.rated_id)
		.bind(rating.stars)
		.bind(&rating.comment)
		.bind(rating.created_at)
		.execute(&mut *tx)
		.await?;

		if inserted.rows_affected() != 1 {
			return Ok(false);
		}

		sqlx::query(
			"UPDATE users SET rating_sum = rating_sum + $2, rating_count = rating_count + 1, updated_at = $3 WHERE id = $1",
		)
		.bind(rating.rated_id)
		.bind(i64::from(rating.stars))
		.bind(rating.created_at)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;
		Ok(true)
	}

	async fn ratings_for_user(&self, user_id: Ulid) -> Result<Vec<Rating>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM ratings WHERE rated_id = $1 ORDER BY created_at DESC, id DESC")
			.bind(user_id)
			.fetch_all(&self.pool)
			.await?)
	}

	async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
		sqlx::query(
			"INSERT INTO notifications (id, user_id, kind, title, message, related_user_id, related_id, read, created_at)
			VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
		)
		.bind(notification.id)
		.bind(notification.user_id)
		.bind(notification.kind)
		.bind(&notification.title)
		.bind(&notification.message)
		.bind(notification.related_user_id)
		.bind(notification.related_id)
		.bind(notification.read)
		.bind(notification.created_at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	async fn notifications_for_user(
		&self,
		user_id: Ulid,
		unread_only: bool,
		limit: i64,
	) -> Result<Vec<Notification>, StoreError> {
		Ok(sqlx::query_as(
			"SELECT * FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT read)
			ORDER BY created_at DESC, id DESC LIMIT $3",
		)
		.bind(user_id)
		.bind(unread_only)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?)
	}

	async fn unread_count(&self, user_id: Ulid) -> Result<i64, StoreError> {
		Ok(
			sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT read")
				.bind(user_id)
				.fetch_one(&self.pool)
				.await?,
		)
	}

	async fn mark_notification_read(&self, id: Ulid, user_id: Ulid) -> Result<bool, StoreError> {
		Ok(sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
			.bind(id)
			.bind(user_id)
			.execute(&self.pool)
			.await?
			.rows_affected()
			== 1)
	}

	async fn mark_all_read(&self, user_id: Ulid) -> Result<u64, StoreError> {
		Ok(sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
			.bind(user_id)
			.execute(&self.pool)
			.await?
			.rows_affected())
	}

	async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
		sqlx::query(
			"INSERT INTO payments (
				id, user_id, order_id, gateway, billing_period, amount, currency, status,
				gateway_payment_id, failure_reason, created_at, processed_at
			) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
		)
		.bind(payment.id)
		.bind(payment.user_id)
		.bind(&payment.order_id)
		.bind(payment.gateway)
		.bind(payment.billing_period)
		.bind(payment.amount)
		.bind(&payment.currency)
		.bind(payment.status)
		.bind(&payment.gateway_payment_id)
		.bind(&payment.failure_reason)
		.bind(payment.created_at)
		.bind(payment.processed_at)
		.execute(&self.pool)
		.await
		.map_err(|err| duplicate(err, "order"))?;

		Ok(())
	}

	async fn payment_by_order(&self, order_id: &str) -> Result<Option<Payment>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
			.bind(order_id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn payments_for_user(&self, user_id: Ulid) -> Result<Vec<Payment>, StoreError> {
		Ok(sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
			.bind(user_id)
			.fetch_all(&self.pool)
			.await?)
	}

	async fn settle_payment(&self, payment: &Payment, now: DateTime<Utc>) -> Result<Option<User>, StoreError> {
		let mut tx = self.pool.begin().await?;

		let settled = sqlx::query(
			"UPDATE payments SET status = $2, gateway_payment_id = $3, failure_reason = $4, processed_at = $5
			WHERE order_id = $1 AND status = 'PENDING'",
		)
		.bind(&payment.order_id)
		.bind(payment.status)
		.bind(&payment.gateway_payment_id)
		.bind(&payment.failure_reason)
		.bind(payment.processed_at)
		.execute(&mut *tx)
		.await?;

		if settled.rows_affected() != 1 {
			return Ok(None);
		}

		let user: User = match payment.status {
			PaymentStatus::Completed => {
				sqlx::query_as(
					"UPDATE users SET
						plan = 'PRO',
						plan_expires_at = GREATEST(
							CASE WHEN plan = 'PRO' THEN COALESCE(plan_expires_at, $2) ELSE $2 END,
							$2
						) + $3,
						updated_at = $2
					WHERE id = $1
					RETURNING *",
				)
				.bind(payment.user_id)
				.bind(now)
				.bind(Duration::days(payment.billing_period.days()))
				.fetch_one(&mut *tx)
				.await?
			}
			_ => {
				sqlx::query_as("SELECT * FROM users WHERE id = $1")
					.bind(payment.user_id)
					.fetch_one(&mut *tx)
					.await?
			}
		};

		tx.commit().await?;
		Ok(Some(user))
	}

	async fn refund_payment(&self, payment: &Payment) -> Result<bool, StoreError> {
		Ok(sqlx::query(
			"UPDATE payments SET status = 'REFUNDED', processed_at = $2 WHERE order_id = $1 AND status = 'COMPLETED'",
		)
		.bind(&payment.order_id)
		.bind(payment.processed_at)
		.execute(&self.pool)
		.await?
		.rows_affected()
			== 1)
	}
}
