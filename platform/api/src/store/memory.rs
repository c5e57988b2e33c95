use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::{AcceptOutcome, IssuedStrike, MediaDeletion, Store, StoreError};
use crate::database::{
	BannedIdentity, Exchange, ExchangeStatus, MediaItem, Notification, Payment, PaymentStatus, Plan, Rating, RequestStatus,
	Session, ShoutoutRequest, Side, Strike, Ulid, User,
};

#[derive(Default)]
struct Tables {
	users: HashMap<Ulid, User>,
	banned_identities: HashMap<String, BannedIdentity>,
	sessions: HashMap<Ulid, Session>,
	media: HashMap<Ulid, MediaItem>,
	requests: HashMap<Ulid, ShoutoutRequest>,
	exchanges: HashMap<Ulid, Exchange>,
	ratings: Vec<Rating>,
	strikes: Vec<Strike>,
	notifications: HashMap<Ulid, Notification>,
	payments: HashMap<String, Payment>,
}

/// A store that keeps everything in process memory.
///
/// All tables sit behind one lock, which makes every method trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
	tables: Mutex<Tables>,
}

impl MemoryStore {
	fn lock(&self) -> MutexGuard<'_, Tables> {
		self.tables.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Charges one unit of a daily counter, `None` when it is used up.
fn charge(counter: &mut i32, limit: i32) -> Option<()> {
	if *counter >= limit {
		return None;
	}

	*counter += 1;
	Some(())
}

fn newest_first<T>(mut items: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, Ulid)) -> Vec<T> {
	items.sort_by_key(|item| std::cmp::Reverse(key(item)));
	items
}

#[async_trait::async_trait]
impl Store for MemoryStore {
	async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
		let mut tables = self.lock();

		if tables.users.values().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
			return Err(StoreError::Duplicate("username"));
		}

		if tables.users.values().any(|u| u.social_id == user.social_id) {
			return Err(StoreError::Duplicate("social identity"));
		}

		tables.users.insert(user.id, user.clone());
		Ok(())
	}

	async fn user_by_id(&self, id: Ulid) -> Result<Option<User>, StoreError> {
		Ok(self.lock().users.get(&id).cloned())
	}

	async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		Ok(self
			.lock()
			.users
			.values()
			.find(|u| u.username.eq_ignore_ascii_case(username))
			.cloned())
	}

	async fn is_identity_banned(&self, social_id: &str) -> Result<bool, StoreError> {
		Ok(self.lock().banned_identities.contains_key(social_id))
	}

	async fn reset_daily_counters(&self, today: NaiveDate) -> Result<u64, StoreError> {
		let mut tables = self.lock();
		let mut reset = 0;

		for user in tables.users.values_mut().filter(|u| u.counter_day < today) {
			user.roll_counters(today);
			reset += 1;
		}

		Ok(reset)
	}

	async fn downgrade_lapsed_plans(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
		let mut tables = self.lock();
		let mut downgraded = 0;

		for user in tables.users.values_mut() {
			if user.plan == Plan::Pro && user.effective_plan(now) == Plan::Basic {
				user.plan = Plan::Basic;
				user.plan_expires_at = None;
				user.updated_at = now;
				downgraded += 1;
			}
		}

		Ok(downgraded)
	}

	async fn strikes_for_user(&self, user_id: Ulid) -> Result<Vec<Strike>, StoreError> {
		let strikes = self.lock().strikes.iter().filter(|s| s.user_id == user_id).cloned().collect();
		Ok(newest_first(strikes, |s| (s.created_at, s.id)))
	}

	async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
		self.lock().sessions.insert(session.id, session.clone());
		Ok(())
	}

	async fn session_by_id(&self, id: Ulid) -> Result<Option<Session>, StoreError> {
		Ok(self.lock().sessions.get(&id).cloned())
	}

	async fn touch_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<(), StoreError> {
		if let Some(session) = self.lock().sessions.get_mut(&id) {
			session.last_used_at = now;
		}

		Ok(())
	}

	async fn invalidate_session(&self, id: Ulid, now: DateTime<Utc>) -> Result<bool, StoreError> {
		let mut tables = self.lock();
		match tables.sessions.get_mut(&id) {
			Some(session) if session.invalidated_at.is_none() => {
				session.invalidated_at = Some(now);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn media_for_user(&self, user_id: Ulid) -> Result<Vec<MediaItem>, StoreError> {
		let mut media = self
			.lock()
			.media
			.values()
			.filter(|m| m.user_id == user_id)
			.cloned()
			.collect::<Vec<_>>();
		media.sort_by_key(|m| (m.created_at, m.id));
		Ok(media)
	}

	async fn media_by_id(&self, id: Ulid) -> Result<Option<MediaItem>, StoreError> {
		Ok(self.lock().media.get(&id).cloned())
	}

	async fn insert_media(&self, item: &MediaItem, max: usize) -> Result<bool, StoreError> {
		let mut tables = self.lock();

		if tables.media.values().filter(|m| m.user_id == item.user_id).count() >= max {
			return Ok(false);
		}

		tables.media.insert(item.id, item.clone());
		Ok(true)
	}

	async fn delete_media(&self, id: Ulid, user_id: Ulid, min: usize) -> Result<MediaDeletion, StoreError> {
		let mut tables = self.lock();

		if !tables.media.get(&id).is_some_and(|m| m.user_id == user_id) {
			return Ok(MediaDeletion::NotFound);
		}

		if tables.media.values().filter(|m| m.user_id == user_id).count() <= min {
			return Ok(MediaDeletion::LastItem);
		}

		tables.media.remove(&id);
		Ok(MediaDeletion::Deleted)
	}

	async fn create_request(&self, request: &ShoutoutRequest, now: DateTime<Utc>, limit: i32) -> Result<bool, StoreError> {
		let mut tables = self.lock();

		let Some(sender) = tables.users.get_mut(&request.sender_id) else {
			return Ok(false);
		};

		sender.roll_counters(now.date_naive());
		if charge(&mut sender.requests_sent_today, limit).is_none() {
			return Ok(false);
		}
		sender.updated_at = now;

		tables.requests.insert(request.id, request.clone());
		Ok(true)
	}

	async fn request_by_id(&self, id: Ulid) -> Result<Option<ShoutoutRequest>, StoreError> {
		Ok(self.lock().requests.get(&id).cloned())
	}

	async fn requests_sent(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError> {
		let requests = self
			.lock()
			.requests
			.values()
			.filter(|r| r.sender_id == user_id)
			.cloned()
			.collect();
		Ok(newest_first(requests, |r| (r.created_at, r.id)))
	}

	async fn requests_received(&self, user_id: Ulid) -> Result<Vec<ShoutoutRequest>, StoreError> {
		let requests = self
			.lock()
			.requests
			.values()
			.filter(|r| r.receiver_id == user_id)
			.cloned()
			.collect();
		Ok(newest_first(requests, |r| (r.created_at, r.id)))
	}

	async fn accept_request(
		&self,
		request: &ShoutoutRequest,
		exchange: &Exchange,
		now: DateTime<Utc>,
		limit: i32,
	) -> Result<AcceptOutcome, StoreError> {
		let mut tables = self.lock();

		if !tables
			.requests
			.get(&request.id)
			.is_some_and(|r| r.status == RequestStatus::Pending && r.expires_at > now)
		{
			return Ok(AcceptOutcome::NotPending);
		}

		let Some(receiver) = tables.users.get_mut(&request.receiver_id) else {
			return Ok(AcceptOutcome::NotPending);
		};

		receiver.roll_counters(now.date_naive());
		if charge(&mut receiver.requests_accepted_today, limit).is_none() {
			return Ok(AcceptOutcome::QuotaExceeded);
		}
		receiver.updated_at = now;

		tables.requests.insert(request.id, request.clone());
		tables.exchanges.insert(exchange.id, exchange.clone());

		Ok(AcceptOutcome::Accepted)
	}

	async fn transition_request(
		&self,
		id: Ulid,
		from: RequestStatus,
		to: RequestStatus,
		now: DateTime<Utc>,
	) -> Result<bool, StoreError> {
		let mut tables = self.lock();

		match tables.requests.get_mut(&id) {
			Some(request) if request.status == from => {
				request.status = to;
				request.responded_at.get_or_insert(now);
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn expire_overdue_requests(&self, now: DateTime<Utc>) -> Result<Vec<ShoutoutRequest>, StoreError> {
		let mut tables = self.lock();

		Ok(tables
			.requests
			.values_mut()
			.filter_map(|request| request.expire(now).then(|| request.clone()))
			.collect())
	}

	async fn exchange_by_id(&self, id: Ulid) -> Result<Option<Exchange>, StoreError> {
		Ok(self.lock().exchanges.get(&id).cloned())
	}

	async fn exchanges_for_user(&self, user_id: Ulid) -> Result<Vec<Exchange>, StoreError> {
		let exchanges = self
			.lock()
			.exchanges
			.values()
			.filter(|e| e.side_of(user_id).is_some())
			.cloned()
			.collect();
		Ok(newest_first(exchanges, |e| (e.accepted_at, e.id)))
	}

	async fn record_proof(
		&self,
		id: Ulid,
		side: Side,
		url: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Exchange>, StoreError> {
		let mut tables = self.lock();

		let Some(exchange) = tables.exchanges.get_mut(&id) else {
			return Ok(None);
		};

		if exchange.status != ExchangeStatus::Pending || exchange.is_overdue(now) || exchange.has_posted(side) {
			return Ok(None);
		}

		exchange.record_proof(side, url.to_string(), now);
		let exchange = exchange.clone();

		if exchange.status == ExchangeStatus::Completed {
			if let Some(request) = tables.requests.get_mut(&exchange.request_id) {
				if request.status == RequestStatus::Accepted {
					request.status = RequestStatus::Completed;
				}
			}
		}

		Ok(Some(exchange))
	}

	async fn overdue_exchanges(&self, now: DateTime<Utc>) -> Result<Vec<Exchange>, StoreError> {
		Ok(self
			.lock()
			.exchanges
			.values()
			.filter(|e| e.is_overdue(now))
			.cloned()
			.collect())
	}

	async fn settle_exchange(
		&self,
		exchange: &Exchange,
		offenders: &[Ulid],
		reason: &str,
		now: DateTime<Utc>,
	) -> Result<Option<Vec<IssuedStrike>>, StoreError> {
		let mut tables = self.lock();

		if !tables
			.exchanges
			.get(&exchange.id)
			.is_some_and(|e| e.status == ExchangeStatus::Pending)
		{
			return Ok(None);
		}

		tables.exchanges.insert(exchange.id, exchange.clone());

		if let Some(request) = tables.requests.get_mut(&exchange.request_id) {
			if request.status == RequestStatus::Accepted {
				request.status = RequestStatus::Expired;
			}
		}

		let mut issued = Vec::with_capacity(offenders.len());
		for user_id in offenders {
			let Some(user) = tables.users.get_mut(user_id) else {
				continue;
			};

			let Some(outcome) = user.add_strike(now) else {
				continue;
			};
			let user = user.clone();

			let strike = Strike {
				id: Ulid::new(),
				user_id: user.id,
				exchange_id: Some(exchange.id),
				reason: reason.to_string(),
				strike_number: outcome.strike_number,
				created_at: now,
			};
			tables.strikes.push(strike.clone());

			if outcome.banned {
				tables.banned_identities.insert(
					user.social_id.clone(),
					BannedIdentity {
						social_id: user.social_id.clone(),
						user_id: user.id,
						banned_at: now,
					},
				);
			}

			issued.push(IssuedStrike {
				user,
				strike,
				banned: outcome.banned,
			});
		}

		Ok(Some(issued))
	}

	async fn exchanges_due_reminder(&self, now: DateTime<Utc>, lead: Duration) -> Result<Vec<Exchange>, StoreError> {
		Ok(self
			.lock()
			.exchanges
			.values()
			.filter(|e| e.needs_reminder(now, lead))
			.cloned()
			.collect())
	}

	async fn mark_reminded(&self, id: Ulid) -> Result<bool, StoreError> {
		let mut tables = self.lock();
		match tables.exchanges.get_mut(&id) {
			Some(exchange) if !exchange.reminded => {
				exchange.reminded = true;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn insert_rating(&self, rating: &Rating) -> Result<bool, StoreError> {
		let mut tables = self.lock();

		if tables
			.ratings
			.iter()
			.any(|r| r.exchange_id == rating.exchange_id && r.rater_id == rating.rater_id)
		{
			return Ok(false);
		}

		if let Some(rated) = tables.users.get_mut(&rating.rated_id) {
			rated.apply_rating(rating.stars, rating.created_at);
		}

		tables.ratings.push(rating.clone());
		Ok(true)
	}

	async fn ratings_for_user(&self, user_id: Ulid) -> Result<Vec<Rating>, StoreError> {
		let ratings = self.lock().ratings.iter().filter(|r| r.rated_id == user_id).cloned().collect();
		Ok(newest_first(ratings, |r| (r.created_at, r.id)))
	}

	async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
		self.lock().notifications.insert(notification.id, notification.clone());
		Ok(())
	}

	async fn notifications_for_user(
		&self,
		user_id: Ulid,
		unread_only: bool,
		limit: i64,
	) -> Result<Vec<Notification>, StoreError> {
		let notifications = self
			.lock()
			.notifications
			.values()
			.filter(|n| n.user_id == user_id && (!unread_only || !n.read))
			.cloned()
			.collect();

		let mut notifications = newest_first(notifications, |n| (n.created_at, n.id));
		notifications.truncate(usize::try_from(limit).unwrap_or(0));
		Ok(notifications)
	}

	async fn unread_count(&self, user_id: Ulid) -> Result<i64, StoreError> {
		Ok(self
			.lock()
			.notifications
			.values()
			.filter(|n| n.user_id == user_id && !n.read)
			.count() as i64)
	}

	async fn mark_notification_read(&self, id: Ulid, user_id: Ulid) -> Result<bool, StoreError> {
		let mut tables = self.lock();
		match tables.notifications.get_mut(&id) {
			Some(notification) if notification.user_id == user_id => {
				notification.read = true;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	async fn mark_all_read(&self, user_id: Ulid) -> Result<u64, StoreError> {
		let mut tables = self.lock();
		let mut marked = 0;

		for notification in tables.notifications.values_mut() {
			if notification.user_id == user_id && !notification.read {
				notification.read = true;
				marked += 1;
			}
		}

		Ok(marked)
	}

	async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
		let mut tables = self.lock();

		if tables.payments.contains_key(&payment.order_id) {
			return Err(StoreError::Duplicate("order"));
		}

		tables.payments.insert(payment.order_id.clone(), payment.clone());
		Ok(())
	}

	async fn payment_by_order(&self, order_id: &str) -> Result<Option<Payment>, StoreError> {
		Ok(self.lock().payments.get(order_id).cloned())
	}

	async fn payments_for_user(&self, user_id: Ulid) -> Result<Vec<Payment>, StoreError> {
		let payments = self
			.lock()
			.payments
			.values()
			.filter(|p| p.user_id == user_id)
			.cloned()
			.collect();
		Ok(newest_first(payments, |p| (p.created_at, p.id)))
	}

	async fn settle_payment(&self, payment: &Payment, now: DateTime<Utc>) -> Result<Option<User>, StoreError> {
		let mut tables = self.lock();

		if !tables
			.payments
			.get(&payment.order_id)
			.is_some_and(|p| p.status == PaymentStatus::Pending)
		{
			return Ok(None);
		}

		let Some(user) = tables.users.get_mut(&payment.user_id) else {
			return Ok(None);
		};

		if payment.status == PaymentStatus::Completed {
			user.extend_pro(payment.billing_period, now);
		}
		let user = user.clone();

		tables.payments.insert(payment.order_id.clone(), payment.clone());

		Ok(Some(user))
	}

	async fn refund_payment(&self, payment: &Payment) -> Result<bool, StoreError> {
		let mut tables = self.lock();

		match tables.payments.get_mut(&payment.order_id) {
			Some(stored) if stored.status == PaymentStatus::Completed => {
				stored.status = PaymentStatus::Refunded;
				stored.processed_at = payment.processed_at;
				Ok(true)
			}
			_ => Ok(false),
		}
	}
}
