use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::database::{
	AccountType, BillingPeriod, Exchange, ExchangeStatus, MediaItem, MediaKind, Payment, PaymentGateway, PaymentStatus, Plan,
	Rating, RequestStatus, ShoutoutRequest, Side, Ulid, User, MAX_STRIKES,
};
use crate::error::ExchangeError;

fn now() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn user(name: &str, plan: Plan) -> User {
	User {
		id: Ulid::new(),
		username: name.to_string(),
		social_id: format!("ig:{name}"),
		password_hash: String::new(),
		follower_count: 1000,
		account_type: AccountType::Creator,
		plan,
		plan_expires_at: match plan {
			Plan::Basic => None,
			Plan::Pro => Some(now() + Duration::days(30)),
		},
		rating_sum: 0,
		rating_count: 0,
		strike_count: 0,
		banned: false,
		banned_at: None,
		requests_sent_today: 0,
		requests_accepted_today: 0,
		counter_day: now().date_naive(),
		created_at: now(),
		updated_at: now(),
	}
}

fn media(owner: &User, kind: MediaKind) -> MediaItem {
	MediaItem {
		id: Ulid::new(),
		user_id: owner.id,
		url: "https://cdn.example.com/a.jpg".to_string(),
		kind,
		created_at: now(),
	}
}

fn accepted_pair() -> (User, User, ShoutoutRequest, Exchange) {
	let mut alice = user("alice", Plan::Basic);
	let mut bob = user("bob", Plan::Basic);
	let item = media(&alice, MediaKind::Story);

	let offer = media(&bob, MediaKind::Story);

	let mut request = ShoutoutRequest::open(&mut alice, &bob, &item, None, now(), Duration::hours(24)).unwrap();
	let exchange = request.accept(&mut bob, &alice, &offer, now(), Duration::hours(24)).unwrap();

	(alice, bob, request, exchange)
}

#[test]
fn pro_sender_gets_fifty_requests_a_day() {
	let mut sender = user("sender", Plan::Pro);
	let receiver = user("receiver", Plan::Basic);
	let reel = media(&sender, MediaKind::Reel);
	sender.requests_sent_today = 49;

	let request = ShoutoutRequest::open(&mut sender, &receiver, &reel, None, now(), Duration::hours(24)).unwrap();
	assert_eq!(request.media_kind, MediaKind::Reel);
	assert_eq!(sender.requests_sent_today, 50);
	assert_eq!(sender.remaining_requests(now()), 0);

	let err = ShoutoutRequest::open(&mut sender, &receiver, &reel, None, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::QuotaExceeded { limit: 50 }));
	assert_eq!(sender.requests_sent_today, 50);
}

#[test]
fn counters_roll_over_at_utc_midnight() {
	let mut sender = user("sender", Plan::Basic);
	sender.requests_sent_today = 10;
	sender.requests_accepted_today = 4;

	assert!(sender.check_quota(QuotaKind::Send, now()).is_err());
	assert!(sender.check_quota(QuotaKind::Accept, now()).is_ok());

	let tomorrow = now() + Duration::hours(12);
	assert_eq!(sender.remaining(QuotaKind::Send, tomorrow), 10);

	sender.try_reserve(QuotaKind::Send, tomorrow).unwrap();
	assert_eq!(sender.counter_day, tomorrow.date_naive());
	assert_eq!(sender.requests_sent_today, 1);
	assert_eq!(sender.requests_accepted_today, 0);
}

#[test]
fn lapsed_pro_counts_as_basic() {
	let mut pro = user("pro", Plan::Pro);
	assert_eq!(pro.daily_limit(now()), 50);

	pro.plan_expires_at = Some(now());
	assert_eq!(pro.effective_plan(now()), Plan::Basic);
	assert_eq!(pro.daily_limit(now()), 10);
}

#[test]
fn basic_plan_only_offers_stories() {
	let mut sender = user("sender", Plan::Basic);
	let receiver = user("receiver", Plan::Basic);

	for kind in [MediaKind::Post, MediaKind::Reel] {
		let item = media(&sender, kind);
		let err = ShoutoutRequest::open(&mut sender, &receiver, &item, None, now(), Duration::hours(24)).unwrap_err();
		assert!(matches!(err, ExchangeError::MediaNotAllowed { plan: Plan::Basic, .. }));
	}

	// refused requests do not consume quota
	assert_eq!(sender.requests_sent_today, 0);

	let story = media(&sender, MediaKind::Story);
	let request = ShoutoutRequest::open(
		&mut sender,
		&receiver,
		&story,
		Some("  hi  ".to_string()),
		now(),
		Duration::hours(24),
	)
	.unwrap();
	assert_eq!(request.media_kind, MediaKind::Story);
	assert_eq!(request.message.as_deref(), Some("hi"));
	assert_eq!(request.expires_at, now() + Duration::hours(24));
}

#[test]
fn request_preconditions() {
	let mut sender = user("sender", Plan::Basic);
	let mut receiver = user("receiver", Plan::Basic);
	let item = media(&sender, MediaKind::Story);

	let myself = sender.clone();
	let err = ShoutoutRequest::open(&mut sender, &myself, &item, None, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::Validation(_)));

	let foreign = media(&receiver, MediaKind::Story);
	let err = ShoutoutRequest::open(&mut sender, &receiver, &foreign, None, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotFound));

	let err = ShoutoutRequest::open(&mut sender, &receiver, &item, Some("x".repeat(MAX_MESSAGE_LEN + 1)), now(), Duration::hours(24))
		.unwrap_err();
	assert!(matches!(err, ExchangeError::Validation(_)));

	receiver.ban(now());
	let err = ShoutoutRequest::open(&mut sender, &receiver, &item, None, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::RecipientUnavailable));

	sender.ban(now());
	let err = ShoutoutRequest::open(&mut sender, &receiver, &item, None, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::AccountSuspended));
}

#[test]
fn only_the_receiver_answers_a_pending_request() {
	let mut alice = user("alice", Plan::Basic);
	let mut bob = user("bob", Plan::Basic);
	let item = media(&alice, MediaKind::Story);
	let offer = media(&bob, MediaKind::Story);
	let mut request = ShoutoutRequest::open(&mut alice, &bob, &item, None, now(), Duration::hours(24)).unwrap();

	let err = request.accept(&mut alice.clone(), &alice, &offer, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::NotReceiver));

	request.reject(&bob, now()).unwrap();
	assert_eq!(request.status, RequestStatus::Rejected);

	let err = request.accept(&mut bob, &alice, &offer, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::RequestNotPending(RequestStatus::Rejected)));
	assert_eq!(bob.requests_accepted_today, 0);
}

#[test]
fn accepting_opens_the_exchange() {
	let (alice, bob, request, exchange) = accepted_pair();

	assert_eq!(request.status, RequestStatus::Accepted);
	assert_eq!(request.exchange_id, Some(exchange.id));
	assert_eq!(bob.requests_accepted_today, 1);
	assert_eq!(exchange.requester_id, alice.id);
	assert_eq!(exchange.acceptor_id, bob.id);
	assert_eq!(exchange.status, ExchangeStatus::Pending);
	assert_eq!(exchange.expires_at, now() + Duration::hours(24));
	assert_eq!(exchange.missing_sides(), vec![Side::Requester, Side::Acceptor]);
	assert_eq!(exchange.requester_media_id, request.media_id);
	assert_eq!(exchange.acceptor_media_kind, MediaKind::Story);
}

#[test]
fn acceptor_offers_own_allowed_media() {
	let mut alice = user("alice", Plan::Basic);
	let mut bob = user("bob", Plan::Basic);
	let item = media(&alice, MediaKind::Story);
	let mut request = ShoutoutRequest::open(&mut alice, &bob, &item, None, now(), Duration::hours(24)).unwrap();

	let err = request.accept(&mut bob, &alice, &item, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotFound));

	let reel = media(&bob, MediaKind::Reel);
	let err = request.accept(&mut bob, &alice, &reel, now(), Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotAllowed { plan: Plan::Basic, kind: MediaKind::Reel }));

	// refused offers leave the request open and the quota untouched
	assert_eq!(request.status, RequestStatus::Pending);
	assert_eq!(bob.requests_accepted_today, 0);

	bob.plan = Plan::Pro;
	bob.plan_expires_at = Some(now() + Duration::days(30));
	let exchange = request.accept(&mut bob, &alice, &reel, now(), Duration::hours(24)).unwrap();
	assert_eq!(exchange.acceptor_media_id, reel.id);
	assert_eq!(exchange.acceptor_media_kind, MediaKind::Reel);
}

#[test]
fn overdue_request_cannot_be_accepted() {
	let mut alice = user("alice", Plan::Basic);
	let mut bob = user("bob", Plan::Basic);
	let item = media(&alice, MediaKind::Story);
	let offer = media(&bob, MediaKind::Story);
	let mut request = ShoutoutRequest::open(&mut alice, &bob, &item, None, now(), Duration::hours(24)).unwrap();

	let later = now() + Duration::hours(24);
	assert!(request.is_overdue(later));

	let err = request.accept(&mut bob, &alice, &offer, later, Duration::hours(24)).unwrap_err();
	assert!(matches!(err, ExchangeError::RequestExpired));

	assert!(request.expire(later));
	assert!(!request.expire(later));
	assert_eq!(request.status, RequestStatus::Expired);
}

#[test]
fn exchange_completes_when_both_sides_post() {
	let (alice, bob, _, mut exchange) = accepted_pair();
	let at = now() + Duration::hours(3);

	let side = exchange.submit_proof(bob.id, "https://instagram.com/p/1".to_string(), at).unwrap();
	assert_eq!(side, Side::Acceptor);
	assert_eq!(exchange.status, ExchangeStatus::Pending);

	let err = exchange.submit_proof(bob.id, "https://instagram.com/p/2".to_string(), at).unwrap_err();
	assert!(matches!(err, ExchangeError::AlreadyPosted));

	let err = exchange.submit_proof(Ulid::new(), "https://instagram.com/p/3".to_string(), at).unwrap_err();
	assert!(matches!(err, ExchangeError::NotParticipant));

	let err = exchange.submit_proof(alice.id, "not a url".to_string(), at).unwrap_err();
	assert!(matches!(err, ExchangeError::Validation(_)));

	exchange.submit_proof(alice.id, "https://instagram.com/p/4".to_string(), at).unwrap();
	assert_eq!(exchange.status, ExchangeStatus::Completed);
	assert_eq!(exchange.completed_at, Some(at));
	assert!(exchange.requester_posted && exchange.acceptor_posted);

	// a completed exchange is never settled
	assert!(exchange.settle(now() + Duration::days(3)).is_none());
}

#[test]
fn proof_after_the_deadline_is_refused() {
	let (alice, _, _, mut exchange) = accepted_pair();

	let err = exchange
		.submit_proof(alice.id, "https://instagram.com/p/1".to_string(), exchange.expires_at)
		.unwrap_err();
	assert!(matches!(err, ExchangeError::ExchangeExpired));
}

#[test]
fn settling_blames_only_the_missing_side() {
	let (_, bob, _, mut exchange) = accepted_pair();
	exchange
		.submit_proof(bob.id, "https://instagram.com/p/1".to_string(), now() + Duration::hours(1))
		.unwrap();

	assert!(exchange.settle(now() + Duration::hours(23)).is_none());

	let deadline = exchange.expires_at;
	assert_eq!(exchange.settle(deadline), Some(vec![Side::Requester]));
	assert_eq!(exchange.status, ExchangeStatus::Expired);
	assert_eq!(exchange.settled_at, Some(deadline));

	// only once
	assert!(exchange.settle(deadline + Duration::hours(1)).is_none());
}

#[test]
fn reminder_is_due_inside_the_lead_only() {
	let (_, _, _, mut exchange) = accepted_pair();
	let lead = Duration::hours(2);

	assert!(!exchange.needs_reminder(now() + Duration::hours(21), lead));
	assert!(exchange.needs_reminder(now() + Duration::hours(22), lead));
	assert!(!exchange.needs_reminder(exchange.expires_at, lead));

	exchange.reminded = true;
	assert!(!exchange.needs_reminder(now() + Duration::hours(23), lead));
}

#[test]
fn strikes_saturate_and_ban() {
	let mut offender = user("offender", Plan::Basic);

	let first = offender.add_strike(now()).unwrap();
	assert_eq!(first, StrikeOutcome { strike_number: 1, banned: false });

	let second = offender.add_strike(now()).unwrap();
	assert!(!second.banned);
	assert!(offender.ensure_active().is_ok());

	let third = offender.add_strike(now()).unwrap();
	assert_eq!(third, StrikeOutcome { strike_number: MAX_STRIKES, banned: true });
	assert!(offender.banned);
	assert_eq!(offender.banned_at, Some(now()));
	assert!(matches!(offender.ensure_active(), Err(ExchangeError::AccountSuspended)));

	assert!(offender.add_strike(now() + Duration::days(1)).is_none());
	assert_eq!(offender.strike_count, MAX_STRIKES);
	assert_eq!(offender.banned_at, Some(now()));
}

#[test]
fn ratings_need_a_completed_exchange() {
	let (alice, bob, _, mut exchange) = accepted_pair();

	let err = Rating::submit(&exchange, alice.id, 5, None, now()).unwrap_err();
	assert!(matches!(err, ExchangeError::ExchangeNotCompleted));

	exchange.submit_proof(alice.id, "https://x.com/1".to_string(), now()).unwrap();
	exchange.submit_proof(bob.id, "https://x.com/2".to_string(), now()).unwrap();

	for stars in [0, 6] {
		assert!(matches!(
			Rating::submit(&exchange, alice.id, stars, None, now()),
			Err(ExchangeError::Validation(_))
		));
	}

	let rating = Rating::submit(&exchange, alice.id, 2, Some("late".to_string()), now()).unwrap();
	assert_eq!(rating.rated_id, bob.id);
	assert!(rating.is_low());

	let mut bob = bob;
	bob.apply_rating(2, now());
	bob.apply_rating(5, now());
	assert_eq!(bob.rating(), 3.5);
}

#[test]
fn media_library_limits() {
	let basic = user("basic", Plan::Basic);

	let err = MediaItem::upload(&basic, "https://x.com/r.mp4".to_string(), MediaKind::Reel, 0, now()).unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotAllowed { .. }));

	let err = MediaItem::upload(&basic, "https://x.com/s.jpg".to_string(), MediaKind::Story, 3, now()).unwrap_err();
	assert!(matches!(err, ExchangeError::MediaLimit { min: 1, max: 3 }));

	let item = MediaItem::upload(&basic, "https://x.com/s.jpg".to_string(), MediaKind::Story, 2, now()).unwrap();
	assert!(matches!(item.ensure_removable(basic.id, 1), Err(ExchangeError::MediaLimit { .. })));
	assert!(matches!(item.ensure_removable(Ulid::new(), 2), Err(ExchangeError::NotOwner)));
	assert!(item.ensure_removable(basic.id, 2).is_ok());
}

#[test]
fn payment_signature_matches_gateway_format() {
	let signature = payment_signature("secret", "order_1", "pay_1");
	assert_eq!(signature.len(), 64);
	assert!(verify_payment_signature("secret", "order_1", "pay_1", &signature));
	assert!(!verify_payment_signature("secret", "order_1", "pay_2", &signature));
	assert!(!verify_payment_signature("other", "order_1", "pay_1", &signature));
	assert!(!verify_payment_signature("secret", "order_1", "pay_1", "zz"));

	assert_eq!("CAPTURED".parse::<CallbackStatus>().unwrap(), CallbackStatus::Success);
	assert_eq!("failed".parse::<CallbackStatus>().unwrap(), CallbackStatus::Failed);
	assert!("pending".parse::<CallbackStatus>().is_err());
}

#[test]
fn pro_extends_from_current_expiry() {
	let mut buyer = user("buyer", Plan::Basic);
	let mut payment = Payment::initiate(&buyer, BillingPeriod::Monthly, PaymentGateway::Upi, 49900, "INR", now()).unwrap();
	assert!(payment.order_id.starts_with("order_"));
	assert_eq!(payment.status, PaymentStatus::Pending);

	payment.complete("pay_1".to_string(), now());
	buyer.extend_pro(payment.billing_period, now());
	assert_eq!(buyer.plan, Plan::Pro);
	assert_eq!(buyer.plan_expires_at, Some(now() + Duration::days(30)));

	buyer.extend_pro(BillingPeriod::Yearly, now() + Duration::days(10));
	assert_eq!(buyer.plan_expires_at, Some(now() + Duration::days(30 + 365)));

	let err = payment.refund(Ulid::new(), now()).unwrap_err();
	assert!(matches!(err, ExchangeError::NotOwner));
	payment.refund(buyer.id, now()).unwrap();
	assert!(matches!(
		payment.refund(buyer.id, now()),
		Err(ExchangeError::PaymentNotRefundable(PaymentStatus::Refunded))
	));
}
