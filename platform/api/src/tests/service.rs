use chrono::Duration;

use super::global::{epoch, mock_global_state, notification_kinds, onboard};
use crate::config::AppConfig;
use crate::database::{
	BillingPeriod, ExchangeStatus, MediaKind, NotificationKind, PaymentGateway, PaymentStatus, Plan, RequestStatus, Ulid, MAX_STRIKES,
};
use crate::error::ExchangeError;
use crate::global::GlobalState;
use crate::lifecycle::{payment_signature, NewUser};
use crate::service::payments::{CallbackInput, NewPayment};
use crate::service::requests::{Mailbox, NewRequest};
use crate::service::{exchanges, media, notifications, payments, requests, users};

fn new_request(receiver_id: Ulid, media_id: Ulid) -> NewRequest {
	NewRequest {
		receiver_id,
		media_id,
		message: Some("Let's swap stories".to_string()),
	}
}

fn signed_callback(global: &GlobalState, order_id: &str, gateway_payment_id: &str, status: &str) -> CallbackInput {
	CallbackInput {
		order_id: Some(order_id.to_string()),
		gateway_payment_id: Some(gateway_payment_id.to_string()),
		status: Some(status.to_string()),
		signature: Some(payment_signature(
			&global.config().payment.callback_secret,
			order_id,
			gateway_payment_id,
		)),
		reason: None,
	}
}

#[tokio::test]
async fn test_exchange_happy_path() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;

	let request = requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();
	assert_eq!(request.status, RequestStatus::Pending);
	assert!(notification_kinds(&global, &bob).await.contains(&NotificationKind::RequestReceived));

	let received = requests::list(&global, bob.id, Mailbox::Received, now).await.unwrap();
	assert_eq!(received.len(), 1);
	assert!(requests::list(&global, bob.id, Mailbox::Sent, now).await.unwrap().is_empty());

	let at = now + Duration::hours(1);
	let err = requests::accept(&global, bob.id, request.id, story.id, at).await.unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotFound));
	assert_eq!(
		requests::get(&global, bob.id, request.id, at).await.unwrap().status,
		RequestStatus::Pending
	);

	let (request, exchange) = requests::accept(&global, bob.id, request.id, bob_story.id, at).await.unwrap();
	assert_eq!(request.status, RequestStatus::Accepted);
	assert_eq!(exchange.requester_media_id, story.id);
	assert_eq!(exchange.acceptor_media_id, bob_story.id);
	assert_eq!(exchange.acceptor_media_kind, MediaKind::Story);
	assert_eq!(exchange.expires_at, at + Duration::hours(24));
	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::RequestAccepted));

	let at = now + Duration::hours(2);
	let exchange = exchanges::submit_proof(&global, alice.id, exchange.id, "https://instagram.com/p/a".to_string(), at)
		.await
		.unwrap();
	assert_eq!(exchange.status, ExchangeStatus::Pending);
	assert!(notification_kinds(&global, &bob).await.contains(&NotificationKind::ProofPosted));

	let err = exchanges::submit_proof(&global, alice.id, exchange.id, "https://instagram.com/p/b".to_string(), at)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::AlreadyPosted));

	let exchange = exchanges::submit_proof(&global, bob.id, exchange.id, "https://instagram.com/p/c".to_string(), at)
		.await
		.unwrap();
	assert_eq!(exchange.status, ExchangeStatus::Completed);
	for user in [&alice, &bob] {
		assert!(notification_kinds(&global, user).await.contains(&NotificationKind::ExchangeCompleted));
	}

	let rating = exchanges::rate(&global, alice.id, exchange.id, 1, Some("late story".to_string()), at)
		.await
		.unwrap();
	assert_eq!(rating.rated_id, bob.id);
	assert!(notification_kinds(&global, &bob).await.contains(&NotificationKind::LowRating));

	let err = exchanges::rate(&global, alice.id, exchange.id, 5, None, at).await.unwrap_err();
	assert!(matches!(err, ExchangeError::AlreadyRated));

	let bob = users::profile(&global, bob.id).await.unwrap();
	assert_eq!(bob.rating_count, 1);
	assert_eq!(bob.rating(), 1.0);
	assert_eq!(exchanges::ratings(&global, bob.id).await.unwrap().len(), 1);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_concurrent_accepts_open_one_exchange() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;
	let request = requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();

	let (bob_id, request_id, offered) = (bob.id, request.id, bob_story.id);
	let attempts = (0..8)
		.map(|_| {
			let global = global.clone();
			tokio::spawn(async move { requests::accept(&global, bob_id, request_id, offered, now).await })
		})
		.collect::<Vec<_>>();

	let mut accepted = 0;
	for attempt in attempts {
		match attempt.await.unwrap() {
			Ok(_) => accepted += 1,
			Err(ExchangeError::RequestNotPending(RequestStatus::Accepted)) => {}
			Err(err) => panic!("unexpected error: {err}"),
		}
	}

	assert_eq!(accepted, 1);
	assert_eq!(exchanges::list(&global, bob.id, now).await.unwrap().len(), 1);

	let bob = users::profile(&global, bob.id).await.unwrap();
	assert_eq!(bob.requests_accepted_today, 1);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_request_expires_lazily() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;
	let request = requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();

	let later = now + Duration::hours(24);
	let request = requests::get(&global, alice.id, request.id, later).await.unwrap();
	assert_eq!(request.status, RequestStatus::Expired);
	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::RequestExpired));

	let err = requests::accept(&global, bob.id, request.id, bob_story.id, later).await.unwrap_err();
	assert!(matches!(err, ExchangeError::RequestExpired));

	// outsiders cannot see it
	let (carol, _) = onboard(&global, "carol", now).await;
	let err = requests::get(&global, carol.id, request.id, later).await.unwrap_err();
	assert!(matches!(err, ExchangeError::RequestNotFound));

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_rejected_request_notifies_sender() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;
	let request = requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();

	let err = requests::reject(&global, alice.id, request.id, now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::NotReceiver));

	let request = requests::reject(&global, bob.id, request.id, now).await.unwrap();
	assert_eq!(request.status, RequestStatus::Rejected);
	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::RequestRejected));

	let err = requests::accept(&global, bob.id, request.id, bob_story.id, now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::RequestNotPending(RequestStatus::Rejected)));

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_basic_quota_is_ten_per_day() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, _) = onboard(&global, "bob", now).await;

	for _ in 0..10 {
		requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();
	}

	let err = requests::create(&global, alice.id, new_request(bob.id, story.id), now)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::QuotaExceeded { limit: 10 }));

	// a new UTC day starts a new budget
	let tomorrow = now + Duration::days(1);
	requests::create(&global, alice.id, new_request(bob.id, story.id), tomorrow).await.unwrap();

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_missed_exchange_strikes_only_the_offender() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;
	let request = requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();
	let (_, exchange) = requests::accept(&global, bob.id, request.id, bob_story.id, now).await.unwrap();

	exchanges::submit_proof(&global, bob.id, exchange.id, "https://instagram.com/p/b".to_string(), now)
		.await
		.unwrap();

	let deadline = exchange.expires_at;
	let err = exchanges::submit_proof(&global, alice.id, exchange.id, "https://instagram.com/p/a".to_string(), deadline)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::ExchangeExpired));

	let exchange = exchanges::get(&global, bob.id, exchange.id, deadline).await.unwrap();
	assert_eq!(exchange.status, ExchangeStatus::Expired);

	let alice_strikes = users::strikes(&global, alice.id).await.unwrap();
	assert_eq!(alice_strikes.len(), 1);
	assert_eq!(alice_strikes[0].strike_number, 1);
	assert_eq!(alice_strikes[0].exchange_id, Some(exchange.id));
	assert!(users::strikes(&global, bob.id).await.unwrap().is_empty());

	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::StrikeAdded));
	assert!(notification_kinds(&global, &bob).await.contains(&NotificationKind::ExchangeExpired));

	// settling again is a no-op
	exchanges::list(&global, alice.id, deadline + Duration::hours(1)).await.unwrap();
	assert_eq!(users::profile(&global, alice.id).await.unwrap().strike_count, 1);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_third_strike_bans_and_blacklists() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, bob_story) = onboard(&global, "bob", now).await;

	for day in 0..MAX_STRIKES {
		let at = now + Duration::days(i64::from(day) * 2);
		let request = requests::create(&global, alice.id, new_request(bob.id, story.id), at).await.unwrap();
		let (_, exchange) = requests::accept(&global, bob.id, request.id, bob_story.id, at).await.unwrap();
		exchanges::submit_proof(&global, bob.id, exchange.id, "https://instagram.com/p/b".to_string(), at)
			.await
			.unwrap();

		let settled = exchanges::get(&global, bob.id, exchange.id, exchange.expires_at).await.unwrap();
		assert_eq!(settled.status, ExchangeStatus::Expired);
	}

	let alice_now = users::profile(&global, alice.id).await.unwrap();
	assert_eq!(alice_now.strike_count, MAX_STRIKES);
	assert!(alice_now.banned);

	let kinds = notification_kinds(&global, &alice).await;
	assert!(kinds.contains(&NotificationKind::StrikeWarning));
	assert!(kinds.contains(&NotificationKind::AccountBanned));

	let later = now + Duration::days(10);
	let err = requests::create(&global, alice.id, new_request(bob.id, story.id), later)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::AccountSuspended));

	let err = users::login(&global, "alice", "correct-horse", later).await.unwrap_err();
	assert!(matches!(err, ExchangeError::AccountSuspended));

	let err = users::register(
		&global,
		NewUser {
			username: "alice_again".to_string(),
			password: "correct-horse".to_string(),
			social_id: "ig:alice".to_string(),
			follower_count: 10,
			account_type: crate::database::AccountType::Creator,
		},
		later,
	)
	.await
	.unwrap_err();
	assert!(matches!(err, ExchangeError::IdentityBanned));

	// others cannot start exchanges with a banned user
	let err = requests::create(
		&global,
		bob.id,
		new_request(alice.id, media::list(&global, bob.id).await.unwrap()[0].id),
		later,
	)
	.await
	.unwrap_err();
	assert!(matches!(err, ExchangeError::RecipientUnavailable));

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_media_library_bounds() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;

	let err = media::delete(&global, alice.id, story.id).await.unwrap_err();
	assert!(matches!(err, ExchangeError::MediaLimit { .. }));

	let err = media::upload(&global, alice.id, "https://cdn.example.com/reel.mp4".to_string(), MediaKind::Reel, now)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::MediaNotAllowed { plan: Plan::Basic, .. }));

	for i in 0..2 {
		media::upload(&global, alice.id, format!("https://cdn.example.com/{i}.jpg"), MediaKind::Story, now)
			.await
			.unwrap();
	}

	let err = media::upload(&global, alice.id, "https://cdn.example.com/4.jpg".to_string(), MediaKind::Story, now)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::MediaLimit { min: 1, max: 3 }));

	let (bob, _) = onboard(&global, "bob", now).await;
	let err = media::delete(&global, bob.id, story.id).await.unwrap_err();
	assert!(matches!(err, ExchangeError::NotOwner | ExchangeError::MediaNotFound));

	media::delete(&global, alice.id, story.id).await.unwrap();
	assert_eq!(media::list(&global, alice.id).await.unwrap().len(), 2);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_pro_payment_lifecycle() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, _) = onboard(&global, "alice", now).await;

	let payment = payments::initiate(
		&global,
		alice.id,
		NewPayment {
			billing_period: BillingPeriod::Monthly,
			gateway: PaymentGateway::Razorpay,
		},
		now,
	)
	.await
	.unwrap();
	assert_eq!(payment.status, PaymentStatus::Pending);
	assert_eq!(payment.amount, global.config().payment.pro_monthly_price);

	let mut forged = signed_callback(&global, &payment.order_id, "pay_1", "captured");
	forged.gateway_payment_id = Some("pay_2".to_string());
	let err = payments::callback(&global, forged, now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::MalformedPaymentCallback(_)));

	let err = payments::callback(&global, CallbackInput::default(), now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::MalformedPaymentCallback(_)));

	let err = payments::callback(&global, signed_callback(&global, "order_missing", "pay_1", "captured"), now)
		.await
		.unwrap_err();
	assert!(matches!(err, ExchangeError::PaymentNotFound));

	let completed = payments::callback(&global, signed_callback(&global, &payment.order_id, "pay_1", "captured"), now)
		.await
		.unwrap();
	assert_eq!(completed.status, PaymentStatus::Completed);

	let alice_now = users::profile(&global, alice.id).await.unwrap();
	assert_eq!(alice_now.effective_plan(now), Plan::Pro);
	assert_eq!(alice_now.plan_expires_at, Some(now + Duration::days(30)));
	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::PaymentCompleted));

	// the same callback again changes nothing
	let again = payments::callback(&global, signed_callback(&global, &payment.order_id, "pay_1", "failed"), now)
		.await
		.unwrap();
	assert_eq!(again.status, PaymentStatus::Completed);

	// pro unlocks reels
	media::upload(&global, alice.id, "https://cdn.example.com/reel.mp4".to_string(), MediaKind::Reel, now)
		.await
		.unwrap();

	let refunded = payments::refund(&global, alice.id, &payment.order_id, now).await.unwrap();
	assert_eq!(refunded.status, PaymentStatus::Refunded);

	let err = payments::refund(&global, alice.id, &payment.order_id, now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::PaymentNotRefundable(PaymentStatus::Refunded)));

	assert_eq!(payments::list(&global, alice.id).await.unwrap().len(), 1);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_concurrent_payments_stack_pro_periods() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, _) = onboard(&global, "alice", now).await;

	let mut orders = Vec::new();
	for gateway in [PaymentGateway::Razorpay, PaymentGateway::Paypal] {
		let payment = payments::initiate(
			&global,
			alice.id,
			NewPayment {
				billing_period: BillingPeriod::Monthly,
				gateway,
			},
			now,
		)
		.await
		.unwrap();
		orders.push(payment.order_id);
	}

	let callbacks = orders
		.iter()
		.enumerate()
		.map(|(i, order_id)| {
			let global = global.clone();
			let input = signed_callback(&global, order_id, &format!("pay_{i}"), "captured");
			tokio::spawn(async move { payments::callback(&global, input, now).await })
		})
		.collect::<Vec<_>>();

	for callback in callbacks {
		assert_eq!(callback.await.unwrap().unwrap().status, PaymentStatus::Completed);
	}

	let alice = users::profile(&global, alice.id).await.unwrap();
	assert_eq!(alice.plan, Plan::Pro);
	assert_eq!(alice.plan_expires_at, Some(now + Duration::days(60)));

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_failed_payment_keeps_basic() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, _) = onboard(&global, "alice", now).await;
	let payment = payments::initiate(
		&global,
		alice.id,
		NewPayment {
			billing_period: BillingPeriod::Yearly,
			gateway: PaymentGateway::Upi,
		},
		now,
	)
	.await
	.unwrap();

	let mut callback = signed_callback(&global, &payment.order_id, "pay_9", "failed");
	callback.reason = Some("insufficient funds".to_string());

	let failed = payments::callback(&global, callback, now).await.unwrap();
	assert_eq!(failed.status, PaymentStatus::Failed);
	assert_eq!(failed.failure_reason.as_deref(), Some("insufficient funds"));

	assert_eq!(users::profile(&global, alice.id).await.unwrap().plan, Plan::Basic);
	assert!(notification_kinds(&global, &alice).await.contains(&NotificationKind::PaymentFailed));

	let err = payments::refund(&global, alice.id, &payment.order_id, now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::PaymentNotRefundable(PaymentStatus::Failed)));

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_notification_inbox() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, story) = onboard(&global, "alice", now).await;
	let (bob, _) = onboard(&global, "bob", now).await;

	for _ in 0..3 {
		requests::create(&global, alice.id, new_request(bob.id, story.id), now).await.unwrap();
	}

	assert_eq!(notifications::unread_count(&global, bob.id).await.unwrap(), 3);

	let inbox = notifications::list(&global, bob.id, true, Some(2)).await.unwrap();
	assert_eq!(inbox.len(), 2);

	let err = notifications::mark_read(&global, alice.id, inbox[0].id).await.unwrap_err();
	assert!(matches!(err, ExchangeError::NotificationNotFound));

	notifications::mark_read(&global, bob.id, inbox[0].id).await.unwrap();
	assert_eq!(notifications::unread_count(&global, bob.id).await.unwrap(), 2);

	assert_eq!(notifications::mark_all_read(&global, bob.id).await.unwrap(), 2);
	assert!(notifications::list(&global, bob.id, true, None).await.unwrap().is_empty());
	assert_eq!(notifications::list(&global, bob.id, false, None).await.unwrap().len(), 3);

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let now = epoch();

	let (alice, _) = onboard(&global, "alice", now).await;

	let err = users::register(
		&global,
		NewUser {
			username: "ALICE".to_string(),
			password: "another-pass".to_string(),
			social_id: "ig:someone".to_string(),
			follower_count: 1,
			account_type: crate::database::AccountType::Brand,
		},
		now,
	)
	.await
	.unwrap_err();
	assert!(matches!(err, ExchangeError::Conflict(_)));

	let err = users::login(&global, "alice", "wrong-password", now).await.unwrap_err();
	assert!(matches!(err, ExchangeError::InvalidCredentials));

	let (user, session) = users::login(&global, "alice", "correct-horse", now).await.unwrap();
	assert_eq!(user.id, alice.id);
	assert!(users::authenticate(&global, session.id, now).await.unwrap().is_some());

	users::logout(&global, session.id, now).await.unwrap();
	assert!(users::authenticate(&global, session.id, now).await.unwrap().is_none());

	drop(global);
	handler.cancel().await;
}
