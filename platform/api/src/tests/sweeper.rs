use std::time::Duration as StdDuration;

use chrono::Duration;
use common::prelude::FutureTimeout;

use super::global::{epoch, mock_global_state, notification_kinds, onboard};
use crate::config::{AppConfig, ExchangeConfig};
use crate::database::{ExchangeStatus, NotificationKind, RequestStatus};
use crate::service::requests::NewRequest;
use crate::service::{exchanges, notifications, requests, users};
use crate::sweeper::{self, SweepReport};

#[tokio::test]
async fn test_sweep_settles_everything_overdue() {
	let (global, handler) = mock_global_state(AppConfig::default()).await;
	let t0 = epoch();

	let (alice, alice_story) = onboard(&global, "alice", t0).await;
	let (bob, bob_story) = onboard(&global, "bob", t0).await;
	let (carol, carol_story) = onboard(&global, "carol", t0).await;

	let request = |receiver_id, media_id| NewRequest {
		receiver_id,
		media_id,
		message: None,
	};

	// never answered
	let unanswered = requests::create(&global, alice.id, request(bob.id, alice_story.id), t0).await.unwrap();

	// accepted, nobody posts
	let ignored = requests::create(&global, alice.id, request(carol.id, alice_story.id), t0).await.unwrap();
	let (_, missed) = requests::accept(&global, carol.id, ignored.id, carol_story.id, t0).await.unwrap();

	// accepted later, carol posts, bob is reminded
	let t1 = t0 + Duration::hours(2);
	let late = requests::create(&global, bob.id, request(carol.id, bob_story.id), t1).await.unwrap();
	let (_, running) = requests::accept(&global, carol.id, late.id, carol_story.id, t1).await.unwrap();
	exchanges::submit_proof(&global, carol.id, running.id, "https://instagram.com/p/c".to_string(), t1)
		.await
		.unwrap();

	let sweep_at = t0 + Duration::hours(24);
	let report = sweeper::sweep(&global, sweep_at).await.unwrap();
	assert_eq!(
		report,
		SweepReport {
			requests_expired: 1,
			exchanges_expired: 1,
			strikes_issued: 2,
			users_banned: 0,
			reminders_sent: 1,
			counters_reset: 3,
			plans_downgraded: 0,
		}
	);

	let unanswered = requests::get(&global, alice.id, unanswered.id, sweep_at).await.unwrap();
	assert_eq!(unanswered.status, RequestStatus::Expired);

	let missed = exchanges::get(&global, alice.id, missed.id, sweep_at).await.unwrap();
	assert_eq!(missed.status, ExchangeStatus::Expired);
	assert_eq!(users::profile(&global, alice.id).await.unwrap().strike_count, 1);
	assert_eq!(users::profile(&global, carol.id).await.unwrap().strike_count, 1);
	assert_eq!(users::profile(&global, bob.id).await.unwrap().strike_count, 0);

	let running = exchanges::get(&global, bob.id, running.id, sweep_at).await.unwrap();
	assert_eq!(running.status, ExchangeStatus::Pending);
	assert!(running.reminded);

	let reminder = notifications::list(&global, bob.id, false, None)
		.await
		.unwrap()
		.into_iter()
		.find(|n| n.kind == NotificationKind::ExpiringSoon)
		.expect("bob was not reminded");
	assert_eq!(reminder.message, "Your exchange with carol expires in 2 hours. Please post now!");
	assert_eq!(reminder.related_id, Some(running.id));
	assert!(!notification_kinds(&global, &carol).await.contains(&NotificationKind::ExpiringSoon));

	// a second pass has nothing left to do
	let report = sweeper::sweep(&global, sweep_at).await.unwrap();
	assert_eq!(report, SweepReport::default());

	drop(global);
	handler.cancel().await;
}

#[tokio::test]
async fn test_sweeper_stops_on_shutdown() {
	let (global, handler) = mock_global_state(AppConfig {
		exchange: ExchangeConfig {
			sweep_interval: 1,
			..Default::default()
		},
		..Default::default()
	})
	.await;

	let handle = tokio::spawn(sweeper::run(global.clone()));

	tokio::time::sleep(StdDuration::from_millis(100)).await;

	drop(global);

	handler
		.cancel()
		.timeout(StdDuration::from_secs(1))
		.await
		.expect("failed to cancel context");

	handle
		.timeout(StdDuration::from_secs(1))
		.await
		.expect("sweeper did not stop")
		.expect("sweeper panicked")
		.expect("sweeper failed");
}
