//! Periodic deadline pass.
//!
//! Reads settle overdue requests and exchanges lazily, the sweeper makes sure
//! nothing stays overdue when nobody looks at it. Every step goes through the
//! same compare-and-set as the lazy path, so both can run at once.

use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tokio::select;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::global::GlobalState;
use crate::service::{exchanges, requests};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
	pub requests_expired: usize,
	pub exchanges_expired: usize,
	pub strikes_issued: usize,
	pub users_banned: usize,
	pub reminders_sent: usize,
	pub counters_reset: u64,
	pub plans_downgraded: u64,
}

impl SweepReport {
	fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

pub async fn run(global: Arc<GlobalState>) -> anyhow::Result<()> {
	let interval = global.config().exchange.sweep_interval();
	let mut timer = tokio::time::interval(interval);
	timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tracing::info!(interval = ?interval, "sweeper started");

	loop {
		select! {
			_ = global.ctx().done() => {
				tracing::debug!("sweeper stopping");
				return Ok(());
			}
			_ = timer.tick() => {}
		}

		match sweep(&global, Utc::now()).await.context("sweep") {
			Ok(report) if report.is_empty() => tracing::trace!("sweep found nothing to do"),
			Ok(report) => tracing::info!(?report, "sweep finished"),
			Err(err) => tracing::error!(error = %format!("{err:#}"), "sweep failed"),
		}
	}
}

/// Runs one pass as of `now`.
pub async fn sweep(global: &GlobalState, now: DateTime<Utc>) -> Result<SweepReport> {
	let mut report = SweepReport::default();
	let store = global.store();

	for request in store.expire_overdue_requests(now).await? {
		requests::announce_expiry(global, &request, now).await;
		report.requests_expired += 1;
	}

	for exchange in store.overdue_exchanges(now).await? {
		let exchange_id = exchange.id;
		match exchanges::settle(global, exchange, now).await {
			Ok(Some(strikes)) => {
				report.exchanges_expired += 1;
				report.strikes_issued += strikes.len();
				report.users_banned += strikes.iter().filter(|s| s.banned).count();
			}
			Ok(None) => {}
			Err(err) => tracing::error!(%exchange_id, error = %err, "failed to settle exchange"),
		}
	}

	let lead = global.config().exchange.reminder_lead();
	for exchange in store.exchanges_due_reminder(now, lead).await? {
		match exchanges::remind(global, &exchange, now).await {
			Ok(true) => report.reminders_sent += 1,
			Ok(false) => {}
			Err(err) => tracing::error!(exchange_id = %exchange.id, error = %err, "failed to send reminder"),
		}
	}

	report.counters_reset = store.reset_daily_counters(now.date_naive()).await?;
	report.plans_downgraded = store.downgrade_lapsed_plans(now).await?;

	Ok(report)
}
