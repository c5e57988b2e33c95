use chrono::{DateTime, NaiveDate, Utc};

use crate::database::{Plan, User};
use crate::error::{ExchangeError, Result};

/// The two daily counters. Both are capped by the same plan limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
	Send,
	Accept,
}

impl User {
	/// The plan in force at `now`. A paid plan past its expiry counts as basic.
	pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
		match (self.plan, self.plan_expires_at) {
			(Plan::Pro, Some(expires_at)) if expires_at <= now => Plan::Basic,
			(plan, _) => plan,
		}
	}

	pub fn daily_limit(&self, now: DateTime<Utc>) -> i32 {
		self.effective_plan(now).daily_limit()
	}

	/// Zeroes the counters when they belong to another day.
	pub fn roll_counters(&mut self, today: NaiveDate) {
		if self.counter_day != today {
			self.counter_day = today;
			self.requests_sent_today = 0;
			self.requests_accepted_today = 0;
		}
	}

	pub fn used_today(&self, kind: QuotaKind, today: NaiveDate) -> i32 {
		if self.counter_day != today {
			return 0;
		}

		match kind {
			QuotaKind::Send => self.requests_sent_today,
			QuotaKind::Accept => self.requests_accepted_today,
		}
	}

	pub fn remaining(&self, kind: QuotaKind, now: DateTime<Utc>) -> i32 {
		(self.daily_limit(now) - self.used_today(kind, now.date_naive())).max(0)
	}

	/// Requests the user may still send today.
	pub fn remaining_requests(&self, now: DateTime<Utc>) -> i32 {
		self.remaining(QuotaKind::Send, now)
	}

	pub fn check_quota(&self, kind: QuotaKind, now: DateTime<Utc>) -> Result<()> {
		match self.remaining(kind, now) {
			0 => Err(ExchangeError::QuotaExceeded {
				limit: self.daily_limit(now),
			}),
			_ => Ok(()),
		}
	}

	/// Consumes one unit of today's quota.
	pub fn try_reserve(&mut self, kind: QuotaKind, now: DateTime<Utc>) -> Result<()> {
		self.check_quota(kind, now)?;
		self.roll_counters(now.date_naive());

		match kind {
			QuotaKind::Send => self.requests_sent_today += 1,
			QuotaKind::Accept => self.requests_accepted_today += 1,
		}

		Ok(())
	}
}
