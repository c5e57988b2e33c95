use super::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "plan", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
	Basic,
	Pro,
}

impl Plan {
	pub const ALL: [Plan; 2] = [Plan::Basic, Plan::Pro];

	/// Maximum requests a user on this plan may send, and separately accept, per UTC day.
	pub const fn daily_limit(self) -> i32 {
		match self {
			Self::Basic => 10,
			Self::Pro => 50,
		}
	}

	pub const fn allows(self, kind: MediaKind) -> bool {
		match self {
			Self::Basic => matches!(kind, MediaKind::Story),
			Self::Pro => true,
		}
	}

	pub fn allowed_kinds(self) -> Vec<MediaKind> {
		MediaKind::ALL.into_iter().filter(|kind| self.allows(*kind)).collect()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "billing_period", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPeriod {
	Monthly,
	Yearly,
}

impl BillingPeriod {
	pub const fn days(self) -> i64 {
		match self {
			Self::Monthly => 30,
			Self::Yearly => 365,
		}
	}
}
