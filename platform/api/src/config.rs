use std::net::SocketAddr;

use anyhow::Result;
use common::config::{DatabaseConfig, LoggingConfig, TlsConfig};

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
/// The exchange service behind the ShoutX clients
pub struct AppConfig {
	/// The path to the config file
	pub config_file: Option<String>,

	/// Name of this instance
	pub name: String,

	///  The logging config
	pub logging: LoggingConfig,

	/// API Config
	pub api: ApiConfig,

	/// Database Config
	pub database: DatabaseConfig,

	/// JWT Config
	pub jwt: JwtConfig,

	/// Exchange lifecycle timings
	pub exchange: ExchangeConfig,

	/// Payment Config
	pub payment: PaymentConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiConfig {
	/// Bind address for the API
	pub bind_address: SocketAddr,

	/// If we should use TLS for the API server
	pub tls: Option<TlsConfig>,

	/// Value of the Access-Control-Allow-Origin header
	pub allowed_origin: String,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			bind_address: SocketAddr::from(([0, 0, 0, 0], 4000)),
			tls: None,
			allowed_origin: "*".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct JwtConfig {
	/// JWT secret
	pub secret: String,

	/// JWT issuer
	pub issuer: String,

	/// How long a login stays valid, in seconds
	pub session_ttl: u64,
}

impl Default for JwtConfig {
	fn default() -> Self {
		Self {
			issuer: "shoutx".to_string(),
			secret: "shoutx".to_string(),
			session_ttl: 7 * 24 * 60 * 60,
		}
	}
}

/// All durations are in seconds.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
	/// How long a request waits for an answer
	pub request_ttl: u64,

	/// How long both sides have to post once a request is accepted
	pub exchange_window: u64,

	/// How long before the deadline the reminder goes out
	pub reminder_lead: u64,

	/// How often the sweeper runs
	pub sweep_interval: u64,
}

impl Default for ExchangeConfig {
	fn default() -> Self {
		Self {
			request_ttl: 24 * 60 * 60,
			exchange_window: 24 * 60 * 60,
			reminder_lead: 2 * 60 * 60,
			sweep_interval: 60,
		}
	}
}

// About a century, comfortably inside what chrono can represent.
const MAX_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

fn seconds(secs: u64) -> chrono::Duration {
	chrono::Duration::seconds(secs.min(MAX_SECONDS) as i64)
}

impl ExchangeConfig {
	pub fn request_ttl(&self) -> chrono::Duration {
		seconds(self.request_ttl)
	}

	pub fn exchange_window(&self) -> chrono::Duration {
		seconds(self.exchange_window)
	}

	pub fn reminder_lead(&self) -> chrono::Duration {
		seconds(self.reminder_lead)
	}

	pub fn sweep_interval(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.sweep_interval.max(1))
	}
}

impl JwtConfig {
	pub fn session_ttl(&self) -> chrono::Duration {
		seconds(self.session_ttl)
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
	/// Shared secret the gateways sign callbacks with
	pub callback_secret: String,

	/// ISO 4217 code prices are charged in
	pub currency: String,

	/// Price of one month of pro, in minor units
	pub pro_monthly_price: i64,

	/// Price of one year of pro, in minor units
	pub pro_yearly_price: i64,
}

impl Default for PaymentConfig {
	fn default() -> Self {
		Self {
			callback_secret: "shoutx".to_string(),
			currency: "INR".to_string(),
			pro_monthly_price: 499_00,
			pro_yearly_price: 4999_00,
		}
	}
}

impl PaymentConfig {
	pub fn price(&self, period: crate::database::BillingPeriod) -> i64 {
		match period {
			crate::database::BillingPeriod::Monthly => self.pro_monthly_price,
			crate::database::BillingPeriod::Yearly => self.pro_yearly_price,
		}
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			config_file: Some("config.toml".to_string()),
			name: "shoutx-api".to_string(),
			logging: LoggingConfig::default(),
			api: ApiConfig::default(),
			database: DatabaseConfig::default(),
			jwt: JwtConfig::default(),
			exchange: ExchangeConfig::default(),
			payment: PaymentConfig::default(),
		}
	}
}

impl binary_helper::Config for AppConfig {
	fn parse() -> Result<Self> {
		let (mut config, config_file) =
			common::config::parse::<Self>(!cfg!(test), Self::default().config_file, "SHOUTX")?;

		config.config_file = config_file;

		Ok(config)
	}

	fn logging(&self) -> &LoggingConfig {
		&self.logging
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn pre_hook(&mut self) -> Result<()> {
		if self.exchange.reminder_lead >= self.exchange.exchange_window {
			anyhow::bail!("exchange.reminder_lead must be shorter than exchange.exchange_window");
		}

		Ok(())
	}
}
