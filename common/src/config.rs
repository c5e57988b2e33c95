//! Layered configuration.
//!
//! Values are resolved from, lowest to highest priority: the `Default`
//! impl of the target type, a TOML file, environment variables carrying the
//! application prefix, and `--set key.path=value` arguments on the command
//! line. Nested keys are separated by `__` in environment variables and by
//! `.` on the command line. Environment and command line values are strings,
//! converted to the type of the field they land in.

use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use clap::Parser;
use serde::de::DeserializeOwned;

use crate::logging;

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TlsConfig {
	/// The path to the TLS certificate
	pub cert: String,

	/// The path to the TLS private key
	pub key: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level to use, this is a tracing env filter
	pub level: String,

	/// What logging mode we should use
	pub mode: logging::Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			mode: logging::Mode::Default,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
	/// The database URL to use, `memory://` keeps all state in process
	pub uri: String,

	/// Maximum number of pooled connections
	pub max_connections: u32,

	/// Apply pending migrations on startup
	pub migrate: bool,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			uri: "postgres://root@localhost:5432/shoutx_dev".to_string(),
			max_connections: 10,
			migrate: true,
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("config file {0} does not exist")]
	MissingFile(String),
	#[error("invalid override {0:?}, expected key.path=value")]
	Override(String),
	#[error("invalid command line: {0}")]
	Cli(#[from] clap::Error),
	#[error("invalid configuration: {0}")]
	Build(#[from] ::config::ConfigError),
}

#[derive(Debug, Parser)]
struct Cli {
	/// Path to a TOML config file
	#[arg(short, long)]
	config: Option<String>,

	/// Override a single key, for example `--set api.bind_address=0.0.0.0:8080`
	#[arg(long = "set", value_name = "KEY=VALUE")]
	overrides: Vec<String>,
}

/// Parses `C` from the process arguments and environment.
///
/// Returns the config along with the path of the file that was loaded, if any.
pub fn parse<C: DeserializeOwned>(
	enable_cli: bool,
	default_file: Option<String>,
	env_prefix: &str,
) -> Result<(C, Option<String>), ConfigError> {
	let args = enable_cli.then(|| std::env::args().collect::<Vec<_>>());
	parse_from(args, std::env::vars(), default_file, env_prefix)
}

pub fn parse_from<C: DeserializeOwned>(
	args: Option<Vec<String>>,
	env: impl IntoIterator<Item = (String, String)>,
	default_file: Option<String>,
	env_prefix: &str,
) -> Result<(C, Option<String>), ConfigError> {
	let cli = match args {
		Some(args) => Some(Cli::try_parse_from(args)?),
		None => None,
	};

	let prefix = format!("{}_", env_prefix.to_uppercase());
	let env = env
		.into_iter()
		.filter(|(key, _)| key.to_uppercase().starts_with(&prefix))
		.collect::<HashMap<_, _>>();

	let explicit_file = cli.as_ref().and_then(|cli| cli.config.clone()).or_else(|| {
		env.iter()
			.find(|(key, _)| key[prefix.len()..].eq_ignore_ascii_case("CONFIG_FILE"))
			.map(|(_, value)| value.clone())
	});

	let loaded = match (explicit_file, default_file) {
		(Some(path), _) if !Path::new(&path).exists() => return Err(ConfigError::MissingFile(path)),
		(Some(path), _) => Some(path),
		(None, Some(path)) if Path::new(&path).exists() => Some(path),
		_ => None,
	};

	let mut builder = Config::builder();

	if let Some(path) = &loaded {
		builder = builder.add_source(File::new(path, FileFormat::Toml));
	}

	builder = builder.add_source(
		Environment::with_prefix(env_prefix)
			.prefix_separator("_")
			.separator("__")
			.source(Some(env)),
	);

	if let Some(cli) = cli {
		for entry in cli.overrides {
			let (key, value) = entry.split_once('=').ok_or_else(|| ConfigError::Override(entry.clone()))?;
			if key.is_empty() {
				return Err(ConfigError::Override(entry));
			}

			builder = builder.set_override(key, value)?;
		}
	}

	let config = builder.build()?.try_deserialize()?;
	Ok((config, loaded))
}
