use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

static RELOAD_HANDLE: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	#[default]
	Default,
	Json,
	Pretty,
	Compact,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
	#[error("invalid logging directive: {0}")]
	InvalidDirective(#[from] ParseError),
	#[error("failed to install subscriber: {0}")]
	Init(#[from] TryInitError),
	#[error("failed to reload filter: {0}")]
	Reload(#[from] reload::Error),
}

/// Installs the global subscriber on the first call.
///
/// Later calls only swap the filter directive, the output mode chosen first
/// stays in effect for the lifetime of the process.
pub fn init(level: &str, mode: Mode) -> Result<(), LoggingError> {
	let handle = RELOAD_HANDLE.get_or_try_init(|| {
		let (filter, handle) = reload::Layer::new(EnvFilter::from_str(level)?);

		let output = match mode {
			Mode::Default => fmt::layer().with_file(true).with_line_number(true).boxed(),
			Mode::Json => fmt::layer()
				.json()
				.with_current_span(true)
				.with_file(true)
				.with_line_number(true)
				.boxed(),
			Mode::Pretty => fmt::layer().pretty().boxed(),
			Mode::Compact => fmt::layer().compact().with_target(false).boxed(),
		};

		tracing_subscriber::registry().with(filter).with(output).try_init()?;

		Ok::<_, LoggingError>(handle)
	})?;

	handle.reload(EnvFilter::from_str(level)?)?;

	Ok(())
}
