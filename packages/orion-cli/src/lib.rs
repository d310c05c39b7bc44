//! Plumbing shared by ORION binaries: the `--version` string, help styling, and log setup.

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

/// Package version, git revision, and target triple, e.g. `0.2.0-1a2b3c4-x86_64-unknown-linux-gnu`.
pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

const FALLBACK_LOG_LEVEL: &str = "info";

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Blue.on_default() | Effects::BOLD)
		.usage(AnsiColor::Blue.on_default() | Effects::BOLD)
		.literal(AnsiColor::Magenta.on_default())
		.placeholder(AnsiColor::Green.on_default())
		.invalid(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Builds the filter from `service.log_level`. Blank or unparsable directives log at `info`.
pub fn env_filter(log_level: &str) -> EnvFilter {
	let directives = log_level.trim();

	if directives.is_empty() {
		return EnvFilter::new(FALLBACK_LOG_LEVEL);
	}

	EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_LEVEL))
}

/// Installs the global subscriber. Logs go to stderr so command output on stdout stays JSON.
pub fn init_tracing(log_level: &str) -> color_eyre::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(env_filter(log_level))
		.with_writer(std::io::stderr)
		.try_init()
		.map_err(|err| eyre::eyre!("Failed to install the log subscriber: {err}."))
}
