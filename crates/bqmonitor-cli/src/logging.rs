// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the [`Dispatch`] a run logs through.
//!
//! Nothing is installed globally; `main` attaches the dispatch to the run
//! future.

use tracing::Dispatch;
use tracing_subscriber::{
	fmt::{self, time::ChronoLocal, writer::BoxMakeWriter},
	layer::SubscriberExt,
	EnvFilter,
};

/// `12/31/2025 23:59:59`
pub const TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Crates whose events honour `--log-level`. Everything else logs warnings
/// and up.
const OWN_TARGETS: &[&str] = &[
	"bqmonitor",
	"bqmonitor_bigquery",
	"bqmonitor_config",
	"bqmonitor_core",
	"bqmonitor_smtp",
];

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl LogLevel {
	fn as_str(self) -> &'static str {
		match self {
			LogLevel::Trace => "trace",
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
		}
	}
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogSink {
	Stdout,
	Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub sink: LogSink,
	pub json: bool,
}

/// `RUST_LOG` wins when set; otherwise our crates log at `level`.
fn filter(level: LogLevel) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		let directives = OWN_TARGETS
			.iter()
			.map(|target| format!("{target}={}", level.as_str()))
			.collect::<Vec<_>>()
			.join(",");
		EnvFilter::new(format!("warn,{directives}"))
	})
}

pub fn build_dispatch(config: &LoggingConfig) -> Dispatch {
	let writer = match config.sink {
		LogSink::Stdout => BoxMakeWriter::new(std::io::stdout),
		LogSink::Stderr => BoxMakeWriter::new(std::io::stderr),
	};
	build_dispatch_with_writer(config, filter(config.level), writer)
}

fn build_dispatch_with_writer(config: &LoggingConfig, filter: EnvFilter, writer: BoxMakeWriter) -> Dispatch {
	let layer = fmt::layer()
		.with_target(false)
		.with_ansi(false)
		.with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
		.with_writer(writer);

	let registry = tracing_subscriber::registry().with(filter);
	if config.json {
		Dispatch::new(registry.with(layer.json()))
	} else {
		Dispatch::new(registry.with(layer))
	}
}
