// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bqmonitor_bigquery::{BigQueryConfig, ServiceAccountConnector};
use bqmonitor_config::{resolve_config_path, BqMonitorConfig, NotifierConfig};
use bqmonitor_core::{validate, Monitor, MonitorSettings, TimeWindow};
use bqmonitor_smtp::{ReportMailer, SmtpClient, SmtpConfig};
use clap::Parser;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info};

mod logging;

use logging::{LogLevel, LogSink, LoggingConfig};

/// Exit status for a rejected `--duration`/`--unit`.
const EXIT_INVALID_INPUT: u8 = 2;

/// Watches Google BigQuery load jobs and mails a report when recent ones failed.
#[derive(Parser, Debug)]
#[command(name = "bqmonitor", version, about, long_about = None)]
struct Args {
	/// How far back to look, in --unit
	#[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
	duration: i64,

	/// Window unit: M (minutes, max 59), H (hours, max 23) or D (days, max 365)
	#[arg(short, long, default_value = "M")]
	unit: String,

	/// Path to the configuration file [default: <exe dir>/config/bqmonitor.conf]
	#[arg(short, long, env = "BQMONITOR_CONFIG")]
	config: Option<PathBuf>,

	/// Log level for bqmonitor's own output
	#[arg(short, long, value_enum, env = "BQMONITOR_LOG_LEVEL", default_value_t = LogLevel::Info)]
	log_level: LogLevel,

	/// Where log lines go
	#[arg(long, value_enum, default_value_t = LogSink::Stdout)]
	log_sink: LogSink,

	/// Output logs as JSON
	#[arg(long)]
	json_logs: bool,
}

impl Args {
	fn logging(&self) -> LoggingConfig {
		LoggingConfig {
			level: self.log_level,
			sink: self.log_sink,
			json: self.json_logs,
		}
	}
}

fn smtp_config(notifier: &NotifierConfig) -> SmtpConfig {
	SmtpConfig {
		server: notifier.smtp_server.clone(),
		port: notifier.smtp_port,
		username: notifier.smtp_username.clone(),
		password: notifier.smtp_password.clone(),
		sender: notifier.mail_sender.clone(),
		subject: notifier.mail_subject.clone(),
		recipients_to: notifier.recipient_to.clone(),
		recipients_cc: notifier.recipient_cc.clone(),
		use_tls: notifier.use_tls,
	}
}

fn bigquery_config(config: &BqMonitorConfig) -> BigQueryConfig {
	BigQueryConfig::new(
		config.api.project_number.clone(),
		config.api.service_email.clone(),
		config.key_path(),
	)
}

async fn run(args: Args) -> Result<ExitCode> {
	debug!(version = env!("CARGO_PKG_VERSION"), "starting bqmonitor");

	if !validate(args.duration, &args.unit) {
		return Ok(ExitCode::from(EXIT_INVALID_INPUT));
	}
	let window = TimeWindow::parse(args.duration, &args.unit)?;

	let path = resolve_config_path(args.config.as_deref())?;
	let config = BqMonitorConfig::load(&path)
		.with_context(|| format!("failed to load configuration from {}", path.display()))?;

	let mailer = SmtpClient::new(smtp_config(&config.notifier))
		.map(ReportMailer::new)
		.context("invalid mail configuration")?;
	let connector = ServiceAccountConnector::new(bigquery_config(&config));
	let settings = MonitorSettings {
		project: config.api.project_number.clone(),
		jobs_per_minute: config.api.jobs_per_minute,
	};

	let summary = Monitor::new(settings, connector, mailer).run(window).await?;
	info!(
		pages = summary.pages,
		jobs_examined = summary.jobs_examined,
		failures = summary.failures,
		"Scan finished."
	);
	Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = Args::parse();
	let dispatch = logging::build_dispatch(&args.logging());

	async {
		match run(args).await {
			Ok(code) => code,
			Err(e) => {
				error!("{e:#}");
				ExitCode::FAILURE
			}
		}
	}
	.with_subscriber(dispatch)
	.await
}
