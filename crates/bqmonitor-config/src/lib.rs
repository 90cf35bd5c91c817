// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for bqmonitor.
//!
//! One JSON file with an `api` and a `notifier` section, read once at
//! startup. By default it lives at `<executable dir>/config/bqmonitor.conf`.
//! `BQMONITOR_SMTP_PASSWORD` overrides the SMTP password from the file.

mod error;
pub mod paths;
mod sections;

pub use error::ConfigError;
pub use paths::{default_config_path, resolve_config_path};
pub use sections::{ApiConfig, NotifierConfig};

use std::path::{Path, PathBuf};

use bqmonitor_secret::SecretString;
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Environment variable that replaces `notifier.smtpPassword`.
pub const SMTP_PASSWORD_ENV: &str = "BQMONITOR_SMTP_PASSWORD";

#[derive(Deserialize)]
struct ConfigFile {
	api: ApiConfig,
	notifier: NotifierConfig,
}

/// Loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct BqMonitorConfig {
	pub api: ApiConfig,
	pub notifier: NotifierConfig,
	/// File this configuration was read from.
	pub path: PathBuf,
}

impl BqMonitorConfig {
	/// Read, apply environment overrides and validate.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		Self::load_with_env(path, env_var)
	}

	/// [`BqMonitorConfig::load`] with an explicit environment lookup.
	#[instrument(skip(path, lookup), fields(path = %path.display()))]
	pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let mut config = Self::from_json(&contents, path)?;
		config.apply_env(lookup);
		config.validate()?;

		info!("Configuration loaded from '{}'.", path.display());
		Ok(config)
	}

	/// Parse without validating. `path` is recorded for error messages and
	/// key file resolution.
	pub fn from_json(contents: &str, path: &Path) -> Result<Self, ConfigError> {
		let file: ConfigFile = serde_json::from_str(contents).map_err(|source| ConfigError::JsonParse {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(Self {
			api: file.api,
			notifier: file.notifier,
			path: path.to_path_buf(),
		})
	}

	fn apply_env<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(password) = lookup(SMTP_PASSWORD_ENV) {
			debug!("SMTP password taken from {SMTP_PASSWORD_ENV}");
			self.notifier.smtp_password = Some(SecretString::new(password));
		}
	}

	/// Reject values no scan could run with.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.api.project_number.trim().is_empty() {
			return Err(ConfigError::missing_field("api.projectNumber"));
		}
		if self.api.service_email.trim().is_empty() {
			return Err(ConfigError::missing_field("api.serviceEmail"));
		}
		if self.api.key_filename.trim().is_empty() {
			return Err(ConfigError::missing_field("api.keyFilename"));
		}
		let rate = self.api.jobs_per_minute;
		if !rate.is_finite() || rate <= 0.0 {
			return Err(ConfigError::invalid_value("api.jobsPerMinute", "must be a positive number"));
		}
		if self.notifier.smtp_server.trim().is_empty() {
			return Err(ConfigError::missing_field("notifier.smtpServer"));
		}
		if self.notifier.mail_sender.trim().is_empty() {
			return Err(ConfigError::missing_field("notifier.mailSender"));
		}
		if self.notifier.recipient_count() == 0 {
			return Err(ConfigError::invalid_value(
				"notifier.recipientTO",
				"at least one recipient (TO or CC) is required",
			));
		}
		Ok(())
	}

	/// Directory holding the config file.
	pub fn config_dir(&self) -> &Path {
		self.path.parent().unwrap_or_else(|| Path::new("."))
	}

	/// Absolute (or config-relative) location of the service account key.
	pub fn key_path(&self) -> PathBuf {
		paths::resolve_relative(self.config_dir(), Path::new(&self.api.key_filename))
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}
