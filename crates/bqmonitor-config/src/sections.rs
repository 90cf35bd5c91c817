// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `api` and `notifier` sections of the configuration file.

use bqmonitor_secret::SecretString;
use serde::{Deserialize, Deserializer};

/// A scalar written either as a JSON string or a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
	Number(u64),
	Text(String),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Scalar::deserialize(deserializer)? {
		Scalar::Number(n) => n.to_string(),
		Scalar::Text(s) => s,
	})
}

fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
	D: Deserializer<'de>,
{
	use serde::de::Error;

	match Scalar::deserialize(deserializer)? {
		Scalar::Number(n) => u16::try_from(n).map_err(|_| D::Error::custom(format!("port {n} out of range"))),
		Scalar::Text(s) => s
			.trim()
			.parse()
			.map_err(|_| D::Error::custom(format!("invalid port '{s}'"))),
	}
}

fn default_use_tls() -> bool {
	true
}

/// BigQuery access settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
	/// Project the jobs are listed for. Numeric ids and string ids are both
	/// accepted.
	#[serde(deserialize_with = "string_or_number")]
	pub project_number: String,
	pub service_email: String,
	/// Service account key (PEM or JSON key file), relative to the config
	/// file's directory unless absolute.
	pub key_filename: String,
	/// Estimated job completions per minute; sizes the scan limit. Fractional
	/// rates such as `2.5` are accepted.
	pub jobs_per_minute: f64,
}

/// Mail settings for the failure report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierConfig {
	pub smtp_server: String,
	#[serde(deserialize_with = "port")]
	pub smtp_port: u16,
	#[serde(default)]
	pub smtp_username: Option<String>,
	#[serde(default)]
	pub smtp_password: Option<SecretString>,
	pub mail_sender: String,
	#[serde(rename = "recipientTO", default)]
	pub recipient_to: Vec<String>,
	#[serde(rename = "recipientCC", default)]
	pub recipient_cc: Vec<String>,
	pub mail_subject: String,
	/// Upgrade the SMTP session with STARTTLS.
	#[serde(default = "default_use_tls")]
	pub use_tls: bool,
}

impl NotifierConfig {
	pub fn recipient_count(&self) -> usize {
		self.recipient_to.len() + self.recipient_cc.len()
	}
}
