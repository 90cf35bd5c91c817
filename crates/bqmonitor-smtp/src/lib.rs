// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP delivery for bqmonitor failure reports.
//!
//! [`SmtpClient`] sends one multipart (plain text + HTML) message to every
//! configured To and Cc recipient over a STARTTLS session.
//! [`ReportMailer`] wraps it as the [`bqmonitor_core::Notifier`] used by a
//! scan.
//!
//! # Example
//!
//! ```no_run
//! use bqmonitor_secret::SecretString;
//! use bqmonitor_smtp::{SmtpClient, SmtpConfig};
//!
//! # async fn example() -> Result<(), bqmonitor_smtp::SmtpError> {
//! let config = SmtpConfig {
//!     server: "smtp.example.com".to_string(),
//!     port: 587,
//!     username: Some("alerts@example.com".to_string()),
//!     password: Some(SecretString::new("password".to_string())),
//!     sender: "BigQuery Monitor <alerts@example.com>".to_string(),
//!     subject: "BigQuery load jobs failed".to_string(),
//!     recipients_to: vec!["data-oncall@example.com".to_string()],
//!     recipients_cc: vec![],
//!     use_tls: true,
//! };
//!
//! let client = SmtpClient::new(config)?;
//! client.send("<p>report</p>", "report").await?;
//! # Ok(())
//! # }
//! ```

mod report;

pub use report::{compose_html, compose_text, ReportMailer};

use bqmonitor_secret::SecretString;
use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Errors that can occur during SMTP operations.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	/// Failed to set up the connection to the SMTP server.
	#[error("connection failed: {0}")]
	Connection(String),

	/// Failed to build or send the message.
	#[error("send failed: {0}")]
	Send(String),

	/// Invalid configuration (missing recipients and similar).
	#[error("invalid configuration: {0}")]
	Config(String),

	/// Invalid sender or recipient address.
	#[error("invalid email address '{address}': {message}")]
	Address { address: String, message: String },
}

/// Mail settings for the failure report.
///
/// The password is a [`SecretString`] so the config can be logged with
/// `?config` without exposing it.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
	/// SMTP server hostname.
	pub server: String,

	/// SMTP server port, usually 587 for STARTTLS.
	pub port: u16,

	/// Username for SMTP authentication. Authentication is skipped unless
	/// both username and password are set.
	pub username: Option<String>,

	pub password: Option<SecretString>,

	/// `From` address, optionally with a display name.
	pub sender: String,

	pub subject: String,

	pub recipients_to: Vec<String>,

	pub recipients_cc: Vec<String>,

	/// Whether to upgrade the connection with STARTTLS. Defaults to `true`.
	pub use_tls: bool,
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SmtpError> {
	address.parse().map_err(|e| SmtpError::Address {
		address: address.to_string(),
		message: format!("{e}"),
	})
}

/// SMTP credentials, when both halves are configured.
///
/// A username without a password (or the reverse) is almost always a
/// configuration mistake, so it is logged rather than silently treated as an
/// unauthenticated relay.
fn credentials(username: Option<String>, password: Option<SecretString>) -> Option<Credentials> {
	match (username, password) {
		(Some(username), Some(password)) => Some(Credentials::new(username, password.into_inner())),
		(Some(_), None) => {
			tracing::warn!("SMTP username is set but the password is missing; sending without authentication");
			None
		}
		(None, Some(_)) => {
			tracing::warn!("SMTP password is set but the username is missing; sending without authentication");
			None
		}
		(None, None) => None,
	}
}

/// Async SMTP client bound to one sender, subject and recipient list.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	sender: Mailbox,
	to: Vec<Mailbox>,
	cc: Vec<Mailbox>,
	subject: String,
}

impl SmtpClient {
	/// Validate the addresses and build the transport.
	///
	/// No connection is made until [`SmtpClient::send`].
	#[tracing::instrument(
		name = "smtp_client_new",
		skip(config),
		fields(server = %config.server, port = %config.port, use_tls = %config.use_tls)
	)]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let sender = parse_mailbox(&config.sender)?;
		let to = config
			.recipients_to
			.iter()
			.map(|a| parse_mailbox(a))
			.collect::<Result<Vec<_>, _>>()?;
		let cc = config
			.recipients_cc
			.iter()
			.map(|a| parse_mailbox(a))
			.collect::<Result<Vec<_>, _>>()?;

		if to.is_empty() && cc.is_empty() {
			return Err(SmtpError::Config("at least one recipient is required".into()));
		}

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
		};

		let mut builder = builder.port(config.port);

		if let Some(credentials) = credentials(config.username, config.password) {
			builder = builder.credentials(credentials);
		}

		tracing::debug!(to = to.len(), cc = cc.len(), "SMTP client initialized");

		Ok(Self {
			transport: builder.build(),
			sender,
			to,
			cc,
			subject: config.subject,
		})
	}

	/// Build the multipart message without sending it.
	pub fn build_message(&self, body_html: &str, body_text: &str) -> Result<Message, SmtpError> {
		let mut builder = Message::builder()
			.from(self.sender.clone())
			.subject(self.subject.as_str());
		for mailbox in &self.to {
			builder = builder.to(mailbox.clone());
		}
		for mailbox in &self.cc {
			builder = builder.cc(mailbox.clone());
		}

		builder
			.multipart(
				MultiPart::alternative()
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_PLAIN)
							.body(body_text.to_string()),
					)
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_HTML)
							.body(body_html.to_string()),
					),
			)
			.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))
	}

	/// Send the message in a single SMTP session.
	#[tracing::instrument(
		name = "smtp_send",
		skip(self, body_html, body_text),
		fields(subject = %self.subject, recipients = self.to.len() + self.cc.len())
	)]
	pub async fn send(&self, body_html: &str, body_text: &str) -> Result<(), SmtpError> {
		let message = self.build_message(body_html, body_text)?;

		tracing::debug!("sending email");

		self
			.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("email sent successfully");

		Ok(())
	}
}

/// Whether `email` parses as a mailbox (`user@host` or `Name <user@host>`).
pub fn is_valid_email(email: &str) -> bool {
	email.parse::<Mailbox>().is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	pub(crate) fn config() -> SmtpConfig {
		SmtpConfig {
			server: "smtp.example.com".to_string(),
			port: 587,
			username: Some("alerts".to_string()),
			password: Some(SecretString::new("super-secret-password".to_string())),
			sender: "BigQuery Monitor <alerts@example.com>".to_string(),
			subject: "Failed BigQuery load jobs".to_string(),
			recipients_to: vec!["oncall@example.com".to_string(), "lead@example.com".to_string()],
			recipients_cc: vec!["audit@example.com".to_string()],
			use_tls: true,
		}
	}

	mod construction {
		use super::*;

		#[tokio::test]
		async fn builds_with_valid_config() {
			assert!(SmtpClient::new(config()).is_ok());
		}

		#[tokio::test]
		async fn rejects_bad_sender() {
			let mut config = config();
			config.sender = "not-an-email".to_string();
			let err = SmtpClient::new(config).err().unwrap();
			assert!(matches!(err, SmtpError::Address { address, .. } if address == "not-an-email"));
		}

		#[tokio::test]
		async fn rejects_bad_recipient() {
			let mut config = config();
			config.recipients_cc.push("@example.com".to_string());
			assert!(matches!(
				SmtpClient::new(config).err().unwrap(),
				SmtpError::Address { .. }
			));
		}

		#[tokio::test]
		async fn requires_a_recipient() {
			let mut config = config();
			config.recipients_to.clear();
			config.recipients_cc.clear();
			assert!(matches!(
				SmtpClient::new(config).err().unwrap(),
				SmtpError::Config(_)
			));
		}

		#[test]
		fn config_debug_does_not_leak_password() {
			let debug = format!("{:?}", config());
			assert!(!debug.contains("super-secret-password"));
			assert!(debug.contains("[REDACTED]"));
		}
	}

	mod authentication {
		use super::*;
		use std::io;
		use std::sync::{Arc, Mutex};

		#[derive(Clone, Default)]
		struct Captured(Arc<Mutex<Vec<u8>>>);

		impl io::Write for Captured {
			fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
				self.0.lock().unwrap().extend_from_slice(buf);
				Ok(buf.len())
			}

			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}

		fn logged_while<T>(f: impl FnOnce() -> T) -> (T, String) {
			let captured = Captured::default();
			let sink = captured.clone();
			let subscriber = tracing_subscriber::fmt()
				.with_ansi(false)
				.with_writer(move || sink.clone())
				.finish();
			let value = tracing::subscriber::with_default(subscriber, f);
			let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
			(value, text)
		}

		#[test]
		fn both_halves_authenticate_quietly() {
			let (creds, log) = logged_while(|| {
				credentials(Some("alerts".into()), Some(SecretString::new("pw".into())))
			});
			assert!(creds.is_some());
			assert!(!log.contains("WARN"));
		}

		#[test]
		fn username_without_password_warns() {
			let (creds, log) = logged_while(|| credentials(Some("alerts".into()), None));
			assert!(creds.is_none());
			assert!(log.contains("WARN"));
			assert!(log.contains("password is missing"));
		}

		#[test]
		fn password_without_username_warns() {
			let (creds, log) = logged_while(|| credentials(None, Some(SecretString::new("pw".into()))));
			assert!(creds.is_none());
			assert!(log.contains("username is missing"));
		}

		#[test]
		fn no_credentials_is_an_open_relay_without_warning() {
			let (creds, log) = logged_while(|| credentials(None, None));
			assert!(creds.is_none());
			assert!(log.is_empty());
		}
	}

	mod message {
		use super::*;

		#[tokio::test]
		async fn addresses_every_to_and_cc_recipient() {
			let client = SmtpClient::new(config()).unwrap();
			let message = client.build_message("<p>html</p>", "text").unwrap();

			let envelope: Vec<String> = message.envelope().to().iter().map(|a| a.to_string()).collect();
			assert_eq!(envelope.len(), 3);
			assert!(envelope.contains(&"oncall@example.com".to_string()));
			assert!(envelope.contains(&"lead@example.com".to_string()));
			assert!(envelope.contains(&"audit@example.com".to_string()));

			let formatted = String::from_utf8(message.formatted()).unwrap();
			assert!(formatted.contains("Subject: Failed BigQuery load jobs"));
			assert!(formatted.contains("Cc: audit@example.com"));
			assert!(formatted.contains("multipart/alternative"));
			assert!(formatted.contains("text/html"));
			assert!(formatted.contains("text/plain"));
		}

		#[tokio::test]
		async fn cc_only_is_enough() {
			let mut config = config();
			config.recipients_to.clear();
			let client = SmtpClient::new(config).unwrap();
			let message = client.build_message("<p>html</p>", "text").unwrap();
			assert_eq!(message.envelope().to().len(), 1);
		}
	}

	mod email_validation {
		use super::*;
		use proptest::prelude::*;

		#[test]
		fn accepts_plain_and_named_addresses() {
			assert!(is_valid_email("oncall@example.com"));
			assert!(is_valid_email("Data Oncall <oncall@example.com>"));
		}

		#[test]
		fn rejects_malformed_addresses() {
			assert!(!is_valid_email(""));
			assert!(!is_valid_email("oncall"));
			assert!(!is_valid_email("oncall@"));
			assert!(!is_valid_email("@example.com"));
		}

		proptest! {
			#[test]
			fn simple_addresses_are_valid(
				local in "[a-zA-Z][a-zA-Z0-9]{0,20}",
				domain in "[a-zA-Z][a-zA-Z0-9]{0,15}",
				tld in "(com|org|net|io)"
			) {
				let email = format!("{local}@{domain}.{tld}");
				prop_assert!(is_valid_email(&email));
			}
		}
	}
}
