// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use bqmonitor_core::{Notifier, RenderedReport};

use crate::{SmtpClient, SmtpError};

const LEAD: &str = "The following jobs completed and were unsuccessful:";

/// Wrap the report table fragment in a complete HTML document.
pub fn compose_html(table: &str) -> String {
	format!(
		"<html>\n  <head></head>\n  <body>\n    {LEAD}\n    <p>{table}</p>\n  </body>\n</html>\n"
	)
}

/// Plain text alternative body.
pub fn compose_text(report: &RenderedReport) -> String {
	format!("{LEAD}\n\n{}\n\n{} failed job(s).\n", report.text, report.failures)
}

/// Sends failure reports through an [`SmtpClient`].
pub struct ReportMailer {
	client: SmtpClient,
}

impl ReportMailer {
	pub fn new(client: SmtpClient) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Notifier for ReportMailer {
	type Error = SmtpError;

	async fn send(&self, report: &RenderedReport) -> Result<(), SmtpError> {
		self
			.client
			.send(&compose_html(&report.html), &compose_text(report))
			.await
	}
}
