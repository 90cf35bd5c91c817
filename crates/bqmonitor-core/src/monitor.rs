// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One scan: authenticate, page through completed jobs, collect failures and
//! send the report.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::error::{MonitorError, Result};
use crate::filter;
use crate::job::JobPage;
use crate::report::FailureReport;
use crate::window::{scan_limit, TimeWindow};

/// Paginated listing of completed jobs.
#[async_trait]
pub trait JobLister: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Fetch one page. `page_token` is `None` for the first page.
	async fn list(&self, page_token: Option<&str>) -> std::result::Result<JobPage, Self::Error>;
}

/// Turns configured credentials into an authenticated [`JobLister`].
#[async_trait]
pub trait Connector: Send + Sync {
	type Lister: JobLister;
	type Error: std::error::Error + Send + Sync + 'static;

	async fn connect(&self) -> std::result::Result<Self::Lister, Self::Error>;
}

/// A report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
	pub failures: usize,
	/// HTML `<table>` fragment.
	pub html: String,
	/// Plain text rendition of the same table.
	pub text: String,
}

/// Delivers a rendered failure report.
#[async_trait]
pub trait Notifier: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	async fn send(&self, report: &RenderedReport) -> std::result::Result<(), Self::Error>;
}

/// What a finished scan did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
	pub pages: u32,
	pub jobs_examined: u64,
	pub failures: usize,
	pub notified: bool,
}

/// Scan settings that come from configuration rather than the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
	/// Project the jobs are listed for; only used in log lines.
	pub project: String,
	/// Estimated job completions per minute, used to size the scan limit.
	/// May be fractional.
	pub jobs_per_minute: f64,
}

pub struct Monitor<C, N> {
	settings: MonitorSettings,
	connector: C,
	notifier: N,
}

impl<C, N> Monitor<C, N>
where
	C: Connector,
	N: Notifier,
{
	pub fn new(settings: MonitorSettings, connector: C, notifier: N) -> Self {
		Self {
			settings,
			connector,
			notifier,
		}
	}

	/// Run a full scan over `window`.
	///
	/// Any authentication, listing or delivery error aborts the scan. A
	/// listing error in particular never falls through to an "all clear".
	#[instrument(skip(self, window), fields(window = %window, project = %self.settings.project))]
	pub async fn run(&self, window: TimeWindow) -> Result<RunSummary> {
		let lister = self
			.connector
			.connect()
			.await
			.map_err(|e| MonitorError::Authentication(Box::new(e)))?;

		info!(
			"Searching failed jobs in project id {}...",
			self.settings.project
		);

		let limit = scan_limit(&window, self.settings.jobs_per_minute);
		let (report, pages, jobs_examined) = collect_failures(&lister, &window, limit).await?;

		let mut summary = RunSummary {
			pages,
			jobs_examined,
			failures: report.len(),
			notified: false,
		};

		if report.is_empty() {
			info!(jobs_examined, "All jobs completed successfully.");
			return Ok(summary);
		}

		let rendered = RenderedReport {
			failures: report.len(),
			html: report.render_html()?,
			text: report.render_text(),
		};

		self
			.notifier
			.send(&rendered)
			.await
			.map_err(|e| MonitorError::Notification(Box::new(e)))?;
		summary.notified = true;

		info!(
			failures = rendered.failures,
			"One or more jobs failed. A notification mail has been sent."
		);
		Ok(summary)
	}
}

/// Page through the listing until `limit` jobs were examined or the listing
/// ends, evaluating every job against `window`.
pub async fn collect_failures<L>(
	lister: &L,
	window: &TimeWindow,
	limit: u64,
) -> Result<(FailureReport, u32, u64)>
where
	L: JobLister + ?Sized,
{
	let mut report = FailureReport::new();
	let mut page_token: Option<String> = None;
	let mut pages = 0u32;
	let mut examined = 0u64;

	debug!(limit, "starting job scan");

	while examined < limit {
		pages += 1;
		let page = lister
			.list(page_token.as_deref())
			.await
			.map_err(|e| MonitorError::Listing {
				page: pages,
				source: Box::new(e),
			})?;

		for job in page.jobs.iter().flatten() {
			if let Some(failure) = filter::evaluate(job, window) {
				report.add(failure);
			}
		}
		examined += page.job_count() as u64;

		debug!(
			page = pages,
			jobs = page.job_count(),
			examined,
			failures = report.len(),
			"scanned page"
		);

		match page.continuation() {
			Some(token) => page_token = Some(token.to_string()),
			None => break,
		}
	}

	Ok((report, pages, examined))
}
