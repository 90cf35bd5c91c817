// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the scan core.

use thiserror::Error;

use crate::window::TimeUnit;

/// Boxed error from an external collaborator (lister, connector, notifier).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rejected `--duration`/`--unit` input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
	#[error("unknown time unit '{0}', expected one of D, H, M")]
	UnknownUnit(String),

	#[error("duration {duration} is out of range for unit {unit} (expected 1..={max})")]
	OutOfRange {
		duration: i64,
		unit: TimeUnit,
		max: i64,
	},
}

/// Rendering the failure report failed.
#[derive(Debug, Error)]
pub enum ReportError {
	#[error("failed to render report template: {0}")]
	Template(#[from] minijinja::Error),
}

/// Fatal errors that abort a scan.
#[derive(Debug, Error)]
pub enum MonitorError {
	/// Could not obtain an authenticated job lister.
	#[error("authentication failed: {0}")]
	Authentication(#[source] BoxError),

	/// A page fetch failed. No partial report is sent.
	#[error("failed to list jobs (page {page}): {source}")]
	Listing {
		page: u32,
		#[source]
		source: BoxError,
	},

	#[error(transparent)]
	Report(#[from] ReportError),

	/// The report was collected but could not be delivered.
	#[error("failed to send failure report: {0}")]
	Notification(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
