// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core of the BigQuery load job monitor.
//!
//! This crate provides:
//! - [`TimeWindow`] validation of the `--duration`/`--unit` pair
//! - [`filter::evaluate`], which picks recent failed load jobs out of a
//!   `jobs.list` page
//! - [`FailureReport`], the numbered table mailed to operators
//! - [`Monitor`], which drives one scan through the [`Connector`],
//!   [`JobLister`] and [`Notifier`] seams
//!
//! The BigQuery and SMTP implementations of those seams live in
//! `bqmonitor-bigquery` and `bqmonitor-smtp`.

pub mod error;
pub mod filter;
pub mod job;
pub mod monitor;
pub mod report;
pub mod window;

pub use error::{BoxError, MonitorError, ReportError, WindowError};
pub use filter::{evaluate, evaluate_at, JobFailure};
pub use job::{JobPage, JobRecord};
pub use monitor::{
	collect_failures, Connector, JobLister, Monitor, MonitorSettings, Notifier, RenderedReport,
	RunSummary,
};
pub use report::{FailureReport, ReportRow, COLUMNS};
pub use window::{scan_limit, validate, TimeUnit, TimeWindow};
