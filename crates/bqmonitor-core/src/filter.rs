// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decides whether a listed job is a recent failed load job.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::job::{JobRecord, LoadConfiguration};
use crate::window::TimeWindow;

/// A failed load job extracted from a [`JobRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
	pub job_id: String,
	pub creation_time: DateTime<Utc>,
	pub dataset: String,
	pub table: String,
	pub source_uri: String,
	pub reason: String,
}

/// Evaluate `job` against `window` using the current time.
pub fn evaluate(job: &JobRecord, window: &TimeWindow) -> Option<JobFailure> {
	evaluate_at(job, window, Utc::now())
}

/// Evaluate `job` against `window` as seen at `now`.
///
/// Returns `Some` only for a load job created less than `window` ago whose
/// status carries an `errorResult`, and only when every reported field is
/// present. Anything else, including malformed records, is `None`.
pub fn evaluate_at(job: &JobRecord, window: &TimeWindow, now: DateTime<Utc>) -> Option<JobFailure> {
	let load = load_configuration(job)?;
	let creation_time = creation_time(job)?;

	if now.signed_duration_since(creation_time) >= window.as_chrono() {
		return None;
	}

	let error = job.status.as_ref()?.error_result.as_ref()?;

	let table_ref = load.destination_table.as_ref()?;
	let failure = JobFailure {
		job_id: job.job_reference.as_ref()?.job_id.clone()?,
		creation_time,
		dataset: table_ref.dataset_id.clone()?,
		table: table_ref.table_id.clone()?,
		source_uri: load.source_uris.as_ref()?.first()?.clone(),
		reason: error.message.clone()?,
	};

	info!(
		job_id = %failure.job_id,
		"Job '{}' has completed and was unsuccessful. Reason: {}",
		failure.job_id,
		failure.reason
	);

	Some(failure)
}

fn load_configuration(job: &JobRecord) -> Option<&LoadConfiguration> {
	job.configuration.as_ref()?.load.as_ref()
}

fn creation_time(job: &JobRecord) -> Option<DateTime<Utc>> {
	let millis = job.statistics.as_ref()?.creation_time.as_ref()?.value()?;
	DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::job::{
		ErrorProto, JobConfiguration, JobReference, JobStatistics, JobStatus, TableReference,
	};
	use chrono::{Duration, TimeZone};
	use proptest::prelude::*;

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
	}

	fn failed_load_job(job_id: &str, created: DateTime<Utc>) -> JobRecord {
		JobRecord {
			id: Some(format!("proj:US.{job_id}")),
			job_reference: Some(JobReference {
				project_id: Some("proj".into()),
				job_id: Some(job_id.into()),
				location: Some("US".into()),
			}),
			configuration: Some(JobConfiguration {
				job_type: Some("LOAD".into()),
				load: Some(LoadConfiguration {
					destination_table: Some(TableReference {
						project_id: Some("proj".into()),
						dataset_id: Some("raw".into()),
						table_id: Some("events".into()),
					}),
					source_uris: Some(vec![
						"gs://bucket/a.csv".into(),
						"gs://bucket/b.csv".into(),
					]),
				}),
			}),
			statistics: Some(JobStatistics {
				creation_time: Some(created.timestamp_millis().into()),
				..Default::default()
			}),
			status: Some(JobStatus {
				state: Some("DONE".into()),
				error_result: Some(ErrorProto {
					reason: Some("invalid".into()),
					location: None,
					message: Some("CSV table encountered too many errors".into()),
				}),
				errors: None,
			}),
		}
	}

	fn window(duration: i64, unit: &str) -> TimeWindow {
		TimeWindow::parse(duration, unit).unwrap()
	}

	mod matching {
		use super::*;

		#[test]
		fn extracts_fields_of_recent_failed_load_job() {
			let created = now() - Duration::minutes(2);
			let job = failed_load_job("job_1", created);

			let failure = evaluate_at(&job, &window(5, "M"), now()).unwrap();
			assert_eq!(failure.job_id, "job_1");
			assert_eq!(failure.creation_time, created);
			assert_eq!(failure.dataset, "raw");
			assert_eq!(failure.table, "events");
			assert_eq!(failure.source_uri, "gs://bucket/a.csv");
			assert_eq!(failure.reason, "CSV table encountered too many errors");
		}

		#[test]
		fn evaluation_is_repeatable() {
			let job = failed_load_job("job_1", now() - Duration::hours(1));
			let w = window(2, "H");
			assert_eq!(evaluate_at(&job, &w, now()), evaluate_at(&job, &w, now()));
		}

		#[test]
		fn string_encoded_creation_time_is_accepted() {
			let created = now() - Duration::days(3);
			let mut job = failed_load_job("job_1", created);
			job.statistics.as_mut().unwrap().creation_time =
				Some(crate::job::Int64::Text(created.timestamp_millis().to_string()));

			assert!(evaluate_at(&job, &window(4, "D"), now()).is_some());
		}
	}

	mod rejection {
		use super::*;

		#[test]
		fn non_load_job_is_ignored() {
			let mut job = failed_load_job("query_1", now());
			job.configuration = Some(JobConfiguration {
				job_type: Some("QUERY".into()),
				load: None,
			});
			assert_eq!(evaluate_at(&job, &window(5, "M"), now()), None);
		}

		#[test]
		fn window_is_strict() {
			let job = failed_load_job("job_1", now() - Duration::minutes(5));
			assert_eq!(evaluate_at(&job, &window(5, "M"), now()), None);
		}

		#[test]
		fn successful_job_is_ignored() {
			let mut job = failed_load_job("job_1", now());
			job.status.as_mut().unwrap().error_result = None;
			assert_eq!(evaluate_at(&job, &window(5, "M"), now()), None);
		}

		#[test]
		fn missing_fields_are_skipped_silently() {
			let w = window(5, "M");
			let base = failed_load_job("job_1", now());

			let mut job = base.clone();
			job.status = None;
			assert_eq!(evaluate_at(&job, &w, now()), None);

			let mut job = base.clone();
			job.statistics = None;
			assert_eq!(evaluate_at(&job, &w, now()), None);

			let mut job = base.clone();
			job.job_reference = None;
			assert_eq!(evaluate_at(&job, &w, now()), None);

			let mut job = base.clone();
			job.status.as_mut().unwrap().error_result.as_mut().unwrap().message = None;
			assert_eq!(evaluate_at(&job, &w, now()), None);

			let mut job = base.clone();
			job.configuration.as_mut().unwrap().load.as_mut().unwrap().source_uris = Some(vec![]);
			assert_eq!(evaluate_at(&job, &w, now()), None);

			let mut job = base;
			job.statistics.as_mut().unwrap().creation_time =
				Some(crate::job::Int64::Text("not-a-number".into()));
			assert_eq!(evaluate_at(&job, &w, now()), None);

			assert_eq!(evaluate_at(&JobRecord::default(), &w, now()), None);
		}
	}

	proptest! {
		#[test]
		fn stale_jobs_never_match(extra_minutes in 0i64..10_000, duration in 1i64..=59) {
			let w = window(duration, "M");
			let job = failed_load_job("job", now() - Duration::minutes(duration + extra_minutes));
			prop_assert_eq!(evaluate_at(&job, &w, now()), None);
		}

		#[test]
		fn recent_failed_jobs_always_match(age_secs in 0i64..(23 * 3600), duration in 1i64..=23) {
			prop_assume!(age_secs < duration * 3600);
			let w = window(duration, "H");
			let job = failed_load_job("job", now() - Duration::seconds(age_secs));
			let failure = evaluate_at(&job, &w, now());
			prop_assert!(failure.is_some());
			prop_assert_eq!(failure.unwrap().source_uri, "gs://bucket/a.csv");
		}
	}
}
