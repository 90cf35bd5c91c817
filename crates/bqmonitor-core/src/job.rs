// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! BigQuery job resources as returned by `jobs.list?projection=full`.
//!
//! Only the fields the failure filter reads are modelled. Every field is
//! optional because listed jobs are frequently partial; a missing field is a
//! normal "not a failure" outcome, not a decoding error. A record that does
//! not decode at all is replaced by an empty one so the rest of its page is
//! still scanned.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One page of a `jobs.list` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
	/// Absent (or `null`) when the page is empty.
	#[serde(default, deserialize_with = "lenient_jobs")]
	pub jobs: Option<Vec<JobRecord>>,
	#[serde(default)]
	pub next_page_token: Option<String>,
}

impl JobPage {
	/// Continuation token for the next request, if the listing continues.
	/// An empty token is treated the same as none.
	pub fn continuation(&self) -> Option<&str> {
		self.next_page_token.as_deref().filter(|t| !t.is_empty())
	}

	pub fn job_count(&self) -> usize {
		self.jobs.as_ref().map_or(0, Vec::len)
	}
}

/// Decode each listed job on its own. Malformed entries keep their slot as an
/// empty [`JobRecord`], which never matches the failure filter but still
/// counts towards the jobs examined.
fn lenient_jobs<'de, D>(deserializer: D) -> Result<Option<Vec<JobRecord>>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
	Ok(raw.map(|values| {
		values
			.into_iter()
			.enumerate()
			.map(|(index, value)| {
				serde_json::from_value(value).unwrap_or_else(|e| {
					warn!(index, error = %e, "Skipping malformed job record");
					JobRecord::default()
				})
			})
			.collect()
	}))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
	pub id: Option<String>,
	pub job_reference: Option<JobReference>,
	pub configuration: Option<JobConfiguration>,
	pub statistics: Option<JobStatistics>,
	pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
	pub project_id: Option<String>,
	pub job_id: Option<String>,
	pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
	pub job_type: Option<String>,
	/// Present only on load jobs.
	pub load: Option<LoadConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfiguration {
	pub destination_table: Option<TableReference>,
	pub source_uris: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
	pub project_id: Option<String>,
	pub dataset_id: Option<String>,
	pub table_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
	/// Milliseconds since the epoch.
	pub creation_time: Option<Int64>,
	pub start_time: Option<Int64>,
	pub end_time: Option<Int64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
	pub state: Option<String>,
	/// Set when the job finished in a failed state.
	pub error_result: Option<ErrorProto>,
	pub errors: Option<Vec<ErrorProto>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
	pub reason: Option<String>,
	pub location: Option<String>,
	pub message: Option<String>,
}

/// BigQuery encodes int64 as a JSON string; accept numbers too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Int64 {
	Number(i64),
	Text(String),
}

impl Int64 {
	pub fn value(&self) -> Option<i64> {
		match self {
			Int64::Number(n) => Some(*n),
			Int64::Text(s) => s.trim().parse().ok(),
		}
	}
}

impl From<i64> for Int64 {
	fn from(n: i64) -> Self {
		Int64::Number(n)
	}
}
