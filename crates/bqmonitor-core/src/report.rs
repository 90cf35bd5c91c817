// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Numbered table of failed jobs, rendered for the alert email.

use minijinja::Environment;
use serde::Serialize;

use crate::error::ReportError;
use crate::filter::JobFailure;

/// Column headings, in display order.
pub const COLUMNS: [&str; 7] = [
	"No.",
	"Job Id",
	"Creation Time",
	"Dataset",
	"Table",
	"SourceURI",
	"Failure Reason",
];

const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f UTC";

// The `.html` suffix turns on minijinja's HTML auto-escaping.
const TABLE_TEMPLATE_NAME: &str = "failures.html";
const TABLE_TEMPLATE: &str = r#"<table>
  <thead>
    <tr>
{%- for column in columns %}
      <th style="padding-left: 1em; padding-right: 1em; text-align: left">{{ column }}</th>
{%- endfor %}
    </tr>
  </thead>
  <tbody>
{%- for row in rows %}
    <tr>
{%- for cell in row %}
      <td style="padding-left: 1em; padding-right: 1em; text-align: left; vertical-align: top">{{ cell }}</td>
{%- endfor %}
    </tr>
{%- endfor %}
  </tbody>
</table>"#;

/// One numbered line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
	/// 1-based, assigned at insertion.
	pub number: usize,
	pub failure: JobFailure,
}

impl ReportRow {
	fn cells(&self) -> [String; 7] {
		[
			self.number.to_string(),
			self.failure.job_id.clone(),
			self.failure
				.creation_time
				.format(CREATION_TIME_FORMAT)
				.to_string(),
			self.failure.dataset.clone(),
			self.failure.table.clone(),
			self.failure.source_uri.clone(),
			self.failure.reason.clone(),
		]
	}
}

#[derive(Serialize)]
struct TableContext<'a> {
	columns: &'a [&'a str],
	rows: Vec<[String; 7]>,
}

/// Failures collected during one scan.
#[derive(Debug, Clone, Default)]
pub struct FailureReport {
	rows: Vec<ReportRow>,
}

impl FailureReport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a failure and return its row number.
	pub fn add(&mut self, failure: JobFailure) -> usize {
		let number = self.rows.len() + 1;
		self.rows.push(ReportRow { number, failure });
		number
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Rows ordered by number.
	pub fn rows(&self) -> &[ReportRow] {
		&self.rows
	}

	/// Render the rows as an HTML `<table>` fragment.
	pub fn render_html(&self) -> Result<String, ReportError> {
		let mut env = Environment::new();
		env.add_template(TABLE_TEMPLATE_NAME, TABLE_TEMPLATE)?;
		let template = env.get_template(TABLE_TEMPLATE_NAME)?;

		let ctx = TableContext {
			columns: &COLUMNS,
			rows: self.rows.iter().map(ReportRow::cells).collect(),
		};
		Ok(template.render(&ctx)?)
	}

	/// Render the rows as a fixed-width text table.
	pub fn render_text(&self) -> String {
		let rows: Vec<[String; 7]> = self.rows.iter().map(ReportRow::cells).collect();

		let mut widths = COLUMNS.map(|c| c.chars().count());
		for row in &rows {
			for (width, cell) in widths.iter_mut().zip(row) {
				*width = (*width).max(cell.chars().count());
			}
		}

		let separator = widths
			.iter()
			.map(|w| "-".repeat(w + 2))
			.collect::<Vec<_>>()
			.join("+");
		let separator = format!("+{separator}+");

		let mut out = vec![
			separator.clone(),
			text_line(COLUMNS.iter().copied(), &widths),
			separator.clone(),
		];
		for row in &rows {
			out.push(text_line(row.iter().map(String::as_str), &widths));
		}
		out.push(separator);
		out.join("\n")
	}
}

fn text_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
	let inner = cells
		.zip(widths)
		.map(|(cell, &width)| format!(" {cell:<width$} "))
		.collect::<Vec<_>>()
		.join("|");
	format!("|{inner}|")
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};

	fn failure(job_id: &str, reason: &str) -> JobFailure {
		JobFailure {
			job_id: job_id.to_string(),
			creation_time: Utc.with_ymd_and_hms(2024, 3, 1, 11, 58, 0).unwrap(),
			dataset: "raw".to_string(),
			table: "events".to_string(),
			source_uri: "gs://bucket/events.csv".to_string(),
			reason: reason.to_string(),
		}
	}

	#[test]
	fn numbers_rows_in_insertion_order() {
		let mut report = FailureReport::new();
		assert!(report.is_empty());

		for i in 0..4 {
			let number = report.add(failure(&format!("job_{i}"), "boom"));
			assert_eq!(number, i + 1);
		}

		assert_eq!(report.len(), 4);
		let numbers: Vec<usize> = report.rows().iter().map(|r| r.number).collect();
		assert_eq!(numbers, vec![1, 2, 3, 4]);
		assert_eq!(report.rows()[2].failure.job_id, "job_2");
	}

	#[test]
	fn html_has_all_columns_and_cells() {
		let mut report = FailureReport::new();
		report.add(failure("job_abc", "Too many errors"));

		let html = report.render_html().unwrap();
		assert!(html.starts_with("<table>"));
		for column in COLUMNS {
			assert!(html.contains(&format!(">{column}</th>")), "missing {column}");
		}
		assert!(html.contains(">job_abc</td>"));
		assert!(html.contains(">2024-03-01 11:58:00.000 UTC</td>"));
		assert!(html.contains("events.csv</td>"));
		assert!(html.contains("text-align: left"));
	}

	#[test]
	fn html_escapes_error_messages() {
		let mut report = FailureReport::new();
		report.add(failure("job_1", "Unexpected <EOF> & bad row"));

		let html = report.render_html().unwrap();
		assert!(html.contains("&lt;EOF&gt;"));
		assert!(html.contains("&amp; bad row"));
		assert!(!html.contains("<EOF>"));
	}

	#[test]
	fn text_table_is_aligned() {
		let mut report = FailureReport::new();
		report.add(failure("job_1", "short"));
		report.add(failure("job_22", "a much longer failure reason"));

		let text = report.render_text();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 6);
		assert!(lines[1].contains("Failure Reason"));
		assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
	}
}
