// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The recent time span a scan looks back over.

use std::fmt;
use std::str::FromStr;

use crate::error::WindowError;

/// Unit of a [`TimeWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
	Minutes,
	Hours,
	Days,
}

/// Per-unit constants: the largest accepted duration and the factor used
/// when sizing the scan limit.
struct UnitLimits {
	max_duration: i64,
	limit_multiplier: u64,
}

impl TimeUnit {
	const fn limits(self) -> UnitLimits {
		match self {
			TimeUnit::Minutes => UnitLimits {
				max_duration: 59,
				limit_multiplier: 1,
			},
			TimeUnit::Hours => UnitLimits {
				max_duration: 23,
				limit_multiplier: 10,
			},
			TimeUnit::Days => UnitLimits {
				max_duration: 365,
				limit_multiplier: 100,
			},
		}
	}

	/// Largest duration accepted for this unit (inclusive).
	pub const fn max_duration(self) -> i64 {
		self.limits().max_duration
	}

	/// Rough "minutes per unit" factor used to bound how many jobs a scan
	/// examines. It is intentionally not unit-exact.
	pub const fn limit_multiplier(self) -> u64 {
		self.limits().limit_multiplier
	}

	/// Single-letter code as accepted on the command line.
	pub const fn code(self) -> &'static str {
		match self {
			TimeUnit::Minutes => "M",
			TimeUnit::Hours => "H",
			TimeUnit::Days => "D",
		}
	}

	fn span(self, amount: i64) -> chrono::Duration {
		match self {
			TimeUnit::Minutes => chrono::Duration::minutes(amount),
			TimeUnit::Hours => chrono::Duration::hours(amount),
			TimeUnit::Days => chrono::Duration::days(amount),
		}
	}
}

impl FromStr for TimeUnit {
	type Err = WindowError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"M" | "MINUTES" => Ok(TimeUnit::Minutes),
			"H" | "HOURS" => Ok(TimeUnit::Hours),
			"D" | "DAYS" => Ok(TimeUnit::Days),
			_ => Err(WindowError::UnknownUnit(s.to_string())),
		}
	}
}

impl fmt::Display for TimeUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

/// A validated `(duration, unit)` pair.
///
/// The only constructors check the per-unit bounds, so holding a
/// `TimeWindow` means the window is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
	duration: u32,
	unit: TimeUnit,
}

impl TimeWindow {
	pub fn new(duration: i64, unit: TimeUnit) -> Result<Self, WindowError> {
		if duration <= 0 || duration > unit.max_duration() {
			return Err(WindowError::OutOfRange {
				duration,
				unit,
				max: unit.max_duration(),
			});
		}

		Ok(Self {
			duration: duration as u32,
			unit,
		})
	}

	/// Parse raw command line input. The unit is case-insensitive.
	pub fn parse(duration: i64, unit: &str) -> Result<Self, WindowError> {
		let unit = unit.parse::<TimeUnit>()?;
		Self::new(duration, unit)
	}

	pub fn duration(&self) -> u32 {
		self.duration
	}

	pub fn unit(&self) -> TimeUnit {
		self.unit
	}

	/// The window as a chrono span, used for the job age comparison.
	pub fn as_chrono(&self) -> chrono::Duration {
		self.unit.span(i64::from(self.duration))
	}
}

impl fmt::Display for TimeWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.duration, self.unit)
	}
}

/// Check a raw `(duration, unit)` pair, logging the rejection.
pub fn validate(duration: i64, unit: &str) -> bool {
	match TimeWindow::parse(duration, unit) {
		Ok(_) => true,
		Err(e) => {
			tracing::error!(duration, unit, reason = %e, "Invalid --duration/--unit value.");
			false
		}
	}
}

/// How many jobs a scan may examine before it stops paginating.
///
/// `ceil(multiplier(unit) * duration * jobs_per_minute)`. The rate may be
/// fractional; a non-positive or non-finite rate gives 0 and the cast
/// saturates at `u64::MAX`.
pub fn scan_limit(window: &TimeWindow, jobs_per_minute: f64) -> u64 {
	if !jobs_per_minute.is_finite() || jobs_per_minute <= 0.0 {
		return 0;
	}
	let limit = window.unit.limit_multiplier() as f64 * f64::from(window.duration) * jobs_per_minute;
	limit.ceil() as u64
}
