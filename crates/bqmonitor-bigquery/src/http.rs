// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client with the bqmonitor User-Agent.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

/// Default per-request timeout for token and listing calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the User-Agent string: `bqmonitor/{version}`.
pub fn user_agent() -> String {
	format!("bqmonitor/{}", env!("CARGO_PKG_VERSION"))
}

/// A client builder with the standard User-Agent and the given timeout.
pub fn builder(timeout: Duration) -> ClientBuilder {
	Client::builder().user_agent(user_agent()).timeout(timeout)
}

/// Build a client with the standard User-Agent and the given timeout.
pub fn new_client(timeout: Duration) -> Result<Client, reqwest::Error> {
	builder(timeout).build()
}
