// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the BigQuery client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors while obtaining an access token for the service account.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The private key file could not be read.
	#[error("failed to read private key '{}': {source}", path.display())]
	KeyFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The key file was read but holds no usable RSA private key.
	#[error("invalid private key in '{}': {message}", path.display())]
	InvalidKey { path: PathBuf, message: String },

	/// Signing the JWT assertion failed.
	#[error("failed to sign JWT assertion: {0}")]
	Jwt(String),

	/// Network-level error talking to the token endpoint.
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	/// The token endpoint refused the assertion.
	#[error("token request rejected: {status} - {message}")]
	TokenRejected { status: u16, message: String },

	/// Invalid or unparseable token response.
	#[error("invalid token response: {0}")]
	InvalidResponse(String),
}

/// Errors while listing jobs.
#[derive(Debug, Error)]
pub enum ListError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("request timed out")]
	Timeout,

	/// The access token was rejected or lacks permission on the project.
	#[error("unauthorized: {0}")]
	Unauthorized(String),

	/// BigQuery returned an error status.
	#[error("BigQuery API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("invalid response from BigQuery: {0}")]
	InvalidResponse(String),
}
