// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! BigQuery collaborators for bqmonitor.
//!
//! [`ServiceAccountConnector`] loads the service account key, exchanges a
//! signed JWT for an access token and returns a [`BigQueryClient`], which
//! implements [`bqmonitor_core::JobLister`] over `jobs.list`.

pub mod auth;
mod client;
mod error;
pub mod http;

pub use auth::{AccessToken, ServiceAccount, BIGQUERY_READONLY_SCOPE, DEFAULT_TOKEN_URL};
pub use client::{BigQueryClient, BigQueryConfig, ServiceAccountConnector, DEFAULT_BASE_URL};
pub use error::{AuthError, ListError};
