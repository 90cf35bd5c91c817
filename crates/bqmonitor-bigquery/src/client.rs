// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `jobs.list` client and the service account connector that produces it.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bqmonitor_core::{Connector, JobLister, JobPage};
use bqmonitor_secret::SecretString;
use reqwest::{Client, Url};
use tracing::{debug, error, info, instrument};

use crate::auth::{fetch_access_token, ServiceAccount, BIGQUERY_READONLY_SCOPE, DEFAULT_TOKEN_URL};
use crate::error::{AuthError, ListError};
use crate::http;

/// BigQuery REST API root.
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Settings for [`ServiceAccountConnector`].
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
	/// Project id or number whose jobs are listed.
	pub project_id: String,
	pub service_email: String,
	/// Private key file (PEM or JSON key file).
	pub key_path: PathBuf,
	pub base_url: String,
	pub token_url: String,
	pub timeout: Duration,
}

impl BigQueryConfig {
	pub fn new(
		project_id: impl Into<String>,
		service_email: impl Into<String>,
		key_path: impl Into<PathBuf>,
	) -> Self {
		Self {
			project_id: project_id.into(),
			service_email: service_email.into(),
			key_path: key_path.into(),
			base_url: DEFAULT_BASE_URL.to_string(),
			token_url: DEFAULT_TOKEN_URL.to_string(),
			timeout: http::DEFAULT_TIMEOUT,
		}
	}

	/// Point at a different API root (useful for testing).
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Point at a different token endpoint (useful for testing).
	pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
		self.token_url = token_url.into();
		self
	}
}

/// Authenticates a service account and hands out a [`BigQueryClient`].
#[derive(Debug, Clone)]
pub struct ServiceAccountConnector {
	config: BigQueryConfig,
}

impl ServiceAccountConnector {
	pub fn new(config: BigQueryConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl Connector for ServiceAccountConnector {
	type Lister = BigQueryClient;
	type Error = AuthError;

	#[instrument(skip(self), fields(project_id = %self.config.project_id))]
	async fn connect(&self) -> Result<BigQueryClient, AuthError> {
		let account = ServiceAccount::from_key_file(&self.config.service_email, &self.config.key_path)?;
		let http = http::new_client(self.config.timeout)?;

		info!("Authenticating with the Google BigQuery API.");
		let token = fetch_access_token(&http, &self.config.token_url, &account, BIGQUERY_READONLY_SCOPE).await?;
		info!(expires_in = ?token.expires_in, "Authenticated successfully.");

		Ok(BigQueryClient {
			http,
			base_url: self.config.base_url.clone(),
			project_id: self.config.project_id.clone(),
			access_token: token.token,
		})
	}
}

/// Authenticated `jobs.list` client for one project.
#[derive(Debug, Clone)]
pub struct BigQueryClient {
	http: Client,
	base_url: String,
	project_id: String,
	access_token: SecretString,
}

impl BigQueryClient {
	/// Build a client around an already obtained access token.
	pub fn with_token(
		http: Client,
		base_url: impl Into<String>,
		project_id: impl Into<String>,
		access_token: SecretString,
	) -> Self {
		Self {
			http,
			base_url: base_url.into(),
			project_id: project_id.into(),
			access_token,
		}
	}

	fn jobs_url(&self, page_token: Option<&str>) -> Result<Url, ListError> {
		let mut url = Url::parse(&format!(
			"{}/projects/{}/jobs",
			self.base_url.trim_end_matches('/'),
			self.project_id
		))
		.map_err(|e| ListError::InvalidResponse(format!("invalid base URL: {e}")))?;

		{
			let mut query = url.query_pairs_mut();
			query
				.append_pair("allUsers", "true")
				.append_pair("projection", "full")
				.append_pair("stateFilter", "done");
			if let Some(token) = page_token {
				query.append_pair("pageToken", token);
			}
		}

		Ok(url)
	}
}

#[async_trait]
impl JobLister for BigQueryClient {
	type Error = ListError;

	#[instrument(skip(self), fields(project_id = %self.project_id))]
	async fn list(&self, page_token: Option<&str>) -> Result<JobPage, ListError> {
		let url = self.jobs_url(page_token)?;

		let response = self
			.http
			.get(url)
			.bearer_auth(self.access_token.expose())
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					error!("Request timed out");
					return ListError::Timeout;
				}
				error!(error = %e, "Network error during jobs.list request");
				ListError::Network(e)
			})?;

		let status = response.status();
		let body = response.text().await.map_err(|e| {
			error!(error = %e, "Failed to read response body");
			ListError::Network(e)
		})?;

		if !status.is_success() {
			let status_code = status.as_u16();
			if status_code == 401 || status_code == 403 {
				error!(status = status_code, "Unauthorized jobs.list request");
				return Err(ListError::Unauthorized(body));
			}
			error!(status = status_code, body = %body, "BigQuery API error");
			return Err(ListError::ApiError {
				status: status_code,
				message: body,
			});
		}

		debug!(body = %body, "jobs.list response");

		serde_json::from_str(&body).map_err(|e| {
			error!(error = %e, "Failed to parse jobs.list response");
			ListError::InvalidResponse(format!("JSON parse error: {e}"))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client(base_url: &str) -> BigQueryClient {
		BigQueryClient::with_token(
			Client::new(),
			base_url,
			"123456789",
			SecretString::new("token".into()),
		)
	}

	#[test]
	fn first_page_url_has_no_token() {
		let url = client(DEFAULT_BASE_URL).jobs_url(None).unwrap();
		assert_eq!(
			url.as_str(),
			"https://bigquery.googleapis.com/bigquery/v2/projects/123456789/jobs?allUsers=true&projection=full&stateFilter=done"
		);
	}

	#[test]
	fn page_token_is_encoded() {
		let url = client("http://localhost:9/v2/").jobs_url(Some("a+b/c=")).unwrap();
		assert_eq!(url.path(), "/v2/projects/123456789/jobs");
		assert!(url.query().unwrap().ends_with("pageToken=a%2Bb%2Fc%3D"));
	}

	#[test]
	fn config_defaults_point_at_google() {
		let config = BigQueryConfig::new("p", "svc@p", "/tmp/key.pem");
		assert_eq!(config.base_url, DEFAULT_BASE_URL);
		assert_eq!(config.token_url, DEFAULT_TOKEN_URL);

		let config = config.with_base_url("http://127.0.0.1:1").with_token_url("http://127.0.0.1:1/token");
		assert_eq!(config.base_url, "http://127.0.0.1:1");
		assert_eq!(config.token_url, "http://127.0.0.1:1/token");
	}

	#[test]
	fn client_debug_hides_token() {
		let debug = format!("{:?}", client(DEFAULT_BASE_URL));
		assert!(debug.contains("[REDACTED]"));
	}
}
