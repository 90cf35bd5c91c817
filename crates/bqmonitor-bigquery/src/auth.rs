// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Service account authentication using the OAuth 2.0 JWT bearer grant.
//!
//! A short-lived RS256 assertion is signed with the service account's private
//! key and exchanged at the token endpoint for a bearer access token.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bqmonitor_secret::SecretString;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::error::AuthError;

/// Read-only BigQuery scope; listing jobs needs nothing more.
pub const BIGQUERY_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

/// Google's OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Google caps assertion lifetime at one hour.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// JWT claims for the bearer grant.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
	pub iss: String,
	pub scope: String,
	pub aud: String,
	pub iat: u64,
	pub exp: u64,
}

/// The subset of a Google JSON key file that matters here.
#[derive(Deserialize)]
struct JsonKeyFile {
	private_key: String,
	#[serde(default)]
	private_key_id: Option<String>,
}

/// A service account identity and its private key.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
	email: String,
	key_id: Option<String>,
	private_key: SecretString,
}

impl ServiceAccount {
	pub fn new(email: impl Into<String>, private_key_pem: SecretString) -> Self {
		Self {
			email: email.into(),
			key_id: None,
			private_key: private_key_pem,
		}
	}

	/// Load the private key for `email` from `path`.
	///
	/// The file may hold a PEM private key or a Google JSON key file. A
	/// missing or unreadable file is an error; nothing downstream can
	/// authenticate without it.
	#[instrument(skip(email, path), fields(path = %path.display()))]
	pub fn from_key_file(email: impl Into<String>, path: &Path) -> Result<Self, AuthError> {
		let contents = std::fs::read_to_string(path).map_err(|e| {
			error!(error = %e, "No such file or directory: '{}'.", path.display());
			AuthError::KeyFile {
				path: path.to_path_buf(),
				source: e,
			}
		})?;

		let (pem, key_id) = match serde_json::from_str::<JsonKeyFile>(&contents) {
			Ok(json) => (json.private_key, json.private_key_id),
			Err(_) if contents.contains("PRIVATE KEY-----") => (contents, None),
			Err(e) => {
				return Err(AuthError::InvalidKey {
					path: path.to_path_buf(),
					message: format!("neither a PEM key nor a JSON key file: {e}"),
				})
			}
		};

		// Fail here rather than at signing time so the error names the file.
		EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::InvalidKey {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;

		info!(
			"Google BigQuery API private key has been loaded. Using key: '{}'.",
			path.display()
		);

		Ok(Self {
			email: email.into(),
			key_id,
			private_key: SecretString::new(pem),
		})
	}

	pub fn email(&self) -> &str {
		&self.email
	}

	/// Sign a bearer-grant assertion for `scope`, addressed to `audience`.
	pub fn assertion(&self, scope: &str, audience: &str) -> Result<String, AuthError> {
		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map_err(|e| AuthError::Jwt(format!("system time error: {e}")))?
			.as_secs();

		let claims = Claims {
			iss: self.email.clone(),
			scope: scope.to_string(),
			aud: audience.to_string(),
			iat: now,
			exp: now + ASSERTION_LIFETIME.as_secs(),
		};

		let key = EncodingKey::from_rsa_pem(self.private_key.expose().as_bytes())
			.map_err(|e| AuthError::Jwt(format!("invalid RSA private key: {e}")))?;

		let mut header = Header::new(Algorithm::RS256);
		header.kid = self.key_id.clone();

		encode(&header, &claims, &key).map_err(|e| AuthError::Jwt(format!("failed to encode JWT: {e}")))
	}
}

/// A bearer token returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct AccessToken {
	pub token: SecretString,
	pub expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
	expires_in: Option<u64>,
	error: Option<String>,
	error_description: Option<String>,
}

/// Exchange a signed assertion for an access token.
#[instrument(skip_all, fields(email = %account.email(), token_url = %token_url))]
pub async fn fetch_access_token(
	http: &Client,
	token_url: &str,
	account: &ServiceAccount,
	scope: &str,
) -> Result<AccessToken, AuthError> {
	let assertion = account.assertion(scope, token_url)?;

	debug!("requesting access token");

	let response = http
		.post(token_url)
		.form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
		.send()
		.await?;

	let status = response.status();
	let body = response.text().await?;
	let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
		error!(status = status.as_u16(), error = %e, "Failed to parse token response");
		AuthError::InvalidResponse(format!("JSON parse error: {e}"))
	})?;

	if !status.is_success() {
		let message = match (parsed.error, parsed.error_description) {
			(Some(code), Some(description)) => format!("{code}: {description}"),
			(Some(code), None) => code,
			(None, Some(description)) => description,
			(None, None) => body,
		};
		error!(status = status.as_u16(), message = %message, "Token request rejected");
		return Err(AuthError::TokenRejected {
			status: status.as_u16(),
			message,
		});
	}

	let token = parsed
		.access_token
		.ok_or_else(|| AuthError::InvalidResponse("missing access_token".to_string()))?;

	Ok(AccessToken {
		token: SecretString::new(token),
		expires_in: parsed.expires_in,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
	use std::io::Write;
	use std::path::PathBuf;

	const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

	fn fixture(name: &str) -> PathBuf {
		Path::new(FIXTURES).join(name)
	}

	#[test]
	fn loads_pem_key_file() {
		let account =
			ServiceAccount::from_key_file("svc@proj.iam.gserviceaccount.com", &fixture("test-service-account.pem"))
				.unwrap();
		assert_eq!(account.email(), "svc@proj.iam.gserviceaccount.com");
		assert!(account.key_id.is_none());
	}

	#[test]
	fn loads_json_key_file() {
		let account =
			ServiceAccount::from_key_file("svc@proj.iam.gserviceaccount.com", &fixture("test-service-account.json"))
				.unwrap();
		assert_eq!(account.key_id.as_deref(), Some("0123456789abcdef"));
	}

	#[test]
	fn missing_key_file_is_an_error() {
		let err = ServiceAccount::from_key_file("svc@x", Path::new("/nonexistent/key.pem")).unwrap_err();
		assert!(matches!(err, AuthError::KeyFile { .. }));
		assert!(err.to_string().contains("/nonexistent/key.pem"));
	}

	#[test]
	fn garbage_key_file_is_an_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "not a key").unwrap();

		let err = ServiceAccount::from_key_file("svc@x", file.path()).unwrap_err();
		assert!(matches!(err, AuthError::InvalidKey { .. }));
	}

	#[test]
	fn assertion_is_signed_rs256_with_expected_claims() {
		let account =
			ServiceAccount::from_key_file("svc@proj.iam.gserviceaccount.com", &fixture("test-service-account.json"))
				.unwrap();

		let jwt = account
			.assertion(BIGQUERY_READONLY_SCOPE, DEFAULT_TOKEN_URL)
			.unwrap();

		let header = decode_header(&jwt).unwrap();
		assert_eq!(header.alg, Algorithm::RS256);
		assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

		let public_pem = std::fs::read(fixture("test-service-account.pub.pem")).unwrap();
		let mut validation = Validation::new(Algorithm::RS256);
		validation.set_audience(&[DEFAULT_TOKEN_URL]);
		let claims = decode::<Claims>(&jwt, &DecodingKey::from_rsa_pem(&public_pem).unwrap(), &validation)
			.unwrap()
			.claims;

		assert_eq!(claims.iss, "svc@proj.iam.gserviceaccount.com");
		assert_eq!(claims.scope, BIGQUERY_READONLY_SCOPE);
		assert_eq!(claims.exp - claims.iat, 3600);
	}

	#[test]
	fn account_debug_hides_private_key() {
		let account = ServiceAccount::new("svc@x", SecretString::new("PRIVATE-MATERIAL".into()));
		assert!(!format!("{account:?}").contains("PRIVATE-MATERIAL"));
	}
}
