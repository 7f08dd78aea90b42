//! Tag-management API client utilities.
//!
//! This crate provides a lightweight client for the remote tag-management
//! service. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Discovering credentials from `TAGFORGE_API_TOKEN` or the token file
//! - Validating `TAGFORGE_API_BASE` for safety
//! - Bounded retry with exponential backoff for transient failures
//!
//! [`TagManagerClient`] is the transport and auth boundary; it never
//! interprets payload semantics. [`ContainerClient`] scopes a transport
//! client to one account/container pair and exposes the resource-creation
//! operations the batch orchestrator drives.

use std::time::Duration;
use std::{env, fs};

use reqwest::{Method, RequestBuilder, header};
use serde_json::Value;
use tracing::debug;
use url::Url;

mod error;
mod resources;
mod retry;

pub use error::ApiError;
pub use resources::{ContainerClient, Workspace};

/// Public API base used when `TAGFORGE_API_BASE` is not set.
pub const DEFAULT_API_BASE: &str = "https://tagmanager.googleapis.com/tagmanager/v2";

/// OAuth scope required of the supplied token: edit access on one container.
pub const EDIT_CONTAINERS_SCOPE: &str = "https://www.googleapis.com/auth/tagmanager.edit.containers";

const API_BASE_ENV: &str = "TAGFORGE_API_BASE";
const TOKEN_ENV: &str = "TAGFORGE_API_TOKEN";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Base domains allowed for non-local configurations of `TAGFORGE_API_BASE`.
/// Subdomains are also allowed.
const ALLOWED_DOMAINS: &[&str] = &["googleapis.com"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Thin wrapper around a configured `reqwest::Client` for the remote
/// tag-management API.
#[derive(Debug, Clone)]
pub struct TagManagerClient {
    pub base_url: String,
    http: reqwest::Client,
    user_agent: String,
}

impl TagManagerClient {
    /// Construct a client from the environment.
    ///
    /// Resolution order for the bearer token:
    /// - `TAGFORGE_API_TOKEN` environment variable
    /// - the token file under the user config directory
    ///   (`~/.config/tagforge/token` on Linux)
    ///
    /// The base URL is taken from `TAGFORGE_API_BASE` when set. Non-localhost
    /// hosts must use HTTPS and live under an allowed domain.
    pub fn from_env() -> Result<Self, ApiError> {
        let token = discover_token()?;

        let mut default_headers = header::HeaderMap::new();
        let mut authorization =
            header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ApiError::MissingCredentials {
                hint: "a token without control characters".to_string(),
            })?;
        authorization.set_sensitive(true);
        default_headers.insert(header::AUTHORIZATION, authorization);
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("tagforge/0.1; {}", env::consts::OS),
        })
    }

    /// Build a request for a method and API-relative path.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    /// Execute one JSON call with retry, returning the parsed response body
    /// (`Value::Null` for empty bodies).
    pub(crate) async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        retry::with_backoff(path, || {
            let method = method.clone();
            async move { self.send_once(method, path, body).await }
        })
        .await
    }

    async fn send_once(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        let mut builder = self.request(method.clone(), path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            debug!(%method, path, status = status.as_u16(), "request rejected");
            return Err(ApiError::from_status(status.as_u16(), truncate_message(&text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| ApiError::UnexpectedPayload {
            detail: error.to_string(),
        })
    }

    /// Resolve an account/container pair from a container identifier, which
    /// may be the numeric container id or the public `GTM-XXXX` id.
    ///
    /// Scans every account the token can see and returns the first container
    /// whose `containerId` or `publicId` matches.
    pub async fn resolve_container(&self, identifier: &str) -> Result<(String, String), ApiError> {
        debug!(identifier, "resolving account and container");
        let accounts = self.send(Method::GET, "/accounts", None).await?;

        for account in list_items(&accounts, "account") {
            let Some(account_id) = resources::id_string(account.get("accountId")) else {
                continue;
            };

            let containers = self
                .send(Method::GET, &format!("/accounts/{account_id}/containers"), None)
                .await?;
            for container in list_items(&containers, "container") {
                let Some(container_id) = resources::id_string(container.get("containerId")) else {
                    continue;
                };
                let public_id = container.get("publicId").and_then(Value::as_str);

                if identifier == container_id || Some(identifier) == public_id {
                    debug!(identifier, %account_id, %container_id, "container resolved");
                    return Ok((account_id, container_id));
                }
            }
        }

        Err(ApiError::ContainerNotFound {
            identifier: identifier.to_string(),
        })
    }
}

fn list_items<'a>(listing: &'a Value, key: &str) -> Vec<&'a Value> {
    listing
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn discover_token() -> Result<String, ApiError> {
    if let Ok(token) = env::var(TOKEN_ENV)
        && !token.trim().is_empty()
    {
        return Ok(token.trim().to_string());
    }

    let token_path = dirs_next::config_dir().map(|dir| dir.join("tagforge").join("token"));
    if let Some(path) = &token_path
        && let Ok(contents) = fs::read_to_string(path)
    {
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    Err(ApiError::MissingCredentials {
        hint: token_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "~/.config/tagforge/token".to_string()),
    })
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS and the host must be an allowed domain
///   or a subdomain thereof
fn validate_base_url(base: &str) -> Result<(), ApiError> {
    let parsed = Url::parse(base).map_err(|error| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason: error.to_string(),
    })?;

    let host = parsed.host_str().ok_or_else(|| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason: "missing host".to_string(),
    })?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(ApiError::InvalidBaseUrl {
            url: base.to_string(),
            reason: format!("non-localhost hosts must use https, got '{}://'", parsed.scheme()),
        });
    }

    let allowed = ALLOWED_DOMAINS
        .iter()
        .any(|&domain| host.eq_ignore_ascii_case(domain) || host.ends_with(&format!(".{domain}")));
    if !allowed {
        return Err(ApiError::InvalidBaseUrl {
            url: base.to_string(),
            reason: format!("host '{host}' is not an allowed API domain"),
        });
    }

    Ok(())
}

/// Keep rejected-payload messages readable in per-item failure records.
fn truncate_message(text: &str) -> String {
    const MAX_LEN: usize = 200;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_LEN {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_LEN - 3).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_base_urls_allow_any_scheme() {
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1:3999/api").is_ok());
    }

    #[test]
    fn production_base_urls_require_https_and_allowed_domain() {
        assert!(validate_base_url(DEFAULT_API_BASE).is_ok());
        assert!(validate_base_url("https://staging.googleapis.com/tagmanager/v2").is_ok());

        let http_error = validate_base_url("http://tagmanager.googleapis.com").expect_err("http refused");
        assert!(http_error.to_string().contains("https"));

        let domain_error = validate_base_url("https://example.com/api").expect_err("domain refused");
        assert!(domain_error.to_string().contains("not an allowed"));
    }

    #[test]
    fn malformed_base_urls_are_rejected() {
        assert!(matches!(
            validate_base_url("not a url"),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn truncate_message_trims_and_bounds() {
        assert_eq!(truncate_message("  short  "), "short");

        let long = "x".repeat(400);
        let truncated = truncate_message(&long);
        assert!(truncated.len() <= 200);
        assert!(truncated.ends_with("..."));
    }
}
