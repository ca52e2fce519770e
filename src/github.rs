//! Authenticated GitHub REST API client.
//!
//! A thin wrapper over `reqwest` shared by the repository and issue
//! loaders: bearer-token auth, the v3 JSON accept header, and status
//! classification. No retry logic lives here — retry policy for content
//! loading belongs to the ingestion stage.

use anyhow::{bail, Context, Result};
use std::time::Duration;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("repo-qa/", env!("CARGO_PKG_VERSION"));

/// Authenticated client for the GitHub REST API.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl GithubClient {
    /// Create a client from an access token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            token: token.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// GET a path under the API base and parse the JSON response.
    ///
    /// `path` must start with `/` (e.g. `/repos/{owner}/{repo}/branches/main`).
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .with_context(|| format!("GitHub request failed: {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GitHub API error {} for {}: {}", status, path, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from GitHub: {}", path))
    }
}
