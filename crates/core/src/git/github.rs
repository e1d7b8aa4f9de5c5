//! GitHub REST API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitHubError;
use crate::models::{CreatedMergeRequest, NewMergeRequest};
use crate::provider::HostingApi;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// Error body returned by the API (`{"message": ..., "errors": [...]}`).
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("gitdesk/0.1"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `POST /repos/{owner}/{repo}/pulls`.
    #[instrument(skip(self, body))]
    pub async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/{}/pulls", self.api_url, owner, repo);
        let payload =
            serde_json::json!({ "title": title, "body": body, "head": head, "base": base });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let pr: PullRequest = resp
            .json()
            .await
            .map_err(|e| GitHubError::ParseError(e.to_string()))?;
        info!(number = pr.number, "created pull request");
        Ok(pr)
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn create_merge_request(
        &self,
        owner: &str,
        repo: &str,
        request: &NewMergeRequest,
    ) -> Result<CreatedMergeRequest, GitHubError> {
        let pr = self
            .create_pull_request(
                owner,
                repo,
                &request.title,
                &request.description,
                &request.head,
                &request.base,
            )
            .await?;
        Ok(CreatedMergeRequest {
            number: pr.number,
            url: pr.html_url,
        })
    }
}

/// Pass successful responses through; turn everything else into a typed
/// error carrying the API's own message.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let reset = resp
        .headers()
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let remaining = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "GitHub API request failed");
    debug!(%body, "GitHub error body");
    Err(error_for_status(
        status.as_u16(),
        reset.as_deref(),
        remaining.as_deref(),
        &body,
    ))
}

/// Map a failed response to a [`GitHubError`].
///
/// GitHub reports primary rate limiting as 403 with
/// `x-ratelimit-remaining: 0`, so that case is a rate limit, not an auth
/// failure.
fn error_for_status(
    status: u16,
    reset: Option<&str>,
    remaining: Option<&str>,
    body: &str,
) -> GitHubError {
    let message = remote_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    match status {
        429 => GitHubError::RateLimited {
            reset_at: reset.unwrap_or("unknown").to_string(),
        },
        403 if remaining == Some("0") => GitHubError::RateLimited {
            reset_at: reset.unwrap_or("unknown").to_string(),
        },
        401 | 403 => GitHubError::AuthenticationFailed(message),
        422 => GitHubError::Unprocessable(message),
        _ => GitHubError::ApiError {
            status,
            body: message,
        },
    }
}

/// Human-readable message from an API error body, joining any per-field
/// detail messages onto the top-level one.
fn remote_message(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    let details: Vec<String> = parsed
        .errors
        .iter()
        .filter_map(|e| e.message.clone().or_else(|| e.code.clone()))
        .collect();
    let mut message = parsed.message;
    if !details.is_empty() {
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&details.join("; "));
    }
    (!message.is_empty()).then_some(message)
}
