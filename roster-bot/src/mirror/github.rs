//! GitHub REST contents API client

use super::{ContentsApi, MirrorError, RemoteLookup, VersionHandle};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: ContentEntry,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    /// Base64 of the full file
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

pub struct GitHubContents {
    http: Client,
    api_base: String,
    token: String,
    /// `owner/repo`
    repo: String,
    branch: Option<String>,
    timeout: Duration,
}

impl GitHubContents {
    pub fn new(token: String, repo: String, branch: Option<String>, timeout: Duration) -> Self {
        Self {
            http: crate::http::shared_client().clone(),
            api_base: GITHUB_API_BASE.to_string(),
            token,
            repo,
            branch,
            timeout,
        }
    }

    /// Point the client at a different API host (GitHub Enterprise).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn contents_url(&self, path: &str) -> String {
        contents_url(&self.api_base, &self.repo, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .timeout(self.timeout)
    }
}

/// Contents endpoint for `path`, with each path segment percent-encoded.
fn contents_url(api_base: &str, repo: &str, path: &str) -> String {
    let encoded: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();
    format!("{}/repos/{}/contents/{}", api_base, repo, encoded.join("/"))
}

/// Map a non-success status to a mirror error.
fn classify(status: StatusCode, body: String, writing: bool) -> MirrorError {
    match status.as_u16() {
        401 | 403 => MirrorError::Auth(body),
        409 | 422 if writing => MirrorError::Conflict(body),
        code => MirrorError::Api { status: code, body },
    }
}

fn network_error(e: reqwest::Error) -> MirrorError {
    MirrorError::Network(e.to_string())
}

#[async_trait]
impl ContentsApi for GitHubContents {
    async fn lookup(&self, path: &str) -> Result<RemoteLookup, MirrorError> {
        let mut request = self.http.get(self.contents_url(path));
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch.as_str())]);
        }

        let response = self.authorized(request).send().await.map_err(network_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(RemoteLookup::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, body, false));
        }

        // A directory at `path` comes back as an array and fails here
        let entry: ContentEntry = response
            .json()
            .await
            .map_err(|e| MirrorError::Decode(format!("{} is not a file: {}", path, e)))?;
        Ok(RemoteLookup::Found(VersionHandle(entry.sha)))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        handle: Option<&VersionHandle>,
    ) -> Result<VersionHandle, MirrorError> {
        let body = PutRequest {
            message,
            content: BASE64.encode(content),
            sha: handle.map(|h| h.0.as_str()),
            branch: self.branch.as_deref(),
        };

        let response = self
            .authorized(self.http.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, body, true));
        }

        let created: PutResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::Decode(e.to_string()))?;
        Ok(VersionHandle(created.content.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_url_encodes_segments() {
        assert_eq!(
            contents_url(GITHUB_API_BASE, "pallet/roster", "players.csv"),
            "https://api.github.com/repos/pallet/roster/contents/players.csv"
        );
        assert_eq!(
            contents_url("https://ghe.local/api/v3", "a/b", "/data/my players.csv"),
            "https://ghe.local/api/v3/repos/a/b/contents/data/my%20players.csv"
        );
    }

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "Bad credentials".into(), false),
            MirrorError::Auth(_)
        ));
        assert!(matches!(
            classify(StatusCode::CONFLICT, "sha mismatch".into(), true),
            MirrorError::Conflict(_)
        ));
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, "sha wasn't supplied".into(), true),
            MirrorError::Conflict(_)
        ));
        assert_eq!(
            classify(StatusCode::CONFLICT, "repo empty".into(), false),
            MirrorError::Api { status: 409, body: "repo empty".into() }
        );
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, String::new(), true),
            MirrorError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_put_request_body() {
        let update = PutRequest {
            message: "Update player data - 2024-03-09 14:05:07 UTC",
            content: BASE64.encode(b"friendcode,ign,discord_id,discord_role\n"),
            sha: Some("abc123"),
            branch: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["sha"], "abc123");
        assert_eq!(
            json["content"],
            "ZnJpZW5kY29kZSxpZ24sZGlzY29yZF9pZCxkaXNjb3JkX3JvbGUK"
        );
        assert!(json.get("branch").is_none());

        let create = PutRequest {
            message: "Initial player data",
            content: String::new(),
            sha: None,
            branch: Some("data"),
        };
        let json = serde_json::to_value(&create).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["branch"], "data");
    }

    #[test]
    fn test_decode_put_response() {
        let raw = r#"{"content":{"name":"players.csv","sha":"95b966ae1c166bd92f8ae7d1c313e738c731dfc3"},"commit":{"sha":"7638417db6d59f3c431d3e1f261cc637155684cd"}}"#;
        let parsed: PutResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.sha, "95b966ae1c166bd92f8ae7d1c313e738c731dfc3");
    }
}
