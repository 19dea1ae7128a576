use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::PlatformKind;
use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::{Error, Result};
use crate::http::{encode_path_segment, HttpClient};
use crate::types::RequestOptions;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub default_branch: Option<String>,
    pub html_url: String,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Present only when the "issue" is actually a pull request.
    #[serde(default, skip_serializing)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct NewIssue {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawContents {
    path: String,
    sha: String,
    size: u64,
    encoding: Option<String>,
    content: Option<String>,
}

/// A file from the contents API with its payload already decoded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileContents {
    pub path: String,
    pub sha: String,
    pub size: u64,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
}

impl GitHubClient {
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        config.require(PlatformKind::GitHub.required_credentials())?;
        Ok(Self::from_http(HttpClient::new(config, mode)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    fn options(&self, method: Method, path: String) -> RequestOptions {
        let mut opts = RequestOptions::new(method, path).header("Accept", ACCEPT_GITHUB_JSON);
        let version = &self.http.config().version;
        if !version.is_empty() {
            opts = opts.header("X-GitHub-Api-Version", version.as_str());
        }
        opts
    }

    pub async fn authenticated_user(&self) -> Result<User> {
        let opts = self.options(Method::GET, "/user".into());
        Ok(self.http.request(opts).await?.into_body())
    }

    pub async fn list_repos(&self, per_page: u32, page: u32) -> Result<Vec<Repository>> {
        let opts = self
            .options(Method::GET, "/user/repos".into())
            .query("per_page", per_page.clamp(1, 100).to_string())
            .query("page", page.max(1).to_string());
        Ok(self.http.request(opts).await?.into_body())
    }

    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let path = format!("/repos/{}/{}", encode_path_segment(owner), encode_path_segment(repo));
        Ok(self.http.request(self.options(Method::GET, path)).await?.into_body())
    }

    /// Issues only; the endpoint also returns pull requests, which are dropped.
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: IssueState,
        per_page: u32,
    ) -> Result<Vec<Issue>> {
        let path = format!(
            "/repos/{}/{}/issues",
            encode_path_segment(owner),
            encode_path_segment(repo)
        );
        let opts = self
            .options(Method::GET, path)
            .query("state", state.as_str())
            .query("per_page", per_page.clamp(1, 100).to_string());
        let issues: Vec<Issue> = self.http.request(opts).await?.into_body();
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .collect())
    }

    pub async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue) -> Result<Issue> {
        let path = format!(
            "/repos/{}/{}/issues",
            encode_path_segment(owner),
            encode_path_segment(repo)
        );
        let body = serde_json::to_value(issue).map_err(Error::Serialize)?;
        let opts = self.options(Method::POST, path).body(body);
        Ok(self.http.request(opts).await?.into_body())
    }

    /// Fetches one file and decodes its base64 payload as UTF-8.
    pub async fn get_file_contents(
        &self,
        owner: &str,
        repo: &str,
        file_path: &str,
        reference: Option<&str>,
    ) -> Result<FileContents> {
        let encoded_path = file_path
            .trim_matches('/')
            .split('/')
            .map(encode_path_segment)
            .collect::<Vec<_>>()
            .join("/");
        let path = format!(
            "/repos/{}/{}/contents/{}",
            encode_path_segment(owner),
            encode_path_segment(repo),
            encoded_path
        );
        let opts = self.options(Method::GET, path).query_opt("ref", reference);
        let raw: RawContents = self.http.request(opts).await?.into_body();
        let content = decode_content(raw.encoding.as_deref(), raw.content.as_deref())?;
        Ok(FileContents {
            path: raw.path,
            sha: raw.sha,
            size: raw.size,
            content,
        })
    }
}

fn decode_content(encoding: Option<&str>, content: Option<&str>) -> Result<String> {
    let content = content
        .ok_or_else(|| Error::InvalidResponse("contents response has no `content`".into()))?;
    match encoding {
        Some("base64") => {
            // GitHub wraps the payload at 60 columns.
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| Error::InvalidResponse(format!("invalid base64 content: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|_| Error::InvalidResponse("file content is not UTF-8".into()))
        }
        Some("utf-8") | None => Ok(content.to_string()),
        Some(other) => Err(Error::InvalidResponse(format!(
            "unsupported content encoding `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let s = decode_content(Some("base64"), Some("aGVsbG8g\nd29ybGQ=\n")).unwrap();
        assert_eq!(s, "hello world");
    }

    #[test]
    fn rejects_unknown_encoding() {
        assert!(decode_content(Some("none"), Some("x")).is_err());
        assert!(decode_content(Some("base64"), None).is_err());
    }

    #[test]
    fn missing_token_rejected_at_construction() {
        let cfg = PlatformKind::GitHub.defaults();
        assert!(matches!(
            GitHubClient::new(cfg, RuntimeMode::Development),
            Err(Error::MissingCredentials { .. })
        ));
    }

    #[test]
    fn issue_serializes_camel_case() {
        let issue: Issue = serde_json::from_value(serde_json::json!({
            "id": 1, "number": 2, "title": "t", "state": "open",
            "html_url": "https://github.com/o/r/issues/2", "body": null,
            "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-02T00:00:00Z"
        }))
        .unwrap();
        let out = serde_json::to_value(&issue).unwrap();
        assert_eq!(out["htmlUrl"], "https://github.com/o/r/issues/2");
        assert!(out.get("created_at").is_none());
        assert!(out.get("pullRequest").is_none());
    }
}
