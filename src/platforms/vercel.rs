use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PlatformKind;
use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::Result;
use crate::http::{encode_path_segment, HttpClient};
use crate::reshape::take_typed;
use crate::types::RequestOptions;

// Vercel already speaks camelCase.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub framework: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// A deployment in either the list shape (`uid`, `state`, `created`) or the
/// single shape (`id`, `readyState`, `createdAt`). Payloads often carry both.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "RawDeployment")]
pub struct Deployment {
    pub uid: String,
    pub name: String,
    pub url: Option<String>,
    pub state: Option<String>,
    pub created: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeployment {
    uid: Option<String>,
    id: Option<String>,
    name: String,
    url: Option<String>,
    state: Option<String>,
    ready_state: Option<String>,
    created: Option<i64>,
    created_at: Option<i64>,
}

impl TryFrom<RawDeployment> for Deployment {
    type Error = String;

    fn try_from(raw: RawDeployment) -> std::result::Result<Self, Self::Error> {
        let uid = raw
            .uid
            .or(raw.id)
            .ok_or_else(|| "deployment has neither `uid` nor `id`".to_string())?;
        Ok(Deployment {
            uid,
            name: raw.name,
            url: raw.url,
            state: raw.state.or(raw.ready_state),
            created: raw.created.or(raw.created_at),
        })
    }
}

#[derive(Debug, Clone)]
pub struct VercelClient {
    http: HttpClient,
}

impl VercelClient {
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        config.require(PlatformKind::Vercel.required_credentials())?;
        Ok(Self::from_http(HttpClient::new(config, mode)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list_projects(&self, limit: u32) -> Result<Vec<Project>> {
        let opts = RequestOptions::new(Method::GET, "/v9/projects")
            .query("limit", limit.clamp(1, 100).to_string());
        let body: Value = self.http.request(opts).await?.into_body();
        take_typed(body, "projects")
    }

    pub async fn list_deployments(
        &self,
        project_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Deployment>> {
        let opts = RequestOptions::new(Method::GET, "/v6/deployments")
            .query("limit", limit.clamp(1, 100).to_string())
            .query_opt("projectId", project_id);
        let body: Value = self.http.request(opts).await?.into_body();
        take_typed(body, "deployments")
    }

    /// Accepts a deployment id or its hostname.
    pub async fn get_deployment(&self, id_or_url: &str) -> Result<Deployment> {
        let path = format!("/v13/deployments/{}", encode_path_segment(id_or_url));
        Ok(self.http.get(&path, &[]).await?.into_body())
    }
}
