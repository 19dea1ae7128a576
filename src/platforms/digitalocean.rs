use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PlatformKind;
use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::Result;
use crate::http::HttpClient;
use crate::reshape::take_typed;
use crate::types::RequestOptions;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Account {
    pub email: String,
    pub uuid: String,
    pub status: String,
    pub droplet_limit: u32,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Region {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub memory: u32,
    pub vcpus: u32,
    pub disk: u32,
    pub region: Region,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Action {
    pub id: u64,
    pub status: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropletAction {
    Reboot,
    PowerCycle,
    PowerOff,
    PowerOn,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    http: HttpClient,
}

impl DigitalOceanClient {
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        config.require(PlatformKind::DigitalOcean.required_credentials())?;
        Ok(Self::from_http(HttpClient::new(config, mode)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn account(&self) -> Result<Account> {
        let body: Value = self.http.get("/account", &[]).await?.into_body();
        take_typed(body, "account")
    }

    pub async fn list_droplets(&self, tag: Option<&str>, per_page: u32) -> Result<Vec<Droplet>> {
        let opts = RequestOptions::new(Method::GET, "/droplets")
            .query("per_page", per_page.clamp(1, 200).to_string())
            .query_opt("tag_name", tag);
        let body: Value = self.http.request(opts).await?.into_body();
        take_typed(body, "droplets")
    }

    pub async fn get_droplet(&self, id: u64) -> Result<Droplet> {
        let body: Value = self.http.get(&format!("/droplets/{id}"), &[]).await?.into_body();
        take_typed(body, "droplet")
    }

    pub async fn droplet_action(&self, id: u64, action: DropletAction) -> Result<Action> {
        let body: Value = self
            .http
            .post(&format!("/droplets/{id}/actions"), &json!({ "type": action }))
            .await?
            .into_body();
        take_typed(body, "action")
    }
}
