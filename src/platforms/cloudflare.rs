use reqwest::{Method, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::{Error, Result};
use crate::http::{encode_path_segment, HttpClient};
use crate::types::RequestOptions;

/// Cloudflare wraps every response in `{success, errors, messages, result}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub name_servers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub proxied: Option<bool>,
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDnsRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    /// 1 means "automatic".
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: HttpClient,
}

impl CloudflareClient {
    /// Accepts either a scoped API token or the global API key.
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        if !config.has_auth() {
            return Err(Error::MissingCredentials {
                platform: config.name.clone(),
                missing: vec![crate::config::CredentialKind::AccessToken],
            });
        }
        Ok(Self::from_http(HttpClient::new(config, mode)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    async fn call<T: DeserializeOwned>(&self, opts: RequestOptions) -> Result<T> {
        let platform = &self.http.config().name;
        match self.http.request::<Envelope<T>>(opts).await {
            Ok(resp) => unwrap_result(platform, resp.into_body()),
            Err(Error::Status { status, body }) => {
                Err(failed_envelope(platform, status, &body).unwrap_or(Error::Status { status, body }))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_zones(&self, name: Option<&str>) -> Result<Vec<Zone>> {
        let opts = RequestOptions::new(Method::GET, "/zones").query_opt("name", name);
        self.call(opts).await
    }

    pub async fn list_dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let path = format!("/zones/{}/dns_records", encode_path_segment(zone_id));
        self.call(RequestOptions::new(Method::GET, path)).await
    }

    pub async fn create_dns_record(&self, zone_id: &str, record: &NewDnsRecord) -> Result<DnsRecord> {
        let path = format!("/zones/{}/dns_records", encode_path_segment(zone_id));
        let body = serde_json::to_value(record).map_err(Error::Serialize)?;
        self.call(RequestOptions::new(Method::POST, path).body(body)).await
    }

    /// Returns the id of the deleted record.
    pub async fn delete_dns_record(&self, zone_id: &str, record_id: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Deleted {
            id: String,
        }
        let path = format!(
            "/zones/{}/dns_records/{}",
            encode_path_segment(zone_id),
            encode_path_segment(record_id)
        );
        let deleted: Deleted = self.call(RequestOptions::new(Method::DELETE, path)).await?;
        Ok(deleted.id)
    }
}

fn join_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error statuses usually carry the same envelope; surface its messages.
fn failed_envelope(platform: &str, status: StatusCode, body: &str) -> Option<Error> {
    let envelope: Envelope<IgnoredAny> = serde_json::from_str(body).ok()?;
    if envelope.success || envelope.errors.is_empty() {
        return None;
    }
    Some(Error::Api {
        platform: platform.to_string(),
        message: format!("HTTP {}: {}", status.as_u16(), join_errors(&envelope.errors)),
    })
}

fn unwrap_result<T>(platform: &str, envelope: Envelope<T>) -> Result<T> {
    if !envelope.success {
        return Err(Error::Api {
            platform: platform.to_string(),
            message: join_errors(&envelope.errors),
        });
    }
    envelope
        .result
        .ok_or_else(|| Error::InvalidResponse("successful envelope without `result`".into()))
}
