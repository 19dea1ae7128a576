use reqwest::Method;
use serde_json::{json, Value};

use super::PlatformKind;
use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::{Error, Result};
use crate::http::{encode_path_segment, HttpClient};
use crate::reshape::{camelize_keys, take_field};
use crate::types::RequestOptions;

/// Notion objects are schemaless enough that they are handed back as camelized JSON.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: HttpClient,
}

impl NotionClient {
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        config.require(PlatformKind::Notion.required_credentials())?;
        Ok(Self::from_http(HttpClient::new(config, mode)?))
    }

    pub fn from_http(http: HttpClient) -> Self {
        Self { http }
    }

    fn options(&self, method: Method, path: String) -> RequestOptions {
        RequestOptions::new(method, path).header("Notion-Version", self.http.config().version.as_str())
    }

    pub async fn search(&self, query: &str, page_size: u32) -> Result<Vec<Value>> {
        let body = json!({ "query": query, "page_size": page_size.clamp(1, 100) });
        let opts = self.options(Method::POST, "/search".into()).body(body);
        self.results(opts).await
    }

    pub async fn get_page(&self, page_id: &str) -> Result<Value> {
        let path = format!("/pages/{}", encode_path_segment(page_id));
        let resp = self.http.request::<Value>(self.options(Method::GET, path)).await?;
        Ok(resp.map(camelize_keys).into_body())
    }

    pub async fn query_database(&self, database_id: &str, filter: Option<Value>) -> Result<Vec<Value>> {
        let path = format!("/databases/{}/query", encode_path_segment(database_id));
        let body = match filter {
            Some(f) => json!({ "filter": f }),
            None => json!({}),
        };
        self.results(self.options(Method::POST, path).body(body)).await
    }

    async fn results(&self, opts: RequestOptions) -> Result<Vec<Value>> {
        let body: Value = self.http.request(opts).await?.into_body();
        match take_field(body, "results")? {
            Value::Array(items) => Ok(items.into_iter().map(camelize_keys).collect()),
            _ => Err(Error::InvalidResponse("`results` is not an array".into())),
        }
    }
}
