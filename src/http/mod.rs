pub mod guard;
pub mod rate_limit;
pub mod retry;

use log::{debug, warn};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{PlatformConfig, RuntimeMode};
use crate::error::{Error, Result};
use crate::types::{HttpResponse, RateMeta, RequestOptions};

pub use guard::{build_url, encode_path_segment, validate_url};
pub use rate_limit::{RateLimitSnapshot, RateLimiter};
pub use retry::RetryPolicy;

pub const MAX_REDIRECTS: usize = 10;

pub const DEFAULT_USER_AGENT: &str = concat!("platform-clients/", env!("CARGO_PKG_VERSION"));

/// Response headers checked, in order, for a request id.
const REQUEST_ID_HEADERS: [&str; 3] = ["x-request-id", "request-id", "x-github-request-id"];

/// The one outbound path for every platform: URL guard, auth, rate limit, retry.
///
/// Clones share the connection pool, the config and the rate limiter.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    config: Arc<PlatformConfig>,
    mode: RuntimeMode,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: PlatformConfig, mode: RuntimeMode) -> Result<Self> {
        let inner = Client::builder()
            .use_rustls_tls()
            .redirect(redirect_policy(mode))
            .build()?;
        let limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        let retry = RetryPolicy::from_config(&config);
        Ok(Self {
            inner,
            config: Arc::new(config),
            mode,
            limiter,
            retry,
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        build_url(&self.config.base_url, path, query)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse<T>> {
        let mut options = RequestOptions::new(Method::GET, path);
        for (k, v) in query {
            options = options.query(*k, *v);
        }
        self.request(options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse<T>> {
        self.send_with_body(Method::POST, path, body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse<T>> {
        self.send_with_body(Method::PUT, path, body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse<T>> {
        self.send_with_body(Method::PATCH, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<HttpResponse<T>> {
        self.request(RequestOptions::new(Method::DELETE, path)).await
    }

    async fn send_with_body<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse<T>> {
        let body = serde_json::to_value(body).map_err(Error::Serialize)?;
        self.request(RequestOptions::new(method, path).body(body)).await
    }

    /// Performs one logical call. Validation failures return immediately;
    /// attempt failures are retried with backoff and the last one is surfaced.
    pub async fn request<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>> {
        let url = self.build_url(&options.path, &options.query)?;
        let url = validate_url(url.as_str(), self.mode)?;
        let headers = self.request_headers(&options.headers)?;
        let body = encode_body(options.body.as_ref())?;
        let timeout = options.timeout.unwrap_or(self.config.timeout);

        let mut last_error: Option<Error> = None;
        for attempt in 0..self.retry.max_attempts {
            self.limiter.acquire().await;
            debug!(
                "{} {} {} attempt {}/{}",
                self.config.name,
                options.method,
                url.path(),
                attempt + 1,
                self.retry.max_attempts
            );
            match self
                .attempt(&options.method, &url, &headers, body.as_deref(), timeout)
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if self.retry.has_attempts_after(attempt) {
                        let backoff = self.retry.delay_for_attempt(attempt);
                        warn!(
                            "{} {} {} failed ({}), retrying in {:?}",
                            self.config.name,
                            options.method,
                            url.path(),
                            e,
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(Error::RetriesExhausted {
            attempts: self.retry.max_attempts,
        }))
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<HttpResponse<T>> {
        let mut builder = self
            .inner
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(bytes) = body {
            builder = builder.body(bytes.to_vec());
        }

        let exchange = async move {
            let res = builder.send().await.map_err(blocked_redirect)?;
            let status = res.status();
            let headers = res.headers().clone();
            let text = res.text().await?;
            Ok::<_, Error>((status, headers, text))
        };
        let (status, headers, text) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        if !status.is_success() {
            return Err(Error::Status { status, body: text });
        }
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status_text(status),
            request_id: request_id(&headers),
            headers: flatten_headers(&headers),
            body: decode_body(&text)?,
        })
    }

    /// Defaults first, caller headers over them, auth header last so callers
    /// cannot replace it.
    pub fn request_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(name, value);
        }
        if let Some((name, value)) = self.auth_header()? {
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>> {
        let creds = &self.config.credentials;
        let (name, raw) = if let Some(token) = &creds.access_token {
            (AUTHORIZATION, format!("Bearer {token}"))
        } else if let Some(key) = &creds.api_key {
            let name = HeaderName::from_bytes(self.config.api_key_header.as_bytes())
                .map_err(|e| Error::InvalidHeader(format!("{}: {e}", self.config.api_key_header)))?;
            (name, key.clone())
        } else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| Error::InvalidHeader(format!("{name}: credential is not a valid header value")))?;
        value.set_sensitive(true);
        Ok(Some((name, value)))
    }
}

/// Every redirect hop goes through the same URL guard as the first request.
fn redirect_policy(mode: RuntimeMode) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), mode) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}

pub fn check_redirect(target: &Url, hops: usize, mode: RuntimeMode) -> Result<()> {
    if hops >= MAX_REDIRECTS {
        return Err(Error::InvalidUrl(format!(
            "{target}: more than {MAX_REDIRECTS} redirects"
        )));
    }
    validate_url(target.as_str(), mode).map(|_| ())
}

// A hop refused by `check_redirect` comes back wrapped in a reqwest redirect error.
fn blocked_redirect(err: reqwest::Error) -> Error {
    if err.is_redirect() {
        let refused = std::error::Error::source(&err).and_then(|s| s.downcast_ref::<Error>());
        if let Some(Error::InvalidUrl(msg)) = refused {
            return Error::InvalidUrl(format!("redirect refused: {msg}"));
        }
    }
    Error::Network(err)
}

fn encode_body(body: Option<&serde_json::Value>) -> Result<Option<Vec<u8>>> {
    match body {
        Some(v) if !v.is_null() => serde_json::to_vec(v).map(Some).map_err(Error::Serialize),
        _ => Ok(None),
    }
}

fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(Error::Decode)
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// Upstream quota as advertised by the platform (`x-ratelimit-*` or `ratelimit-*`).
pub fn upstream_rate(headers: &BTreeMap<String, String>) -> Option<RateMeta> {
    let pick = |suffix: &str| {
        headers
            .get(&format!("x-ratelimit-{suffix}"))
            .or_else(|| headers.get(&format!("ratelimit-{suffix}")))
    };
    let remaining = pick("remaining").and_then(|s| s.parse::<i64>().ok());
    let limit = pick("limit").and_then(|s| s.parse::<i64>().ok());
    let reset_at = pick("reset")
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0));
    if remaining.is_none() && limit.is_none() && reset_at.is_none() {
        return None;
    }
    Some(RateMeta {
        remaining,
        limit,
        reset_at,
    })
}
