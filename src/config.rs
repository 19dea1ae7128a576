use log::warn;
use serde::Serialize;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Whether outbound URLs are held to the production SSRF policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// Reads `APP_ENV`; `production` or `prod` (any case) selects production.
    pub fn from_env() -> Self {
        Self::parse(env::var("APP_ENV").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "production" || v == "prod" => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == RuntimeMode::Production
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ApiKey,
    ApiSecret,
    AccessToken,
    RefreshToken,
    WebhookSecret,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 5] = [
        CredentialKind::ApiKey,
        CredentialKind::ApiSecret,
        CredentialKind::AccessToken,
        CredentialKind::RefreshToken,
        CredentialKind::WebhookSecret,
    ];

    /// Suffix appended to the platform prefix, e.g. `GITHUB` + `_ACCESS_TOKEN`.
    pub fn env_suffix(self) -> &'static str {
        match self {
            CredentialKind::ApiKey => "_API_KEY",
            CredentialKind::ApiSecret => "_API_SECRET",
            CredentialKind::AccessToken => "_ACCESS_TOKEN",
            CredentialKind::RefreshToken => "_REFRESH_TOKEN",
            CredentialKind::WebhookSecret => "_WEBHOOK_SECRET",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialKind::ApiKey => "api_key",
            CredentialKind::ApiSecret => "api_secret",
            CredentialKind::AccessToken => "access_token",
            CredentialKind::RefreshToken => "refresh_token",
            CredentialKind::WebhookSecret => "webhook_secret",
        };
        f.write_str(s)
    }
}

/// Pre-supplied secrets for one platform. All optional.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub webhook_secret: Option<String>,
}

impl Credentials {
    pub fn get(&self, kind: CredentialKind) -> Option<&str> {
        let v = match kind {
            CredentialKind::ApiKey => &self.api_key,
            CredentialKind::ApiSecret => &self.api_secret,
            CredentialKind::AccessToken => &self.access_token,
            CredentialKind::RefreshToken => &self.refresh_token,
            CredentialKind::WebhookSecret => &self.webhook_secret,
        };
        v.as_deref()
    }

    fn set(&mut self, kind: CredentialKind, value: Option<String>) {
        let slot = match kind {
            CredentialKind::ApiKey => &mut self.api_key,
            CredentialKind::ApiSecret => &mut self.api_secret,
            CredentialKind::AccessToken => &mut self.access_token,
            CredentialKind::RefreshToken => &mut self.refresh_token,
            CredentialKind::WebhookSecret => &mut self.webhook_secret,
        };
        *slot = value;
    }

    pub fn present(&self) -> Vec<CredentialKind> {
        CredentialKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &self.present())
            .finish()
    }
}

/// Static description of one remote API. Immutable once a client is built from it.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub name: String,
    pub enabled: bool,
    pub base_url: String,
    pub version: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub rate_limit_per_minute: u32,
    pub api_key_header: String,
}

impl PlatformConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            base_url: base_url.into(),
            version: String::new(),
            credentials: Credentials::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_secs(1),
            rate_limit_per_minute: 60,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        }
    }

    /// Load configuration for `prefix` from the process environment.
    ///
    /// Env vars (all optional):
    /// - `<PREFIX>_ENABLED` (enabled iff exactly `true`)
    /// - `<PREFIX>_API_KEY`, `<PREFIX>_API_SECRET`, `<PREFIX>_ACCESS_TOKEN`,
    ///   `<PREFIX>_REFRESH_TOKEN`, `<PREFIX>_WEBHOOK_SECRET`
    /// - `<PREFIX>_BASE_URL` (default: the platform's public API)
    /// - `<PREFIX>_TIMEOUT_SECS` (default: 30)
    /// - `<PREFIX>_RETRY_ATTEMPTS` (default: 3)
    /// - `<PREFIX>_RATE_LIMIT` requests per minute
    ///
    /// Missing credentials are not an error here; see [`PlatformConfig::require`].
    pub fn from_env(prefix: &str, defaults: PlatformConfig) -> Self {
        Self::from_lookup(prefix, defaults, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(prefix: &str, defaults: PlatformConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{prefix}{suffix}")).filter(|v| !v.is_empty());
        let mut cfg = defaults;

        cfg.enabled = var("_ENABLED").as_deref() == Some("true");
        for kind in CredentialKind::ALL {
            cfg.credentials.set(kind, var(kind.env_suffix()));
        }
        if let Some(url) = var("_BASE_URL") {
            cfg.base_url = url;
        }
        let number = |suffix: &str| -> Option<u64> {
            let raw = var(suffix)?;
            match parse_number(&format!("{prefix}{suffix}"), &raw) {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("{e}; keeping the default");
                    None
                }
            }
        };
        if let Some(secs) = number("_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = number("_RETRY_ATTEMPTS") {
            cfg.retry_attempts = clamp_u32(n);
        }
        if let Some(n) = number("_RATE_LIMIT") {
            cfg.rate_limit_per_minute = clamp_u32(n);
        }
        cfg
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.access_token = Some(token.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.api_key = Some(key.into());
        self
    }

    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute.max(1);
        self
    }

    /// Credential check helper: every kind in `required` must be present.
    pub fn require(&self, required: &[CredentialKind]) -> Result<()> {
        let missing: Vec<CredentialKind> = required
            .iter()
            .copied()
            .filter(|k| self.credentials.get(*k).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingCredentials {
                platform: self.name.clone(),
                missing,
            })
        }
    }

    /// True when a request would carry an auth header (access token or API key).
    pub fn has_auth(&self) -> bool {
        self.credentials.access_token.is_some() || self.credentials.api_key.is_some()
    }

    pub fn ensure_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(Error::PlatformDisabled(self.name.clone()))
        }
    }
}

/// Parses a numeric override, naming the variable on failure.
pub fn parse_number(var: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| Error::Config(format!("{var}={raw:?} is not a non-negative integer: {e}")))
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX).max(1)
}
