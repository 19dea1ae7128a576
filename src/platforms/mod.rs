//! Known platforms, their defaults, and a registry built from the environment.

pub mod cloudflare;
pub mod digitalocean;
pub mod github;
pub mod notion;
pub mod vercel;

use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::config::{CredentialKind, PlatformConfig};
use crate::error::Error;

pub use cloudflare::CloudflareClient;
pub use digitalocean::DigitalOceanClient;
pub use github::GitHubClient;
pub use notion::NotionClient;
pub use vercel::VercelClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    GitHub,
    Cloudflare,
    DigitalOcean,
    Vercel,
    Notion,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 5] = [
        PlatformKind::GitHub,
        PlatformKind::Cloudflare,
        PlatformKind::DigitalOcean,
        PlatformKind::Vercel,
        PlatformKind::Notion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "github",
            PlatformKind::Cloudflare => "cloudflare",
            PlatformKind::DigitalOcean => "digitalocean",
            PlatformKind::Vercel => "vercel",
            PlatformKind::Notion => "notion",
        }
    }

    pub fn env_prefix(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "GITHUB",
            PlatformKind::Cloudflare => "CLOUDFLARE",
            PlatformKind::DigitalOcean => "DIGITALOCEAN",
            PlatformKind::Vercel => "VERCEL",
            PlatformKind::Notion => "NOTION",
        }
    }

    /// Public base URL, API version and a per-minute budget under the vendor's published limit.
    pub fn defaults(self) -> PlatformConfig {
        let (base_url, version, per_minute) = match self {
            PlatformKind::GitHub => ("https://api.github.com", "2022-11-28", 80),
            PlatformKind::Cloudflare => ("https://api.cloudflare.com/client/v4", "v4", 240),
            PlatformKind::DigitalOcean => ("https://api.digitalocean.com/v2", "v2", 250),
            PlatformKind::Vercel => ("https://api.vercel.com", "v9", 100),
            PlatformKind::Notion => ("https://api.notion.com/v1", "2022-06-28", 180),
        };
        let cfg = PlatformConfig::new(self.name(), base_url)
            .with_version(version)
            .with_rate_limit(per_minute);
        match self {
            // Cloudflare's global API key travels in its own header.
            PlatformKind::Cloudflare => cfg.with_api_key_header("X-Auth-Key"),
            _ => cfg,
        }
    }

    /// Credentials a client for this platform cannot work without.
    pub fn required_credentials(self) -> &'static [CredentialKind] {
        match self {
            // Either a scoped token or the global key.
            PlatformKind::Cloudflare => &[],
            _ => &[CredentialKind::AccessToken],
        }
    }

    pub fn config_from_env(self) -> PlatformConfig {
        PlatformConfig::from_env(self.env_prefix(), self.defaults())
    }

    pub fn config_from_lookup<F>(self, lookup: F) -> PlatformConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        PlatformConfig::from_lookup(self.env_prefix(), self.defaults(), lookup)
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        PlatformKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| Error::UnknownPlatform(s.to_string()))
    }
}

/// What the CLI reports about one platform. Never includes secret values.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlatformStatus {
    pub name: String,
    pub enabled: bool,
    pub base_url: String,
    pub version: String,
    pub rate_limit_per_minute: u32,
    pub credentials: Vec<CredentialKind>,
    pub missing: Vec<CredentialKind>,
    pub ready: bool,
}

#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    entries: Vec<(PlatformKind, PlatformConfig)>,
}

impl PlatformRegistry {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let entries = PlatformKind::ALL
            .into_iter()
            .map(|kind| (kind, kind.config_from_lookup(&lookup)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, kind: PlatformKind) -> &PlatformConfig {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, cfg)| cfg)
            .unwrap_or_else(|| unreachable!("registry holds every PlatformKind"))
    }

    pub fn by_name(&self, name: &str) -> Result<(PlatformKind, &PlatformConfig), Error> {
        let kind: PlatformKind = name.parse()?;
        Ok((kind, self.get(kind)))
    }

    pub fn enabled(&self) -> impl Iterator<Item = (PlatformKind, &PlatformConfig)> {
        self.entries
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(k, cfg)| (*k, cfg))
    }

    pub fn statuses(&self) -> Vec<PlatformStatus> {
        self.entries
            .iter()
            .map(|(kind, cfg)| {
                let missing: Vec<CredentialKind> = match cfg.require(kind.required_credentials()) {
                    Err(Error::MissingCredentials { missing, .. }) => missing,
                    _ => Vec::new(),
                };
                let ready = cfg.enabled && missing.is_empty() && cfg.has_auth();
                PlatformStatus {
                    name: cfg.name.clone(),
                    enabled: cfg.enabled,
                    base_url: cfg.base_url.clone(),
                    version: cfg.version.clone(),
                    rate_limit_per_minute: cfg.rate_limit_per_minute,
                    credentials: cfg.credentials.present(),
                    missing,
                    ready,
                }
            })
            .collect()
    }
}
