//! Typed clients for SaaS platform APIs.
//!
//! Every platform client owns one [`http::HttpClient`], which validates URLs
//! against the SSRF policy, attaches credentials, enforces a per-minute
//! request budget and retries failed attempts with exponential backoff.

pub mod config;
pub mod error;
pub mod http;
pub mod platforms;
pub mod reshape;
pub mod types;

pub use config::{CredentialKind, Credentials, PlatformConfig, RuntimeMode};
pub use error::{Error, ErrorInfo, Result};
pub use http::HttpClient;
pub use platforms::{PlatformKind, PlatformRegistry};
pub use types::{HttpResponse, RequestOptions};
