//! Service configuration.

use std::path::PathBuf;

use anyhow::bail;
use imitra_ai::LlmConfig;
use imitra_core::SlaPolicy;
use serde::{Deserialize, Serialize};

/// Placeholder signing secret; [`ServerConfig::check`] refuses it unless
/// `allow_default_secret` is set.
pub const DEFAULT_JWT_SECRET: &str = "change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind: String,
    pub jwt_secret: String,
    /// Local development only.
    pub allow_default_secret: bool,
    pub jwt_ttl_hours: i64,
    /// PBKDF2-HMAC-SHA256 iterations for new password hashes.
    pub password_rounds: u32,
    pub upload_dir: PathBuf,
    pub max_upload_files: usize,
    pub max_upload_bytes: usize,
    /// Token bucket per client: burst size and steady refill.
    pub rate_limit_capacity: f64,
    pub rate_limit_refill_per_sec: f64,
    /// Buckets kept before idle ones are dropped.
    pub rate_limit_max_clients: usize,
    /// Key clients by the first `X-Forwarded-For` hop. Only enable behind a
    /// proxy that overwrites the header.
    pub trust_forwarded_for: bool,
    /// Allowed browser origin; any origin when unset.
    pub cors_origin: Option<String>,
    pub ai: Option<LlmConfig>,
    /// Email/SMS gateway base URL. Messages are only logged when unset.
    pub gateway_url: Option<String>,
    pub http_timeout_secs: u64,
    pub sla_policy: SlaPolicy,
    pub sla_check_interval_secs: u64,
    /// DuckDB file. In-memory storage when unset.
    pub database: Option<PathBuf>,
    pub admin: Option<AdminBootstrap>,
}

/// Admin account created at startup if no user has this email yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".into(),
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            allow_default_secret: false,
            jwt_ttl_hours: 24 * 7,
            password_rounds: 100_000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_files: 5,
            max_upload_bytes: 5 * 1024 * 1024,
            rate_limit_capacity: 100.0,
            rate_limit_refill_per_sec: 100.0 / 900.0,
            rate_limit_max_clients: 10_000,
            trust_forwarded_for: false,
            cors_origin: None,
            ai: None,
            gateway_url: None,
            http_timeout_secs: 10,
            sla_policy: SlaPolicy::PriorityOnly,
            sla_check_interval_secs: 300,
            database: None,
            admin: None,
        }
    }
}

impl ServerConfig {
    /// Reject settings that must not reach a listening server.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("jwt_secret must not be empty");
        }
        if self.jwt_secret == DEFAULT_JWT_SECRET && !self.allow_default_secret {
            bail!(
                "refusing to serve with the default JWT secret; set IMITRA_JWT_SECRET \
                 or pass --allow-default-secret for local development"
            );
        }
        Ok(())
    }

    /// Request body ceiling for multipart complaint filing.
    pub fn upload_body_limit(&self) -> usize {
        self.max_upload_files * self.max_upload_bytes + 1024 * 1024
    }
}
