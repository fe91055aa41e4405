//! Outbound email/SMS through an HTTP gateway.
//!
//! The gateway exposes `POST {base}/email` and `POST {base}/sms`. With no base
//! URL configured, or without the `http` feature, messages are only logged.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway returned {status}: {body}")]
    Server { status: u16, body: String },
}

#[derive(Clone, Default)]
pub struct Gateway {
    #[cfg(feature = "http")]
    http: Option<HttpTarget>,
}

#[cfg(feature = "http")]
#[derive(Clone)]
struct HttpTarget {
    client: reqwest::Client,
    base_url: String,
}

impl Gateway {
    /// Log-only gateway.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Gateway posting to `base_url` (no trailing slash needed).
    #[cfg(feature = "http")]
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http: Some(HttpTarget {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "http")]
        {
            self.http.is_some()
        }
        #[cfg(not(feature = "http"))]
        {
            false
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, text: &str) -> Result<(), GatewayError> {
        let payload = json!({ "to": to, "subject": subject, "text": text });
        self.dispatch("email", to, payload).await
    }

    pub async fn send_sms(&self, to: &str, text: &str) -> Result<(), GatewayError> {
        let payload = json!({ "to": to, "text": text });
        self.dispatch("sms", to, payload).await
    }

    async fn dispatch(&self, channel: &str, to: &str, payload: Value) -> Result<(), GatewayError> {
        if !self.post(channel, &payload).await? {
            info!(channel, to, %payload, "gateway not configured, message logged");
        }
        Ok(())
    }

    /// Returns false when there is nowhere to post.
    #[cfg(feature = "http")]
    async fn post(&self, channel: &str, payload: &Value) -> Result<bool, GatewayError> {
        let Some(target) = &self.http else {
            return Ok(false);
        };
        let url = format!("{}/{channel}", target.base_url);
        let resp = target.client.post(&url).json(payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                body,
            });
        }
        info!(channel, url = %url, "message sent through gateway");
        Ok(true)
    }

    #[cfg(not(feature = "http"))]
    async fn post(&self, _channel: &str, _payload: &Value) -> Result<bool, GatewayError> {
        Ok(false)
    }
}
