//! Generative text backends.
//!
//! [`TextGenerator`] is the seam the classifier talks to. With the `llm`
//! feature, [`LlmClient`] implements it against a Messages-style HTTP API.

use async_trait::async_trait;

use crate::classifier::ClassifyError;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `user` under the `system` instructions and return the raw text.
    async fn generate(&self, system: &str, user: &str) -> Result<String, ClassifyError>;
}

#[cfg(feature = "llm")]
pub use http::{LlmClient, LlmConfig};

#[cfg(feature = "llm")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tracing::debug;

    use super::TextGenerator;
    use crate::classifier::ClassifyError;

    const API_VERSION: &str = "2023-06-01";

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LlmConfig {
        /// Full Messages endpoint, e.g. `https://api.anthropic.com/v1/messages`.
        pub endpoint: String,
        pub api_key: String,
        pub model: String,
        pub timeout_secs: u64,
        pub max_tokens: u32,
    }

    /// HTTP client for a Messages-style completion API.
    pub struct LlmClient {
        client: reqwest::Client,
        config: LlmConfig,
    }

    #[derive(Serialize)]
    struct Request<'a> {
        model: &'a str,
        max_tokens: u32,
        system: &'a str,
        messages: [Message<'a>; 1],
    }

    #[derive(Serialize)]
    struct Message<'a> {
        role: &'static str,
        content: &'a str,
    }

    #[derive(Deserialize)]
    struct Response {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(default)]
        text: Option<String>,
    }

    impl LlmClient {
        pub fn new(config: LlmConfig) -> Result<Self, ClassifyError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?;
            Ok(Self { client, config })
        }
    }

    #[async_trait]
    impl TextGenerator for LlmClient {
        async fn generate(&self, system: &str, user: &str) -> Result<String, ClassifyError> {
            let body = Request {
                model: &self.config.model,
                max_tokens: self.config.max_tokens,
                system,
                messages: [Message {
                    role: "user",
                    content: user,
                }],
            };

            debug!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting completion");
            let resp = self
                .client
                .post(&self.config.endpoint)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClassifyError::Server {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: Response = resp.json().await?;
            parsed
                .content
                .into_iter()
                .find_map(|b| b.text)
                .ok_or(ClassifyError::EmptyReply)
        }
    }
}
