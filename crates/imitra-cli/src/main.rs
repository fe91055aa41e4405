mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use imitra_ai::{Classifier, LlmClient, LlmConfig};
use imitra_core::{Department, SlaPolicy};
use imitra_server::{AdminBootstrap, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imitra", author, version, about = "i-Mitra citizen grievance service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP/WebSocket API.
    Serve(ServeArgs),
    /// Classify a complaint text and print the result.
    Classify {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Print SLA allowances in hours per department and priority.
    Sla {
        #[arg(long, env = "IMITRA_SLA_POLICY", default_value = "priority_only")]
        policy: SlaPolicy,
        /// Only this department.
        #[arg(long)]
        department: Option<Department>,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// JSON configuration file; flags and environment override it.
    #[arg(long, env = "IMITRA_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "IMITRA_BIND")]
    bind: Option<String>,
    #[arg(long, env = "IMITRA_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
    /// Accept the built-in JWT secret. Local development only.
    #[arg(long, env = "IMITRA_ALLOW_DEFAULT_SECRET")]
    allow_default_secret: bool,
    #[arg(long, env = "IMITRA_DATABASE")]
    database: Option<PathBuf>,
    #[arg(long, env = "IMITRA_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,
    #[arg(long, env = "IMITRA_CORS_ORIGIN")]
    cors_origin: Option<String>,
    #[arg(long, env = "IMITRA_GATEWAY_URL")]
    gateway_url: Option<String>,
    #[arg(long, env = "IMITRA_SLA_POLICY")]
    sla_policy: Option<SlaPolicy>,
    #[arg(long, env = "IMITRA_SLA_CHECK_INTERVAL_SECS")]
    sla_check_interval_secs: Option<u64>,
    #[arg(long, env = "IMITRA_ADMIN_EMAIL")]
    admin_email: Option<String>,
    #[arg(long, env = "IMITRA_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
    #[arg(long, env = "IMITRA_ADMIN_NAME", default_value = "Administrator")]
    admin_name: String,
    #[arg(long, env = "IMITRA_ADMIN_PHONE", default_value = "9000000000")]
    admin_phone: String,
    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// Enables LLM classification when set.
    #[arg(long, env = "IMITRA_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,
    #[arg(
        long,
        env = "IMITRA_LLM_ENDPOINT",
        default_value = "https://api.anthropic.com/v1/messages"
    )]
    llm_endpoint: String,
    #[arg(long, env = "IMITRA_LLM_MODEL", default_value = "claude-3-5-haiku-latest")]
    llm_model: String,
    #[arg(long, env = "IMITRA_LLM_TIMEOUT_SECS", default_value_t = 10)]
    llm_timeout_secs: u64,
}

impl LlmArgs {
    fn config(&self) -> Option<LlmConfig> {
        self.llm_api_key.as_ref().map(|key| LlmConfig {
            endpoint: self.llm_endpoint.clone(),
            api_key: key.clone(),
            model: self.llm_model.clone(),
            timeout_secs: self.llm_timeout_secs,
            max_tokens: 300,
        })
    }
}

impl ServeArgs {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => ServerConfig::default(),
        };

        if let Some(v) = self.bind {
            config.bind = v;
        }
        if let Some(v) = self.jwt_secret {
            config.jwt_secret = v;
        }
        if self.allow_default_secret {
            config.allow_default_secret = true;
        }
        if let Some(v) = self.database {
            config.database = Some(v);
        }
        if let Some(v) = self.upload_dir {
            config.upload_dir = v;
        }
        if let Some(v) = self.cors_origin {
            config.cors_origin = Some(v);
        }
        if let Some(v) = self.gateway_url {
            config.gateway_url = Some(v);
        }
        if let Some(v) = self.sla_policy {
            config.sla_policy = v;
        }
        if let Some(v) = self.sla_check_interval_secs {
            config.sla_check_interval_secs = v;
        }
        if let Some(ai) = self.llm.config() {
            config.ai = Some(ai);
        }
        if let (Some(email), Some(password)) = (self.admin_email, self.admin_password) {
            config.admin = Some(AdminBootstrap {
                name: self.admin_name,
                email,
                phone: self.admin_phone,
                password,
            });
        }

        if config.allow_default_secret {
            tracing::warn!("default JWT secret allowed; never do this in production");
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            tracing::info!("imitra v{}", env!("CARGO_PKG_VERSION"));
            imitra_server::serve(args.into_config()?).await
        }
        Command::Classify {
            title,
            description,
            llm,
        } => {
            let classifier = match llm.config() {
                Some(config) => {
                    let client = LlmClient::new(config).context("building LLM client")?;
                    Classifier::with_generator(Arc::new(client))
                }
                None => Classifier::keyword_only(),
            };
            let classification = classifier.classify(&title, &description).await;
            display::print_classification(&title, &classification);
            Ok(())
        }
        Command::Sla { policy, department } => {
            let departments: Vec<Department> = match department {
                Some(d) => vec![d],
                None => Department::ALL.to_vec(),
            };
            display::print_sla_table(policy, &departments);
            Ok(())
        }
    }
}
