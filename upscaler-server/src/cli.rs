use clap::{Args, Parser, Subcommand};
use upscaler_types::models::{
    GatewayConfig, GeminiConfig, OffloadConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_IMAGE_MODEL,
    DEFAULT_MAX_INLINE_PAYLOAD_BYTES, DEFAULT_PROMPT,
};
use upscaler_types::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
/// 10 MiB request body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "upscaler-server",
    about = "Page Upscaler - access-code gateway for image enhancement",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub server: ServerArgs,

    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379", global = true)]
    pub redis_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the gateway (default if no command specified)")]
    Serve,

    #[command(subcommand, about = "Manage access codes")]
    Codes(CodeCommands),
}

#[derive(Subcommand)]
pub enum CodeCommands {
    #[command(about = "Issue a new access code")]
    Issue {
        #[arg(help = "Code to create (random if omitted)")]
        code: Option<String>,

        #[arg(short, long, help = "Number of generations allowed")]
        total: i64,
    },

    #[command(about = "Show an access code's balance")]
    Show {
        code: String,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Allow an access code to be used again")]
    Enable { code: String },

    #[command(about = "Stop an access code from being used")]
    Disable { code: String },
}

#[derive(Args, Clone)]
pub struct ServerArgs {
    #[arg(short, long, env = "UPSCALER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "UPSCALER_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(long, help = "Keep access codes in process memory instead of Redis")]
    pub memory_store: bool,

    #[arg(
        long = "seed-code",
        value_name = "CODE=TOTAL",
        value_parser = parse_seed_code,
        requires = "memory_store",
        help = "Pre-load an access code into the in-memory store (repeatable)"
    )]
    pub seed_codes: Vec<(String, i64)>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_IMAGE_MODEL)]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_TIMEOUT_SECS", default_value_t = 300)]
    pub gemini_timeout_secs: u64,

    #[arg(long, env = "R2_ACCOUNT_ID")]
    pub r2_account_id: Option<String>,

    #[arg(long, env = "R2_ACCESS_KEY_ID", hide_env_values = true)]
    pub r2_access_key_id: Option<String>,

    #[arg(long, env = "R2_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub r2_secret_access_key: Option<String>,

    #[arg(long, env = "R2_BUCKET_NAME")]
    pub r2_bucket_name: Option<String>,

    #[arg(long, env = "R2_ENDPOINT", help = "Override the R2 endpoint (any S3-compatible store)")]
    pub r2_endpoint: Option<String>,

    #[arg(long, env = "MAX_INLINE_PAYLOAD_BYTES", default_value_t = DEFAULT_MAX_INLINE_PAYLOAD_BYTES)]
    pub max_inline_payload_bytes: usize,

    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    #[arg(
        long,
        env = "UPSCALER_ALLOWED_ORIGINS",
        value_delimiter = ',',
        help = "CORS origins (defaults to the local dev front-end)"
    )]
    pub allowed_origins: Vec<String>,
}

fn parse_seed_code(s: &str) -> Result<(String, i64), String> {
    let (code, total) = s.split_once('=').ok_or("expected CODE=TOTAL")?;
    let total: i64 = total.trim().parse().map_err(|e| format!("invalid total: {e}"))?;
    if code.trim().is_empty() || total <= 0 {
        return Err("code must be non-empty and total positive".to_string());
    }
    Ok((code.trim().to_string(), total))
}

impl ServerArgs {
    /// Gateway configuration described by these arguments.
    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let offload = OffloadConfig::from_parts(
            self.r2_account_id.clone(),
            self.r2_access_key_id.clone(),
            self.r2_secret_access_key.clone(),
            self.r2_bucket_name.clone(),
        )
        .map(|mut offload| {
            offload.endpoint = self.r2_endpoint.clone().filter(|e| !e.trim().is_empty());
            offload
        });

        let config = GatewayConfig {
            gemini: GeminiConfig {
                api_key: self.gemini_api_key.clone(),
                base_url: self.gemini_base_url.clone(),
                model: self.gemini_model.clone(),
                request_timeout_secs: self.gemini_timeout_secs,
            },
            offload,
            max_inline_payload_bytes: self.max_inline_payload_bytes,
            default_prompt: DEFAULT_PROMPT.to_string(),
        };
        config.check()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("upscaler-server").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_offload_requires_all_four_values() {
        let partial = parse(&["--r2-account-id", "acct", "--r2-bucket-name", "pages"]);
        assert!(partial.server.gateway_config().unwrap().offload.is_none());

        let full = parse(&[
            "--r2-account-id",
            "acct",
            "--r2-access-key-id",
            "key",
            "--r2-secret-access-key",
            "secret",
            "--r2-bucket-name",
            "pages",
        ]);
        let offload = full.server.gateway_config().unwrap().offload.unwrap();
        assert_eq!(offload.resolved_endpoint(), "https://acct.r2.cloudflarestorage.com");
        assert_eq!(offload.url_ttl_secs, 3600);
    }

    #[test]
    fn test_seed_codes_require_memory_store() {
        let cli = parse(&["--memory-store", "--seed-code", "DECK-42=25", "--seed-code", "TRIAL=3"]);
        assert_eq!(cli.server.seed_codes, vec![("DECK-42".to_string(), 25), ("TRIAL".to_string(), 3)]);

        let args = ["upscaler-server", "--seed-code", "DECK-42=25"];
        assert!(Cli::try_parse_from(args).is_err());
        assert!(Cli::try_parse_from(["upscaler-server", "--memory-store", "--seed-code", "DECK-42"]).is_err());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let cli = parse(&["--gemini-base-url", "not a url"]);
        assert!(cli.server.gateway_config().is_err());
    }

    #[test]
    fn test_codes_subcommand() {
        let cli = parse(&["codes", "issue", "DECK-42", "--total", "25"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Codes(CodeCommands::Issue { ref code, total: 25 })) if code.as_deref() == Some("DECK-42")
        ));
    }
}
