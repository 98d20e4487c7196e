use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub ingest: IngestConfig,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Connection and generation parameters for the extraction client.
/// Built once at startup and handed to `LlmClient::new`.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Retry policy for the profile extractor.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before retry `r` is `base_delay * 2^(r-1)`.
    pub base_delay: Duration,
    /// Resume text is cut to this many characters before it is sent.
    pub max_input_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(2),
            max_input_chars: 8000,
        }
    }
}

/// Worker pool and time budgets for batch ingestion.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub workers: usize,
    pub task_timeout: Duration,
    pub retry_timeout: Duration,
    pub batch_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            task_timeout: Duration::from_secs(60),
            retry_timeout: Duration::from_secs(30),
            batch_timeout: Duration::from_secs(300),
        }
    }
}

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let extraction_defaults = ExtractionConfig::default();
        let ingest_defaults = IngestConfig::default();

        let workers: usize = env_or("INGEST_WORKERS", ingest_defaults.workers)?;
        anyhow::ensure!(workers > 0, "INGEST_WORKERS must be at least 1");
        let max_attempts: u32 = env_or("EXTRACTION_MAX_ATTEMPTS", extraction_defaults.max_attempts)?;
        anyhow::ensure!(max_attempts > 0, "EXTRACTION_MAX_ATTEMPTS must be at least 1");

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            llm: LlmConfig {
                api_key: require_env("ANTHROPIC_API_KEY")?,
                model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                max_tokens: env_or("LLM_MAX_TOKENS", 2048)?,
                temperature: env_or("LLM_TEMPERATURE", 0.1)?,
                request_timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 120)?),
            },
            extraction: ExtractionConfig {
                max_attempts,
                base_delay: Duration::from_millis(env_or(
                    "EXTRACTION_BASE_DELAY_MS",
                    extraction_defaults.base_delay.as_millis() as u64,
                )?),
                max_input_chars: extraction_defaults.max_input_chars,
            },
            ingest: IngestConfig {
                workers,
                task_timeout: secs_or("INGEST_TASK_TIMEOUT_SECS", ingest_defaults.task_timeout)?,
                retry_timeout: secs_or("INGEST_RETRY_TIMEOUT_SECS", ingest_defaults.retry_timeout)?,
                batch_timeout: secs_or("INGEST_BATCH_TIMEOUT_SECS", ingest_defaults.batch_timeout)?,
            },
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn secs_or(key: &str, default: Duration) -> Result<Duration> {
    Ok(Duration::from_secs(env_or(key, default.as_secs())?))
}
