mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod profiles;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::store::{JobStore, PgJobStore};
use crate::llm_client::{CompletionClient, LlmClient};
use crate::matching::skills::SkillMatcher;
use crate::profiles::extractor::ProfileExtractor;
use crate::profiles::ingest::IngestionCoordinator;
use crate::profiles::reader::FileTextReader;
use crate::profiles::store::{PgProfileStore, ProfileStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(config.llm.clone())?;
    info!("LLM client initialized (model: {})", llm.model());
    let llm: Arc<dyn CompletionClient> = Arc::new(llm);

    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db.clone()));
    let store: Arc<dyn ProfileStore> =
        Arc::new(PgProfileStore::new(db, s3, config.s3_bucket.clone()));
    let extractor = Arc::new(ProfileExtractor::new(llm.clone(), config.extraction.clone()));
    let coordinator = IngestionCoordinator::new(
        Arc::new(FileTextReader),
        extractor.clone(),
        store.clone(),
        config.ingest.clone(),
    );
    info!(
        workers = config.ingest.workers,
        task_timeout_secs = config.ingest.task_timeout.as_secs(),
        batch_timeout_secs = config.ingest.batch_timeout.as_secs(),
        "Ingestion coordinator ready"
    );

    // Build app state
    let state = AppState {
        store,
        jobs,
        coordinator,
        extractor,
        matcher: Arc::new(SkillMatcher::new(llm)),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict allowed origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "ats-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
