use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Idempotent schema, applied at startup. `job_title` holds the candidate's
/// current role (`current_role` is reserved in Postgres).
const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS candidate_profiles (
        id                     UUID PRIMARY KEY,
        owner_id               UUID NOT NULL,
        name                   TEXT NOT NULL,
        email                  TEXT NOT NULL,
        phone_number           TEXT NOT NULL DEFAULT '',
        location               TEXT NOT NULL DEFAULT '',
        job_title              TEXT NOT NULL DEFAULT '',
        current_company        TEXT NOT NULL DEFAULT '',
        education              TEXT NOT NULL DEFAULT '',
        category               TEXT NOT NULL DEFAULT '',
        total_experience_years DOUBLE PRECISION NOT NULL DEFAULT 0,
        skills                 TEXT NOT NULL DEFAULT '',
        experience             JSONB NOT NULL DEFAULT '[]'::jsonb,
        raw_text               TEXT NOT NULL DEFAULT '',
        filename               TEXT NOT NULL DEFAULT '',
        content_type           TEXT NOT NULL DEFAULT '',
        document_key           TEXT,
        extraction_retries     INTEGER NOT NULL DEFAULT 0,
        created_at             TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at             TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (owner_id, email)
    );

    CREATE INDEX IF NOT EXISTS idx_candidate_profiles_owner
        ON candidate_profiles (owner_id, created_at);

    CREATE TABLE IF NOT EXISTS job_postings (
        id          UUID PRIMARY KEY,
        owner_id    UUID NOT NULL,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        location    TEXT NOT NULL DEFAULT '',
        client      TEXT NOT NULL DEFAULT '',
        bill_rate   TEXT NOT NULL DEFAULT '',
        visas       TEXT NOT NULL DEFAULT '',
        status      TEXT NOT NULL DEFAULT 'open',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE INDEX IF NOT EXISTS idx_job_postings_owner
        ON job_postings (owner_id, created_at);
"#;

/// Creates and returns a PostgreSQL connection pool with the schema in place.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    pool.execute(SCHEMA)
        .await
        .context("Failed to apply database schema")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
