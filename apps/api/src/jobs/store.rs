//! Job postings: the descriptions an owner ranks their profiles against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::job::JobRow;
use crate::profiles::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub location: String,
    pub client: String,
    pub bill_rate: String,
    pub visas: String,
}

impl NewJob {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Job title is required".to_string());
        }
        Ok(())
    }

    pub fn to_row(self, owner_id: Uuid, now: DateTime<Utc>) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            owner_id,
            title: self.title.trim().to_string(),
            description: self.description,
            location: self.location,
            client: self.client,
            bill_rate: self.bill_rate,
            visas: self.visas,
            status: JobStatus::Open.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub client: Option<String>,
    pub bill_rate: Option<String>,
    pub visas: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err("Job title cannot be empty".to_string());
        }
        let touches_nothing = self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.client.is_none()
            && self.bill_rate.is_none()
            && self.visas.is_none()
            && self.status.is_none();
        if touches_nothing {
            return Err("No fields to update".to_string());
        }
        Ok(())
    }

    pub fn apply(self, row: &mut JobRow, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            row.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            row.description = description;
        }
        if let Some(location) = self.location {
            row.location = location;
        }
        if let Some(client) = self.client {
            row.client = client;
        }
        if let Some(bill_rate) = self.bill_rate {
            row.bill_rate = bill_rate;
        }
        if let Some(visas) = self.visas {
            row.visas = visas;
        }
        if let Some(status) = self.status {
            row.status = status.as_str().to_string();
        }
        row.updated_at = now;
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, owner_id: Uuid, job: NewJob) -> Result<JobRow, StoreError>;

    async fn list(&self, owner_id: Uuid) -> Result<Vec<JobRow>, StoreError>;

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<JobRow>, StoreError>;

    /// `None` when the owner has no such job.
    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: JobUpdate,
    ) -> Result<Option<JobRow>, StoreError>;

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, owner_id: Uuid, job: NewJob) -> Result<JobRow, StoreError> {
        let row = job.to_row(owner_id, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO job_postings (
                id, owner_id, title, description, location, client, bill_rate, visas,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id)
        .bind(row.owner_id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(&row.location)
        .bind(&row.client)
        .bind(&row.bill_rate)
        .bind(&row.visas)
        .bind(&row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        info!(job_id = %row.id, %owner_id, "Job posting created");
        Ok(row)
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<JobRow>, StoreError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_postings WHERE owner_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<JobRow>, StoreError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_postings WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: JobUpdate,
    ) -> Result<Option<JobRow>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(mut row) = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM job_postings WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        update.apply(&mut row, Utc::now());
        sqlx::query(
            r#"
            UPDATE job_postings SET
                title = $3, description = $4, location = $5, client = $6,
                bill_rate = $7, visas = $8, status = $9, updated_at = $10
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(row.id)
        .bind(row.owner_id)
        .bind(&row.title)
        .bind(&row.description)
        .bind(&row.location)
        .bind(&row.client)
        .bind(&row.bill_rate)
        .bind(&row.visas)
        .bind(&row.status)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM job_postings WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
