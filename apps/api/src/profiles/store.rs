//! Profile Store Adapter: upsert-by-identity persistence for candidate profiles.
//!
//! `PgProfileStore` keeps profile rows in Postgres and the original documents
//! in S3. The merge policy lives in `merge.rs` so every store applies the same
//! rules.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::profile::ProfileRow;
use crate::profiles::merge::merge_profile;
use crate::profiles::models::CandidateProfile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("object storage error: {0}")]
    Object(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// An uploaded document as stored alongside its profile.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Everything the ingestion pipeline hands to the store for one file.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub profile: CandidateProfile,
    pub raw_text: String,
    pub document: StoredDocument,
    pub extraction_retries: u32,
}

impl ProfileRecord {
    /// Storage form of the record. Skills are comma-joined here.
    pub fn to_row(
        &self,
        owner_id: Uuid,
        id: Uuid,
        document_key: Option<String>,
        now: DateTime<Utc>,
    ) -> ProfileRow {
        let p = &self.profile;
        ProfileRow {
            id,
            owner_id,
            name: p.name.clone(),
            email: p.email.clone(),
            phone_number: p.phone_number.clone(),
            location: p.location.clone(),
            current_role: p.current_role.clone(),
            current_company: p.current_company.clone(),
            education: p.education.clone(),
            category: p.category.clone(),
            total_experience_years: p.total_experience_years,
            skills: p.skills_string(),
            experience: serde_json::to_value(&p.experience).unwrap_or_default(),
            raw_text: self.raw_text.clone(),
            filename: self.document.filename.clone(),
            content_type: self.document.content_type.clone(),
            document_key,
            extraction_retries: self.extraction_retries as i32,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: Uuid,
    /// True when an existing profile with the same email was merged into.
    pub merged: bool,
}

/// Case-insensitive substring search over an owner's profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Any of these fragments appears in the stored skills string.
    Skills(Vec<String>),
    /// Any of these fragments appears in the email.
    Emails(Vec<String>),
}

impl SearchQuery {
    /// `%fragment%` ILIKE patterns with LIKE metacharacters escaped.
    pub fn patterns(&self) -> Vec<String> {
        let terms = match self {
            SearchQuery::Skills(t) | SearchQuery::Emails(t) => t,
        };
        terms
            .iter()
            .map(|t| {
                let escaped = t
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{escaped}%")
            })
            .collect()
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Cheap liveness probe; failure means a store-wide outage.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Inserts, or merges into the owner's existing profile with this email.
    async fn upsert(
        &self,
        owner_id: Uuid,
        email: &str,
        record: ProfileRecord,
    ) -> Result<UpsertOutcome, StoreError>;

    /// All of the owner's profiles in insertion order.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ProfileRow>, StoreError>;

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<ProfileRow>, StoreError>;

    async fn search(
        &self,
        owner_id: Uuid,
        query: &SearchQuery,
    ) -> Result<Vec<ProfileRow>, StoreError>;

    /// Overwrites the extracted fields of a profile (no merge). False if absent.
    async fn replace_extracted(
        &self,
        owner_id: Uuid,
        id: Uuid,
        profile: &CandidateProfile,
        extraction_retries: u32,
    ) -> Result<bool, StoreError>;

    async fn fetch_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn delete_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

const UPSERT_SQL: &str = r#"
    INSERT INTO candidate_profiles
        (id, owner_id, name, email, phone_number, location, job_title, current_company,
         education, category, total_experience_years, skills, experience, raw_text,
         filename, content_type, document_key, extraction_retries, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
    ON CONFLICT (owner_id, email) DO UPDATE SET
        name = EXCLUDED.name,
        phone_number = EXCLUDED.phone_number,
        location = EXCLUDED.location,
        job_title = EXCLUDED.job_title,
        current_company = EXCLUDED.current_company,
        education = EXCLUDED.education,
        category = EXCLUDED.category,
        total_experience_years = EXCLUDED.total_experience_years,
        skills = EXCLUDED.skills,
        experience = EXCLUDED.experience,
        raw_text = EXCLUDED.raw_text,
        filename = EXCLUDED.filename,
        content_type = EXCLUDED.content_type,
        document_key = EXCLUDED.document_key,
        extraction_retries = EXCLUDED.extraction_retries,
        updated_at = EXCLUDED.updated_at
    RETURNING id
"#;

/// Postgres rows plus S3 objects for the raw documents.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl PgProfileStore {
    pub fn new(pool: PgPool, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { pool, s3, bucket }
    }

    async fn put_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        document: &StoredDocument,
    ) -> Result<Option<String>, StoreError> {
        if document.bytes.is_empty() {
            return Ok(None);
        }
        let key = document_key(owner_id, id, &document.filename);
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(document.bytes.clone()))
            .content_type(&document.content_type)
            .send()
            .await
            .map_err(|e| StoreError::Object(format!("upload of {key} failed: {e}")))?;
        Ok(Some(key))
    }

    /// Best effort: a leftover object is logged, never surfaced.
    async fn delete_document(&self, key: &str) {
        if let Err(e) = self
            .s3
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            warn!("Document {key} was not removed: {e}");
        }
    }
}

/// Runs `UPSERT_SQL` for `row`. A concurrent insert for the same email lands
/// in ON CONFLICT: last write wins.
async fn write_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    row: &ProfileRow,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(UPSERT_SQL)
        .bind(row.id)
        .bind(row.owner_id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone_number)
        .bind(&row.location)
        .bind(&row.current_role)
        .bind(&row.current_company)
        .bind(&row.education)
        .bind(&row.category)
        .bind(row.total_experience_years)
        .bind(&row.skills)
        .bind(&row.experience)
        .bind(&row.raw_text)
        .bind(&row.filename)
        .bind(&row.content_type)
        .bind(&row.document_key)
        .bind(row.extraction_retries)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(&mut **tx)
        .await
}

/// `old` when it names an object that `current` no longer references.
fn superseded_key<'a>(old: Option<&'a str>, current: Option<&str>) -> Option<&'a str> {
    old.filter(|old| Some(*old) != current)
}

/// `profiles/{owner}/{id}/{filename}` with path separators flattened.
pub fn document_key(owner_id: Uuid, id: Uuid, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("profiles/{owner_id}/{id}/{safe}")
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn upsert(
        &self,
        owner_id: Uuid,
        email: &str,
        record: ProfileRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM candidate_profiles WHERE owner_id = $1 AND email = $2 FOR UPDATE",
        )
        .bind(owner_id)
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let id = existing.as_ref().map(|e| e.id).unwrap_or_else(Uuid::new_v4);
        let previous_key = existing.as_ref().and_then(|e| e.document_key.clone());
        let key = self.put_document(owner_id, id, &record.document).await?;
        let incoming = record.to_row(owner_id, id, key.clone(), Utc::now());
        let merged = existing.is_some();
        let row = match existing {
            Some(existing) => merge_profile(&existing, incoming),
            None => incoming,
        };

        let written = match write_row(&mut tx, &row).await {
            Ok(id) => tx.commit().await.map(|_| id),
            Err(e) => Err(e),
        };
        let id = match written {
            Ok(id) => id,
            Err(e) => {
                // The row still points at the previous object, if any.
                if let Some(orphan) = superseded_key(key.as_deref(), previous_key.as_deref()) {
                    self.delete_document(orphan).await;
                }
                return Err(e.into());
            }
        };

        if let Some(stale) = superseded_key(previous_key.as_deref(), row.document_key.as_deref()) {
            self.delete_document(stale).await;
        }

        info!(profile_id = %id, %owner_id, merged, "Profile upserted");
        Ok(UpsertOutcome { id, merged })
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ProfileRow>, StoreError> {
        Ok(sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM candidate_profiles WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        Ok(sqlx::query_as::<_, ProfileRow>(
            "SELECT * FROM candidate_profiles WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn search(
        &self,
        owner_id: Uuid,
        query: &SearchQuery,
    ) -> Result<Vec<ProfileRow>, StoreError> {
        let sql = match query {
            SearchQuery::Skills(_) => {
                "SELECT * FROM candidate_profiles \
                 WHERE owner_id = $1 AND skills ILIKE ANY($2) ORDER BY created_at, id"
            }
            SearchQuery::Emails(_) => {
                "SELECT * FROM candidate_profiles \
                 WHERE owner_id = $1 AND email ILIKE ANY($2) ORDER BY created_at, id"
            }
        };
        Ok(sqlx::query_as::<_, ProfileRow>(sql)
            .bind(owner_id)
            .bind(query.patterns())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn replace_extracted(
        &self,
        owner_id: Uuid,
        id: Uuid,
        profile: &CandidateProfile,
        extraction_retries: u32,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidate_profiles SET
                name = $3, email = $4, phone_number = $5, location = $6, job_title = $7,
                current_company = $8, education = $9, category = $10,
                total_experience_years = $11, skills = $12, experience = $13,
                extraction_retries = $14, updated_at = now()
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone_number)
        .bind(&profile.location)
        .bind(&profile.current_role)
        .bind(&profile.current_company)
        .bind(&profile.education)
        .bind(&profile.category)
        .bind(profile.total_experience_years)
        .bind(profile.skills_string())
        .bind(serde_json::to_value(&profile.experience).unwrap_or_default())
        .bind(extraction_retries as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let Some(row) = self.find_by_id(owner_id, id).await? else {
            return Ok(None);
        };
        let Some(key) = row.document_key else {
            return Ok(None);
        };

        let object = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StoreError::Object(format!("download of {key} failed: {e}")))?;
        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Object(format!("reading {key} failed: {e}")))?
            .into_bytes();

        Ok(Some(StoredDocument {
            filename: row.filename,
            content_type: row.content_type,
            bytes,
        }))
    }

    async fn delete_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let deleted: Option<Option<String>> = sqlx::query_scalar(
            "DELETE FROM candidate_profiles WHERE id = $1 AND owner_id = $2 RETURNING document_key",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(document_key) = deleted else {
            return Ok(false);
        };

        if let Some(key) = document_key {
            self.delete_document(&key).await;
        }

        info!(profile_id = %id, %owner_id, "Profile deleted");
        Ok(true)
    }
}
