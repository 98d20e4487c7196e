use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted candidate profile. `skills` is the comma-joined storage form;
/// parse it with `profiles::models::parse_skills` before comparing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    #[sqlx(rename = "job_title")]
    pub current_role: String,
    pub current_company: String,
    pub education: String,
    pub category: String,
    pub total_experience_years: f64,
    pub skills: String,
    /// JSON array of `{title, company, duration, responsibilities}`.
    pub experience: Value,
    pub raw_text: String,
    pub filename: String,
    pub content_type: String,
    #[serde(skip_serializing)]
    pub document_key: Option<String>,
    pub extraction_retries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
