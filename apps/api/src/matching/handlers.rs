use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::ranking::MatchResult;
use crate::state::AppState;

const DEFAULT_MATCH_THRESHOLD: f64 = 70.0;

fn default_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

/// Either `job_description` text or the `job_id` of a stored posting.
#[derive(Deserialize)]
pub struct ScoreRequest {
    pub owner_id: Uuid,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default = "default_threshold")]
    pub match_threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub results: Vec<MatchResult>,
    pub message: String,
    pub matching_profiles: usize,
    pub total_profiles: usize,
}

/// POST /api/v1/ats-score
pub async fn handle_ats_score(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let job_description = match (req.job_id, req.job_description) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "Provide either job_id or job_description, not both".to_string(),
            ))
        }
        (Some(job_id), None) => {
            state
                .jobs
                .get(req.owner_id, job_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?
                .description
        }
        (None, text) => text.unwrap_or_default(),
    };
    if job_description.trim().is_empty() {
        return Err(AppError::Validation("Job description is required".to_string()));
    }
    if !(0.0..=100.0).contains(&req.match_threshold) {
        return Err(AppError::Validation(
            "match_threshold must be between 0 and 100".to_string(),
        ));
    }

    let profiles = state.store.find_by_owner(req.owner_id).await?;
    if profiles.is_empty() {
        return Ok(Json(ScoreResponse {
            results: vec![],
            message: "No profiles found".to_string(),
            matching_profiles: 0,
            total_profiles: 0,
        }));
    }

    let results = state
        .matcher
        .score(&job_description, &profiles, req.match_threshold)
        .await?;

    Ok(Json(ScoreResponse {
        message: format!(
            "Found {} matching profiles out of {} total profiles",
            results.len(),
            profiles.len()
        ),
        matching_profiles: results.len(),
        total_profiles: profiles.len(),
        results,
    }))
}
