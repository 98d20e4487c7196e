use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::store::{JobUpdate, NewJob};
use crate::models::job::JobRow;
use crate::profiles::handlers::OwnerQuery;
use crate::state::AppState;

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRow>,
    pub count: usize,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
    Json(job): Json<NewJob>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    job.validate().map_err(AppError::Validation)?;
    let row = state.jobs.create(params.owner_id, job).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<JobListResponse>, AppError> {
    let jobs = state.jobs.list(params.owner_id).await?;
    Ok(Json(JobListResponse {
        count: jobs.len(),
        jobs,
    }))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<JobRow>, AppError> {
    let job = state
        .jobs
        .get(params.owner_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<JobRow>, AppError> {
    update.validate().map_err(AppError::Validation)?;
    let job = state
        .jobs
        .update(params.owner_id, id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    if state.jobs.delete(params.owner_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Job {id} not found")))
    }
}
