use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::profiles::ingest::{BatchReport, UploadedFile};
use crate::profiles::reader::file_extension;
use crate::profiles::store::SearchQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: Uuid,
}

#[derive(Deserialize)]
pub struct DocumentQuery {
    pub owner_id: Uuid,
    pub disposition: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<ProfileRow>,
    pub count: usize,
}

impl From<Vec<ProfileRow>> for ProfileListResponse {
    fn from(profiles: Vec<ProfileRow>) -> Self {
        Self {
            count: profiles.len(),
            profiles,
        }
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub owner_id: Uuid,
    /// `skills` (comma-separated) or `email` (space-separated).
    pub search_type: String,
    pub term: String,
}

/// POST /api/v1/profiles
/// Multipart batch upload. Every `file` (or `files`) part is one resume.
pub async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
    mut multipart: Multipart,
) -> Result<Json<BatchReport>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&filename).to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read '{filename}': {e}")))?;
        files.push(UploadedFile {
            filename,
            content_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(AppError::Validation("No files provided".to_string()));
    }

    info!(owner_id = %params.owner_id, files = files.len(), "Received profile upload");
    let report = state.coordinator.ingest(params.owner_id, files).await?;
    Ok(Json(report))
}

/// GET /api/v1/profiles
pub async fn handle_list_profiles(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<ProfileListResponse>, AppError> {
    let profiles = state.store.find_by_owner(params.owner_id).await?;
    Ok(Json(profiles.into()))
}

/// GET /api/v1/profiles/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = state
        .store
        .find_by_id(params.owner_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    Ok(Json(profile))
}

/// DELETE /api/v1/profiles/:id
pub async fn handle_delete_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_by_id(params.owner_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Profile {id} not found")))
    }
}

/// GET /api/v1/profiles/:id/document
/// Streams the original upload back, inline for preview or as an attachment.
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DocumentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let disposition = match params.disposition.as_deref() {
        None | Some("inline") => "inline",
        Some("attachment") => "attachment",
        Some(other) => {
            return Err(AppError::Validation(format!(
                "disposition must be 'inline' or 'attachment', got '{other}'"
            )))
        }
    };

    let document = state
        .store
        .fetch_document(params.owner_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No document stored for profile {id}")))?;

    let filename = document.filename.replace('"', "");
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{filename}\""),
            ),
        ],
        document.bytes,
    ))
}

/// POST /api/v1/profiles/:id/reprocess
/// Re-runs extraction on the stored text and replaces the extracted fields.
pub async fn handle_reprocess(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<ProfileRow>, AppError> {
    let owner_id = params.owner_id;
    let profile = state
        .store
        .find_by_id(owner_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;

    if profile.raw_text.trim().is_empty() {
        return Err(AppError::Validation(
            "text_content_missing: profile has no stored text to reprocess".to_string(),
        ));
    }

    let outcome = state.extractor.extract(&profile.raw_text).await;
    if !outcome.accepted {
        let kind = if outcome.email_rejected() {
            "invalid_email"
        } else {
            "processing_failed"
        };
        return Err(AppError::Unprocessable {
            kind: kind.to_string(),
            message: outcome.failure_message(),
        });
    }

    state
        .store
        .replace_extracted(owner_id, id, &outcome.profile, outcome.retries)
        .await?;
    info!(profile_id = %id, retries = outcome.retries, "Profile reprocessed");

    let updated = state
        .store
        .find_by_id(owner_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id} not found")))?;
    Ok(Json(updated))
}

/// POST /api/v1/profiles/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ProfileListResponse>, AppError> {
    let query = parse_search(&req.search_type, &req.term)?;
    let profiles = state.store.search(req.owner_id, &query).await?;
    Ok(Json(profiles.into()))
}

fn parse_search(search_type: &str, term: &str) -> Result<SearchQuery, AppError> {
    if term.trim().is_empty() {
        return Err(AppError::Validation("Search term cannot be empty".to_string()));
    }

    let query = match search_type {
        "skills" => SearchQuery::Skills(
            term.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "email" => SearchQuery::Emails(term.split_whitespace().map(str::to_string).collect()),
        other => {
            return Err(AppError::Validation(format!(
                "search_type must be 'skills' or 'email', got '{other}'"
            )))
        }
    };

    match &query {
        SearchQuery::Skills(t) | SearchQuery::Emails(t) if t.is_empty() => Err(
            AppError::Validation("No valid search terms provided".to_string()),
        ),
        _ => Ok(query),
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skills_search() {
        let query = parse_search("skills", "Python, , aws ").unwrap();
        assert_eq!(
            query,
            SearchQuery::Skills(vec!["Python".to_string(), "aws".to_string()])
        );
    }

    #[test]
    fn test_parse_email_search() {
        let query = parse_search("email", "jane@  @y.com").unwrap();
        assert_eq!(
            query,
            SearchQuery::Emails(vec!["jane@".to_string(), "@y.com".to_string()])
        );
    }

    #[test]
    fn test_parse_search_rejects_empty_and_unknown() {
        assert!(parse_search("skills", "   ").is_err());
        assert!(parse_search("skills", " , ,").is_err());
        assert!(parse_search("name", "Jane").is_err());
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("a.doc"), "application/msword");
        assert_eq!(content_type_for("a"), "application/octet-stream");
    }
}
