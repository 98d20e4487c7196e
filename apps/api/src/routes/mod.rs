pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::matching::handlers as matching;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Profiles
        .route(
            "/api/v1/profiles",
            post(profiles::handle_upload).get(profiles::handle_list_profiles),
        )
        .route("/api/v1/profiles/search", post(profiles::handle_search))
        .route(
            "/api/v1/profiles/:id",
            get(profiles::handle_get_profile).delete(profiles::handle_delete_profile),
        )
        .route(
            "/api/v1/profiles/:id/document",
            get(profiles::handle_get_document),
        )
        .route(
            "/api/v1/profiles/:id/reprocess",
            post(profiles::handle_reprocess),
        )
        // Job postings
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Ranking
        .route("/api/v1/ats-score", post(matching::handle_ats_score))
        .layer(body_limit)
        .with_state(state)
}
