use std::sync::Arc;

use crate::jobs::store::JobStore;
use crate::matching::skills::SkillMatcher;
use crate::profiles::extractor::ProfileExtractor;
use crate::profiles::ingest::IngestionCoordinator;
use crate::profiles::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub jobs: Arc<dyn JobStore>,
    pub coordinator: IngestionCoordinator,
    /// Used directly by reprocess; the coordinator holds its own handle.
    pub extractor: Arc<ProfileExtractor>,
    pub matcher: Arc<SkillMatcher>,
    pub max_upload_bytes: usize,
}
