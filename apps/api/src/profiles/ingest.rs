//! Ingestion Coordinator: batch upload to per-file pipeline on a bounded pool.
//!
//! A batch runs in three steps:
//!   1. Validation pass: unsupported extensions become `invalid_format` and
//!      never reach the pool.
//!   2. Parallel pass: every valid file runs Reader → Extractor → Store upsert
//!      under a per-task timeout, at most `workers` at a time.
//!   3. Retry sweep: every recoverable failure runs once more on the same pool
//!      with the shorter retry timeout. Its outcome replaces the first one.
//!
//! Timed-out work is abandoned, not aborted. The underlying call runs to
//! completion but its result is discarded and nothing is written.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::errors::AppError;
use crate::profiles::extractor::ProfileExtractor;
use crate::profiles::reader::{is_allowed_file, DocumentReader};
use crate::profiles::store::{ProfileRecord, ProfileStore, StoredDocument, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFormat,
    TextExtractionFailed,
    InvalidEmail,
    Timeout,
    ProcessingFailed,
}

impl ErrorKind {
    /// Everything except a bad file format gets one more try in the sweep.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::InvalidFormat)
    }
}

/// Outcome for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileResult {
    Success {
        filename: String,
        id: Uuid,
        name: String,
        email: String,
        skills: String,
        retries: u32,
        /// True when the upload updated an existing profile with the same email.
        merged: bool,
    },
    Error {
        filename: String,
        error_kind: ErrorKind,
        message: String,
    },
}

impl FileResult {
    fn error(filename: impl Into<String>, error_kind: ErrorKind, message: impl Into<String>) -> Self {
        FileResult::Error {
            filename: filename.into(),
            error_kind,
            message: message.into(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            FileResult::Success { filename, .. } | FileResult::Error { filename, .. } => filename,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            FileResult::Success { .. } => None,
            FileResult::Error { error_kind, .. } => Some(*error_kind),
        }
    }
}

/// `successful + failed == total_files`; `results` holds one entry per
/// uploaded file in upload order, `invalid_format` entries included.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total_files: usize,
    /// Files that passed the extension check and entered the pool.
    pub valid_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<FileResult>,
}

#[derive(Clone)]
pub struct IngestionCoordinator {
    reader: Arc<dyn DocumentReader>,
    extractor: Arc<ProfileExtractor>,
    store: Arc<dyn ProfileStore>,
    config: IngestConfig,
}

type Queued = (usize, Arc<UploadedFile>);

impl IngestionCoordinator {
    pub fn new(
        reader: Arc<dyn DocumentReader>,
        extractor: Arc<ProfileExtractor>,
        store: Arc<dyn ProfileStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            reader,
            extractor,
            store,
            config,
        }
    }

    /// Ingests a batch for `owner_id`. Fails as a whole only when the store
    /// is unreachable before any work starts.
    pub async fn ingest(
        &self,
        owner_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<BatchReport, AppError> {
        self.store
            .health_check()
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        let started = Instant::now();
        let total_files = files.len();
        let mut slots: Vec<Option<FileResult>> = vec![None; total_files];
        let mut queued: Vec<Queued> = Vec::new();

        for (index, file) in files.into_iter().enumerate() {
            if is_allowed_file(&file.filename) {
                queued.push((index, Arc::new(file)));
            } else {
                debug!(filename = %file.filename, "Rejected unsupported file");
                slots[index] = Some(FileResult::error(
                    file.filename,
                    ErrorKind::InvalidFormat,
                    "Unsupported file format. Allowed: .pdf, .docx, .doc",
                ));
            }
        }
        let valid_files = queued.len();
        info!(%owner_id, total_files, valid_files, "Starting batch ingestion");

        let pool = Arc::new(Semaphore::new(self.config.workers));
        let deadline = started + self.config.batch_timeout;

        for (index, result) in self
            .run_pass("parallel", owner_id, &queued, &pool, self.config.task_timeout, deadline)
            .await
        {
            slots[index] = Some(result);
        }

        let sweep: Vec<Queued> = queued
            .iter()
            .filter(|(index, _)| {
                slots[*index]
                    .as_ref()
                    .and_then(FileResult::error_kind)
                    .is_some_and(ErrorKind::is_recoverable)
            })
            .cloned()
            .collect();

        if !sweep.is_empty() && Instant::now() >= deadline {
            warn!(files = sweep.len(), "Batch time budget spent; skipping retry sweep");
            for (index, file) in &sweep {
                slots[*index] = Some(self.batch_timeout_result(&file.filename));
            }
        } else if !sweep.is_empty() {
            info!(files = sweep.len(), "Starting retry sweep");
            for (index, result) in self
                .run_pass("retry", owner_id, &sweep, &pool, self.config.retry_timeout, deadline)
                .await
            {
                slots[index] = Some(result);
            }
        }

        let results: Vec<FileResult> = slots.into_iter().flatten().collect();
        let successful = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - successful;

        info!(
            %owner_id,
            total_files,
            successful,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch ingestion finished"
        );

        Ok(BatchReport {
            total_files,
            valid_files,
            successful,
            failed,
            results,
        })
    }

    fn batch_timeout_result(&self, filename: &str) -> FileResult {
        FileResult::error(
            filename,
            ErrorKind::Timeout,
            format!(
                "Batch exceeded {}s before this file finished",
                self.config.batch_timeout.as_secs()
            ),
        )
    }

    /// Runs `files` on the shared pool and collects one result per file.
    /// Collection stops at the batch `deadline`, which both passes share;
    /// anything still outstanding is reported as a timeout and its task told
    /// to discard its result.
    async fn run_pass(
        &self,
        pass: &'static str,
        owner_id: Uuid,
        files: &[Queued],
        pool: &Arc<Semaphore>,
        task_timeout: Duration,
        deadline: Instant,
    ) -> Vec<(usize, FileResult)> {
        let started = Instant::now();
        let batch_cancel = CancellationToken::new();

        let mut pending: FuturesUnordered<_> = files
            .iter()
            .map(|(index, file)| {
                let index = *index;
                let filename = file.filename.clone();
                let handle = tokio::spawn(self.clone().supervise(
                    owner_id,
                    file.clone(),
                    pool.clone(),
                    task_timeout,
                    batch_cancel.child_token(),
                ));
                async move { (index, filename, handle.await) }
            })
            .collect();

        let mut results: Vec<(usize, FileResult)> = Vec::with_capacity(files.len());
        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((index, _, Ok(result)))) => results.push((index, result)),
                Ok(Some((index, filename, Err(e)))) => {
                    error!(%filename, "Ingestion task panicked: {e}");
                    results.push((
                        index,
                        FileResult::error(filename, ErrorKind::ProcessingFailed, e.to_string()),
                    ));
                }
                Ok(None) => break,
                Err(_) => {
                    batch_cancel.cancel();
                    warn!(
                        pass,
                        outstanding = pending.len(),
                        batch_timeout_secs = self.config.batch_timeout.as_secs(),
                        "Batch time budget exceeded; abandoning outstanding tasks"
                    );
                    break;
                }
            }
        }

        for (index, file) in files {
            if !results.iter().any(|(done, _)| done == index) {
                results.push((*index, self.batch_timeout_result(&file.filename)));
            }
        }

        info!(
            pass,
            files = files.len(),
            successful = results.iter().filter(|(_, r)| r.is_success()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion pass finished"
        );
        results
    }

    /// Waits for a pool slot, then gives the pipeline `task_timeout` to finish.
    /// The pipeline runs in its own task holding the slot, so a timeout here
    /// only stops waiting for it.
    async fn supervise(
        self,
        owner_id: Uuid,
        file: Arc<UploadedFile>,
        pool: Arc<Semaphore>,
        task_timeout: Duration,
        cancel: CancellationToken,
    ) -> FileResult {
        let filename = file.filename.clone();

        let permit = tokio::select! {
            _ = cancel.cancelled() => {
                return FileResult::error(
                    filename,
                    ErrorKind::Timeout,
                    "Batch time budget ran out before processing started",
                );
            }
            permit = pool.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(e) => return FileResult::error(filename, ErrorKind::ProcessingFailed, e.to_string()),
            },
        };

        let started = Instant::now();
        let task_cancel = cancel.child_token();
        let pipeline = self.clone();
        let token = task_cancel.clone();
        let mut handle = tokio::spawn(async move {
            let _permit = permit;
            pipeline.process_file(owner_id, file, token).await
        });

        match tokio::time::timeout(task_timeout, &mut handle).await {
            Ok(Ok(result)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match result.error_kind() {
                    None => info!(%filename, elapsed_ms, "File ingested"),
                    Some(kind) => warn!(%filename, ?kind, elapsed_ms, "File failed"),
                }
                result
            }
            Ok(Err(e)) => {
                error!(%filename, "Ingestion pipeline panicked: {e}");
                FileResult::error(filename, ErrorKind::ProcessingFailed, e.to_string())
            }
            Err(_) => {
                task_cancel.cancel();
                warn!(
                    %filename,
                    timeout_secs = task_timeout.as_secs(),
                    "Task exceeded its time budget; abandoning"
                );
                FileResult::error(
                    filename,
                    ErrorKind::Timeout,
                    format!("Processing exceeded {}s", task_timeout.as_secs()),
                )
            }
        }
    }

    async fn process_file(
        &self,
        owner_id: Uuid,
        file: Arc<UploadedFile>,
        cancel: CancellationToken,
    ) -> FileResult {
        let filename = file.filename.clone();

        let reader = self.reader.clone();
        let document = file.clone();
        let text = match tokio::task::spawn_blocking(move || {
            reader.read(&document.filename, &document.bytes)
        })
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                return FileResult::error(
                    filename,
                    ErrorKind::TextExtractionFailed,
                    "No text could be extracted from the document",
                )
            }
            Ok(Err(e)) => {
                return FileResult::error(filename, ErrorKind::TextExtractionFailed, e.to_string())
            }
            Err(e) => {
                return FileResult::error(
                    filename,
                    ErrorKind::TextExtractionFailed,
                    format!("Reader task failed: {e}"),
                )
            }
        };

        let outcome = self.extractor.extract(&text).await;
        if !outcome.accepted {
            let kind = if outcome.email_rejected() {
                ErrorKind::InvalidEmail
            } else {
                ErrorKind::ProcessingFailed
            };
            return FileResult::error(filename, kind, outcome.failure_message());
        }

        if cancel.is_cancelled() {
            debug!(%filename, "Discarding result of abandoned task");
            return FileResult::error(
                filename,
                ErrorKind::Timeout,
                "Result arrived after the task was abandoned",
            );
        }

        let retries = outcome.retries;
        let profile = outcome.profile;
        let record = ProfileRecord {
            profile: profile.clone(),
            raw_text: text,
            document: StoredDocument {
                filename: filename.clone(),
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            },
            extraction_retries: retries,
        };

        match self.store.upsert(owner_id, &profile.email, record).await {
            Ok(UpsertOutcome { id, merged }) => FileResult::Success {
                filename,
                id,
                skills: profile.skills_string(),
                name: profile.name,
                email: profile.email,
                retries,
                merged,
            },
            Err(e) => FileResult::error(
                filename,
                ErrorKind::ProcessingFailed,
                format!("Failed to store profile: {e}"),
            ),
        }
    }
}
