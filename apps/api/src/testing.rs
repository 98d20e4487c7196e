//! In-crate fakes for the external collaborators, shared by unit and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::jobs::store::{JobStore, JobUpdate, NewJob};
use crate::llm_client::{CompletionClient, LlmError};
use crate::models::job::JobRow;
use crate::models::profile::ProfileRow;
use crate::profiles::merge::merge_profile;
use crate::profiles::models::CandidateProfile;
use crate::profiles::reader::{DocumentReader, ReadError};
use crate::profiles::store::{
    ProfileRecord, ProfileStore, SearchQuery, StoreError, StoredDocument, UpsertOutcome,
};

/// Replays a fixed script of responses, one per call.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

type Responder = dyn Fn(&str) -> (Duration, Result<String, LlmError>) + Send + Sync;

/// Answers from a closure over the prompt, optionally after a delay.
/// Tracks how many calls are in flight at once.
pub struct FnClient {
    respond: Box<Responder>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FnClient {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&str) -> (Duration, Result<String, LlmError>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Responds immediately with `body` to every call.
    pub fn fixed(body: &str) -> Arc<Self> {
        let body = body.to_string();
        Self::new(move |_| (Duration::ZERO, Ok(body.clone())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionClient for FnClient {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, result) = (self.respond)(prompt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Document reader backed by a closure; by default returns the bytes as UTF-8.
pub struct FnReader<F>(pub F);

type ReadFn = fn(&str, &[u8]) -> Result<String, ReadError>;

impl FnReader<ReadFn> {
    pub fn utf8() -> Arc<Self> {
        fn read(_filename: &str, bytes: &[u8]) -> Result<String, ReadError> {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        Arc::new(FnReader(read as ReadFn))
    }
}

impl<F> DocumentReader for FnReader<F>
where
    F: Fn(&str, &[u8]) -> Result<String, ReadError> + Send + Sync,
{
    fn read(&self, filename: &str, bytes: &[u8]) -> Result<String, ReadError> {
        (self.0)(filename, bytes)
    }
}

/// Profile store held in memory. Applies the same merge policy as Postgres.
#[derive(Default)]
pub struct MemoryProfileStore {
    rows: Mutex<Vec<(ProfileRow, Option<StoredDocument>)>>,
    unavailable: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<ProfileRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(row, _)| row.clone())
            .collect()
    }

    /// Inserts a row directly, bypassing extraction.
    pub fn seed(&self, row: ProfileRow) {
        self.rows.lock().unwrap().push((row, None));
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A stored row with the given owner, name, email and skills string.
pub fn profile_row(owner_id: Uuid, name: &str, email: &str, skills: &str) -> ProfileRow {
    let now = Utc::now();
    ProfileRow {
        id: Uuid::new_v4(),
        owner_id,
        name: name.to_string(),
        email: email.to_string(),
        phone_number: String::new(),
        location: String::new(),
        current_role: String::new(),
        current_company: String::new(),
        education: String::new(),
        category: String::new(),
        total_experience_years: 0.0,
        skills: skills.to_string(),
        experience: serde_json::json!([]),
        raw_text: format!("{name} {email} {skills}"),
        filename: format!("{name}.pdf"),
        content_type: "application/pdf".to_string(),
        document_key: None,
        extraction_retries: 0,
        created_at: now,
        updated_at: now,
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(&n.to_lowercase()))
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn upsert(
        &self,
        owner_id: Uuid,
        email: &str,
        record: ProfileRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        self.check()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap();
        let document = (!record.document.bytes.is_empty()).then(|| record.document.clone());
        let existing = rows
            .iter_mut()
            .find(|(row, _)| row.owner_id == owner_id && row.email == email);

        match existing {
            Some((row, stored_doc)) => {
                let key = document.as_ref().map(|_| format!("memory/{}", row.id));
                let incoming = record.to_row(owner_id, row.id, key, Utc::now());
                *row = merge_profile(row, incoming);
                if document.is_some() {
                    *stored_doc = document;
                }
                Ok(UpsertOutcome { id: row.id, merged: true })
            }
            None => {
                let id = Uuid::new_v4();
                let key = document.as_ref().map(|_| format!("memory/{id}"));
                rows.push((record.to_row(owner_id, id, key, Utc::now()), document));
                Ok(UpsertOutcome { id, merged: false })
            }
        }
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ProfileRow>, StoreError> {
        self.check()?;
        Ok(self
            .rows()
            .into_iter()
            .filter(|row| row.owner_id == owner_id)
            .collect())
    }

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        self.check()?;
        Ok(self
            .rows()
            .into_iter()
            .find(|row| row.owner_id == owner_id && row.id == id))
    }

    async fn search(
        &self,
        owner_id: Uuid,
        query: &SearchQuery,
    ) -> Result<Vec<ProfileRow>, StoreError> {
        let rows = self.find_by_owner(owner_id).await?;
        Ok(rows
            .into_iter()
            .filter(|row| match query {
                SearchQuery::Skills(terms) => contains_any(&row.skills, terms),
                SearchQuery::Emails(terms) => contains_any(&row.email, terms),
            })
            .collect())
    }

    async fn replace_extracted(
        &self,
        owner_id: Uuid,
        id: Uuid,
        profile: &CandidateProfile,
        extraction_retries: u32,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some((row, _)) = rows
            .iter_mut()
            .find(|(row, _)| row.owner_id == owner_id && row.id == id)
        else {
            return Ok(false);
        };
        row.name = profile.name.clone();
        row.email = profile.email.clone();
        row.phone_number = profile.phone_number.clone();
        row.location = profile.location.clone();
        row.current_role = profile.current_role.clone();
        row.current_company = profile.current_company.clone();
        row.education = profile.education.clone();
        row.category = profile.category.clone();
        row.total_experience_years = profile.total_experience_years;
        row.skills = profile.skills_string();
        row.experience = serde_json::to_value(&profile.experience).unwrap();
        row.extraction_retries = extraction_retries as i32;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn fetch_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<StoredDocument>, StoreError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(row, _)| row.owner_id == owner_id && row.id == id)
            .and_then(|(_, doc)| doc.clone()))
    }

    async fn delete_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(row, _)| !(row.owner_id == owner_id && row.id == id));
        Ok(rows.len() < before)
    }
}

/// Job postings held in memory.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<JobRow>>,
}

impl MemoryJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, owner_id: Uuid, job: NewJob) -> Result<JobRow, StoreError> {
        let row = job.to_row(owner_id, Utc::now());
        self.jobs.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<JobRow>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<JobRow>, StoreError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.owner_id == owner_id && job.id == id)
            .cloned())
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: JobUpdate,
    ) -> Result<Option<JobRow>, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.owner_id == owner_id && job.id == id)
        else {
            return Ok(None);
        };
        update.apply(job, Utc::now());
        Ok(Some(job.clone()))
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|job| !(job.owner_id == owner_id && job.id == id));
        Ok(jobs.len() < before)
    }
}
