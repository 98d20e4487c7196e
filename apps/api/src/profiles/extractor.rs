//! Profile Extractor: turns resume text into an acceptable `CandidateProfile`.
//!
//! Each attempt moves Pending → Validating → Accepted | RecoverableFailure.
//! A recoverable failure either schedules a retry after exponential backoff
//! or gives up once `max_attempts` is reached. Nothing escapes as an error:
//! callers always receive an `ExtractionOutcome`.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::llm_client::{strip_json_fences, CompletionClient};
use crate::profiles::models::CandidateProfile;
use crate::profiles::prompts::{PROFILE_EXTRACT_PROMPT, PROFILE_EXTRACT_SYSTEM, TRUNCATION_MARKER};
use crate::profiles::validation::{validate_profile, ValidationFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The extraction call itself failed (transport, timeout, empty body).
    Client,
    /// The response was not a JSON object.
    Parse,
    /// The response parsed but the profile is not acceptable.
    Validation,
}

/// Diagnostic record for one failed attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptFailure {
    pub attempt: u32,
    pub kind: FailureKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationFailure>,
}

/// Final result of `ProfileExtractor::extract`.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// The accepted profile, or an all-default profile after giving up.
    pub profile: CandidateProfile,
    pub accepted: bool,
    /// Retries consumed on success; attempts made on failure.
    pub retries: u32,
    pub attempts: u32,
    pub failures: Vec<AttemptFailure>,
}

impl ExtractionOutcome {
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.failures.last()
    }

    /// True when the final attempt was rejected for a missing or malformed email.
    pub fn email_rejected(&self) -> bool {
        self.last_failure()
            .map(|f| f.validation.iter().any(ValidationFailure::is_email))
            .unwrap_or(false)
    }

    /// Human-readable reason for a failed extraction.
    pub fn failure_message(&self) -> String {
        match self.last_failure() {
            Some(f) => format!(
                "Extraction failed after {} attempt(s): {}",
                self.attempts, f.detail
            ),
            None => "Extraction failed".to_string(),
        }
    }
}

enum Attempt {
    Accepted(CandidateProfile),
    RecoverableFailure(AttemptFailure),
}

enum Step {
    Retry(Duration),
    GiveUp,
}

pub struct ProfileExtractor {
    llm: Arc<dyn CompletionClient>,
    config: ExtractionConfig,
}

impl ProfileExtractor {
    pub fn new(llm: Arc<dyn CompletionClient>, config: ExtractionConfig) -> Self {
        Self { llm, config }
    }

    pub async fn extract(&self, text: &str) -> ExtractionOutcome {
        let input = truncate_text(text, self.config.max_input_chars);
        let prompt = PROFILE_EXTRACT_PROMPT.replace("{resume_text}", &input);

        let mut failures = Vec::new();
        let mut attempt = 1;

        loop {
            match self.run_attempt(&prompt, attempt).await {
                Attempt::Accepted(profile) => {
                    info!(
                        attempt,
                        email = %profile.email,
                        skills = profile.skills.len(),
                        "Profile extraction accepted"
                    );
                    return ExtractionOutcome {
                        profile,
                        accepted: true,
                        retries: attempt - 1,
                        attempts: attempt,
                        failures,
                    };
                }
                Attempt::RecoverableFailure(failure) => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        kind = ?failure.kind,
                        reason = %failure.detail,
                        "Profile extraction attempt failed"
                    );
                    failures.push(failure);

                    match self.next_step(attempt) {
                        Step::Retry(delay) => {
                            debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        Step::GiveUp => {
                            warn!(
                                attempts = attempt,
                                diagnostics = %serde_json::to_string(&failures).unwrap_or_default(),
                                "Profile extraction gave up"
                            );
                            return ExtractionOutcome {
                                profile: CandidateProfile::default(),
                                accepted: false,
                                retries: attempt,
                                attempts: attempt,
                                failures,
                            };
                        }
                    }
                }
            }
        }
    }

    async fn run_attempt(&self, prompt: &str, attempt: u32) -> Attempt {
        // Pending
        let response = match self.llm.complete(prompt, PROFILE_EXTRACT_SYSTEM).await {
            Ok(text) => text,
            Err(e) => {
                return Attempt::RecoverableFailure(AttemptFailure {
                    attempt,
                    kind: FailureKind::Client,
                    detail: e.to_string(),
                    validation: vec![],
                })
            }
        };

        let value = match parse_object(&response) {
            Ok(value) => value,
            Err(detail) => {
                return Attempt::RecoverableFailure(AttemptFailure {
                    attempt,
                    kind: FailureKind::Parse,
                    detail,
                    validation: vec![],
                })
            }
        };

        // Validating
        let profile = CandidateProfile::from_extraction(&value);
        let validation = validate_profile(&profile);
        if validation.is_empty() {
            Attempt::Accepted(profile)
        } else {
            let detail = validation
                .iter()
                .map(ValidationFailure::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Attempt::RecoverableFailure(AttemptFailure {
                attempt,
                kind: FailureKind::Validation,
                detail,
                validation,
            })
        }
    }

    fn next_step(&self, attempt: u32) -> Step {
        if attempt >= self.config.max_attempts {
            Step::GiveUp
        } else {
            Step::Retry(backoff_delay(self.config.base_delay, attempt))
        }
    }
}

/// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
}

/// Cuts `text` to `max_chars` characters, appending a marker when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

fn parse_object(response: &str) -> Result<Value, String> {
    let value: Value = serde_json::from_str(strip_json_fences(response))
        .map_err(|e| format!("JSON parse error: {e}"))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}
