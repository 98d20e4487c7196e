//! Skill extraction for job descriptions.
//!
//! The extraction service answers with a comma-separated list; normalisation
//! here makes the result an ordered, de-duplicated `JobRequirement`.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::LIST_ONLY_SYSTEM;
use crate::llm_client::CompletionClient;
use crate::matching::prompts::SKILL_EXTRACT_PROMPT;
use crate::matching::ranking::{rank_profiles, MatchResult};
use crate::models::profile::ProfileRow;

static RE_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'`]"#).unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Skills a job description asks for, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequirement {
    pub required_skills: Vec<String>,
}

/// Strips quotes, collapses whitespace, splits on commas and drops
/// empties and exact repeats (first occurrence wins). Repeats differing
/// only in case are kept; each counts toward the required total.
pub fn normalize_skill_list(raw: &str) -> Vec<String> {
    let unquoted = RE_QUOTES.replace_all(raw, "");
    let mut seen = HashSet::new();
    unquoted
        .split(',')
        .map(|s| RE_WHITESPACE.replace_all(s, " ").trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

pub struct SkillMatcher {
    llm: Arc<dyn CompletionClient>,
}

impl SkillMatcher {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Fails with `SkillExtractionFailed` when the call errors or yields no skills.
    pub async fn required_skills(&self, job_description: &str) -> Result<JobRequirement, AppError> {
        let prompt = SKILL_EXTRACT_PROMPT.replace("{text}", job_description);
        let raw = self
            .llm
            .complete(&prompt, LIST_ONLY_SYSTEM)
            .await
            .map_err(|e| AppError::SkillExtractionFailed(e.to_string()))?;

        let required_skills = normalize_skill_list(&raw);
        if required_skills.is_empty() {
            warn!("Skill extraction returned no skills");
            return Err(AppError::SkillExtractionFailed(
                "no skills found in job description".to_string(),
            ));
        }

        Ok(JobRequirement { required_skills })
    }

    /// Scores `profiles` against the job description and returns those at or
    /// above `threshold`, best first. Ties keep the order of `profiles`.
    pub async fn score(
        &self,
        job_description: &str,
        profiles: &[ProfileRow],
        threshold: f64,
    ) -> Result<Vec<MatchResult>, AppError> {
        let requirement = self.required_skills(job_description).await?;
        let results = rank_profiles(&requirement, profiles, threshold);
        info!(
            required = requirement.required_skills.len(),
            profiles = profiles.len(),
            matching = results.len(),
            threshold,
            "Profiles ranked"
        );
        Ok(results)
    }
}
