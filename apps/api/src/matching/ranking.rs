//! Ranking: deterministic skill overlap between a job and stored profiles.
//!
//! A profile skill counts as matched when, ignoring case, it contains one of
//! the required skills or is contained by one. The score is the matched count
//! over the required count, as a percentage rounded to 2 decimals.

use serde::Serialize;
use uuid::Uuid;

use crate::matching::skills::JobRequirement;
use crate::models::profile::ProfileRow;
use crate::profiles::models::parse_skills;

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub profile_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub category: String,
    /// Stored skills string as persisted.
    pub skills: String,
    pub match_percentage: f64,
    pub matched_skills: Vec<String>,
    pub required_skills: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Profile skills that overlap any required skill, in profile order.
pub fn match_skills(required: &[String], profile_skills: &[String]) -> Vec<String> {
    let required: Vec<String> = required.iter().map(|r| r.to_lowercase()).collect();
    profile_skills
        .iter()
        .filter(|skill| {
            let skill = skill.to_lowercase();
            required
                .iter()
                .any(|req| skill.contains(req.as_str()) || req.contains(skill.as_str()))
        })
        .cloned()
        .collect()
}

/// `matched / required * 100`, rounded to 2 decimals. Several profile skills
/// can overlap the same requirement, so this can exceed 100.
pub fn match_percentage(matched: usize, required: usize) -> f64 {
    if required == 0 {
        return 0.0;
    }
    let pct = matched as f64 / required as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Scores every profile and keeps those at or above `threshold`, sorted
/// best first. `sort_by` is stable, so ties keep input order.
pub fn rank_profiles(
    requirement: &JobRequirement,
    profiles: &[ProfileRow],
    threshold: f64,
) -> Vec<MatchResult> {
    let required = &requirement.required_skills;

    let mut results: Vec<MatchResult> = profiles
        .iter()
        .filter_map(|profile| {
            let matched_skills = match_skills(required, &parse_skills(&profile.skills));
            let match_percentage = match_percentage(matched_skills.len(), required.len());
            (match_percentage >= threshold).then(|| MatchResult {
                profile_id: profile.id,
                name: profile.name.clone(),
                email: profile.email.clone(),
                phone_number: profile.phone_number.clone(),
                category: profile.category.clone(),
                skills: profile.skills.clone(),
                match_percentage,
                matched_skills,
                required_skills: required.clone(),
            })
        })
        .collect();

    results.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::profile_row;

    fn requirement(skills: &[&str]) -> JobRequirement {
        JobRequirement {
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_bidirectional_substring_match() {
        let required = vec!["Python".to_string(), "AWS".to_string()];
        let profile = vec!["python3".to_string(), "aws-lambda".to_string()];
        let matched = match_skills(&required, &profile);
        assert_eq!(matched, vec!["python3", "aws-lambda"]);
        assert_eq!(match_percentage(matched.len(), required.len()), 100.0);

        // A short profile skill contained in a longer requirement also matches.
        let required = vec!["Amazon Web Services".to_string()];
        let matched = match_skills(&required, &["web".to_string()]);
        assert_eq!(matched, vec!["web"]);
    }

    #[test]
    fn test_threshold_excludes_lower_scores() {
        let owner = Uuid::new_v4();
        let req = requirement(&["Python", "SQL", "AWS", "Docker"]);
        let profiles = vec![profile_row(owner, "Jane", "jane@x.com", "Python, SQL, AWS")];

        assert!(rank_profiles(&req, &profiles, 80.0).is_empty());
        let results = rank_profiles(&req, &profiles, 75.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_percentage, 75.0);
    }

    #[test]
    fn test_sorted_descending_and_stable_on_ties() {
        let owner = Uuid::new_v4();
        let req = requirement(&["Python", "SQL"]);
        let profiles = vec![
            profile_row(owner, "First half", "a@x.com", "Python"),
            profile_row(owner, "Full", "b@x.com", "Python, SQL"),
            profile_row(owner, "Second half", "c@x.com", "sql"),
            profile_row(owner, "None", "d@x.com", "Go"),
        ];

        let results = rank_profiles(&req, &profiles, 0.0);
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Full", "First half", "Second half", "None"]);
        assert!(results
            .windows(2)
            .all(|w| w[0].match_percentage >= w[1].match_percentage));
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(match_percentage(1, 3), 33.33);
        assert_eq!(match_percentage(2, 3), 66.67);
        assert_eq!(match_percentage(5, 2), 250.0);
        assert_eq!(match_percentage(1, 0), 0.0);
    }

    #[test]
    fn test_overlapping_skills_can_score_above_hundred() {
        let owner = Uuid::new_v4();
        let req = requirement(&["Python", "AWS"]);
        let profiles = vec![
            profile_row(owner, "Two", "two@x.com", "Python, AWS"),
            profile_row(owner, "Three", "three@x.com", "Python, python3, aws-lambda"),
        ];

        let results = rank_profiles(&req, &profiles, 70.0);
        let ranked: Vec<_> = results
            .iter()
            .map(|r| (r.name.as_str(), r.match_percentage, r.matched_skills.len()))
            .collect();
        assert_eq!(ranked, [("Three", 150.0, 3), ("Two", 100.0, 2)]);
    }

    #[test]
    fn test_result_carries_profile_fields() {
        let owner = Uuid::new_v4();
        let mut row = profile_row(owner, "Jane Doe", "jane@x.com", "Python,  , SQL");
        row.category = "Data".to_string();
        row.phone_number = "+1 555 0100".to_string();
        let results = rank_profiles(&requirement(&["SQL"]), &[row.clone()], 70.0);

        assert_eq!(results[0].profile_id, row.id);
        assert_eq!(results[0].category, "Data");
        assert_eq!(results[0].phone_number, "+1 555 0100");
        assert_eq!(results[0].matched_skills, vec!["SQL"]);
        assert_eq!(results[0].required_skills, vec!["SQL"]);
    }
}
