use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values the model sometimes emits instead of leaving a field empty.
const PLACEHOLDERS: &[&str] = &["n/a", "na", "none", "null", "unknown", "not available", "-"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub responsibilities: String,
}

/// Canonical structured candidate profile produced by extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub location: String,
    pub current_role: String,
    pub current_company: String,
    pub education: String,
    pub category: String,
    pub total_experience_years: f64,
    /// Ordered, distinct skill tokens.
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
}

impl CandidateProfile {
    /// Builds a profile from the loosely-typed JSON object the model returns.
    /// Unknown keys are ignored; wrong shapes degrade to empty values.
    pub fn from_extraction(value: &Value) -> Self {
        let skills = match value.get("skills") {
            Some(Value::Array(items)) => {
                distinct_skills(items.iter().filter_map(scalar_text).collect::<Vec<_>>())
            }
            Some(Value::String(s)) => distinct_skills(parse_skills(s)),
            _ => Vec::new(),
        };

        let experience = value
            .get("experience")
            .or_else(|| value.get("experience_details"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(experience_entry).collect())
            .unwrap_or_default();

        CandidateProfile {
            name: text_field(value, &["name", "full_name"]),
            email: text_field(value, &["email"]).to_lowercase(),
            phone_number: text_field(value, &["phone_number", "phone"]),
            location: text_field(value, &["location"]),
            current_role: text_field(value, &["current_role", "job_title"]),
            current_company: text_field(value, &["current_company"]),
            education: text_field(value, &["education"]),
            category: text_field(value, &["category"]),
            total_experience_years: years_field(
                value,
                &["total_experience_years", "total_experience", "experience_years"],
            ),
            skills,
            experience,
        }
    }

    /// Storage form of `skills`.
    pub fn skills_string(&self) -> String {
        self.skills.join(", ")
    }
}

/// Splits a stored skills string on commas, trimming and dropping empties.
/// Nothing else is filtered: scoring counts every stored token.
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extraction-time cleanup: drops placeholders and case-insensitive repeats,
/// keeping the first spelling seen.
fn distinct_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !is_placeholder(s))
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

fn is_placeholder(s: &str) -> bool {
    PLACEHOLDERS.contains(&s.trim().to_lowercase().as_str())
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || is_placeholder(&text) {
        None
    } else {
        Some(text)
    }
}

fn text_field(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(scalar_text)
        .unwrap_or_default()
}

/// Accepts `5`, `5.5`, `"5"` or `"5+ years"`.
fn years_field(value: &Value, keys: &[&str]) -> f64 {
    let raw = keys.iter().find_map(|k| value.get(*k));
    let years = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let numeric: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            numeric.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if years.is_finite() && years > 0.0 {
        years
    } else {
        0.0
    }
}

fn experience_entry(value: &Value) -> Option<ExperienceEntry> {
    if !value.is_object() {
        return None;
    }
    let responsibilities = match value.get("responsibilities") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => scalar_text(other).unwrap_or_default(),
        None => String::new(),
    };
    let entry = ExperienceEntry {
        title: text_field(value, &["title", "role", "position"]),
        company: text_field(value, &["company", "employer"]),
        duration: text_field(value, &["duration", "dates", "period"]),
        responsibilities,
    };
    if entry == ExperienceEntry::default() {
        None
    } else {
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_extraction_reads_all_fields() {
        let value = json!({
            "name": "Jane Doe",
            "email": "Jane@X.com",
            "phone_number": "+1 555 0100",
            "location": "Austin, TX",
            "current_role": "Data Engineer",
            "current_company": "Acme",
            "education": "BSc Computer Science",
            "category": "Data Engineering",
            "total_experience_years": 6,
            "skills": ["Python", "SQL", "python"],
            "experience": [
                {"title": "Data Engineer", "company": "Acme", "duration": "2019-2024",
                 "responsibilities": ["Built pipelines", "Ran on-call"]}
            ]
        });
        let profile = CandidateProfile::from_extraction(&value);
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.email, "jane@x.com");
        assert_eq!(profile.current_role, "Data Engineer");
        assert_eq!(profile.total_experience_years, 6.0);
        assert_eq!(profile.skills, vec!["Python", "SQL"]);
        assert_eq!(profile.experience.len(), 1);
        assert_eq!(
            profile.experience[0].responsibilities,
            "Built pipelines; Ran on-call"
        );
    }

    #[test]
    fn test_skills_as_comma_string() {
        let profile = CandidateProfile::from_extraction(&json!({"skills": "Python,SQL, ,Go"}));
        assert_eq!(profile.skills, vec!["Python", "SQL", "Go"]);
        assert_eq!(profile.skills_string(), "Python, SQL, Go");
    }

    #[test]
    fn test_placeholders_become_empty() {
        let profile = CandidateProfile::from_extraction(&json!({
            "name": "N/A",
            "phone": "none",
            "skills": ["N/A"]
        }));
        assert!(profile.name.is_empty());
        assert!(profile.phone_number.is_empty());
        assert!(profile.skills.is_empty());
    }

    #[test]
    fn test_experience_years_from_string() {
        let profile = CandidateProfile::from_extraction(&json!({"total_experience": "5+ years"}));
        assert_eq!(profile.total_experience_years, 5.0);
    }

    #[test]
    fn test_wrong_shapes_degrade_to_defaults() {
        let profile = CandidateProfile::from_extraction(&json!({
            "name": {"first": "Jane"},
            "skills": 42,
            "experience": "lots"
        }));
        assert_eq!(profile, CandidateProfile::default());
    }

    #[test]
    fn test_parse_skills_trims_and_drops_empties() {
        assert_eq!(
            parse_skills(" python3, aws-lambda ,, "),
            vec!["python3", "aws-lambda"]
        );
        assert!(parse_skills("").is_empty());
    }

    #[test]
    fn test_parse_skills_keeps_repeats_and_placeholders() {
        assert_eq!(
            parse_skills("Python, python, N/A, -"),
            vec!["Python", "python", "N/A", "-"]
        );
    }
}
