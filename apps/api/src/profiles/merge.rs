use serde_json::Value;

use crate::models::profile::ProfileRow;

/// Merges a freshly extracted row into the stored one for the same
/// `(owner_id, email)`.
///
/// Non-empty incoming fields overwrite. Empty or default incoming fields keep
/// the stored value. Identity and `created_at` always come from `existing`;
/// `extraction_retries` and `updated_at` always come from `incoming`.
pub fn merge_profile(existing: &ProfileRow, incoming: ProfileRow) -> ProfileRow {
    ProfileRow {
        id: existing.id,
        owner_id: existing.owner_id,
        name: pick(&existing.name, incoming.name),
        email: pick(&existing.email, incoming.email),
        phone_number: pick(&existing.phone_number, incoming.phone_number),
        location: pick(&existing.location, incoming.location),
        current_role: pick(&existing.current_role, incoming.current_role),
        current_company: pick(&existing.current_company, incoming.current_company),
        education: pick(&existing.education, incoming.education),
        category: pick(&existing.category, incoming.category),
        total_experience_years: if incoming.total_experience_years > 0.0 {
            incoming.total_experience_years
        } else {
            existing.total_experience_years
        },
        skills: pick(&existing.skills, incoming.skills),
        experience: if is_empty_json(&incoming.experience) {
            existing.experience.clone()
        } else {
            incoming.experience
        },
        raw_text: pick(&existing.raw_text, incoming.raw_text),
        filename: pick(&existing.filename, incoming.filename),
        content_type: pick(&existing.content_type, incoming.content_type),
        document_key: incoming
            .document_key
            .or_else(|| existing.document_key.clone()),
        extraction_retries: incoming.extraction_retries,
        created_at: existing.created_at,
        updated_at: incoming.updated_at,
    }
}

fn pick(existing: &str, incoming: String) -> String {
    if incoming.trim().is_empty() {
        existing.to_string()
    } else {
        incoming
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
