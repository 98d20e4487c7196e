// Profile extraction prompt templates.

pub const PROFILE_EXTRACT_SYSTEM: &str = "\
You are a precise resume data extractor. \
Read resume text and return the candidate's details as structured JSON. \
You MUST respond with valid JSON only — no markdown fences, no explanations. \
Never invent values: leave a field empty when the resume does not state it.";

pub const PROFILE_EXTRACT_PROMPT: &str = r#"Extract the candidate's details from the resume text below.

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string — full name of the candidate",
  "email": "string — email address, MUST be a valid format (name@domain.com)",
  "phone_number": "string — phone number with country code if available",
  "location": "string — current location (City, State/Country)",
  "current_role": "string — current or most recent job title",
  "current_company": "string — current or most recent company",
  "total_experience_years": number,
  "education": "string — highest qualification with major/specialization",
  "category": "string — specific job category based on skills and experience",
  "skills": ["string — every technical and soft skill"],
  "experience": [
    {"title": "string", "company": "string", "duration": "string", "responsibilities": "string"}
  ]
}

RULES:
1. The email MUST be a valid format (name@domain.com).
2. Do not return 'N/A' or placeholder values; leave the field empty ("" or []) if not found.
3. Skills should be specific and relevant, one skill per array item.
4. List experience entries in chronological order, most recent first.
5. Return ONLY the JSON object — nothing else, no code fences.

RESUME TEXT:
{resume_text}"#;

/// Appended to resume text that was cut before sending.
pub const TRUNCATION_MARKER: &str = "\n[... resume truncated ...]";
