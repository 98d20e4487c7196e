// Skill extraction prompt templates.

pub const SKILL_EXTRACT_PROMPT: &str = r#"Extract a comprehensive list of technical and professional skills from the text below.
Format the output as a comma-separated list of skills.
Include hard skills (programming languages, tools, frameworks, platforms) and
soft skills (leadership, communication, etc.).

Rules:
1. Each skill is a single word or short phrase (e.g. "Python", "Project Management").
2. No descriptions or explanations.
3. No duplicates.
4. Use the conventional capitalization of each skill.

TEXT:
{text}"#;
