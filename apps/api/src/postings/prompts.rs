// LLM prompt constants for posting generation.

/// System prompt — enforces JSON-only output.
pub const GENERATE_POSTING_SYSTEM: &str =
    "You are an expert technical recruiter writing job postings. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Posting generation template. Replace `{job_title}`, `{career_level}`,
/// `{location}`, `{department}`, `{key_skills}` before sending.
pub const GENERATE_POSTING_PROMPT_TEMPLATE: &str = r#"Write a job posting for the following role.

Role details:
- Job title: {job_title}
- Career level: {career_level}
- Location: {location}
- Department: {department}
- Key skills: {key_skills}

Return a JSON object with this EXACT schema (no extra fields):
{
  "natural_posting": "The full posting as natural-language markdown text: an engaging intro paragraph, a responsibilities section, a requirements section, and a closing paragraph.",
  "structured_data": {
    "title": "exact job title",
    "job_type": "Full-time | Part-time | Contract",
    "work_setting": "On-site | Hybrid | Remote",
    "location": "city or region",
    "experience": "years of experience expected, e.g. '5+ years'",
    "career_level": "the career level",
    "education": "expected education, or 'Not required'",
    "categories": "department categories separated by ' - ', e.g. 'Tech - Software'",
    "skills": "comma-separated skill list"
  }
}

Rules:
1. `structured_data.title` must match the requested job title exactly
2. `structured_data.skills` must include every provided key skill
3. `categories` must start from the provided department
4. Keep the posting factual — do not invent compensation or benefits"#;
