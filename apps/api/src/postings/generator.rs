//! Posting generation — turns form fields into a natural-language posting
//! plus the structured data block the approval pipeline later embeds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::posting::PostingInput;
use crate::postings::prompts::{GENERATE_POSTING_PROMPT_TEMPLATE, GENERATE_POSTING_SYSTEM};

/// Output of one generation call. `structured_data` keeps the
/// provider-defined schema as-is; the approval endpoint receives it
/// back as a JSON string and re-parses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPosting {
    pub natural_posting: String,
    pub structured_data: Value,
}

/// Generates a posting from the form input via the LLM.
pub async fn generate_posting(
    llm: &LlmClient,
    input: &PostingInput,
) -> Result<GeneratedPosting, AppError> {
    let prompt = build_generation_prompt(input);

    let posting: GeneratedPosting = llm
        .call_json(&prompt, GENERATE_POSTING_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Posting generation failed: {e}")))?;

    if posting.natural_posting.trim().is_empty() {
        return Err(AppError::Llm(
            "Posting generation returned empty text".to_string(),
        ));
    }

    Ok(posting)
}

fn build_generation_prompt(input: &PostingInput) -> String {
    let key_skills = match &input.key_skills {
        Some(skills) if !skills.is_empty() => skills.join(", "),
        _ => "None specified".to_string(),
    };

    GENERATE_POSTING_PROMPT_TEMPLATE
        .replace("{job_title}", &input.job_title)
        .replace("{career_level}", &input.career_level)
        .replace("{location}", &input.location)
        .replace("{department}", &input.department)
        .replace("{key_skills}", &key_skills)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PostingInput {
        PostingInput {
            job_title: "Data Engineer".to_string(),
            career_level: "Mid".to_string(),
            location: "Remote".to_string(),
            department: "Tech - Data".to_string(),
            key_skills: Some(vec!["Python".to_string(), "Airflow".to_string()]),
        }
    }

    #[test]
    fn test_prompt_fills_all_placeholders() {
        let prompt = build_generation_prompt(&input());
        assert!(prompt.contains("Data Engineer"));
        assert!(prompt.contains("Python, Airflow"));
        assert!(!prompt.contains("{job_title}"));
        assert!(!prompt.contains("{key_skills}"));
    }

    #[test]
    fn test_prompt_handles_missing_skills() {
        let mut no_skills = input();
        no_skills.key_skills = None;
        let prompt = build_generation_prompt(&no_skills);
        assert!(prompt.contains("None specified"));
    }

    #[test]
    fn test_generated_posting_deserializes() {
        let json = r#"{
            "natural_posting": "We are hiring a Data Engineer...",
            "structured_data": {"title": "Data Engineer", "skills": "Python, Airflow"}
        }"#;
        let posting: GeneratedPosting = serde_json::from_str(json).unwrap();
        assert_eq!(posting.structured_data["title"], "Data Engineer");
    }

    #[test]
    fn test_generated_posting_requires_both_fields() {
        let result: Result<GeneratedPosting, _> =
            serde_json::from_str(r#"{"natural_posting": "text"}"#);
        assert!(result.is_err());
    }
}
