use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted job posting. The row id doubles as the point id in the
/// postings vector collection — one identifier, two stores.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub job_title: String,
    pub career_level: String,
    pub location: String,
    pub department: String,
    pub key_skills: Vec<String>,
    pub natural_posting: String,
    pub structured_data: Value,
    pub created_at: DateTime<Utc>,
}

/// The original form input echoed back through generation and approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingInput {
    pub job_title: String,
    pub career_level: String,
    pub location: String,
    pub department: String,
    #[serde(default)]
    pub key_skills: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posting_input_key_skills_optional() {
        let json = r#"{
            "job_title": "Backend Engineer",
            "career_level": "Senior",
            "location": "Berlin",
            "department": "Tech - Software"
        }"#;
        let input: PostingInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.job_title, "Backend Engineer");
        assert!(input.key_skills.is_none());
    }

    #[test]
    fn test_posting_input_rejects_missing_title() {
        let json = r#"{
            "career_level": "Senior",
            "location": "Berlin",
            "department": "Tech"
        }"#;
        let result: Result<PostingInput, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
