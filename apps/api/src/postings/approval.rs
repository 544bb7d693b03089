//! Approval orchestration — the straight-line pipeline behind
//! `POST /api/v1/postings/approve`.
//!
//! Flow: persist row → synthesize embedding text → acquire embedding →
//! upload posting vector → query similar employees → enrich with
//! promotion probabilities → respond.
//!
//! Failure policy: persistence, embedding acquisition, and vector upload
//! are fatal. Similarity search is fatal by default but configurable
//! (`SIMILARITY_SEARCH_FATAL=false` degrades to an empty match list).
//! Enrichment never aborts — failures leave the default probability in
//! place. There is no compensating transaction: a row written before a
//! later stage fails stays written.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::text::{build_embedding_text, extract_departments};
use crate::errors::AppError;
use crate::models::employee::EmployeeMatch;
use crate::models::posting::{JobPostingRow, PostingInput};
use crate::state::AppState;
use crate::vector_store::VectorIndex;

/// Top-K cap on similar employees returned per approval.
pub const SIMILAR_EMPLOYEE_LIMIT: usize = 5;

/// Request body for posting approval. `structured_data` arrives as the
/// JSON string produced by the generation step.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovePostingRequest {
    pub natural_posting: String,
    pub structured_data: String,
    pub original_input: PostingInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalResponse {
    pub posting: JobPostingRow,
    pub similar_employees: Vec<EmployeeMatch>,
    pub qdrant_upload_success: bool,
}

/// Runs the full approval pipeline. The caller has already validated
/// field presence; this function owns everything with side effects.
pub async fn approve_posting(
    state: &AppState,
    request: ApprovePostingRequest,
) -> Result<ApprovalResponse, AppError> {
    let structured: serde_json::Value = serde_json::from_str(&request.structured_data)
        .map_err(|e| AppError::Validation(format!("structured_data is not valid JSON: {e}")))?;

    // Step 1: persist. The generated id is reused as the vector point id.
    let posting = insert_posting(state, &request, &structured).await?;
    info!("Persisted posting {} ({})", posting.id, posting.job_title);

    // Step 2: deterministic embedding input.
    let embedding_text = build_embedding_text(&structured, &request.natural_posting);

    // Step 3: resolve target dimensionality from the employees collection;
    // fall back to the configured default when the lookup fails.
    let target_dim = match state
        .vectors
        .collection_dim(&state.config.employees_collection)
        .await
    {
        Ok(dim) => dim,
        Err(e) => {
            warn!(
                "Collection metadata lookup failed ({e}); using configured dim {}",
                state.config.embedding_dim
            );
            state.config.embedding_dim
        }
    };

    // Step 4: embedding via the provider fallback chain. Fatal.
    let vector = state.embeddings.embed(&embedding_text, target_dim).await?;

    // Steps 5–6: upload the posting point, then query similar employees.
    let similar_employees =
        index_posting_and_match(state.vectors.as_ref(), &state.config, &posting, &vector).await?;

    // Step 7: promotion enrichment. Never fatal.
    let similar_employees = enrich_with_predictions(state, similar_employees).await;

    info!(
        "Approval complete for posting {}: {} similar employees",
        posting.id,
        similar_employees.len()
    );

    Ok(ApprovalResponse {
        posting,
        similar_employees,
        qdrant_upload_success: true,
    })
}

async fn insert_posting(
    state: &AppState,
    request: &ApprovePostingRequest,
    structured: &serde_json::Value,
) -> Result<JobPostingRow, AppError> {
    let key_skills = request.original_input.key_skills.clone().unwrap_or_default();

    let posting = sqlx::query_as::<_, JobPostingRow>(
        r#"
        INSERT INTO job_postings
            (id, job_title, career_level, location, department, key_skills,
             natural_posting, structured_data)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.original_input.job_title)
    .bind(&request.original_input.career_level)
    .bind(&request.original_input.location)
    .bind(&request.original_input.department)
    .bind(&key_skills)
    .bind(&request.natural_posting)
    .bind(structured)
    .fetch_one(&state.db)
    .await?;

    Ok(posting)
}

/// Steps 5–6 of the pipeline. The upsert is fatal: any upstream failure
/// propagates and aborts the approval (the persisted row stays). Search
/// failure is fatal unless `similarity_search_fatal` is off, in which
/// case the approval continues with no matches.
async fn index_posting_and_match(
    vectors: &dyn VectorIndex,
    config: &Config,
    posting: &JobPostingRow,
    vector: &[f32],
) -> Result<Vec<EmployeeMatch>, AppError> {
    let payload = posting_payload(posting);
    vectors
        .upsert_point(&config.postings_collection, posting.id, vector, &payload)
        .await?;
    info!(
        "Uploaded posting vector {} into '{}'",
        posting.id, config.postings_collection
    );

    match vectors
        .search(
            &config.employees_collection,
            vector,
            SIMILAR_EMPLOYEE_LIMIT,
            config.similarity_score_threshold,
        )
        .await
    {
        Ok(points) => {
            let matches = points.iter().map(EmployeeMatch::from_scored_point).collect();
            Ok(rank_matches(matches))
        }
        Err(e) if config.similarity_search_fatal => Err(e),
        Err(e) => {
            warn!("Similarity search failed, continuing without matches: {e}");
            Ok(Vec::new())
        }
    }
}

/// Payload stored with the posting point. Departments come from the
/// free-text department field, split into keywords; the first keyword is
/// the primary department.
fn posting_payload(posting: &JobPostingRow) -> serde_json::Value {
    let departments = extract_departments(&posting.department);
    json!({
        "job_title": posting.job_title,
        "career_level": posting.career_level,
        "location": posting.location,
        "department": departments[0],
        "departments": departments,
        "key_skills": posting.key_skills,
        "created_at": posting.created_at.to_rfc3339(),
    })
}

/// Defensive re-sort: descending by similarity score, capped at the
/// top-K limit. The backing service usually returns sorted results, but
/// that ordering is not part of its contract.
fn rank_matches(mut matches: Vec<EmployeeMatch>) -> Vec<EmployeeMatch> {
    matches.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(SIMILAR_EMPLOYEE_LIMIT);
    matches
}

/// Calls the prediction endpoint once with the full batch and merges
/// probabilities back positionally. Unconfigured endpoint, call failure,
/// or a length mismatch all leave the default probability in place.
async fn enrich_with_predictions(
    state: &AppState,
    mut matches: Vec<EmployeeMatch>,
) -> Vec<EmployeeMatch> {
    let Some(predictions) = &state.predictions else {
        return matches;
    };
    if matches.is_empty() {
        return matches;
    }

    let batch: Vec<_> = matches.iter().map(EmployeeMatch::features).collect();
    match predictions.predict(&batch).await {
        Ok(probabilities) => {
            if !apply_probabilities(&mut matches, &probabilities) {
                warn!(
                    "Prediction batch size mismatch ({} employees, {} probabilities); using defaults",
                    matches.len(),
                    probabilities.len()
                );
            }
        }
        Err(e) => {
            warn!("Prediction enrichment failed, using default probabilities: {e}");
        }
    }
    matches
}

/// Positional merge: `probabilities[i]` onto `matches[i]`. Returns false
/// without touching anything when the lengths differ.
fn apply_probabilities(matches: &mut [EmployeeMatch], probabilities: &[f64]) -> bool {
    if matches.len() != probabilities.len() {
        return false;
    }
    for (employee, probability) in matches.iter_mut().zip(probabilities) {
        employee.promotion_probability = *probability;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::DEFAULT_PROMOTION_PROBABILITY;

    fn employee(id: &str, score: f32) -> EmployeeMatch {
        EmployeeMatch {
            employee_id: id.to_string(),
            name: "Test".to_string(),
            department: "Tech".to_string(),
            current_role: "Engineer".to_string(),
            email: format!("{id}@company.com"),
            similarity_score: score,
            performance_rating: 3.0,
            years_at_company: 2.0,
            awards: 0,
            trainings_completed: 1,
            training_score: 50.0,
            kpis_met: false,
            promotion_probability: DEFAULT_PROMOTION_PROBABILITY,
        }
    }

    #[test]
    fn test_rank_matches_sorts_descending_and_caps_at_limit() {
        let matches = vec![
            employee("a", 0.2),
            employee("b", 0.9),
            employee("c", 0.5),
            employee("d", 0.7),
            employee("e", 0.1),
            employee("f", 0.8),
        ];
        let ranked = rank_matches(matches);
        assert_eq!(ranked.len(), SIMILAR_EMPLOYEE_LIMIT);
        let scores: Vec<f32> = ranked.iter().map(|m| m.similarity_score).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7, 0.5, 0.2]);
    }

    #[test]
    fn test_apply_probabilities_is_positional() {
        let mut matches = vec![employee("a", 0.9), employee("b", 0.8), employee("c", 0.7)];
        let applied = apply_probabilities(&mut matches, &[0.1, 0.2, 0.3]);
        assert!(applied);
        assert_eq!(matches[0].promotion_probability, 0.1);
        assert_eq!(matches[1].promotion_probability, 0.2);
        assert_eq!(matches[2].promotion_probability, 0.3);
    }

    #[test]
    fn test_apply_probabilities_mismatch_leaves_defaults() {
        let mut matches = vec![employee("a", 0.9), employee("b", 0.8)];
        let applied = apply_probabilities(&mut matches, &[0.1]);
        assert!(!applied);
        for m in &matches {
            assert_eq!(m.promotion_probability, DEFAULT_PROMOTION_PROBABILITY);
        }
    }

    #[test]
    fn test_posting_payload_splits_departments() {
        let posting = JobPostingRow {
            id: Uuid::new_v4(),
            job_title: "Engineer".to_string(),
            career_level: "Senior".to_string(),
            location: "Berlin".to_string(),
            department: "Tech - Software / Engineering".to_string(),
            key_skills: vec!["Rust".to_string()],
            natural_posting: "text".to_string(),
            structured_data: serde_json::json!({}),
            created_at: chrono::Utc::now(),
        };
        let payload = posting_payload(&posting);
        assert_eq!(payload["department"], "Tech");
        assert_eq!(
            payload["departments"],
            serde_json::json!(["Tech", "Software", "Engineering"])
        );
    }

    #[test]
    fn test_approval_response_serializes_success_flag() {
        let response = ApprovalResponse {
            posting: JobPostingRow {
                id: Uuid::new_v4(),
                job_title: "X".to_string(),
                career_level: "Senior".to_string(),
                location: "Remote".to_string(),
                department: "Tech".to_string(),
                key_skills: vec![],
                natural_posting: "text".to_string(),
                structured_data: serde_json::json!({"title": "X"}),
                created_at: chrono::Utc::now(),
            },
            similar_employees: vec![],
            qdrant_upload_success: true,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["qdrant_upload_success"], true);
        assert!(value["posting"]["id"].is_string());
        assert!(value["similar_employees"].is_array());
    }

    use crate::vector_store::ScoredPoint;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory vector index: configurable failures, records upserted ids.
    struct StubIndex {
        upsert_error: Option<&'static str>,
        search_result: Result<Vec<ScoredPoint>, &'static str>,
        upserted_ids: Mutex<Vec<Uuid>>,
    }

    impl StubIndex {
        fn new(
            upsert_error: Option<&'static str>,
            search_result: Result<Vec<ScoredPoint>, &'static str>,
        ) -> Self {
            Self {
                upsert_error,
                search_result,
                upserted_ids: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for StubIndex {
        async fn collection_dim(&self, _collection: &str) -> Result<usize, AppError> {
            Ok(4)
        }

        async fn upsert_point(
            &self,
            _collection: &str,
            id: Uuid,
            _vector: &[f32],
            _payload: &serde_json::Value,
        ) -> Result<(), AppError> {
            if let Some(body) = self.upsert_error {
                return Err(AppError::Upstream {
                    service: "qdrant",
                    status: 503,
                    body: body.to_string(),
                });
            }
            self.upserted_ids.lock().unwrap().push(id);
            Ok(())
        }

        async fn search(
            &self,
            _collection: &str,
            _vector: &[f32],
            _limit: usize,
            _score_threshold: Option<f32>,
        ) -> Result<Vec<ScoredPoint>, AppError> {
            match &self.search_result {
                Ok(points) => Ok(points.clone()),
                Err(body) => Err(AppError::Upstream {
                    service: "qdrant",
                    status: 500,
                    body: body.to_string(),
                }),
            }
        }
    }

    fn config(similarity_search_fatal: bool) -> Config {
        Config {
            database_url: String::new(),
            anthropic_api_key: String::new(),
            qdrant_url: String::new(),
            qdrant_api_key: None,
            postings_collection: "job_postings".to_string(),
            employees_collection: "employees".to_string(),
            embedding_dim: 4,
            modal_embedding_url: None,
            huggingface_api_key: None,
            local_embedding_url: None,
            prediction_api_url: None,
            similarity_score_threshold: None,
            similarity_search_fatal,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn posting() -> JobPostingRow {
        JobPostingRow {
            id: Uuid::new_v4(),
            job_title: "Engineer".to_string(),
            career_level: "Senior".to_string(),
            location: "Berlin".to_string(),
            department: "Tech".to_string(),
            key_skills: vec!["Rust".to_string()],
            natural_posting: "text".to_string(),
            structured_data: serde_json::json!({}),
            created_at: chrono::Utc::now(),
        }
    }

    fn hit(id: &str, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: serde_json::json!(id),
            score,
            payload: None,
        }
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_with_upstream_error() {
        let index = StubIndex::new(Some("service unavailable"), Ok(vec![]));
        let err = index_posting_and_match(&index, &config(true), &posting(), &[0.1; 4])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Upstream {
                service: "qdrant",
                status: 503,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal_by_default() {
        let index = StubIndex::new(None, Err("timeout"));
        let row = posting();
        let result = index_posting_and_match(&index, &config(true), &row, &[0.1; 4]).await;
        assert!(matches!(result, Err(AppError::Upstream { .. })));
        // The upload already happened; nothing is rolled back.
        assert_eq!(*index.upserted_ids.lock().unwrap(), vec![row.id]);
    }

    #[tokio::test]
    async fn test_search_failure_degrades_to_empty_when_not_fatal() {
        let index = StubIndex::new(None, Err("timeout"));
        let matches = index_posting_and_match(&index, &config(false), &posting(), &[0.1; 4])
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_happy_path_upserts_posting_id_and_ranks_matches() {
        let index = StubIndex::new(None, Ok(vec![hit("a", 0.4), hit("b", 0.9), hit("c", 0.6)]));
        let row = posting();
        let matches = index_posting_and_match(&index, &config(true), &row, &[0.1; 4])
            .await
            .unwrap();
        assert_eq!(*index.upserted_ids.lock().unwrap(), vec![row.id]);
        let scores: Vec<f32> = matches.iter().map(|m| m.similarity_score).collect();
        assert_eq!(scores, vec![0.9, 0.6, 0.4]);
    }

    #[test]
    fn test_approve_request_deserializes_from_wire_shape() {
        let json = r#"{
            "natural_posting": "We are hiring.",
            "structured_data": "{\"title\":\"X\",\"skills\":\"Go,Rust\"}",
            "original_input": {
                "job_title": "X",
                "career_level": "Senior",
                "location": "Remote",
                "department": "Tech",
                "key_skills": ["Go", "Rust"]
            }
        }"#;
        let request: ApprovePostingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.original_input.job_title, "X");
        let structured: serde_json::Value =
            serde_json::from_str(&request.structured_data).unwrap();
        assert_eq!(structured["skills"], "Go,Rust");
    }
}
