//! Promotion-prediction client.
//!
//! One batched call per approval: the full ordered list of employee
//! feature bags goes out, a same-length ordered list of probabilities
//! comes back. The caller owns the graceful-degradation policy; this
//! client just reports errors.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::models::employee::EmployeeFeatures;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    employees: &'a [EmployeeFeatures],
}

#[derive(Debug, Deserialize)]
struct PredictionEntry {
    probability: f64,
}

#[derive(Clone)]
pub struct PredictionClient {
    client: Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }

    /// Returns probabilities in the same order as the input batch.
    pub async fn predict(&self, employees: &[EmployeeFeatures]) -> Result<Vec<f64>, AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PredictionRequest { employees })
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "prediction",
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "prediction",
                status: status.as_u16(),
                body,
            });
        }

        let entries: Vec<PredictionEntry> = response.json().await.map_err(|e| {
            AppError::Format(format!("Prediction response had an unexpected shape: {e}"))
        })?;

        debug!("Prediction endpoint returned {} probabilities", entries.len());
        Ok(entries.into_iter().map(|e| e.probability).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_entries_parse_in_order() {
        let raw = r#"[{"probability": 0.8}, {"probability": 0.15}, {"probability": 0.6}]"#;
        let entries: Vec<PredictionEntry> = serde_json::from_str(raw).unwrap();
        let probs: Vec<f64> = entries.into_iter().map(|e| e.probability).collect();
        assert_eq!(probs, vec![0.8, 0.15, 0.6]);
    }

    #[test]
    fn test_prediction_entry_requires_probability() {
        let result: Result<Vec<PredictionEntry>, _> = serde_json::from_str(r#"[{"score": 0.8}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_serializes_employees_key() {
        let batch = vec![EmployeeFeatures {
            performance_rating: 4.0,
            years_at_company: 3.5,
            awards: 1,
            trainings_completed: 4,
            training_score: 77.0,
            kpis_met: true,
        }];
        let value = serde_json::to_value(PredictionRequest { employees: &batch }).unwrap();
        assert!(value["employees"].is_array());
        assert_eq!(value["employees"][0]["awards"], 1);
    }
}
