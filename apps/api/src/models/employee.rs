//! Employee match model — derived per approval request from the employees
//! vector collection, never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vector_store::ScoredPoint;

/// Neutral probability used when the prediction endpoint is unconfigured,
/// fails, or returns a mismatched batch.
pub const DEFAULT_PROMOTION_PROBABILITY: f64 = 0.5;

/// One employee returned by the similarity query, enriched (when the
/// prediction endpoint cooperates) with a promotion probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeMatch {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub current_role: String,
    pub email: String,
    pub similarity_score: f32,
    pub performance_rating: f64,
    pub years_at_company: f64,
    pub awards: i64,
    pub trainings_completed: i64,
    pub training_score: f64,
    pub kpis_met: bool,
    pub promotion_probability: f64,
}

/// Feature subset sent to the prediction endpoint, one bag per employee.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeFeatures {
    pub performance_rating: f64,
    pub years_at_company: f64,
    pub awards: i64,
    pub trainings_completed: i64,
    pub training_score: f64,
    pub kpis_met: bool,
}

impl EmployeeMatch {
    /// Builds a match from a scored point. Absent payload fields are
    /// defaulted rather than treated as errors: unknown name, an email
    /// synthesized from the point id, zeroed feature fields.
    pub fn from_scored_point(point: &ScoredPoint) -> Self {
        let id = point.id_string();
        let payload = point.payload.as_ref();

        let email = payload
            .and_then(|p| str_field(p, "email"))
            .unwrap_or_else(|| format!("employee{id}@company.com"));

        EmployeeMatch {
            name: payload
                .and_then(|p| str_field(p, "name"))
                .unwrap_or_else(|| "Unknown".to_string()),
            department: payload
                .and_then(|p| str_field(p, "department"))
                .unwrap_or_else(|| "General".to_string()),
            current_role: payload
                .and_then(|p| str_field(p, "current_role"))
                .unwrap_or_else(|| "Unknown".to_string()),
            email,
            similarity_score: point.score,
            performance_rating: payload.map(|p| f64_field(p, "performance_rating")).unwrap_or(0.0),
            years_at_company: payload.map(|p| f64_field(p, "years_at_company")).unwrap_or(0.0),
            awards: payload.map(|p| i64_field(p, "awards")).unwrap_or(0),
            trainings_completed: payload
                .map(|p| i64_field(p, "trainings_completed"))
                .unwrap_or(0),
            training_score: payload.map(|p| f64_field(p, "training_score")).unwrap_or(0.0),
            kpis_met: payload
                .and_then(|p| p.get("kpis_met"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            promotion_probability: DEFAULT_PROMOTION_PROBABILITY,
            employee_id: id,
        }
    }

    /// Feature bag for the prediction request.
    pub fn features(&self) -> EmployeeFeatures {
        EmployeeFeatures {
            performance_rating: self.performance_rating,
            years_at_company: self.years_at_company,
            awards: self.awards,
            trainings_completed: self.trainings_completed,
            training_score: self.training_score,
            kpis_met: self.kpis_met,
        }
    }
}

fn str_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn f64_field(payload: &Value, key: &str) -> f64 {
    payload.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn i64_field(payload: &Value, key: &str) -> i64 {
    payload.get(key).and_then(Value::as_i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: Value, score: f32, payload: Option<Value>) -> ScoredPoint {
        ScoredPoint { id, score, payload }
    }

    #[test]
    fn test_full_payload_maps_all_fields() {
        let p = point(
            json!("e-42"),
            0.91,
            Some(json!({
                "name": "Dana Voss",
                "department": "Engineering",
                "current_role": "Staff Engineer",
                "email": "dana@corp.example",
                "performance_rating": 4.5,
                "years_at_company": 6.0,
                "awards": 3,
                "trainings_completed": 12,
                "training_score": 88.5,
                "kpis_met": true
            })),
        );
        let m = EmployeeMatch::from_scored_point(&p);
        assert_eq!(m.employee_id, "e-42");
        assert_eq!(m.name, "Dana Voss");
        assert_eq!(m.email, "dana@corp.example");
        assert!((m.similarity_score - 0.91).abs() < f32::EPSILON);
        assert_eq!(m.awards, 3);
        assert!(m.kpis_met);
        assert!((m.promotion_probability - DEFAULT_PROMOTION_PROBABILITY).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_payload_fields_are_defaulted() {
        let p = point(json!(17), 0.5, Some(json!({})));
        let m = EmployeeMatch::from_scored_point(&p);
        assert_eq!(m.name, "Unknown");
        assert_eq!(m.email, "employee17@company.com");
        assert_eq!(m.department, "General");
        assert_eq!(m.performance_rating, 0.0);
        assert_eq!(m.awards, 0);
        assert!(!m.kpis_met);
    }

    #[test]
    fn test_absent_payload_is_tolerated() {
        let p = point(json!("abc"), 0.3, None);
        let m = EmployeeMatch::from_scored_point(&p);
        assert_eq!(m.employee_id, "abc");
        assert_eq!(m.email, "employeeabc@company.com");
    }

    #[test]
    fn test_blank_name_falls_back_to_unknown() {
        let p = point(json!(1), 0.7, Some(json!({"name": "   "})));
        let m = EmployeeMatch::from_scored_point(&p);
        assert_eq!(m.name, "Unknown");
    }
}
