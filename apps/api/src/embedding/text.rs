//! Embedding-text synthesis and department extraction.
//!
//! Both functions are pure: same input, byte-identical output. The
//! synthesized string is what gets embedded and uploaded alongside a
//! posting, so any change here silently shifts every similarity score.

use serde_json::Value;

/// Fallback department when the category string yields nothing.
pub const DEFAULT_DEPARTMENT: &str = "General";

const FIELD_LABELS: &[(&str, &str)] = &[
    ("title", "Job Title"),
    ("job_type", "Job Type"),
    ("work_setting", "Work Setting"),
    ("location", "Location"),
    ("experience", "Experience"),
    ("career_level", "Career Level"),
    ("education", "Education"),
    ("categories", "Categories"),
];

/// Renders the structured fields plus the natural-language text into one
/// embedding input: a labeled field block, the description, and the
/// description repeated under a "Requirements" label.
pub fn build_embedding_text(structured: &Value, natural_posting: &str) -> String {
    let mut lines = Vec::with_capacity(FIELD_LABELS.len() + 1);
    for (key, label) in FIELD_LABELS {
        lines.push(format!("{label}: {}", field_as_text(structured, key)));
    }
    lines.push(format!("Skills: {}", skills_as_text(structured)));

    format!(
        "{}\n\nDescription:\n{}\n\nRequirements:\n{}",
        lines.join("\n"),
        natural_posting.trim(),
        natural_posting.trim()
    )
}

/// Splits a free-text category string into department keywords.
/// Normalizes `" - "`, `" / "`, `"/"` and `"-"` to one delimiter, trims
/// each segment, drops empties. Total: never fails, never returns an
/// empty list. The first element is the primary department.
pub fn extract_departments(category: &str) -> Vec<String> {
    let normalized = category
        .replace(" - ", "|")
        .replace(" / ", "|")
        .replace('/', "|")
        .replace('-', "|");

    let parts: Vec<String> = normalized
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if parts.is_empty() {
        vec![DEFAULT_DEPARTMENT.to_string()]
    } else {
        parts
    }
}

fn field_as_text(structured: &Value, key: &str) -> String {
    match structured.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Array(items)) => {
            let joined = join_string_items(items);
            if joined.is_empty() {
                "Not specified".to_string()
            } else {
                joined
            }
        }
        Some(Value::Number(n)) => n.to_string(),
        _ => "Not specified".to_string(),
    }
}

/// Skills arrive either as a comma-separated string or a JSON array;
/// both normalize to one comma-joined string.
fn skills_as_text(structured: &Value) -> String {
    match structured.get("skills") {
        Some(Value::String(s)) if !s.trim().is_empty() => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Array(items)) => {
            let joined = join_string_items(items);
            if joined.is_empty() {
                "Not specified".to_string()
            } else {
                joined
            }
        }
        _ => "Not specified".to_string(),
    }
}

fn join_string_items(items: &[Value]) -> String {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_synthesis_is_deterministic() {
        let structured = json!({
            "title": "Backend Engineer",
            "job_type": "Full-time",
            "location": "Berlin",
            "skills": "Go,Rust"
        });
        let a = build_embedding_text(&structured, "We are hiring.");
        let b = build_embedding_text(&structured, "We are hiring.");
        assert_eq!(a, b);
    }

    #[test]
    fn test_synthesis_contains_labeled_fields_and_repeated_description() {
        let structured = json!({"title": "X", "skills": "Go,Rust"});
        let out = build_embedding_text(&structured, "Build services.");
        assert!(out.contains("Job Title: X"));
        assert!(out.contains("Skills: Go, Rust"));
        assert!(out.contains("Description:\nBuild services."));
        assert!(out.contains("Requirements:\nBuild services."));
    }

    #[test]
    fn test_skills_string_and_array_normalize_identically() {
        let from_string = build_embedding_text(&json!({"skills": "Go, Rust ,SQL"}), "d");
        let from_array = build_embedding_text(&json!({"skills": ["Go", "Rust", "SQL"]}), "d");
        assert_eq!(from_string, from_array);
    }

    #[test]
    fn test_missing_fields_render_as_not_specified() {
        let out = build_embedding_text(&json!({}), "d");
        assert!(out.contains("Job Title: Not specified"));
        assert!(out.contains("Skills: Not specified"));
    }

    #[test]
    fn test_categories_array_is_joined() {
        let out = build_embedding_text(&json!({"categories": ["Tech", "Software"]}), "d");
        assert!(out.contains("Categories: Tech, Software"));
    }

    #[test]
    fn test_departments_mixed_separators() {
        assert_eq!(
            extract_departments("Tech - Software / Engineering"),
            vec!["Tech", "Software", "Engineering"]
        );
    }

    #[test]
    fn test_departments_plain_slash_and_dash() {
        assert_eq!(extract_departments("HR/People-Ops"), vec!["HR", "People", "Ops"]);
    }

    #[test]
    fn test_departments_empty_input_falls_back() {
        assert_eq!(extract_departments(""), vec![DEFAULT_DEPARTMENT]);
        assert_eq!(extract_departments("   "), vec![DEFAULT_DEPARTMENT]);
        assert_eq!(extract_departments(" - / - "), vec![DEFAULT_DEPARTMENT]);
    }

    #[test]
    fn test_departments_single_segment_passthrough() {
        assert_eq!(extract_departments("Finance"), vec!["Finance"]);
    }
}
