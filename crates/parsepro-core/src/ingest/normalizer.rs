use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("Malformed structured response: {0}")]
    MalformedResponse(String),
}

pub type NormalizationResult<T> = Result<T, NormalizationError>;

/// Number of project slots every record carries, present or not.
pub const PROJECT_SLOTS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSlot {
    pub name: String,
    pub description: String,
}

/// The schema-complete output unit. Every field is always present so all
/// records share one shape for tabular export; absent projects are empty
/// name/description pairs, never omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub education: String,
    pub email: String,
    pub contact_no: String,
    pub cgpa: Option<f64>,
    pub skills: Vec<String>,
    pub certification: Vec<String>,
    pub projects: [ProjectSlot; PROJECT_SLOTS],
}

/// Parse a model reply into a [`CandidateRecord`].
///
/// Only structural corruption is fatal: a reply that is not JSON, or whose
/// top-level value is not an object, fails with `MalformedResponse`.
/// Wrongly-typed fields inside an otherwise valid object degrade to typed
/// defaults, since model output reliability is inherently loose.
pub fn normalize(raw: &str) -> NormalizationResult<CandidateRecord> {
    let body = strip_json_fences(raw);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| NormalizationError::MalformedResponse(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(NormalizationError::MalformedResponse(
            "top-level value is not an object".into(),
        ));
    };

    let mut record = CandidateRecord {
        name: string_field(&fields, "name"),
        education: string_field(&fields, "education"),
        email: string_field(&fields, "email"),
        contact_no: string_field(&fields, "contact_no"),
        cgpa: number_field(&fields, "cgpa"),
        skills: string_list(&fields, "skills"),
        certification: string_list(&fields, "certification"),
        projects: <[ProjectSlot; PROJECT_SLOTS]>::default(),
    };

    for (i, slot) in record.projects.iter_mut().enumerate() {
        let n = i + 1;
        if let Some(Value::Object(project)) = fields.get(&format!("project{n}")) {
            slot.name = string_field(project, "name");
            slot.description = string_field(project, "description");
        } else {
            // Already-flattened keys are honored so normalization is
            // idempotent on its own output schema.
            slot.name = string_field(&fields, &format!("project{n}_name"));
            slot.description = string_field(&fields, &format!("project{n}_description"));
        }
    }

    Ok(record)
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_list(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Strips ```json ... ``` or ``` ... ``` code fences models wrap JSON in.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map_or(stripped.trim_start(), str::trim)
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map_or(stripped.trim_start(), str::trim)
    } else {
        text
    }
}
