/*!
 * Input and output documents.
 *
 * The input is a JSON document listing steps, each with a `step_id` and a
 * list of sentences. A sentence is either a plain string or an object with
 * a `text` field. The output keeps the same shape (and any extra fields)
 * and enriches every step with its timed sentences and scene audio.
 */

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::consistency::ConsistencyReport;
use crate::errors::DocumentError;
use crate::timeline::{Sentence, TimedSentence};

/// Step fields written by the pipeline
const DERIVED_FIELDS: &[&str] = &["audio_file_scene", "duration_scene_seconds", "consistency"];

/// One step of the input document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputStep {
    pub step_id: String,
    #[serde(default)]
    pub sentences: Vec<Value>,
    /// Fields the pipeline does not interpret, copied to the output
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shape of the top-level document
#[derive(Debug, Clone)]
enum Layout {
    /// `{"steps": [...], ...}`
    Object(Map<String, Value>),
    /// `[...]`
    Array,
}

/// Parsed input document
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub steps: Vec<InputStep>,
    layout: Layout,
}

impl InputDocument {
    /// Parse a document from JSON text
    pub fn from_json(content: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    /// Parse a document from an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let (raw_steps, layout) = match value {
            Value::Array(items) => (items, Layout::Array),
            Value::Object(mut map) => match map.remove("steps") {
                Some(Value::Array(items)) => (items, Layout::Object(map)),
                Some(_) => {
                    return Err(DocumentError::Malformed("'steps' must be an array".to_string()));
                }
                None => {
                    return Err(DocumentError::Malformed("missing 'steps' array".to_string()));
                }
            },
            _ => {
                return Err(DocumentError::Malformed(
                    "expected an object with 'steps' or an array of steps".to_string(),
                ));
            }
        };

        let mut steps = Vec::with_capacity(raw_steps.len());
        let mut seen = HashSet::new();
        for (position, raw) in raw_steps.into_iter().enumerate() {
            let step = parse_step(position, raw)?;
            if !seen.insert(step.step_id.clone()) {
                return Err(DocumentError::DuplicateStepId(step.step_id));
            }
            steps.push(step);
        }

        Ok(Self { steps, layout })
    }

    /// Build the output document from the per-step results, in input order
    pub fn to_output(&self, results: Vec<OutputStep>) -> Value {
        let steps = Value::Array(
            results
                .into_iter()
                .map(|step| serde_json::to_value(step).unwrap_or(Value::Null))
                .collect(),
        );

        match &self.layout {
            Layout::Array => steps,
            Layout::Object(rest) => {
                let mut map = rest.clone();
                map.insert("steps".to_string(), steps);
                Value::Object(map)
            }
        }
    }
}

fn parse_step(position: usize, raw: Value) -> Result<InputStep, DocumentError> {
    let Value::Object(mut map) = raw else {
        return Err(DocumentError::Malformed(format!("step at position {} is not an object", position)));
    };

    // Numeric ids are common in hand-written documents
    let step_id = match map.remove("step_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(DocumentError::MissingStepId(position)),
    };

    let sentences = match map.remove("sentences") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            warn!("Step '{}' has non-array sentences ({}), treating as empty", step_id, type_name(&other));
            Vec::new()
        }
    };

    // Results of an earlier run are recomputed, never carried over
    for key in DERIVED_FIELDS {
        map.remove(*key);
    }

    Ok(InputStep {
        step_id,
        sentences,
        extra: map,
    })
}

/// Extract the sentences of a step.
///
/// Entries that are neither a string nor an object with a string `text`
/// field are skipped with a warning. Indices are assigned over the accepted
/// entries, so they stay contiguous from zero.
pub fn extract_sentences(step: &InputStep) -> Vec<Sentence> {
    let mut sentences = Vec::with_capacity(step.sentences.len());
    for (position, entry) in step.sentences.iter().enumerate() {
        let text = match entry {
            Value::String(text) => Some(text.clone()),
            Value::Object(fields) => fields.get("text").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };

        match text {
            Some(text) => sentences.push(Sentence::new(sentences.len(), text)),
            None => warn!(
                "Skipping malformed sentence at position {} in step '{}' ({})",
                position,
                step.step_id,
                type_name(entry)
            ),
        }
    }
    sentences
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object without text",
    }
}

/// One enriched step of the output document
#[derive(Debug, Clone, Serialize)]
pub struct OutputStep {
    pub step_id: String,
    pub sentences: Vec<TimedSentence>,
    pub audio_file_scene: String,
    pub duration_scene_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencyReport>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
