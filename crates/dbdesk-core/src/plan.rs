//! Plan extraction from assistant output
//!
//! The assistant answers in free text and may append a fenced block headed by
//! [`PLAN_MARKER`] containing `{"actions": [...]}`. The block can arrive in
//! pieces while the response streams, so extraction is retried on the whole
//! buffer and simply yields `None` until the block is complete.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::AiAction;

/// Heading the assistant puts in front of its JSON plan
pub const PLAN_MARKER: &str = "AI_PLAN";

const MAX_AFFECTED_IDS: usize = 50;

lazy_static! {
    static ref PLAN_BLOCK: Regex =
        Regex::new(r"(?is)AI_PLAN.*?```json\s*(.*?)```").expect("plan block pattern");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiPlan {
    pub actions: Vec<AiAction>,
}

impl AiPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether any action can modify data
    pub fn has_writes(&self) -> bool {
        self.actions.iter().any(|a| a.kind.is_write())
    }
}

/// Extract the proposed plan from (possibly partial) assistant output.
///
/// Actions that do not parse are skipped; a block whose `actions` is not an
/// array yields `None`.
pub fn extract_plan(text: &str) -> Option<AiPlan> {
    let body = PLAN_BLOCK.captures(text)?.get(1)?.as_str();
    let parsed: Value = serde_json::from_str(body.trim()).ok()?;
    let raw_actions = parsed.get("actions")?.as_array()?;

    let actions = raw_actions
        .iter()
        .filter_map(|a| serde_json::from_value::<AiAction>(a.clone()).ok())
        .collect();

    Some(AiPlan { actions })
}

/// Collect the document ids a plan touches, in first-seen order.
///
/// Sources: explicit `ids`, `_id`/`id` of inserted `params.docs`, and a
/// `params.filter._id` that is either a plain value or an `$in` list.
pub fn affected_ids(actions: &[AiAction]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: String| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };

    for action in actions {
        for id in action.ids.iter().filter(|id| !id.is_empty()) {
            push(id.clone());
        }

        if let Some(docs) = action.params.get("docs").and_then(Value::as_array) {
            for doc in docs {
                let id = doc.get("_id").filter(|v| !v.is_null()).or_else(|| doc.get("id"));
                if let Some(id) = id.and_then(id_to_string) {
                    push(id);
                }
            }
        }

        if let Some(filter_id) = action.params.get("filter").and_then(|f| f.get("_id")) {
            match filter_id {
                Value::String(s) if !s.is_empty() => push(s.clone()),
                Value::Object(map) => {
                    if let Some(list) = map.get("$in").and_then(Value::as_array) {
                        for id in list.iter().filter_map(id_to_string) {
                            push(id);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    ids.truncate(MAX_AFFECTED_IDS);
    ids
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => match map.get("$oid").and_then(Value::as_str) {
            Some(oid) => Some(oid.to_string()),
            None => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}
