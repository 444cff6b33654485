use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{CoreError, Result};

/// A database operation proposed by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub db: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Stringified `_id` values of the documents this action touches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Find,
    Aggregate,
    InsertMany,
    UpdateMany,
    DeleteMany,
    Command,
}

impl ActionKind {
    /// Whether executing the action can modify data
    pub fn is_write(self) -> bool {
        !matches!(self, ActionKind::Find | ActionKind::Aggregate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Find => "find",
            ActionKind::Aggregate => "aggregate",
            ActionKind::InsertMany => "insertMany",
            ActionKind::UpdateMany => "updateMany",
            ActionKind::DeleteMany => "deleteMany",
            ActionKind::Command => "command",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AiAction {
    pub fn new(kind: ActionKind, db: impl Into<String>) -> Self {
        Self {
            kind,
            db: db.into(),
            collection: None,
            params: Value::Object(Default::default()),
            reason: None,
            ids: Vec::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// A parameter, treating `null` as absent
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).filter(|v| !v.is_null())
    }

    /// `params.filter`, or an empty filter
    pub fn filter(&self) -> Value {
        self.param("filter")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// `params.update`, or an empty update document
    pub fn update(&self) -> Value {
        self.param("update")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    pub fn upsert(&self) -> bool {
        self.param("upsert").and_then(Value::as_bool).unwrap_or(false)
    }

    /// `params.pipeline`, or an empty pipeline
    pub fn pipeline(&self) -> Value {
        self.param("pipeline")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    /// `params.docs`, or no documents
    pub fn docs(&self) -> Value {
        self.param("docs")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    /// Parse one action of a plan
    pub fn parse(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Check the action can run: write kinds are refused on a read-only
    /// server, and everything but `command` needs a collection. Returns the
    /// collection, if any.
    pub fn check(&self, read_only: bool) -> Result<Option<&str>> {
        if read_only && self.kind.is_write() {
            return Err(CoreError::WriteNotAllowed(self.kind));
        }
        let collection = self.collection.as_deref().filter(|c| !c.is_empty());
        if collection.is_none() && self.kind != ActionKind::Command {
            return Err(CoreError::MissingField("collection"));
        }
        Ok(collection)
    }

    /// `params.limit`, if given
    pub fn limit(&self) -> Option<&Value> {
        self.param("limit")
    }

    /// The command document: `params.command` when it is an object,
    /// otherwise `params` itself
    pub fn command(&self) -> Value {
        match self.param("command") {
            Some(command @ Value::Object(_)) => command.clone(),
            _ => self.params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_deserialization() {
        let action: AiAction = serde_json::from_value(json!({
            "type": "updateMany",
            "db": "shop",
            "collection": "orders",
            "params": {"filter": {"status": "new"}, "update": {"$set": {"status": "open"}}, "upsert": true},
            "reason": "normalize status"
        }))
        .unwrap();

        assert_eq!(action.kind, ActionKind::UpdateMany);
        assert_eq!(action.collection.as_deref(), Some("orders"));
        assert_eq!(action.filter(), json!({"status": "new"}));
        assert!(action.upsert());
        assert!(action.ids.is_empty());
    }

    #[test]
    fn test_missing_params_default() {
        let action: AiAction =
            serde_json::from_value(json!({"type": "aggregate", "db": "shop"})).unwrap();

        assert_eq!(action.pipeline(), json!([]));
        assert_eq!(action.filter(), json!({}));
        assert!(!action.upsert());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: std::result::Result<AiAction, _> =
            serde_json::from_value(json!({"type": "dropDatabase", "db": "shop"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_command_document() {
        let nested = AiAction::new(ActionKind::Command, "shop")
            .with_params(json!({"command": {"ping": 1}}));
        assert_eq!(nested.command(), json!({"ping": 1}));

        let bare = AiAction::new(ActionKind::Command, "shop").with_params(json!({"dbStats": 1}));
        assert_eq!(bare.command(), json!({"dbStats": 1}));
    }

    #[test]
    fn test_check() {
        let find = AiAction::new(ActionKind::Find, "shop").with_collection("orders");
        assert_eq!(find.check(true).unwrap(), Some("orders"));

        let delete = AiAction::new(ActionKind::DeleteMany, "shop").with_collection("orders");
        assert!(matches!(
            delete.check(true),
            Err(CoreError::WriteNotAllowed(ActionKind::DeleteMany))
        ));
        assert!(delete.check(false).is_ok());

        let no_collection = AiAction::new(ActionKind::Aggregate, "shop");
        assert!(matches!(
            no_collection.check(false),
            Err(CoreError::MissingField("collection"))
        ));

        let command = AiAction::new(ActionKind::Command, "shop");
        assert_eq!(command.check(false).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            AiAction::parse(json!({"type": "find"})),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(AiAction::parse(json!({"type": "find", "db": "shop"})).is_ok());
    }

    #[test]
    fn test_write_kinds() {
        assert!(!ActionKind::Find.is_write());
        assert!(!ActionKind::Aggregate.is_write());
        assert!(ActionKind::InsertMany.is_write());
        assert!(ActionKind::DeleteMany.is_write());
        assert!(ActionKind::Command.is_write());
        assert_eq!(ActionKind::InsertMany.to_string(), "insertMany");
    }
}
