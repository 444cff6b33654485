//! Execution of an assistant-proposed plan
//!
//! Actions run in order against one connection. A failing action is reported
//! in its result slot and does not stop the ones after it.

use axum::Json;
use axum::extract::State;
use bson::Document;
use dbdesk_core::{ActionKind, AiAction, affected_ids};
use dbdesk_normalize::{json_to_document, json_to_documents};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::ops::{self, FindArgs};
use crate::request::{DbRequest, LenientJson, clamp_limit};
use crate::server::AppState;

fn param_document(action: &AiAction, name: &'static str) -> ApiResult<Document> {
    let value = action.param(name).cloned().unwrap_or(Value::Null);
    Ok(json_to_document(value, name)?)
}

async fn run_action(state: &AppState, conn_str: &str, action: &AiAction) -> ApiResult<Value> {
    let collection = action.check(state.read_only)?.unwrap_or_default();
    let database = state.database(conn_str, &action.db).await?;
    let coll = database.collection::<Document>(collection);
    let limits = &state.mongo.limits;
    let max_time = state.mongo.max_time();

    info!("Executing {} on {}.{}", action.kind, action.db, collection);
    match action.kind {
        ActionKind::Find => {
            let args = FindArgs {
                filter: json_to_document(action.filter(), "filter")?,
                projection: param_document(action, "projection")?,
                sort: param_document(action, "sort")?,
                skip: 0,
                limit: clamp_limit(action.limit(), limits.find_default, limits.find_max),
            };
            Ok(json!({ "docs": ops::find(&coll, args, max_time).await? }))
        }
        ActionKind::Aggregate => {
            let pipeline = json_to_documents(action.pipeline(), "pipeline")?;
            let limit = clamp_limit(action.limit(), limits.aggregate_default, limits.aggregate_max);
            Ok(json!({ "docs": ops::aggregate(&coll, pipeline, limit, max_time).await? }))
        }
        ActionKind::InsertMany => {
            let docs = json_to_documents(action.docs(), "docs")?;
            if docs.len() > limits.insert_many_max {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Too many documents (max {})",
                    limits.insert_many_max
                )));
            }
            ops::insert_many(&coll, docs).await
        }
        ActionKind::UpdateMany => {
            let filter = json_to_document(action.filter(), "filter")?;
            let update = ops::parse_update(action.update())?;
            ops::update(&coll, filter, update, action.upsert(), true).await
        }
        ActionKind::DeleteMany => {
            let filter = json_to_document(action.filter(), "filter")?;
            ops::delete(&coll, filter, true).await
        }
        ActionKind::Command => {
            let command = json_to_document(action.command(), "command")?;
            ops::run_command(&database, command).await
        }
    }
}

fn outcome(index: usize, action: Option<&AiAction>, result: ApiResult<Value>) -> Value {
    let mut entry = json!({
        "index": index,
        "type": action.map(|a| a.kind.as_str()),
        "db": action.map(|a| a.db.as_str()),
        "collection": action.and_then(|a| a.collection.as_deref()),
    });
    match result {
        Ok(value) => {
            entry["ok"] = json!(true);
            entry["result"] = value;
        }
        Err(e) => {
            warn!("Plan action {} failed: {}", index, e);
            entry["ok"] = json!(false);
            entry["error"] = json!(e.to_string());
        }
    }
    entry
}

/// POST /api/plan/execute
pub async fn execute_plan(
    State(state): State<AppState>,
    LenientJson(mut req): LenientJson<DbRequest>,
) -> ApiResult<Json<Value>> {
    let raw_actions = req.actions.take().ok_or_else(|| ApiError::missing("actions"))?;
    let conn_str = req.conn_str()?;

    let mut actions = Vec::with_capacity(raw_actions.len());
    let mut results = Vec::with_capacity(raw_actions.len());
    for (index, raw) in raw_actions.into_iter().enumerate() {
        match AiAction::parse(raw) {
            Ok(action) => {
                let result = run_action(&state, conn_str, &action).await;
                results.push(outcome(index, Some(&action), result));
                actions.push(action);
            }
            Err(e) => results.push(outcome(index, None, Err(e.into()))),
        }
    }

    Ok(Json(json!({
        "results": results,
        "affectedIds": affected_ids(&actions),
    })))
}
