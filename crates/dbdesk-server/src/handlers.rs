//! Database route handlers

use axum::Json;
use axum::extract::State;
use bson::{Document, doc};
use dbdesk_normalize::{json_to_document, json_to_documents, promote_object_id};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::ops::{self, FindArgs};
use crate::request::{DbRequest, LenientJson, clamp_limit, skip_count};
use crate::server::AppState;

type Body = LenientJson<DbRequest>;

const SYSTEM_DATABASES: [&str; 3] = ["admin", "config", "local"];

fn document(value: Option<Value>, field: &'static str) -> ApiResult<Document> {
    Ok(json_to_document(value.unwrap_or(Value::Null), field)?)
}

/// POST /api/databases
pub async fn list_databases(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    let conn_str = req.conn_str()?;
    let client = state.pool.client(conn_str).await?;

    let mut databases: Vec<String> = client
        .list_database_names()
        .await?
        .into_iter()
        .filter(|name| !SYSTEM_DATABASES.contains(&name.as_str()))
        .collect();
    databases.sort();

    Ok(Json(json!({ "databases": databases })))
}

/// POST /api/databases/drop
pub async fn drop_database(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let (conn_str, db) = (req.conn_str()?, req.db()?);

    state.database(conn_str, db).await?.drop().await?;
    info!("Dropped database {}", db);

    Ok(Json(json!({
        "success": true,
        "message": format!("Database '{}' dropped.", db),
    })))
}

/// POST /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    let (conn_str, db) = (req.conn_str()?, req.db()?);

    let mut collections = state.database(conn_str, db).await?.list_collection_names().await?;
    collections.sort();

    Ok(Json(json!({ "collections": collections })))
}

/// POST /api/collections/create
pub async fn create_collection(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let (conn_str, db, name) = (req.conn_str()?, req.db()?, req.name()?);

    state.database(conn_str, db).await?.create_collection(name).await?;
    info!("Created collection {}.{}", db, name);

    Ok(Json(json!({
        "success": true,
        "message": format!("Collection '{}' created.", name),
    })))
}

/// POST /api/collections/drop
pub async fn drop_collection(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let (conn_str, db, coll) = req.target()?;

    state.collection(conn_str, db, coll).await?.drop().await?;
    info!("Dropped collection {}.{}", db, coll);

    Ok(Json(json!({
        "success": true,
        "message": format!("Collection '{}' dropped.", coll),
    })))
}

/// POST /api/find
pub async fn find(State(state): State<AppState>, LenientJson(mut req): Body) -> ApiResult<Json<Value>> {
    let limits = &state.mongo.limits;
    let args = FindArgs {
        filter: document(req.filter.take(), "filter")?,
        projection: document(req.projection.take(), "projection")?,
        sort: document(req.sort.take(), "sort")?,
        skip: skip_count(req.skip.as_ref()),
        limit: clamp_limit(req.limit.as_ref(), limits.find_default, limits.find_max),
    };
    let (conn_str, db, coll) = req.target()?;

    let coll = state.collection(conn_str, db, coll).await?;
    let docs = ops::find(&coll, args, state.mongo.max_time()).await?;

    Ok(Json(json!({ "docs": docs })))
}

/// POST /api/count
pub async fn count(State(state): State<AppState>, LenientJson(mut req): Body) -> ApiResult<Json<Value>> {
    let filter = document(req.filter.take(), "filter")?;
    let (conn_str, db, coll) = req.target()?;

    let coll = state.collection(conn_str, db, coll).await?;
    let count = ops::count(&coll, filter, state.mongo.max_time()).await?;

    Ok(Json(json!({ "count": count })))
}

/// POST /api/aggregate
pub async fn aggregate(
    State(state): State<AppState>,
    LenientJson(mut req): Body,
) -> ApiResult<Json<Value>> {
    let pipeline = req.pipeline.take();
    let (conn_str, db, coll) = req.target()?;
    let pipeline = match pipeline {
        None | Some(Value::Null) => Vec::new(),
        Some(value @ Value::Array(_)) => json_to_documents(value, "pipeline")?,
        Some(_) => return Err(ApiError::BadRequest("pipeline must be an array".to_string())),
    };
    let limits = &state.mongo.limits;
    let limit = clamp_limit(req.limit.as_ref(), limits.aggregate_default, limits.aggregate_max);

    let coll = state.collection(conn_str, db, coll).await?;
    let docs = ops::aggregate(&coll, pipeline, limit, state.mongo.max_time()).await?;

    Ok(Json(json!({ "docs": docs })))
}

/// POST /api/insertOne
pub async fn insert_one(
    State(state): State<AppState>,
    LenientJson(mut req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let document = match req.doc.take() {
        Some(value @ Value::Object(_)) => json_to_document(value, "doc")?,
        _ => return Err(ApiError::missing("doc")),
    };
    let (conn_str, db, coll) = req.target()?;

    let coll = state.collection(conn_str, db, coll).await?;
    Ok(Json(ops::insert_one(&coll, document).await?))
}

/// POST /api/insertMany
pub async fn insert_many(
    State(state): State<AppState>,
    LenientJson(mut req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let docs = req.docs.take();
    let (conn_str, db, coll) = req.target()?;
    let docs = match docs {
        Some(value @ Value::Array(_)) => value,
        _ => return Err(ApiError::missing("docs")),
    };

    let max = state.mongo.limits.insert_many_max;
    let len = docs.as_array().map_or(0, Vec::len);
    if len > max {
        return Err(ApiError::PayloadTooLarge(format!("Too many documents (max {})", max)));
    }
    let docs = json_to_documents(docs, "docs")?;

    let coll = state.collection(conn_str, db, coll).await?;
    let result = ops::insert_many(&coll, docs).await?;
    debug!("Inserted {} documents into {}.{}", len, db, coll.name());

    Ok(Json(result))
}

async fn update(state: AppState, mut req: DbRequest, many: bool) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let mut filter = document(req.filter.take(), "filter")?;
    if !many {
        promote_object_id(&mut filter);
    }
    let update = ops::parse_update(req.update.take().unwrap_or(Value::Null))?;
    let upsert = req.upsert.unwrap_or(false);
    let (conn_str, db, coll) = req.target()?;

    let coll = state.collection(conn_str, db, coll).await?;
    Ok(Json(ops::update(&coll, filter, update, upsert, many).await?))
}

/// POST /api/updateOne
pub async fn update_one(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    update(state, req, false).await
}

/// POST /api/updateMany
pub async fn update_many(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    update(state, req, true).await
}

async fn delete(state: AppState, mut req: DbRequest, many: bool) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let mut filter = document(req.filter.take(), "filter")?;
    if !many {
        promote_object_id(&mut filter);
    }
    let (conn_str, db, coll) = req.target()?;

    let coll = state.collection(conn_str, db, coll).await?;
    Ok(Json(ops::delete(&coll, filter, many).await?))
}

/// POST /api/deleteOne
pub async fn delete_one(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    delete(state, req, false).await
}

/// POST /api/deleteMany
pub async fn delete_many(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    delete(state, req, true).await
}

/// POST /api/command
pub async fn command(
    State(state): State<AppState>,
    LenientJson(mut req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let command = document(req.command.take(), "command")?;
    let (conn_str, db) = (req.conn_str()?, req.db()?);

    let database = state.database(conn_str, db).await?;
    Ok(Json(ops::run_command(&database, command).await?))
}

/// POST /api/indexes/list
pub async fn list_indexes(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    let (conn_str, db, coll) = req.target()?;

    let database = state.database(conn_str, db).await?;
    let indexes = ops::list_indexes(&database, coll).await?;

    Ok(Json(json!({ "indexes": indexes })))
}

/// POST /api/indexes/create
pub async fn create_index(
    State(state): State<AppState>,
    LenientJson(mut req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let keys = match req.keys.take() {
        Some(value @ Value::Object(_)) => json_to_document(value, "keys")?,
        _ => return Err(ApiError::BadRequest("keys object required".to_string())),
    };
    let options = document(req.options.take(), "options")?;
    let (conn_str, db, coll) = req.target()?;

    let database = state.database(conn_str, db).await?;
    let name = ops::create_index(&database, coll, keys, options).await?;
    info!("Created index {} on {}.{}", name, db, coll);

    Ok(Json(json!({ "name": name })))
}

/// POST /api/indexes/drop
pub async fn drop_index(
    State(state): State<AppState>,
    LenientJson(req): Body,
) -> ApiResult<Json<Value>> {
    state.ensure_writable()?;
    let (conn_str, db, coll) = req.target()?;
    let name = req.name()?;

    let database = state.database(conn_str, db).await?;
    let reply = ops::drop_index(&database, coll, name).await?;
    info!("Dropped index {} on {}.{}", name, db, coll);

    Ok(Json(json!({ "ok": reply })))
}

/// POST /api/dbStats
pub async fn db_stats(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    let (conn_str, db) = (req.conn_str()?, req.db()?);

    let database = state.database(conn_str, db).await?;
    Ok(Json(
        ops::run_command(&database, doc! { "dbStats": 1, "scale": 1 }).await?,
    ))
}

/// POST /api/collStats
pub async fn coll_stats(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    let (conn_str, db, coll) = req.target()?;

    let database = state.database(conn_str, db).await?;
    Ok(Json(
        ops::run_command(&database, doc! { "collStats": coll, "scale": 1 }).await?,
    ))
}

/// POST /api/serverInfo
pub async fn server_info(State(state): State<AppState>, LenientJson(req): Body) -> ApiResult<Json<Value>> {
    let conn_str = req.conn_str()?;

    let admin = state.database(conn_str, "admin").await?;
    let build_info = ops::run_command(&admin, doc! { "buildInfo": 1 }).await?;
    // hello may be restricted for this user
    let hello = match ops::run_command(&admin, doc! { "hello": 1 }).await {
        Ok(reply) => reply,
        Err(e) => {
            debug!("hello unavailable: {}", e);
            json!({})
        }
    };

    Ok(Json(json!({ "buildInfo": build_info, "hello": hello })))
}
