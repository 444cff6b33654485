//! Database operations shared by the routes and the plan executor.
//! Every result leaves here already normalized.

use std::time::Duration;

use bson::{Bson, Document, doc};
use dbdesk_normalize::{ConversionError, DriverValue, json_to_document, json_to_documents, normalize_document, normalize_for_transport};
use futures_util::TryStreamExt;
use mongodb::options::UpdateModifications;
use mongodb::{Collection, Database};
use serde_json::{Value, json};

use crate::error::ApiResult;

pub struct FindArgs {
    pub filter: Document,
    pub projection: Document,
    pub sort: Document,
    pub skip: u64,
    pub limit: i64,
}

pub fn normalize_docs(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(normalize_document).collect())
}

pub fn normalize_bson(value: Bson) -> Value {
    normalize_for_transport(&DriverValue::from(value))
}

/// An update document, or an aggregation pipeline when given an array
pub fn parse_update(value: Value) -> Result<UpdateModifications, ConversionError> {
    if value.is_array() {
        Ok(UpdateModifications::Pipeline(json_to_documents(value, "update")?))
    } else {
        Ok(UpdateModifications::Document(json_to_document(value, "update")?))
    }
}

/// Index name the server would generate: `field_1_other_-1`
pub fn index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Bson::Int32(n) => n.to_string(),
                Bson::Int64(n) => n.to_string(),
                Bson::Double(f) if f.fract() == 0.0 => format!("{}", *f as i64),
                Bson::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}_{}", field, direction)
        })
        .collect::<Vec<_>>()
        .join("_")
}

pub async fn find(coll: &Collection<Document>, args: FindArgs, max_time: Duration) -> ApiResult<Value> {
    let mut action = coll.find(args.filter).limit(args.limit).max_time(max_time);
    if !args.projection.is_empty() {
        action = action.projection(args.projection);
    }
    if !args.sort.is_empty() {
        action = action.sort(args.sort);
    }
    if args.skip > 0 {
        action = action.skip(args.skip);
    }

    let docs: Vec<Document> = action.await?.try_collect().await?;
    Ok(normalize_docs(docs))
}

pub async fn count(coll: &Collection<Document>, filter: Document, max_time: Duration) -> ApiResult<u64> {
    Ok(coll.count_documents(filter).max_time(max_time).await?)
}

pub async fn aggregate(
    coll: &Collection<Document>,
    mut pipeline: Vec<Document>,
    limit: i64,
    max_time: Duration,
) -> ApiResult<Value> {
    pipeline.push(doc! { "$limit": limit });
    let docs: Vec<Document> = coll
        .aggregate(pipeline)
        .allow_disk_use(true)
        .max_time(max_time)
        .await?
        .try_collect()
        .await?;
    Ok(normalize_docs(docs))
}

pub async fn insert_one(coll: &Collection<Document>, document: Document) -> ApiResult<Value> {
    let result = coll.insert_one(document).await?;
    Ok(json!({ "insertedId": normalize_bson(result.inserted_id) }))
}

pub async fn insert_many(coll: &Collection<Document>, docs: Vec<Document>) -> ApiResult<Value> {
    let result = coll.insert_many(docs).ordered(false).await?;

    let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
    ids.sort_by_key(|(index, _)| *index);
    let inserted_count = ids.len();
    let inserted_ids: serde_json::Map<String, Value> = ids
        .into_iter()
        .map(|(index, id)| (index.to_string(), normalize_bson(id)))
        .collect();

    Ok(json!({ "insertedCount": inserted_count, "insertedIds": inserted_ids }))
}

pub async fn update(
    coll: &Collection<Document>,
    filter: Document,
    update: UpdateModifications,
    upsert: bool,
    many: bool,
) -> ApiResult<Value> {
    let result = if many {
        coll.update_many(filter, update).upsert(upsert).await?
    } else {
        coll.update_one(filter, update).upsert(upsert).await?
    };
    Ok(json!({
        "matchedCount": result.matched_count,
        "modifiedCount": result.modified_count,
        "upsertedId": result.upserted_id.map(normalize_bson),
    }))
}

pub async fn delete(coll: &Collection<Document>, filter: Document, many: bool) -> ApiResult<Value> {
    let result = if many {
        coll.delete_many(filter).await?
    } else {
        coll.delete_one(filter).await?
    };
    Ok(json!({ "deletedCount": result.deleted_count }))
}

pub async fn run_command(db: &Database, command: Document) -> ApiResult<Value> {
    Ok(normalize_document(db.run_command(command).await?))
}

/// Index specs as stored, via `listIndexes`
pub async fn list_indexes(db: &Database, coll: &str) -> ApiResult<Value> {
    let reply = db.run_command(doc! { "listIndexes": coll }).await?;
    let batch = reply
        .get_document("cursor")
        .ok()
        .and_then(|cursor| cursor.get_array("firstBatch").ok())
        .cloned()
        .unwrap_or_default();
    Ok(normalize_bson(Bson::Array(batch)))
}

pub async fn create_index(db: &Database, coll: &str, keys: Document, mut options: Document) -> ApiResult<String> {
    let name = match options.get_str("name") {
        Ok(name) => name.to_string(),
        Err(_) => index_name(&keys),
    };
    options.insert("key", keys);
    options.insert("name", name.clone());
    db.run_command(doc! { "createIndexes": coll, "indexes": [options] })
        .await?;
    Ok(name)
}

pub async fn drop_index(db: &Database, coll: &str, name: &str) -> ApiResult<Value> {
    run_command(db, doc! { "dropIndexes": coll, "index": name }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name() {
        assert_eq!(index_name(&doc! { "email": 1 }), "email_1");
        assert_eq!(
            index_name(&doc! { "status": 1_i64, "createdAt": -1.0 }),
            "status_1_createdAt_-1"
        );
        assert_eq!(index_name(&doc! { "body": "text" }), "body_text");
    }

    #[test]
    fn test_parse_update() {
        assert!(matches!(
            parse_update(json!({"$set": {"a": 1}})).unwrap(),
            UpdateModifications::Document(_)
        ));
        assert!(matches!(
            parse_update(json!([{"$set": {"a": 1}}])).unwrap(),
            UpdateModifications::Pipeline(p) if p.len() == 1
        ));
        assert!(parse_update(json!("nope")).is_err());
    }

    #[test]
    fn test_normalize_docs() {
        let docs = vec![doc! { "n": 1_i64 }, doc! { "n": 2 }];
        assert_eq!(normalize_docs(docs), json!([{"n": "1"}, {"n": 2}]));
    }
}
