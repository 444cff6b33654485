//! Request bodies
//!
//! Bodies are parsed leniently: an unreadable body behaves like `{}`, so the
//! caller gets the same "Missing ..." 400 as for an empty one.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// JSON body that falls back to `T::default()` when it does not parse
pub struct LenientJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparseable request body: {}", e);
                T::default()
            }
        };
        Ok(Self(value))
    }
}

/// Fields shared by the database routes. Each route reads what it needs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbRequest {
    #[serde(alias = "connectionString")]
    pub conn_str: Option<String>,
    pub db: Option<String>,
    #[serde(alias = "collection")]
    pub coll: Option<String>,
    pub name: Option<String>,
    pub filter: Option<Value>,
    pub projection: Option<Value>,
    pub sort: Option<Value>,
    pub limit: Option<Value>,
    pub skip: Option<Value>,
    pub pipeline: Option<Value>,
    pub doc: Option<Value>,
    pub docs: Option<Value>,
    pub update: Option<Value>,
    pub upsert: Option<bool>,
    pub command: Option<Value>,
    pub keys: Option<Value>,
    pub options: Option<Value>,
    pub actions: Option<Vec<Value>>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl DbRequest {
    pub fn conn_str(&self) -> ApiResult<&str> {
        present(&self.conn_str).ok_or_else(|| ApiError::missing("connStr"))
    }

    pub fn db(&self) -> ApiResult<&str> {
        present(&self.db).ok_or_else(|| ApiError::missing("db"))
    }

    pub fn coll(&self) -> ApiResult<&str> {
        present(&self.coll).ok_or_else(|| ApiError::missing("collection"))
    }

    pub fn name(&self) -> ApiResult<&str> {
        present(&self.name).ok_or_else(|| ApiError::missing("name"))
    }

    /// Connection string, database and collection, all required
    pub fn target(&self) -> ApiResult<(&str, &str, &str)> {
        match (present(&self.conn_str), present(&self.db), present(&self.coll)) {
            (Some(conn_str), Some(db), Some(coll)) => Ok((conn_str, db, coll)),
            _ => Err(ApiError::missing("connStr, db or collection")),
        }
    }
}

/// Page size: a positive number (or numeric string), else `default`,
/// capped at `max`
pub fn clamp_limit(value: Option<&Value>, default: i64, max: i64) -> i64 {
    let requested = match value {
        Some(Value::Number(n)) => n.as_f64().map(|f| f as i64),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    };
    requested.filter(|n| *n > 0).unwrap_or(default).min(max)
}

/// Documents to skip; anything unusable means zero
pub fn skip_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aliases() {
        let req: DbRequest = serde_json::from_value(json!({
            "connectionString": "mongodb://localhost",
            "db": "shop",
            "collection": "orders"
        }))
        .unwrap();
        assert_eq!(req.target().unwrap(), ("mongodb://localhost", "shop", "orders"));

        let req: DbRequest =
            serde_json::from_value(json!({"connStr": "mongodb://h", "db": "d", "coll": "c"})).unwrap();
        assert_eq!(req.coll().unwrap(), "c");
    }

    #[test]
    fn test_empty_strings_are_missing() {
        let req: DbRequest = serde_json::from_value(json!({"connStr": "", "db": "d"})).unwrap();
        assert!(matches!(req.conn_str(), Err(ApiError::BadRequest(_))));
        assert!(req.target().is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 100, 5000), 100);
        assert_eq!(clamp_limit(Some(&json!(20)), 100, 5000), 20);
        assert_eq!(clamp_limit(Some(&json!("250")), 100, 5000), 250);
        assert_eq!(clamp_limit(Some(&json!(0)), 100, 5000), 100);
        assert_eq!(clamp_limit(Some(&json!(-3)), 100, 5000), 100);
        assert_eq!(clamp_limit(Some(&json!("abc")), 100, 5000), 100);
        assert_eq!(clamp_limit(Some(&json!(1e9)), 100, 5000), 5000);
    }

    #[test]
    fn test_skip_count() {
        assert_eq!(skip_count(Some(&json!(40))), 40);
        assert_eq!(skip_count(Some(&json!("7"))), 7);
        assert_eq!(skip_count(Some(&json!(-1))), 0);
        assert_eq!(skip_count(None), 0);
    }
}
