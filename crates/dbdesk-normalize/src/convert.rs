//! Conversion between driver BSON and [`DriverValue`], and parsing of
//! inbound Extended JSON

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document, oid::ObjectId, spec::BinarySubtype};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::value::{DriverValue, OpaqueValue, Wrapper};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("invalid extended JSON: {0}")]
    ExtendedJson(String),

    #[error("{0} must be an object")]
    NotADocument(&'static str),

    #[error("{0} must be an array of objects")]
    NotADocumentList(&'static str),
}

/// A BSON value outside the normalization table (regular expressions,
/// JavaScript code, min/max keys, DB pointers). Its JSON form is relaxed
/// Extended JSON.
#[derive(Debug, Clone)]
pub struct ExtendedJson(pub Bson);

impl fmt::Display for ExtendedJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OpaqueValue for ExtendedJson {
    fn to_json(&self) -> Option<Value> {
        Some(self.0.clone().into_relaxed_extjson())
    }
}

impl From<Bson> for DriverValue {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Null => DriverValue::Null,
            Bson::Undefined => DriverValue::Undefined,
            Bson::Boolean(b) => DriverValue::Bool(b),
            Bson::String(s) | Bson::Symbol(s) => DriverValue::String(s),
            Bson::Double(f) => Wrapper::Double(f).into(),
            Bson::Int32(n) => Wrapper::Int32(n).into(),
            Bson::Int64(n) => Wrapper::Long(n).into(),
            Bson::Decimal128(d) => Wrapper::Decimal128(d).into(),
            Bson::ObjectId(oid) => Wrapper::ObjectId(oid).into(),
            Bson::Timestamp(ts) => Wrapper::Timestamp(ts).into(),
            Bson::Binary(bin) => {
                if bin.subtype == BinarySubtype::Uuid {
                    if let Ok(bytes) = <[u8; 16]>::try_from(bin.bytes.as_slice()) {
                        return Wrapper::Uuid(bson::Uuid::from_bytes(bytes)).into();
                    }
                }
                Wrapper::Binary(bin).into()
            }
            Bson::DateTime(dt) => {
                let nanos = i128::from(dt.timestamp_millis()) * 1_000_000;
                match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
                    Ok(date) => DriverValue::Date(date),
                    Err(_) => DriverValue::Opaque(Arc::new(ExtendedJson(Bson::DateTime(dt)))),
                }
            }
            Bson::Array(items) => {
                DriverValue::Array(items.into_iter().map(DriverValue::from).collect())
            }
            Bson::Document(doc) => doc.into(),
            other => DriverValue::Opaque(Arc::new(ExtendedJson(other))),
        }
    }
}

impl From<Document> for DriverValue {
    fn from(doc: Document) -> Self {
        DriverValue::Document(
            doc.into_iter()
                .map(|(key, value)| (key, DriverValue::from(value)))
                .collect(),
        )
    }
}

/// Parse Extended JSON (`{"$oid": ...}`, `{"$date": ...}`) into BSON
pub fn json_to_bson(value: Value) -> Result<Bson, ConversionError> {
    Bson::try_from(value).map_err(|e| ConversionError::ExtendedJson(e.to_string()))
}

/// Parse a JSON object into a document. `null` yields an empty document.
pub fn json_to_document(value: Value, field: &'static str) -> Result<Document, ConversionError> {
    if value.is_null() {
        return Ok(Document::new());
    }
    match json_to_bson(value)? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(ConversionError::NotADocument(field)),
    }
}

/// Parse a JSON array of objects into documents
pub fn json_to_documents(
    value: Value,
    field: &'static str,
) -> Result<Vec<Document>, ConversionError> {
    let Value::Array(items) = value else {
        return Err(ConversionError::NotADocumentList(field));
    };
    items
        .into_iter()
        .map(|item| match json_to_bson(item)? {
            Bson::Document(doc) => Ok(doc),
            _ => Err(ConversionError::NotADocumentList(field)),
        })
        .collect()
}

/// Turn a 24-hex-digit string `_id` into an object id, so filters built
/// from normalized output match the stored documents
pub fn promote_object_id(filter: &mut Document) {
    let promoted = match filter.get("_id") {
        Some(Bson::String(s)) => ObjectId::parse_str(s).ok(),
        _ => None,
    };
    if let Some(oid) = promoted {
        filter.insert("_id", oid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{normalize_document, normalize_for_transport};
    use bson::{Binary, Regex, doc};
    use serde_json::json;

    #[test]
    fn test_document_round_trip_through_table() {
        let oid = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
        let document = doc! {
            "_id": oid,
            "count": 3_i32,
            "views": 9_007_199_254_740_993_i64,
            "ratio": 0.5,
            "at": bson::DateTime::from_millis(1_704_164_645_678),
            "raw": Binary { subtype: BinarySubtype::Generic, bytes: vec![0, 1, 2] },
            "gone": Bson::Undefined,
        };

        assert_eq!(
            normalize_document(document),
            json!({
                "_id": "65a1b2c3d4e5f60718293a4b",
                "count": 3,
                "views": "9007199254740993",
                "ratio": 0.5,
                "at": "2024-01-02T03:04:05.678Z",
                "raw": "AAEC",
            })
        );
    }

    #[test]
    fn test_uuid_binary_subtype() {
        let bytes = vec![0x11; 16];
        let value = DriverValue::from(Bson::Binary(Binary { subtype: BinarySubtype::Uuid, bytes }));
        assert_eq!(
            normalize_for_transport(&value),
            json!("11111111-1111-1111-1111-111111111111")
        );
    }

    #[test]
    fn test_unlisted_types_use_extended_json() {
        let regex = Bson::RegularExpression(Regex {
            pattern: "^a".to_string(),
            options: "i".to_string(),
        });
        let out = normalize_for_transport(&DriverValue::from(regex));
        assert_eq!(out, json!({"$regularExpression": {"pattern": "^a", "options": "i"}}));

        let out = normalize_for_transport(&DriverValue::from(Bson::MaxKey));
        assert_eq!(out, json!({"$maxKey": 1}));
    }

    #[test]
    fn test_json_to_document_parses_extended_json() {
        let doc = json_to_document(
            json!({"_id": {"$oid": "65a1b2c3d4e5f60718293a4b"}, "n": 1}),
            "filter",
        )
        .unwrap();
        assert!(matches!(doc.get("_id"), Some(Bson::ObjectId(_))));

        assert!(json_to_document(json!(null), "filter").unwrap().is_empty());
        assert!(matches!(
            json_to_document(json!([1]), "filter"),
            Err(ConversionError::NotADocument("filter"))
        ));
    }

    #[test]
    fn test_json_to_documents() {
        let docs = json_to_documents(json!([{"a": 1}, {"b": 2}]), "docs").unwrap();
        assert_eq!(docs.len(), 2);

        assert!(json_to_documents(json!({"a": 1}), "docs").is_err());
        assert!(json_to_documents(json!([{"a": 1}, 2]), "docs").is_err());
    }

    #[test]
    fn test_promote_object_id() {
        let mut filter = doc! { "_id": "65a1b2c3d4e5f60718293a4b" };
        promote_object_id(&mut filter);
        assert!(matches!(filter.get("_id"), Some(Bson::ObjectId(_))));

        let mut filter = doc! { "_id": "not-an-oid" };
        promote_object_id(&mut filter);
        assert_eq!(filter.get_str("_id").unwrap(), "not-an-oid");
    }
}
