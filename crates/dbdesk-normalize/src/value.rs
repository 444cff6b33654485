use std::fmt;
use std::sync::{Arc, Mutex};

use bson::{Binary, Decimal128, Timestamp, Uuid, oid::ObjectId};
use serde_json::Value;
use time::OffsetDateTime;

/// A node that can be referenced from several places, and therefore the only
/// place a cycle can form
pub type SharedValue = Arc<Mutex<DriverValue>>;

/// A value as returned by the database driver
#[derive(Debug, Clone)]
pub enum DriverValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Native integer too wide for a JSON number
    BigInt(i128),
    String(String),
    Date(OffsetDateTime),
    Array(Vec<DriverValue>),
    /// Ordered key/value pairs
    Document(Vec<(String, DriverValue)>),
    Wrapped(Wrapper),
    /// Raw byte array
    Bytes(Vec<u8>),
    Shared(SharedValue),
    Opaque(Arc<dyn OpaqueValue>),
}

/// Driver wrapper types, each with exactly one JSON representation
#[derive(Debug, Clone)]
pub enum Wrapper {
    ObjectId(ObjectId),
    Decimal128(Decimal128),
    Long(i64),
    Int32(i32),
    Double(f64),
    Timestamp(Timestamp),
    Uuid(Uuid),
    Binary(Binary),
}

impl Wrapper {
    /// Discriminator name, as the driver reports it
    pub fn kind(&self) -> &'static str {
        match self {
            Wrapper::ObjectId(_) => "ObjectId",
            Wrapper::Decimal128(_) => "Decimal128",
            Wrapper::Long(_) => "Long",
            Wrapper::Int32(_) => "Int32",
            Wrapper::Double(_) => "Double",
            Wrapper::Timestamp(_) => "Timestamp",
            Wrapper::Uuid(_) => "UUID",
            Wrapper::Binary(_) => "Binary",
        }
    }
}

/// Anything the normalizer has no dedicated mapping for
pub trait OpaqueValue: fmt::Debug + fmt::Display + Send + Sync {
    /// JSON form of the value, if it has one. Falls back to `Display`.
    fn to_json(&self) -> Option<Value> {
        None
    }
}

impl DriverValue {
    pub fn document<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, DriverValue)>,
        K: Into<String>,
    {
        DriverValue::Document(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap a value in a shared node. Keep the returned handle to build
    /// self-references.
    pub fn shared(value: DriverValue) -> SharedValue {
        Arc::new(Mutex::new(value))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, DriverValue::Undefined)
    }
}

impl From<Wrapper> for DriverValue {
    fn from(wrapper: Wrapper) -> Self {
        DriverValue::Wrapped(wrapper)
    }
}

impl From<&str> for DriverValue {
    fn from(s: &str) -> Self {
        DriverValue::String(s.to_string())
    }
}

impl From<String> for DriverValue {
    fn from(s: String) -> Self {
        DriverValue::String(s)
    }
}

impl From<i64> for DriverValue {
    fn from(n: i64) -> Self {
        DriverValue::Int(n)
    }
}

impl From<bool> for DriverValue {
    fn from(b: bool) -> Self {
        DriverValue::Bool(b)
    }
}

impl From<SharedValue> for DriverValue {
    fn from(node: SharedValue) -> Self {
        DriverValue::Shared(node)
    }
}
