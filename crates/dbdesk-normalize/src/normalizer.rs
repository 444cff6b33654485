use std::collections::HashSet;
use std::sync::Arc;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use bson::Document;
use serde_json::{Map, Number, Value};
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use crate::value::{DriverValue, Wrapper};

/// Input bytes per base64 call; a multiple of 3 so chunks join without padding
const BASE64_CHUNK: usize = 3 * 0x4000;

/// Convert a driver value into transport-safe JSON.
///
/// Total: unknown values degrade to their string form instead of failing.
pub fn normalize_for_transport(value: &DriverValue) -> Value {
    Normalizer::new().normalize(value)
}

/// Normalize a raw driver document
pub fn normalize_document(doc: Document) -> Value {
    normalize_for_transport(&DriverValue::from(doc))
}

/// One walk over a value tree.
///
/// Remembers every shared node it has entered; a node met again (through a
/// cycle or a second reference) becomes `null`.
#[derive(Debug, Default)]
pub struct Normalizer {
    seen: HashSet<usize>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, value: &DriverValue) -> Value {
        match value {
            DriverValue::Undefined | DriverValue::Null => Value::Null,
            DriverValue::Bool(b) => Value::Bool(*b),
            DriverValue::Int(n) => Value::Number((*n).into()),
            DriverValue::Float(f) => float(*f),
            DriverValue::BigInt(n) => Value::String(n.to_string()),
            DriverValue::String(s) => Value::String(s.clone()),
            DriverValue::Date(dt) => Value::String(iso_string(dt)),
            DriverValue::Array(items) => {
                Value::Array(items.iter().map(|item| self.normalize(item)).collect())
            }
            DriverValue::Document(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (key, entry) in entries.iter().filter(|(_, v)| !v.is_undefined()) {
                    out.insert(key.clone(), self.normalize(entry));
                }
                Value::Object(out)
            }
            DriverValue::Wrapped(wrapper) => normalize_wrapper(wrapper),
            DriverValue::Bytes(bytes) => Value::String(encode_base64(bytes)),
            DriverValue::Shared(node) => {
                let identity = Arc::as_ptr(node) as usize;
                if !self.seen.insert(identity) {
                    return Value::Null;
                }
                let inner = match node.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                self.normalize(&inner)
            }
            DriverValue::Opaque(opaque) => opaque
                .to_json()
                .unwrap_or_else(|| Value::String(opaque.to_string())),
        }
    }
}

fn normalize_wrapper(wrapper: &Wrapper) -> Value {
    match wrapper {
        Wrapper::ObjectId(oid) => Value::String(oid.to_hex()),
        Wrapper::Decimal128(d) => Value::String(d.to_string()),
        Wrapper::Long(n) => Value::String(n.to_string()),
        Wrapper::Int32(n) => Value::Number((*n).into()),
        Wrapper::Double(f) => float(*f),
        Wrapper::Timestamp(ts) => {
            let combined = (u64::from(ts.time) << 32) | u64::from(ts.increment);
            Value::String(combined.to_string())
        }
        Wrapper::Uuid(uuid) => Value::String(uuid.to_string()),
        Wrapper::Binary(bin) => Value::String(encode_base64(&bin.bytes)),
    }
}

/// JSON has no NaN or infinity
fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn iso_string(dt: &OffsetDateTime) -> String {
    let utc = dt.to_offset(UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| utc.to_string())
}

/// Standard base64 with padding, encoded in bounded chunks
pub fn encode_base64(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(BASE64_CHUNK) {
        BASE64_STANDARD.encode_string(chunk, &mut out);
    }
    out
}
