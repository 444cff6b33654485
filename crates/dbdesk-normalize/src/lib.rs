//! Driver value normalization for dbdesk
//!
//! Database results carry driver-specific types (object ids, decimals,
//! 64-bit integers, binary blobs, timestamps) that JSON cannot express
//! directly. [`normalize_for_transport`] maps each of them onto one JSON-safe
//! representation so every route handler can return plain JSON.

pub mod convert;
pub mod normalizer;
pub mod value;

pub use convert::{
    ConversionError, ExtendedJson, json_to_bson, json_to_document, json_to_documents,
    promote_object_id,
};
pub use normalizer::{Normalizer, encode_base64, normalize_document, normalize_for_transport};
pub use value::{DriverValue, OpaqueValue, SharedValue, Wrapper};
