//! Secret redaction for payloads sent to external services
//!
//! Every value that leaves for a third-party model goes through
//! [`redact_for_external_use`]. Secrets are recognised by key name
//! (`password`, `apiKey`, ...) or by shape (JWTs, long tokens, long hex
//! strings); credentials inside connection strings are masked while the host
//! stays readable.

pub mod connection_string;
pub mod patterns;
pub mod redactor;

pub use connection_string::{PASSWORD_MASK, USER_MASK, mask_connection_string};
pub use patterns::{is_secret_key, looks_like_secret, secret_value_kind};
pub use redactor::{DROPPED_FIELDS, MASK_SUFFIX, RedactionReport, Redactor, is_masked, mask};

use serde_json::Value;

/// Produce a redacted deep copy of `payload`.
///
/// Total over JSON input: there is no error case, and the input is left
/// untouched.
pub fn redact_for_external_use(payload: &Value) -> Value {
    Redactor::default().redact_payload(payload).0
}
