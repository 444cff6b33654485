//! Proxy to the hosted model
//!
//! The request is sanitized first: `grants`, `grantedData` and `preferences`
//! go through the redactor, memory snippets are stringified and capped. The
//! model's server-sent-event stream is decoded and forwarded as plain text.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use dbdesk_config::AiConfig;
use dbdesk_core::PLAN_MARKER;
use dbdesk_security::Redactor;
use futures_util::{Stream, StreamExt, future, stream};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::request::LenientJson;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiRequest {
    pub prompt: Value,
    pub grants: Value,
    pub granted_data: Value,
    pub memory_snippets: Value,
    pub preferences: Value,
}

/// What is actually sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedRequest {
    pub prompt: String,
    pub grants: Value,
    pub granted_data: Value,
    pub memory_snippets: Vec<String>,
    pub preferences: Value,
}

pub struct AiProxy {
    http: reqwest::Client,
    config: AiConfig,
    redactor: Redactor,
}

impl AiProxy {
    pub fn new(config: AiConfig, redactor: Redactor) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            redactor,
        }
    }

    /// API key from the configured environment variable, read per request
    fn api_key(&self) -> ApiResult<String> {
        match std::env::var(&self.config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ApiError::Ai(format!(
                "Missing {}. Set it in the server environment. Keys and data are never stored or logged.",
                self.config.api_key_env
            ))),
        }
    }

    pub fn sanitize(&self, req: AiRequest) -> SanitizedRequest {
        let (grants, mut report) = self.redactor.redact_payload(&req.grants);
        let (granted_data, granted_report) = self.redactor.redact_payload(&req.granted_data);
        let (preferences, preferences_report) = self.redactor.redact_payload(&req.preferences);
        report.merge(granted_report);
        report.merge(preferences_report);

        let memory_snippets = match req.memory_snippets {
            Value::Array(items) => items
                .into_iter()
                .take(self.config.max_memory_snippets)
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        debug!(
            "Sanitized AI request: {} redactions, {} memory snippets",
            report.total(),
            memory_snippets.len()
        );

        SanitizedRequest {
            prompt: match req.prompt {
                Value::String(s) => s,
                _ => String::new(),
            },
            grants,
            granted_data,
            memory_snippets,
            preferences,
        }
    }

    /// Upstream request body in the `generateContent` format
    pub fn request_body(&self, sanitized: &SanitizedRequest) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": system_prompt() }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_prompt(sanitized) }],
            }],
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send the request and return the decoded text stream as a response
    pub async fn stream(&self, req: AiRequest) -> ApiResult<Response> {
        let api_key = self.api_key()?;
        let sanitized = self.sanitize(req);

        let upstream = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(&sanitized))
            .send()
            .await
            .map_err(|e| ApiError::Ai(format!("AI request failed: {}", e.without_url())))?;

        let status = upstream.status();
        if !status.is_success() {
            let detail = upstream.text().await.unwrap_or_default();
            return Err(ApiError::Ai(format!("AI service returned {}: {}", status, detail)));
        }
        info!("Streaming AI response from {}", self.config.model);

        let text = decode_stream(upstream.bytes_stream());

        Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(text),
        )
            .into_response())
    }
}

/// Map an upstream event stream to the text it carries. A last line without
/// a trailing newline is flushed when the upstream ends.
pub fn decode_stream<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, std::io::Error>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    upstream
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(SseDecoder::new(), |decoder, chunk| {
            let text = match chunk {
                Some(Ok(bytes)) => Ok(Bytes::from(decoder.push(&bytes))),
                Some(Err(e)) => Err(std::io::Error::other(e)),
                None => Ok(Bytes::from(decoder.finish())),
            };
            future::ready(Some(text))
        })
}

/// POST /api/ai/gemini
pub async fn gemini(State(state): State<AppState>, LenientJson(req): LenientJson<AiRequest>) -> Response {
    match state.ai.stream(req).await {
        Ok(response) => response,
        Err(e @ ApiError::Ai(_)) => e.into_response(),
        // every failure on this route answers with a JSON body
        Err(other) => ApiError::Ai(other.to_string()).into_response(),
    }
}

pub fn system_prompt() -> String {
    format!(
        "You are a senior MongoDB expert and a careful assistant. \
         Rules: 1) Use ONLY the data the user granted. 2) NEVER infer or invent collections or fields. \
         3) Prefer read-only analysis unless the user explicitly enabled auto-execution. \
         4) When proposing write operations, include a concise plan. \
         Output format: start with a short, helpful explanation. Then, if relevant, include a JSON plan \
         under the heading {marker} in a fenced code block with the language \"json\". \
         The {marker} must be a JSON object with an optional key actions[]; each action has \
         {{ \"type\": \"find|aggregate|insertMany|updateMany|deleteMany|command\", \"db\": \"...\", \
         \"collection\": \"...\", \"params\": {{...}}, \"reason\": \"...\" }}. \
         When actions affect specific documents, include an `ids` array with stringified _id values. \
         Keep the JSON small and free of secrets.",
        marker = PLAN_MARKER
    )
}

fn or_empty_object(value: &Value) -> Value {
    if value.is_null() {
        json!({})
    } else {
        value.clone()
    }
}

pub fn user_prompt(sanitized: &SanitizedRequest) -> String {
    let context = [
        "Context: MongoDB console. Stateless APIs. The user controls all permissions.".to_string(),
        format!("User preferences: {}", or_empty_object(&sanitized.preferences)),
        format!(
            "Memory snippets (private, client-provided): {}",
            Value::from(sanitized.memory_snippets.clone())
        ),
        format!("Grants: {}", or_empty_object(&sanitized.grants)),
        format!("Granted data (summarized): {}", or_empty_object(&sanitized.granted_data)),
        format!(
            "Instruction: respond step by step and produce an optional {} JSON for executable actions.",
            PLAN_MARKER
        ),
    ]
    .join("\n\n");

    format!("{}\n\nUser: {}", context, sanitized.prompt)
}

/// Incremental decoder for the upstream event stream. Feeds on raw byte
/// chunks, which may split lines (and UTF-8 sequences) anywhere, and yields
/// the text carried by each complete `data:` line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.buffer.extend_from_slice(chunk);

        let mut text = String::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            text.push_str(&decode_line(&line));
        }
        text
    }

    /// Text of a final line that had no trailing newline
    pub fn finish(&mut self) -> String {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line)
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = String::from_utf8_lossy(line);
    let Some(data) = line.trim_end_matches(['\r', '\n']).strip_prefix("data:") else {
        return String::new();
    };
    match serde_json::from_str::<Value>(data.trim()) {
        Ok(event) => event_text(&event),
        Err(_) => String::new(),
    }
}

/// Concatenated text parts of the first candidate
pub fn event_text(event: &Value) -> String {
    event["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}
