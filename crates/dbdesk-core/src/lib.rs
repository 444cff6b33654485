//! Core domain models for dbdesk
//!
//! This crate contains:
//! - The shared error type
//! - The AI plan model (actions proposed by the assistant)
//! - Plan extraction from streamed model output

pub mod action;
pub mod error;
pub mod plan;

pub use action::{ActionKind, AiAction};
pub use error::{CoreError, Result};
pub use plan::{AiPlan, PLAN_MARKER, affected_ids, extract_plan};
