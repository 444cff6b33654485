use thiserror::Error;

use crate::action::ActionKind;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid action: {0}")]
    InvalidAction(#[from] serde_json::Error),

    #[error("{0} is not allowed in read-only mode")]
    WriteNotAllowed(ActionKind),
}

pub type Result<T> = std::result::Result<T, CoreError>;
