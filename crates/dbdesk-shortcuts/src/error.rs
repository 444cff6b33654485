use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortcutError>;

#[derive(Error, Debug)]
pub enum ShortcutError {
    #[error("{0} needs a modifier (only F1-F24, Enter and Escape may stand alone)")]
    NotBindable(String),

    #[error("Cannot parse key combo '{0}'")]
    InvalidCombo(String),

    #[error("A key listener is already installed")]
    ListenerInstalled,

    #[error("Key listener has shut down")]
    ListenerClosed,
}
