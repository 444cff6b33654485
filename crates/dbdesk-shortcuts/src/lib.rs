//! Keyboard shortcuts for dbdesk
//!
//! A [`ShortcutDispatcher`] owns a persisted, user-editable mapping from
//! action ids (`mongo.run-query`) to key combos and routes key events to the
//! handlers registered for those actions. Actions without a handler produce a
//! [`FallbackEvent`] instead.

pub mod combo;
pub mod dispatcher;
pub mod error;
pub mod keymap;
pub mod listener;
pub mod os;

pub use combo::{EventTarget, KeyCombo, KeyEvent};
pub use dispatcher::{ActionHandler, Dispatch, FallbackEvent, Rebind, Registration, ShortcutDispatcher};
pub use error::{Result, ShortcutError};
pub use keymap::{STORAGE_KEY, ShortcutMap};
pub use listener::{KeyListener, KeySender};
pub use os::{Os, format_key_label};
