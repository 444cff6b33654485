use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShortcutError;
use crate::os::{Os, format_key_label};

/// Where a key event originated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventTarget {
    #[default]
    Document,
    Input,
    TextArea,
    ContentEditable,
    Other(String),
}

impl EventTarget {
    /// Targets that accept typed text
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            EventTarget::Input | EventTarget::TextArea | EventTarget::ContentEditable
        )
    }
}

/// A key-down event as delivered by the UI host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
    pub target: EventTarget,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn on(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Modifier flags plus one key name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    #[serde(default, skip_serializing_if = "is_false")]
    pub ctrl: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub meta: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub alt: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shift: bool,
    #[serde(default)]
    pub key: String,
}

impl KeyCombo {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// The combo an event represents. Single-character keys are upper-cased.
    pub fn from_event(event: &KeyEvent) -> Self {
        let key = if event.key.chars().count() == 1 {
            event.key.to_uppercase()
        } else {
            event.key.clone()
        };
        Self {
            ctrl: event.ctrl,
            meta: event.meta,
            alt: event.alt,
            shift: event.shift,
            key,
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.meta || self.alt || self.shift
    }

    /// Same modifiers and the same key ignoring case. A combo without a key
    /// matches nothing, not even itself.
    pub fn equivalent(&self, other: &KeyCombo) -> bool {
        !self.key.is_empty()
            && !other.key.is_empty()
            && self.key.to_lowercase() == other.key.to_lowercase()
            && self.ctrl == other.ctrl
            && self.meta == other.meta
            && self.alt == other.alt
            && self.shift == other.shift
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.equivalent(&KeyCombo::from_event(event))
    }

    /// Whether the combo may be captured as a binding: it needs a modifier
    /// unless the key is a function key, Enter or Escape
    pub fn is_bindable(&self) -> bool {
        self.has_modifier()
            || is_function_key(&self.key)
            || self.key.eq_ignore_ascii_case("Enter")
            || self.key.eq_ignore_ascii_case("Escape")
    }

    /// Human-readable form, e.g. `⌘ + Shift + A` or `Ctrl + Enter`
    pub fn label(&self, os: Os) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(5);
        if self.meta {
            parts.push(if os == Os::Mac { "⌘" } else { "Win" }.to_string());
        }
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.alt {
            parts.push(if os == Os::Mac { "⌥" } else { "Alt" }.to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        parts.push(format_key_label(&self.key, os));
        parts.join(" + ")
    }
}

/// Parses `ctrl+shift+a`, `Cmd+K` or `F5`. Modifier names are
/// case-insensitive and the last segment is the key.
impl FromStr for KeyCombo {
    type Err = ShortcutError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ShortcutError::InvalidCombo(s.to_string())),
        };

        let mut combo = KeyCombo::from_event(&KeyEvent::new(key));
        for modifier in parts {
            match modifier.to_lowercase().as_str() {
                "ctrl" | "control" => combo.ctrl = true,
                "meta" | "cmd" | "command" | "win" | "super" => combo.meta = true,
                "alt" | "option" | "opt" => combo.alt = true,
                "shift" => combo.shift = true,
                _ => return Err(ShortcutError::InvalidCombo(s.to_string())),
            }
        }
        Ok(combo)
    }
}

fn is_function_key(key: &str) -> bool {
    key.strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=24).contains(&n))
}
