//! Action registry and key-event routing

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use dbdesk_storage::{KeyValueStore, MemoryStore};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::combo::{KeyCombo, KeyEvent};
use crate::error::{Result, ShortcutError};
use crate::keymap::ShortcutMap;
use crate::os::Os;

/// Callback bound to an action
pub type ActionHandler = Arc<dyn Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync>;

const FALLBACK_CAPACITY: usize = 64;

/// Sent when a combo matches an action nobody has registered a handler for
#[derive(Debug, Clone)]
pub struct FallbackEvent {
    pub action: String,
    pub event: KeyEvent,
}

impl FallbackEvent {
    /// Notification name, `shortcut:<action>`
    pub fn name(&self) -> String {
        format!("shortcut:{}", self.action)
    }
}

/// What a dispatched event did. Anything but `Ignored` and `Suppressed`
/// means the host should prevent the key's default handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No action matched
    Ignored,
    /// Typed into a text field
    Suppressed,
    Handled {
        action: String,
        handlers: usize,
        failures: usize,
    },
    Broadcast {
        action: String,
    },
}

impl Dispatch {
    pub fn prevents_default(&self) -> bool {
        matches!(self, Dispatch::Handled { .. } | Dispatch::Broadcast { .. })
    }

    pub fn action(&self) -> Option<&str> {
        match self {
            Dispatch::Handled { action, .. } | Dispatch::Broadcast { action } => {
                Some(action.as_str())
            }
            _ => None,
        }
    }
}

/// Outcome of a settings rebind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebind {
    pub action: String,
    pub combo: KeyCombo,
    /// Other actions bound to the same combo. The rebind is applied anyway.
    pub conflicts: Vec<String>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, ActionHandler)>>,
}

struct Inner {
    shortcuts: RwLock<Arc<ShortcutMap>>,
    registry: Mutex<Registry>,
    store: Arc<dyn KeyValueStore>,
    fallback: broadcast::Sender<FallbackEvent>,
    os: Os,
    listening: AtomicBool,
}

/// The shortcut context: built once at start-up and cloned into whatever
/// needs to register actions. Clones share state.
#[derive(Clone)]
pub struct ShortcutDispatcher {
    inner: Arc<Inner>,
}

impl ShortcutDispatcher {
    /// Load the mapping from `store` (merged over the defaults)
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_os(store, Os::current())
    }

    pub fn with_os(store: Arc<dyn KeyValueStore>, os: Os) -> Self {
        let shortcuts = ShortcutMap::load(store.as_ref());
        let (fallback, _) = broadcast::channel(FALLBACK_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                shortcuts: RwLock::new(Arc::new(shortcuts)),
                registry: Mutex::new(Registry::default()),
                store,
                fallback,
                os,
                listening: AtomicBool::new(false),
            }),
        }
    }

    /// Dispatcher whose edits live only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn os(&self) -> Os {
        self.inner.os
    }

    /// Current mapping. Edits swap in a new map, so a snapshot never changes.
    pub fn shortcuts(&self) -> Arc<ShortcutMap> {
        match self.inner.shortcuts.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Bind `combo` at `index` of the action's combo list and persist
    pub fn set_shortcut(&self, action: &str, combo: KeyCombo, index: usize) {
        self.update(|map| map.set(action, combo, index));
    }

    /// Restore and persist the built-in mapping
    pub fn reset_shortcuts(&self) {
        self.update(|map| *map = ShortcutMap::defaults());
    }

    /// Settings-dialog rebind: validate the captured combo, report conflicts,
    /// then bind it as the action's primary combo
    pub fn rebind(&self, action: &str, combo: KeyCombo) -> Result<Rebind> {
        if !combo.is_bindable() {
            return Err(ShortcutError::NotBindable(combo.label(self.inner.os)));
        }

        let conflicts = self.shortcuts().conflicts(action, &combo);
        if !conflicts.is_empty() {
            warn!(
                "{} conflicts with {}",
                combo.label(self.inner.os),
                conflicts.join(", ")
            );
        }

        self.set_shortcut(action, combo.clone(), 0);
        Ok(Rebind {
            action: action.to_string(),
            combo,
            conflicts,
        })
    }

    /// Label of the action's first combo, or `None` when unassigned
    pub fn combo_label(&self, action: &str) -> Option<String> {
        self.shortcuts()
            .get(action)
            .and_then(|combos| combos.first())
            .map(|combo| combo.label(self.inner.os))
    }

    /// Add a handler for `action`. Several handlers may share an action;
    /// they run in registration order.
    pub fn register_action<F>(&self, action: &str, handler: F) -> Registration
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(action.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Registration {
            inner: Arc::downgrade(&self.inner),
            action: action.to_string(),
            id,
        }
    }

    pub fn handler_count(&self, action: &str) -> usize {
        self.registry().handlers.get(action).map_or(0, Vec::len)
    }

    /// Fallback notifications for actions without handlers
    pub fn subscribe_fallback(&self) -> broadcast::Receiver<FallbackEvent> {
        self.inner.fallback.subscribe()
    }

    /// Route one key-down event
    pub fn dispatch(&self, event: &KeyEvent) -> Dispatch {
        if event.target.is_text_entry() && event.key != "Enter" {
            return Dispatch::Suppressed;
        }

        let shortcuts = self.shortcuts();
        let Some(action) = shortcuts.find_action(&KeyCombo::from_event(event)) else {
            return Dispatch::Ignored;
        };

        // Cloned out so handlers can register or unregister while running
        let handlers: Vec<ActionHandler> = self
            .registry()
            .handlers
            .get(action)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            let notification = FallbackEvent {
                action: action.to_string(),
                event: event.clone(),
            };
            debug!("No handler for {}, sending {}", action, notification.name());
            // no subscribers is fine
            let _ = self.inner.fallback.send(notification);
            return Dispatch::Broadcast {
                action: action.to_string(),
            };
        }

        let mut failures = 0;
        for handler in &handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("Handler for {} failed: {:#}", action, e);
                }
                Err(_) => {
                    failures += 1;
                    error!("Handler for {} panicked", action);
                }
            }
        }

        Dispatch::Handled {
            action: action.to_string(),
            handlers: handlers.len(),
            failures,
        }
    }

    pub(crate) fn claim_listener(&self) -> Result<()> {
        if self.inner.listening.swap(true, Ordering::SeqCst) {
            return Err(ShortcutError::ListenerInstalled);
        }
        Ok(())
    }

    pub(crate) fn release_listener(&self) {
        self.inner.listening.store(false, Ordering::SeqCst);
    }

    fn update(&self, edit: impl FnOnce(&mut ShortcutMap)) {
        let mut guard = match self.inner.shortcuts.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = ShortcutMap::clone(&guard);
        edit(&mut next);
        next.save(self.inner.store.as_ref());
        *guard = Arc::new(next);
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry()
    }
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handle to one registered handler
#[must_use = "dropping a Registration keeps the handler registered"]
#[derive(Debug)]
pub struct Registration {
    inner: Weak<Inner>,
    action: String,
    id: u64,
}

impl Registration {
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Remove exactly this handler
    pub fn unregister(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut registry = inner.registry();
        if let Some(entries) = registry.handlers.get_mut(&self.action) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                registry.handlers.remove(&self.action);
            }
        }
    }
}
