use std::sync::Arc;

use dbdesk_shortcuts::{KeyCombo, KeyEvent, STORAGE_KEY, ShortcutDispatcher, ShortcutMap};
use dbdesk_storage::{FileStore, KeyValueStore, MemoryStore};
use tempfile::TempDir;

#[test]
fn test_binding_survives_reload() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).unwrap());

    let dispatcher = ShortcutDispatcher::new(Arc::clone(&store));
    dispatcher.set_shortcut("mongo.run-query", KeyCombo::new("F5"), 0);
    drop(dispatcher);

    // simulated reload: a fresh store handle over the same directory
    let reloaded_store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).unwrap());
    let reloaded = ShortcutDispatcher::new(reloaded_store);
    assert_eq!(
        reloaded.shortcuts().get("mongo.run-query").unwrap()[0],
        KeyCombo::new("F5")
    );
    assert_eq!(
        reloaded.dispatch(&KeyEvent::new("F5")).action(),
        Some("mongo.run-query")
    );
}

#[test]
fn test_reset_restores_defaults_exactly() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let dispatcher = ShortcutDispatcher::new(Arc::clone(&store));
    dispatcher.set_shortcut("mongo.copy-doc", KeyCombo::new("D").alt(), 0);
    dispatcher.set_shortcut("custom.extra", KeyCombo::new("X").ctrl(), 0);

    dispatcher.reset_shortcuts();
    assert_eq!(*dispatcher.shortcuts(), ShortcutMap::defaults());

    let reloaded = ShortcutDispatcher::new(store);
    assert_eq!(*reloaded.shortcuts(), ShortcutMap::defaults());
}

#[test]
fn test_stored_blob_is_a_plain_json_map() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = ShortcutDispatcher::new(store.clone());
    dispatcher.set_shortcut("mongo.page-next", KeyCombo::new("N").alt(), 0);

    let raw = store.get(STORAGE_KEY).unwrap().unwrap();
    let blob: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        blob["mongo.page-next"],
        serde_json::json!([{"alt": true, "key": "N"}])
    );
}

struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> dbdesk_storage::Result<Option<String>> {
        Err(std::io::Error::other("quota exceeded").into())
    }

    fn set(&self, _key: &str, _value: &str) -> dbdesk_storage::Result<()> {
        Err(std::io::Error::other("quota exceeded").into())
    }

    fn remove(&self, _key: &str) -> dbdesk_storage::Result<()> {
        Ok(())
    }
}

#[test]
fn test_unavailable_storage_degrades_to_memory() {
    let dispatcher = ShortcutDispatcher::new(Arc::new(BrokenStore));
    assert_eq!(*dispatcher.shortcuts(), ShortcutMap::defaults());

    dispatcher.set_shortcut("mongo.toggle-ai", KeyCombo::new("G").ctrl(), 0);
    assert_eq!(
        dispatcher.dispatch(&KeyEvent::new("g").ctrl()).action(),
        Some("mongo.toggle-ai")
    );
}
