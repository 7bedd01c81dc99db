use leptos::logging::warn;
use wa_lead_shared::{KeyValueStore, VisitorRecord, VisitorStore, WidgetConfig, WidgetError};
use wasm_bindgen::JsValue;

/// `window.localStorage` behind the shared store trait.
pub struct LocalStore(web_sys::Storage);

fn storage_error(err: JsValue) -> WidgetError {
    WidgetError::Storage(format!("{:?}", err))
}

impl KeyValueStore for LocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, WidgetError> {
        self.0.get_item(key).map_err(storage_error)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), WidgetError> {
        self.0.set_item(key, value).map_err(storage_error)
    }

    fn remove_item(&self, key: &str) -> Result<(), WidgetError> {
        self.0.remove_item(key).map_err(storage_error)
    }
}

fn visitor_store() -> VisitorStore<LocalStore> {
    // local_storage() throws in sandboxed iframes and some private modes
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
    VisitorStore::new(storage.map(LocalStore))
}

/// Stored visitor for prefill. Any failure reads as "nothing stored".
pub fn recall(config: &WidgetConfig) -> Option<VisitorRecord> {
    match visitor_store().read(config.storage_key(), js_sys::Date::now()) {
        Ok(record) => record,
        Err(e) => {
            warn!("[wa-lead] ignoring stored visitor data: {}", e);
            None
        }
    }
}

pub fn remember(config: &WidgetConfig, record: &VisitorRecord) {
    let result = visitor_store().write(
        config.storage_key(),
        record,
        config.storage_expiration_minutes,
        js_sys::Date::now(),
    );
    if let Err(e) = result {
        warn!("[wa-lead] could not persist visitor data: {}", e);
    }
}
