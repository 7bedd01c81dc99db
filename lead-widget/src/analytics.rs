use leptos::logging::warn;
use wa_lead_shared::AnalyticsEvent;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;

use crate::dom::to_js;

/// Sends `event` through `window.gtag`, or pushes it to `window.dataLayer`
/// when gtag is not loaded (e.g. a bare Tag Manager container).
pub fn send(event: &AnalyticsEvent) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let gtag = js_sys::Reflect::get(&window, &JsValue::from_str("gtag")).unwrap_or(JsValue::UNDEFINED);

    let sent = match gtag.dyn_ref::<js_sys::Function>() {
        Some(gtag) => gtag
            .call3(
                &JsValue::NULL,
                &JsValue::from_str("event"),
                &JsValue::from_str(event.name),
                &to_js(&serde_json::Value::Object(event.params.clone())),
            )
            .map(drop),
        None => push_data_layer(&window, &event.data_layer_entry()),
    };
    if let Err(e) = sent {
        warn!("[wa-lead] analytics event `{}` failed: {:?}", event.name, e);
    }
}

fn push_data_layer(window: &Window, entry: &serde_json::Value) -> Result<(), JsValue> {
    let key = JsValue::from_str("dataLayer");
    let existing = js_sys::Reflect::get(window, &key)?;
    let layer: js_sys::Array = if js_sys::Array::is_array(&existing) {
        existing.unchecked_into()
    } else {
        let layer = js_sys::Array::new();
        js_sys::Reflect::set(window, &key, &layer)?;
        layer
    };
    layer.push(&to_js(entry));
    Ok(())
}
