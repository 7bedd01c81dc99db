//! Thin helpers over the page: root node, the shared stylesheet and the
//! custom events the widget dispatches.

use leptos::logging::warn;
use wa_lead_shared::WidgetError;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, HtmlElement};

pub const ROOT_ID: &str = "wa-lead-widget";
pub const STYLE_ID: &str = "wa-lead-widget-style";
pub const EVENT_PREFIX: &str = "wa-lead:";

const STYLESHEET: &str = include_str!("../widget.css");

pub fn document() -> Option<Document> {
    web_sys::window()?.document()
}

pub fn js_error(err: JsValue) -> WidgetError {
    WidgetError::Dom(format!("{:?}", err))
}

pub fn to_js(value: &serde_json::Value) -> JsValue {
    js_sys::JSON::parse(&value.to_string()).unwrap_or(JsValue::UNDEFINED)
}

/// Injects the widget stylesheet unless a previous init already did.
pub fn ensure_stylesheet(document: &Document) -> Result<(), WidgetError> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }
    let style = document.create_element("style").map_err(js_error)?;
    style.set_id(STYLE_ID);
    style.set_text_content(Some(STYLESHEET));

    let head: Element = match document.head() {
        Some(head) => head.into(),
        None => document
            .document_element()
            .ok_or_else(|| WidgetError::Dom("document has no root element".into()))?,
    };
    head.append_child(&style).map_err(js_error)?;
    Ok(())
}

/// Creates the widget root and appends it to the `attachTo` target.
pub fn create_root(document: &Document, attach_to: &str) -> Result<HtmlElement, WidgetError> {
    if let Some(stale) = document.get_element_by_id(ROOT_ID) {
        stale.remove();
    }
    let root: HtmlElement = document
        .create_element("div")
        .map_err(js_error)?
        .unchecked_into();
    root.set_id(ROOT_ID);
    attach(document, &root, attach_to)?;
    Ok(root)
}

/// Moves `root` under the element matching `selector`, falling back to `<body>`.
pub fn attach(document: &Document, root: &HtmlElement, selector: &str) -> Result<(), WidgetError> {
    let target = match document.query_selector(selector) {
        Ok(Some(target)) => target,
        Ok(None) | Err(_) => {
            warn!("[wa-lead] attachTo `{}` not found, using <body>", selector);
            document
                .body()
                .ok_or_else(|| WidgetError::Dom("document has no <body>".into()))?
                .into()
        }
    };
    target.append_child(root).map_err(js_error)?;
    Ok(())
}

/// Dispatches `wa-lead:<name>` on the widget root with `detail` as payload.
pub fn emit(name: &str, detail: serde_json::Value) {
    let Some(root) = document().and_then(|d| d.get_element_by_id(ROOT_ID)) else {
        return;
    };
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    init.set_detail(&to_js(&detail));

    match CustomEvent::new_with_event_init_dict(&format!("{EVENT_PREFIX}{name}"), &init) {
        Ok(event) => {
            let _ = root.dispatch_event(&event);
        }
        Err(e) => warn!("[wa-lead] could not create `{}` event: {:?}", name, e),
    }
}
