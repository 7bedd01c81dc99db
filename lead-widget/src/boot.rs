//! Script-tag mode: mount from `#wa-lead-root` data attributes without any JS.

use std::cell::Cell;
use std::rc::Rc;

use leptos::logging::{log, warn};
use wa_lead_shared::ConfigOverrides;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::instance::WidgetInstance;

pub const BOOT_ELEMENT_ID: &str = "wa-lead-root";
const MAX_ATTEMPTS: u32 = 50;
const RETRY_MS: i32 = 100;

pub fn try_mount() -> bool {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return false;
    };
    let Some(root) = document.get_element_by_id(BOOT_ELEMENT_ID) else {
        return false;
    };

    // Config comes from data-* attributes
    let overrides = ConfigOverrides {
        whatsapp_number: root.get_attribute("data-whatsapp-number"),
        script_url: root.get_attribute("data-script-url"),
        storage_key: root.get_attribute("data-storage-key"),
        intercept_links: root.get_attribute("data-intercept-links").map(|v| v != "false"),
        attach_to: Some(format!("#{}", BOOT_ELEMENT_ID)),
        ..ConfigOverrides::default()
    };

    if overrides.whatsapp_number.is_none() {
        log!("[wa-lead] #{} has no data-whatsapp-number, waiting for init()", BOOT_ELEMENT_ID);
        return true;
    }

    match WidgetInstance::init(&overrides) {
        Ok(_) => log!("[wa-lead] mounted from #{}", BOOT_ELEMENT_ID),
        Err(e) => warn!("[wa-lead] auto-mount failed: {}", e),
    }
    true
}

/// Polls for the boot element while the page is still building the DOM.
pub fn wait_and_mount() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let attempts = Rc::new(Cell::new(0));
    let interval_id = Rc::new(Cell::new(None::<i32>));

    let interval = Rc::clone(&interval_id);
    let closure: Closure<dyn FnMut()> = Closure::new(move || {
        let count = attempts.get() + 1;
        attempts.set(count);

        let done = try_mount();
        if !done && count < MAX_ATTEMPTS {
            return;
        }
        if !done {
            log!("[wa-lead] no #{} on the page, use WaLeadWidget.init()", BOOT_ELEMENT_ID);
        }
        if let (Some(id), Some(window)) = (interval.get(), web_sys::window()) {
            window.clear_interval_with_handle(id);
        }
    });

    match window.set_interval_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        RETRY_MS,
    ) {
        Ok(id) => interval_id.set(Some(id)),
        Err(e) => warn!("[wa-lead] could not schedule auto-mount: {:?}", e),
    }
    closure.forget();
}
