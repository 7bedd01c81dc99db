//! Browser build of the WhatsApp lead widget.
//!
//! Exposes the `WaLeadWidget` class to JavaScript:
//!
//! ```js
//! const widget = WaLeadWidget.init({ whatsappNumber: "(11) 98888-7777", scriptURL: "/lead" });
//! widget.open();
//! widget.updateConfig({ texts: { submit: "Chamar no WhatsApp" } });
//! widget.destroy();
//! ```

mod analytics;
mod boot;
mod dom;
mod instance;
mod intercept;
mod net;
mod state;
mod storage;
mod submit;
mod view;

use std::rc::Rc;

use wa_lead_shared::{ConfigOverrides, WidgetError};
use wasm_bindgen::prelude::*;

use instance::WidgetInstance;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::logging::log!("[wa-lead] widget script loaded");

    if !boot::try_mount() {
        boot::wait_and_mount();
    }
}

fn to_js_error(err: WidgetError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn overrides_from_js(value: &JsValue) -> Result<ConfigOverrides, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ConfigOverrides::default());
    }
    let json: String = js_sys::JSON::stringify(value)?.into();
    ConfigOverrides::from_json(&json).map_err(|e| to_js_error(e.into()))
}

/// Handle to the mounted widget. Several handles may point at the same
/// instance; `destroy()` through any of them tears it down.
#[wasm_bindgen(js_name = WaLeadWidget)]
pub struct LeadWidget {
    instance: Rc<WidgetInstance>,
}

#[wasm_bindgen(js_class = WaLeadWidget)]
impl LeadWidget {
    /// Mounts the widget, or retargets the live one's number if already mounted.
    pub fn init(config: JsValue) -> Result<LeadWidget, JsValue> {
        let overrides = overrides_from_js(&config)?;
        let instance = WidgetInstance::init(&overrides).map_err(to_js_error)?;
        Ok(LeadWidget { instance })
    }

    /// The live instance, e.g. one mounted from `#wa-lead-root`.
    pub fn current() -> Option<LeadWidget> {
        WidgetInstance::active().map(|instance| LeadWidget { instance })
    }

    pub fn open(&self, number: Option<String>) {
        self.instance.open(number);
    }

    pub fn close(&self) {
        self.instance.close();
    }

    #[wasm_bindgen(js_name = setNumber)]
    pub fn set_number(&self, number: String) {
        self.instance.set_number(&number);
    }

    #[wasm_bindgen(js_name = updateConfig)]
    pub fn update_config(&self, partial: JsValue) -> Result<(), JsValue> {
        let overrides = overrides_from_js(&partial)?;
        self.instance.update_config(&overrides).map_err(to_js_error)
    }

    pub fn destroy(&self) {
        self.instance.destroy();
    }
}
