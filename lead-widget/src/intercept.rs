use leptos::logging::log;
use wa_lead_shared::{WhatsAppLink, WidgetError};
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Element, MouseEvent};

use crate::dom::{self, js_error};
use crate::state::WidgetState;

/// Anchors carrying this attribute are never intercepted.
pub const OPT_OUT_ATTR: &str = "data-wa-lead-ignore";

/// Capturing `click` listener on the document that reroutes WhatsApp links
/// into the modal. Removing the listener is tied to `Drop`.
pub struct LinkInterceptor {
    listener: Closure<dyn FnMut(MouseEvent)>,
}

impl LinkInterceptor {
    pub fn install(state: WidgetState) -> Result<Self, WidgetError> {
        let document = dom::document().ok_or_else(|| WidgetError::Dom("no document".into()))?;

        let listener = Closure::wrap(Box::new(move |event: MouseEvent| {
            on_click(&event, state);
        }) as Box<dyn FnMut(MouseEvent)>);

        let options = AddEventListenerOptions::new();
        options.set_capture(true);
        document
            .add_event_listener_with_callback_and_add_event_listener_options(
                "click",
                listener.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(js_error)?;

        Ok(Self { listener })
    }
}

impl Drop for LinkInterceptor {
    fn drop(&mut self) {
        if let Some(document) = dom::document() {
            let _ = document.remove_event_listener_with_callback_and_bool(
                "click",
                self.listener.as_ref().unchecked_ref(),
                true,
            );
        }
    }
}

fn on_click(event: &MouseEvent, state: WidgetState) {
    let Some(element) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
        return;
    };
    let Ok(Some(anchor)) = element.closest("a[href]") else {
        return;
    };
    if anchor.has_attribute(OPT_OUT_ATTR) {
        return;
    }
    let Some(link) = anchor.get_attribute("href").and_then(|href| WhatsAppLink::classify(&href)) else {
        return;
    };

    // Host handlers on the anchor still run; only the navigation is cancelled.
    event.prevent_default();
    log!("[wa-lead] intercepted {:?} link", link.kind);
    state.open(link.number);
}
