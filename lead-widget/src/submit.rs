//! Browser side of the submit pipeline: the DOM, `fetch` and storage behind
//! [`SubmitEffects`].

use leptos::html;
use leptos::logging::{error, log};
use leptos::prelude::*;
use serde_json::Value;
use uuid::Uuid;
use wa_lead_shared::config::Texts;
use wa_lead_shared::lead::Field;
use wa_lead_shared::submission::{self, SubmitEffects};
use wa_lead_shared::{
    AnalyticsEvent, LeadForm, LeadPayload, SubmissionContext, TrackingContext, ValidationError,
    VisitorRecord, WidgetError,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use crate::state::WidgetState;
use crate::{analytics, dom, net, storage};

const ACTION_TIME_ZONE: &str = "America/Sao_Paulo";
const ACTION_TIME_LOCALE: &str = "pt-BR";

/// Node refs for the inputs that can carry a validity message.
#[derive(Clone, Copy)]
pub struct FormInputs {
    pub form: NodeRef<html::Form>,
    pub name: NodeRef<html::Input>,
    pub email: NodeRef<html::Input>,
    pub phone: NodeRef<html::Input>,
}

impl FormInputs {
    pub fn new() -> Self {
        Self {
            form: NodeRef::new(),
            name: NodeRef::new(),
            email: NodeRef::new(),
            phone: NodeRef::new(),
        }
    }

    fn report(&self, err: &ValidationError, texts: &Texts) {
        let input = match err.field {
            Field::Name => self.name,
            Field::Email => self.email,
            Field::Phone => self.phone,
        };
        if let Some(input) = input.get_untracked() {
            input.set_custom_validity(err.message(texts));
        }
        if let Some(form) = self.form.get_untracked() {
            form.report_validity();
        }
    }

    pub fn clear_validity(&self) {
        for input in [self.name, self.email, self.phone] {
            if let Some(input) = input.get_untracked() {
                input.set_custom_validity("");
            }
        }
    }
}

pub fn submit(state: WidgetState, inputs: FormInputs) {
    let fx = BrowserEffects { state, inputs };
    let config = state.config.get_untracked();
    let form = state.form.get_untracked();
    inputs.clear_validity();

    let redirected = match submission::begin(
        &fx,
        state.phase.get_untracked(),
        &config,
        &form,
        &state.current_number(),
    ) {
        Ok(redirected) => redirected,
        Err(halt) => {
            log!("[wa-lead] submit stopped: {}", halt);
            return;
        }
    };

    spawn_local(async move {
        let outcome = submission::settle(&fx, &config, redirected).await;
        log!("[wa-lead] submission settled: {:?}", outcome);
    });
}

#[derive(Clone, Copy)]
struct BrowserEffects {
    state: WidgetState,
    inputs: FormInputs,
}

impl SubmitEffects for BrowserEffects {
    type Popup = web_sys::Window;

    fn enter(&self, phase: wa_lead_shared::Phase) {
        self.state.step(phase);
    }

    fn refill(&self, form: &LeadForm) {
        self.state.form.try_set(form.clone());
    }

    fn report_invalid(&self, err: &ValidationError) {
        log!("[wa-lead] form rejected: {}", err);
        self.state.config.with_untracked(|c| self.inputs.report(err, &c.texts));
    }

    fn persist(&self, record: &VisitorRecord) {
        self.state.config.with_untracked(|c| storage::remember(c, record));
    }

    // Called synchronously from the submit handler so the popup still counts
    // as user-initiated.
    fn open_chat(&self, url: &str) -> Option<web_sys::Window> {
        web_sys::window()
            .and_then(|w| w.open_with_url_and_target(url, "_blank").ok())
            .flatten()
    }

    fn context(&self, whatsapp_number: &str) -> SubmissionContext {
        submission_context(whatsapp_number)
    }

    fn emit(&self, name: &str, detail: Value) {
        dom::emit(name, detail);
    }

    async fn lookup_ip(&self) -> Option<String> {
        net::lookup_ip().await
    }

    async fn sleep(&self, ms: u32) {
        net::sleep(ms).await;
        log!("[wa-lead] IP lookup window of {}ms is over", ms);
    }

    async fn deliver(&self, endpoint: &str, payload: &LeadPayload) -> Result<String, WidgetError> {
        net::deliver(endpoint, payload).await
    }

    fn track(&self, event: &AnalyticsEvent) {
        analytics::send(event);
    }

    fn succeeded(&self) {
        self.state.form.try_set(LeadForm::default());
        self.state.close();
    }

    fn failed(&self, err: &WidgetError, notice: &str, popup: Option<web_sys::Window>) {
        error!("[wa-lead] lead delivery failed: {}", err);
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(notice);
        }
        if let Some(popup) = popup {
            let _ = popup.close();
        }
    }
}

fn submission_context(whatsapp_number: &str) -> SubmissionContext {
    let window = web_sys::window();
    let page_url = window
        .as_ref()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default();
    let referrer = window
        .as_ref()
        .and_then(|w| w.document())
        .map(|d| d.referrer())
        .unwrap_or_default();
    let user_agent = window
        .as_ref()
        .and_then(|w| w.navigator().user_agent().ok())
        .unwrap_or_default();

    SubmissionContext {
        lead_id: Uuid::new_v4().to_string(),
        timestamp: action_time(),
        user_agent,
        whatsapp_number: whatsapp_number.to_string(),
        tracking: TrackingContext::collect(&page_url, &referrer),
    }
}

/// Current time as `dd/mm/yyyy, hh:mm:ss` in São Paulo.
fn action_time() -> String {
    let options = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &options,
        &JsValue::from_str("timeZone"),
        &JsValue::from_str(ACTION_TIME_ZONE),
    );
    js_sys::Date::new_0()
        .to_locale_string(ACTION_TIME_LOCALE, &options)
        .into()
}
