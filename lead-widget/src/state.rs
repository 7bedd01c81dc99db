use leptos::logging::warn;
use leptos::prelude::*;
use serde_json::json;
use wa_lead_shared::config::normalize_number;
use wa_lead_shared::{AnalyticsEvent, LeadForm, Phase, WidgetConfig};

use crate::{analytics, dom};

/// Reactive handles shared by the view, the JS API and the link interceptor.
/// Every field is an arena handle, so the struct is `Copy`.
#[derive(Clone, Copy)]
pub struct WidgetState {
    pub config: RwSignal<WidgetConfig>,
    pub is_open: RwSignal<bool>,
    /// Number chosen for the current opening (intercepted link or `open(n)`).
    pub target: RwSignal<Option<String>>,
    pub form: RwSignal<LeadForm>,
    pub phase: RwSignal<Phase>,
}

impl WidgetState {
    pub fn new(config: WidgetConfig, form: LeadForm) -> Self {
        Self {
            config: RwSignal::new(config),
            is_open: RwSignal::new(false),
            target: RwSignal::new(None),
            form: RwSignal::new(form),
            phase: RwSignal::new(Phase::Idle),
        }
    }

    pub fn open(&self, number: Option<String>) {
        let number = number
            .map(|n| normalize_number(&n))
            .filter(|n| !n.is_empty());
        self.target.set(number);
        self.is_open.set(true);

        let number = self.current_number();
        dom::emit("open", json!({ "number": number }));
        if self.config.with_untracked(|c| c.enable_ga4) {
            analytics::send(&AnalyticsEvent::widget_opened(&number));
        }
    }

    pub fn close(&self) {
        // May run after destroy() from a settling submission.
        if !self.is_open.try_get_untracked().unwrap_or(false) {
            return;
        }
        self.is_open.set(false);
        self.target.set(None);
        dom::emit("close", json!({}));
    }

    /// The number the next redirect goes to.
    pub fn current_number(&self) -> String {
        self.target
            .get_untracked()
            .unwrap_or_else(|| self.config.with_untracked(|c| c.whatsapp_number.clone()))
    }

    pub fn step(&self, to: Phase) {
        self.phase.try_update(|phase| match phase.advance(to) {
            Some(next) => *phase = next,
            None => warn!("[wa-lead] ignoring transition {:?} -> {:?}", phase, to),
        });
    }
}
