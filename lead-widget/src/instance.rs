//! Lifetime of the one mounted widget.
//!
//! `init` mounts a new instance or, if one is already live, only retargets its
//! number. `destroy` unmounts it, removes its nodes and document listeners,
//! and frees the slot for the next `init`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::logging::{log, warn};
use leptos::prelude::*;
use leptos::reactive::owner::Owner;
use serde_json::json;
use wa_lead_shared::config::normalize_number;
use wa_lead_shared::{ConfigOverrides, ConfigWarning, LeadForm, WidgetConfig, WidgetError};
use web_sys::HtmlElement;

use crate::intercept::LinkInterceptor;
use crate::state::WidgetState;
use crate::{dom, storage, view};

thread_local! {
    static ACTIVE: RefCell<Option<Rc<WidgetInstance>>> = const { RefCell::new(None) };
}

pub struct WidgetInstance {
    state: WidgetState,
    root: HtmlElement,
    owner: Owner,
    unmount: RefCell<Option<Box<dyn FnOnce()>>>,
    interceptor: RefCell<Option<LinkInterceptor>>,
    destroyed: Cell<bool>,
}

fn log_warnings(warnings: &[ConfigWarning]) {
    for warning in warnings {
        warn!("[wa-lead] {}", warning);
    }
}

/// The stored visitor, topped up from the configured prefill.
fn initial_form(config: &WidgetConfig) -> LeadForm {
    LeadForm::prefilled(storage::recall(config), &config.prefill)
}

impl WidgetInstance {
    pub fn active() -> Option<Rc<WidgetInstance>> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    pub fn init(overrides: &ConfigOverrides) -> Result<Rc<WidgetInstance>, WidgetError> {
        if let Some(active) = Self::active() {
            if let Some(number) = &overrides.whatsapp_number {
                active.set_number(number);
            }
            log!("[wa-lead] already mounted, only the number was updated");
            return Ok(active);
        }

        let instance = Rc::new(Self::mount(overrides)?);
        ACTIVE.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&instance)));
        Ok(instance)
    }

    fn mount(overrides: &ConfigOverrides) -> Result<Self, WidgetError> {
        let (config, warnings) = WidgetConfig::from_overrides(overrides);
        log_warnings(&warnings);

        let document = dom::document().ok_or_else(|| WidgetError::Dom("no document".into()))?;
        dom::ensure_stylesheet(&document)?;
        let root = dom::create_root(&document, &config.attach_to)?;

        let form = initial_form(&config);
        let intercept_links = config.intercept_links;

        let owner = Owner::new();
        let (state, unmount) = owner.with(|| {
            let state = WidgetState::new(config, form);
            let handle = leptos::mount::mount_to(root.clone(), move || {
                view::LeadWidget(view::LeadWidgetProps { state })
            });
            let unmount: Box<dyn FnOnce()> = Box::new(move || drop(handle));
            (state, unmount)
        });

        let interceptor = if intercept_links {
            Some(LinkInterceptor::install(state)?)
        } else {
            None
        };

        log!("[wa-lead] mounted ({})", state.current_number());
        Ok(Self {
            state,
            root,
            owner,
            unmount: RefCell::new(Some(unmount)),
            interceptor: RefCell::new(interceptor),
            destroyed: Cell::new(false),
        })
    }

    fn is_live(&self) -> bool {
        if self.destroyed.get() {
            warn!("[wa-lead] call on a destroyed widget ignored");
            return false;
        }
        true
    }

    pub fn open(&self, number: Option<String>) {
        if self.is_live() {
            self.state.open(number);
        }
    }

    pub fn close(&self) {
        if self.is_live() {
            self.state.close();
        }
    }

    pub fn set_number(&self, number: &str) {
        if !self.is_live() {
            return;
        }
        let digits = normalize_number(number);
        if digits.is_empty() {
            warn!("[wa-lead] {}", ConfigWarning::MissingNumber);
        }
        self.state.config.update(|c| c.whatsapp_number = digits.clone());
        dom::emit("update", json!({ "whatsappNumber": digits }));
    }

    pub fn update_config(&self, overrides: &ConfigOverrides) -> Result<(), WidgetError> {
        if !self.is_live() {
            return Ok(());
        }
        let current = self.state.config.get_untracked();
        let mut next = current.merged(overrides);
        log_warnings(&next.normalize());

        if next.attach_to != current.attach_to {
            let document = dom::document().ok_or_else(|| WidgetError::Dom("no document".into()))?;
            dom::attach(&document, &self.root, &next.attach_to)?;
        }
        self.set_interception(next.intercept_links)?;

        let detail = serde_json::to_value(&next).unwrap_or_default();
        let form = initial_form(&next);
        self.state.config.set(next);
        self.state.form.set(form);
        dom::emit("update", json!({ "config": detail }));
        Ok(())
    }

    fn set_interception(&self, enabled: bool) -> Result<(), WidgetError> {
        let mut slot = self.interceptor.borrow_mut();
        match (enabled, slot.is_some()) {
            (true, false) => *slot = Some(LinkInterceptor::install(self.state)?),
            // Dropping the interceptor removes its document listener
            (false, true) => *slot = None,
            _ => {}
        }
        Ok(())
    }

    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.interceptor.borrow_mut().take();
        dom::emit("destroy", json!({}));

        if let Some(unmount) = self.unmount.borrow_mut().take() {
            unmount();
        }
        self.owner.cleanup();
        self.root.remove();

        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|active| std::ptr::eq(Rc::as_ptr(active), self)) {
                *slot = None;
            }
        });
        log!("[wa-lead] destroyed");
    }
}
