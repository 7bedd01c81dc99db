use leptos::html;
use leptos::prelude::*;
use wa_lead_shared::config::{field_label, Texts};
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, KeyboardEvent};

use crate::dom;
use crate::state::WidgetState;
use crate::submit::{self, FormInputs};

const FOCUSABLE: &str = "a[href], button:not([disabled]), input:not([disabled])";

#[component]
pub fn LeadWidget(state: WidgetState) -> impl IntoView {
    let WidgetState { config, is_open, form, phase, .. } = state;
    let inputs = FormInputs::new();
    let dialog_ref = NodeRef::<html::Div>::new();

    let text = move |pick: fn(&Texts) -> String| config.with(|c| pick(&c.texts));
    let email_field = move || config.with(|c| c.contact_fields.email);
    let phone_field = move || config.with(|c| c.contact_fields.phone);
    let busy = move || phase.get().is_busy();

    // Focus the first field whenever the dialog opens
    Effect::new(move |_| {
        if is_open.get() {
            request_animation_frame(move || {
                if let Some(input) = inputs.name.get_untracked() {
                    let _ = input.focus();
                }
            });
        }
    });

    let on_keydown = move |e: KeyboardEvent| match e.key().as_str() {
        "Escape" => {
            e.prevent_default();
            state.close();
        }
        "Tab" => trap_focus(&e, dialog_ref),
        _ => {}
    };

    // ============================================================
    // UI
    // ============================================================
    view! {
        <div class="wa-lead" style=move || config.with(|c| c.theme.css_variables())>
            <button
                type="button"
                class="wa-lead-fab"
                aria-haspopup="dialog"
                aria-label=move || text(|t| t.fab_label.clone())
                aria-expanded=move || is_open.get().to_string()
                on:click=move |_| {
                    if is_open.get_untracked() { state.close() } else { state.open(None) }
                }
            >
                <svg viewBox="0 0 24 24" width="28" height="28" aria-hidden="true">
                    <path fill="currentColor" d="M12 2a10 10 0 0 0-8.6 15.1L2 22l5-1.3A10 10 0 1 0 12 2zm0 18.2c-1.5 0-3-.4-4.2-1.2l-.3-.2-3 .8.8-2.9-.2-.3A8.2 8.2 0 1 1 12 20.2zm4.5-6.1c-.2-.1-1.5-.7-1.7-.8-.2-.1-.4-.1-.6.1l-.8 1c-.1.2-.3.2-.5.1a6.7 6.7 0 0 1-3.3-2.9c-.2-.4.2-.4.7-1.3.1-.2 0-.3 0-.4l-.8-1.8c-.2-.5-.4-.4-.6-.4h-.5c-.2 0-.4.1-.7.3-.2.3-.9.9-.9 2.1s.9 2.5 1 2.6c.1.2 1.8 2.8 4.4 3.9 1.6.7 2.3.8 3.1.6.5-.1 1.5-.6 1.7-1.2.2-.6.2-1.1.2-1.2-.1-.1-.3-.2-.5-.3z"/>
                </svg>
            </button>

            <Show when=move || is_open.get()>
                <div class="wa-lead-overlay" on:click=move |_| state.close()></div>
                <div
                    class="wa-lead-dialog"
                    role="dialog"
                    aria-modal="true"
                    aria-labelledby="wa-lead-title"
                    node_ref=dialog_ref
                    on:keydown=on_keydown
                >
                    <div class="wa-lead-header">
                        {move || config.with(|c| c.brand_image.clone()).map(|src| view! {
                            <img class="wa-lead-brand" src=src alt="" />
                        })}
                        <div class="wa-lead-heading">
                            <strong id="wa-lead-title">{move || config.with(|c| c.brand_title.clone())}</strong>
                            <span class="wa-lead-status">{move || config.with(|c| c.brand_status.clone())}</span>
                        </div>
                        <button
                            type="button"
                            class="wa-lead-close"
                            aria-label=move || text(|t| t.close_label.clone())
                            on:click=move |_| state.close()
                        >
                            "✕"
                        </button>
                    </div>

                    <div class="wa-lead-body" style=move || config.with(|c| background_style(c.background_pattern.as_deref()))>
                        <p class="wa-lead-intro">{move || text(|t| t.welcome.clone())}</p>

                        <form
                            class="wa-lead-form"
                            novalidate=true
                            node_ref=inputs.form
                            on:submit=move |e: leptos::ev::SubmitEvent| {
                                e.prevent_default();
                                submit::submit(state, inputs);
                            }
                        >
                            <label class="wa-lead-field">
                                <span>{move || config.with(|c| field_label(&c.texts.name_label, true))}</span>
                                <input
                                    type="text"
                                    name="name"
                                    autocomplete="name"
                                    required=true
                                    node_ref=inputs.name
                                    placeholder=move || text(|t| t.name_placeholder.clone())
                                    prop:value=move || form.with(|f| f.name.clone())
                                    on:input=move |e| {
                                        inputs.clear_validity();
                                        form.update(|f| f.name = event_target_value(&e));
                                    }
                                />
                            </label>

                            <Show when=move || email_field().enabled>
                                <label class="wa-lead-field">
                                    <span>{move || config.with(|c| field_label(&c.texts.email_label, c.contact_fields.email.required))}</span>
                                    <input
                                        type="email"
                                        name="email"
                                        autocomplete="email"
                                        required=move || email_field().required
                                        node_ref=inputs.email
                                        placeholder=move || text(|t| t.email_placeholder.clone())
                                        prop:value=move || form.with(|f| f.email.clone())
                                        on:input=move |e| {
                                            inputs.clear_validity();
                                            form.update(|f| f.email = event_target_value(&e));
                                        }
                                    />
                                </label>
                            </Show>

                            <Show when=move || phone_field().enabled>
                                <label class="wa-lead-field">
                                    <span>{move || config.with(|c| field_label(&c.texts.phone_label, c.contact_fields.phone.required))}</span>
                                    <input
                                        type="tel"
                                        name="phone"
                                        autocomplete="tel"
                                        inputmode="tel"
                                        required=move || phone_field().required
                                        node_ref=inputs.phone
                                        placeholder=move || text(|t| t.phone_placeholder.clone())
                                        prop:value=move || form.with(|f| f.phone.clone())
                                        on:input=move |e| {
                                            inputs.clear_validity();
                                            form.update(|f| f.phone = event_target_value(&e));
                                        }
                                    />
                                </label>
                            </Show>

                            <label class="wa-lead-consent">
                                <input
                                    type="checkbox"
                                    name="consent"
                                    prop:checked=move || form.with(|f| f.consent)
                                    on:change=move |e| form.update(|f| f.consent = event_target_checked(&e))
                                />
                                <span>{move || text(|t| t.consent_label.clone())}</span>
                                {move || config.with(|c| c.privacy_policy_url.clone()).map(|href| view! {
                                    <a
                                        href=href
                                        target="_blank"
                                        rel="noopener noreferrer"
                                        data-wa-lead-ignore=""
                                    >
                                        {move || text(|t| t.privacy_label.clone())}
                                    </a>
                                })}
                            </label>

                            <button
                                type="submit"
                                class="wa-lead-submit"
                                class:busy=busy
                                disabled=busy
                                aria-busy=move || busy().to_string()
                            >
                                <Show when=busy>
                                    <span class="wa-lead-spinner" aria-hidden="true"></span>
                                </Show>
                                {move || if busy() { text(|t| t.sending_label.clone()) } else { text(|t| t.submit.clone()) }}
                            </button>
                        </form>
                    </div>
                </div>
            </Show>
        </div>
    }
}

fn background_style(pattern: Option<&str>) -> String {
    match pattern {
        Some(url) if !url.trim().is_empty() => {
            format!("background-image:url(\"{}\")", url.replace('"', "%22"))
        }
        _ => String::new(),
    }
}

/// Keeps Tab / Shift+Tab cycling inside the dialog.
fn trap_focus(e: &KeyboardEvent, dialog_ref: NodeRef<html::Div>) {
    let Some(dialog) = dialog_ref.get_untracked() else {
        return;
    };
    let Ok(nodes) = dialog.query_selector_all(FOCUSABLE) else {
        return;
    };
    let focusables: Vec<HtmlElement> = (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect();
    let (Some(first), Some(last)) = (focusables.first(), focusables.last()) else {
        return;
    };

    let active = dom::document().and_then(|d| d.active_element());
    let is_active = |el: &HtmlElement| {
        active
            .as_ref()
            .is_some_and(|a| js_sys::Object::is(a.as_ref(), el.as_ref()))
    };

    if e.shift_key() && is_active(first) {
        e.prevent_default();
        let _ = last.focus();
    } else if !e.shift_key() && is_active(last) {
        e.prevent_default();
        let _ = first.focus();
    }
}
