use gloo_net::http::Request;
use leptos::logging::log;
use serde::Deserialize;
use wa_lead_shared::{LeadPayload, WidgetError};
use wasm_bindgen_futures::JsFuture;
use web_sys::FormData;

use crate::dom::js_error;

const IP_ECHO_URL: &str = "https://api.ipify.org?format=json";

#[derive(Deserialize)]
struct IpEcho {
    ip: String,
}

/// Visitor IP from the public echo service. `None` on HTTP error or bad JSON.
/// The caller bounds the wait; the request itself is never aborted.
pub async fn lookup_ip() -> Option<String> {
    let resp = Request::get(IP_ECHO_URL).send().await.ok()?;
    if !resp.ok() {
        log!("[wa-lead] IP lookup answered {}", resp.status());
        return None;
    }
    resp.json::<IpEcho>().await.ok().map(|echo| echo.ip)
}

pub async fn sleep(ms: u32) {
    let delay = i32::try_from(ms).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, delay);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// POSTs the payload as form fields and returns the response body.
pub async fn deliver(url: &str, payload: &LeadPayload) -> Result<String, WidgetError> {
    let form = FormData::new().map_err(js_error)?;
    for (key, value) in payload.iter() {
        form.append_with_str(key, value).map_err(js_error)?;
    }

    let resp = Request::post(url)
        .body(form)
        .map_err(|e| WidgetError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| WidgetError::Network(e.to_string()))?;

    let body = resp.text().await.unwrap_or_default();
    if !resp.ok() {
        log!("[wa-lead] backend answered {}: {}", resp.status(), body);
        return Err(WidgetError::Delivery { status: resp.status() });
    }

    log!("[wa-lead] lead delivered: {}", body);
    Ok(body)
}
