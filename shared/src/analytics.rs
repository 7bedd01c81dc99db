//! GA4 events. Sent through `gtag` when the page has it, otherwise pushed to
//! `dataLayer` as a flat record with camelCased keys.

use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsEvent {
    pub name: &'static str,
    pub params: Map<String, Value>,
}

fn engagement(label: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("event_category".into(), "engagement".into());
    params.insert("event_label".into(), label.into());
    params.insert("value".into(), 1.into());
    params
}

impl AnalyticsEvent {
    /// The modal was opened, targeting `number`.
    pub fn widget_opened(number: &str) -> Self {
        let mut params = engagement("WhatsApp Widget");
        params.insert("widget_number".into(), number.into());
        Self { name: "whatsappWidgetOpen", params }
    }

    /// A lead was delivered (or there was no backend to deliver to).
    pub fn lead_sent(lead_id: Option<&str>) -> Self {
        let mut params = engagement("WhatsApp Form");
        if let Some(id) = lead_id {
            params.insert("lead_id".into(), id.into());
        }
        Self { name: "whatsappClick", params }
    }

    /// `{ "event": name, ...params }` with `snake_case` keys camelCased.
    pub fn data_layer_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("event".into(), self.name.into());
        for (key, value) in &self.params {
            entry.insert(camel_case(key), value.clone());
        }
        Value::Object(entry)
    }
}

/// `event_category` → `eventCategory`. Only an underscore followed by a
/// lowercase ASCII letter is folded.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '_' && next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_event_carries_the_number() {
        let event = AnalyticsEvent::widget_opened("5511988887777");
        assert_eq!(event.name, "whatsappWidgetOpen");
        assert_eq!(event.params["widget_number"], "5511988887777");
        assert_eq!(event.params["event_category"], "engagement");
    }

    #[test]
    fn data_layer_entry_is_flat_and_camel_cased() {
        let entry = AnalyticsEvent::widget_opened("55").data_layer_entry();
        assert_eq!(
            entry,
            json!({
                "event": "whatsappWidgetOpen",
                "eventCategory": "engagement",
                "eventLabel": "WhatsApp Widget",
                "value": 1,
                "widgetNumber": "55",
            })
        );
    }

    #[test]
    fn camel_case_leaves_other_underscores() {
        assert_eq!(camel_case("lead_id"), "leadId");
        assert_eq!(camel_case("a_1"), "a_1");
        assert_eq!(camel_case("trailing_"), "trailing_");
    }
}
