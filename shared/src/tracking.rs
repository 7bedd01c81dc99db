use std::collections::BTreeMap;

use url::Url;

/// Marketing query parameters copied into every lead.
pub const TRACKED_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "gbraid",
    "wbraid",
    "msclkid",
    "ttclid",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingContext {
    pub page_url: String,
    pub referrer: String,
    pub params: BTreeMap<String, String>,
}

impl TrackingContext {
    /// Extracts the known parameters from `page_url`. Unparseable URLs yield
    /// no parameters; the raw URL is still recorded.
    pub fn collect(page_url: &str, referrer: &str) -> Self {
        let mut params = BTreeMap::new();
        if let Ok(url) = Url::parse(page_url) {
            for (key, value) in url.query_pairs() {
                if TRACKED_PARAMS.iter().any(|known| *known == key) && !value.is_empty() {
                    // First occurrence wins, like URLSearchParams::get.
                    params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
                }
            }
        }

        Self {
            page_url: page_url.to_string(),
            referrer: referrer.to_string(),
            params,
        }
    }

    /// Payload fields: the tracked parameters, then `page_url` and `referrer`
    /// when they are known.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        let known = [("page_url", self.page_url.as_str()), ("referrer", self.referrer.as_str())];
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(known.into_iter().filter(|(_, value)| !value.is_empty()))
    }
}
