//! WhatsApp URL handling: recognizing chat links on the host page and
//! building the `wa.me` deep-link the widget redirects to.

use url::{ParseError, Url};

use crate::config::normalize_number;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// `https://wa.me/<digits>`
    WaMe,
    /// `https://api.whatsapp.com/send?phone=<digits>`
    ApiSend,
    /// `whatsapp://send?phone=<digits>`
    AppScheme,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhatsAppLink {
    pub kind: LinkKind,
    /// Destination number, digits only. `None` when the link carries none.
    pub number: Option<String>,
}

impl WhatsAppLink {
    /// Classifies an anchor `href` as written in the markup. Returns `None`
    /// for anything that is not a WhatsApp chat link. Scheme-relative
    /// (`//wa.me/…`) and bare-host (`wa.me/…`) hrefs are read as `https`.
    pub fn classify(href: &str) -> Option<Self> {
        let url = parse_href(href.trim())?;
        let host = url.host_str().map(str::to_ascii_lowercase);

        match (url.scheme(), host.as_deref()) {
            ("http" | "https", Some("wa.me" | "www.wa.me")) => {
                let segment = url.path_segments()?.next()?;
                let is_number = !segment.is_empty()
                    && segment.chars().all(|c| c.is_ascii_digit() || c == '+')
                    && segment.chars().any(|c| c.is_ascii_digit());
                is_number.then(|| Self {
                    kind: LinkKind::WaMe,
                    number: Some(normalize_number(segment)),
                })
            }
            ("http" | "https", Some("api.whatsapp.com")) => {
                let path = url.path().trim_end_matches('/');
                (path == "/send").then(|| Self {
                    kind: LinkKind::ApiSend,
                    number: phone_param(&url),
                })
            }
            ("whatsapp", Some("send")) => Some(Self {
                kind: LinkKind::AppScheme,
                number: phone_param(&url),
            }),
            _ => None,
        }
    }
}

fn parse_href(href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            if let Some(rest) = href.strip_prefix("//") {
                Url::parse(&format!("https://{}", rest)).ok()
            } else if href.starts_with(&['/', '.', '#', '?'][..]) {
                None
            } else {
                Url::parse(&format!("https://{}", href)).ok()
            }
        }
        Err(_) => None,
    }
}

fn phone_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "phone")
        .map(|(_, value)| normalize_number(&value))
        .filter(|digits| !digits.is_empty())
}

/// `https://wa.me/<digits>?text=<percent-encoded message>`
pub fn deep_link(number: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        normalize_number(number),
        urlencoding::encode(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wa_me_link_yields_number() {
        let link = WhatsAppLink::classify("https://wa.me/5511988887777?text=oi").unwrap();
        assert_eq!(link.kind, LinkKind::WaMe);
        assert_eq!(link.number.as_deref(), Some("5511988887777"));
    }

    #[test]
    fn wa_me_business_short_link_is_ignored() {
        assert_eq!(WhatsAppLink::classify("https://wa.me/message/ABCDEF"), None);
        assert_eq!(WhatsAppLink::classify("https://wa.me/"), None);
    }

    #[test]
    fn api_send_link_reads_phone_query() {
        let link =
            WhatsAppLink::classify("https://api.whatsapp.com/send?phone=+55%2011%2098888-7777&text=x")
                .unwrap();
        assert_eq!(link.kind, LinkKind::ApiSend);
        assert_eq!(link.number.as_deref(), Some("5511988887777"));
    }

    #[test]
    fn api_send_without_phone_still_intercepts() {
        let link = WhatsAppLink::classify("https://api.whatsapp.com/send/?text=hello").unwrap();
        assert_eq!(link.kind, LinkKind::ApiSend);
        assert_eq!(link.number, None);
    }

    #[test]
    fn app_scheme_link_reads_phone_query() {
        let link = WhatsAppLink::classify("whatsapp://send?phone=5511977776666").unwrap();
        assert_eq!(link.kind, LinkKind::AppScheme);
        assert_eq!(link.number.as_deref(), Some("5511977776666"));
    }

    #[test]
    fn scheme_relative_links_are_recognized() {
        let link = WhatsAppLink::classify("//wa.me/5511988887777").unwrap();
        assert_eq!(link.kind, LinkKind::WaMe);
        assert_eq!(link.number.as_deref(), Some("5511988887777"));

        let link = WhatsAppLink::classify("//api.whatsapp.com/send?phone=5511").unwrap();
        assert_eq!(link.kind, LinkKind::ApiSend);
        assert_eq!(link.number.as_deref(), Some("5511"));
    }

    #[test]
    fn bare_host_links_are_recognized() {
        let link = WhatsAppLink::classify("wa.me/5511988887777").unwrap();
        assert_eq!(link.number.as_deref(), Some("5511988887777"));

        let link = WhatsAppLink::classify("api.whatsapp.com/send?phone=5511977776666").unwrap();
        assert_eq!(link.kind, LinkKind::ApiSend);
        assert_eq!(link.number.as_deref(), Some("5511977776666"));
    }

    #[test]
    fn mixed_case_links_are_recognized() {
        let link = WhatsAppLink::classify("HTTPS://WA.ME/5511988887777").unwrap();
        assert_eq!(link.kind, LinkKind::WaMe);
        assert_eq!(WhatsAppLink::classify("WhatsApp://send?phone=55").unwrap().kind, LinkKind::AppScheme);
    }

    #[test]
    fn other_links_are_left_alone() {
        for href in [
            "https://example.com/wa.me/5511",
            "https://api.whatsapp.com/catalog",
            "mailto:ana@x.com",
            "/contato",
            "./wa.me/5511",
            "contato.html",
            "#",
            "?utm_source=x",
            "",
        ] {
            assert_eq!(WhatsAppLink::classify(href), None, "{href}");
        }
    }

    #[test]
    fn deep_link_percent_encodes_message() {
        assert_eq!(
            deep_link("+55 (11) 98888-7777", "Olá! Meu nome é Ana."),
            "https://wa.me/5511988887777?text=Ol%C3%A1%21%20Meu%20nome%20%C3%A9%20Ana."
        );
    }
}
