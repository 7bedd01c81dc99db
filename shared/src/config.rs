//! Widget configuration: the fully-populated [`WidgetConfig`] and the partial
//! [`ConfigOverrides`] callers hand to `init` / `updateConfig`.
//!
//! Merging is structural: nested records merge field by field, scalars are
//! replaced, and `extraFields` merges key by key. [`WidgetConfig::normalize`]
//! enforces the config invariants afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ConfigWarning;
use crate::visitor::VisitorRecord;

pub const DEFAULT_IP_LOOKUP_TIMEOUT_MS: u32 = 800;
pub const DEFAULT_STORAGE_TTL_MINUTES: u32 = 60 * 24;
pub const DEFAULT_ATTACH_TO: &str = "body";
pub const DEFAULT_BACKGROUND_PATTERN: &str =
    "https://user-images.githubusercontent.com/15075759/28719144-86dc0f70-73b1-11e7-911d-60d70fcded21.png";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    #[serde(rename = "scriptURL")]
    pub script_url: Option<String>,
    pub whatsapp_number: String,
    pub brand_image: Option<String>,
    pub brand_title: String,
    pub brand_status: String,
    pub privacy_policy_url: Option<String>,
    pub intercept_links: bool,
    #[serde(rename = "enableGA4")]
    pub enable_ga4: bool,
    pub ip_lookup_timeout_ms: u32,
    pub background_pattern: Option<String>,
    pub extra_fields: BTreeMap<String, String>,
    pub attach_to: String,
    pub texts: Texts,
    pub theme: Theme,
    pub prefill: VisitorRecord,
    pub storage_key: Option<String>,
    pub storage_expiration_minutes: Option<u32>,
    pub contact_fields: ContactFields,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            script_url: None,
            whatsapp_number: String::new(),
            brand_image: None,
            brand_title: "Minha Marca".into(),
            brand_status: "online".into(),
            privacy_policy_url: Some("#".into()),
            intercept_links: false,
            enable_ga4: false,
            ip_lookup_timeout_ms: DEFAULT_IP_LOOKUP_TIMEOUT_MS,
            background_pattern: Some(DEFAULT_BACKGROUND_PATTERN.into()),
            extra_fields: BTreeMap::new(),
            attach_to: DEFAULT_ATTACH_TO.into(),
            texts: Texts::default(),
            theme: Theme::default(),
            prefill: VisitorRecord::default(),
            storage_key: None,
            storage_expiration_minutes: Some(DEFAULT_STORAGE_TTL_MINUTES),
            contact_fields: ContactFields::default(),
        }
    }
}

/// User-facing labels. Every string here can be overridden through `texts`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Texts {
    pub fab_label: String,
    pub welcome: String,
    pub name_label: String,
    pub name_placeholder: String,
    pub email_label: String,
    pub email_placeholder: String,
    pub phone_label: String,
    pub phone_placeholder: String,
    pub consent_label: String,
    pub privacy_label: String,
    pub submit: String,
    pub sending_label: String,
    pub close_label: String,
    pub error_message: String,
    pub required: String,
    pub invalid_email: String,
    pub invalid_phone: String,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            fab_label: "Abrir atendimento no WhatsApp".into(),
            welcome: "Olá! Para continuarmos, informe seus dados :)".into(),
            name_label: "Nome *".into(),
            name_placeholder: "Seu nome".into(),
            email_label: "Email *".into(),
            email_placeholder: "seu@email".into(),
            phone_label: "Telefone *".into(),
            phone_placeholder: "(11) 99999-9999".into(),
            consent_label: "Aceito receber comunicados".into(),
            privacy_label: "Política de Privacidade".into(),
            submit: "Iniciar conversa".into(),
            sending_label: "Enviando...".into(),
            close_label: "Fechar".into(),
            error_message: "Ocorreu um erro ao enviar os dados. Tente novamente.".into(),
            required: "Por favor, preencha os campos obrigatórios.".into(),
            invalid_email: "Por favor, informe um email válido.".into(),
            invalid_phone: "Por favor, informe um telefone válido.".into(),
        }
    }
}

/// Field label with the required marker: a trailing `*` is added only when
/// the field is required, whatever the configured label carries.
pub fn field_label(label: &str, required: bool) -> String {
    let base = label.trim_end().trim_end_matches('*').trim_end();
    if required {
        format!("{} *", base)
    } else {
        base.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary: String,
    pub primary_hover: String,
    pub primary_text: String,
    pub bubble_bg: String,
    pub input_bg: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "#036d5f".into(),
            primary_hover: "#02594d".into(),
            primary_text: "#ffffff".into(),
            bubble_bg: "#efeae2".into(),
            input_bg: "#e7ffe7".into(),
        }
    }
}

impl Theme {
    /// Inline `style` value exposing the palette as CSS custom properties.
    pub fn css_variables(&self) -> String {
        [
            ("primary", &self.primary),
            ("primary-hover", &self.primary_hover),
            ("primary-text", &self.primary_text),
            ("bubble-bg", &self.bubble_bg),
            ("input-bg", &self.input_bg),
        ]
        .iter()
        .map(|(name, value)| format!("--wa-lead-{}:{};", name, sanitize_css_value(value)))
        .collect()
    }
}

// Values land inside a style attribute; anything that could close the
// declaration is dropped.
fn sanitize_css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\''))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FieldToggle {
    pub enabled: bool,
    pub required: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ContactFields {
    pub email: FieldToggle,
    pub phone: FieldToggle,
}

impl Default for ContactFields {
    /// Email on and required. Phone off, but required as soon as a caller
    /// switches it on.
    fn default() -> Self {
        Self {
            email: FieldToggle { enabled: true, required: true },
            phone: FieldToggle { enabled: false, required: true },
        }
    }
}

// ============================================================
// Overrides (what callers actually pass)
// ============================================================

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    #[serde(rename = "scriptURL")]
    pub script_url: Option<String>,
    #[serde(deserialize_with = "stringish")]
    pub whatsapp_number: Option<String>,
    pub brand_image: Option<String>,
    pub brand_title: Option<String>,
    pub brand_status: Option<String>,
    pub privacy_policy_url: Option<String>,
    pub intercept_links: Option<bool>,
    #[serde(rename = "enableGA4")]
    pub enable_ga4: Option<bool>,
    pub ip_lookup_timeout_ms: Option<u32>,
    pub background_pattern: Option<String>,
    pub extra_fields: Option<BTreeMap<String, Value>>,
    pub attach_to: Option<String>,
    pub texts: Option<TextsOverrides>,
    pub theme: Option<ThemeOverrides>,
    pub prefill: Option<PrefillOverrides>,
    pub storage_key: Option<String>,
    /// Outer `None`: key absent, keep the current TTL. `Some(None)`: `null`
    /// or `0`, stored visitors never expire.
    #[serde(deserialize_with = "ttl_minutes")]
    pub storage_expiration_minutes: Option<Option<u32>>,
    pub contact_fields: Option<ContactFieldsOverrides>,
}

impl ConfigOverrides {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextsOverrides {
    pub fab_label: Option<String>,
    pub welcome: Option<String>,
    pub name_label: Option<String>,
    pub name_placeholder: Option<String>,
    pub email_label: Option<String>,
    pub email_placeholder: Option<String>,
    pub phone_label: Option<String>,
    pub phone_placeholder: Option<String>,
    pub consent_label: Option<String>,
    pub privacy_label: Option<String>,
    pub submit: Option<String>,
    pub sending_label: Option<String>,
    pub close_label: Option<String>,
    pub error_message: Option<String>,
    pub required: Option<String>,
    pub invalid_email: Option<String>,
    pub invalid_phone: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeOverrides {
    pub primary: Option<String>,
    pub primary_hover: Option<String>,
    pub primary_text: Option<String>,
    pub bubble_bg: Option<String>,
    pub input_bg: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrefillOverrides {
    #[serde(alias = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "telefone", deserialize_with = "stringish")]
    pub phone: Option<String>,
    pub consent: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactFieldsOverrides {
    pub email: Option<FieldToggleOverrides>,
    pub phone: Option<FieldToggleOverrides>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FieldToggleOverrides {
    pub enabled: Option<bool>,
    pub required: Option<bool>,
}

/// Accepts a string or a bare JSON number (`5511988887777`).
fn stringish<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

fn ttl_minutes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<u32>>, D::Error> {
    let minutes = Option::<u32>::deserialize(deserializer)?;
    Ok(Some(minutes.filter(|m| *m > 0)))
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn set<T: Clone>(target: &mut T, source: &Option<T>) {
    if let Some(value) = source {
        *target = value.clone();
    }
}

fn set_some<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        *target = source.clone();
    }
}

impl WidgetConfig {
    /// Defaults merged with `overrides`, then normalized.
    pub fn from_overrides(overrides: &ConfigOverrides) -> (Self, Vec<ConfigWarning>) {
        let mut config = Self::default().merged(overrides);
        let warnings = config.normalize();
        (config, warnings)
    }

    /// Returns a copy of `self` with `overrides` merged on top. Not normalized.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Self {
        let mut out = self.clone();
        let o = overrides;

        set_some(&mut out.script_url, &o.script_url);
        set(&mut out.whatsapp_number, &o.whatsapp_number);
        set_some(&mut out.brand_image, &o.brand_image);
        set(&mut out.brand_title, &o.brand_title);
        set(&mut out.brand_status, &o.brand_status);
        set_some(&mut out.privacy_policy_url, &o.privacy_policy_url);
        set(&mut out.intercept_links, &o.intercept_links);
        set(&mut out.enable_ga4, &o.enable_ga4);
        set(&mut out.ip_lookup_timeout_ms, &o.ip_lookup_timeout_ms);
        set_some(&mut out.background_pattern, &o.background_pattern);
        set(&mut out.attach_to, &o.attach_to);
        set_some(&mut out.storage_key, &o.storage_key);
        set(&mut out.storage_expiration_minutes, &o.storage_expiration_minutes);

        if let Some(extra) = &o.extra_fields {
            for (key, value) in extra {
                match value_to_string(value.clone()) {
                    Some(text) => {
                        out.extra_fields.insert(key.clone(), text);
                    }
                    None => {
                        out.extra_fields.remove(key);
                    }
                }
            }
        }

        if let Some(t) = &o.texts {
            let texts = &mut out.texts;
            set(&mut texts.fab_label, &t.fab_label);
            set(&mut texts.welcome, &t.welcome);
            set(&mut texts.name_label, &t.name_label);
            set(&mut texts.name_placeholder, &t.name_placeholder);
            set(&mut texts.email_label, &t.email_label);
            set(&mut texts.email_placeholder, &t.email_placeholder);
            set(&mut texts.phone_label, &t.phone_label);
            set(&mut texts.phone_placeholder, &t.phone_placeholder);
            set(&mut texts.consent_label, &t.consent_label);
            set(&mut texts.privacy_label, &t.privacy_label);
            set(&mut texts.submit, &t.submit);
            set(&mut texts.sending_label, &t.sending_label);
            set(&mut texts.close_label, &t.close_label);
            set(&mut texts.error_message, &t.error_message);
            set(&mut texts.required, &t.required);
            set(&mut texts.invalid_email, &t.invalid_email);
            set(&mut texts.invalid_phone, &t.invalid_phone);
        }

        if let Some(t) = &o.theme {
            let theme = &mut out.theme;
            set(&mut theme.primary, &t.primary);
            set(&mut theme.primary_hover, &t.primary_hover);
            set(&mut theme.primary_text, &t.primary_text);
            set(&mut theme.bubble_bg, &t.bubble_bg);
            set(&mut theme.input_bg, &t.input_bg);
        }

        if let Some(p) = &o.prefill {
            set(&mut out.prefill.name, &p.name);
            set(&mut out.prefill.email, &p.email);
            set(&mut out.prefill.phone, &p.phone);
            set(&mut out.prefill.consent, &p.consent);
        }

        if let Some(c) = &o.contact_fields {
            merge_toggle(&mut out.contact_fields.email, &c.email);
            merge_toggle(&mut out.contact_fields.phone, &c.phone);
        }

        out
    }

    /// Enforces the config invariants in place and reports what it had to fix.
    pub fn normalize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        self.whatsapp_number = normalize_number(&self.whatsapp_number);
        if self.whatsapp_number.is_empty() {
            warnings.push(ConfigWarning::MissingNumber);
        }

        for toggle in [&mut self.contact_fields.email, &mut self.contact_fields.phone] {
            if !toggle.enabled {
                toggle.required = false;
            }
        }

        if self.storage_expiration_minutes == Some(0) {
            self.storage_expiration_minutes = None;
        }

        warnings
    }

    /// Backend endpoint, if one is configured and non-blank.
    pub fn endpoint(&self) -> Option<&str> {
        self.script_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// Storage key, if persistence is configured.
    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

fn merge_toggle(target: &mut FieldToggle, source: &Option<FieldToggleOverrides>) {
    if let Some(toggle) = source {
        set(&mut target.enabled, &toggle.enabled);
        set(&mut target.required, &toggle.required);
    }
}

/// Strips every non-digit character: `"+55 (11) 98888-7777"` → `"5511988887777"`.
pub fn normalize_number(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
