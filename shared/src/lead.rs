//! The lead form: validation, the WhatsApp message, and the outbound payload.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::config::{ContactFields, FieldToggle, Texts};
use crate::tracking::TrackingContext;
use crate::visitor::VisitorRecord;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static email pattern"));

const MIN_PHONE_DIGITS: usize = 8;

/// Second copy of the timestamp, under the column name lead sheets expect.
pub const ACTION_TIME_FIELD: &str = "data/hora da ação";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Phone,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Malformed,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Problem::Missing => "missing",
            Problem::Malformed => "malformed",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{field} is {problem}")]
pub struct ValidationError {
    pub field: Field,
    pub problem: Problem,
}

impl ValidationError {
    /// The label shown through the input's native validity bubble.
    pub fn message<'a>(&self, texts: &'a Texts) -> &'a str {
        match (self.problem, self.field) {
            (Problem::Missing, _) | (Problem::Malformed, Field::Name) => &texts.required,
            (Problem::Malformed, Field::Email) => &texts.invalid_email,
            (Problem::Malformed, Field::Phone) => &texts.invalid_phone,
        }
    }
}

/// Raw values as typed into the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub consent: bool,
}

impl From<VisitorRecord> for LeadForm {
    fn from(record: VisitorRecord) -> Self {
        Self {
            name: record.name,
            email: record.email,
            phone: record.phone,
            consent: record.consent,
        }
    }
}

/// A form that passed validation. Disabled fields are blanked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub consent: bool,
}

impl LeadForm {
    /// Stored visitor first, its empty fields filled from the configured prefill.
    pub fn prefilled(stored: Option<VisitorRecord>, prefill: &VisitorRecord) -> Self {
        Self::from(stored.unwrap_or_default().or_fallback(prefill))
    }

    /// The same form with surrounding whitespace removed from each text field.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            consent: self.consent,
        }
    }

    /// Trims every field and checks it against the enabled contact fields.
    /// The first failing field is reported, in form order.
    pub fn validate(&self, fields: &ContactFields) -> Result<Lead, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError { field: Field::Name, problem: Problem::Missing });
        }

        let email = check(Field::Email, &self.email, fields.email, |v| EMAIL_RE.is_match(v))?;
        let phone = check(Field::Phone, &self.phone, fields.phone, |v| {
            v.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
        })?;

        Ok(Lead {
            name: name.to_string(),
            email,
            phone,
            consent: self.consent,
        })
    }
}

fn check(
    field: Field,
    raw: &str,
    toggle: FieldToggle,
    is_valid: impl Fn(&str) -> bool,
) -> Result<Option<String>, ValidationError> {
    if !toggle.enabled {
        return Ok(None);
    }
    let value = raw.trim();
    if value.is_empty() {
        return if toggle.required {
            Err(ValidationError { field, problem: Problem::Missing })
        } else {
            Ok(None)
        };
    }
    if !is_valid(value) {
        return Err(ValidationError { field, problem: Problem::Malformed });
    }
    Ok(Some(value.to_string()))
}

impl Lead {
    /// The pre-filled chat message, fragments joined by single spaces.
    pub fn compose_message(&self) -> String {
        let mut parts = vec![format!("Olá! Meu nome é {}.", self.name)];
        if let Some(email) = &self.email {
            parts.push(format!("Email: {}", email));
        }
        if let Some(phone) = &self.phone {
            parts.push(format!("Telefone: {}", phone));
        }
        if self.consent {
            parts.push("Aceitou receber comunicados.".to_string());
        }
        parts.join(" ")
    }

    pub fn to_record(&self) -> VisitorRecord {
        VisitorRecord {
            name: self.name.clone(),
            email: self.email.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            consent: self.consent,
        }
    }
}

/// Per-submission facts the browser supplies.
#[derive(Clone, Debug, Default)]
pub struct SubmissionContext {
    pub lead_id: String,
    /// Local time in São Paulo, pt-BR format (`16/10/2026, 09:30:00`).
    pub timestamp: String,
    pub user_agent: String,
    pub whatsapp_number: String,
    pub tracking: TrackingContext,
}

/// Flat field-name → value map sent as form fields to the backend.
///
/// Field names follow the lead backends already in use: `nome`, `telefone`
/// and a `Sim` / `Não` consent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadPayload(BTreeMap<String, String>);

impl LeadPayload {
    /// Base fields, then tracking fields, then `extra` (which wins on
    /// key collisions).
    pub fn assemble(
        lead: &Lead,
        ctx: &SubmissionContext,
        extra: &BTreeMap<String, String>,
    ) -> Self {
        let mut fields = BTreeMap::new();
        let mut put = |key: &str, value: &str| {
            fields.insert(key.to_string(), value.to_string());
        };

        put("leadId", &ctx.lead_id);
        put("nome", &lead.name);
        put("email", lead.email.as_deref().unwrap_or_default());
        put("telefone", lead.phone.as_deref().unwrap_or_default());
        put("consent", if lead.consent { "Sim" } else { "Não" });
        put("timestamp", &ctx.timestamp);
        put(ACTION_TIME_FIELD, &ctx.timestamp);
        put("userAgent", &ctx.user_agent);
        put("pageUrl", &ctx.tracking.page_url);
        put("whatsappNumber", &ctx.whatsapp_number);

        for (key, value) in ctx.tracking.fields() {
            put(key, value);
        }
        for (key, value) in extra {
            put(key.as_str(), value.as_str());
        }

        Self(fields)
    }

    /// Adds the visitor IP. An `extraFields` entry with the same key is kept.
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        if let Some(ip) = ip.filter(|ip| !ip.is_empty()) {
            self.0.entry("userIP".to_string()).or_insert(ip);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(email: (bool, bool), phone: (bool, bool)) -> ContactFields {
        ContactFields {
            email: FieldToggle { enabled: email.0, required: email.1 },
            phone: FieldToggle { enabled: phone.0, required: phone.1 },
        }
    }

    fn form(name: &str, email: &str, phone: &str, consent: bool) -> LeadForm {
        LeadForm {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            consent,
        }
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = form("   ", "ana@x.com", "", false)
            .validate(&ContactFields::default())
            .unwrap_err();
        assert_eq!(err, ValidationError { field: Field::Name, problem: Problem::Missing });
        assert_eq!(err.to_string(), "name is missing");
        assert_eq!(err.message(&Texts::default()), Texts::default().required);
    }

    #[test]
    fn email_checked_only_when_filled_or_required() {
        let optional = fields((true, false), (true, false));
        assert!(form("Ana", "", "", false).validate(&optional).is_ok());

        let err = form("Ana", "ana@x", "", false).validate(&optional).unwrap_err();
        assert_eq!(err, ValidationError { field: Field::Email, problem: Problem::Malformed });

        let required = fields((true, true), (true, false));
        let err = form("Ana", " ", "", false).validate(&required).unwrap_err();
        assert_eq!(err, ValidationError { field: Field::Email, problem: Problem::Missing });
    }

    #[test]
    fn malformed_fields_get_their_own_message() {
        let texts = Texts::default();
        let email = ValidationError { field: Field::Email, problem: Problem::Malformed };
        let phone = ValidationError { field: Field::Phone, problem: Problem::Malformed };
        assert_eq!(email.message(&texts), texts.invalid_email);
        assert_eq!(phone.message(&texts), texts.invalid_phone);
    }

    #[test]
    fn phone_needs_eight_digits() {
        let f = fields((false, false), (true, false));
        let err = form("Ana", "", "(11) 9988", false).validate(&f).unwrap_err();
        assert_eq!(err.field, Field::Phone);
        assert_eq!(err.problem, Problem::Malformed);

        let lead = form("Ana", "", "(11) 9988-7766", false).validate(&f).unwrap();
        assert_eq!(lead.phone.as_deref(), Some("(11) 9988-7766"));
    }

    #[test]
    fn disabled_fields_are_ignored_even_if_garbage() {
        let lead = form("Ana", "nope", "12", false)
            .validate(&fields((false, false), (false, false)))
            .unwrap();
        assert_eq!(lead.email, None);
        assert_eq!(lead.phone, None);
    }

    #[test]
    fn message_for_name_email_and_consent() {
        let lead = form(" Ana ", "ana@x.com", "", true)
            .validate(&fields((true, false), (false, false)))
            .unwrap();
        assert_eq!(
            lead.compose_message(),
            "Olá! Meu nome é Ana. Email: ana@x.com Aceitou receber comunicados."
        );
    }

    #[test]
    fn message_with_phone_and_no_consent() {
        let lead = form("Bia", "", "11 98888 7777", false)
            .validate(&fields((true, false), (true, false)))
            .unwrap();
        assert_eq!(lead.compose_message(), "Olá! Meu nome é Bia. Telefone: 11 98888 7777");
    }

    #[test]
    fn trimmed_keeps_consent() {
        let trimmed = form("  Ana ", " ana@x.com", "11 ", true).trimmed();
        assert_eq!(trimmed, form("Ana", "ana@x.com", "11", true));
    }

    #[test]
    fn prefilled_prefers_stored_visitor() {
        let stored = VisitorRecord { name: "Ana".into(), ..VisitorRecord::default() };
        let prefill = VisitorRecord {
            name: "Bia".into(),
            email: "bia@x.com".into(),
            ..VisitorRecord::default()
        };

        let form = LeadForm::prefilled(Some(stored), &prefill);
        assert_eq!(form.name, "Ana");
        assert_eq!(form.email, "bia@x.com");

        assert_eq!(LeadForm::prefilled(None, &prefill).name, "Bia");
    }

    fn context(tracking: TrackingContext) -> SubmissionContext {
        SubmissionContext {
            lead_id: "id-1".into(),
            timestamp: "16/10/2026, 09:30:00".into(),
            user_agent: "test".into(),
            whatsapp_number: "5511".into(),
            tracking,
        }
    }

    #[test]
    fn payload_uses_backend_field_names() {
        let lead = form("Ana", "ana@x.com", "", true)
            .validate(&fields((true, true), (false, false)))
            .unwrap();
        let tracking = TrackingContext::collect("https://s.example/?gbraid=G1", "https://google.com/");
        let payload = LeadPayload::assemble(&lead, &context(tracking), &BTreeMap::new());

        assert_eq!(payload.get("nome"), Some("Ana"));
        assert_eq!(payload.get("email"), Some("ana@x.com"));
        assert_eq!(payload.get("telefone"), Some(""));
        assert_eq!(payload.get("consent"), Some("Sim"));
        assert_eq!(payload.get("timestamp"), Some("16/10/2026, 09:30:00"));
        assert_eq!(payload.get(ACTION_TIME_FIELD), Some("16/10/2026, 09:30:00"));
        assert_eq!(payload.get("gbraid"), Some("G1"));
        assert_eq!(payload.get("page_url"), Some("https://s.example/?gbraid=G1"));
        assert_eq!(payload.get("referrer"), Some("https://google.com/"));
        assert_eq!(payload.get("name"), None);
    }

    #[test]
    fn consent_not_given_reads_nao() {
        let lead = form("Ana", "ana@x.com", "", false)
            .validate(&ContactFields::default())
            .unwrap();
        let payload =
            LeadPayload::assemble(&lead, &SubmissionContext::default(), &BTreeMap::new());
        assert_eq!(payload.get("consent"), Some("Não"));
        assert_eq!(payload.get("referrer"), None);
    }

    #[test]
    fn extra_fields_override_base_and_tracking() {
        let lead = form("Ana", "ana@x.com", "", true)
            .validate(&ContactFields::default())
            .unwrap();
        let mut tracking = TrackingContext::collect("https://s.example/?utm_source=ads", "");
        tracking.params.insert("utm_medium".into(), "cpc".into());
        let extra = BTreeMap::from([
            ("utm_source".to_string(), "partner".to_string()),
            ("origin".to_string(), "lp".to_string()),
        ]);

        let payload = LeadPayload::assemble(&lead, &context(tracking), &extra);
        assert_eq!(payload.get("utm_source"), Some("partner"));
        assert_eq!(payload.get("utm_medium"), Some("cpc"));
        assert_eq!(payload.get("origin"), Some("lp"));
        assert_eq!(payload.get("pageUrl"), Some("https://s.example/?utm_source=ads"));
    }

    #[test]
    fn ip_is_optional() {
        let lead = form("Ana", "ana@x.com", "", false)
            .validate(&ContactFields::default())
            .unwrap();
        let base = LeadPayload::assemble(&lead, &SubmissionContext::default(), &BTreeMap::new());

        assert_eq!(base.clone().with_ip(None).get("userIP"), None);
        assert_eq!(base.clone().with_ip(Some(String::new())).get("userIP"), None);
        assert_eq!(base.with_ip(Some("203.0.113.9".into())).get("userIP"), Some("203.0.113.9"));
    }
}
