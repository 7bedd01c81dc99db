use std::cell::RefCell;

use futures::executor::block_on;
use futures::future;
use serde_json::Value;
use wa_lead_shared::lead::{Field, Problem, ACTION_TIME_FIELD};
use wa_lead_shared::{
    begin, settle, AnalyticsEvent, ConfigOverrides, Halt, LeadForm, LeadPayload, Outcome, Phase,
    SubmissionContext, SubmitEffects, TrackingContext, ValidationError, VisitorRecord,
    WidgetConfig, WidgetError,
};

const POPUP: u32 = 7;

/// Records every effect in call order.
struct Recorder {
    ip: Option<&'static str>,
    backend_status: u16,
    calls: RefCell<Vec<String>>,
    phases: RefCell<Vec<Phase>>,
    events: RefCell<Vec<(String, Value)>>,
    delivered: RefCell<Vec<LeadPayload>>,
    refilled: RefCell<Option<LeadForm>>,
    tracked: RefCell<Vec<AnalyticsEvent>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            ip: Some("203.0.113.9"),
            backend_status: 200,
            calls: RefCell::default(),
            phases: RefCell::default(),
            events: RefCell::default(),
            delivered: RefCell::default(),
            refilled: RefCell::default(),
            tracked: RefCell::default(),
        }
    }

    /// IP lookup that never answers.
    fn ip_hangs(mut self) -> Self {
        self.ip = None;
        self
    }

    fn backend_answers(mut self, status: u16) -> Self {
        self.backend_status = status;
        self
    }

    fn note(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn called(&self, call: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == call)
    }

    fn position(&self, call: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("`{call}` never happened: {:?}", self.calls.borrow()))
    }

    fn event_names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|(name, _)| name.clone()).collect()
    }
}

impl SubmitEffects for Recorder {
    type Popup = u32;

    fn enter(&self, phase: Phase) {
        self.phases.borrow_mut().push(phase);
    }

    fn refill(&self, form: &LeadForm) {
        *self.refilled.borrow_mut() = Some(form.clone());
    }

    fn report_invalid(&self, err: &ValidationError) {
        self.note(format!("report_invalid {}", err));
    }

    fn persist(&self, _record: &VisitorRecord) {
        self.note("persist");
    }

    fn open_chat(&self, url: &str) -> Option<u32> {
        self.note(format!("open_chat {}", url));
        self.note("open_chat");
        Some(POPUP)
    }

    fn context(&self, whatsapp_number: &str) -> SubmissionContext {
        SubmissionContext {
            lead_id: "lead-1".into(),
            timestamp: "16/10/2026, 09:30:00".into(),
            user_agent: "Mozilla/5.0".into(),
            whatsapp_number: whatsapp_number.into(),
            tracking: TrackingContext::collect(
                "https://shop.example/?utm_source=ig&gbraid=G1",
                "https://google.com/",
            ),
        }
    }

    fn emit(&self, name: &str, detail: Value) {
        self.note(format!("emit {}", name));
        self.events.borrow_mut().push((name.to_string(), detail));
    }

    async fn lookup_ip(&self) -> Option<String> {
        self.note("lookup_ip");
        match self.ip {
            Some(ip) => Some(ip.to_string()),
            None => future::pending().await,
        }
    }

    async fn sleep(&self, _ms: u32) {}

    async fn deliver(&self, endpoint: &str, payload: &LeadPayload) -> Result<String, WidgetError> {
        self.note("deliver");
        self.note(format!("deliver {}", endpoint));
        self.delivered.borrow_mut().push(payload.clone());
        match self.backend_status {
            200..=299 => Ok("ok".into()),
            status => Err(WidgetError::Delivery { status }),
        }
    }

    fn track(&self, event: &AnalyticsEvent) {
        self.tracked.borrow_mut().push(event.clone());
    }

    fn succeeded(&self) {
        self.note("succeeded");
    }

    fn failed(&self, _err: &WidgetError, notice: &str, popup: Option<u32>) {
        self.note("failed");
        self.note(format!("alert {}", notice));
        if let Some(popup) = popup {
            self.note(format!("close_popup {}", popup));
        }
    }
}

fn config(json: &str) -> WidgetConfig {
    let overrides = ConfigOverrides::from_json(json).unwrap();
    WidgetConfig::from_overrides(&overrides).0
}

fn ana() -> LeadForm {
    LeadForm {
        name: "Ana".into(),
        email: "ana@x.com".into(),
        phone: String::new(),
        consent: true,
    }
}

fn decode_text(link: &str) -> String {
    let (_, encoded) = link.split_once("?text=").unwrap();
    urlencoding::decode(encoded).unwrap().into_owned()
}

/// Runs both halves of one submission from an idle widget.
fn run(fx: &Recorder, cfg: &WidgetConfig, form: &LeadForm) -> Result<Outcome, Halt> {
    let redirected = begin(fx, Phase::Idle, cfg, form, &cfg.whatsapp_number)?;
    Ok(block_on(settle(fx, cfg, redirected)))
}

#[test]
fn ana_is_redirected_before_the_post_and_closed_after_it() {
    let cfg = config(
        r#"{"whatsappNumber":"+55 (11) 98888-7777","scriptURL":"https://hook.example/lead"}"#,
    );
    let fx = Recorder::new();

    let redirected = begin(&fx, Phase::Idle, &cfg, &ana(), &cfg.whatsapp_number).unwrap();
    assert!(redirected.whatsapp_url.starts_with("https://wa.me/5511988887777?text="));
    assert_eq!(
        decode_text(&redirected.whatsapp_url),
        "Olá! Meu nome é Ana. Email: ana@x.com Aceitou receber comunicados."
    );
    assert!(!fx.called("deliver"));

    assert_eq!(block_on(settle(&fx, &cfg, redirected)), Outcome::Success);
    assert!(fx.position("open_chat") < fx.position("deliver"));
    assert!(fx.position("deliver") < fx.position("succeeded"));
    assert!(fx.called("deliver https://hook.example/lead"));
    assert_eq!(
        *fx.phases.borrow(),
        vec![
            Phase::Validating,
            Phase::Redirecting,
            Phase::Enriching,
            Phase::Submitting,
            Phase::Settled(Outcome::Success),
        ]
    );
    assert_eq!(fx.event_names(), vec!["submit", "success"]);
}

#[test]
fn missing_name_blocks_navigation_and_network() {
    let cfg = config(r#"{"whatsappNumber":"11988887777","scriptURL":"https://hook.example/lead"}"#);
    let fx = Recorder::new();
    let form = LeadForm { name: "   ".into(), ..ana() };

    let halt = run(&fx, &cfg, &form).unwrap_err();
    assert_eq!(
        halt,
        Halt::Invalid(ValidationError { field: Field::Name, problem: Problem::Missing })
    );
    assert!(fx.called("report_invalid name is missing"));
    assert!(!fx.called("persist"));
    assert!(!fx.called("open_chat"));
    assert!(!fx.called("lookup_ip"));
    assert!(fx.delivered.borrow().is_empty());
    assert!(fx.events.borrow().is_empty());
    assert_eq!(*fx.phases.borrow(), vec![Phase::Validating, Phase::Idle]);
}

#[test]
fn submit_while_busy_does_nothing() {
    let cfg = config(r#"{"whatsappNumber":"1"}"#);
    let fx = Recorder::new();

    let halt = begin(&fx, Phase::Submitting, &cfg, &ana(), "1").err();
    assert_eq!(halt, Some(Halt::Busy(Phase::Submitting)));
    assert!(fx.calls.borrow().is_empty());
    assert!(fx.phases.borrow().is_empty());
}

#[test]
fn trimmed_values_are_written_back() {
    let cfg = config(r#"{"whatsappNumber":"1"}"#);
    let fx = Recorder::new();
    let form = LeadForm { name: "  Ana ".into(), email: " ana@x.com ".into(), ..ana() };

    run(&fx, &cfg, &form).unwrap();
    assert_eq!(fx.refilled.borrow().as_ref(), Some(&ana()));
}

#[test]
fn no_endpoint_succeeds_without_posting() {
    let cfg = config(r#"{"whatsappNumber":"1"}"#);
    let fx = Recorder::new();

    assert_eq!(run(&fx, &cfg, &ana()), Ok(Outcome::Success));
    assert!(!fx.called("deliver"));
    assert!(fx.delivered.borrow().is_empty());
    assert!(fx.called("succeeded"));
    assert_eq!(fx.event_names(), vec!["submit", "success"]);
}

#[test]
fn ip_timeout_sends_payload_without_user_ip() {
    let cfg = config(
        r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead","extraFields":{"origin":"lp"}}"#,
    );
    let fx = Recorder::new().ip_hangs();

    assert_eq!(run(&fx, &cfg, &ana()), Ok(Outcome::Success));
    let delivered = fx.delivered.borrow();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].get("userIP"), None);
    assert_eq!(delivered[0].get("origin"), Some("lp"));
}

#[test]
fn ip_answer_is_attached() {
    let cfg = config(r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead"}"#);
    let fx = Recorder::new();

    run(&fx, &cfg, &ana()).unwrap();
    assert_eq!(fx.delivered.borrow()[0].get("userIP"), Some("203.0.113.9"));
}

#[test]
fn zero_timeout_skips_the_lookup() {
    let cfg = config(
        r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead","ipLookupTimeoutMs":0}"#,
    );
    let fx = Recorder::new();

    run(&fx, &cfg, &ana()).unwrap();
    assert!(!fx.called("lookup_ip"));
    assert_eq!(fx.delivered.borrow()[0].get("userIP"), None);
}

#[test]
fn delivery_failure_alerts_and_closes_the_popup() {
    let cfg = config(r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead"}"#);
    let fx = Recorder::new().backend_answers(500);

    assert_eq!(run(&fx, &cfg, &ana()), Ok(Outcome::Failed));
    assert!(fx.called("failed"));
    assert!(fx.called(&format!("alert {}", cfg.texts.error_message)));
    assert!(fx.called(&format!("close_popup {}", POPUP)));
    assert!(!fx.called("succeeded"));
    assert_eq!(fx.event_names(), vec!["submit", "error"]);
    assert_eq!(fx.phases.borrow().last(), Some(&Phase::Settled(Outcome::Failed)));

    let events = fx.events.borrow();
    assert_eq!(events[1].1["message"], "Lead delivery failed: HTTP 500");
}

#[test]
fn payload_carries_backend_fields_and_tracking() {
    let cfg = config(r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead"}"#);
    let fx = Recorder::new();

    run(&fx, &cfg, &ana()).unwrap();
    let delivered = fx.delivered.borrow();
    let payload = &delivered[0];
    assert_eq!(payload.get("nome"), Some("Ana"));
    assert_eq!(payload.get("consent"), Some("Sim"));
    assert_eq!(payload.get(ACTION_TIME_FIELD), Some("16/10/2026, 09:30:00"));
    assert_eq!(payload.get("utm_source"), Some("ig"));
    assert_eq!(payload.get("gbraid"), Some("G1"));
    assert_eq!(payload.get("referrer"), Some("https://google.com/"));
    assert_eq!(payload.get("whatsappNumber"), Some("1"));
}

#[test]
fn extra_fields_can_shadow_base_fields() {
    let cfg = config(
        r#"{"whatsappNumber":"1","scriptURL":"https://hook.example/lead","extraFields":{"pageUrl":"override"}}"#,
    );
    let fx = Recorder::new();

    run(&fx, &cfg, &ana()).unwrap();
    assert_eq!(fx.delivered.borrow()[0].get("pageUrl"), Some("override"));
}

#[test]
fn lead_event_is_tracked_only_when_enabled() {
    let fx = Recorder::new();
    run(&fx, &config(r#"{"whatsappNumber":"1"}"#), &ana()).unwrap();
    assert!(fx.tracked.borrow().is_empty());

    let fx = Recorder::new();
    run(&fx, &config(r#"{"whatsappNumber":"1","enableGA4":true}"#), &ana()).unwrap();
    let tracked = fx.tracked.borrow();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].name, "whatsappClick");
    assert_eq!(tracked[0].params["lead_id"], "lead-1");
}
