//! The submit pipeline, its phases and the bounded enrichment race.
//!
//! [`begin`] runs synchronously inside the submit handler: validate, persist,
//! open the chat, build the payload. [`settle`] runs afterwards: IP lookup,
//! delivery, and the success or failure side effects. Everything that touches
//! the page or the network goes through [`SubmitEffects`].

use std::future::Future;

use futures::future::{self, Either};
use serde_json::{json, Value};
use thiserror::Error;

use crate::analytics::AnalyticsEvent;
use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::lead::{LeadForm, LeadPayload, SubmissionContext, ValidationError};
use crate::links::deep_link;
use crate::visitor::VisitorRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

/// `Idle → Validating → Redirecting → Enriching → Submitting → Settled`.
/// A failed validation drops back to `Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Redirecting,
    Enriching,
    Submitting,
    Settled(Outcome),
}

impl Phase {
    /// True while a submission is in flight; the submit control stays disabled.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Phase::Redirecting | Phase::Enriching | Phase::Submitting
        )
    }

    /// Returns the next phase if `to` is a legal successor of `self`.
    pub fn advance(self, to: Phase) -> Option<Phase> {
        let legal = match (self, to) {
            (Phase::Idle | Phase::Settled(_), Phase::Validating) => true,
            (Phase::Validating, Phase::Idle | Phase::Redirecting) => true,
            (Phase::Redirecting, Phase::Enriching) => true,
            (Phase::Enriching, Phase::Submitting) => true,
            (Phase::Submitting, Phase::Settled(_)) => true,
            _ => false,
        };
        legal.then_some(to)
    }
}

/// Races `work` against `timer`. Whichever settles first wins; the loser is
/// dropped without being awaited. A timeout yields `None`.
pub async fn race_with_timeout<T, W, D>(work: W, timer: D) -> Option<T>
where
    W: Future<Output = Option<T>>,
    D: Future<Output = ()>,
{
    match future::select(Box::pin(work), Box::pin(timer)).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => None,
    }
}

/// Why a submit did not get past [`begin`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    #[error("a submission is already in progress ({0:?})")]
    Busy(Phase),

    #[error("form rejected: {0}")]
    Invalid(#[from] ValidationError),
}

/// Side effects of a submission, supplied by the host page.
pub trait SubmitEffects {
    /// Handle to the chat window opened for the visitor.
    type Popup;

    fn enter(&self, phase: Phase);
    /// Shows the trimmed values back in the inputs.
    fn refill(&self, form: &LeadForm);
    fn report_invalid(&self, err: &ValidationError);
    fn persist(&self, record: &VisitorRecord);
    fn open_chat(&self, url: &str) -> Option<Self::Popup>;
    fn context(&self, whatsapp_number: &str) -> SubmissionContext;
    fn emit(&self, name: &str, detail: Value);
    fn lookup_ip(&self) -> impl Future<Output = Option<String>>;
    fn sleep(&self, ms: u32) -> impl Future<Output = ()>;
    /// POSTs `payload`; resolves to the response body.
    fn deliver(
        &self,
        endpoint: &str,
        payload: &LeadPayload,
    ) -> impl Future<Output = Result<String, WidgetError>>;
    fn track(&self, event: &AnalyticsEvent);
    /// Resets the form and closes the modal.
    fn succeeded(&self);
    /// Tells the visitor with `notice` and closes `popup` if one was opened.
    fn failed(&self, err: &WidgetError, notice: &str, popup: Option<Self::Popup>);
}

/// A submission whose chat window is already open.
pub struct Redirected<P> {
    pub whatsapp_url: String,
    pub payload: LeadPayload,
    popup: Option<P>,
}

pub fn begin<E: SubmitEffects>(
    fx: &E,
    phase: Phase,
    config: &WidgetConfig,
    form: &LeadForm,
    number: &str,
) -> Result<Redirected<E::Popup>, Halt> {
    if phase.advance(Phase::Validating).is_none() {
        return Err(Halt::Busy(phase));
    }
    fx.enter(Phase::Validating);

    let form = form.trimmed();
    fx.refill(&form);
    let lead = match form.validate(&config.contact_fields) {
        Ok(lead) => lead,
        Err(err) => {
            fx.report_invalid(&err);
            fx.enter(Phase::Idle);
            return Err(err.into());
        }
    };

    fx.enter(Phase::Redirecting);
    fx.persist(&lead.to_record());

    // The chat opens before any network work.
    let whatsapp_url = deep_link(number, &lead.compose_message());
    let popup = fx.open_chat(&whatsapp_url);

    let ctx = fx.context(number);
    let payload = LeadPayload::assemble(&lead, &ctx, &config.extra_fields);
    fx.emit(
        "submit",
        json!({ "payload": payload.to_json(), "whatsappUrl": whatsapp_url }),
    );

    Ok(Redirected { whatsapp_url, payload, popup })
}

pub async fn settle<E: SubmitEffects>(
    fx: &E,
    config: &WidgetConfig,
    redirected: Redirected<E::Popup>,
) -> Outcome {
    let Redirected { payload, popup, .. } = redirected;

    fx.enter(Phase::Enriching);
    let ip = match config.ip_lookup_timeout_ms {
        0 => None,
        ms => race_with_timeout(fx.lookup_ip(), fx.sleep(ms)).await,
    };
    let payload = payload.with_ip(ip);

    fx.enter(Phase::Submitting);
    let delivered = match config.endpoint() {
        Some(endpoint) => fx.deliver(endpoint, &payload).await.map(Some),
        None => Ok(None),
    };

    match delivered {
        Ok(response) => {
            if config.enable_ga4 {
                fx.track(&AnalyticsEvent::lead_sent(payload.get("leadId")));
            }
            fx.emit(
                "success",
                json!({ "payload": payload.to_json(), "response": response }),
            );
            fx.succeeded();
            fx.enter(Phase::Settled(Outcome::Success));
            Outcome::Success
        }
        Err(err) => {
            fx.emit(
                "error",
                json!({ "message": err.to_string(), "payload": payload.to_json() }),
            );
            fx.failed(&err, &config.texts.error_message, popup);
            fx.enter(Phase::Settled(Outcome::Failed));
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn happy_path_is_linear() {
        let mut phase = Phase::Idle;
        for next in [
            Phase::Validating,
            Phase::Redirecting,
            Phase::Enriching,
            Phase::Submitting,
            Phase::Settled(Outcome::Success),
            Phase::Validating,
        ] {
            phase = phase.advance(next).unwrap();
        }
        assert_eq!(phase, Phase::Validating);
    }

    #[test]
    fn cannot_restart_while_busy() {
        assert_eq!(Phase::Enriching.advance(Phase::Validating), None);
        assert_eq!(Phase::Submitting.advance(Phase::Validating), None);
        assert!(Phase::Submitting.is_busy());
        assert!(!Phase::Settled(Outcome::Failed).is_busy());
    }

    #[test]
    fn validation_failure_returns_to_idle() {
        assert_eq!(Phase::Validating.advance(Phase::Idle), Some(Phase::Idle));
        assert_eq!(Phase::Validating.advance(Phase::Submitting), None);
    }

    #[test]
    fn work_that_settles_first_wins() {
        let result = block_on(race_with_timeout(
            future::ready(Some("203.0.113.9")),
            future::pending::<()>(),
        ));
        assert_eq!(result, Some("203.0.113.9"));
    }

    #[test]
    fn timer_that_settles_first_yields_none() {
        let result = block_on(race_with_timeout(
            future::pending::<Option<String>>(),
            future::ready(()),
        ));
        assert_eq!(result, None);
    }

    #[test]
    fn failed_work_yields_none() {
        let result: Option<String> =
            block_on(race_with_timeout(future::ready(None), future::pending::<()>()));
        assert_eq!(result, None);
    }
}
