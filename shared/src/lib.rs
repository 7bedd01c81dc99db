//! Platform-independent core of the WhatsApp lead widget: configuration,
//! visitor persistence, tracking, link handling, validation and payloads.
//! Nothing here touches the DOM, so it builds and tests natively.

pub mod analytics;
pub mod config;
pub mod error;
pub mod lead;
pub mod links;
pub mod submission;
pub mod tracking;
pub mod visitor;

pub use analytics::AnalyticsEvent;
pub use config::{ConfigOverrides, WidgetConfig};
pub use error::{ConfigWarning, WidgetError};
pub use lead::{Lead, LeadForm, LeadPayload, SubmissionContext, ValidationError};
pub use links::{deep_link, WhatsAppLink};
pub use submission::{begin, race_with_timeout, settle, Halt, Outcome, Phase, Redirected, SubmitEffects};
pub use tracking::TrackingContext;
pub use visitor::{KeyValueStore, VisitorRecord, VisitorStore};
