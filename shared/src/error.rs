use thiserror::Error;

use crate::lead::ValidationError;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lead delivery failed: HTTP {status}")]
    Delivery { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Non-fatal problems found while normalizing a configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    #[error("whatsappNumber is empty; the widget cannot open a chat")]
    MissingNumber,
}
