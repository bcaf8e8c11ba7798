//! The vehicle-control backend, as seen from the dashboard.
//!
//! Every call is fire-once: it issues a single request and reports either the
//! payload or a [`BackendFailure`]. Nothing here retries; the poll timer is the
//! only thing that asks again.

use async_trait::async_trait;
use thiserror::Error;

use crate::telemetry::TelemetrySample;

mod http;

pub use http::BackendClient;

pub type BackendResult<T> = Result<T, BackendFailure>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendFailure {
    /// The request never produced a response (refused, reset, timed out).
    #[error("{0}")]
    Network(String),

    /// The backend answered, but not with `status: "success"` on a 2xx.
    #[error("{message}")]
    Protocol {
        http_status: Option<u16>,
        message: String,
    },
}

impl BackendFailure {
    pub fn protocol(http_status: Option<u16>, message: impl Into<String>) -> Self {
        BackendFailure::Protocol {
            http_status,
            message: message.into(),
        }
    }
}

/// Acknowledgement of a successful connect or disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

impl Ack {
    pub fn with_message(message: impl Into<String>) -> Self {
        Ack {
            message: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn connect(&self) -> BackendResult<Ack>;

    async fn disconnect(&self) -> BackendResult<Ack>;

    async fn status(&self) -> BackendResult<TelemetrySample>;

    /// Health check against the backend root route.
    async fn ping(&self) -> BackendResult<String>;
}
