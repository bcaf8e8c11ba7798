//! Output side of the dashboard: the status panel and the map.

use crate::{controller::Affordances, telemetry::TelemetryDisplay, trail::MapView};

mod terminal;

pub use terminal::TerminalDashboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Connected,
    Disconnected,
    Error,
}

/// The single line of connection status shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusLine {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        StatusLine {
            kind,
            text: text.into(),
        }
    }
}

pub trait StatusPanel {
    fn show_status(&mut self, status: &StatusLine);

    /// Live telemetry update, called for every status result.
    fn show_telemetry(&mut self, telemetry: &TelemetryDisplay);

    /// Full telemetry readout on request.
    fn show_details(&mut self, telemetry: &TelemetryDisplay);

    fn show_affordances(&mut self, affordances: Affordances);

    /// Free-form informational output (health checks, trail summaries).
    fn show_note(&mut self, note: &str);
}

/// Everything the controller draws on.
pub trait Dashboard: StatusPanel + MapView + Send + 'static {}

impl<T: StatusPanel + MapView + Send + 'static> Dashboard for T {}
