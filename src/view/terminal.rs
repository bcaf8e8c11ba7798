use std::{fmt, io::Write};

use chrono::Local;
use colored::Colorize;
use geo::{LineString, Point};
use prettytable::{format::consts::FORMAT_CLEAN, Cell, Row, Table};

use super::{StatusKind, StatusLine, StatusPanel};
use crate::{
    controller::Affordances,
    telemetry::{TelemetryDisplay, TelemetryReadout},
    trail::MapView,
};

/// Dashboard rendered as text lines on a terminal (or any writer).
///
/// Live telemetry is printed as one compact line, and only when it differs
/// from the previous update, so an idle vehicle does not flood the console.
pub struct TerminalDashboard<W> {
    out: W,
    last_telemetry: Option<TelemetryDisplay>,
    last_affordances: Option<Affordances>,
}

impl<W: Write> TerminalDashboard<W> {
    pub fn new(out: W) -> Self {
        TerminalDashboard {
            out,
            last_telemetry: None,
            last_affordances: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl fmt::Display) {
        if let Err(err) = writeln!(self.out, "{}", text) {
            warn!("failed to write to terminal: {}", err);
        }
    }
}

fn compact(readout: &TelemetryReadout) -> String {
    format!(
        "{} armed={} pos=({}, {}) alt={} as={} gs={} hdg={} bat={}",
        readout.mode,
        readout.armed,
        readout.latitude,
        readout.longitude,
        readout.altitude,
        readout.airspeed,
        readout.groundspeed,
        readout.heading,
        readout.battery
    )
}

impl<W: Write> StatusPanel for TerminalDashboard<W> {
    fn show_status(&mut self, status: &StatusLine) {
        let text = match status.kind {
            StatusKind::Pending => status.text.yellow(),
            StatusKind::Connected => status.text.green().bold(),
            StatusKind::Disconnected => status.text.normal(),
            StatusKind::Error => status.text.red().bold(),
        };

        self.line(format_args!("status: {}", text));
    }

    fn show_telemetry(&mut self, telemetry: &TelemetryDisplay) {
        if self.last_telemetry.as_ref() == Some(telemetry) {
            return;
        }

        let stamp = Local::now().format("%H:%M:%S");

        match telemetry {
            TelemetryDisplay::Disconnected => {
                self.line(format_args!("[{}] telemetry: {}", stamp, "Disconnected".dimmed()))
            }
            TelemetryDisplay::Live(readout) => {
                let text = compact(readout);
                self.line(format_args!("[{}] telemetry: {}", stamp, text))
            }
        }

        self.last_telemetry = Some(telemetry.clone());
    }

    fn show_details(&mut self, telemetry: &TelemetryDisplay) {
        match telemetry {
            TelemetryDisplay::Disconnected => self.line("Disconnected"),
            TelemetryDisplay::Live(readout) => {
                let mut table = Table::new();
                table.set_format(*FORMAT_CLEAN);

                for (label, value) in readout.rows() {
                    table.add_row(Row::new(vec![Cell::new(label), Cell::new(value)]));
                }

                self.line(table);
            }
        }
    }

    fn show_affordances(&mut self, affordances: Affordances) {
        if self.last_affordances == Some(affordances) {
            return;
        }

        self.last_affordances = Some(affordances);
        self.line(format_args!(
            "available: {}",
            affordances.enabled().join(", ").cyan()
        ));
    }

    fn show_note(&mut self, note: &str) {
        self.line(note);
    }
}

impl<W: Write> MapView for TerminalDashboard<W> {
    fn set_view(&mut self, center: Point<f64>, zoom: u8) {
        self.line(format_args!(
            "map: view centered on ({:.6}, {:.6}) at zoom {}",
            center.y(),
            center.x(),
            zoom
        ));
    }

    fn place_marker(&mut self, at: Point<f64>) {
        self.line(format_args!(
            "map: vehicle marker placed at ({:.6}, {:.6})",
            at.y(),
            at.x()
        ));
    }

    fn move_marker(&mut self, to: Point<f64>) {
        trace!("marker moved to ({}, {})", to.y(), to.x());
    }

    fn remove_marker(&mut self) {
        self.line("map: vehicle marker removed");
    }

    fn draw_trail(&mut self, trail: &LineString<f64>) {
        trace!("trail redrawn with {} points", trail.0.len());
    }

    fn remove_trail(&mut self) {
        self.line("map: trail cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controller::ConnectionState, telemetry, telemetry::TelemetrySample};

    fn output(dashboard: TerminalDashboard<Vec<u8>>) -> String {
        String::from_utf8(dashboard.into_inner()).unwrap()
    }

    fn live() -> TelemetryDisplay {
        telemetry::format(Some(&TelemetrySample {
            is_connected: true,
            mode: Some("AUTO".into()),
            lat: Some(39.0),
            lon: Some(22.0),
            battery_voltage: Some(11.1),
            ..Default::default()
        }))
    }

    #[test]
    fn status_is_prefixed() {
        let mut dashboard = TerminalDashboard::new(Vec::new());
        dashboard.show_status(&StatusLine::new(StatusKind::Error, "Connection lost"));

        let out = output(dashboard);
        assert!(out.starts_with("status: "), "{}", out);
        assert!(out.contains("Connection lost"), "{}", out);
    }

    #[test]
    fn repeated_telemetry_is_printed_once() {
        let mut dashboard = TerminalDashboard::new(Vec::new());

        dashboard.show_telemetry(&live());
        dashboard.show_telemetry(&live());
        dashboard.show_telemetry(&TelemetryDisplay::Disconnected);

        let out = output(dashboard);
        assert_eq!(out.lines().count(), 2, "{}", out);
        assert!(out.contains("AUTO armed=N/A"), "{}", out);
        assert!(out.contains("bat=11.10 V"), "{}", out);
        assert!(out.contains("Disconnected"), "{}", out);
    }

    #[test]
    fn details_render_a_table() {
        let mut dashboard = TerminalDashboard::new(Vec::new());
        dashboard.show_details(&live());

        let out = output(dashboard);
        assert!(out.contains("Battery"), "{}", out);
        assert!(out.contains("11.10 V"), "{}", out);
        assert!(out.contains("Groundspeed"), "{}", out);
    }

    #[test]
    fn affordances_are_printed_on_change() {
        let mut dashboard = TerminalDashboard::new(Vec::new());

        dashboard.show_affordances(Affordances::for_state(ConnectionState::Disconnected));
        dashboard.show_affordances(Affordances::for_state(ConnectionState::Disconnected));
        dashboard.show_affordances(Affordances::for_state(ConnectionState::Connected));

        let out = output(dashboard);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{}", out);
        assert!(lines[0].contains("connect"));
        assert!(lines[1].contains("disconnect, status"), "{}", out);
    }

    #[test]
    fn map_output_uses_lat_lon_order() {
        let mut dashboard = TerminalDashboard::new(Vec::new());
        dashboard.place_marker(Point::new(22.0, 39.0));

        let out = output(dashboard);
        assert!(out.contains("(39.000000, 22.000000)"), "{}", out);
    }
}
