use std::fmt;

use super::TelemetrySample;

const NOT_AVAILABLE: &str = "N/A";

/// What the telemetry panel should show for the latest sample.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryDisplay {
    Disconnected,
    Live(TelemetryReadout),
}

/// Labeled, pre-formatted telemetry values.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReadout {
    pub mode: String,
    pub armed: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub airspeed: String,
    pub groundspeed: String,
    pub heading: String,
    pub battery: String,
}

impl TelemetryReadout {
    /// Rows in display order.
    pub fn rows(&self) -> [(&'static str, &str); 9] {
        [
            ("Mode", self.mode.as_str()),
            ("Armed", self.armed.as_str()),
            ("Latitude", self.latitude.as_str()),
            ("Longitude", self.longitude.as_str()),
            ("Altitude", self.altitude.as_str()),
            ("Airspeed", self.airspeed.as_str()),
            ("Groundspeed", self.groundspeed.as_str()),
            ("Heading", self.heading.as_str()),
            ("Battery", self.battery.as_str()),
        ]
    }
}

impl fmt::Display for TelemetryDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryDisplay::Disconnected => write!(f, "Disconnected"),
            TelemetryDisplay::Live(readout) => {
                for (label, value) in readout.rows() {
                    writeln!(f, "{:<12} {}", format!("{}:", label), value)?;
                }
                Ok(())
            }
        }
    }
}

pub fn format(sample: Option<&TelemetrySample>) -> TelemetryDisplay {
    let sample = match sample {
        Some(sample) if sample.is_connected => sample,
        _ => return TelemetryDisplay::Disconnected,
    };

    TelemetryDisplay::Live(TelemetryReadout {
        mode: sample
            .mode
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
        armed: match sample.armed {
            Some(true) => "Yes".to_owned(),
            Some(false) => "No".to_owned(),
            None => NOT_AVAILABLE.to_owned(),
        },
        latitude: reading(sample.lat, |v| format!("{:.7}", v)),
        longitude: reading(sample.lon, |v| format!("{:.7}", v)),
        altitude: reading(sample.alt, |v| format!("{:.2} m", v)),
        airspeed: reading(sample.airspeed, |v| format!("{:.2} m/s", v)),
        groundspeed: reading(sample.groundspeed, |v| format!("{:.2} m/s", v)),
        heading: reading(sample.heading, |v| format!("{:.0}°", v)),
        battery: reading(sample.battery_voltage, |v| format!("{:.2} V", v)),
    })
}

fn reading(value: Option<f64>, render: impl FnOnce(f64) -> String) -> String {
    value.map(render).unwrap_or_else(|| NOT_AVAILABLE.to_owned())
}
