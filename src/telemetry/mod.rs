use serde::{Deserialize, Deserializer};

mod display;

pub use display::{format, TelemetryDisplay, TelemetryReadout};

/// One telemetry record as reported by `GET /api/status`.
///
/// The backend reports `null` for anything the vehicle has not sent yet, so
/// every reading is optional.
#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetrySample {
    #[serde(default)]
    pub is_connected: bool,

    #[serde(default, deserialize_with = "lenient_string")]
    pub mode: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub armed: Option<bool>,

    /// Latitude in degrees
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[serde(default, deserialize_with = "lenient_number")]
    pub lon: Option<f64>,

    /// Altitude relative to home in meters
    #[serde(default, deserialize_with = "lenient_number")]
    pub alt: Option<f64>,

    /// Airspeed in meters per second
    #[serde(default, deserialize_with = "lenient_number")]
    pub airspeed: Option<f64>,

    /// Groundspeed in meters per second
    #[serde(default, deserialize_with = "lenient_number")]
    pub groundspeed: Option<f64>,

    /// Heading in degrees
    #[serde(default, deserialize_with = "lenient_number")]
    pub heading: Option<f64>,

    /// Battery voltage in volts
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery_voltage: Option<f64>,
}

impl TelemetrySample {
    /// The position fix, if the sample carries both coordinates.
    pub fn position(&self) -> Option<geo::Point<f64>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(geo::Point::new(lon, lat)),
            _ => None,
        }
    }
}

// a reading of the wrong JSON type reads as "no reading" instead of
// rejecting the whole sample
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}
