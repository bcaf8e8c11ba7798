//! Live trace of the vehicle position.

use std::fmt;

use geo::{
    algorithm::{bounding_rect::BoundingRect, haversine_length::HaversineLength},
    Coord, LineString, Point, Rect,
};

use crate::{config::MapConfig, telemetry::TelemetrySample};

/// Something that can draw the vehicle marker and its trail.
///
/// Points are `x = longitude`, `y = latitude`.
pub trait MapView {
    fn set_view(&mut self, center: Point<f64>, zoom: u8);

    fn place_marker(&mut self, at: Point<f64>);

    fn move_marker(&mut self, to: Point<f64>);

    fn remove_marker(&mut self);

    fn draw_trail(&mut self, trail: &LineString<f64>);

    fn remove_trail(&mut self);
}

pub struct TrailTracker {
    default_center: Point<f64>,
    default_zoom: u8,
    fix_zoom: u8,

    trail: LineString<f64>,
    marker: Option<Point<f64>>,
    trail_drawn: bool,

    /// Set once the view has snapped to the first fix of the session.
    centered: bool,
}

impl TrailTracker {
    pub fn new(config: &MapConfig) -> Self {
        TrailTracker {
            default_center: Point::new(config.default_center.lon, config.default_center.lat),
            default_zoom: config.default_zoom,
            fix_zoom: config.fix_zoom,
            trail: LineString(Vec::new()),
            marker: None,
            trail_drawn: false,
            centered: false,
        }
    }

    pub fn trail(&self) -> &LineString<f64> {
        &self.trail
    }

    pub fn marker(&self) -> Option<Point<f64>> {
        self.marker
    }

    pub fn is_centered(&self) -> bool {
        self.centered
    }

    /// Drops the previous trail at the start of a session.
    pub fn begin_session(&mut self, view: &mut impl MapView) {
        self.trail.0.clear();

        if self.trail_drawn {
            view.remove_trail();
            self.trail_drawn = false;
        }
    }

    /// Plots a sample. Returns `false` if it carried no usable position.
    pub fn update(&mut self, sample: &TelemetrySample, view: &mut impl MapView) -> bool {
        let position = match sample.position() {
            Some(position) => position,
            None => {
                trace!("sample has no position fix, not plotting");
                return false;
            }
        };

        match self.marker {
            Some(_) => view.move_marker(position),
            None => view.place_marker(position),
        }
        self.marker = Some(position);

        if !self.centered {
            debug!("first fix at {:?}, centering view", position);
            view.set_view(position, self.fix_zoom);
            self.centered = true;
        }

        let coord = Coord::from(position);

        // repeated fixes would only add zero-length segments
        if self.trail.0.last() != Some(&coord) {
            self.trail.0.push(coord);
            view.draw_trail(&self.trail);
            self.trail_drawn = true;
        }

        true
    }

    /// Clears everything plotted during the session and restores the
    /// default view.
    pub fn reset(&mut self, view: &mut impl MapView) {
        if self.marker.take().is_some() {
            view.remove_marker();
        }

        if self.trail_drawn {
            view.remove_trail();
            self.trail_drawn = false;
        }

        self.trail.0.clear();
        self.centered = false;

        view.set_view(self.default_center, self.default_zoom);
    }

    pub fn summary(&self) -> TrailSummary {
        TrailSummary {
            points: self.trail.0.len(),
            length_m: self.trail.haversine_length(),
            bounds: self.trail.bounding_rect(),
            marker: self.marker,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrailSummary {
    pub points: usize,
    /// Great-circle length of the trail in meters
    pub length_m: f64,
    pub bounds: Option<Rect<f64>>,
    pub marker: Option<Point<f64>>,
}

impl fmt::Display for TrailSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} points, {:.1} m", self.points, self.length_m)?;

        if let Some(bounds) = self.bounds {
            write!(
                f,
                ", lat {:.6}..{:.6}, lon {:.6}..{:.6}",
                bounds.min().y,
                bounds.max().y,
                bounds.min().x,
                bounds.max().x
            )?;
        }

        if let Some(marker) = self.marker {
            write!(f, ", vehicle at ({:.6}, {:.6})", marker.y(), marker.x())?;
        }

        Ok(())
    }
}
