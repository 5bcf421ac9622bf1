// Field pose and match-start enumerations
//
// Field frame: x to the right, y forward (away from the driver station),
// heading in degrees measured clockwise from +y. Distances are in inches.

use serde::{Deserialize, Serialize};

use crate::config::FULL_TILE_INCHES;

/// Robot pose on the field
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose2D {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Straight-line distance between the two positions, heading ignored
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }
}

/// Wrap a heading into [0, 360)
pub fn normalize_heading(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest signed rotation from `current` to `target`, in [-180, 180)
pub fn heading_error(target: f64, current: f64) -> f64 {
    (target - current + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Alliance {
    Red,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StartPos {
    Left,
    Right,
}

/// One of the four symmetric starting configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartConfig {
    pub alliance: Alliance,
    pub start_pos: StartPos,
}

impl StartConfig {
    pub const fn new(alliance: Alliance, start_pos: StartPos) -> Self {
        Self {
            alliance,
            start_pos,
        }
    }

    /// All four configurations, canonical (RED/LEFT) first
    pub const ALL: [StartConfig; 4] = [
        StartConfig::new(Alliance::Red, StartPos::Left),
        StartConfig::new(Alliance::Red, StartPos::Right),
        StartConfig::new(Alliance::Blue, StartPos::Left),
        StartConfig::new(Alliance::Blue, StartPos::Right),
    ];
}

/// Unit of the coordinates handed to [`path_point`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Inches,
    Tiles,
}

/// Build a path point, scaling tile coordinates to inches. Heading is never scaled.
pub fn path_point(x: f64, y: f64, heading: f64, units: Units) -> Pose2D {
    let scale = match units {
        Units::Inches => 1.0,
        Units::Tiles => FULL_TILE_INCHES,
    };
    Pose2D::new(x * scale, y * scale, heading)
}
