// Pure-pursuit path following
//
// The follower does not track the path itself; each tick it picks the point
// on the current segment that is `following_distance` ahead of the robot and
// hands that to the position controllers.

use serde::{Deserialize, Serialize};

use crate::pose::{Pose2D, heading_error};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Lookahead radius (inches)
    pub following_distance: f64,
    /// Position tolerance at the final waypoint, and at every waypoint
    /// when fast mode is off (inches)
    pub pos_tolerance: f64,
    /// Heading tolerance at the final waypoint (degrees)
    pub turn_tolerance: f64,
    /// Pass intermediate waypoints once they are inside the lookahead radius
    pub fast_mode: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            following_distance: 10.0,
            pos_tolerance: 2.0,
            turn_tolerance: 2.0,
            fast_mode: true,
        }
    }
}

/// Parameter values in [0, 1] where the circle crosses segment a→b
fn segment_circle_intersections(a: &Pose2D, b: &Pose2D, center: &Pose2D, r: f64) -> Vec<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let fx = a.x - center.x;
    let fy = a.y - center.y;

    let qa = dx * dx + dy * dy;
    if qa == 0.0 {
        return Vec::new();
    }
    let qb = 2.0 * (fx * dx + fy * dy);
    let qc = fx * fx + fy * fy - r * r;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }

    let sqrt_d = disc.sqrt();
    [(-qb - sqrt_d) / (2.0 * qa), (-qb + sqrt_d) / (2.0 * qa)]
        .into_iter()
        .filter(|t| (0.0..=1.0).contains(t))
        .collect()
}

/// Parameter of the point on segment a→b closest to `p`
fn closest_t(a: &Pose2D, b: &Pose2D, p: &Pose2D) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return 1.0;
    }
    (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
}

/// Point at `t` along a→b, heading turned the short way
fn interpolate(a: &Pose2D, b: &Pose2D, t: f64) -> Pose2D {
    Pose2D::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.heading + heading_error(b.heading, a.heading) * t,
    )
}

#[derive(Debug, Clone)]
pub struct PathFollower {
    /// Start pose followed by the caller's waypoints
    points: Vec<Pose2D>,
    /// Index of the waypoint the robot is currently heading for
    segment: usize,
    config: PathConfig,
}

impl PathFollower {
    /// Follow `waypoints` starting from `start`. `waypoints` must not be empty.
    pub fn new(start: Pose2D, waypoints: &[Pose2D], config: PathConfig) -> Self {
        debug_assert!(!waypoints.is_empty());
        let mut points = Vec::with_capacity(waypoints.len() + 1);
        points.push(start);
        points.extend_from_slice(waypoints);
        Self {
            points,
            segment: 1,
            config,
        }
    }

    /// Waypoint currently being approached (1-based into the caller's list)
    pub fn current_waypoint(&self) -> usize {
        self.segment
    }

    pub fn final_waypoint(&self) -> Pose2D {
        self.points[self.points.len() - 1]
    }

    fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    /// True once the robot sits on the final waypoint within tolerance
    pub fn is_complete(&self, pose: &Pose2D) -> bool {
        let end = self.final_waypoint();
        self.segment == self.last_index()
            && pose.distance_to(&end) <= self.config.pos_tolerance
            && heading_error(end.heading, pose.heading).abs() <= self.config.turn_tolerance
    }

    /// Advance past reached waypoints and return the pose to aim at, or
    /// `None` once the path is complete.
    pub fn lookahead(&mut self, pose: &Pose2D) -> Option<Pose2D> {
        let pass_radius = if self.config.fast_mode {
            self.config.following_distance
        } else {
            self.config.pos_tolerance
        };
        while self.segment < self.last_index()
            && pose.distance_to(&self.points[self.segment]) <= pass_radius
        {
            self.segment += 1;
        }

        if self.is_complete(pose) {
            return None;
        }

        let a = self.points[self.segment - 1];
        let b = self.points[self.segment];
        let r = self.config.following_distance;

        if pose.distance_to(&b) <= r {
            return Some(b);
        }

        let t = segment_circle_intersections(&a, &b, pose, r)
            .into_iter()
            .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |bt| bt.max(t))))
            .unwrap_or_else(|| closest_t(&a, &b, pose));
        Some(interpolate(&a, &b, t))
    }
}
