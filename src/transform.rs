// Alliance / start-position coordinate transform
//
// Autonomous targets are authored once, as if the robot always started
// RED/LEFT. The field is diagonally symmetric, so the other three starts are
// reached by the mirror rules below rather than a plain quadrant flip.

use crate::config::{FULL_TILE_INCHES, HALF_FIELD_INCHES};
use crate::pose::{Alliance, Pose2D, StartConfig, StartPos};

/// Map a canonical (RED/LEFT) target pose onto the field for the given start.
///
/// Heading wraps with a truncating remainder, so the result may be negative.
pub fn adjust_target_pose(pose: Pose2D, alliance: Alliance, start_pos: StartPos) -> Pose2D {
    let Pose2D { x, y, heading } = pose;

    match (alliance, start_pos) {
        (Alliance::Red, StartPos::Left) => pose,
        (Alliance::Red, StartPos::Right) => Pose2D::new(-x, y, -heading),
        // Y mirror and heading rotation always come first on BLUE
        (Alliance::Blue, StartPos::Left) => Pose2D::new(-x, -y, (heading + 180.0) % 360.0),
        // X is not mirrored here; the heading is negated instead.
        // TODO: confirm against the field diagram that BLUE/RIGHT really keeps X.
        (Alliance::Blue, StartPos::Right) => Pose2D::new(x, -y, -((heading + 180.0) % 360.0)),
    }
}

/// Heading-only form of [`adjust_target_pose`]
pub fn adjust_target_heading(heading: f64, alliance: Alliance, start_pos: StartPos) -> f64 {
    adjust_target_pose(Pose2D::new(0.0, 0.0, heading), alliance, start_pos).heading
}

/// Undo [`adjust_target_pose`]. Position is exact; heading is equal modulo 360.
pub fn inverse_adjust_target_pose(pose: Pose2D, alliance: Alliance, start_pos: StartPos) -> Pose2D {
    let Pose2D { x, y, heading } = pose;

    match (alliance, start_pos) {
        (Alliance::Red, StartPos::Left) => pose,
        (Alliance::Red, StartPos::Right) => Pose2D::new(-x, y, -heading),
        (Alliance::Blue, StartPos::Left) => Pose2D::new(-x, -y, (heading - 180.0) % 360.0),
        (Alliance::Blue, StartPos::Right) => Pose2D::new(x, -y, (-heading - 180.0) % 360.0),
    }
}

impl StartConfig {
    pub fn adjust(&self, pose: Pose2D) -> Pose2D {
        adjust_target_pose(pose, self.alliance, self.start_pos)
    }

    pub fn adjust_heading(&self, heading: f64) -> f64 {
        adjust_target_heading(heading, self.alliance, self.start_pos)
    }

    /// Field pose the robot is placed at before the match, in inches
    pub fn start_pose(&self, robot_length: f64) -> Pose2D {
        let x = 1.5 * FULL_TILE_INCHES;
        let y = HALF_FIELD_INCHES - robot_length / 2.0;

        match (self.alliance, self.start_pos) {
            (Alliance::Red, StartPos::Left) => Pose2D::new(-x, -y, 0.0),
            (Alliance::Red, StartPos::Right) => Pose2D::new(x, -y, 0.0),
            (Alliance::Blue, StartPos::Left) => Pose2D::new(x, y, 180.0),
            (Alliance::Blue, StartPos::Right) => Pose2D::new(-x, y, 180.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::heading_error;

    const EPS: f64 = 1e-9;

    fn assert_pose_eq(actual: Pose2D, expected: Pose2D) {
        assert!(
            (actual.x - expected.x).abs() < EPS && (actual.y - expected.y).abs() < EPS,
            "position mismatch: {:?} vs {:?}",
            actual,
            expected
        );
        assert!(
            heading_error(actual.heading, expected.heading).abs() < EPS,
            "heading mismatch: {:?} vs {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_blue_left() {
        let adjusted = adjust_target_pose(Pose2D::new(5.0, 10.0, 30.0), Alliance::Blue, StartPos::Left);
        assert_eq!(adjusted, Pose2D::new(-5.0, -10.0, 210.0));
    }

    #[test]
    fn test_red_right() {
        let adjusted = adjust_target_pose(Pose2D::new(5.0, 10.0, 30.0), Alliance::Red, StartPos::Right);
        assert_eq!(adjusted, Pose2D::new(-5.0, 10.0, -30.0));
    }

    #[test]
    fn test_blue_right_negates_heading_instead_of_x() {
        let adjusted = adjust_target_pose(Pose2D::new(5.0, 10.0, 30.0), Alliance::Blue, StartPos::Right);
        assert_eq!(adjusted, Pose2D::new(5.0, -10.0, -210.0));
    }

    #[test]
    fn test_red_left_is_identity() {
        for pose in [
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(-12.5, 48.0, 270.0),
            Pose2D::new(3.0, -7.0, -45.0),
        ] {
            assert_eq!(adjust_target_pose(pose, Alliance::Red, StartPos::Left), pose);
        }
    }

    #[test]
    fn test_round_trip_all_configs() {
        let poses = [
            Pose2D::new(5.0, 10.0, 30.0),
            Pose2D::new(-23.75, 47.5, 180.0),
            Pose2D::new(0.0, -70.5, -90.0),
            Pose2D::new(12.0, 3.0, 359.0),
        ];
        for config in StartConfig::ALL {
            for pose in poses {
                let adjusted = adjust_target_pose(pose, config.alliance, config.start_pos);
                let restored = inverse_adjust_target_pose(adjusted, config.alliance, config.start_pos);
                assert_pose_eq(restored, pose);
            }
        }
    }

    #[test]
    fn test_heading_only_form_matches_pose_form() {
        for config in StartConfig::ALL {
            let pose = Pose2D::new(8.0, -3.0, 45.0);
            assert_eq!(
                config.adjust_heading(45.0),
                config.adjust(pose).heading,
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_start_poses_are_mirrored() {
        let red_left = StartConfig::new(Alliance::Red, StartPos::Left).start_pose(18.0);
        let blue_left = StartConfig::new(Alliance::Blue, StartPos::Left).start_pose(18.0);
        assert_eq!(red_left.x, -blue_left.x);
        assert_eq!(red_left.y, -blue_left.y);
        assert_eq!(red_left.heading, 0.0);
        assert_eq!(blue_left.heading, 180.0);
        assert_eq!(red_left.y, -(HALF_FIELD_INCHES - 9.0));
    }
}
