// Actuator and sensor capabilities consumed by the drive base.
// Real motor/servo/IMU drivers live outside this crate and implement these.

use crate::pose::Pose2D;

/// Drive wheel motor, open-loop power in [-1, 1]
pub trait DriveMotor {
    fn set_power(&mut self, power: f64);
}

/// Steering servo, addressed in calibrated logical units
pub trait SteerServo {
    fn set_logical_position(&mut self, position: f64);
}

/// Drive base localization feedback (field frame, inches and degrees)
pub trait Localizer {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn heading(&self) -> f64;

    fn pose(&self) -> Pose2D {
        Pose2D::new(self.x(), self.y(), self.heading())
    }
}

impl Localizer for Pose2D {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn heading(&self) -> f64 {
        self.heading
    }
}

/// Actuator with no hardware behind it. The runtime builds its base from
/// these and forwards module state to the hardware process instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedActuator;

impl DriveMotor for DetachedActuator {
    fn set_power(&mut self, _power: f64) {}
}

impl SteerServo for DetachedActuator {
    fn set_logical_position(&mut self, _position: f64) {}
}
