// One swerve module: a drive motor plus a steering servo
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actuator::{DriveMotor, SteerServo};
use crate::calibration::{MODULE_NAMES, SteerCalibration};

/// Module position on the drive base, in calibration file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl ModuleId {
    pub const ALL: [ModuleId; 4] = [
        ModuleId::FrontLeft,
        ModuleId::FrontRight,
        ModuleId::BackLeft,
        ModuleId::BackRight,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable name used in the calibration file
    pub const fn name(self) -> &'static str {
        MODULE_NAMES[self as usize]
    }
}

/// Servo pose used while calibrating the steering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPoint {
    Zero,
    Minus90,
    Plus90,
}

/// Last command sent to a module
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Steering angle after clamping (degrees)
    pub steer_angle: f64,
    /// Servo logical position sent for that angle
    pub steer_position: f64,
    /// Drive power in [-1, 1]
    pub drive_power: f64,
}

pub struct SwerveModule {
    id: ModuleId,
    calibration: SteerCalibration,
    steer_low: f64,
    steer_high: f64,
    drive: Box<dyn DriveMotor>,
    steer: Box<dyn SteerServo>,
    state: ModuleState,
}

impl SwerveModule {
    pub fn new(
        id: ModuleId,
        calibration: SteerCalibration,
        steer_low: f64,
        steer_high: f64,
        drive: Box<dyn DriveMotor>,
        steer: Box<dyn SteerServo>,
    ) -> Self {
        debug_assert!(steer_low <= steer_high, "steering limits reversed");
        Self {
            id,
            calibration,
            steer_low: steer_low.min(steer_high),
            steer_high: steer_high.max(steer_low),
            drive,
            steer,
            state: ModuleState {
                steer_position: calibration.zero_position(),
                ..ModuleState::default()
            },
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn calibration(&self) -> SteerCalibration {
        self.calibration
    }

    /// Swap in new calibration; takes effect on the next steer command
    pub fn set_calibration(&mut self, calibration: SteerCalibration) {
        self.calibration = calibration;
    }

    /// Steer to `angle` degrees, clamped to the steering limits.
    /// Returns the angle actually commanded.
    pub fn set_steer_angle(&mut self, angle: f64) -> f64 {
        let angle = if angle.is_finite() { angle } else { 0.0 };
        let angle = angle.clamp(self.steer_low, self.steer_high);
        let position = self.calibration.logical_position(angle);

        self.steer.set_logical_position(position);
        self.state.steer_angle = angle;
        self.state.steer_position = position;
        angle
    }

    pub fn set_drive_power(&mut self, power: f64) {
        let power = if power.is_finite() { power.clamp(-1.0, 1.0) } else { 0.0 };
        self.drive.set_power(power);
        self.state.drive_power = power;
    }

    /// Zero drive power, leave steering where it is
    pub fn stop(&mut self) {
        self.set_drive_power(0.0);
    }

    /// Put the servo straight at a calibration reference position
    pub fn set_steer_calibration_point(&mut self, point: CalibrationPoint) {
        let (angle, position) = match point {
            CalibrationPoint::Zero => (0.0, self.calibration.zero_position()),
            CalibrationPoint::Minus90 => (-90.0, self.calibration.minus90),
            CalibrationPoint::Plus90 => (90.0, self.calibration.plus90),
        };
        debug!("{} steer calibration point {:?} -> {}", self.id.name(), point, position);
        self.steer.set_logical_position(position);
        self.state.steer_angle = angle;
        self.state.steer_position = position;
    }
}
