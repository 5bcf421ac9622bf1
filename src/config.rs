// Timeouts, topics, field geometry and drive tuning
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationSet;
use crate::drive::path::PathConfig;
use crate::drive::pid::PidConfig;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Watchdog for manual commands; closed-loop modes run until cancelled
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Closed-loop control stops if localization goes quiet for this long
pub const POSE_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "swerve/cmd/drive"; // motion commands
pub const TOPIC_POSE: &str = "swerve/state/pose"; // localization feedback
pub const TOPIC_RT_MODULES: &str = "swerve/rt/modules"; // per-module actuation
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status
pub const TOPIC_START_POSE: &str = "swerve/cmd/start_pose"; // initial pose for localization

// Field dimensions (inches)
pub const FULL_FIELD_INCHES: f64 = 141.0;
pub const HALF_FIELD_INCHES: f64 = FULL_FIELD_INCHES / 2.0;
pub const FULL_TILE_INCHES: f64 = 23.75;

// Default steering calibration file, relative to the working directory
pub const STEERING_CALIBRATION_FILE: &str = "SteerCalibration.txt";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Everything the drive base needs at construction time.
///
/// Missing fields in a config file fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Distance between left and right module centers (inches)
    pub drive_base_width: f64,
    /// Distance between front and back module centers (inches)
    pub drive_base_length: f64,
    /// Bumper-to-bumper length, used for start poses (inches)
    pub robot_length: f64,
    /// Steering angle limits (degrees)
    pub steer_low_limit: f64,
    pub steer_high_limit: f64,
    /// Built-in steering calibration, used when no calibration file exists
    pub calibration: CalibrationSet,
    pub x_pid: PidConfig,
    pub y_pid: PidConfig,
    /// Output is capped low: heading is sampled slowly and fast turns oscillate
    pub turn_pid: PidConfig,
    pub path: PathConfig,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            drive_base_width: 13.0,
            drive_base_length: 13.0,
            robot_length: 17.0,
            steer_low_limit: -90.0,
            steer_high_limit: 90.0,
            calibration: CalibrationSet::default(),
            x_pid: PidConfig::new(0.095, 0.0, 0.0, 1.0, 1.0),
            y_pid: PidConfig::new(0.095, 0.0, 0.0, 1.0, 1.0),
            turn_pid: PidConfig::new(0.02, 0.0, 0.0, 1.0, 0.5),
            path: PathConfig::default(),
        }
    }
}

impl DriveConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the drive base cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.drive_base_width > 0.0 && self.drive_base_length > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "drive base must be positive, got {}x{}",
                self.drive_base_width, self.drive_base_length
            )));
        }
        if !(self.steer_low_limit.is_finite()
            && self.steer_high_limit.is_finite()
            && self.steer_low_limit <= self.steer_high_limit)
        {
            return Err(ConfigError::Invalid(format!(
                "steering limits [{}, {}] are reversed or not finite",
                self.steer_low_limit, self.steer_high_limit
            )));
        }
        for (id, cal) in self.calibration.iter() {
            if !cal.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "steering calibration for {} is degenerate: {:?}",
                    id.name(),
                    cal
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DriveConfig =
            serde_json::from_str(r#"{ "drive_base_width": 11.5, "path": { "fast_mode": false } }"#)
                .unwrap();
        assert_eq!(config.drive_base_width, 11.5);
        assert_eq!(config.drive_base_length, 13.0);
        assert!(!config.path.fast_mode);
        assert_eq!(config.path.following_distance, PathConfig::default().following_distance);
        assert_eq!(config.turn_pid.output_limit, 0.5);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(DriveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_degenerate_calibration_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.json");
        std::fs::write(
            &path,
            r#"{ "calibration": { "modules": [
                { "minus90": 0.5, "plus90": 0.5 },
                { "minus90": 0.0, "plus90": 1.0 },
                { "minus90": 0.0, "plus90": 1.0 },
                { "minus90": 0.0, "plus90": 1.0 }
            ] } }"#,
        )
        .unwrap();
        let err = DriveConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{}", err);
    }

    #[test]
    fn test_reversed_steer_limits_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive.json");
        std::fs::write(&path, r#"{ "steer_low_limit": 80.0, "steer_high_limit": -80.0 }"#).unwrap();
        let err = DriveConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{}", err);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = DriveConfig::from_json_file(Path::new("/nonexistent/drive.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
