pub mod calibration;
pub mod config;
pub mod drive;
pub mod messages;
pub mod pose;
pub mod runtime;
pub mod transform;

pub use calibration::{CalibrationError, CalibrationSet, CalibrationStore, LoadOutcome, SteerCalibration};
pub use pose::{Alliance, Pose2D, StartConfig, StartPos};
pub use transform::{adjust_target_heading, adjust_target_pose};
