// Message types exchanged with mission logic, localization and the hardware process

use serde::{Deserialize, Serialize};

use crate::drive::{
    CalibrationPoint, DriveOrchestrator, ModeKind, ModuleId, ModuleState, OwnerToken,
};
use crate::pose::{Pose2D, StartConfig, Units, path_point};

/// How the poses in a command are expressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFrame {
    /// Poses are authored for RED/LEFT and get mirrored for the actual start
    #[serde(default)]
    pub canonical: bool,
    /// Coordinates are in field tiles rather than inches
    #[serde(default)]
    pub tile_units: bool,
}

impl TargetFrame {
    /// Convert a command pose into a field pose in inches
    pub fn resolve(&self, pose: Pose2D, start: &StartConfig) -> Pose2D {
        let units = if self.tile_units {
            Units::Tiles
        } else {
            Units::Inches
        };
        let pose = path_point(pose.x, pose.y, pose.heading, units);
        if self.canonical {
            start.adjust(pose)
        } else {
            pose
        }
    }
}

// Command from mission logic / teleop -> runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriveCommand {
    Manual {
        x: f64,
        y: f64,
        rotation: f64,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    HoldPosition {
        target: Pose2D,
        #[serde(default)]
        frame: TargetFrame,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    FollowPath {
        points: Vec<Pose2D>,
        #[serde(default)]
        frame: TargetFrame,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    Cancel,
    AntiDefense {
        enabled: bool,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    /// Operator steering calibration: park the servos at a reference point
    SteerCalibrationPoint {
        point: CalibrationPoint,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    /// Store new servo positions for one module's -90 and +90 degree stops
    SetSteerCalibration {
        module: ModuleId,
        minus90: f64,
        plus90: f64,
        #[serde(default)]
        owner: Option<OwnerToken>,
    },
    /// Write the in-memory steering calibration to disk
    SaveCalibration,
}

// Actuation output from runtime -> hardware process
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModuleActuation {
    /// In calibration file order: front left, front right, back left, back right
    pub modules: [ModuleState; 4],
}

impl From<&DriveOrchestrator> for ModuleActuation {
    fn from(orch: &DriveOrchestrator) -> Self {
        Self {
            modules: orch.base().module_states(),
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    /// Manual drive stopped, no command within the watchdog timeout
    CmdStale,
    /// Closed-loop control stopped, localization went quiet
    PoseStale,
    /// Closed-loop control stopped on bad feedback or output
    Fault,
}

/// Status published alongside health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub health: RuntimeHealth,
    pub mode: ModeKind,
    pub anti_defense: bool,
    pub owner: Option<OwnerToken>,
}
