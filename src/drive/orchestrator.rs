// Drive mode orchestration
//
// Exactly one mode owns the drive base at a time. Commands only select the
// mode; actuator output for closed-loop and manual modes is produced by
// `tick`, once per control cycle. Switching modes stops the base and drops
// the previous mode's controller state before the new mode is installed.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::access::{ExclusiveAccess, OwnerToken};
use super::actuator::Localizer;
use super::base::DriveBase;
use super::module::{CalibrationPoint, ModuleId};
use super::path::{PathConfig, PathFollower};
use super::pid::{Pid, PidConfig};
use crate::calibration::{CalibrationSet, SteerCalibration};
use crate::config::DriveConfig;
use crate::pose::{Pose2D, heading_error};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveError {
    #[error("Drive base is held by {holder}")]
    Busy { holder: OwnerToken },

    #[error("Anti-defense is engaged")]
    AntiDefenseEngaged,

    #[error("Path has no waypoints")]
    EmptyPath,

    #[error("Invalid steering calibration for {}: {calibration:?}", .module.name())]
    InvalidCalibration {
        module: ModuleId,
        calibration: SteerCalibration,
    },
}

/// Closed-loop control could not produce a safe output
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TickFault {
    #[error("Localization reported a non-finite pose")]
    NonFinitePose,

    #[error("Controller produced a non-finite output")]
    NonFiniteOutput,
}

/// X, Y and heading controllers. All errors are field-frame.
#[derive(Debug, Clone)]
struct AxisControllers {
    x: Pid,
    y: Pid,
    turn: Pid,
}

impl AxisControllers {
    fn new(x: PidConfig, y: PidConfig, turn: PidConfig) -> Self {
        Self {
            x: Pid::new(x),
            y: Pid::new(y),
            turn: Pid::new(turn),
        }
    }

    /// Drive toward `target`. Returns whether every channel is on target.
    fn drive_toward(
        &mut self,
        base: &mut DriveBase,
        pose: &Pose2D,
        target: &Pose2D,
        dt: f64,
    ) -> Result<bool, TickFault> {
        let ex = target.x - pose.x;
        let ey = target.y - pose.y;
        let eh = heading_error(target.heading, pose.heading);

        let fx = self.x.next(ex, dt);
        let fy = self.y.next(ey, dt);
        let rotation = self.turn.next(eh, dt);

        // Field-frame correction into the robot frame
        let (sin, cos) = pose.heading.to_radians().sin_cos();
        let rx = fx * cos - fy * sin;
        let ry = fx * sin + fy * cos;

        if !(rx.is_finite() && ry.is_finite() && rotation.is_finite()) {
            return Err(TickFault::NonFiniteOutput);
        }

        debug!(
            "err=({:.2}, {:.2}, {:.2}) out=({:.3}, {:.3}, {:.3})",
            ex, ey, eh, rx, ry, rotation
        );
        base.holonomic_drive(rx, ry, rotation);

        Ok(self.x.on_target(ex) && self.y.on_target(ey) && self.turn.on_target(eh))
    }
}

#[derive(Debug, Clone)]
pub struct PositionHold {
    target: Pose2D,
    controllers: AxisControllers,
}

impl PositionHold {
    pub fn target(&self) -> Pose2D {
        self.target
    }
}

#[derive(Debug, Clone)]
pub struct PathFollow {
    waypoints: Vec<Pose2D>,
    /// Built on the first tick, once the start pose is known
    follower: Option<PathFollower>,
    controllers: AxisControllers,
}

/// The active drive mode
#[derive(Debug, Clone, Default)]
pub enum DriveMode {
    #[default]
    Idle,
    Manual {
        x: f64,
        y: f64,
        rotation: f64,
    },
    PositionHold(PositionHold),
    PathFollow(PathFollow),
}

/// Mode tag without controller state, for logs and status messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Idle,
    Manual,
    PositionHold,
    PathFollow,
}

impl DriveMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            DriveMode::Idle => ModeKind::Idle,
            DriveMode::Manual { .. } => ModeKind::Manual,
            DriveMode::PositionHold(_) => ModeKind::PositionHold,
            DriveMode::PathFollow(_) => ModeKind::PathFollow,
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickReport {
    Idle,
    Manual,
    Holding { on_target: bool },
    Following { waypoint: usize },
    PathComplete,
    AntiDefense,
    Fault(TickFault),
}

pub struct DriveOrchestrator {
    base: DriveBase,
    mode: DriveMode,
    access: ExclusiveAccess,
    anti_defense: bool,
    x_pid: PidConfig,
    y_pid: PidConfig,
    turn_pid: PidConfig,
    path: PathConfig,
}

impl DriveOrchestrator {
    pub fn new(config: &DriveConfig, base: DriveBase) -> Self {
        Self {
            base,
            mode: DriveMode::Idle,
            access: ExclusiveAccess::new(),
            anti_defense: false,
            x_pid: config.x_pid,
            y_pid: config.y_pid,
            turn_pid: config.turn_pid,
            path: config.path,
        }
    }

    pub fn base(&self) -> &DriveBase {
        &self.base
    }

    pub fn mode(&self) -> &DriveMode {
        &self.mode
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// True while a closed-loop mode is running
    pub fn is_closed_loop_active(&self) -> bool {
        matches!(self.mode, DriveMode::PositionHold(_) | DriveMode::PathFollow(_))
    }

    pub fn is_anti_defense_enabled(&self) -> bool {
        self.anti_defense
    }

    pub fn exclusive_owner(&self) -> Option<&OwnerToken> {
        self.access.holder()
    }

    pub fn acquire_exclusive_access(&mut self, owner: &OwnerToken) -> bool {
        self.access.acquire(owner)
    }

    pub fn release_exclusive_access(&mut self, owner: &OwnerToken) -> bool {
        self.access.release(owner)
    }

    fn check_owner(&self, owner: Option<&OwnerToken>) -> Result<(), DriveError> {
        match self.access.holder() {
            Some(holder) if !self.access.validate(owner) => Err(DriveError::Busy {
                holder: holder.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn check_command(&self, owner: Option<&OwnerToken>) -> Result<(), DriveError> {
        self.check_owner(owner)?;
        if self.anti_defense {
            return Err(DriveError::AntiDefenseEngaged);
        }
        Ok(())
    }

    /// Stop whatever is running and install `mode`
    fn switch_to(&mut self, mode: DriveMode) {
        if !matches!(self.mode, DriveMode::Idle) {
            info!("Cancelling {:?} for {:?}", self.mode.kind(), mode.kind());
            self.base.stop();
        }
        self.mode = mode;
    }

    fn closed_loop_controllers(&self, x_tol: f64, y_tol: f64, turn_tol: f64) -> AxisControllers {
        AxisControllers::new(
            PidConfig {
                tolerance: x_tol,
                ..self.x_pid
            },
            PidConfig {
                tolerance: y_tol,
                ..self.y_pid
            },
            PidConfig {
                tolerance: turn_tol,
                ..self.turn_pid
            },
        )
    }

    /// Open-loop robot-centric drive. Values are powers in [-1, 1].
    pub fn drive_manual(
        &mut self,
        owner: Option<&OwnerToken>,
        x: f64,
        y: f64,
        rotation: f64,
    ) -> Result<(), DriveError> {
        self.check_command(owner)?;
        // Manual to manual just replaces the setpoint
        if let DriveMode::Manual { .. } = self.mode {
            self.mode = DriveMode::Manual { x, y, rotation };
        } else {
            info!("Entering manual drive");
            self.switch_to(DriveMode::Manual { x, y, rotation });
        }
        Ok(())
    }

    /// Hold a field pose on independent X, Y and heading loops until cancelled
    pub fn hold_position(
        &mut self,
        owner: Option<&OwnerToken>,
        target: Pose2D,
    ) -> Result<(), DriveError> {
        self.check_command(owner)?;
        let controllers = self.closed_loop_controllers(
            self.x_pid.tolerance,
            self.y_pid.tolerance,
            self.turn_pid.tolerance,
        );
        info!("Holding position {:?}", target);
        self.switch_to(DriveMode::PositionHold(PositionHold {
            target,
            controllers,
        }));
        Ok(())
    }

    /// Follow `waypoints` (field poses with end headings) from the current pose
    pub fn follow_path(
        &mut self,
        owner: Option<&OwnerToken>,
        waypoints: Vec<Pose2D>,
    ) -> Result<(), DriveError> {
        self.check_command(owner)?;
        if waypoints.is_empty() {
            return Err(DriveError::EmptyPath);
        }
        // Waypoints are reached on distance; keep the per-axis deadband inside
        // that circle so the controllers never go quiet short of it
        let axis_tolerance = self.path.pos_tolerance / SQRT_2;
        let controllers = self.closed_loop_controllers(
            axis_tolerance,
            axis_tolerance,
            self.path.turn_tolerance,
        );
        info!(
            "Following path of {} waypoints (fast mode {})",
            waypoints.len(),
            self.path.fast_mode
        );
        self.switch_to(DriveMode::PathFollow(PathFollow {
            waypoints,
            follower: None,
            controllers,
        }));
        Ok(())
    }

    /// Stop the active mode and zero the drive. No-op when idle.
    pub fn cancel(&mut self) {
        if matches!(self.mode, DriveMode::Idle) {
            return;
        }
        info!("Cancelling {:?}", self.mode.kind());
        self.mode = DriveMode::Idle;
        self.base.stop();
    }

    /// Lock the wheels in an X so the robot is hard to push.
    ///
    /// An ownership-aware caller must win exclusive access to engage, and
    /// disengaging releases it. A caller without a token can only engage
    /// while nobody holds the base.
    pub fn set_anti_defense(
        &mut self,
        owner: Option<&OwnerToken>,
        enabled: bool,
    ) -> Result<(), DriveError> {
        if enabled {
            let granted = match owner {
                Some(token) => self.access.acquire(token),
                None => self.access.validate(None),
            };
            if let (false, Some(holder)) = (granted, self.access.holder()) {
                return Err(DriveError::Busy {
                    holder: holder.clone(),
                });
            }
            self.cancel();
            self.anti_defense = true;
            self.base.set_x_formation();
            info!("Anti-defense engaged");
        } else {
            self.check_owner(owner)?;
            if self.anti_defense {
                self.anti_defense = false;
                self.base.stop();
                info!("Anti-defense disengaged");
            }
            if let Some(token) = owner {
                self.access.release(token);
            }
        }
        Ok(())
    }

    /// Drive every steering servo to a calibration reference. Cancels any mode.
    pub fn set_steer_calibration_point(
        &mut self,
        owner: Option<&OwnerToken>,
        point: CalibrationPoint,
    ) -> Result<(), DriveError> {
        self.check_command(owner)?;
        self.cancel();
        self.base.set_steer_calibration_point(point);
        Ok(())
    }

    pub fn calibration(&self) -> CalibrationSet {
        self.base.calibration()
    }

    pub fn apply_calibration(&mut self, calibration: &CalibrationSet) {
        self.base.apply_calibration(calibration);
    }

    /// Replace one module's steering calibration. Takes effect on the next
    /// steer command; `SaveCalibration` persists it.
    pub fn set_steer_calibration(
        &mut self,
        owner: Option<&OwnerToken>,
        module: ModuleId,
        calibration: SteerCalibration,
    ) -> Result<(), DriveError> {
        self.check_owner(owner)?;
        if !calibration.is_valid() {
            return Err(DriveError::InvalidCalibration {
                module,
                calibration,
            });
        }
        let mut set = self.calibration();
        set.set(module, calibration);
        self.apply_calibration(&set);
        info!("Steering calibration [{}] set to {:?}", module.name(), calibration);
        Ok(())
    }

    /// Stop on a fault and report it
    fn fault(&mut self, fault: TickFault) -> TickReport {
        warn!("{:?} stopped: {}", self.mode.kind(), fault);
        self.mode = DriveMode::Idle;
        self.base.stop();
        TickReport::Fault(fault)
    }

    /// Run the active mode for one control cycle of `dt` seconds
    pub fn tick(&mut self, localizer: &impl Localizer, dt: f64) -> TickReport {
        if self.anti_defense {
            self.base.set_x_formation();
            return TickReport::AntiDefense;
        }

        let pose = localizer.pose();
        let path_config = self.path;
        if self.is_closed_loop_active() && !pose.is_finite() {
            return self.fault(TickFault::NonFinitePose);
        }

        let result = match &mut self.mode {
            DriveMode::Idle => Ok(TickReport::Idle),
            DriveMode::Manual { x, y, rotation } => {
                self.base.holonomic_drive(*x, *y, *rotation);
                Ok(TickReport::Manual)
            }
            DriveMode::PositionHold(hold) => hold
                .controllers
                .drive_toward(&mut self.base, &pose, &hold.target, dt)
                .map(|on_target| TickReport::Holding { on_target }),
            DriveMode::PathFollow(follow) => {
                let follower = follow
                    .follower
                    .get_or_insert_with(|| PathFollower::new(pose, &follow.waypoints, path_config));
                match follower.lookahead(&pose) {
                    Some(target) => {
                        let waypoint = follower.current_waypoint();
                        follow
                            .controllers
                            .drive_toward(&mut self.base, &pose, &target, dt)
                            .map(|_| TickReport::Following { waypoint })
                    }
                    None => Ok(TickReport::PathComplete),
                }
            }
        };

        match result {
            Ok(TickReport::PathComplete) => {
                info!("Path complete at {:?}", pose);
                self.mode = DriveMode::Idle;
                self.base.stop();
                TickReport::PathComplete
            }
            Ok(report) => report,
            Err(fault) => self.fault(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::testing::{Recorder, recorded_base};

    type Recorders = [(Recorder, Recorder); 4];

    fn orchestrator() -> (DriveOrchestrator, Recorders) {
        let config = DriveConfig::default();
        let (base, recorders) = recorded_base(&config);
        (DriveOrchestrator::new(&config, base), recorders)
    }

    fn clear(recorders: &Recorders) {
        for (drive, steer) in recorders {
            drive.clear();
            steer.clear();
        }
    }

    const DT: f64 = 0.02;

    #[test]
    fn test_cancel_from_idle_is_noop() {
        let (mut orch, recorders) = orchestrator();
        orch.cancel();
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
        assert!(recorders.iter().all(|(d, s)| d.count() == 0 && s.count() == 0));
    }

    #[test]
    fn test_manual_writes_on_tick() {
        let (mut orch, recorders) = orchestrator();
        orch.drive_manual(None, 0.0, 0.6, 0.0).unwrap();
        // Commands only select the mode
        assert!(recorders.iter().all(|(d, _)| d.count() == 0));

        assert_eq!(orch.tick(&Pose2D::default(), DT), TickReport::Manual);
        for (drive, _) in &recorders {
            assert_eq!(drive.last(), Some(0.6));
        }
    }

    #[test]
    fn test_hold_position_drives_toward_target() {
        let (mut orch, _) = orchestrator();
        orch.hold_position(None, Pose2D::new(0.0, 24.0, 0.0)).unwrap();
        let report = orch.tick(&Pose2D::new(0.0, 0.0, 0.0), DT);
        assert_eq!(report, TickReport::Holding { on_target: false });
        for state in orch.base().module_states() {
            assert!(state.steer_angle.abs() < 1e-9);
            assert!(state.drive_power > 0.0);
        }
    }

    #[test]
    fn test_hold_position_rotates_field_error_into_robot_frame() {
        let (mut orch, _) = orchestrator();
        // Robot faces +x; target straight ahead of it
        orch.hold_position(None, Pose2D::new(24.0, 0.0, 90.0)).unwrap();
        orch.tick(&Pose2D::new(0.0, 0.0, 90.0), DT);
        for state in orch.base().module_states() {
            assert!(state.steer_angle.abs() < 1e-9, "{:?}", state);
            assert!(state.drive_power > 0.0);
        }
    }

    #[test]
    fn test_hold_position_on_target_stays_active() {
        let (mut orch, _) = orchestrator();
        let target = Pose2D::new(10.0, 10.0, 45.0);
        orch.hold_position(None, target).unwrap();
        assert_eq!(orch.tick(&target, DT), TickReport::Holding { on_target: true });
        assert_eq!(orch.mode_kind(), ModeKind::PositionHold);
        assert!(orch.base().module_states().iter().all(|s| s.drive_power == 0.0));
    }

    #[test]
    fn test_turn_output_is_capped() {
        let (mut orch, _) = orchestrator();
        let limit = DriveConfig::default().turn_pid.output_limit;
        orch.hold_position(None, Pose2D::new(0.0, 0.0, 179.0)).unwrap();
        orch.tick(&Pose2D::new(0.0, 0.0, 0.0), DT);
        for state in orch.base().module_states() {
            assert!(state.drive_power.abs() <= limit + 1e-9, "{:?}", state);
        }
    }

    #[test]
    fn test_hold_position_cancels_path_follower_first() {
        let (mut orch, recorders) = orchestrator();
        orch.follow_path(None, vec![Pose2D::new(0.0, 100.0, 0.0)]).unwrap();
        orch.tick(&Pose2D::default(), DT);
        assert!(orch.base().module_states().iter().all(|s| s.drive_power > 0.0));

        clear(&recorders);
        orch.hold_position(None, Pose2D::new(0.0, -50.0, 0.0)).unwrap();
        assert_eq!(orch.mode_kind(), ModeKind::PositionHold);
        // Follower was stopped synchronously
        for (drive, steer) in &recorders {
            assert_eq!(drive.last(), Some(0.0));
            assert_eq!(steer.count(), 0);
        }

        clear(&recorders);
        orch.tick(&Pose2D::default(), DT);
        for (drive, steer) in &recorders {
            assert_eq!(drive.count(), 1);
            assert_eq!(steer.count(), 1);
            // Holding drives backward, away from the old path direction
            assert!(drive.last().unwrap() < 0.0);
        }
    }

    #[test]
    fn test_follow_path_completes_and_goes_idle() {
        let (mut orch, _) = orchestrator();
        orch.follow_path(
            None,
            vec![Pose2D::new(0.0, 30.0, 0.0), Pose2D::new(30.0, 30.0, 90.0)],
        )
        .unwrap();

        assert!(matches!(
            orch.tick(&Pose2D::new(0.0, 0.0, 0.0), DT),
            TickReport::Following { waypoint: 1 }
        ));
        assert!(matches!(
            orch.tick(&Pose2D::new(0.0, 25.0, 0.0), DT),
            TickReport::Following { waypoint: 2 }
        ));
        assert_eq!(orch.tick(&Pose2D::new(30.0, 30.0, 90.0), DT), TickReport::PathComplete);
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
        assert!(orch.base().module_states().iter().all(|s| s.drive_power == 0.0));
    }

    #[test]
    fn test_path_keeps_driving_until_inside_completion_radius() {
        let (mut orch, _) = orchestrator();
        orch.follow_path(None, vec![Pose2D::new(0.0, 30.0, 0.0)]).unwrap();

        // Each axis is inside pos_tolerance but the distance is not
        let pose = Pose2D::new(1.9, 28.1, 0.0);
        for _ in 0..100 {
            assert!(matches!(orch.tick(&pose, DT), TickReport::Following { .. }));
            assert!(orch.base().module_states().iter().all(|s| s.drive_power.abs() > 0.0));
        }

        assert_eq!(orch.tick(&Pose2D::new(1.4, 28.6, 0.0), DT), TickReport::PathComplete);
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
    }

    #[test]
    fn test_path_without_fast_mode_passes_intermediate_waypoint() {
        let config = DriveConfig {
            path: PathConfig {
                fast_mode: false,
                ..PathConfig::default()
            },
            ..DriveConfig::default()
        };
        let (base, _) = recorded_base(&config);
        let mut orch = DriveOrchestrator::new(&config, base);
        orch.follow_path(
            None,
            vec![Pose2D::new(0.0, 30.0, 0.0), Pose2D::new(30.0, 30.0, 0.0)],
        )
        .unwrap();

        assert!(matches!(
            orch.tick(&Pose2D::new(1.9, 28.1, 0.0), DT),
            TickReport::Following { waypoint: 1 }
        ));
        assert!(orch.base().module_states().iter().all(|s| s.drive_power.abs() > 0.0));
        assert!(matches!(
            orch.tick(&Pose2D::new(0.5, 29.0, 0.0), DT),
            TickReport::Following { waypoint: 2 }
        ));
    }

    #[test]
    fn test_empty_path_rejected() {
        let (mut orch, _) = orchestrator();
        orch.drive_manual(None, 0.1, 0.0, 0.0).unwrap();
        assert_eq!(orch.follow_path(None, Vec::new()), Err(DriveError::EmptyPath));
        assert_eq!(orch.mode_kind(), ModeKind::Manual);
    }

    #[test]
    fn test_non_finite_pose_stops_closed_loop() {
        let (mut orch, _) = orchestrator();
        orch.hold_position(None, Pose2D::new(0.0, 24.0, 0.0)).unwrap();
        orch.tick(&Pose2D::default(), DT);

        let report = orch.tick(&Pose2D::new(f64::NAN, 0.0, 0.0), DT);
        assert_eq!(report, TickReport::Fault(TickFault::NonFinitePose));
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
        assert!(orch.base().module_states().iter().all(|s| s.drive_power == 0.0));
    }

    #[test]
    fn test_cancel_zeroes_modules() {
        let (mut orch, recorders) = orchestrator();
        orch.hold_position(None, Pose2D::new(0.0, 24.0, 0.0)).unwrap();
        orch.tick(&Pose2D::default(), DT);
        orch.cancel();
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
        for (drive, _) in &recorders {
            assert_eq!(drive.last(), Some(0.0));
        }
        assert_eq!(orch.tick(&Pose2D::default(), DT), TickReport::Idle);
    }

    #[test]
    fn test_anti_defense_locks_out_other_owner() {
        let (mut orch, _) = orchestrator();
        let auto = OwnerToken::new("auto");
        let teleop = OwnerToken::new("teleop");

        orch.set_anti_defense(Some(&auto), true).unwrap();
        assert!(orch.is_anti_defense_enabled());
        assert_eq!(orch.exclusive_owner(), Some(&auto));

        let busy = DriveError::Busy {
            holder: auto.clone(),
        };
        assert_eq!(orch.set_anti_defense(Some(&teleop), true), Err(busy.clone()));
        assert_eq!(orch.drive_manual(Some(&teleop), 1.0, 0.0, 0.0), Err(busy.clone()));
        assert_eq!(orch.drive_manual(None, 1.0, 0.0, 0.0), Err(busy.clone()));
        assert_eq!(orch.set_anti_defense(Some(&teleop), false), Err(busy));
        assert!(orch.is_anti_defense_enabled());

        assert_eq!(orch.tick(&Pose2D::default(), DT), TickReport::AntiDefense);

        orch.set_anti_defense(Some(&auto), false).unwrap();
        assert!(!orch.is_anti_defense_enabled());
        assert_eq!(orch.exclusive_owner(), None);
        orch.drive_manual(Some(&teleop), 1.0, 0.0, 0.0).unwrap();
    }

    #[test]
    fn test_anti_defense_holds_x_and_blocks_modes() {
        let (mut orch, _) = orchestrator();
        let auto = OwnerToken::new("auto");
        orch.drive_manual(None, 0.5, 0.0, 0.0).unwrap();
        orch.set_anti_defense(Some(&auto), true).unwrap();
        assert_eq!(orch.mode_kind(), ModeKind::Idle);
        assert_eq!(
            orch.hold_position(Some(&auto), Pose2D::default()),
            Err(DriveError::AntiDefenseEngaged)
        );

        let angles: Vec<f64> = orch.base().module_states().iter().map(|s| s.steer_angle).collect();
        for (a, e) in angles.iter().zip([-45.0, 45.0, 45.0, -45.0]) {
            assert!((a - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_untokened_anti_defense_does_not_take_lock() {
        let (mut orch, _) = orchestrator();
        orch.set_anti_defense(None, true).unwrap();
        assert!(orch.is_anti_defense_enabled());
        assert_eq!(orch.exclusive_owner(), None);
        orch.set_anti_defense(None, false).unwrap();
        assert!(!orch.is_anti_defense_enabled());
    }

    #[test]
    fn test_set_steer_calibration() {
        let (mut orch, recorders) = orchestrator();
        let cal = SteerCalibration::new(0.2, 0.8);
        orch.set_steer_calibration(None, ModuleId::FrontRight, cal).unwrap();
        assert_eq!(orch.calibration().get(ModuleId::FrontRight), cal);
        assert_eq!(orch.calibration().get(ModuleId::FrontLeft), SteerCalibration::default());

        orch.set_steer_calibration_point(None, CalibrationPoint::Zero).unwrap();
        assert_eq!(recorders[ModuleId::FrontRight.index()].1.last(), Some(0.5));
        orch.set_steer_calibration_point(None, CalibrationPoint::Plus90).unwrap();
        assert_eq!(recorders[ModuleId::FrontRight.index()].1.last(), Some(0.8));
    }

    #[test]
    fn test_invalid_steer_calibration_rejected() {
        let (mut orch, _) = orchestrator();
        let degenerate = SteerCalibration::new(0.5, 0.5);
        assert_eq!(
            orch.set_steer_calibration(None, ModuleId::BackLeft, degenerate),
            Err(DriveError::InvalidCalibration {
                module: ModuleId::BackLeft,
                calibration: degenerate,
            })
        );
        let nan = SteerCalibration::new(f64::NAN, 0.5);
        assert!(orch.set_steer_calibration(None, ModuleId::BackLeft, nan).is_err());
        assert_eq!(orch.calibration(), CalibrationSet::default());
    }

    #[test]
    fn test_set_steer_calibration_respects_owner() {
        let (mut orch, _) = orchestrator();
        let auto = OwnerToken::new("auto");
        orch.acquire_exclusive_access(&auto);
        let cal = SteerCalibration::new(0.1, 0.9);
        assert!(matches!(
            orch.set_steer_calibration(None, ModuleId::BackRight, cal),
            Err(DriveError::Busy { .. })
        ));
        orch.set_steer_calibration(Some(&auto), ModuleId::BackRight, cal).unwrap();
    }

    #[test]
    fn test_exclusive_access_via_orchestrator() {
        let (mut orch, _) = orchestrator();
        let a = OwnerToken::new("a");
        let b = OwnerToken::new("b");
        assert!(orch.acquire_exclusive_access(&a));
        assert!(!orch.acquire_exclusive_access(&b));
        assert!(orch.hold_position(Some(&a), Pose2D::default()).is_ok());
        assert!(orch.release_exclusive_access(&a));
        assert!(orch.acquire_exclusive_access(&b));
    }
}
