// 50 Hz drive control loop with watchdogs
// Commands arrive over zenoh and only the newest one per tick is applied.
// Manual drive stops when commands go stale; closed-loop modes stop when
// localization goes stale. Either way the base is left stopped, never
// running on old data.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationStore, SteerCalibration};
use crate::config::{
    CMD_TIMEOUT, DriveConfig, LOOP_HZ, POSE_TIMEOUT, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_POSE,
    TOPIC_RT_MODULES, TOPIC_START_POSE,
};
use crate::drive::{DriveBase, DriveOrchestrator, ModeKind, TickReport};
use crate::messages::{DriveCommand, ModuleActuation, RuntimeHealth, RuntimeStatus};
use crate::pose::{Pose2D, StartConfig};

pub struct Runtime {
    orchestrator: DriveOrchestrator,
    start: StartConfig,
    store: CalibrationStore,
    /// Newest command and when it arrived
    pending: Option<(DriveCommand, Instant)>,
    /// Arrival time of the last command the orchestrator accepted
    cmd_received_at: Instant,
    pose: Option<Pose2D>,
    pose_received_at: Instant,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(orchestrator: DriveOrchestrator, start: StartConfig, store: CalibrationStore) -> Self {
        let now = Instant::now();
        Self {
            orchestrator,
            start,
            store,
            pending: None,
            cmd_received_at: now,
            pose: None,
            pose_received_at: now,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn orchestrator(&self) -> &DriveOrchestrator {
        &self.orchestrator
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            health: self.health,
            mode: self.orchestrator.mode_kind(),
            anti_defense: self.orchestrator.is_anti_defense_enabled(),
            owner: self.orchestrator.exclusive_owner().cloned(),
        }
    }

    /// Queue a command for the next tick, replacing any queued one
    pub fn on_command(&mut self, cmd: DriveCommand) {
        self.on_command_at(cmd, Instant::now());
    }

    fn on_command_at(&mut self, cmd: DriveCommand, now: Instant) {
        debug!("Received command: {:?}", &cmd);
        if let Some((dropped, _)) = self.pending.replace((cmd, now)) {
            debug!("Superseded command: {:?}", dropped);
        }
    }

    pub fn on_pose(&mut self, pose: Pose2D) {
        self.on_pose_at(pose, Instant::now());
    }

    fn on_pose_at(&mut self, pose: Pose2D, now: Instant) {
        self.pose = Some(pose);
        self.pose_received_at = now;
    }

    fn apply(&mut self, cmd: DriveCommand, received_at: Instant) {
        let orch = &mut self.orchestrator;
        let result = match cmd {
            DriveCommand::Manual {
                x,
                y,
                rotation,
                owner,
            } => orch.drive_manual(owner.as_ref(), x, y, rotation),
            DriveCommand::HoldPosition {
                target,
                frame,
                owner,
            } => orch.hold_position(owner.as_ref(), frame.resolve(target, &self.start)),
            DriveCommand::FollowPath {
                points,
                frame,
                owner,
            } => {
                let points = points
                    .into_iter()
                    .map(|p| frame.resolve(p, &self.start))
                    .collect();
                orch.follow_path(owner.as_ref(), points)
            }
            DriveCommand::Cancel => {
                orch.cancel();
                Ok(())
            }
            DriveCommand::AntiDefense { enabled, owner } => {
                orch.set_anti_defense(owner.as_ref(), enabled)
            }
            DriveCommand::SteerCalibrationPoint { point, owner } => {
                orch.set_steer_calibration_point(owner.as_ref(), point)
            }
            DriveCommand::SetSteerCalibration {
                module,
                minus90,
                plus90,
                owner,
            } => orch.set_steer_calibration(
                owner.as_ref(),
                module,
                SteerCalibration::new(minus90, plus90),
            ),
            DriveCommand::SaveCalibration => {
                // Keep running on the in-memory values if the write fails
                if let Err(e) = self.store.save(&orch.calibration()) {
                    warn!("Failed to save steering calibration: {}", e);
                }
                Ok(())
            }
        };

        // Only accepted commands feed the watchdog
        match result {
            Ok(()) => {
                self.cmd_received_at = received_at;
                self.health = RuntimeHealth::Ok;
            }
            Err(e) => warn!("Command rejected: {}", e),
        }
    }

    /// Apply the queued command, run the watchdogs and tick the orchestrator once
    pub fn step(&mut self, dt: f64) -> ModuleActuation {
        self.step_at(Instant::now(), dt)
    }

    fn step_at(&mut self, now: Instant, dt: f64) -> ModuleActuation {
        if let Some((cmd, received_at)) = self.pending.take() {
            self.apply(cmd, received_at);
        }

        match self.orchestrator.mode_kind() {
            ModeKind::Manual => {
                let cmd_age = now.saturating_duration_since(self.cmd_received_at);
                if cmd_age > CMD_TIMEOUT {
                    // Watchdog triggered - stop the robot
                    warn!("Command stale ({:?} old), stopping robot", cmd_age);
                    self.orchestrator.cancel();
                    self.health = RuntimeHealth::CmdStale;
                }
            }
            ModeKind::PositionHold | ModeKind::PathFollow => {
                let pose_age = now.saturating_duration_since(self.pose_received_at);
                if self.pose.is_none() || pose_age > POSE_TIMEOUT {
                    warn!("Pose stale ({:?} old), stopping closed-loop drive", pose_age);
                    self.orchestrator.cancel();
                    self.health = RuntimeHealth::PoseStale;
                }
            }
            ModeKind::Idle => {}
        }

        let pose = self.pose.unwrap_or_default();
        match self.orchestrator.tick(&pose, dt) {
            TickReport::Fault(_) => self.health = RuntimeHealth::Fault,
            TickReport::PathComplete => info!("Path complete"),
            _ => {}
        }

        ModuleActuation::from(&self.orchestrator)
    }
}

/// Load calibration, build the drive base and run the control loop forever
pub async fn run(
    config: DriveConfig,
    start: StartConfig,
    store: CalibrationStore,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // A malformed calibration file aborts startup; a missing one keeps defaults
    let mut config = config;
    config.validate()?;
    info!("Steering calibration file: {}", store.path().display());
    store.load_into(&mut config.calibration)?;

    let base = DriveBase::with_detached_actuators(&config);
    let orchestrator = DriveOrchestrator::new(&config, base);
    let mut runtime = Runtime::new(orchestrator, start, store);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let cmd_subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pose_subscriber = session.declare_subscriber(TOPIC_POSE).await?;
    let pub_modules = session.declare_publisher(TOPIC_RT_MODULES).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    // Tell localization where the robot starts
    let start_pose = start.start_pose(config.robot_length);
    info!("Start {:?} at {:?}", start, start_pose);
    session
        .put(TOPIC_START_POSE, serde_json::to_string(&start_pose)?)
        .await?;

    let period = Duration::from_millis(1000 / LOOP_HZ);
    let dt = period.as_secs_f64();
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms command watchdog, {}ms pose watchdog",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis(),
        POSE_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_DRIVE, TOPIC_POSE);
    info!("Publishing to: {}, {}", TOPIC_RT_MODULES, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain pending pose updates, keep latest
        while let Ok(Some(sample)) = pose_subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<Pose2D>(&payload) {
                Ok(pose) => runtime.on_pose(pose),
                Err(e) => warn!("Failed to parse pose: {}", e),
            }
        }

        // 2. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = cmd_subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 3. Apply command, run watchdogs, compute actuation
        let actuation = runtime.step(dt);

        // 4. Publish actuation
        let actuation_json = serde_json::to_string(&actuation)?;
        pub_modules.put(actuation_json).await?;

        // 5. Publish health
        let status_json = serde_json::to_string(&runtime.status())?;
        pub_health.put(status_json).await?;
    }
}
