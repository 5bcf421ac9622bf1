// Four-module swerve drive base
//
// Combines kinematics and the modules into robot-level commands.

use tracing::{debug, info};

use super::actuator::{DetachedActuator, DriveMotor, SteerServo};
use super::kinematics::{BaseGeometry, ModuleCommand, robot_to_modules, x_formation};
use super::module::{CalibrationPoint, ModuleId, ModuleState, SwerveModule};
use crate::calibration::CalibrationSet;
use crate::config::DriveConfig;

/// Drive and steer actuator for one module
pub type ModuleActuators = (Box<dyn DriveMotor>, Box<dyn SteerServo>);

pub struct DriveBase {
    modules: [SwerveModule; 4],
    geometry: BaseGeometry,
}

impl DriveBase {
    /// Build the base from config and one actuator pair per module, in ModuleId order
    pub fn new(config: &DriveConfig, actuators: [ModuleActuators; 4]) -> Self {
        let mut index = 0;
        let modules = actuators.map(|(drive, steer)| {
            let id = ModuleId::ALL[index];
            index += 1;
            SwerveModule::new(
                id,
                config.calibration.get(id),
                config.steer_low_limit,
                config.steer_high_limit,
                drive,
                steer,
            )
        });

        info!(
            "Drive base {}x{} in, steering limits [{}, {}]",
            config.drive_base_width,
            config.drive_base_length,
            config.steer_low_limit,
            config.steer_high_limit
        );

        Self {
            modules,
            geometry: BaseGeometry::new(config.drive_base_width, config.drive_base_length),
        }
    }

    /// Build the base with detached actuators; module state is the only output
    pub fn with_detached_actuators(config: &DriveConfig) -> Self {
        let actuators: [ModuleActuators; 4] = std::array::from_fn(|_| {
            (
                Box::new(DetachedActuator) as Box<dyn DriveMotor>,
                Box::new(DetachedActuator) as Box<dyn SteerServo>,
            )
        });
        Self::new(config, actuators)
    }

    pub fn module_states(&self) -> [ModuleState; 4] {
        std::array::from_fn(|i| self.modules[i].state())
    }

    /// Robot-centric drive. Inputs are powers; see [`robot_to_modules`].
    pub fn holonomic_drive(&mut self, x: f64, y: f64, rotation: f64) {
        let previous = std::array::from_fn(|i| self.modules[i].state().steer_angle);
        let commands = robot_to_modules(&self.geometry, x, y, rotation, previous);
        self.apply(&commands);
    }

    /// Lock the wheels into an X
    pub fn set_x_formation(&mut self) {
        let commands = x_formation(&self.geometry);
        self.apply(&commands);
    }

    fn apply(&mut self, commands: &[ModuleCommand; 4]) {
        for (module, cmd) in self.modules.iter_mut().zip(commands) {
            module.set_steer_angle(cmd.angle);
            module.set_drive_power(cmd.power);
        }
        debug!("Module commands: {:?}", commands);
    }

    /// Zero drive power on all modules
    pub fn stop(&mut self) {
        for module in &mut self.modules {
            module.stop();
        }
    }

    pub fn calibration(&self) -> CalibrationSet {
        let mut set = CalibrationSet::default();
        for module in &self.modules {
            set.set(module.id(), module.calibration());
        }
        set
    }

    pub fn apply_calibration(&mut self, calibration: &CalibrationSet) {
        for module in &mut self.modules {
            module.set_calibration(calibration.get(module.id()));
        }
    }

    /// Point every steering servo at a calibration reference, drive stopped
    pub fn set_steer_calibration_point(&mut self, point: CalibrationPoint) {
        for module in &mut self.modules {
            module.stop();
            module.set_steer_calibration_point(point);
        }
    }
}

impl Drop for DriveBase {
    fn drop(&mut self) {
        // Leave the wheels unpowered
        self.stop();
    }
}
