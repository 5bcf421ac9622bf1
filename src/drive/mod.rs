// Swerve drive control
//
// Provides:
// - Swerve module abstraction over drive/steer actuator capabilities
// - Four-module inverse kinematics and the drive base built on it
// - X/Y/heading PID channels and a pure-pursuit path follower
// - The mode orchestrator and its exclusive-access lock

pub mod access;
pub mod actuator;
pub mod base;
pub mod kinematics;
pub mod module;
pub mod orchestrator;
pub mod path;
pub mod pid;

pub use access::{ExclusiveAccess, OwnerToken};
pub use actuator::{DetachedActuator, DriveMotor, Localizer, SteerServo};
pub use base::{DriveBase, ModuleActuators};
pub use module::{CalibrationPoint, ModuleId, ModuleState, SwerveModule};
pub use orchestrator::{DriveError, DriveMode, DriveOrchestrator, ModeKind, TickFault, TickReport};

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::actuator::{DriveMotor, SteerServo};
    use super::base::{DriveBase, ModuleActuators};
    use crate::config::DriveConfig;

    /// Actuator that records every command; clones share the log
    #[derive(Clone, Default)]
    pub struct Recorder(Rc<RefCell<Vec<f64>>>);

    impl Recorder {
        pub fn last(&self) -> Option<f64> {
            self.0.borrow().last().copied()
        }

        pub fn count(&self) -> usize {
            self.0.borrow().len()
        }

        pub fn clear(&self) {
            self.0.borrow_mut().clear();
        }
    }

    impl DriveMotor for Recorder {
        fn set_power(&mut self, power: f64) {
            self.0.borrow_mut().push(power);
        }
    }

    impl SteerServo for Recorder {
        fn set_logical_position(&mut self, position: f64) {
            self.0.borrow_mut().push(position);
        }
    }

    /// Drive base wired to recorders, returned as (drive, steer) per module
    pub fn recorded_base(config: &DriveConfig) -> (DriveBase, [(Recorder, Recorder); 4]) {
        let recorders: [(Recorder, Recorder); 4] = Default::default();
        let actuators: [ModuleActuators; 4] = std::array::from_fn(|i| {
            (
                Box::new(recorders[i].0.clone()) as Box<dyn DriveMotor>,
                Box::new(recorders[i].1.clone()) as Box<dyn SteerServo>,
            )
        });
        (DriveBase::new(config, actuators), recorders)
    }
}
