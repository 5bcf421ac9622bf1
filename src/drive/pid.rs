use serde::{Deserialize, Serialize};

/// Gains and limits for one control channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Errors within this band count as on target and produce no output
    pub tolerance: f64,
    /// Output magnitude cap
    pub output_limit: f64,
}

impl PidConfig {
    pub const fn new(kp: f64, ki: f64, kd: f64, tolerance: f64, output_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            tolerance,
            output_limit,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pid {
    config: PidConfig,
    prev_error: Option<f64>,
    integral: f64,
}

impl Pid {
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            prev_error: None,
            integral: 0.0,
        }
    }

    pub fn on_target(&self, error: f64) -> bool {
        error.abs() <= self.config.tolerance
    }

    /// Controller output for `error` after `dt` seconds
    pub fn next(&mut self, error: f64, dt: f64) -> f64 {
        if self.on_target(error) {
            self.reset();
            return 0.0;
        }

        let limit = self.config.output_limit.abs();
        self.integral += error * dt;
        if self.config.ki != 0.0 {
            let i_max = limit / self.config.ki.abs();
            self.integral = self.integral.clamp(-i_max, i_max);
        }

        let derivative = match self.prev_error {
            Some(prev) if dt > 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.prev_error = Some(error);

        let output =
            self.config.kp * error + self.config.ki * self.integral + self.config.kd * derivative;
        output.clamp(-limit, limit)
    }

    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0.0;
    }
}
