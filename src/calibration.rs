// Steering calibration persistence
//
// File format, one line per module in MODULE_NAMES order:
//     frontLeft: 0.12, 0.87
// The two numbers are the servo logical positions at -90 and +90 degrees.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::drive::module::ModuleId;

/// Module names in file order. Load and save both go through this list.
pub const MODULE_NAMES: [&str; 4] = ["frontLeft", "frontRight", "backLeft", "backRight"];

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid calibration data at line {line}: {reason}")]
    Format { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Logical servo positions for -90 and +90 degrees of steering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteerCalibration {
    pub minus90: f64,
    pub plus90: f64,
}

impl SteerCalibration {
    pub const fn new(minus90: f64, plus90: f64) -> Self {
        Self { minus90, plus90 }
    }

    /// Finite and non-degenerate, so the angle mapping is invertible
    pub fn is_valid(&self) -> bool {
        self.minus90.is_finite() && self.plus90.is_finite() && self.minus90 != self.plus90
    }

    /// Logical position for a steering angle in degrees (linear interpolation)
    pub fn logical_position(&self, angle: f64) -> f64 {
        let t = (angle + 90.0) / 180.0;
        self.minus90 + (self.plus90 - self.minus90) * t
    }

    /// Servo position for straight ahead
    pub fn zero_position(&self) -> f64 {
        (self.minus90 + self.plus90) / 2.0
    }
}

impl Default for SteerCalibration {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// One calibration record per module, indexed by [`ModuleId`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationSet {
    modules: [SteerCalibration; 4],
}

impl CalibrationSet {
    pub const fn new(modules: [SteerCalibration; 4]) -> Self {
        Self { modules }
    }

    pub fn get(&self, id: ModuleId) -> SteerCalibration {
        self.modules[id.index()]
    }

    pub fn set(&mut self, id: ModuleId, calibration: SteerCalibration) {
        self.modules[id.index()] = calibration;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, SteerCalibration)> + '_ {
        ModuleId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

/// Parse a calibration file. Either every module parses or nothing is returned.
pub fn parse_calibration(text: &str) -> Result<CalibrationSet> {
    let mut lines = text.lines();
    let mut modules = [SteerCalibration::default(); 4];

    for (i, expected) in MODULE_NAMES.iter().enumerate() {
        let line_no = i + 1;
        let line = lines.next().ok_or_else(|| CalibrationError::Format {
            line: line_no,
            reason: format!("missing entry for {}", expected),
        })?;
        modules[i] = parse_line(line, expected, line_no)?;
    }

    Ok(CalibrationSet::new(modules))
}

fn parse_line(line: &str, expected: &str, line_no: usize) -> Result<SteerCalibration> {
    let format_err = |reason: String| CalibrationError::Format {
        line: line_no,
        reason,
    };

    let (name, rest) = line
        .split_once(':')
        .ok_or_else(|| format_err(format!("no module name in {:?}", line)))?;
    if name.trim() != expected {
        return Err(format_err(format!(
            "expected module {}, found {:?}",
            expected, name
        )));
    }

    let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
    if fields.len() != 2 {
        return Err(format_err(format!(
            "expected 2 values for {}, found {}",
            expected,
            fields.len()
        )));
    }

    let mut values = [0.0f64; 2];
    for (value, field) in values.iter_mut().zip(&fields) {
        *value = field
            .parse()
            .map_err(|_| format_err(format!("invalid number {:?} for {}", field, expected)))?;
    }

    let calibration = SteerCalibration::new(values[0], values[1]);
    if !calibration.is_valid() {
        return Err(format_err(format!(
            "degenerate range {:?} for {}",
            values, expected
        )));
    }
    Ok(calibration)
}

/// Render a calibration set in file format. `{}` on f64 is the shortest
/// representation that parses back to the same value.
pub fn render_calibration(set: &CalibrationSet) -> String {
    let mut out = String::new();
    for (id, cal) in set.iter() {
        out.push_str(&format!("{}: {}, {}\n", id.name(), cal.minus90, cal.plus90));
    }
    out
}

/// Outcome of a non-failing load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// No calibration file; the built-in values were kept
    UsedDefaults,
}

/// Calibration file on disk
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace `calibration` with the file contents.
    ///
    /// A missing file keeps the current values. A malformed file is an error
    /// and leaves `calibration` untouched.
    pub fn load_into(&self, calibration: &mut CalibrationSet) -> Result<LoadOutcome> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Steering calibration file {} not found, using built-in defaults",
                    self.path.display()
                );
                return Ok(LoadOutcome::UsedDefaults);
            }
            Err(source) => {
                return Err(CalibrationError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let loaded = parse_calibration(&text)?;
        for (id, cal) in loaded.iter() {
            info!("Steering calibration [{}]: {:?}", id.name(), cal);
        }
        *calibration = loaded;
        Ok(LoadOutcome::Loaded)
    }

    pub fn save(&self, calibration: &CalibrationSet) -> Result<()> {
        fs::write(&self.path, render_calibration(calibration)).map_err(|source| {
            CalibrationError::Io {
                path: self.path.clone(),
                source,
            }
        })?;
        info!("Saved steering calibration to {}", self.path.display());
        Ok(())
    }
}
