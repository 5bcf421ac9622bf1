// Swerve inverse kinematics for a four-module base
// Converts robot-frame commands (x, y, rotation) to per-module angle and power.
//
// Robot frame: x to the right, y forward, rotation clockwise positive.
// Module angle is measured clockwise from forward, in degrees.

/// Largest power any module may be asked for
const MAX_POWER: f64 = 1.0;

/// Below this a module is treated as stationary and keeps its heading
const MIN_SPEED: f64 = 1e-9;

/// Angle and power for one module
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModuleCommand {
    pub angle: f64,
    pub power: f64,
}

impl ModuleCommand {
    pub fn new(angle: f64, power: f64) -> Self {
        Self { angle, power }
    }
}

/// Module mounting offsets from the base center, inches, in ModuleId order
#[derive(Debug, Clone, Copy)]
pub struct BaseGeometry {
    offsets: [(f64, f64); 4],
}

impl BaseGeometry {
    pub fn new(width: f64, length: f64) -> Self {
        let (hw, hl) = (width / 2.0, length / 2.0);
        Self {
            // [front left, front right, back left, back right]
            offsets: [(-hw, hl), (hw, hl), (-hw, -hl), (hw, -hl)],
        }
    }

    pub fn offsets(&self) -> [(f64, f64); 4] {
        self.offsets
    }

    /// Distance from center to the farthest module
    fn radius(&self) -> f64 {
        self.offsets
            .iter()
            .map(|&(x, y)| x.hypot(y))
            .fold(0.0, f64::max)
    }
}

/// Fold an angle into the servo's half turn. Outside ±90° the wheel is
/// pointed the opposite way and spun backwards instead.
fn fold_half_turn(angle: f64, power: f64) -> (f64, f64) {
    if angle > 90.0 {
        (angle - 180.0, -power)
    } else if angle < -90.0 {
        (angle + 180.0, -power)
    } else {
        (angle, power)
    }
}

/// Convert a robot-frame command to module commands.
///
/// # Arguments
/// * `x` - Strafe power (positive = right)
/// * `y` - Forward power (positive = forward)
/// * `rotation` - Turn power (positive = clockwise); 1.0 spins the farthest
///   module at full power
/// * `previous` - Last module angles, kept when a module would stand still
pub fn robot_to_modules(
    geometry: &BaseGeometry,
    x: f64,
    y: f64,
    rotation: f64,
    previous: [f64; 4],
) -> [ModuleCommand; 4] {
    let radius = geometry.radius();
    let omega = if radius > 0.0 { rotation / radius } else { 0.0 };

    let mut commands = [ModuleCommand::default(); 4];
    for (i, &(px, py)) in geometry.offsets.iter().enumerate() {
        // Velocity of a point on a body turning clockwise: (omega * py, -omega * px)
        let vx = x + omega * py;
        let vy = y - omega * px;
        let speed = vx.hypot(vy);

        commands[i] = if speed < MIN_SPEED {
            ModuleCommand::new(previous[i], 0.0)
        } else {
            let (angle, power) = fold_half_turn(vx.atan2(vy).to_degrees(), speed);
            ModuleCommand::new(angle, power)
        };
    }

    // Scale everything down together so the direction of travel is preserved
    let max_power = commands.iter().map(|c| c.power.abs()).fold(0.0, f64::max);
    if max_power > MAX_POWER {
        let scale = MAX_POWER / max_power;
        for c in &mut commands {
            c.power *= scale;
        }
    }

    commands
}

/// Module angles that lock the wheels into an X so the base resists pushing
pub fn x_formation(geometry: &BaseGeometry) -> [ModuleCommand; 4] {
    geometry.offsets.map(|(px, py)| {
        let (angle, _) = fold_half_turn(px.atan2(py).to_degrees(), 0.0);
        ModuleCommand::new(angle, 0.0)
    })
}
