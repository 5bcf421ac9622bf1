use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use swerve_drive_runtime::calibration::CalibrationStore;
use swerve_drive_runtime::config::{DriveConfig, STEERING_CALIBRATION_FILE};
use swerve_drive_runtime::pose::{Alliance, StartConfig, StartPos};

/// Swerve drive control runtime
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Alliance for this match
    #[arg(long, value_enum, default_value = "red")]
    alliance: Alliance,

    /// Starting position on the alliance wall
    #[arg(long, value_enum, default_value = "left")]
    start_pos: StartPos,

    /// Steering calibration file
    #[arg(long, default_value = STEERING_CALIBRATION_FILE)]
    calibration_file: PathBuf,

    /// Drive base config (JSON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match DriveConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => DriveConfig::default(),
    };

    let start = StartConfig::new(args.alliance, args.start_pos);
    let store = CalibrationStore::new(args.calibration_file);

    if let Err(e) = swerve_drive_runtime::runtime::run(config, start, store).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
