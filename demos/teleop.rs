// Keyboard teleop: WASD strafe/drive, Z/X rotate, R/F speed, SPACE anti-defense, C cancel, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use swerve_drive_runtime::config::TOPIC_CMD_DRIVE;
use swerve_drive_runtime::drive::OwnerToken;
use swerve_drive_runtime::messages::DriveCommand;

const POWERS: [f64; 3] = [0.2, 0.5, 1.0];
const TURN_POWERS: [f64; 3] = [0.15, 0.3, 0.5];
const INPUT_TIMEOUT_MS: u64 = 100; // Reset powers after this much time with no input
const OWNER: &str = "teleop";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, SPACE=anti-defense, C=cancel, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn publish(
    publisher: &zenoh::pubsub::Publisher<'_>,
    cmd: &DriveCommand,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    publisher.put(serde_json::to_string(cmd)?).await?;
    Ok(())
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let owner = OwnerToken::new(OWNER);
    let mut speed_idx: usize = 0;
    let mut anti_defense = false;

    // Persistent power state
    let mut x = 0.0;
    let mut y = 0.0;
    let mut rotation = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update power and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        y = POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        y = -POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        x = -POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        x = POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation (clockwise positive)
                    KeyCode::Char('z') if pressed => {
                        rotation = -TURN_POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        rotation = TURN_POWERS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char(' ') if kind == KeyEventKind::Press => {
                        anti_defense = !anti_defense;
                        info!("Anti-defense: {}", anti_defense);
                        let cmd = DriveCommand::AntiDefense {
                            enabled: anti_defense,
                            owner: Some(owner.clone()),
                        };
                        publish(publisher, &cmd).await?;
                        continue;
                    }
                    KeyCode::Char('c') if pressed => {
                        publish(publisher, &DriveCommand::Cancel).await?;
                        continue;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset powers if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x = 0.0;
            y = 0.0;
            rotation = 0.0;
        }

        // Manual commands are refused while anti-defense holds the base
        if anti_defense {
            continue;
        }

        // Always publish at ~50Hz so the runtime watchdog stays fed
        let cmd = DriveCommand::Manual {
            x,
            y,
            rotation,
            owner: Some(owner.clone()),
        };
        publish(publisher, &cmd).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
