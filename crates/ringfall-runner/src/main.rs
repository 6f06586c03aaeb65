//! Ringfall Runner
//!
//! Runs one headless session at 60Hz. Commands arrive line by line on stdin
//! (`start`, `stop`, `reset`, `ring <x> <z>`, `drop <kind> <x> <y> <z>`,
//! `status`, `quit`); game events are logged as JSON.
//!
//! The first argument selects the configuration: a preset name
//! (`ring_toss`, `basket_drop`) or a path to a JSON file.

use std::time::Duration;

use anyhow::Context;
use ringfall_core::{
    GameConfig, GameEvent, HeadlessScene, PHYSICS_DT, Session, SystemClock, TracingDisplay, ZoneId,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::Command;

mod command;

const DEFAULT_PRESET: &str = "ring_toss";

fn load_config(arg: Option<&str>) -> anyhow::Result<GameConfig> {
    let name = arg.unwrap_or(DEFAULT_PRESET);
    if let Some(config) = GameConfig::preset(name) {
        return Ok(config);
    }
    let json = std::fs::read_to_string(name)
        .with_context(|| format!("`{name}` is neither a preset nor a readable file"))?;
    GameConfig::from_json(&json).with_context(|| format!("invalid config in {name}"))
}

fn log_event(event: &GameEvent) {
    match serde_json::to_string(event) {
        Ok(json) => match event {
            GameEvent::Spawned { .. } => tracing::debug!(target: "ringfall::event", "{json}"),
            _ => tracing::info!(target: "ringfall::event", "{json}"),
        },
        Err(error) => tracing::warn!(%error, "failed to encode event"),
    }
}

/// Applies one command. Returns false when the runner should exit.
fn apply(session: &mut Session<HeadlessScene, TracingDisplay>, command: Command) -> bool {
    match command {
        Command::Start => {
            session.start();
        }
        Command::Stop => {
            session.stop();
        }
        Command::Reset => session.reset(),
        Command::Ring { x, z } => {
            let Some(zone) = session.zones().first() else {
                tracing::warn!("no zone to move");
                return true;
            };
            let (id, y) = (zone.id, zone.center[1]);
            if let Err(error) = session.move_zone(id, [x, y, z]) {
                tracing::warn!(%error, "move failed");
            }
        }
        Command::Drop { kind, position } => {
            let id = session.spawn_at(kind, position);
            tracing::info!(%id, ?kind, "dropped");
        }
        Command::Status => {
            tracing::info!(
                phase = ?session.phase(),
                score = session.score(),
                elapsed = ?session.elapsed(),
                entities = session.entity_count(),
                zone = ?session.zone(ZoneId(0)).map(|z| z.center),
                "status"
            );
        }
        Command::Quit => return false,
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let arg = std::env::args().nth(1);
    let config = load_config(arg.as_deref())?;
    let mut session = Session::new(config, SystemClock::new(), HeadlessScene::new(), TracingDisplay)?;

    let mut frames = tokio::time::interval(Duration::from_secs_f32(PHYSICS_DT));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    tracing::info!("ready: start | stop | reset | ring <x> <z> | drop <kind> <x> <y> <z> | status | quit");

    loop {
        tokio::select! {
            _ = frames.tick() => {
                for event in session.frame() {
                    log_event(&event);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    tracing::info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !apply(&mut session, command) {
                            break;
                        }
                    }
                    Err(error) => tracing::warn!(%error, "bad command"),
                }
            }
        }
    }

    tracing::info!(score = session.score(), "bye");
    Ok(())
}
