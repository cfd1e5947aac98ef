#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod telemetry;

use clap::Parser;
use config::{AppConfig, CliArgs, ClockKind, Command};
use snowmint::{MonotonicClock, Registry};
use telemetry::init_tracing;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_tracing();

    match config.command {
        Command::Generate {
            worker_id,
            machine_id,
            count,
            threads,
            decode,
        } => {
            let request = commands::GenerateRequest {
                worker_id,
                machine_id,
                count,
                threads,
                decode,
            };
            match config.clock {
                ClockKind::System => commands::generate(&Registry::new(), config.layout, &request),
                ClockKind::Monotonic => commands::generate(
                    &Registry::with_time_source(MonotonicClock::new()),
                    config.layout,
                    &request,
                ),
            }
        }
        Command::Decode { ids } => commands::decode(config.layout, &ids),
    }
}
