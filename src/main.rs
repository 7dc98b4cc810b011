//! Spork - runs a build command and streams structured events.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spork::display;
use spork::events::{EventFactory, DEFAULT_EVENT_BUFFER};
use spork::run::{RunCommand, TaskRun};

#[derive(Parser)]
#[command(
    name = "spork",
    about = "Runs a build command and turns its console output into a structured event stream",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit events as JSON objects, one per line.
    #[arg(long)]
    json: bool,

    /// Extra environment variables for the command.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// The command to run (passed to /bin/sh -c).
    command: String,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn parse_env_pair(pair: &str) -> Option<(String, String)> {
    pair.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut command = RunCommand::new(&cli.command);
    for pair in &cli.env {
        match parse_env_pair(pair) {
            Some((name, value)) => command = command.env(name, value),
            None => {
                eprintln!("spork: ignoring malformed --env value: {pair}");
            }
        }
    }

    let (mut task, notifications) = TaskRun::new(command);
    let mut events = EventFactory::new().into_channel(notifications, DEFAULT_EVENT_BUFFER);

    if let Err(err) = task.start().await {
        eprintln!("spork: {err}");
        return ExitCode::FAILURE;
    }

    // First Ctrl-C asks the run to stop; the child group gets SIGTERM,
    // then SIGKILL after the grace period.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(err) = task.stop() {
                tracing::debug!(error = %err, "stop after ctrl-c");
            }
        }
    });

    while let Some(event) = events.recv().await {
        if cli.json {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(err) => tracing::warn!(error = %err, "failed to serialize event"),
            }
        } else {
            display::print_event(&event);
        }

        if event.is_terminal() {
            break;
        }
    }

    ExitCode::SUCCESS
}
