use clap::Parser;
use ruline_presence::{Config, PresenceChannel, ScopeKey};
use std::panic;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Watch who is viewing a workflow version
#[derive(Parser, Debug)]
#[command(name = "ruline-presence", version)]
struct Args {
    project_id: String,
    workflow_id: String,
    version: u32,

    /// Do not seed the member list from the editor snapshot
    #[arg(long)]
    no_snapshot: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ruline_presence=debug,info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if args.no_snapshot {
        config.fetch_snapshot = false;
    }

    let Some(scope) = ScopeKey::new(args.project_id, args.workflow_id, args.version) else {
        error!("Project id, workflow id and a version above 0 are required");
        return ExitCode::from(2);
    };

    let mut channel = match PresenceChannel::new(&config) {
        Ok(channel) => channel,
        Err(e) => {
            error!("Failed to create presence channel: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut views = channel.subscribe();
    info!("Watching presence on {} via {}", scope, config.console_url);
    channel.open(Some(scope)).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                let names: Vec<&str> = view.members.iter().map(|m| m.name.as_str()).collect();
                info!(
                    status = ?view.status,
                    members = view.members.len(),
                    "Present: {}",
                    names.join(", ")
                );
            }
        }
    }

    channel.close().await;
    ExitCode::SUCCESS
}
