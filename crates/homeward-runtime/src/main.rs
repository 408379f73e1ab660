//! homeward: arrival detection daemon and escalation scheduler.
//! Wires the file-backed stores and providers into the detection engine.

use std::sync::Arc;

use clap::Parser;

use homeward_store::{JsonStateStore, RuleStore, StateStore, TomlRuleStore};

mod cli;
mod commands;
mod poll_loop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("HOMEWARD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let rules: Arc<dyn RuleStore> = Arc::new(TomlRuleStore::new(&args.rules));
    let state: Arc<dyn StateStore> = Arc::new(JsonStateStore::new(&args.state));

    match args.command {
        cli::Command::Daemon(opts) => {
            tracing::info!("homeward daemon starting");
            let collab = poll_loop::Collaborators::from_opts(rules, state, &opts.signals);
            poll_loop::run_daemon(opts, collab).await?;
        }
        cli::Command::Tick(opts) => {
            let collab = poll_loop::Collaborators::from_opts(rules, state, &opts);
            commands::cmd_tick(collab).await?;
        }
        cli::Command::Check(opts) => {
            commands::cmd_check(&*rules, &opts)?;
        }
        cli::Command::Schedule(opts) => {
            commands::cmd_schedule(&*rules, &opts)?;
        }
        cli::Command::State { action } => {
            commands::cmd_state(state, action.unwrap_or(cli::StateAction::Show))?;
        }
    }

    Ok(())
}
