//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "homeward", about = "arrival detection and escalation scheduling")]
pub struct Cli {
    /// Rules and escalation config (TOML)
    #[arg(long, short = 'r', global = true, env = "HOMEWARD_RULES", default_value = "homeward.toml")]
    pub rules: PathBuf,

    /// Detector state file (JSON)
    #[arg(long, global = true, env = "HOMEWARD_STATE", default_value = "homeward-state.json")]
    pub state: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the periodic detection loop until interrupted
    Daemon(DaemonOpts),
    /// Run a single detection cycle and commit it
    Tick(SignalOpts),
    /// Evaluate every rule against the current signals without touching state
    Check(SignalOpts),
    /// Compute the escalation schedule for a trip starting now
    Schedule(ScheduleOpts),
    /// Inspect or reset the detector state
    State {
        #[command(subcommand)]
        action: Option<StateAction>,
    },
}

#[derive(clap::Args, Clone)]
pub struct SignalOpts {
    /// Signals file written by the platform agent (JSON)
    #[arg(long, env = "HOMEWARD_SIGNALS", default_value = "homeward-signals.json")]
    pub signals: PathBuf,

    /// Treat signals older than this many seconds as absent
    #[arg(long)]
    pub signals_max_age_secs: Option<u32>,

    /// Append fired rules to this JSON-lines file instead of logging them
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Seconds between detection cycles
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    #[command(flatten)]
    pub signals: SignalOpts,
}

#[derive(clap::Args)]
pub struct ScheduleOpts {
    /// Expected arrival time (RFC 3339)
    #[arg(long)]
    pub expected_arrival: Option<String>,

    /// Estimated trip duration in minutes, used when no arrival time is given
    #[arg(long)]
    pub duration_minutes: Option<f64>,
}

#[derive(Subcommand, Clone, Copy)]
pub enum StateAction {
    /// Print the persisted state (default)
    Show,
    /// Forget eligibility and fire history
    Reset,
}
