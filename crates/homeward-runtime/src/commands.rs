//! One-shot commands: tick, check, schedule, state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use homeward_core::{EscalationSchedule, Rule, compute_schedule, evaluate};
use homeward_store::{RuleStore, SnapshotFileProvider, StateStore, acquire};

use crate::cli::{ScheduleOpts, SignalOpts, StateAction};
use crate::poll_loop::{Collaborators, DetectionCycle, TickResult};

/// Run one detection cycle now and print the report.
pub async fn cmd_tick(collab: Collaborators) -> anyhow::Result<()> {
    let cycle = DetectionCycle::new(collab);
    match cycle.tick(Utc::now()).await? {
        TickResult::Completed(report) => print_json(&report),
        TickResult::Skipped => anyhow::bail!("a cycle is already in flight"),
    }
}

#[derive(Serialize)]
struct CheckEntry<'a> {
    label: &'a str,
    #[serde(flatten)]
    eligibility: homeward_core::Eligibility,
    eligible: bool,
}

/// Evaluate all rules against the current signals. State is not read or
/// written.
pub fn cmd_check(rules: &dyn RuleStore, opts: &SignalOpts) -> anyhow::Result<()> {
    let rules = rules.load_rules()?;
    let mut provider = SnapshotFileProvider::new(&opts.signals);
    if let Some(secs) = opts.signals_max_age_secs {
        provider = provider.with_max_age(chrono::TimeDelta::seconds(i64::from(secs)));
    }
    let snapshot = acquire(&provider, Utc::now());
    print_json(&check_entries(&rules, &snapshot))
}

fn check_entries<'a>(
    rules: &'a [Rule],
    snapshot: &homeward_core::SignalSnapshot,
) -> Vec<CheckEntry<'a>> {
    rules
        .iter()
        .map(|rule| {
            let eligibility = evaluate(rule, snapshot);
            CheckEntry {
                label: &rule.label,
                eligible: eligibility.is_eligible(),
                eligibility,
            }
        })
        .collect()
}

/// Compute and print the escalation schedule for a trip starting now.
pub fn cmd_schedule(rules: &dyn RuleStore, opts: &ScheduleOpts) -> anyhow::Result<()> {
    let config = rules.load_config()?;
    let schedule = build_schedule(&config, Utc::now(), opts);
    print_json(&schedule)
}

fn build_schedule(
    config: &homeward_core::EscalationConfig,
    now: DateTime<Utc>,
    opts: &ScheduleOpts,
) -> EscalationSchedule {
    let expected_arrival = opts
        .expected_arrival
        .as_deref()
        .and_then(parse_expected_arrival);
    compute_schedule(config, now, expected_arrival, opts.duration_minutes)
}

/// RFC 3339 timestamp, or `None` (with a warning) if it does not parse.
fn parse_expected_arrival(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("ignoring expected arrival {raw:?}: {e}");
            None
        }
    }
}

/// Print or reset the persisted detector state.
pub fn cmd_state(state: Arc<dyn StateStore>, action: StateAction) -> anyhow::Result<()> {
    match action {
        StateAction::Show => print_json(&state.load_state()?),
        StateAction::Reset => {
            state.save_state(&Default::default())?;
            tracing::info!("detector state reset");
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
