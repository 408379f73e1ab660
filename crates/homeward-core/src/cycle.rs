//! One detection cycle over a fixed snapshot: eligibility, then the
//! rising-edge tracker.
//!
//! Holds no state of its own. The caller loads the previous
//! [`DetectorState`], runs [`run_cycle`], commits `next_state`, then
//! dispatches `fired`.

use chrono::{DateTime, Utc};

use crate::eligibility::{Eligibility, evaluate};
use crate::rule::Rule;
use crate::tracker::{RuleVerdict, advance};
use crate::types::{DetectorState, SignalSnapshot};

/// Everything one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub fired: Vec<Rule>,
    pub next_state: DetectorState,
    /// Breakdown per active rule.
    pub evaluations: Vec<Eligibility>,
    /// Tracker verdict per active rule, same order as `evaluations`.
    pub verdicts: Vec<(String, RuleVerdict)>,
    /// Rules skipped for being disabled or having no recipients.
    pub skipped: usize,
}

/// Run one cycle at wall-clock time `now`.
pub fn run_cycle(
    rules: &[Rule],
    snapshot: &SignalSnapshot,
    state: &DetectorState,
    now: DateTime<Utc>,
) -> CycleOutcome {
    let active: Vec<&Rule> = rules.iter().filter(|r| r.is_active()).collect();
    let skipped = rules.len() - active.len();

    let evaluations: Vec<Eligibility> = active.iter().map(|r| evaluate(r, snapshot)).collect();

    let samples = active
        .iter()
        .zip(&evaluations)
        .map(|(rule, eval)| (*rule, eval.is_eligible()));
    let tracked = advance(state, samples, now.timestamp_millis());

    CycleOutcome {
        fired: tracked.fired,
        next_state: tracked.next_state,
        evaluations,
        verdicts: tracked.verdicts,
        skipped,
    }
}
