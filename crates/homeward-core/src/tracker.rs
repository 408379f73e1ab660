//! Rising-edge tracker with cooldown gating.
//!
//! Turns a per-tick eligibility boolean into at most one fire per continuous
//! eligible interval:
//!
//! - **Outside** (`!is`): nothing happens. A rule that was eligible on the
//!   previous tick is re-armed by leaving.
//! - **Entering** (`is && !was`): rising edge. Fires if the rule never fired
//!   or its cooldown has fully elapsed since the last fire.
//! - **Sustained** (`is && was`): nothing happens, however long it lasts.
//!
//! An entry blocked by the cooldown still counts as eligible, so the next
//! tick inside is Sustained: a fresh exit and re-entry is required before the
//! rule is considered again.

use serde::{Deserialize, Serialize};

use crate::rule::Rule;
use crate::types::DetectorState;

/// Edge classification from two consecutive eligibility samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePhase {
    Outside,
    Entering,
    Sustained,
}

impl EdgePhase {
    pub fn classify(was_eligible: bool, is_eligible: bool) -> Self {
        match (was_eligible, is_eligible) {
            (_, false) => Self::Outside,
            (false, true) => Self::Entering,
            (true, true) => Self::Sustained,
        }
    }
}

/// What the tracker decided for one rule on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum RuleVerdict {
    /// Not eligible now, not eligible before.
    Outside,
    /// Left the eligible state this tick; re-armed.
    Exited,
    /// Rising edge that passed the cooldown gate.
    Fired,
    /// Rising edge swallowed by the cooldown.
    CooldownBlocked { remaining_ms: i64 },
    /// Still eligible since the previous tick.
    Sustained,
}

impl RuleVerdict {
    pub fn fired(self) -> bool {
        matches!(self, Self::Fired)
    }
}

/// Decide one rule's verdict.
///
/// * `last_fired_at` - epoch ms of the previous fire, `None` if never fired.
/// * `cooldown_ms` - minimum interval between fires.
/// * `now_ms` - current epoch ms.
pub fn step(
    was_eligible: bool,
    is_eligible: bool,
    last_fired_at: Option<i64>,
    cooldown_ms: i64,
    now_ms: i64,
) -> RuleVerdict {
    match EdgePhase::classify(was_eligible, is_eligible) {
        EdgePhase::Outside if was_eligible => RuleVerdict::Exited,
        EdgePhase::Outside => RuleVerdict::Outside,
        EdgePhase::Sustained => RuleVerdict::Sustained,
        EdgePhase::Entering => match last_fired_at {
            None => RuleVerdict::Fired,
            Some(last) => {
                let elapsed = now_ms.saturating_sub(last);
                if elapsed >= cooldown_ms {
                    RuleVerdict::Fired
                } else {
                    RuleVerdict::CooldownBlocked {
                        remaining_ms: cooldown_ms.saturating_sub(elapsed),
                    }
                }
            }
        },
    }
}

/// Output of one tracker pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOutput {
    /// Rules that fired this tick, in input order.
    pub fired: Vec<Rule>,
    /// State to commit once the cycle completes.
    pub next_state: DetectorState,
    /// Verdict per evaluated rule, in input order.
    pub verdicts: Vec<(String, RuleVerdict)>,
}

/// Advance the tracker over every `(rule, is_eligible)` sample of this tick.
///
/// The eligible set of the returned state contains exactly the rules sampled
/// eligible here; nothing carries over from `state.eligible_rule_ids` except
/// through the edge classification. Fire timestamps of rules not sampled are
/// preserved.
pub fn advance<'a, I>(state: &DetectorState, samples: I, now_ms: i64) -> TrackerOutput
where
    I: IntoIterator<Item = (&'a Rule, bool)>,
{
    let mut next_state = DetectorState {
        eligible_rule_ids: Default::default(),
        last_fired_at_by_rule: state.last_fired_at_by_rule.clone(),
    };
    let mut fired = Vec::new();
    let mut verdicts = Vec::new();

    for (rule, is_eligible) in samples {
        let verdict = step(
            state.was_eligible(&rule.id),
            is_eligible,
            state.last_fired_at(&rule.id),
            rule.cooldown_ms(),
            now_ms,
        );

        if is_eligible {
            next_state.eligible_rule_ids.insert(rule.id.clone());
        }
        if verdict.fired() {
            next_state
                .last_fired_at_by_rule
                .insert(rule.id.clone(), now_ms);
            fired.push(rule.clone());
        }
        verdicts.push((rule.id.clone(), verdict));
    }

    TrackerOutput {
        fired,
        next_state,
        verdicts,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
