//! Per-rule eligibility: the conjunction of a rule's enabled conditions
//! against one signal snapshot.
//!
//! Fail-closed: a signal the providers could not read never satisfies a
//! condition.

use serde::{Deserialize, Serialize};

use crate::geo::distance_meters;
use crate::identity::matches_network;
use crate::rule::{RADIUS_MIN_M, Rule};
use crate::types::SignalSnapshot;

/// Result of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOutcome {
    /// The rule does not use this condition.
    NotRequired,
    Satisfied,
    Unsatisfied,
    /// Required, but the signal was absent this tick.
    Unknown,
}

impl ConditionOutcome {
    /// Contribution to the conjunction.
    pub fn passes(self) -> bool {
        matches!(self, Self::NotRequired | Self::Satisfied)
    }
}

/// Condition-by-condition breakdown for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub rule_id: String,
    /// False for disabled rules and rules without recipients.
    pub active: bool,
    pub position: ConditionOutcome,
    /// Distance to the geofence center, when a position fix was available.
    pub distance_m: Option<f64>,
    pub network: ConditionOutcome,
    pub charging: ConditionOutcome,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        self.active && self.position.passes() && self.network.passes() && self.charging.passes()
    }
}

/// Evaluate every condition of `rule` against `snapshot`.
pub fn evaluate(rule: &Rule, snapshot: &SignalSnapshot) -> Eligibility {
    let active = rule.is_active();
    let triggers = &rule.triggers;

    let distance_m = match (snapshot.coords, rule.geofence) {
        (Some(here), Some(fence)) => Some(distance_meters(here, fence.center)),
        _ => None,
    };

    let position = if !triggers.by_position {
        ConditionOutcome::NotRequired
    } else {
        match (distance_m, rule.geofence) {
            (Some(d), Some(fence)) => satisfied_if(d <= fence.radius_m.max(RADIUS_MIN_M)),
            _ => ConditionOutcome::Unknown,
        }
    };

    let network = if !triggers.by_network {
        ConditionOutcome::NotRequired
    } else {
        match &snapshot.network {
            Some(observed) => satisfied_if(matches_network(&triggers.network, observed)),
            None => ConditionOutcome::Unknown,
        }
    };

    let charging = if !triggers.by_charging {
        ConditionOutcome::NotRequired
    } else {
        match snapshot.charging {
            Some(c) => satisfied_if(c),
            None => ConditionOutcome::Unknown,
        }
    };

    Eligibility {
        rule_id: rule.id.clone(),
        active,
        position,
        distance_m,
        network,
        charging,
    }
}

/// Whether `rule` is eligible under `snapshot`. Never panics; missing data
/// yields `false`.
pub fn is_eligible(rule: &Rule, snapshot: &SignalSnapshot) -> bool {
    rule.is_active() && evaluate(rule, snapshot).is_eligible()
}

fn satisfied_if(ok: bool) -> ConditionOutcome {
    if ok {
        ConditionOutcome::Satisfied
    } else {
        ConditionOutcome::Unsatisfied
    }
}

// ─── Tests ────────────────────────────────────────────────────────
