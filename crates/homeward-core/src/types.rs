use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// ─── Coordinates ──────────────────────────────────────────────────

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

impl Coords {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// ─── Signals ──────────────────────────────────────────────────────

/// What the device reports about its current local network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkObservation {
    pub on_local_network: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// One tick's worth of environmental signals.
///
/// Every field is optional: an absent field means the provider could not
/// answer, and any condition depending on it is unsatisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    #[serde(default)]
    pub coords: Option<Coords>,
    #[serde(default)]
    pub network: Option<NetworkObservation>,
    #[serde(default)]
    pub charging: Option<bool>,
}

impl SignalSnapshot {
    /// Snapshot with only a position fix.
    pub fn at(coords: Coords) -> Self {
        Self {
            coords: Some(coords),
            ..Self::default()
        }
    }
}

// ─── Detector State ───────────────────────────────────────────────

/// The engine's only mutable memory, persisted between cycles.
///
/// `DetectorState::default()` (nothing eligible, nothing fired) is the
/// valid input for the very first cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorState {
    /// Rules that satisfied all of their active conditions on the last tick.
    #[serde(default)]
    pub eligible_rule_ids: BTreeSet<String>,
    /// Epoch milliseconds of each rule's most recent fire.
    #[serde(default)]
    pub last_fired_at_by_rule: BTreeMap<String, i64>,
}

impl DetectorState {
    pub fn was_eligible(&self, rule_id: &str) -> bool {
        self.eligible_rule_ids.contains(rule_id)
    }

    pub fn last_fired_at(&self, rule_id: &str) -> Option<i64> {
        self.last_fired_at_by_rule.get(rule_id).copied()
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_empty() {
        let state = DetectorState::default();
        assert!(state.eligible_rule_ids.is_empty());
        assert!(state.last_fired_at_by_rule.is_empty());
        assert!(!state.was_eligible("home"));
        assert_eq!(state.last_fired_at("home"), None);
    }

    #[test]
    fn state_serializes_with_flat_camel_case_keys() {
        let mut state = DetectorState::default();
        state.eligible_rule_ids.insert("home".into());
        state.last_fired_at_by_rule.insert("home".into(), 1000);

        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "eligibleRuleIds": ["home"],
                "lastFiredAtByRule": {"home": 1000},
            })
        );
    }

    #[test]
    fn state_tolerates_missing_keys() {
        let state: DetectorState = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(state, DetectorState::default());
    }

    #[test]
    fn snapshot_fields_default_to_absent() {
        let snap: SignalSnapshot =
            serde_json::from_str(r#"{"charging": true}"#).expect("deserialize");
        assert!(snap.coords.is_none());
        assert!(snap.network.is_none());
        assert_eq!(snap.charging, Some(true));
    }
}
