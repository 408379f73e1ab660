//! Arrival rules: raw drafts as stored, and the normalized form the engine
//! evaluates.
//!
//! All numeric sanitizing happens here, once, at load time. Evaluation code
//! downstream can rely on every [`Rule`] invariant without re-checking.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::NetworkFingerprint;
use crate::types::Coords;

pub const RADIUS_MIN_M: f64 = 40.0;
pub const RADIUS_MAX_M: f64 = 1200.0;
pub const RADIUS_DEFAULT_M: f64 = 120.0;

pub const COOLDOWN_MIN_MINUTES: u32 = 1;
pub const COOLDOWN_MAX_MINUTES: u32 = 1440;
pub const COOLDOWN_DEFAULT_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule has an empty id")]
    EmptyId,

    #[error("rule {rule_id}: position trigger needs a latitude and longitude")]
    MissingGeofence { rule_id: String },

    #[error("rule {rule_id}: coordinates out of range ({lat}, {lon})")]
    InvalidCoordinates { rule_id: String, lat: String, lon: String },
}

// ─── Draft ────────────────────────────────────────────────────────

/// A rule exactly as the rule store holds it. Every field except `id` may
/// be missing or out of range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub cooldown_minutes: Option<f64>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub by_position: Option<bool>,
    #[serde(default)]
    pub by_network: Option<bool>,
    #[serde(default)]
    pub by_charging: Option<bool>,
    #[serde(default)]
    pub network: Option<NetworkFingerprint>,
}

impl RuleDraft {
    /// A position-only draft centred on `(lat, lon)`.
    pub fn at(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat: Some(lat),
            lon: Some(lon),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = Some(radius_m);
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, minutes: f64) -> Self {
        self.cooldown_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn with_recipients(mut self, recipients: &[&str]) -> Self {
        self.recipients = recipients.iter().map(|r| (*r).to_string()).collect();
        self
    }

    /// Normalize into an evaluable [`Rule`].
    pub fn normalize(self) -> Result<Rule, RuleError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(RuleError::EmptyId);
        }

        let triggers = normalize_triggers(
            self.by_position,
            self.by_network,
            self.by_charging,
            self.network.unwrap_or_default().normalized(),
        );

        // Coordinates only matter to a position trigger; elsewhere bad ones
        // are dropped along with the geofence.
        let geofence = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if valid_coords(lat, lon) => Some(Geofence {
                center: Coords::new(lat, lon),
                radius_m: clamp_radius(self.radius_m),
            }),
            (Some(lat), Some(lon)) if triggers.by_position => {
                return Err(RuleError::InvalidCoordinates {
                    rule_id: id,
                    lat: lat.to_string(),
                    lon: lon.to_string(),
                });
            }
            _ => None,
        };
        if triggers.by_position && geofence.is_none() {
            return Err(RuleError::MissingGeofence { rule_id: id });
        }

        let label = self
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| id.clone());

        Ok(Rule {
            label,
            address: self.address.unwrap_or_default(),
            geofence,
            cooldown_minutes: clamp_cooldown(self.cooldown_minutes),
            recipients: dedup_recipients(self.recipients),
            triggers,
            enabled: self.enabled.unwrap_or(true),
            id,
        })
    }
}

// ─── Rule ─────────────────────────────────────────────────────────

/// Circular region around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center: Coords,
    pub radius_m: f64,
}

/// Which signals a rule requires. At least one flag is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConditions {
    pub by_position: bool,
    pub by_network: bool,
    pub by_charging: bool,
    /// Expected network, consulted only when `by_network` is set.
    pub network: NetworkFingerprint,
}

/// A normalized arrival rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub label: String,
    /// Free text, display only.
    pub address: String,
    /// Present whenever `triggers.by_position` is set.
    pub geofence: Option<Geofence>,
    pub cooldown_minutes: u32,
    pub recipients: Vec<String>,
    pub triggers: TriggerConditions,
    pub enabled: bool,
}

impl Rule {
    /// Disabled rules and rules nobody would be told about are never evaluated.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.recipients.is_empty()
    }

    /// Minimum interval between two fires of this rule.
    pub fn cooldown_ms(&self) -> i64 {
        i64::from(self.cooldown_minutes.max(COOLDOWN_MIN_MINUTES)) * 60_000
    }
}

// ─── Normalization helpers ────────────────────────────────────────

fn normalize_triggers(
    by_position: Option<bool>,
    by_network: Option<bool>,
    by_charging: Option<bool>,
    network: NetworkFingerprint,
) -> TriggerConditions {
    let by_network = by_network.unwrap_or(false);
    let by_charging = by_charging.unwrap_or(false);
    // No other condition requested: fall back to the geofence.
    let by_position = by_position.unwrap_or(false) || (!by_network && !by_charging);
    TriggerConditions {
        by_position,
        by_network,
        by_charging,
        network,
    }
}

fn clamp_radius(raw: Option<f64>) -> f64 {
    match raw {
        Some(r) if r.is_finite() => r.clamp(RADIUS_MIN_M, RADIUS_MAX_M),
        _ => RADIUS_DEFAULT_M,
    }
}

fn clamp_cooldown(raw: Option<f64>) -> u32 {
    match raw {
        Some(m) if m.is_finite() => {
            let m = m.round().clamp(
                f64::from(COOLDOWN_MIN_MINUTES),
                f64::from(COOLDOWN_MAX_MINUTES),
            );
            m as u32
        }
        _ => COOLDOWN_DEFAULT_MINUTES,
    }
}

fn valid_coords(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

fn dedup_recipients(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for r in raw {
        let r = r.trim();
        if !r.is_empty() && !out.iter().any(|seen| seen == r) {
            out.push(r.to_string());
        }
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────
