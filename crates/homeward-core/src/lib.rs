//! homeward-core: arrival detection and escalation scheduling.
//! Pure evaluation only: no IO, no clocks, no logging. Every function takes
//! its inputs (rules, signals, previous state, current time) as arguments.

pub mod cycle;
pub mod eligibility;
pub mod escalation;
pub mod geo;
pub mod identity;
pub mod rule;
pub mod tracker;
pub mod types;

pub use cycle::{CycleOutcome, run_cycle};
pub use eligibility::{ConditionOutcome, Eligibility, evaluate, is_eligible};
pub use escalation::{
    BaseSource, Channel, EscalationConfig, EscalationConfigDraft, EscalationError,
    EscalationSchedule, EscalationStage, ScheduledStage, StageDraft, compute_schedule,
};
pub use geo::distance_meters;
pub use identity::{NetworkFingerprint, address_prefix, matches_network};
pub use rule::{Geofence, Rule, RuleDraft, RuleError, TriggerConditions};
pub use tracker::{EdgePhase, RuleVerdict, TrackerOutput};
pub use types::{Coords, DetectorState, NetworkObservation, SignalSnapshot};
