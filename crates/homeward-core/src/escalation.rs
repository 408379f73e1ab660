//! Escalation schedule for "are you back yet?" reminders.
//!
//! A trip has three escalation stages. Each stage fires a fixed number of
//! minutes after a base timestamp, chosen in priority order:
//!
//! 1. the expected arrival time, if known
//! 2. now + the estimated trip duration, if known
//! 3. now
//!
//! The base is never earlier than now: an arrival time already in the past
//! anchors the schedule at the present moment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timers are never scheduled closer than this to their registration.
pub const MIN_TIMER_DELAY_SECS: i64 = 5;

/// Upper bound on a single stage delay (one week).
pub const MAX_STAGE_DELAY_MINUTES: u32 = 10_080;

pub const DEFAULT_STAGES: [EscalationStage; 3] = [
    EscalationStage::new(0, Channel::Local),
    EscalationStage::new(15, Channel::Push),
    EscalationStage::new(30, Channel::Sms),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscalationError {
    #[error("unknown delivery channel: {0:?} (expected local, push or sms)")]
    UnknownChannel(String),
}

// ─── Channel ──────────────────────────────────────────────────────

/// How a stage is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// On-device notification.
    Local,
    Push,
    Sms,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Local, Self::Push, Self::Sms];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Push => "push",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = EscalationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "push" => Ok(Self::Push),
            "sms" => Ok(Self::Sms),
            _ => Err(EscalationError::UnknownChannel(s.to_string())),
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStage {
    pub delay_minutes: u32,
    pub channel: Channel,
}

impl EscalationStage {
    pub const fn new(delay_minutes: u32, channel: Channel) -> Self {
        Self {
            delay_minutes,
            channel,
        }
    }
}

/// Three stages with non-decreasing delays.
///
/// The only constructor, [`EscalationConfig::new`], pulls each stage up to be
/// no earlier than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EscalationConfig {
    stages: [EscalationStage; 3],
}

impl EscalationConfig {
    pub fn new(mut stages: [EscalationStage; 3]) -> Self {
        let mut floor = 0;
        for stage in &mut stages {
            stage.delay_minutes = stage.delay_minutes.min(MAX_STAGE_DELAY_MINUTES).max(floor);
            floor = stage.delay_minutes;
        }
        Self { stages }
    }

    pub fn stages(&self) -> &[EscalationStage; 3] {
        &self.stages
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STAGES)
    }
}

/// One stage as stored; both fields optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDraft {
    #[serde(default)]
    pub delay_minutes: Option<f64>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Escalation config exactly as the config store holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfigDraft {
    #[serde(default)]
    pub stage1: Option<StageDraft>,
    #[serde(default)]
    pub stage2: Option<StageDraft>,
    #[serde(default)]
    pub stage3: Option<StageDraft>,
}

impl EscalationConfigDraft {
    /// Fill defaults, sanitize delays and enforce stage ordering.
    pub fn normalize(self) -> Result<EscalationConfig, EscalationError> {
        let drafts = [self.stage1, self.stage2, self.stage3];
        let mut stages = DEFAULT_STAGES;
        for (stage, draft) in stages.iter_mut().zip(drafts) {
            let Some(draft) = draft else { continue };
            if let Some(minutes) = draft.delay_minutes.filter(|m| m.is_finite() && *m >= 0.0) {
                stage.delay_minutes = minutes.round().min(f64::from(MAX_STAGE_DELAY_MINUTES)) as u32;
            }
            if let Some(channel) = draft.channel {
                stage.channel = channel.parse()?;
            }
        }
        Ok(EscalationConfig::new(stages))
    }
}

// ─── Schedule ─────────────────────────────────────────────────────

/// Where the schedule's base timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseSource {
    ExpectedArrival,
    EstimatedDuration,
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledStage {
    pub at: DateTime<Utc>,
    /// Seconds from `now` until `at`, never below [`MIN_TIMER_DELAY_SECS`].
    pub delay_secs: i64,
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationSchedule {
    pub now: DateTime<Utc>,
    pub base: DateTime<Utc>,
    pub base_source: BaseSource,
    /// The requested base lay in the past and was moved to `now`.
    pub clamped: bool,
    pub stages: [ScheduledStage; 3],
}

/// Compute the escalation schedule for a trip starting at `now`.
///
/// Pure and total: a non-finite or negative duration is ignored, and any
/// timestamp arithmetic that would overflow falls back to the unshifted time.
pub fn compute_schedule(
    config: &EscalationConfig,
    now: DateTime<Utc>,
    expected_arrival: Option<DateTime<Utc>>,
    estimated_duration_minutes: Option<f64>,
) -> EscalationSchedule {
    let (requested, base_source) = if let Some(arrival) = expected_arrival {
        (arrival, BaseSource::ExpectedArrival)
    } else if let Some(at) = estimated_duration_minutes.and_then(|m| after_duration(now, m)) {
        (at, BaseSource::EstimatedDuration)
    } else {
        (now, BaseSource::Now)
    };

    let clamped = requested < now;
    let base = requested.max(now);

    let mut floor = base;
    let stages = config.stages().map(|stage| {
        let at = base
            .checked_add_signed(TimeDelta::minutes(i64::from(stage.delay_minutes)))
            .unwrap_or(base)
            .max(floor);
        floor = at;
        ScheduledStage {
            at,
            delay_secs: timer_delay_secs(now, at),
            channel: stage.channel,
        }
    });

    EscalationSchedule {
        now,
        base,
        base_source,
        clamped,
        stages,
    }
}

fn after_duration(now: DateTime<Utc>, minutes: f64) -> Option<DateTime<Utc>> {
    if !minutes.is_finite() || minutes < 0.0 {
        return None;
    }
    let delta = TimeDelta::try_milliseconds((minutes * 60_000.0).round() as i64)?;
    now.checked_add_signed(delta)
}

/// `max(5, round((at - now) / 1s))`.
fn timer_delay_secs(now: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    let ms = at.signed_duration_since(now).num_milliseconds();
    let secs = (ms as f64 / 1000.0).round() as i64;
    secs.max(MIN_TIMER_DELAY_SECS)
}

// ─── Tests ────────────────────────────────────────────────────────
