//! Signal providers: where position, network identity and charging state
//! come from.
//!
//! Providers may fail; [`acquire`] turns every failure into an absent field
//! so the engine fails closed. One snapshot is taken per cycle and every
//! field of it comes from the same observation where the provider allows.

use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use homeward_core::{Coords, NetworkObservation, SignalSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Platform signal acquisition. Each method answers `Ok(None)` when the
/// platform has no value and `Err` when asking failed.
pub trait SignalProvider: Send + Sync {
    fn coords(&self) -> Result<Option<Coords>, SignalError>;
    fn network(&self) -> Result<Option<NetworkObservation>, SignalError>;
    fn charging(&self) -> Result<Option<bool>, SignalError>;

    /// All signals as observed together at `now`. Failed signals are logged
    /// and left absent.
    ///
    /// The default asks for each signal in turn. Providers backed by a single
    /// observation override this so every field comes from the same one.
    fn snapshot(&self, _now: DateTime<Utc>) -> SignalSnapshot {
        SignalSnapshot {
            coords: absent_on_error("coords", self.coords()),
            network: absent_on_error("network", self.network()),
            charging: absent_on_error("charging", self.charging()),
        }
    }
}

impl<T: SignalProvider + ?Sized> SignalProvider for &T {
    fn coords(&self) -> Result<Option<Coords>, SignalError> {
        (**self).coords()
    }

    fn network(&self) -> Result<Option<NetworkObservation>, SignalError> {
        (**self).network()
    }

    fn charging(&self) -> Result<Option<bool>, SignalError> {
        (**self).charging()
    }

    fn snapshot(&self, now: DateTime<Utc>) -> SignalSnapshot {
        (**self).snapshot(now)
    }
}

/// Build the snapshot one detection cycle at `now` evaluates.
pub fn acquire<P: SignalProvider + ?Sized>(provider: &P, now: DateTime<Utc>) -> SignalSnapshot {
    provider.snapshot(now)
}

fn absent_on_error<T>(signal: &str, result: Result<Option<T>, SignalError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{signal} signal unavailable: {e}");
            None
        }
    }
}

// ─── Battery ──────────────────────────────────────────────────────

/// Battery state as platforms report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    Charging,
    Full,
    Unplugged,
    #[default]
    Unknown,
}

impl BatteryState {
    /// `Full` counts as charging: the device is on external power.
    pub fn is_charging(self) -> Option<bool> {
        match self {
            Self::Charging | Self::Full => Some(true),
            Self::Unplugged => Some(false),
            Self::Unknown => None,
        }
    }
}

// ─── File provider ────────────────────────────────────────────────

/// Signals file written by a platform agent.
///
/// ```json
/// {
///   "observed_at": "2026-10-18T18:00:00Z",
///   "coords": {"lat": 49.4178, "lon": 2.8261},
///   "network": {"on_local_network": true, "name": "HomeNet"},
///   "battery": "charging"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalsFile {
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub coords: Option<Coords>,
    #[serde(default)]
    pub network: Option<NetworkObservation>,
    #[serde(default)]
    pub battery: BatteryState,
}

/// Reads the latest signals from a JSON file, once per snapshot.
///
/// With a maximum age set, a file whose `observed_at` is older than that (or
/// missing) is reported as stale and every signal reads as absent.
pub struct SnapshotFileProvider {
    path: PathBuf,
    max_age: Option<TimeDelta>,
}

impl SnapshotFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: None,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: TimeDelta) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Read and parse the file, judging staleness against `now`.
    pub fn read(&self, now: DateTime<Utc>) -> Result<SignalsFile, SignalError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            SignalError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        let file: SignalsFile = serde_json::from_str(&content)
            .map_err(|e| SignalError::Malformed(format!("{}: {e}", self.path.display())))?;

        if let Some(max_age) = self.max_age {
            let age = file.observed_at.map(|at| now.signed_duration_since(at));
            match age {
                Some(age) if age <= max_age => {}
                Some(age) => {
                    return Err(SignalError::Stale {
                        age_secs: age.num_seconds(),
                    });
                }
                None => {
                    return Err(SignalError::Malformed(
                        "observed_at is required when a maximum age is set".into(),
                    ));
                }
            }
        }
        Ok(file)
    }
}

impl SignalProvider for SnapshotFileProvider {
    fn coords(&self) -> Result<Option<Coords>, SignalError> {
        Ok(self.read(Utc::now())?.coords)
    }

    fn network(&self) -> Result<Option<NetworkObservation>, SignalError> {
        Ok(self.read(Utc::now())?.network)
    }

    fn charging(&self) -> Result<Option<bool>, SignalError> {
        Ok(self.read(Utc::now())?.battery.is_charging())
    }

    fn snapshot(&self, now: DateTime<Utc>) -> SignalSnapshot {
        match self.read(now) {
            Ok(file) => SignalSnapshot {
                coords: file.coords,
                network: file.network,
                charging: file.battery.is_charging(),
            },
            Err(e) => {
                tracing::warn!("signals unavailable: {e}");
                SignalSnapshot::default()
            }
        }
    }
}

/// Always answers with the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    snapshot: SignalSnapshot,
}

impl StaticProvider {
    pub fn new(snapshot: SignalSnapshot) -> Self {
        Self { snapshot }
    }
}

impl SignalProvider for StaticProvider {
    fn coords(&self) -> Result<Option<Coords>, SignalError> {
        Ok(self.snapshot.coords)
    }

    fn network(&self) -> Result<Option<NetworkObservation>, SignalError> {
        Ok(self.snapshot.network.clone())
    }

    fn charging(&self) -> Result<Option<bool>, SignalError> {
        Ok(self.snapshot.charging)
    }
}

// ─── Tests ────────────────────────────────────────────────────────
