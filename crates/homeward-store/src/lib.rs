//! homeward-store: IO boundary around the detection engine.
//! Collaborator traits (rule store, state store, signal providers,
//! dispatcher) and their file-backed implementations. No detection logic.

pub mod dispatch;
pub mod error;
pub mod rules;
pub mod signals;
pub mod state;

pub use dispatch::{Dispatcher, LogDispatcher, OutboxDispatcher, OutboxEntry};
pub use error::{DispatchError, SignalError, StoreError};
pub use rules::{RuleStore, RulesFile, TomlRuleStore};
pub use signals::{
    BatteryState, SignalProvider, SignalsFile, SnapshotFileProvider, StaticProvider, acquire,
};
pub use state::{JsonStateStore, MemoryStateStore, StateStore};
