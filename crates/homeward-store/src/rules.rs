//! Rule and escalation config store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use homeward_core::{EscalationConfig, EscalationConfigDraft, Rule, RuleDraft};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Source of user-defined rules and the escalation config.
pub trait RuleStore: Send + Sync {
    /// Every rule that normalized cleanly. Rules that fail normalization are
    /// skipped; duplicate ids fail the whole load.
    fn load_rules(&self) -> Result<Vec<Rule>, StoreError>;

    fn load_config(&self) -> Result<EscalationConfig, StoreError>;
}

impl<T: RuleStore + ?Sized> RuleStore for &T {
    fn load_rules(&self) -> Result<Vec<Rule>, StoreError> {
        (**self).load_rules()
    }

    fn load_config(&self) -> Result<EscalationConfig, StoreError> {
        (**self).load_config()
    }
}

/// On-disk layout of the rules file.
///
/// ```toml
/// [escalation.stage2]
/// delay_minutes = 20
/// channel = "push"
///
/// [[rules]]
/// id = "home"
/// lat = 49.4178
/// lon = 2.8261
/// radius_m = 120
/// recipients = ["alice"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub escalation: EscalationConfigDraft,
    #[serde(default)]
    pub rules: Vec<RuleDraft>,
}

impl RulesFile {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Normalize every draft, skipping invalid ones.
    pub fn normalized_rules(self) -> Result<Vec<Rule>, StoreError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for draft in self.rules {
            match draft.normalize() {
                Ok(rule) => {
                    if !seen.insert(rule.id.clone()) {
                        return Err(StoreError::DuplicateRuleId(rule.id));
                    }
                    rules.push(rule);
                }
                Err(e) => tracing::warn!("skipping rule: {e}"),
            }
        }
        Ok(rules)
    }
}

/// Rules and escalation config read from a TOML file on every load, so
/// edits take effect on the next cycle.
pub struct TomlRuleStore {
    path: PathBuf,
}

impl TomlRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RulesFile, StoreError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        RulesFile::from_toml(&content).map_err(|source| StoreError::Toml {
            path: self.path.clone(),
            source,
        })
    }
}

impl RuleStore for TomlRuleStore {
    fn load_rules(&self) -> Result<Vec<Rule>, StoreError> {
        self.read()?.normalized_rules()
    }

    fn load_config(&self) -> Result<EscalationConfig, StoreError> {
        Ok(self.read()?.escalation.normalize()?)
    }
}

// ─── Tests ────────────────────────────────────────────────────────
