//! Local-network identity matching.
//!
//! A rule records one fingerprint of "its" network. Matching uses the
//! highest-precedence field the rule recorded and ignores the rest:
//!
//! 1. network name (case-insensitive)
//! 2. hardware identifier (case-insensitive)
//! 3. IPv4 address prefix (first three octets)
//!
//! Lower-precedence fields are never consulted once a higher one is recorded,
//! even if the live observation lacks that field.

use serde::{Deserialize, Serialize};

use crate::types::NetworkObservation;

/// The network a rule expects the device to be on.
///
/// Blank strings are normalized to `None` by [`NetworkFingerprint::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFingerprint {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub address_prefix: Option<String>,
}

/// Which fingerprint field decides a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    Name,
    HardwareId,
    AddressPrefix,
}

impl NetworkFingerprint {
    /// Trim every field, drop blanks, and reduce a recorded address to its
    /// three-octet prefix.
    pub fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
            hardware_id: non_blank(self.hardware_id),
            address_prefix: non_blank(self.address_prefix)
                .map(|a| address_prefix(&a).unwrap_or(a)),
        }
    }

    /// The field that decides matching, if any was recorded.
    pub fn basis(&self) -> Option<MatchBasis> {
        if is_present(&self.name) {
            Some(MatchBasis::Name)
        } else if is_present(&self.hardware_id) {
            Some(MatchBasis::HardwareId)
        } else if is_present(&self.address_prefix) {
            Some(MatchBasis::AddressPrefix)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.basis().is_none()
    }
}

/// Whether the observed network is the one the fingerprint describes.
pub fn matches_network(expected: &NetworkFingerprint, observed: &NetworkObservation) -> bool {
    if !observed.on_local_network {
        return false;
    }

    match expected.basis() {
        Some(MatchBasis::Name) => eq_ignore_case(&expected.name, &observed.name),
        Some(MatchBasis::HardwareId) => eq_ignore_case(&expected.hardware_id, &observed.hardware_id),
        Some(MatchBasis::AddressPrefix) => {
            let observed_prefix = observed.address.as_deref().and_then(address_prefix);
            match (expected.address_prefix.as_deref(), observed_prefix) {
                (Some(want), Some(got)) => {
                    let want = address_prefix(want).unwrap_or_else(|| want.trim().to_string());
                    want == got
                }
                _ => false,
            }
        }
        None => false,
    }
}

/// First three dot-separated octets of an IPv4-style address.
///
/// `"192.168.1.23"` → `"192.168.1"`. Returns `None` for fewer than three
/// non-empty segments.
pub fn address_prefix(address: &str) -> Option<String> {
    let parts: Vec<&str> = address.trim().split('.').take(3).collect();
    if parts.len() < 3 || parts.iter().any(|p| p.trim().is_empty()) {
        return None;
    }
    Some(parts.join("."))
}

fn eq_ignore_case(expected: &Option<String>, observed: &Option<String>) -> bool {
    match (expected.as_deref(), observed.as_deref()) {
        (Some(want), Some(got)) => {
            let got = got.trim();
            !got.is_empty() && want.trim().eq_ignore_ascii_case(got)
        }
        _ => false,
    }
}

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn non_blank(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(name: Option<&str>, hw: Option<&str>, addr: Option<&str>) -> NetworkObservation {
        NetworkObservation {
            on_local_network: true,
            name: name.map(str::to_string),
            hardware_id: hw.map(str::to_string),
            address: addr.map(str::to_string),
        }
    }

    fn by_name(name: &str) -> NetworkFingerprint {
        NetworkFingerprint {
            name: Some(name.into()),
            ..NetworkFingerprint::default()
        }
    }

    #[test]
    fn name_matches_case_insensitively() {
        let obs = observed(Some("HomeNet"), None, None);
        assert!(matches_network(&by_name("homenet"), &obs));
    }

    #[test]
    fn name_mismatch_fails() {
        let obs = observed(Some("CafeWifi"), None, None);
        assert!(!matches_network(&by_name("HomeNet"), &obs));
    }

    #[test]
    fn name_takes_precedence_over_matching_hardware_id() {
        let expected = NetworkFingerprint {
            name: Some("HomeNet".into()),
            hardware_id: Some("aa:bb:cc:dd:ee:ff".into()),
            address_prefix: None,
        };
        // Hardware id matches but the name is unavailable: still no match.
        let obs = observed(None, Some("AA:BB:CC:DD:EE:FF"), None);
        assert!(!matches_network(&expected, &obs));
    }

    #[test]
    fn hardware_id_used_when_no_name_recorded() {
        let expected = NetworkFingerprint {
            hardware_id: Some("aa:bb:cc:dd:ee:ff".into()),
            ..NetworkFingerprint::default()
        };
        let obs = observed(Some("Whatever"), Some("AA:BB:CC:DD:EE:FF"), None);
        assert!(matches_network(&expected, &obs));
    }

    #[test]
    fn address_prefix_used_last() {
        let expected = NetworkFingerprint {
            address_prefix: Some("192.168.1".into()),
            ..NetworkFingerprint::default()
        };
        assert!(matches_network(
            &expected,
            &observed(None, None, Some("192.168.1.77"))
        ));
        assert!(!matches_network(
            &expected,
            &observed(None, None, Some("192.168.2.77"))
        ));
    }

    #[test]
    fn full_recorded_address_compares_by_prefix() {
        let expected = NetworkFingerprint {
            address_prefix: Some("10.0.4.12".into()),
            ..NetworkFingerprint::default()
        };
        assert!(matches_network(
            &expected,
            &observed(None, None, Some("10.0.4.200"))
        ));
    }

    #[test]
    fn not_on_local_network_never_matches() {
        let mut obs = observed(Some("HomeNet"), None, None);
        obs.on_local_network = false;
        assert!(!matches_network(&by_name("HomeNet"), &obs));
    }

    #[test]
    fn empty_fingerprint_never_matches() {
        let obs = observed(Some("HomeNet"), Some("aa"), Some("192.168.1.2"));
        assert!(!matches_network(&NetworkFingerprint::default(), &obs));
    }

    #[test]
    fn blank_name_falls_through_to_hardware_id() {
        let expected = NetworkFingerprint {
            name: Some("   ".into()),
            hardware_id: Some("aa".into()),
            address_prefix: None,
        };
        assert_eq!(expected.basis(), Some(MatchBasis::HardwareId));
        assert!(matches_network(&expected, &observed(None, Some("AA"), None)));
    }

    #[test]
    fn address_prefix_parsing() {
        assert_eq!(address_prefix("192.168.1.23").as_deref(), Some("192.168.1"));
        assert_eq!(address_prefix(" 10.0.0.1 ").as_deref(), Some("10.0.0"));
        assert_eq!(address_prefix("10.0.0").as_deref(), Some("10.0.0"));
        assert_eq!(address_prefix("10.0"), None);
        assert_eq!(address_prefix("10..1.2"), None);
        assert_eq!(address_prefix(""), None);
    }

    #[test]
    fn normalized_trims_and_reduces_address() {
        let fp = NetworkFingerprint {
            name: Some("  ".into()),
            hardware_id: Some(" aa:bb ".into()),
            address_prefix: Some("192.168.1.23".into()),
        }
        .normalized();
        assert_eq!(fp.name, None);
        assert_eq!(fp.hardware_id.as_deref(), Some("aa:bb"));
        assert_eq!(fp.address_prefix.as_deref(), Some("192.168.1"));
    }
}
