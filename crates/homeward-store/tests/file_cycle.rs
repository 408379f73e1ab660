//! File-backed collaborators driving the pure cycle, the way the daemon
//! wires them.

use chrono::{DateTime, Utc};
use homeward_core::run_cycle;
use homeward_store::{
    Dispatcher, JsonStateStore, OutboxDispatcher, OutboxEntry, RuleStore, SnapshotFileProvider,
    StateStore, TomlRuleStore, acquire,
};

const RULES: &str = r#"
[[rules]]
id = "home"
label = "Home"
lat = 49.4178
lon = 2.8261
radius_m = 120
cooldown_minutes = 60
recipients = ["alice"]
"#;

const INSIDE: &str = r#"{"coords": {"lat": 49.4178, "lon": 2.8261}, "battery": "unplugged"}"#;
const AWAY: &str = r#"{"coords": {"lat": 49.4304, "lon": 2.8261}}"#;

fn at_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).expect("in range")
}

#[test]
fn cycle_over_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let rules_path = dir.path().join("homeward.toml");
    let signals_path = dir.path().join("signals.json");
    let outbox_path = dir.path().join("outbox.jsonl");
    std::fs::write(&rules_path, RULES).expect("write rules");

    let rules = TomlRuleStore::new(&rules_path);
    let states = JsonStateStore::new(dir.path().join("state.json"));
    let provider = SnapshotFileProvider::new(&signals_path);
    let outbox = OutboxDispatcher::new(&outbox_path);

    let tick = |signals: &str, now_ms: i64| -> usize {
        std::fs::write(&signals_path, signals).expect("write signals");
        let loaded = rules.load_rules().expect("rules");
        let state = states.load_state().expect("state");
        let now = at_ms(now_ms);
        let outcome = run_cycle(&loaded, &acquire(&provider, now), &state, now);
        states.save_state(&outcome.next_state).expect("save");
        for rule in &outcome.fired {
            outbox.notify(rule, now).expect("notify");
        }
        outcome.fired.len()
    };

    assert_eq!(tick(INSIDE, 1_000), 1);
    assert_eq!(tick(INSIDE, 2_000), 0);
    assert_eq!(tick(AWAY, 10 * 60_000), 0);
    assert_eq!(tick(INSIDE, 20 * 60_000), 0);
    assert_eq!(tick(AWAY, 61 * 60_000), 0);
    assert_eq!(tick(INSIDE, 62 * 60_000), 1);

    let entries: Vec<OutboxEntry> = std::fs::read_to_string(&outbox_path)
        .expect("outbox")
        .lines()
        .map(|l| serde_json::from_str(l).expect("entry"))
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].fired_at, at_ms(1_000));
    assert_eq!(entries[1].fired_at, at_ms(62 * 60_000));

    let state = states.load_state().expect("state");
    assert_eq!(state.last_fired_at("home"), Some(62 * 60_000));
}
