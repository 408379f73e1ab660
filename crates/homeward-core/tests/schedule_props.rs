use chrono::{DateTime, TimeDelta, Utc};
use homeward_core::escalation::MIN_TIMER_DELAY_SECS;
use homeward_core::{EscalationConfigDraft, StageDraft, compute_schedule};
use proptest::prelude::*;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T18:00:00Z")
        .expect("valid RFC3339")
        .with_timezone(&Utc)
}

fn stage(delay: Option<f64>) -> Option<StageDraft> {
    Some(StageDraft {
        delay_minutes: delay,
        channel: None,
    })
}

fn raw_delay() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        Just(Some(f64::NAN)),
        Just(Some(f64::INFINITY)),
        (-1_000.0f64..50_000.0).prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn stages_always_ordered(
        d1 in raw_delay(),
        d2 in raw_delay(),
        d3 in raw_delay(),
        arrival_offset_min in proptest::option::of(-600i64..600),
        duration in proptest::option::of(-100.0f64..1_000.0),
    ) {
        let config = EscalationConfigDraft {
            stage1: stage(d1),
            stage2: stage(d2),
            stage3: stage(d3),
        }
        .normalize()
        .expect("no channel given, cannot fail");

        let delays: Vec<u32> = config.stages().iter().map(|s| s.delay_minutes).collect();
        prop_assert!(delays[0] <= delays[1] && delays[1] <= delays[2]);

        let arrival = arrival_offset_min.map(|m| t0() + TimeDelta::minutes(m));
        let s = compute_schedule(&config, t0(), arrival, duration);

        prop_assert!(s.base >= s.now);
        prop_assert!(s.stages[0].at <= s.stages[1].at);
        prop_assert!(s.stages[1].at <= s.stages[2].at);
        for st in &s.stages {
            prop_assert!(st.at >= s.base);
            prop_assert!(st.delay_secs >= MIN_TIMER_DELAY_SECS);
        }
    }

    #[test]
    fn past_arrival_always_anchors_at_now(minutes_ago in 1i64..100_000) {
        let config = EscalationConfigDraft::default().normalize().expect("defaults");
        let s = compute_schedule(&config, t0(), Some(t0() - TimeDelta::minutes(minutes_ago)), None);
        prop_assert_eq!(s.base, t0());
        prop_assert!(s.clamped);
    }
}
