// src/scheduler.rs
//! Fixed daily schedule, evaluated in the channel timezone. A background
//! task sleeps until the next slot and fires the matching pipeline variant.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline::{channel_tz, run_variant, Services, Variant};

/// (hour, minute, variant) in channel-local time.
pub const SCHEDULE: &[(u32, u32, Variant)] = &[
    (9, 16, Variant::News),
    (11, 42, Variant::Rubric),
    (13, 24, Variant::News),
    (16, 5, Variant::Rubric),
    (18, 47, Variant::News),
    (20, 30, Variant::Rubric),
];

/// Next firing at or after `now`: today's remaining slots, else the first
/// slot tomorrow.
pub fn next_fire(now: DateTime<FixedOffset>) -> (DateTime<FixedOffset>, Variant) {
    let today = now.date_naive();
    for &(h, m, variant) in SCHEDULE {
        let t = NaiveTime::from_hms_opt(h, m, 0).expect("valid schedule time");
        let candidate = today
            .and_time(t)
            .and_local_timezone(now.timezone())
            .single()
            .expect("fixed offset is unambiguous");
        if candidate > now {
            return (candidate, variant);
        }
    }
    let (h, m, variant) = SCHEDULE[0];
    let t = NaiveTime::from_hms_opt(h, m, 0).expect("valid schedule time");
    let tomorrow = (today + ChronoDuration::days(1))
        .and_time(t)
        .and_local_timezone(now.timezone())
        .single()
        .expect("fixed offset is unambiguous");
    (tomorrow, variant)
}

/// Spawn the scheduler loop. Runs until the process exits.
pub fn spawn_schedule(services: Arc<Services>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&channel_tz());
            let (at, variant) = next_fire(now);
            let wait = (at - now).to_std().unwrap_or_default();
            info!(variant = ?variant, at = %at, "next scheduled post");
            tokio::time::sleep(wait).await;

            match run_variant(&services, variant).await {
                Ok(outcome) => info!(variant = ?variant, outcome = ?outcome, "scheduled cycle done"),
                Err(e) => warn!(variant = ?variant, error = ?e, "scheduled cycle failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        channel_tz().with_ymd_and_hms(2026, 8, 26, h, m, 0).unwrap()
    }

    #[test]
    fn picks_next_slot_today() {
        let (fire, variant) = next_fire(at(10, 0));
        assert_eq!(variant, Variant::Rubric);
        assert_eq!((fire.hour(), fire.minute()), (11, 42));
    }

    #[test]
    fn wraps_to_tomorrow_after_last_slot() {
        let (fire, variant) = next_fire(at(21, 0));
        assert_eq!(variant, Variant::News);
        assert_eq!((fire.hour(), fire.minute()), (9, 16));
        assert_eq!(fire.date_naive().to_string(), "2026-08-27");
    }

    #[test]
    fn exact_slot_time_moves_to_following_slot() {
        let (fire, _) = next_fire(at(11, 42));
        assert_eq!((fire.hour(), fire.minute()), (13, 24));
    }
}
