use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use miqat::prelude::*;
use miqat::services::FixedTimetable;
use std::sync::{Arc, Mutex};

fn engine_fixture() -> (MiqatEngine, Arc<MemoryStore>, Arc<TokioScheduler>) {
    let config = MiqatConfig::default();
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(TokioScheduler::new());
    let calculator = Arc::new(FixedTimetable::standard(Tz::UTC));
    let engine = MiqatEngine::new(config, store.clone(), scheduler.clone(), calculator);
    (engine, store, scheduler)
}

#[tokio::test]
async fn refresh_persists_and_publishes_a_countdown() {
    let (engine, store, _scheduler) = engine_fixture();
    let mut badges = engine.subscribe_badge_events();

    // 13:00, between Dhuhr (12:30) and Asr (15:45).
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(now).await.unwrap();

    assert!(store.get("prayer-schedule").is_some());

    let event = badges.recv().await.unwrap();
    let badge = event.badge.expect("badge should be set");
    assert_eq!(badge.label, "2:45");
    assert!(!badge.urgent);
    assert_eq!(event.next, Some(PrayerName::Asr));

    match engine.resolved_state(now) {
        ResolvedState::Resolved(resolution) => {
            assert_eq!(resolution.current, Some(PrayerName::Dhuhr));
            assert_eq!(resolution.next, PrayerName::Asr);
        }
        ResolvedState::Unresolved => panic!("state should resolve"),
    }
}

#[tokio::test]
async fn countdown_turns_urgent_near_the_next_event() {
    let (engine, _store, _scheduler) = engine_fixture();

    let noonish = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(noonish).await.unwrap();

    // Five minutes before Asr the terse label drops to bare minutes.
    let near = Utc.with_ymd_and_hms(2026, 3, 10, 15, 40, 0).unwrap();
    let event = engine.publish_badge(near).await;
    let badge = event.badge.expect("badge should be set");
    assert_eq!(badge.label, "5");
    assert!(badge.urgent);
}

#[tokio::test]
async fn evening_rolls_over_to_tomorrows_fajr() {
    let (engine, _store, _scheduler) = engine_fixture();

    let now = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(now).await.unwrap();

    // After Isha (20:00) the countdown targets tomorrow's Fajr (05:00).
    let evening = Utc.with_ymd_and_hms(2026, 3, 10, 21, 0, 0).unwrap();
    let event = engine.publish_badge(evening).await;
    assert_eq!(event.next, Some(PrayerName::Fajr));
    assert_eq!(event.badge.expect("badge should be set").label, "8:00");
}

#[tokio::test]
async fn stale_record_clears_the_badge_until_refreshed() {
    let (engine, _store, _scheduler) = engine_fixture();

    let yesterday = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(yesterday).await.unwrap();

    // The next local day: the stored record no longer matches.
    let next_day = Utc.with_ymd_and_hms(2026, 3, 11, 9, 0, 0).unwrap();
    assert_eq!(engine.resolved_state(next_day), ResolvedState::Unresolved);
    let event = engine.publish_badge(next_day).await;
    assert!(event.badge.is_none());

    engine.refresh(next_day).await.unwrap();
    let event = engine.publish_badge(next_day).await;
    assert!(event.badge.is_some());
}

#[tokio::test]
async fn repeated_refreshes_keep_a_single_alarm() {
    let (engine, _store, scheduler) = engine_fixture();

    let now = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(now).await.unwrap();
    engine.refresh(now).await.unwrap();
    engine.realign(now);

    assert_eq!(scheduler.active_alarms(), 1);
}

#[tokio::test]
async fn badge_listeners_observe_every_publication() {
    let (engine, _store, _scheduler) = engine_fixture();

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = engine
        .on_badge(move |event| {
            if let Some(badge) = &event.badge {
                sink.lock().unwrap().push(badge.label.clone());
            }
        })
        .await;

    let now = Utc.with_ymd_and_hms(2026, 3, 10, 13, 0, 0).unwrap();
    engine.refresh(now).await.unwrap();
    engine.publish_badge(now).await;

    assert_eq!(seen.lock().unwrap().as_slice(), ["2:45", "2:45"]);

    assert!(engine.remove_badge_listener(id).await);
    assert!(!engine.remove_badge_listener(id).await);
}
