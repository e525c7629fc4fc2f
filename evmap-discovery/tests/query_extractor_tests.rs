//! Query extraction integration tests
//!
//! The clock is fixed at Wednesday 2026-04-15 12:00 UTC.

mod helpers;

use chrono::{FixedOffset, TimeZone, Utc};
use evmap_common::events::SourceKind;
use evmap_common::ManualClock;
use evmap_discovery::models::LocationHint;
use evmap_discovery::services::QueryExtractor;
use helpers::*;
use std::num::NonZeroU32;
use std::sync::Arc;

fn harness() -> Harness {
    Harness::new(
        ScriptedSource::new(SourceKind::Meetup, vec![Reply::empty()]),
        ScriptedSource::new(SourceKind::Eventbrite, vec![Reply::empty()]),
    )
}

#[test]
fn test_extract_is_total() {
    let extractor = harness().extractor();

    for raw in ["", "   ", "\n\t", "?!?", "in", "at at at", "in 99999999999999999999 days", "🦀🦀"] {
        let query = extractor.extract(raw);
        assert_eq!(query.max_results.get(), 20, "input {:?}", raw);
        assert!(query.topics.is_empty(), "input {:?}", raw);
    }

    let query = extractor.extract("");
    assert_eq!(query.time_window, None);
    assert_eq!(query.location_hint, LocationHint::Unconstrained);
    assert_eq!(query.remote_allowed, None);
    assert_eq!(query.free_only, None);
}

#[test]
fn test_python_events_near_me_today() {
    let query = harness().extractor().extract("Python events near me today");

    assert!(query.topics.contains("python"));
    assert_eq!(query.location_hint, LocationHint::NearMe);

    let window = query.time_window.expect("today resolves to a window");
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 15, 0, 0, 0).unwrap());
    assert_eq!(window.end(), Utc.with_ymd_and_hms(2026, 4, 16, 0, 0, 0).unwrap());
}

#[test]
fn test_remote_data_science_this_week() {
    let query = harness()
        .extractor()
        .extract("remote data science meetups this week");

    assert_eq!(query.remote_allowed, Some(true));
    assert!(query.topics.contains("data science"));
    assert_eq!(query.free_only, None);

    // Monday to Monday around Wednesday the 15th
    let window = query.time_window.expect("this week resolves to a window");
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 13, 0, 0, 0).unwrap());
    assert_eq!(window.end(), Utc.with_ymd_and_hms(2026, 4, 20, 0, 0, 0).unwrap());
}

#[test]
fn test_free_rust_meetups_in_berlin_tomorrow() {
    let query = harness()
        .extractor()
        .extract("Free Rust meetups in Berlin tomorrow");

    assert_eq!(query.free_only, Some(true));
    assert!(query.topics.contains("rust"));
    assert_eq!(query.place(), Some("berlin"));

    let window = query.time_window.unwrap();
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 16, 0, 0, 0).unwrap());
}

#[test]
fn test_topic_is_not_mistaken_for_place() {
    let query = harness().extractor().extract("talks in machine learning");

    assert!(query.topics.contains("machine learning"));
    assert_eq!(query.location_hint, LocationHint::Unconstrained);
}

#[test]
fn test_online_only_is_remote_only() {
    let query = harness().extractor().extract("online only javascript workshops");

    assert_eq!(query.location_hint, LocationHint::RemoteOnly);
    assert_eq!(query.remote_allowed, Some(true));
    assert!(query.topics.contains("javascript"));
}

#[test]
fn test_local_offset_moves_day_boundaries() {
    // 12:00 UTC is 21:00 in UTC+9, still the 15th locally
    let clock = ManualClock::new(test_now());
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    let extractor = QueryExtractor::new(Arc::new(clock.clone()), offset, NonZeroU32::new(5).unwrap());

    let window = extractor.extract("tonight").time_window.unwrap();
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 14, 15, 0, 0).unwrap());
    assert_eq!(window.end(), Utc.with_ymd_and_hms(2026, 4, 15, 15, 0, 0).unwrap());

    // 16:00 UTC is already the 16th in UTC+9
    clock.advance(std::time::Duration::from_secs(4 * 3600));
    let window = extractor.extract("today").time_window.unwrap();
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 15, 15, 0, 0).unwrap());
}

#[test]
fn test_max_results_override() {
    let extractor = harness().extractor();

    assert_eq!(extractor.extract_with_limit("rust", Some(3)).max_results.get(), 3);
    assert_eq!(extractor.extract_with_limit("rust", Some(0)).max_results.get(), 1);
    assert_eq!(extractor.extract_with_limit("rust", None).max_results.get(), 20);
}

#[test]
fn test_extraction_is_deterministic() {
    let extractor = harness().extractor();
    let raw = "hiking and photography this weekend at Lake Tahoe";

    let first = extractor.extract(raw);
    let second = extractor.extract(raw);

    assert_eq!(first, second);
    assert_eq!(first.place(), Some("lake tahoe"));
    assert!(first.topics.contains("hiking"));
    assert!(first.topics.contains("photography"));
}

#[test]
fn test_next_weekend_is_not_this_weekend() {
    let query = harness().extractor().extract("board game nights next weekend");

    // Saturday the 25th to Monday the 27th, not the coming Saturday the 18th
    let window = query.time_window.expect("next weekend resolves to a window");
    assert_eq!(window.start(), Utc.with_ymd_and_hms(2026, 4, 25, 0, 0, 0).unwrap());
    assert_eq!(window.end(), Utc.with_ymd_and_hms(2026, 4, 27, 0, 0, 0).unwrap());
}
