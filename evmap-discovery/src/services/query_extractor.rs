//! Free text → [`EventQuery`]
//!
//! Deterministic pattern matching only. Extraction is total: every stage
//! either yields a validated value or leaves its field unspecified.
//!
//! **Stages** (independent of each other's success):
//! 1. Normalize (lowercase, collapse whitespace)
//! 2. Time: ordered rules, first match wins
//! 3. Location: near-me, then remote-only, then `in|at <place>`
//! 4. Topics: every vocabulary match
//! 5. Modifiers: remote / free indicators

use crate::models::{EventQuery, LocationHint, PlaceName, TimeWindow};
use crate::services::topic_vocabulary::{
    contains_any, is_topic_phrase, match_topics, tokenize, FREE_PHRASES, REMOTE_PHRASES,
};
use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use evmap_common::config::DiscoveryConfig;
use evmap_common::Clock;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure inside a single time resolver; the rule then counts as no match
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("window falls outside the supported calendar range")]
    OutOfRange,

    #[error("window would be empty")]
    EmptyWindow,
}

type Resolver = fn(&Captures<'_>, DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError>;

/// One time pattern and the function computing its window
pub struct TimeRule {
    pub name: &'static str,
    pattern: Regex,
    resolve: Resolver,
}

impl TimeRule {
    fn new(name: &'static str, pattern: &str, resolve: Resolver) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("time rule pattern is valid"),
            resolve,
        }
    }

    /// `None` when the pattern does not match; `Some(Err)` when the resolver fails
    pub fn apply(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Option<Result<TimeWindow, ResolveError>> {
        self.pattern.captures(text).map(|caps| (self.resolve)(&caps, now))
    }
}

/// Priority-ordered time rules
pub static TIME_RULES: Lazy<Vec<TimeRule>> = Lazy::new(|| {
    vec![
        TimeRule::new("today", r"\b(?:today|tonight)\b", resolve_today),
        TimeRule::new("tomorrow", r"\btomorrow\b", resolve_tomorrow),
        TimeRule::new("next weekend", r"\bnext weekend\b", resolve_next_weekend),
        TimeRule::new("this weekend", r"\b(?:this )?weekend\b", resolve_this_weekend),
        TimeRule::new("this week", r"\bthis week\b", resolve_this_week),
        TimeRule::new("next week", r"\bnext week\b", resolve_next_week),
        TimeRule::new("in n hours", r"\bin (\d+) (?:hours?|hrs?)\b", resolve_in_hours),
        TimeRule::new("in n days", r"\bin (\d+) days?\b", resolve_in_days),
    ]
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static NEAR_ME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:near me|nearby|around me|in my area|close to me)\b")
        .expect("near-me pattern is valid")
});

static REMOTE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:remote|online|virtual)[ -]only|only (?:remote|online|virtual))\b")
        .expect("remote-only pattern is valid")
});

static PLACE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:in|at) ").expect("place marker pattern is valid"));

/// Words that end a place capture
const PLACE_STOP_WORDS: &[&str] = &[
    "today", "tonight", "tomorrow", "this", "next", "weekend", "week", "on", "at", "in", "for",
    "from", "with", "about", "during", "around", "near", "and", "or", "that", "which", "where",
    "when", "starting", "between", "before", "after", "events", "event", "meetups", "meetup",
    "please", "only", "free",
];

/// Captures that look like places but are not
const NOT_PLACES: &[&str] = &[
    "the morning", "the afternoon", "the evening", "the moment", "home", "person", "remote",
    "online", "virtual", "a", "an", "the", "my", "our", "all",
];

pub struct QueryExtractor {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    default_max_results: NonZeroU32,
}

impl QueryExtractor {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset, default_max_results: NonZeroU32) -> Self {
        Self {
            clock,
            offset,
            default_max_results,
        }
    }

    /// Offset falls back to UTC when out of range
    pub fn from_config(config: &DiscoveryConfig, clock: Arc<dyn Clock>) -> Self {
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(
                    utc_offset_minutes = config.utc_offset_minutes,
                    "UTC offset out of range, using UTC"
                );
                Utc.fix()
            });
        let default_max_results =
            NonZeroU32::new(config.default_max_results).unwrap_or(NonZeroU32::MIN);
        Self::new(clock, offset, default_max_results)
    }

    pub fn default_max_results(&self) -> NonZeroU32 {
        self.default_max_results
    }

    /// Offset relative dates are resolved in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Extract with the default result cap
    pub fn extract(&self, raw_text: &str) -> EventQuery {
        self.extract_with_limit(raw_text, None)
    }

    /// Extract, overriding the result cap; 0 is clamped to 1
    pub fn extract_with_limit(&self, raw_text: &str, max_results: Option<u32>) -> EventQuery {
        let text = normalize(raw_text);
        let tokens = tokenize(&text);
        let now = self.clock.now().with_timezone(&self.offset);

        let max_results = match max_results {
            Some(n) => NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN),
            None => self.default_max_results,
        };

        let query = EventQuery {
            time_window: extract_time_window(&text, now),
            location_hint: extract_location(&text),
            topics: match_topics(&tokens).into_iter().map(str::to_string).collect(),
            remote_allowed: contains_any(&tokens, REMOTE_PHRASES).then_some(true),
            free_only: contains_any(&tokens, FREE_PHRASES).then_some(true),
            max_results,
        };

        debug!(
            time_window = ?query.time_window,
            location = ?query.location_hint,
            topics = ?query.topics,
            remote_allowed = ?query.remote_allowed,
            free_only = ?query.free_only,
            max_results = query.max_results.get(),
            "Extracted event query"
        );

        query
    }
}

/// Lowercase and collapse whitespace
pub fn normalize(raw_text: &str) -> String {
    WHITESPACE
        .replace_all(raw_text.trim(), " ")
        .to_lowercase()
}

/// First matching time rule wins; a failing resolver is skipped
pub fn extract_time_window(text: &str, now: DateTime<FixedOffset>) -> Option<TimeWindow> {
    for rule in TIME_RULES.iter() {
        match rule.apply(text, now) {
            None => continue,
            Some(Ok(window)) => {
                debug!(rule = rule.name, "Time rule matched");
                return Some(window);
            }
            Some(Err(e)) => {
                warn!(rule = rule.name, error = %e, "Time resolver failed, trying next rule");
            }
        }
    }
    None
}

/// Near-me, then remote-only, then the first usable `in|at <place>`
pub fn extract_location(text: &str) -> LocationHint {
    if NEAR_ME.is_match(text) {
        return LocationHint::NearMe;
    }
    if REMOTE_ONLY.is_match(text) {
        return LocationHint::RemoteOnly;
    }

    PLACE_MARKER
        .find_iter(text)
        .filter_map(|marker| trim_place(&text[marker.end()..]))
        .find(|candidate| !NOT_PLACES.contains(&candidate.as_str()) && !is_topic_phrase(candidate))
        .and_then(|candidate| PlaceName::new(&candidate))
        .map(LocationHint::NamedPlace)
        .unwrap_or(LocationHint::Unconstrained)
}

/// Text following an `in`/`at` marker, cut at the first character that
/// cannot be part of a place name or at the first stop word
///
/// The place must start with a letter, which rules out `in 3 days`.
fn trim_place(rest: &str) -> Option<String> {
    if !rest.starts_with(char::is_alphabetic) {
        return None;
    }
    let cut = rest
        .find(|c: char| !(c.is_alphabetic() || matches!(c, ' ' | ',' | '\'' | '-')))
        .unwrap_or(rest.len());

    let words: Vec<&str> = rest[..cut]
        .split(' ')
        .filter(|w| !w.is_empty())
        .take_while(|w| !PLACE_STOP_WORDS.contains(&w.trim_matches(|c: char| c == ',' || c == '\'')))
        .collect();

    let place = words.join(" ");
    let place = place.trim_matches(|c: char| c == ',' || c == '-' || c == '\'' || c.is_whitespace());
    (!place.is_empty()).then(|| place.to_string())
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>, ResolveError> {
    let naive = date.and_hms_opt(0, 0, 0).ok_or(ResolveError::OutOfRange)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(ResolveError::OutOfRange)
}

/// Window of whole local days `[today + from, today + to)`
fn day_span(now: DateTime<FixedOffset>, from: u64, to: u64) -> Result<TimeWindow, ResolveError> {
    let today = now.date_naive();
    let start = today.checked_add_days(Days::new(from)).ok_or(ResolveError::OutOfRange)?;
    let end = today.checked_add_days(Days::new(to)).ok_or(ResolveError::OutOfRange)?;
    TimeWindow::new(local_midnight(start, *now.offset())?, local_midnight(end, *now.offset())?)
        .ok_or(ResolveError::EmptyWindow)
}

/// Window of local days relative to this week's Monday
fn week_span(now: DateTime<FixedOffset>, from: u64, to: u64) -> Result<TimeWindow, ResolveError> {
    let today = now.date_naive();
    let monday = today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        .ok_or(ResolveError::OutOfRange)?;
    let start = monday.checked_add_days(Days::new(from)).ok_or(ResolveError::OutOfRange)?;
    let end = monday.checked_add_days(Days::new(to)).ok_or(ResolveError::OutOfRange)?;
    TimeWindow::new(local_midnight(start, *now.offset())?, local_midnight(end, *now.offset())?)
        .ok_or(ResolveError::EmptyWindow)
}

fn resolve_today(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    day_span(now, 0, 1)
}

fn resolve_tomorrow(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    day_span(now, 1, 2)
}

fn resolve_this_weekend(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    week_span(now, 5, 7)
}

fn resolve_next_weekend(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    week_span(now, 12, 14)
}

fn resolve_this_week(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    week_span(now, 0, 7)
}

fn resolve_next_week(_: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    week_span(now, 7, 14)
}

fn captured_count(caps: &Captures<'_>) -> Result<i64, ResolveError> {
    let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    raw.parse::<i64>()
        .map_err(|_| ResolveError::InvalidNumber(raw.to_string()))
}

fn from_now(now: DateTime<FixedOffset>, span: Option<Duration>) -> Result<TimeWindow, ResolveError> {
    let start = now.with_timezone(&Utc);
    let end = span
        .and_then(|span| start.checked_add_signed(span))
        .ok_or(ResolveError::OutOfRange)?;
    TimeWindow::new(start, end).ok_or(ResolveError::EmptyWindow)
}

fn resolve_in_hours(caps: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    from_now(now, Duration::try_hours(captured_count(caps)?))
}

fn resolve_in_days(caps: &Captures<'_>, now: DateTime<FixedOffset>) -> Result<TimeWindow, ResolveError> {
    from_now(now, Duration::try_days(captured_count(caps)?))
}
