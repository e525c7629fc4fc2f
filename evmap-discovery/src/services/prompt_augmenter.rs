//! Chat prompt augmentation with discovered events

use crate::models::Event;
use chrono::FixedOffset;

/// Events included in an augmented prompt
pub const CONTEXT_EVENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct PromptAugmenter {
    offset: FixedOffset,
}

impl PromptAugmenter {
    /// Dates are rendered in `offset`
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Readable context block for the first [`CONTEXT_EVENT_LIMIT`] events
    pub fn format_events_for_context(&self, events: &[Event]) -> String {
        if events.is_empty() {
            return "No events found matching your criteria.".to_string();
        }

        let mut parts = vec![format!("Found {} relevant events:", events.len())];

        for (i, event) in events.iter().take(CONTEXT_EVENT_LIMIT).enumerate() {
            let mut info = vec![
                format!("**{}**", event.title),
                format!(
                    "  - Date: {}",
                    event.start.with_timezone(&self.offset).format("%Y-%m-%d %H:%M")
                ),
                format!(
                    "  - Location: {}",
                    if event.is_online { "Online/Remote" } else { "In person" }
                ),
                format!(
                    "  - Fee: {}",
                    match event.is_free {
                        Some(true) => "Free",
                        Some(false) => "Paid",
                        None => "Unknown",
                    }
                ),
            ];
            if !event.url.is_empty() {
                info.push(format!("  - URL: {}", event.url));
            }
            info.push(format!("  - Source: {}", event.source));

            parts.push(format!("\n{}. {}", i + 1, info.join("\n")));
        }

        parts.join("\n")
    }

    /// Append an event context block (or a note that none were found)
    pub fn augment(&self, prompt: &str, events: &[Event], search_failed: bool) -> String {
        if search_failed {
            return format!("{}\n\n[Note: Event search is currently unavailable.]", prompt);
        }
        if events.is_empty() {
            return format!("{}\n\n[Note: No relevant events found.]", prompt);
        }

        format!(
            "{}\n\n=== Relevant Events ===\n{}\n\nPlease provide recommendations based on the above events.",
            prompt,
            self.format_events_for_context(events)
        )
    }
}
