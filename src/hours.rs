//! Opening-hours parsing and compaction.

use serde::Serialize;

/// A day-range label plus the hours text shared by those days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayHours {
    pub days: String,
    pub hours: String,
}

/// Parse the directory's per-weekday text (`"Monday: 9:00 AM – 5:00 PM"`)
/// into day/hours pairs with 3-letter day labels. Entries that do not split
/// into a day and an hours part are skipped.
pub fn parse_weekday_text(weekday_text: &[String]) -> Vec<DayHours> {
    weekday_text
        .iter()
        .filter_map(|entry| {
            let (day, hours) = entry.split_once(": ")?;
            Some(DayHours {
                days: day.chars().take(3).collect(),
                hours: hours.to_string(),
            })
        })
        .collect()
}

/// Merge consecutive days sharing identical hours text into a single entry
/// with a combined day-range label (`"Mon - Fri"`). Single left-to-right
/// scan; stable and deterministic.
pub fn compact(days_hours: Vec<DayHours>) -> Vec<DayHours> {
    let mut out: Vec<DayHours> = Vec::with_capacity(days_hours.len());
    let mut run_start = String::new();
    for entry in days_hours {
        match out.last_mut() {
            Some(prev) if prev.hours == entry.hours => {
                prev.days = format!("{} - {}", run_start, entry.days);
            }
            _ => {
                run_start = entry.days.clone();
                out.push(entry);
            }
        }
    }
    out
}

/// Parse and compact in one step.
pub fn compact_weekday_text(weekday_text: &[String]) -> Vec<DayHours> {
    compact(parse_weekday_text(weekday_text))
}
