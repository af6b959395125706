use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};
use crate::models::{EventDraft, EventInput};

pub const PROFILE_NAME_MAX: usize = 32;
pub const EVENT_NAME_MAX: usize = 100;
pub const EVENT_NOTES_MAX: usize = 500;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// Rejects null bytes and control characters; newlines and tabs only where multiline text is allowed.
pub fn validate_input_string(
    input: &str,
    max_chars: Option<usize>,
    multiline: bool,
) -> Result<(), String> {
    if input.contains('\0') {
        return Err("contains null bytes".to_string());
    }

    for ch in input.chars() {
        let allowed = multiline && matches!(ch, '\n' | '\r' | '\t');
        if ch.is_control() && !allowed {
            return Err("contains invalid control characters".to_string());
        }
    }

    if let Some(max_len) = max_chars {
        if input.chars().count() > max_len {
            return Err(format!("exceeds maximum length of {max_len} characters"));
        }
    }

    Ok(())
}

/// Trims a display name and checks it is non-empty, within `max_chars`, and
/// free of control characters.
pub fn clean_name(field: &str, raw: Option<&str>, max_chars: usize) -> Result<String> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::validation(format!("{field} required")));
    }
    validate_input_string(name, Some(max_chars), false)
        .map_err(|msg| AppError::validation(format!("{field} {msg}")))?;
    Ok(name.to_string())
}

pub fn profile_name(raw: Option<&str>) -> Result<String> {
    clean_name("Profile name", raw, PROFILE_NAME_MAX)
}

/// Parses an ISO-8601 timestamp and renders it as UTC with millisecond
/// precision. Inputs without an offset are taken as UTC; inputs finer than a
/// millisecond are rejected rather than truncated.
pub fn normalize_timestamp(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| format!("'{raw}' is not an ISO-8601 timestamp"))?,
    };

    // Four-digit years keep the text form ordered chronologically.
    if !(0..=9999).contains(&parsed.year()) {
        return Err(format!("'{raw}' is out of the supported year range"));
    }
    if parsed.timestamp_subsec_nanos() % 1_000_000 != 0 {
        return Err(format!("'{raw}' is more precise than milliseconds"));
    }

    Ok(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn required_timestamp(field: &str, raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => normalize_timestamp(value)
            .map_err(|msg| AppError::validation(format!("Invalid {field}: {msg}"))),
        _ => Err(AppError::validation(format!("{field} required"))),
    }
}

/// Validates a full set of event fields. Used for both create and update,
/// since updates replace every field.
pub fn event_draft(input: &EventInput) -> Result<EventDraft> {
    let name = clean_name("Event name", input.name.as_deref(), EVENT_NAME_MAX)?;
    let start_time = required_timestamp("start time", input.start_time.as_deref())?;
    let end_time = required_timestamp("end time", input.end_time.as_deref())?;

    if start_time >= end_time {
        return Err(AppError::validation(
            "Start time should be before end time",
        ));
    }

    let notes = input.notes.clone().unwrap_or_default();
    validate_input_string(&notes, Some(EVENT_NOTES_MAX), true)
        .map_err(|msg| AppError::validation(format!("Notes {msg}")))?;

    Ok(EventDraft {
        name,
        start_time,
        end_time,
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, start: &str, end: &str) -> EventInput {
        EventInput {
            name: Some(name.to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            notes: None,
        }
    }

    #[test]
    fn profile_names_are_trimmed() {
        assert_eq!(profile_name(Some(" Work ")).unwrap(), "Work");
    }

    #[test]
    fn profile_name_limits() {
        assert!(profile_name(None).is_err());
        assert!(profile_name(Some("   ")).is_err());
        assert!(profile_name(Some(&"a".repeat(32))).is_ok());
        assert!(profile_name(Some(&"a".repeat(33))).is_err());
        // Counted in characters, not bytes.
        assert!(profile_name(Some(&"é".repeat(32))).is_ok());
        assert!(profile_name(Some("bad\0name")).is_err());
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        assert_eq!(
            normalize_timestamp("2024-01-02T09:00").unwrap(),
            "2024-01-02T09:00:00.000Z"
        );
        assert_eq!(
            normalize_timestamp("2024-01-02T11:30:00+02:00").unwrap(),
            "2024-01-02T09:30:00.000Z"
        );
        assert_eq!(
            normalize_timestamp("2024-01-02T09:00:00.25Z").unwrap(),
            "2024-01-02T09:00:00.250Z"
        );
        assert!(normalize_timestamp("tomorrow").is_err());
        assert!(normalize_timestamp("2024-13-01T00:00").is_err());
    }

    #[test]
    fn sub_millisecond_timestamps_are_rejected() {
        assert!(normalize_timestamp("2024-01-02T09:00:00.9999Z").is_err());
        assert_eq!(
            normalize_timestamp("2024-01-02T09:00:00.123000Z").unwrap(),
            "2024-01-02T09:00:00.123Z"
        );

        // Truncating both ends would make them equal.
        let err = event_draft(&input(
            "Blink",
            "2024-01-02T09:00:00.0001Z",
            "2024-01-02T09:00:00.0009Z",
        ))
        .unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("more precise than milliseconds"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn offsets_compare_chronologically() {
        // 10:00+02:00 is 08:00Z, which precedes 09:00Z.
        let draft = event_draft(&input(
            "Sync",
            "2024-01-02T10:00:00+02:00",
            "2024-01-02T09:00:00Z",
        ))
        .unwrap();
        assert_eq!(draft.start_time, "2024-01-02T08:00:00.000Z");
    }

    #[test]
    fn event_requires_start_before_end() {
        let same = input("Standup", "2024-01-02T09:00", "2024-01-02T09:00");
        assert!(matches!(event_draft(&same), Err(AppError::Validation(_))));

        let reversed = input("Standup", "2024-01-02T10:00", "2024-01-02T09:00");
        assert!(matches!(event_draft(&reversed), Err(AppError::Validation(_))));
    }

    #[test]
    fn event_required_fields() {
        let mut missing_end = input("Standup", "2024-01-02T09:00", "");
        missing_end.end_time = None;
        assert!(event_draft(&missing_end).is_err());
        assert!(event_draft(&input("  ", "2024-01-02T09:00", "2024-01-02T09:15")).is_err());
        assert!(event_draft(&input(&"x".repeat(101), "2024-01-02T09:00", "2024-01-02T09:15")).is_err());
    }

    #[test]
    fn notes_default_and_limits() {
        let mut ok = input(" Standup ", "2024-01-02T09:00", "2024-01-02T09:15");
        let draft = event_draft(&ok).unwrap();
        assert_eq!(draft.name, "Standup");
        assert_eq!(draft.notes, "");

        ok.notes = Some("line one\nline two".to_string());
        assert!(event_draft(&ok).is_ok());

        ok.notes = Some("n".repeat(501));
        assert!(event_draft(&ok).is_err());
    }
}
