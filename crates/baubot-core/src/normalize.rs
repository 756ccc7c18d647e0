//! Date and duration normalization.
//!
//! The classifier extracts dates and durations as loosely-formatted
//! strings. This module turns them into canonical values with hard
//! validation bounds. The date vocabulary is deliberately closed:
//! strict `YYYY-MM-DD` plus a handful of relative keywords. Anything
//! else falls back to the reference date — general natural-language
//! date parsing is out of scope.

use chrono::{Duration, NaiveDate};

use crate::error::{CoreError, CoreResult};

/// Validate a duration in hours, accepting values in `(0, 24]`.
pub fn normalize_duration(hours: f64) -> CoreResult<f64> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Ungültige Dauer: {hours} Stunden. Bitte gib eine Dauer größer 0 an."
        )));
    }
    if hours > 24.0 {
        return Err(CoreError::Validation(format!(
            "Ungültige Dauer: {hours} Stunden. Mehr als 24 Stunden pro Eintrag sind nicht möglich."
        )));
    }
    Ok(hours)
}

/// Resolve a date token against a reference date.
///
/// Strict `YYYY-MM-DD` is taken as-is. The relative vocabulary covers
/// German and English forms of today / yesterday / the day before.
/// Empty or unrecognized input resolves to the reference date.
pub fn normalize_date(raw: &str, reference: NaiveDate) -> NaiveDate {
    let token = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return date;
    }

    match token.to_lowercase().as_str() {
        "gestern" | "yesterday" => reference - Duration::days(1),
        "vorgestern" | "day before yesterday" => reference - Duration::days(2),
        _ => reference,
    }
}
