use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Months, Utc};
use tokio::task::spawn_blocking;
use tracing::warn;

use keepsake_types::api::TimerResponse;

use crate::AppState;

/// Used when no start date has been configured yet.
pub const DEFAULT_START: &str = "2023-10-14T00:00:00Z";
pub const START_CONTENT_KEY: &str = "relationship_start";

#[derive(Debug, PartialEq, Eq)]
pub struct Elapsed {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
}

/// Calendar-aware breakdown of the time between `start` and `now`. Whole
/// months are counted on the calendar, the remainder in fixed units, so
/// "1 month" spans 28 to 31 days depending on where it falls.
pub fn breakdown(start: DateTime<Utc>, now: DateTime<Utc>) -> Elapsed {
    if now <= start {
        return Elapsed {
            years: 0,
            months: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            milliseconds: 0,
        };
    }

    let approx = (now.years_since(start).unwrap_or(0) as i64) * 12;
    let mut total_months = approx + 12;
    let mut anchor = start;
    while total_months > 0 {
        match start.checked_add_months(Months::new(total_months as u32)) {
            Some(candidate) if candidate <= now => {
                anchor = candidate;
                break;
            }
            _ => total_months -= 1,
        }
    }

    let rest = now - anchor;
    Elapsed {
        years: total_months / 12,
        months: total_months % 12,
        days: rest.num_days(),
        hours: rest.num_hours() % 24,
        minutes: rest.num_minutes() % 60,
        seconds: rest.num_seconds() % 60,
        milliseconds: rest.num_milliseconds() % 1000,
    }
}

/// Elapsed time since the configured relationship start. The start date is
/// read from site content and falls back to the built-in default when unset
/// or unparseable.
pub async fn timer(State(state): State<AppState>) -> Json<TimerResponse> {
    let db_state = state.clone();
    let configured = match spawn_blocking(move || db_state.db.get_content(START_CONTENT_KEY)).await
    {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!("Could not read start date: {}", e);
            None
        }
        Err(e) => {
            warn!("Could not read start date: {}", e);
            None
        }
    };

    let raw = configured.unwrap_or_else(|| DEFAULT_START.to_string());
    let start = parse_start(&raw).unwrap_or_else(|| {
        warn!("Unparseable start date {:?}, using default", raw);
        DateTime::parse_from_rfc3339(DEFAULT_START)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    });

    let elapsed = breakdown(start, Utc::now());
    Json(TimerResponse {
        start: start.to_rfc3339(),
        years: elapsed.years,
        months: elapsed.months,
        days: elapsed.days,
        hours: elapsed.hours,
        minutes: elapsed.minutes,
        seconds: elapsed.seconds,
        milliseconds: elapsed.milliseconds,
    })
}

/// Accepts a full RFC 3339 stamp or a bare `YYYY-MM-DD` date.
fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
