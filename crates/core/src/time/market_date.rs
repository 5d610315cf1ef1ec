use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use std::collections::HashSet;

// Euronext Amsterdam quotes the equity ETF. The offset is fixed at UTC+1 and ignores summer
// time, so the cutoff is always 17:00 UTC: 18:00 local in winter, 19:00 local under CEST.
const CET_OFFSET_SECS: i32 = 3600;

// Cash session closes 17:30 CET; settle on the next hour.
const CLOSE_CUTOFF_HOUR_CET: u32 = 18;
const CLOSE_CUTOFF_MINUTE_CET: u32 = 0;

/// Market date a snapshot is labelled with: the explicit `YYYY-MM-DD` argument, or the latest
/// completed session relative to `now_utc`.
pub fn resolve_as_of_date(
    as_of_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = as_of_date_arg {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid as-of date {s:?} (expected YYYY-MM-DD)"));
    }

    let cet = chrono::FixedOffset::east_opt(CET_OFFSET_SECS).context("invalid CET offset")?;
    let now_cet = now_utc.with_timezone(&cet);

    let cutoff_reached =
        (now_cet.hour(), now_cet.minute()) >= (CLOSE_CUTOFF_HOUR_CET, CLOSE_CUTOFF_MINUTE_CET);
    let mut date = now_cet.date_naive();
    if !cutoff_reached {
        date = date - Duration::days(1);
    }

    let holidays = configured_holidays();
    while is_weekend(date) || holidays.contains(&date) {
        date = date - Duration::days(1);
    }

    Ok(date)
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

fn configured_holidays() -> HashSet<NaiveDate> {
    // Fixed-date Euronext closures only; Easter-linked days go in MARKET_HOLIDAYS.
    let mut out = HashSet::new();
    for y in 2024..=2030 {
        for (m, d) in [(1, 1), (5, 1), (12, 25), (12, 26)] {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                out.insert(date);
            }
        }
    }

    if let Ok(s) = std::env::var("MARKET_HOLIDAYS") {
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Ok(d) = NaiveDate::parse_from_str(part, "%Y-%m-%d") {
                out.insert(d);
            }
        }
    }

    out
}
