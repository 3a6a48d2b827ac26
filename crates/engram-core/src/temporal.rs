//! Temporal range extractor (C4).
//!
//! Natural-language query → `[from, to]` epoch-ms window, or `None`. Given
//! the same query and reference instant the output is byte-identical (spec
//! §4.2) — no wall-clock reads beyond the caller-supplied reference instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

fn start_of_day(d: DateTime<Utc>) -> DateTime<Utc> {
    d.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|n| n.and_local_timezone(Utc).single())
        .unwrap_or(d)
}

fn end_of_day(d: DateTime<Utc>) -> DateTime<Utc> {
    d.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|n| n.and_local_timezone(Utc).single())
        .unwrap_or(d)
}

fn window(from: DateTime<Utc>, to: DateTime<Utc>) -> TimeRange {
    TimeRange {
        from: start_of_day(from).timestamp_millis(),
        to: end_of_day(to).timestamp_millis(),
    }
}

const MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 1), ("jan", 1), ("enero", 1), ("janvier", 1), ("januar", 1), ("gennaio", 1),
    ("february", 2), ("feb", 2), ("febrero", 2), ("fevrier", 2), ("februar", 2), ("febbraio", 2),
    ("march", 3), ("mar", 3), ("marzo", 3), ("mars", 3), ("marz", 3),
    ("april", 4), ("apr", 4), ("abril", 4), ("avril", 4),
    ("may", 5), ("mayo", 5), ("mai", 5), ("maggio", 5),
    ("june", 6), ("jun", 6), ("junio", 6), ("juin", 6), ("juni", 6), ("giugno", 6),
    ("july", 7), ("jul", 7), ("julio", 7), ("juillet", 7), ("juli", 7), ("luglio", 7),
    ("august", 8), ("aug", 8), ("agosto", 8), ("aout", 8),
    ("september", 9), ("sep", 9), ("sept", 9), ("septiembre", 9), ("septembre", 9), ("settembre", 9),
    ("october", 10), ("oct", 10), ("octubre", 10), ("octobre", 10), ("ottobre", 10), ("oktober", 10),
    ("november", 11), ("nov", 11), ("noviembre", 11), ("novembre", 11),
    ("december", 12), ("dec", 12), ("diciembre", 12), ("decembre", 12), ("dezember", 12), ("dicembre", 12),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon), ("mon", Weekday::Mon),
    ("tuesday", Weekday::Tue), ("tue", Weekday::Tue),
    ("wednesday", Weekday::Wed), ("wed", Weekday::Wed),
    ("thursday", Weekday::Thu), ("thu", Weekday::Thu),
    ("friday", Weekday::Fri), ("fri", Weekday::Fri),
    ("saturday", Weekday::Sat), ("sat", Weekday::Sat),
    ("sunday", Weekday::Sun), ("sun", Weekday::Sun),
);

/// Common short tokens a naive date parser would otherwise mistake for a
/// weekday/month abbreviation (spec §4.2 step 2).
const FALSE_POSITIVES: &[&str] = &["do", "may", "will", "mon", "tue", "wed", "thu", "fri", "sat", "sun"];

fn days_back_to_weekday(now: DateTime<Utc>, target: Weekday) -> i64 {
    let mut delta = (now.weekday().num_days_from_monday() as i64)
        - (target.num_days_from_monday() as i64);
    if delta <= 0 {
        delta += 7;
    }
    delta
}

/// Step 1: deterministic phrase table. Returns `Some` on a match.
fn phrase_table(query: &str, now: DateTime<Utc>) -> Option<TimeRange> {
    let q = query.to_lowercase();

    if q.contains("yesterday") {
        let d = now - Duration::days(1);
        return Some(window(d, d));
    }
    if q.contains("today") {
        return Some(window(now, now));
    }
    if q.contains("tomorrow") {
        let d = now + Duration::days(1);
        return Some(window(d, d));
    }
    if q.contains("last night") {
        let d = now - Duration::days(1);
        return Some(window(d, d));
    }
    if q.contains("last weekend") {
        let days_to_sat = days_back_to_weekday(now, Weekday::Sat);
        let sat = now - Duration::days(days_to_sat);
        let sun = sat + Duration::days(1);
        return Some(window(sat, sun));
    }
    if q.contains("this week") {
        let days_to_mon = now.weekday().num_days_from_monday() as i64;
        let mon = now - Duration::days(days_to_mon);
        let sun = mon + Duration::days(6);
        return Some(window(mon, sun));
    }
    if q.contains("last week") {
        let days_to_mon = now.weekday().num_days_from_monday() as i64;
        let this_mon = now - Duration::days(days_to_mon);
        let last_mon = this_mon - Duration::days(7);
        let last_sun = last_mon + Duration::days(6);
        return Some(window(last_mon, last_sun));
    }
    if q.contains("next week") {
        let days_to_mon = now.weekday().num_days_from_monday() as i64;
        let this_mon = now - Duration::days(days_to_mon);
        let next_mon = this_mon + Duration::days(7);
        let next_sun = next_mon + Duration::days(6);
        return Some(window(next_mon, next_sun));
    }
    if q.contains("last month") {
        let first_this = now.with_day(1).unwrap_or(now);
        let last_month_end = first_this - Duration::days(1);
        let first_last = last_month_end.with_day(1).unwrap_or(last_month_end);
        return Some(window(first_last, last_month_end));
    }
    if q.contains("next month") {
        let first_this = now.with_day(1).unwrap_or(now);
        let next_month_first = add_months(first_this, 1);
        let next_month_end = add_months(next_month_first, 1) - Duration::days(1);
        return Some(window(next_month_first, next_month_end));
    }
    if q.contains("last year") {
        let y = now.year() - 1;
        let from = Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).single()?;
        let to = Utc.with_ymd_and_hms(y, 12, 31, 0, 0, 0).single()?;
        return Some(window(from, to));
    }

    if let Some(rest) = strip_prefix_any(&q, &["a couple of days ago", "a couple days ago"]) {
        let _ = rest;
        let d = now - Duration::days(2);
        return Some(window(d, d));
    }
    if q.contains("a few days ago") {
        let d = now - Duration::days(3);
        return Some(window(d, d));
    }
    if q.contains("a couple of weeks ago") || q.contains("a couple weeks ago") {
        let d = now - Duration::weeks(2);
        return Some(window(d, d));
    }
    if q.contains("a few weeks ago") {
        let d = now - Duration::weeks(3);
        return Some(window(d, d));
    }
    if q.contains("a couple of months ago") || q.contains("a couple months ago") {
        let d = add_months(now, -2);
        return Some(window(d, d));
    }
    if q.contains("a few months ago") {
        let d = add_months(now, -3);
        return Some(window(d, d));
    }

    if let Some(r) = match_last_n(&q, "day") {
        let d = now - Duration::days(r);
        return Some(window(d, now));
    }
    if let Some(r) = match_last_n(&q, "week") {
        let d = now - Duration::weeks(r);
        return Some(window(d, now));
    }
    if let Some(r) = match_last_n(&q, "month") {
        let d = add_months(now, -(r as i32));
        return Some(window(d, now));
    }

    for (name, wd) in WEEKDAYS {
        if q.contains(&format!("last {name}")) {
            let back = days_back_to_weekday(now, *wd);
            let d = now - Duration::days(back);
            return Some(window(d, d));
        }
    }

    if let Some(range) = match_month_year(&q, now.year()) {
        return Some(range);
    }

    None
}

fn strip_prefix_any<'a>(q: &'a str, needles: &[&str]) -> Option<&'a str> {
    needles.iter().find(|n| q.contains(**n)).map(|_| q)
}

fn add_months(d: DateTime<Utc>, delta: i32) -> DateTime<Utc> {
    let total = d.year() * 12 + (d.month() as i32 - 1) + delta;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12)) as u32 + 1;
    let day = d.day().min(days_in_month(year, month));
    Utc.with_ymd_and_hms(year, month, day, d.hour(), d.minute(), d.second())
        .single()
        .unwrap_or(d)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Matches `"last N day(s)/week(s)/month(s)"` and returns `N`.
fn match_last_n(q: &str, unit: &str) -> Option<i64> {
    let plural = format!("{unit}s");
    for word in q.split_whitespace().collect::<Vec<_>>().windows(3) {
        if word[0] == "last" {
            if let Ok(n) = word[1].parse::<i64>() {
                if word[2] == unit || word[2] == plural {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// Matches `"<Month> <Year>"` / `"<Month>"` (implied current/reference year).
fn match_month_year(q: &str, ref_year: i32) -> Option<TimeRange> {
    let tokens: Vec<&str> = q.split_whitespace().collect();
    for (i, tok) in tokens.iter().enumerate() {
        let clean: String = tok.chars().filter(|c| c.is_alphanumeric()).collect();
        if let Some((_, month)) = MONTH_NAMES.iter().find(|(name, _)| *name == clean.to_lowercase()) {
            let year = tokens
                .get(i + 1)
                .and_then(|t| t.parse::<i32>().ok())
                .filter(|y| *y > 1000)
                .unwrap_or(ref_year);
            let from = Utc.with_ymd_and_hms(year, *month, 1, 0, 0, 0).single()?;
            let last_day = days_in_month(year, *month);
            let to = Utc.with_ymd_and_hms(year, *month, last_day, 0, 0, 0).single()?;
            return Some(window(from, to));
        }
    }
    None
}

/// Step 2: fallback parser. Tries to find an ISO-ish `YYYY-MM-DD` date
/// token directly; rejects short tokens from [`FALSE_POSITIVES`].
fn fallback_parse(query: &str) -> Option<TimeRange> {
    for tok in query.split(|c: char| !c.is_alphanumeric() && c != '-') {
        if tok.len() <= 5 && FALSE_POSITIVES.contains(&tok.to_lowercase().as_str()) {
            continue;
        }
        if let Ok(d) = NaiveDate::parse_from_str(tok, "%Y-%m-%d") {
            let from = d.and_hms_opt(0, 0, 0)?.and_local_timezone(Utc).single()?;
            let to = d.and_hms_milli_opt(23, 59, 59, 999)?.and_local_timezone(Utc).single()?;
            return Some(TimeRange {
                from: from.timestamp_millis(),
                to: to.timestamp_millis(),
            });
        }
    }
    None
}

/// Extract a temporal range from `query` relative to `now`, or `None` if no
/// deterministic phrase or parseable date is found.
pub fn extract_time_range(query: &str, now: DateTime<Utc>) -> Option<TimeRange> {
    phrase_table(query, now).or_else(|| fallback_parse(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn yesterday_is_the_full_prior_day() {
        let r = extract_time_range("What happened yesterday?", ref_now()).unwrap();
        let expected_from = Utc.with_ymd_and_hms(2024, 6, 14, 0, 0, 0).unwrap().timestamp_millis();
        let expected_to = Utc
            .with_ymd_and_hms(2024, 6, 14, 23, 59, 59)
            .unwrap()
            .timestamp_millis()
            + 999;
        assert_eq!(r.from, expected_from);
        assert_eq!(r.to, expected_to);
    }

    #[test]
    fn deterministic_across_calls() {
        let a = extract_time_range("last week", ref_now());
        let b = extract_time_range("last week", ref_now());
        assert_eq!(a, b);
    }

    #[test]
    fn no_signal_returns_none() {
        assert!(extract_time_range("what is the capital of france", ref_now()).is_none());
    }

    #[test]
    fn short_false_positive_tokens_are_not_dates() {
        assert!(extract_time_range("do you remember that", ref_now()).is_none());
    }
}
