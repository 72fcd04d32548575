//! Dashboard queries over the record collection.
//!
//! Pure functions: the caller supplies `now` (and with it the timezone the
//! window boundaries are computed in), so every rule here is testable with
//! fixed clocks.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AttendanceRecord;

/// Time windows offered once a search is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeWindow {
    All,
    Week,
    Month,
    Year,
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::All
    }
}

/// What the dashboard renders: the filtered view plus the size of the whole
/// collection, so the UI can tell "nothing recorded yet" apart from "nothing
/// matches this search".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub records: Vec<AttendanceRecord>,
    pub total: usize,
}

pub fn dashboard_page<Tz: TimeZone>(
    records: &[AttendanceRecord],
    search: &str,
    window: TimeWindow,
    now: DateTime<Tz>,
) -> DashboardPage {
    DashboardPage {
        records: dashboard_records(records, search, window, now),
        total: records.len(),
    }
}

/// Filter and order the collection the way the dashboard shows it.
///
/// Without search text the collection is returned as-is (it is kept newest
/// first). With search text: case-insensitive substring match on the employee
/// id, the chosen time window applied to the matches, and the result ordered
/// oldest first so one person's history reads top to bottom.
pub fn dashboard_records<Tz: TimeZone>(
    records: &[AttendanceRecord],
    search: &str,
    window: TimeWindow,
    now: DateTime<Tz>,
) -> Vec<AttendanceRecord> {
    let query = search.trim();
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    let cutoff = window_start(window, &now);
    let mut matched: Vec<AttendanceRecord> = records
        .iter()
        .filter(|r| r.employee_id.to_lowercase().contains(&needle))
        .filter(|r| cutoff.map_or(true, |start| r.check_in_time >= start))
        .cloned()
        .collect();
    matched.sort_by(|a, b| a.check_in_time.cmp(&b.check_in_time));
    matched
}

/// Start instant of a window, `None` for all time. The week starts on the
/// most recent Sunday at local midnight; month and year start on their first
/// day at local midnight.
fn window_start<Tz: TimeZone>(window: TimeWindow, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let start_date = match window {
        TimeWindow::All => return None,
        TimeWindow::Week => {
            today - Duration::days(now.weekday().num_days_from_sunday() as i64)
        }
        TimeWindow::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?,
        TimeWindow::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
    };
    let midnight = start_date.and_hms_opt(0, 0, 0)?;
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationStamp;

    fn record(id: &str, employee_id: &str, time: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            employee_id: employee_id.to_string(),
            check_in_time: time,
            location: LocationStamp {
                latitude: 0.0,
                longitude: 0.0,
                address: Some("somewhere".to_string()),
            },
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn ids(records: &[AttendanceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn no_search_returns_the_collection_untouched() {
        let records = vec![
            record("newest", "E1", at(2024, 6, 18, 9, 0)),
            record("older", "E2", at(2024, 6, 15, 9, 0)),
        ];
        // Window choice is irrelevant without a search.
        let shown = dashboard_records(&records, "", TimeWindow::Week, at(2024, 6, 19, 12, 0));
        assert_eq!(ids(&shown), vec!["newest", "older"]);

        let shown = dashboard_records(&records, "   ", TimeWindow::Year, at(2024, 6, 19, 12, 0));
        assert_eq!(ids(&shown), vec!["newest", "older"]);
    }

    #[test]
    fn search_is_a_case_insensitive_substring_match() {
        let records = vec![
            record("a", "E1", at(2024, 6, 18, 9, 0)),
            record("b", "E10", at(2024, 6, 17, 9, 0)),
            record("c", "E2", at(2024, 6, 16, 9, 0)),
        ];
        let shown = dashboard_records(&records, "e1", TimeWindow::All, at(2024, 6, 19, 12, 0));
        // E1 and E10 both contain "e1"; E2 does not. Oldest first.
        assert_eq!(ids(&shown), vec!["b", "a"]);
    }

    #[test]
    fn matches_sort_oldest_first() {
        let records = vec![
            record("newest", "EMP42", at(2024, 6, 18, 9, 0)),
            record("middle", "EMP42", at(2024, 6, 17, 9, 0)),
            record("oldest", "EMP42", at(2024, 6, 16, 9, 0)),
        ];
        let shown = dashboard_records(&records, "EMP42", TimeWindow::All, at(2024, 6, 19, 12, 0));
        assert_eq!(ids(&shown), vec!["oldest", "middle", "newest"]);
    }

    #[test]
    fn week_window_starts_on_the_most_recent_sunday() {
        let records = vec![
            record("saturday", "E1", at(2024, 6, 15, 23, 59)),
            record("sunday", "E1", at(2024, 6, 16, 0, 0)),
            record("tuesday", "E1", at(2024, 6, 18, 9, 0)),
        ];
        // Wednesday 2024-06-19; the week began Sunday 2024-06-16 00:00.
        let now = at(2024, 6, 19, 15, 0);
        let shown = dashboard_records(&records, "E1", TimeWindow::Week, now);
        assert_eq!(ids(&shown), vec!["sunday", "tuesday"]);
    }

    #[test]
    fn week_window_on_a_sunday_is_today_only() {
        let records = vec![
            record("last_week", "E1", at(2024, 6, 15, 12, 0)),
            record("today", "E1", at(2024, 6, 16, 8, 0)),
        ];
        let now = at(2024, 6, 16, 9, 0);
        let shown = dashboard_records(&records, "E1", TimeWindow::Week, now);
        assert_eq!(ids(&shown), vec!["today"]);
    }

    #[test]
    fn month_window_starts_on_the_first() {
        let records = vec![
            record("may", "E1", at(2024, 5, 31, 23, 59)),
            record("june", "E1", at(2024, 6, 1, 0, 0)),
        ];
        let shown = dashboard_records(&records, "E1", TimeWindow::Month, at(2024, 6, 19, 12, 0));
        assert_eq!(ids(&shown), vec!["june"]);
    }

    #[test]
    fn year_window_starts_on_january_first() {
        let records = vec![
            record("last_year", "E1", at(2023, 12, 31, 23, 59)),
            record("january", "E1", at(2024, 1, 1, 0, 0)),
            record("june", "E1", at(2024, 6, 10, 9, 0)),
        ];
        let shown = dashboard_records(&records, "E1", TimeWindow::Year, at(2024, 6, 19, 12, 0));
        assert_eq!(ids(&shown), vec!["january", "june"]);
    }

    #[test]
    fn page_reports_the_total_alongside_the_matches() {
        let records = vec![
            record("a", "E1", at(2024, 6, 18, 9, 0)),
            record("b", "E2", at(2024, 6, 17, 9, 0)),
        ];
        let page = dashboard_page(&records, "E9", TimeWindow::All, at(2024, 6, 19, 12, 0));
        assert!(page.records.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn window_serde_matches_the_frontend_ids() {
        assert_eq!(serde_json::to_string(&TimeWindow::All).unwrap(), "\"all\"");
        assert_eq!(
            serde_json::from_str::<TimeWindow>("\"week\"").unwrap(),
            TimeWindow::Week
        );
    }
}
