//! Calendar time scales used by calendar columns.
//!
//! A scale knows how to align a time to the start of its interval, how to
//! step to the same time in the next interval, and how to label an interval
//! on the upper (coarser) and lower (finer) header lines.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity of a calendar column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl TimeScale {
    pub const ALL: [TimeScale; 6] = [
        TimeScale::Hourly,
        TimeScale::Daily,
        TimeScale::Weekly,
        TimeScale::Monthly,
        TimeScale::Quarterly,
        TimeScale::Yearly,
    ];

    /// Map a column id (`hourly`, `daily`, ...) to its scale
    pub fn from_column_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeScale::Hourly => "hourly",
            TimeScale::Daily => "daily",
            TimeScale::Weekly => "weekly",
            TimeScale::Monthly => "monthly",
            TimeScale::Quarterly => "quarterly",
            TimeScale::Yearly => "yearly",
        }
    }

    /// Start of the interval containing `t`
    pub fn align(&self, t: NaiveDateTime, week_starts_monday: bool) -> NaiveDateTime {
        let date = t.date();
        let aligned = match self {
            TimeScale::Hourly | TimeScale::Daily => date,
            TimeScale::Weekly => {
                let offset = if week_starts_monday {
                    date.weekday().num_days_from_monday()
                } else {
                    date.weekday().num_days_from_sunday()
                };
                date - Duration::days(i64::from(offset))
            }
            TimeScale::Monthly => first_of_month(date.year(), date.month()),
            TimeScale::Quarterly => first_of_month(date.year(), (date.month() - 1) / 3 * 3 + 1),
            TimeScale::Yearly => first_of_month(date.year(), 1),
        };
        aligned.and_time(NaiveTime::MIN)
    }

    /// Same time in the next interval. Saturates at the end of the time axis.
    pub fn next(&self, t: NaiveDateTime) -> NaiveDateTime {
        let stepped = match self {
            TimeScale::Hourly => t.checked_add_signed(Duration::hours(1)),
            TimeScale::Daily => t.checked_add_signed(Duration::days(1)),
            TimeScale::Weekly => t.checked_add_signed(Duration::weeks(1)),
            TimeScale::Monthly => t.checked_add_months(Months::new(1)),
            TimeScale::Quarterly => t.checked_add_months(Months::new(3)),
            TimeScale::Yearly => t.checked_add_months(Months::new(12)),
        };
        stepped.unwrap_or(NaiveDateTime::MAX)
    }

    /// Label of the upper header line. Yearly calendars have none.
    pub fn upper_label(&self, t: NaiveDateTime) -> Option<String> {
        match self {
            TimeScale::Hourly => Some(t.format("%a %Y-%m-%d").to_string()),
            TimeScale::Daily | TimeScale::Weekly => Some(t.format("%b %Y").to_string()),
            TimeScale::Monthly | TimeScale::Quarterly => Some(t.year().to_string()),
            TimeScale::Yearly => None,
        }
    }

    /// Label of the lower header line
    pub fn lower_label(&self, t: NaiveDateTime) -> String {
        match self {
            TimeScale::Hourly => t.format("%H").to_string(),
            TimeScale::Daily | TimeScale::Weekly => t.day().to_string(),
            TimeScale::Monthly => t.format("%b").to_string(),
            TimeScale::Quarterly => format!("Q{}", (t.month() - 1) / 3 + 1),
            TimeScale::Yearly => t.year().to_string(),
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn column_ids_round_trip() {
        for scale in TimeScale::ALL {
            assert_eq!(TimeScale::from_column_id(scale.as_str()), Some(scale));
        }
        assert_eq!(TimeScale::from_column_id("name"), None);
    }

    #[test]
    fn align_to_calendar_boundaries() {
        // Thursday 2025-02-13 15:00
        let t = at(2025, 2, 13, 15);
        assert_eq!(TimeScale::Hourly.align(t, true), at(2025, 2, 13, 0));
        assert_eq!(TimeScale::Weekly.align(t, true), at(2025, 2, 10, 0));
        assert_eq!(TimeScale::Weekly.align(t, false), at(2025, 2, 9, 0));
        assert_eq!(TimeScale::Monthly.align(t, true), at(2025, 2, 1, 0));
        assert_eq!(TimeScale::Quarterly.align(at(2025, 8, 20, 0), true), at(2025, 7, 1, 0));
        assert_eq!(TimeScale::Yearly.align(t, true), at(2025, 1, 1, 0));
    }

    #[test]
    fn months_step_by_calendar_not_fixed_days() {
        assert_eq!(TimeScale::Monthly.next(at(2025, 1, 1, 0)), at(2025, 2, 1, 0));
        assert_eq!(TimeScale::Monthly.next(at(2025, 2, 1, 0)), at(2025, 3, 1, 0));
        assert_eq!(TimeScale::Quarterly.next(at(2025, 10, 1, 0)), at(2026, 1, 1, 0));
        assert_eq!(TimeScale::Hourly.next(at(2025, 1, 1, 23)), at(2025, 1, 2, 0));
    }

    #[test]
    fn labels() {
        let t = at(2025, 5, 7, 9);
        assert_eq!(TimeScale::Hourly.lower_label(t), "09");
        assert_eq!(TimeScale::Daily.upper_label(t).as_deref(), Some("May 2025"));
        assert_eq!(TimeScale::Daily.lower_label(t), "7");
        assert_eq!(TimeScale::Monthly.lower_label(t), "May");
        assert_eq!(TimeScale::Quarterly.lower_label(t), "Q2");
        assert_eq!(TimeScale::Yearly.upper_label(t), None);
    }
}
