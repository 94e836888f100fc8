//! Working time calendar.
//!
//! Calendar columns colour off-duty intervals differently and the free-work
//! query needs the number of working hours in an interval, so the calendar
//! answers both questions for arbitrary (not day aligned) intervals.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::Interval;

/// Working time definitions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    /// Human-readable name
    pub name: String,
    /// Working hours per day
    pub working_hours: Vec<TimeRange>,
    /// Working days (0 = Sunday, 6 = Saturday)
    pub working_days: Vec<u8>,
    /// Holiday dates
    pub holidays: Vec<Holiday>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            name: "Standard".into(),
            working_hours: vec![
                TimeRange { start: 9 * 60, end: 12 * 60 },
                TimeRange { start: 13 * 60, end: 18 * 60 },
            ],
            working_days: vec![1, 2, 3, 4, 5], // Mon-Fri
            holidays: Vec::new(),
        }
    }
}

impl Calendar {
    /// Calculate working hours per day
    pub fn hours_per_day(&self) -> f64 {
        self.working_hours.iter().map(|r| r.duration_hours()).sum()
    }

    /// Check if a date is a working day
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        if !self.working_days.contains(&weekday) {
            return false;
        }
        !self.holidays.iter().any(|h| h.contains(date))
    }

    /// Add a holiday (builder style)
    pub fn holiday(mut self, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.holidays.push(Holiday {
            name: name.into(),
            start,
            end,
        });
        self
    }

    /// Number of working hours inside `interval`
    pub fn working_hours(&self, interval: &Interval) -> f64 {
        let mut minutes = 0i64;
        let mut day = interval.start.date();
        let last = interval.end.date();
        while day <= last {
            if self.is_working_day(day) {
                let midnight = day.and_time(NaiveTime::MIN);
                for range in &self.working_hours {
                    let slot = Interval::new(
                        midnight + Duration::minutes(i64::from(range.start)),
                        midnight + Duration::minutes(i64::from(range.end)),
                    );
                    if let Some(common) = slot.intersection(interval) {
                        minutes += common.duration().num_minutes();
                    }
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        minutes as f64 / 60.0
    }

    /// True if any working time falls inside `interval`
    pub fn is_working_time(&self, interval: &Interval) -> bool {
        self.working_hours(interval) > 0.0
    }

    /// True if `t` itself lies inside a working slot
    pub fn is_working_instant(&self, t: NaiveDateTime) -> bool {
        if !self.is_working_day(t.date()) {
            return false;
        }
        let minute = (t.time() - NaiveTime::MIN).num_minutes();
        self.working_hours
            .iter()
            .any(|r| i64::from(r.start) <= minute && minute < i64::from(r.end))
    }
}

/// Time range within a day (in minutes from midnight)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: u16, // Minutes from midnight
    pub end: u16,
}

impl TimeRange {
    pub fn duration_hours(&self) -> f64 {
        f64::from(self.end.saturating_sub(self.start)) / 60.0
    }
}

/// Holiday definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Holiday {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
