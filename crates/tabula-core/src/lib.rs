//! # tabula-core
//!
//! Core property model and collaborator contracts for the tabula report engine.
//!
//! This crate provides:
//! - Typed attribute values with provenance: `Value`, `AttributeValue`, `AttributeSchema`
//! - The property tree: `Project` arena of tasks and resources, `Reportable`
//! - Time handling: `Interval`, `Calendar`, `TimeScale`
//! - Query contracts: `ValueQuery`, `Predicate` and their reference
//!   implementations `ProjectQuery` and `Expression`
//! - Load and number formatting: `FormatOptions`
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tabula_core::{Project, Value};
//!
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut project = Project::new("web", "Website", start, end);
//!
//! let phase = project.add_task("design", "Design", None).unwrap();
//! let task = project.add_task("mockups", "Mockups", Some(phase)).unwrap();
//! project.set_in(task, "start", 0, Value::Date(start)).unwrap();
//!
//! assert_eq!(project.depth(task), 1);
//! assert_eq!(project.wbs(task), "1.1");
//! ```

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod attribute;
pub mod calendar;
pub mod format;
pub mod project;
pub mod query;
pub mod time;

pub use attribute::{
    is_valid_date_format, AttributeDefinition, AttributeSchema, AttributeType, AttributeValue,
    Provenance, Value,
};
pub use calendar::{Calendar, Holiday, TimeRange};
pub use format::{FormatOptions, LoadUnit, NumberFormat};
pub use project::{Booking, Project, Property, Reportable, Scenario};
pub use query::{Expression, Predicate, ProjectQuery, QueryRequest, QueryResult, ValueQuery};
pub use time::TimeScale;

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a property in the project arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub usize);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a scenario in the project scenario list
pub type ScenarioIdx = usize;

/// The two property trees of a project
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Task,
    Resource,
}

impl PropertyKind {
    /// The other kind; resources nest under tasks and vice versa
    pub fn counterpart(self) -> Self {
        match self {
            PropertyKind::Task => PropertyKind::Resource,
            PropertyKind::Resource => PropertyKind::Task,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Task => f.write_str("task"),
            PropertyKind::Resource => f.write_str("resource"),
        }
    }
}

// ============================================================================
// Interval
// ============================================================================

/// Half-open time interval `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }

    /// True if `t` lies inside the interval
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }

    /// True if one interval starts inside the other
    pub fn overlaps(&self, other: &Interval) -> bool {
        (self.start <= other.start && other.start < self.end)
            || (other.start <= self.start && self.start < other.end)
    }

    /// Common part of both intervals, `None` if it is empty
    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let common = Interval::new(self.start.max(other.start), self.end.min(other.end));
        (!common.is_empty()).then_some(common)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(attribute::DEFAULT_DATE_FORMAT),
            self.end.format(attribute::DEFAULT_DATE_FORMAT)
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building or mutating a project
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: PropertyKind, id: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Unknown parent {parent} for {kind}")]
    UnknownParent { kind: PropertyKind, parent: String },

    #[error("Unknown {kind} attribute: {attribute}")]
    UnknownAttribute { kind: PropertyKind, attribute: String },

    #[error("Type mismatch for attribute {attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        attribute: String,
        expected: AttributeType,
        found: AttributeType,
    },

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Attribute {0} is scenario specific and needs a scenario")]
    ScenarioRequired(String),

    #[error("Attribute {0} is not scenario specific")]
    NotScenarioSpecific(String),

    #[error("Inconsistent project data: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn overlap_is_half_open() {
        let a = Interval::new(at(1, 0), at(5, 0));
        assert!(a.overlaps(&Interval::new(at(4, 0), at(8, 0))));
        assert!(a.overlaps(&Interval::new(at(2, 0), at(3, 0))));
        assert!(!a.overlaps(&Interval::new(at(5, 0), at(8, 0))));
        // Zero length interval inside
        assert!(a.overlaps(&Interval::new(at(3, 0), at(3, 0))));
    }

    #[test]
    fn intersection_and_duration() {
        let a = Interval::new(at(1, 0), at(5, 0));
        let b = Interval::new(at(3, 12), at(9, 0));
        assert_eq!(a.intersection(&b), Some(Interval::new(at(3, 12), at(5, 0))));
        assert_eq!(a.intersection(&Interval::new(at(6, 0), at(7, 0))), None);
        assert_eq!(a.duration(), Duration::days(4));
        assert_eq!(Interval::new(at(5, 0), at(1, 0)).duration(), Duration::zero());
    }

    #[test]
    fn kinds_pair_up() {
        assert_eq!(PropertyKind::Task.counterpart(), PropertyKind::Resource);
        assert_eq!(PropertyKind::Resource.to_string(), "resource");
    }

    #[test]
    fn model_errors_render() {
        let err = ModelError::DuplicateId {
            kind: PropertyKind::Task,
            id: "t1".into(),
        };
        assert_eq!(err.to_string(), "Duplicate task id: t1");
    }
}
