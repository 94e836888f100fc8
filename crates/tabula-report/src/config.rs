//! Report configuration.
//!
//! Reports are usually described in TOML:
//!
//! ```toml
//! id = "overview"
//! kind = "tasks"
//! task_root = "phase1"
//! sort_tasks = [{ criterion = "tree" }, { criterion = "start", scenario = 0 }]
//!
//! [[columns]]
//! id = "name"
//!
//! [[columns]]
//! id = "weekly"
//! content = "load"
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabula_core::{Expression, FormatOptions, LoadUnit, NumberFormat, Project};

use crate::columns::ColumnDefinition;
use crate::property_list::SortLevel;
use crate::table::DEFAULT_ROW_HEIGHT;

/// Which property tree drives the top level rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Tasks,
    Resources,
}

/// Everything needed to generate one report table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub id: String,
    pub kind: ReportKind,
    pub columns: Vec<ColumnDefinition>,
    /// Scenario ids; empty means the first project scenario
    pub scenarios: Vec<String>,
    /// Report window; unset ends are fitted to the reported tasks
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub task_root: Option<String>,
    pub resource_root: Option<String>,
    pub hide_task: Option<Expression>,
    pub rollup_task: Option<Expression>,
    pub hide_resource: Option<Expression>,
    pub rollup_resource: Option<Expression>,
    pub sort_tasks: Vec<SortLevel>,
    pub sort_resources: Vec<SortLevel>,
    /// Show the assigned properties of the other kind below each row
    pub nested: bool,
    pub time_format: String,
    pub load_unit: LoadUnit,
    pub number_format: NumberFormat,
    pub currency_format: NumberFormat,
    pub week_starts_monday: bool,
    pub headline: Option<String>,
    pub caption: Option<String>,
    pub row_height: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: ReportKind::Tasks,
            columns: Vec::new(),
            scenarios: Vec::new(),
            start: None,
            end: None,
            task_root: None,
            resource_root: None,
            hide_task: None,
            rollup_task: None,
            hide_resource: None,
            rollup_resource: None,
            sort_tasks: vec![SortLevel::tree(), SortLevel::new("seqno", true)],
            sort_resources: vec![SortLevel::tree(), SortLevel::new("seqno", true)],
            nested: false,
            time_format: "%Y-%m-%d".into(),
            load_unit: LoadUnit::Days,
            number_format: NumberFormat::new(1),
            currency_format: NumberFormat::new(2),
            week_starts_monday: true,
            headline: None,
            caption: None,
            row_height: DEFAULT_ROW_HEIGHT,
        }
    }
}

impl ReportConfig {
    pub fn new(id: impl Into<String>, kind: ReportKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn tasks(id: impl Into<String>) -> Self {
        Self::new(id, ReportKind::Tasks)
    }

    pub fn resources(id: impl Into<String>) -> Self {
        Self::new(id, ReportKind::Resources)
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Add plain columns by id
    pub fn columns<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .extend(ids.into_iter().map(|id| ColumnDefinition::new(id)));
        self
    }

    pub fn scenario(mut self, id: impl Into<String>) -> Self {
        self.scenarios.push(id.into());
        self
    }

    pub fn period(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn task_root(mut self, id: impl Into<String>) -> Self {
        self.task_root = Some(id.into());
        self
    }

    pub fn resource_root(mut self, id: impl Into<String>) -> Self {
        self.resource_root = Some(id.into());
        self
    }

    pub fn hide_task(mut self, expr: Expression) -> Self {
        self.hide_task = Some(expr);
        self
    }

    pub fn rollup_task(mut self, expr: Expression) -> Self {
        self.rollup_task = Some(expr);
        self
    }

    pub fn hide_resource(mut self, expr: Expression) -> Self {
        self.hide_resource = Some(expr);
        self
    }

    pub fn rollup_resource(mut self, expr: Expression) -> Self {
        self.rollup_resource = Some(expr);
        self
    }

    pub fn sort_tasks(mut self, levels: Vec<SortLevel>) -> Self {
        self.sort_tasks = levels;
        self
    }

    pub fn sort_resources(mut self, levels: Vec<SortLevel>) -> Self {
        self.sort_resources = levels;
        self
    }

    pub fn nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    pub fn load_unit(mut self, unit: LoadUnit) -> Self {
        self.load_unit = unit;
        self
    }

    pub fn headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// True if both ends of the report window are given
    pub fn has_user_period(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Formatting options for value queries
    pub fn format_options(&self, project: &Project) -> FormatOptions {
        FormatOptions {
            load_unit: self.load_unit,
            number_format: self.number_format.clone(),
            currency_format: self.currency_format.clone(),
            time_format: self.time_format.clone(),
            hours_per_day: project.calendar.hours_per_day(),
        }
    }
}
