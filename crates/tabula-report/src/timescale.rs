//! Calendar columns.
//!
//! A calendar column splits the report window into consecutive intervals
//! of one [`TimeScale`]. The header gets two lines: the lower line labels
//! every interval, the upper line groups neighbouring intervals that share
//! a coarser label. Body cells are coloured by load and working time and
//! neighbouring empty cells of equal colour are merged.

use chrono::NaiveDateTime;
use tabula_core::{
    FormatOptions, Interval, Project, PropertyId, QueryRequest, Reportable, ScenarioIdx, TimeScale,
    Value, ValueQuery,
};

use crate::columns::CellContent;
use crate::table::{Cell, Column, Legend, Table};

/// Width of one calendar sub-column in pixels
pub const CALENDAR_CELL_WIDTH: u32 = 20;

/// Builds header and body cells of one calendar column
pub struct TimeScaleColumnBuilder<'a> {
    project: &'a Project,
    query: &'a dyn ValueQuery,
    format: &'a FormatOptions,
    scale: TimeScale,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl<'a> TimeScaleColumnBuilder<'a> {
    /// `start` must already be aligned to `scale`
    pub fn new(
        project: &'a Project,
        query: &'a dyn ValueQuery,
        format: &'a FormatOptions,
        scale: TimeScale,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            project,
            query,
            format,
            scale,
            start,
            end,
        }
    }

    /// The intervals of the calendar, in order
    pub fn steps(&self) -> Vec<Interval> {
        let mut steps = Vec::new();
        let mut t = self.start;
        while t < self.end {
            let next = self.scale.next(t);
            steps.push(Interval::new(t, next));
            if next <= t {
                break;
            }
            t = next;
        }
        steps
    }

    /// Header table with one column per interval
    pub fn header(&self, max_width: u32) -> Table {
        let mut table = Table::new();
        table.equi_rows = true;
        table.max_width = Some(max_width);

        let mut group_start = 0;
        let mut group_label: Option<String> = None;
        for (i, step) in self.steps().into_iter().enumerate() {
            let label = self.scale.upper_label(step.start);
            let mut column = Column::new("", "");
            column.upper.data = Some(step.start);
            if i > 0 && label == group_label {
                column.upper.hidden = true;
            } else {
                if let Some(first) = table.columns.get_mut(group_start) {
                    first.upper.columns = i - group_start;
                }
                group_start = i;
                column.upper.text = label.clone().unwrap_or_default();
                group_label = label;
            }
            column.lower.text = self.scale.lower_label(step.start);
            column.lower.width = Some(CALENDAR_CELL_WIDTH);
            if !self.project.calendar.is_working_time(&step) {
                column.lower.category = Some("tabhead_offduty".into());
            }
            table.columns.push(column);
        }
        let total = table.columns.len();
        if let Some(first) = table.columns.get_mut(group_start) {
            first.upper.columns = total - group_start;
        }
        table
    }

    /// Cells of a task row. `resource` is the enclosing resource of nested
    /// rows; loads are then limited to that resource.
    pub fn task_cells(
        &self,
        task: PropertyId,
        resource: Option<PropertyId>,
        scenario: ScenarioIdx,
        content: CellContent,
        legend: &mut Legend,
    ) -> Vec<Cell> {
        let fallback = self.project.interval();
        let task_interval = self
            .project
            .property(task)
            .effective_interval(scenario, &fallback)
            .unwrap_or(fallback);
        let container = self.project.is_container(task);
        let suffix = self.parity_suffix(task);
        let request = QueryRequest::new(task, "effort", scenario, fallback, self.format).scope(resource);

        let mut cells = Vec::new();
        let mut anchor = None;
        for step in self.steps() {
            let mut cell = Cell::default().bold(container);
            if content == CellContent::Load {
                let result = self.query.evaluate(&request.with_interval(step));
                if result.value_or_zero() > 0.0 {
                    cell.text = result.display_text;
                }
            }
            let category = if step.overlaps(&task_interval) {
                if container {
                    "calconttask"
                } else {
                    "caltask"
                }
            } else if !self.project.calendar.is_working_time(&step) {
                "offduty"
            } else {
                "taskcell"
            };
            cell.category = Some(format!("{}{}", category, suffix));
            Self::try_merge(&mut cells, &mut anchor, cell);
        }

        legend.add_calendar_item("Container Task", "calconttask1");
        legend.add_calendar_item("Task", "caltask1");
        legend.add_calendar_item("Off duty time", "offduty");
        cells
    }

    /// Cells of a resource row. `task` is the enclosing task of nested
    /// rows; loads then show the work for that task only.
    pub fn resource_cells(
        &self,
        resource: PropertyId,
        task: Option<PropertyId>,
        scenario: ScenarioIdx,
        content: CellContent,
        legend: &mut Legend,
    ) -> Vec<Cell> {
        let fallback = self.project.interval();
        let task_interval = task.map(|t| {
            self.project
                .property(t)
                .effective_interval(scenario, &fallback)
                .unwrap_or(fallback)
        });
        let container = self.project.is_container(resource);
        let suffix = self.parity_suffix(resource);
        let request = QueryRequest::new(resource, "effort", scenario, fallback, self.format);

        let mut cells = Vec::new();
        let mut anchor = None;
        for step in self.steps() {
            let mut cell = Cell::default().bold(container);
            let step_request = request.with_interval(step);

            let total = self.query.evaluate(&step_request);
            let work_load = total.value_or_zero();
            let mut load_text = total.display_text;
            let task_load = match task {
                Some(t) => {
                    let scoped = self.query.evaluate(&step_request.clone().scope(Some(t)));
                    load_text = scoped.display_text.clone();
                    scoped.value_or_zero()
                }
                None => 0.0,
            };
            let free_load = self
                .query
                .evaluate(&step_request.with_attribute("freework"))
                .value_or_zero();

            if content == CellContent::Load {
                let shown = if task.is_some() { task_load } else { work_load };
                if shown > 0.0 {
                    cell.text = load_text;
                }
            }

            let category = match task_interval {
                Some(task_interval) if step.overlaps(&task_interval) => {
                    if task_load > 0.0 && free_load == 0.0 {
                        "busy"
                    } else if work_load == 0.0 && free_load == 0.0 {
                        "offduty"
                    } else {
                        "loaded"
                    }
                }
                Some(_) => {
                    if free_load > 0.0 {
                        "free"
                    } else if work_load == 0.0 && free_load == 0.0 {
                        "offduty"
                    } else {
                        "resourcecell"
                    }
                }
                None => {
                    if work_load > 0.0 && free_load == 0.0 {
                        "busy"
                    } else if work_load > 0.0 {
                        "loaded"
                    } else if free_load > 0.0 {
                        "free"
                    } else {
                        "offduty"
                    }
                }
            };
            cell.category = Some(format!("{}{}", category, suffix));
            Self::try_merge(&mut cells, &mut anchor, cell);
        }

        legend.add_calendar_item("Resource is fully loaded", "busy1");
        legend.add_calendar_item("Resource is partially loaded", "loaded1");
        legend.add_calendar_item("Resource is available", "free");
        legend.add_calendar_item("Off duty time", "offduty");
        cells
    }

    /// Append `cell`, merging it into the previous visible cell if both are
    /// empty and look the same. `anchor` tracks that visible cell.
    pub fn try_merge(cells: &mut Vec<Cell>, anchor: &mut Option<usize>, mut cell: Cell) {
        if cell.text.is_empty() {
            if let Some(previous) = anchor.and_then(|i| cells.get_mut(i)) {
                if previous.same_content(&cell) {
                    previous.columns += 1;
                    cell.hidden = true;
                    cells.push(cell);
                    return;
                }
            }
        }
        *anchor = Some(cells.len());
        cells.push(cell);
    }

    /// Alternating colour suffix by property index
    fn parity_suffix(&self, property: PropertyId) -> &'static str {
        let index = match self.project.attribute(property, "index", None) {
            Some(Value::Int(i)) => *i,
            _ => 1,
        };
        if index % 2 == 1 {
            "1"
        } else {
            "2"
        }
    }
}
