//! Table generation.
//!
//! A [`TableBuilder`] walks through a fixed sequence of phases:
//!
//! ```text
//! Idle -> Filtering -> Sorting -> RowGeneration -> Rendered
//! ```
//!
//! Property lists are filtered first, the report window may then be fitted
//! to the surviving tasks, lists are sorted and finally rows are generated.
//! The column headers are set up when row generation starts, because
//! calendar and chart headers depend on the final report window.

use chrono::{Duration, NaiveDateTime};
use std::fmt;
use tabula_core::{
    is_valid_date_format, AttributeType, Expression, FormatOptions, Interval, Predicate, Project, ProjectQuery,
    PropertyId, PropertyKind, QueryRequest, ScenarioIdx, TimeScale, Value, ValueQuery,
};
use tracing::{debug, trace, warn};

use crate::columns::{builtin_column, type_layout, ColumnContext, ColumnDefinition};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::filter::{FilterEngine, FilterSpec};
use crate::macros::expand_macros;
use crate::property_list::{PropertyList, SortLevel};
use crate::table::{Cell, CellSpecial, Chart, ChartLine, Column, Row, Table};
use crate::timescale::TimeScaleColumnBuilder;

/// Text of cells whose value could not be determined
pub const ERROR_MARKER: &str = "<Error>";

/// Font colour of [`ERROR_MARKER`] cells
pub const ERROR_COLOR: u32 = 0xFF_00_00;

/// Font size of cells spanning all scenario rows
const SPANNING_FONT_SIZE: u32 = 15;

/// Progress is reported every this many lines
const PROGRESS_INTERVAL: usize = 10;

/// Generation phase of a [`TableBuilder`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Filtering,
    Sorting,
    RowGeneration,
    Rendered,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Filtering => "filtering",
            Phase::Sorting => "sorting",
            Phase::RowGeneration => "row generation",
            Phase::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

/// Builds the abstract table of one report
pub struct TableBuilder<'a> {
    project: &'a Project,
    config: &'a ReportConfig,
    query: Box<dyn ValueQuery + 'a>,
    format: FormatOptions,
    scenarios: Vec<ScenarioIdx>,
    task_root: Option<PropertyId>,
    resource_root: Option<PropertyId>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    phase: Phase,
    table: Table,
    contexts: Vec<ColumnContext>,
    progress: Option<Box<dyn FnMut(usize) + 'a>>,
}

impl<'a> TableBuilder<'a> {
    /// Resolve scenario and root ids of `config` against `project`
    pub fn new(project: &'a Project, config: &'a ReportConfig) -> Result<Self, ReportError> {
        if !is_valid_date_format(&config.time_format) {
            return Err(ReportError::Usage(format!(
                "Invalid time format '{}' in report {}",
                config.time_format, config.id
            )));
        }
        let scenarios = if config.scenarios.is_empty() {
            vec![0]
        } else {
            config
                .scenarios
                .iter()
                .map(|id| {
                    project
                        .scenario_index(id)
                        .ok_or_else(|| tabula_core::ModelError::UnknownScenario(id.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        let root = |kind: PropertyKind, id: &Option<String>| -> Result<Option<PropertyId>, ReportError> {
            match id {
                Some(id) => project
                    .find(kind, id)
                    .map(Some)
                    .ok_or_else(|| ReportError::Usage(format!("Unknown {} root '{}'", kind, id))),
                None => Ok(None),
            }
        };
        let task_root = root(PropertyKind::Task, &config.task_root)?;
        let resource_root = root(PropertyKind::Resource, &config.resource_root)?;

        Ok(Self {
            project,
            config,
            query: Box::new(ProjectQuery::new(project)),
            format: config.format_options(project),
            scenarios,
            task_root,
            resource_root,
            start: config.start.unwrap_or(project.start),
            end: config.end.unwrap_or(project.end),
            phase: Phase::Idle,
            table: Table::new(),
            contexts: Vec::new(),
            progress: None,
        })
    }

    /// Use another value query evaluator
    pub fn with_query(mut self, query: impl ValueQuery + 'a) -> Self {
        self.query = Box::new(query);
        self
    }

    /// Called with the current line number every few lines
    pub fn on_progress(mut self, callback: impl FnMut(usize) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scenarios(&self) -> &[ScenarioIdx] {
        &self.scenarios
    }

    /// Current report window
    pub fn window(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    fn enter(&mut self, next: Phase, allowed: &[Phase]) -> Result<(), ReportError> {
        if !allowed.contains(&self.phase) {
            return Err(ReportError::Usage(format!(
                "Cannot enter {} phase while in {} phase",
                next, self.phase
            )));
        }
        if self.phase != next {
            debug!(from = %self.phase, to = %next, report = %self.config.id, "report phase");
        }
        self.phase = next;
        Ok(())
    }

    // ========================================================================
    // Filtering and sorting
    // ========================================================================

    /// Filter a task list. `resource` restricts the list to tasks the
    /// resource works on.
    pub fn filter_tasks(
        &mut self,
        list: &PropertyList<'a>,
        resource: Option<PropertyId>,
    ) -> Result<PropertyList<'a>, ReportError> {
        self.enter(Phase::Filtering, &[Phase::Idle, Phase::Filtering])?;
        Ok(self.filter_list(list, resource))
    }

    /// Filter a resource list. `task` restricts the list to resources
    /// allocated to the task within the report window.
    pub fn filter_resources(
        &mut self,
        list: &PropertyList<'a>,
        task: Option<PropertyId>,
    ) -> Result<PropertyList<'a>, ReportError> {
        self.enter(Phase::Filtering, &[Phase::Idle, Phase::Filtering])?;
        Ok(self.filter_list(list, task))
    }

    fn filter_list(&self, list: &PropertyList<'a>, counterpart: Option<PropertyId>) -> PropertyList<'a> {
        let (root, hide, rollup) = match list.kind() {
            PropertyKind::Task => (self.task_root, &self.config.hide_task, &self.config.rollup_task),
            PropertyKind::Resource => (
                self.resource_root,
                &self.config.hide_resource,
                &self.config.rollup_resource,
            ),
        };
        let spec = FilterSpec {
            root,
            counterpart,
            hide: hide.as_ref().map(|e| e as &dyn Predicate),
            rollup: rollup.as_ref().map(|e| e as &dyn Predicate),
        };
        FilterEngine::new(self.project, &self.scenarios, self.window()).filter(list, &spec)
    }

    /// Fit the report window to `tasks` unless the configuration sets it.
    ///
    /// The window covers all tasks in all reported scenarios, is at least
    /// one day long and gets 10% extra room on both ends.
    pub fn adjust_report_period(&mut self, tasks: &PropertyList<'_>) -> Result<(), ReportError> {
        self.enter(Phase::Filtering, &[Phase::Filtering])?;
        if self.config.has_user_period() || tasks.is_empty() {
            return Ok(());
        }
        let mut start: Option<NaiveDateTime> = None;
        let mut end: Option<NaiveDateTime> = None;
        for scenario in &self.scenarios {
            for task in tasks.iter() {
                let date = |attr: &str, fallback| {
                    self.project
                        .attribute(task, attr, Some(*scenario))
                        .and_then(Value::as_date)
                        .unwrap_or(fallback)
                };
                let task_start = date("start", self.project.start);
                let task_end = date("end", self.project.end);
                start = Some(start.map_or(task_start, |s| s.min(task_start)));
                end = Some(end.map_or(task_end, |e| e.max(task_end)));
            }
        }
        let (Some(mut start), Some(mut end)) = (start, end) else {
            return Ok(());
        };
        if end < start + Duration::days(1) {
            end = start + Duration::days(1);
        }
        let padding = Duration::seconds((end - start).num_seconds() / 10);
        start -= padding;
        end += padding;
        if let Some(s) = self.config.start {
            start = s;
        }
        if let Some(e) = self.config.end {
            end = e;
        }
        debug!(%start, %end, "fitted report period");
        self.start = start;
        self.end = end;
        Ok(())
    }

    /// Sort `list` with the configured levels for its kind
    pub fn sort(&mut self, mut list: PropertyList<'a>) -> Result<PropertyList<'a>, ReportError> {
        self.enter(Phase::Sorting, &[Phase::Filtering, Phase::Sorting])?;
        list.set_sorting(self.sort_levels(list.kind()));
        Ok(list)
    }

    fn sort_levels(&self, kind: PropertyKind) -> Vec<SortLevel> {
        match kind {
            PropertyKind::Task => self.config.sort_tasks.clone(),
            PropertyKind::Resource => self.config.sort_resources.clone(),
        }
    }

    // ========================================================================
    // Rows
    // ========================================================================

    fn begin_rows(&mut self) -> Result<(), ReportError> {
        if self.phase == Phase::Sorting {
            self.generate_headers();
        }
        self.enter(Phase::RowGeneration, &[Phase::Sorting, Phase::RowGeneration])
    }

    /// Generate one row per task and scenario. With `resources` given,
    /// every task row is followed by rows for the resources working on it.
    /// Returns the last line number used.
    pub fn generate_task_rows(
        &mut self,
        tasks: &PropertyList<'a>,
        resources: Option<&PropertyList<'a>>,
        scope_row: Option<usize>,
    ) -> Result<usize, ReportError> {
        self.begin_rows()?;
        self.generate_rows(tasks, resources, scope_row)
    }

    /// Generate one row per resource and scenario. With `tasks` given,
    /// every resource row is followed by rows for the tasks it works on.
    /// Returns the last line number used.
    pub fn generate_resource_rows(
        &mut self,
        resources: &PropertyList<'a>,
        tasks: Option<&PropertyList<'a>>,
        scope_row: Option<usize>,
    ) -> Result<usize, ReportError> {
        self.begin_rows()?;
        self.generate_rows(resources, tasks, scope_row)
    }

    fn generate_rows(
        &mut self,
        list: &PropertyList<'a>,
        nested: Option<&PropertyList<'a>>,
        scope_row: Option<usize>,
    ) -> Result<usize, ReportError> {
        let root = match list.kind() {
            PropertyKind::Task => self.task_root,
            PropertyKind::Resource => self.resource_root,
        };
        let tree_mode = list.tree_mode();
        let mut line_no = scope_row.map_or(0, |r| self.table.rows[r].line_no);

        for (position, property) in list.iter().enumerate() {
            if line_no % PROGRESS_INTERVAL == 0 {
                self.report_progress(line_no);
            }
            line_no += 1;

            let mut last_row = 0;
            for scenario in self.scenarios.clone() {
                let mut row = Row::new(property, scenario);
                row.scope_row = scope_row;
                row.no = scope_row.is_none().then_some(position + 1);
                row.line_no = line_no;
                row.sub_line_no = self.table.rows.len() + 1;
                row.height = self.config.row_height;
                row.indent = self.indentation(property, scope_row, root, tree_mode);

                for column in 0..self.config.columns.len() {
                    let cell = self.generate_cell(&row, column)?;
                    row.cells.push(cell);
                }
                self.table.rows.push(row);
                last_row = self.table.rows.len() - 1;
            }

            if let Some(nested) = nested {
                let mut nested_list = self.filter_list(nested, Some(property));
                nested_list.set_sorting(self.sort_levels(nested_list.kind()));
                line_no = self.generate_rows(&nested_list, None, Some(last_row))?;
            }
        }
        Ok(line_no)
    }

    fn report_progress(&mut self, line_no: usize) {
        trace!(line_no, report = %self.config.id, "generating rows");
        if let Some(progress) = self.progress.as_mut() {
            progress(line_no);
        }
    }

    fn indentation(
        &self,
        property: PropertyId,
        scope_row: Option<usize>,
        root: Option<PropertyId>,
        tree_mode: bool,
    ) -> usize {
        let mut indent = scope_row.map_or(0, |r| self.table.rows[r].indent + 1);
        if tree_mode {
            let depth = self.project.depth(property);
            indent += match root {
                Some(root) => depth.saturating_sub(self.project.depth(root) + 1),
                None => depth,
            };
        }
        indent
    }

    /// Finish the table. Can only be called once.
    pub fn finish(&mut self) -> Result<Table, ReportError> {
        if self.phase == Phase::Sorting {
            self.generate_headers();
            self.phase = Phase::RowGeneration;
        }
        self.enter(Phase::Rendered, &[Phase::RowGeneration])?;
        debug!(rows = self.table.rows.len(), report = %self.config.id, "table generated");
        Ok(std::mem::take(&mut self.table))
    }

    // ========================================================================
    // Headers
    // ========================================================================

    fn generate_headers(&mut self) {
        let config = self.config;
        for (index, definition) in config.columns.iter().enumerate() {
            let (column, context) = self.header_column(index, definition);
            self.table.columns.push(column);
            self.contexts.push(context);
        }
    }

    fn header_column(&mut self, index: usize, definition: &ColumnDefinition) -> (Column, ColumnContext) {
        let mut column = Column::new(definition.id.clone(), "");
        column.upper.rows = 2;
        column.lower.hidden = true;

        if definition.id == "chart" {
            let scale = definition.scale.unwrap_or(TimeScale::Weekly);
            let chart = self.table.charts.len();
            self.table.charts.push(Chart {
                column: index,
                scale,
                start: scale.align(self.start, self.config.week_starts_monday),
                end: self.end,
                width: definition.width,
                header_height: self.table.header_line_height * 2 + 1,
                lines: Vec::new(),
            });
            column.upper.special = Some(CellSpecial::Chart(chart));
            self.table.equi_rows = true;
            return (column, ColumnContext::Chart { chart });
        }

        if let Some(scale) = TimeScale::from_column_id(&definition.id) {
            let start = scale.align(self.start, self.config.week_starts_monday);
            let header = self.calendar_builder(scale, start).header(definition.width);
            column.upper.special = Some(CellSpecial::Calendar(header));
            column.scrollbar = true;
            self.table.equi_rows = true;
            return (column, ColumnContext::Calendar { scale, start });
        }

        column.upper.text = definition.header_title(self.project);
        let context = if definition.is_calculated() {
            ColumnContext::Calculated
        } else {
            ColumnContext::Standard
        };
        (column, context)
    }

    fn calendar_builder(&self, scale: TimeScale, start: NaiveDateTime) -> TimeScaleColumnBuilder<'_> {
        TimeScaleColumnBuilder::new(self.project, self.query.as_ref(), &self.format, scale, start, self.end)
    }

    // ========================================================================
    // Cells
    // ========================================================================

    fn generate_cell(&mut self, row: &Row, column: usize) -> Result<Cell, ReportError> {
        let config = self.config;
        let definition = &config.columns[column];
        match self.contexts[column] {
            ColumnContext::Chart { chart } => {
                let scope = row.scope_row.map(|r| self.table.rows[r].property);
                self.table.charts[chart].lines.push(ChartLine {
                    property: row.property,
                    scope,
                    scenario: row.scenario,
                    y: (row.sub_line_no as u32 - 1) * (row.height + 1),
                    height: row.height,
                });
                Ok(Cell::hidden())
            }
            ColumnContext::Calendar { scale, start } => {
                let scope = row.scope_row.map(|r| self.table.rows[r].property);
                let builder = TimeScaleColumnBuilder::new(
                    self.project,
                    self.query.as_ref(),
                    &self.format,
                    scale,
                    start,
                    self.end,
                );
                let mut legend = std::mem::take(&mut self.table.legend);
                let cells = match self.project.kind(row.property) {
                    PropertyKind::Task => builder.task_cells(
                        row.property,
                        scope,
                        row.scenario,
                        definition.content,
                        &mut legend,
                    ),
                    PropertyKind::Resource => builder.resource_cells(
                        row.property,
                        scope,
                        row.scenario,
                        definition.content,
                        &mut legend,
                    ),
                };
                self.table.legend = legend;

                let mut strip = Row::new(row.property, row.scenario);
                strip.scope_row = row.scope_row;
                strip.height = row.height;
                strip.cells = cells;
                let mut embedded = Table::new();
                embedded.equi_rows = true;
                embedded.rows.push(strip);
                Ok(Cell {
                    special: Some(CellSpecial::Calendar(embedded)),
                    ..self.new_cell(row)
                })
            }
            ColumnContext::Calculated => self.calculated_cell(row, definition),
            ColumnContext::Standard => self.standard_cell(row, definition),
        }
    }

    fn new_cell(&self, row: &Row) -> Cell {
        Cell::default().bold(self.project.is_container(row.property))
    }

    fn request<'r>(&'r self, row: &Row, attribute_id: &'r str) -> QueryRequest<'r> {
        QueryRequest::new(row.property, attribute_id, row.scenario, self.window(), &self.format)
            .scope(row.scope_row.map(|r| self.table.rows[r].property))
    }

    /// Columns that are the same in every scenario are shown once, spanning
    /// all scenario rows. Returns false if the cell is hidden.
    fn span_scenarios(&self, cell: &mut Cell, row: &Row, font_size: Option<u32>) -> bool {
        if row.scenario != self.scenarios[0] {
            cell.hidden = true;
            return false;
        }
        cell.rows = self.scenarios.len();
        if font_size.is_some() {
            cell.font_size = font_size;
        }
        true
    }

    fn set_layout(&self, cell: &mut Cell, row: &Row, id: &str, attribute_type: Option<AttributeType>) {
        let (indent, alignment) = match builtin_column(id) {
            Some(builtin) => (builtin.indent, builtin.alignment),
            None => type_layout(attribute_type),
        };
        if indent {
            cell.indent = row.indent;
        }
        cell.alignment = alignment;
        let parity = match self.project.attribute(row.property, "index", None) {
            Some(Value::Int(i)) if i % 2 == 0 => "2",
            _ => "1",
        };
        let base = match self.project.kind(row.property) {
            PropertyKind::Task => "taskcell",
            PropertyKind::Resource => "resourcecell",
        };
        cell.category = Some(format!("{}{}", base, parity));
    }

    fn standard_cell(&self, row: &Row, definition: &ColumnDefinition) -> Result<Cell, ReportError> {
        let kind = self.project.kind(row.property);
        let attribute_type = self.project.attribute_type(kind, &definition.id);
        let mut cell = self.new_cell(row);

        if self.scenarios.len() > 1
            && !self.project.scenario_specific(kind, &definition.id)
            && !self.span_scenarios(&mut cell, row, Some(SPANNING_FONT_SIZE))
        {
            return Ok(cell);
        }
        self.set_layout(&mut cell, row, &definition.id, attribute_type);

        let request = self.request(row, &definition.id);
        match self.cell_text(row, &definition.id, attribute_type) {
            Some(text) => {
                cell.text = match &definition.cell_text {
                    Some(template) => expand_macros(template, &text, self.query.as_ref(), &request)?,
                    None => text,
                };
            }
            None => {
                warn!(
                    property = %self.project.property(row.property).id(),
                    column = %definition.id,
                    "no value for report cell"
                );
                cell.text = ERROR_MARKER.to_string();
                cell.font_color = Some(ERROR_COLOR);
            }
        }
        self.set_url(&mut cell, definition, &request)?;
        Ok(cell)
    }

    /// Text of a plain attribute. `None` marks a value that should exist
    /// but does not.
    fn cell_text(&self, row: &Row, id: &str, attribute_type: Option<AttributeType>) -> Option<String> {
        let attribute_type = attribute_type?;
        match self.project.attribute(row.property, id, Some(row.scenario)) {
            None if attribute_type == AttributeType::Date => None,
            None => Some(String::new()),
            Some(value) => Some(value.format_with(&self.format.time_format)),
        }
    }

    fn calculated_cell(&self, row: &Row, definition: &ColumnDefinition) -> Result<Cell, ReportError> {
        let builtin = builtin_column(&definition.id);
        let mut cell = self.new_cell(row);

        if self.scenarios.len() > 1
            && !builtin.is_some_and(|b| b.scenario_specific)
            && !self.span_scenarios(&mut cell, row, None)
        {
            return Ok(cell);
        }
        self.set_layout(&mut cell, row, &definition.id, None);

        let scope = row.scope_row.map(|r| self.table.rows[r].property);
        if definition
            .hide_cell_text
            .as_ref()
            .is_some_and(|expr: &Expression| expr.eval(self.project, row.property, scope))
        {
            return Ok(cell);
        }

        let request = self.request(row, &definition.id);
        let result = self.query.evaluate(&request);
        if !result.ok {
            return Err(ReportError::Evaluation(result.error_message.unwrap_or_else(|| {
                format!("Cannot compute column '{}'", definition.id)
            })));
        }
        cell.text = result.display_text;
        match definition.id.as_str() {
            "line" => cell.text = row.line_no.to_string(),
            "no" => cell.text = row.no.map(|n| n.to_string()).unwrap_or_default(),
            "wbs" if row.scope_row.is_some() => cell.indent = 2,
            _ => {}
        }

        if let Some(template) = &definition.cell_text {
            cell.text = expand_macros(template, &cell.text, self.query.as_ref(), &request)?;
        }
        self.set_url(&mut cell, definition, &request)?;
        Ok(cell)
    }

    fn set_url(
        &self,
        cell: &mut Cell,
        definition: &ColumnDefinition,
        request: &QueryRequest<'_>,
    ) -> Result<(), ReportError> {
        if let Some(template) = &definition.cell_url {
            let url = expand_macros(template, &cell.text, self.query.as_ref(), request)?;
            if !url.is_empty() {
                cell.url = Some(url);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::CellContent;
    use crate::property_list::SortLevel;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn at(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    /// p (container), p.1 Jan 1 - 5, p.2 Jan 10 - 15; dev works on p.1,
    /// qa on p.2
    fn project() -> Project {
        let mut project = Project::new("prj", "Project", at(1, 1), at(3, 1));
        let p = project.add_task("p", "P", None).unwrap();
        let p1 = project.add_task("p.1", "First", Some(p)).unwrap();
        let p2 = project.add_task("p.2", "Second", Some(p)).unwrap();
        for (id, start, end) in [(p, 1, 15), (p1, 1, 5), (p2, 10, 15)] {
            project.set_in(id, "start", 0, Value::Date(at(1, start))).unwrap();
            project.set_in(id, "end", 0, Value::Date(at(1, end))).unwrap();
        }
        let dev = project.add_resource("dev", "Dev", None).unwrap();
        let qa = project.add_resource("qa", "QA", None).unwrap();
        project.book(0, p1, dev, Interval::new(at(1, 2), at(1, 3))).unwrap();
        project.book(0, p2, qa, Interval::new(at(1, 13), at(1, 14))).unwrap();
        project
    }

    fn task_rows(project: &Project, config: &ReportConfig) -> Result<Table, ReportError> {
        let mut builder = TableBuilder::new(project, config)?;
        let all = PropertyList::new(project, PropertyKind::Task);
        let tasks = builder.filter_tasks(&all, None)?;
        let tasks = builder.sort(tasks)?;
        let resources = PropertyList::new(project, PropertyKind::Resource);
        builder.generate_task_rows(&tasks, config.nested.then_some(&resources), None)?;
        builder.finish()
    }

    fn names(project: &Project, table: &Table) -> Vec<String> {
        table
            .rows
            .iter()
            .map(|r| project.property(r.property).id().to_string())
            .collect()
    }

    #[test]
    fn phases_are_enforced() {
        let project = project();
        let config = ReportConfig::tasks("r").columns(["name"]);
        let mut builder = TableBuilder::new(&project, &config).unwrap();
        let all = PropertyList::new(&project, PropertyKind::Task);
        assert!(matches!(builder.sort(all.clone()), Err(ReportError::Usage(_))));
        assert!(matches!(
            builder.generate_task_rows(&all, None, None),
            Err(ReportError::Usage(_))
        ));

        let tasks = builder.filter_tasks(&all, None).unwrap();
        let tasks = builder.sort(tasks).unwrap();
        builder.generate_task_rows(&tasks, None, None).unwrap();
        assert!(matches!(builder.filter_tasks(&all, None), Err(ReportError::Usage(_))));
        builder.finish().unwrap();
        assert_eq!(builder.phase(), Phase::Rendered);
        assert!(builder.finish().is_err());
    }

    #[test]
    fn unknown_roots_and_scenarios_are_rejected() {
        let project = project();
        let config = ReportConfig::tasks("r").task_root("nope");
        assert!(matches!(
            TableBuilder::new(&project, &config),
            Err(ReportError::Usage(_))
        ));
        let config = ReportConfig::tasks("r").scenario("delayed");
        assert!(matches!(
            TableBuilder::new(&project, &config),
            Err(ReportError::Model(_))
        ));
    }

    #[test]
    fn invalid_time_format_is_a_usage_error() {
        let project = project();
        let mut config = ReportConfig::tasks("r").columns(["name", "start"]);
        config.time_format = "%Q".into();
        match TableBuilder::new(&project, &config) {
            Err(ReportError::Usage(message)) => assert!(message.contains("'%Q'")),
            _ => panic!("expected a usage error"),
        };
    }

    #[test]
    fn standard_cells_and_headers() {
        let project = project();
        let config = ReportConfig::tasks("r")
            .columns(["name", "start", "note"])
            .column(ColumnDefinition::new("end").title("Finish"))
            .task_root("p");
        let table = task_rows(&project, &config).unwrap();

        let titles: Vec<_> = table.columns.iter().map(|c| c.upper.text.as_str()).collect();
        assert_eq!(titles, ["Name", "Start", "Note", "Finish"]);
        assert_eq!(table.columns[0].upper.rows, 2);
        assert!(table.columns[0].lower.hidden);

        assert_eq!(table.row_texts(0), ["First", "2025-01-01", "", "2025-01-05"]);
        let name = &table.rows[0].cells[0];
        assert_eq!(name.alignment, crate::table::Alignment::Left);
        assert_eq!(name.category.as_deref(), Some("taskcell2"));
        assert!(!name.bold);
        assert_eq!(table.rows[0].cells[1].alignment, crate::table::Alignment::Left);
    }

    #[test]
    fn missing_dates_become_error_markers() {
        let mut project = project();
        project.add_task("q", "Undated", None).unwrap();
        let config = ReportConfig::tasks("r").columns(["name", "start", "bogus"]);
        let table = task_rows(&project, &config).unwrap();
        let row = table.rows.iter().find(|r| project.property(r.property).id() == "q").unwrap();
        assert_eq!(row.cells[1].text, ERROR_MARKER);
        assert_eq!(row.cells[1].font_color, Some(ERROR_COLOR));
        assert_eq!(row.cells[2].text, ERROR_MARKER);
    }

    #[test]
    fn tree_indentation_below_root() {
        let project = project();
        let config = ReportConfig::tasks("r").columns(["name"]);
        let table = task_rows(&project, &config).unwrap();
        let indents: Vec<_> = table.rows.iter().map(|r| r.indent).collect();
        assert_eq!(indents, [0, 1, 1]);
        // Containers are bold, the name column follows the indentation
        assert!(table.rows[0].cells[0].bold);
        assert_eq!(table.rows[1].cells[0].indent, 1);

        let config = config.task_root("p");
        let table = task_rows(&project, &config).unwrap();
        let indents: Vec<_> = table.rows.iter().map(|r| r.indent).collect();
        assert_eq!(indents, [0, 0]);
    }

    #[test]
    fn nested_rows_share_line_numbers() {
        let project = project();
        let config = ReportConfig::tasks("r")
            .columns(["name", "no", "line"])
            .nested(true);
        let table = task_rows(&project, &config).unwrap();

        assert_eq!(names(&project, &table), ["p", "dev", "qa", "p.1", "dev", "p.2", "qa"]);
        let lines: Vec<_> = table.rows.iter().map(|r| r.line_no).collect();
        assert_eq!(lines, [1, 2, 3, 4, 5, 6, 7]);
        let numbers: Vec<_> = table.rows.iter().map(|r| r.no).collect();
        assert_eq!(
            numbers,
            [Some(1), None, None, Some(2), None, Some(3), None]
        );
        assert_eq!(table.rows[1].scope_row, Some(0));
        assert_eq!(table.rows[1].indent, 1);
        assert_eq!(table.row_texts(3), ["First", "2", "4"]);
        assert_eq!(table.row_texts(4), ["Dev", "", "5"]);
        let sub_lines: Vec<_> = table.rows.iter().map(|r| r.sub_line_no).collect();
        assert_eq!(sub_lines, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn resource_report_nests_tasks() {
        let project = project();
        let config = ReportConfig::resources("r")
            .columns(["name", "effort"])
            .sort_tasks(vec![SortLevel::new("seqno", true)]);
        let mut builder = TableBuilder::new(&project, &config).unwrap();
        let resources = builder
            .filter_resources(&PropertyList::new(&project, PropertyKind::Resource), None)
            .unwrap();
        let resources = builder.sort(resources).unwrap();
        let tasks = PropertyList::new(&project, PropertyKind::Task);
        builder
            .generate_resource_rows(&resources, Some(&tasks), None)
            .unwrap();
        let table = builder.finish().unwrap();

        assert_eq!(names(&project, &table), ["dev", "p", "p.1", "qa", "p", "p.2"]);
        // Effort of p for dev only
        assert_eq!(table.row_texts(1), ["P", "1.0"]);
        assert_eq!(table.rows[1].cells[1].indent, 1);
    }

    #[test]
    fn multiple_scenarios_span_shared_columns() {
        let mut project = project();
        let delayed = project.add_scenario("delayed", "Delayed");
        let p1 = project.find(PropertyKind::Task, "p.1").unwrap();
        project.set_in(p1, "start", delayed, Value::Date(at(1, 3))).unwrap();
        let config = ReportConfig::tasks("r")
            .columns(["name", "start", "id", "effort"])
            .scenario("plan")
            .scenario("delayed")
            .task_root("p")
            .hide_task(Expression::IsContainer);
        let table = task_rows(&project, &config).unwrap();

        assert_eq!(table.rows.len(), 4);
        let first = &table.rows[0];
        let second = &table.rows[1];
        assert_eq!((first.scenario, second.scenario), (0, delayed));
        assert_eq!(first.line_no, second.line_no);
        // Name is not scenario specific
        assert_eq!(first.cells[0].rows, 2);
        assert_eq!(first.cells[0].font_size, Some(15));
        assert!(second.cells[0].hidden);
        // Start is
        assert_eq!(first.cells[1].text, "2025-01-01");
        assert_eq!(second.cells[1].text, "2025-01-03");
        // Calculated, not scenario specific
        assert_eq!(first.cells[2].rows, 2);
        assert!(second.cells[2].hidden);
        assert!(!second.cells[3].hidden);
    }

    #[test]
    fn calculated_cells_and_templates() {
        let project = project();
        let config = ReportConfig::tasks("r")
            .column(ColumnDefinition::new("effort"))
            .column(ColumnDefinition::new("wbs"))
            .column(ColumnDefinition::new("name").cell_text("${wbs} ${0}").cell_url("/task/${id}"))
            .column(ColumnDefinition::new("cost").hide_cell_text(Expression::IsContainer))
            .task_root("p");
        let table = task_rows(&project, &config).unwrap();
        assert_eq!(table.row_texts(0), ["1.0", "1.1", "1.1 First", "0.00"]);
        assert_eq!(table.rows[0].cells[0].alignment, crate::table::Alignment::Right);
        assert_eq!(table.rows[0].cells[2].url.as_deref(), Some("/task/p.1"));

        let config = ReportConfig::tasks("r").column(ColumnDefinition::new("cost").hide_cell_text(Expression::IsContainer));
        let table = task_rows(&project, &config).unwrap();
        assert_eq!(table.rows[0].cells[0].text, "");
    }

    #[test]
    fn failing_queries_abort() {
        let project = project();
        let config = ReportConfig::tasks("r").columns(["name"]).column(
            ColumnDefinition::new("name").cell_text("${nonexistent}"),
        );
        assert!(matches!(
            task_rows(&project, &config),
            Err(ReportError::Evaluation(_))
        ));
    }

    #[test]
    fn calendar_and_chart_columns() {
        let project = project();
        let config = ReportConfig::tasks("r")
            .period(at(1, 1), at(1, 15))
            .column(ColumnDefinition::new("name"))
            .column(ColumnDefinition::new("daily").content(CellContent::Load))
            .column(ColumnDefinition::new("chart").scale(TimeScale::Daily))
            .task_root("p");
        let table = task_rows(&project, &config).unwrap();

        assert!(table.equi_rows);
        let calendar = table.columns[1].calendar().unwrap();
        assert_eq!(calendar.columns.len(), 14);
        assert_eq!(table.columns[2].upper.special, Some(CellSpecial::Chart(0)));

        let strip = table.rows[0].cells[1].calendar().unwrap();
        assert_eq!(strip.rows.len(), 1);
        assert_eq!(strip.rows[0].cells.len(), 14);
        // dev works on p.1 on Jan 2
        assert_eq!(strip.rows[0].cells[1].text, "1.0");
        assert!(table.rows[0].cells[2].hidden);

        let lines = &table.charts[0].lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].y, 22);
        assert!(!table.legend.is_empty());
    }

    #[test]
    fn report_period_fits_tasks() {
        let project = project();
        let config = ReportConfig::tasks("r").columns(["name"]).task_root("p");
        let mut builder = TableBuilder::new(&project, &config).unwrap();
        let tasks = builder
            .filter_tasks(&PropertyList::new(&project, PropertyKind::Task), None)
            .unwrap();
        builder.adjust_report_period(&tasks).unwrap();
        // Jan 1 - Jan 15, padded by 1.4 days on each side
        let window = builder.window();
        assert_eq!(window.start, at(1, 1) - Duration::hours(33) - Duration::minutes(36));
        assert_eq!(window.end, at(1, 15) + Duration::hours(33) + Duration::minutes(36));
    }

    #[test]
    fn progress_is_reported() {
        let mut project = project();
        for i in 0..25 {
            project.add_task(format!("t{}", i), "T", None).unwrap();
        }
        let seen = RefCell::new(Vec::new());
        let config = ReportConfig::tasks("r").columns(["name"]);
        let mut builder = TableBuilder::new(&project, &config)
            .unwrap()
            .on_progress(|line| seen.borrow_mut().push(line));
        let tasks = builder
            .filter_tasks(&PropertyList::new(&project, PropertyKind::Task), None)
            .unwrap();
        let tasks = builder.sort(tasks).unwrap();
        builder.generate_task_rows(&tasks, None, None).unwrap();
        drop(builder);
        assert_eq!(seen.into_inner(), [0, 10, 20]);
    }
}
