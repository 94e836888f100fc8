//! Column definitions and the built-in column table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabula_core::{AttributeType, Expression, Project, TimeScale};

use crate::table::Alignment;

/// A column with fixed semantics, known without a project schema
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuiltinColumn {
    pub id: &'static str,
    pub title: &'static str,
    /// Cells follow the row indentation
    pub indent: bool,
    pub alignment: Alignment,
    /// Values come from the query evaluator instead of a plain attribute
    pub calculated: bool,
    pub scenario_specific: bool,
}

const fn builtin(
    id: &'static str,
    title: &'static str,
    indent: bool,
    alignment: Alignment,
    calculated: bool,
    scenario_specific: bool,
) -> BuiltinColumn {
    BuiltinColumn {
        id,
        title,
        indent,
        alignment,
        calculated,
        scenario_specific,
    }
}

/// Built-in columns, sorted by id
pub const BUILTIN_COLUMNS: [BuiltinColumn; 11] = [
    builtin("complete", "Completion", false, Alignment::Right, true, true),
    builtin("cost", "Cost", true, Alignment::Right, true, true),
    builtin("duration", "Duration", true, Alignment::Right, true, true),
    builtin("effort", "Effort", true, Alignment::Right, true, true),
    builtin("id", "Id", false, Alignment::Left, true, false),
    builtin("line", "Line No.", false, Alignment::Right, true, false),
    builtin("name", "Name", true, Alignment::Left, false, false),
    builtin("no", "No.", false, Alignment::Right, true, false),
    builtin("rate", "Rate", true, Alignment::Right, true, true),
    builtin("revenue", "Revenue", true, Alignment::Right, true, true),
    builtin("wbs", "WBS", false, Alignment::Left, true, false),
];

pub fn builtin_column(id: &str) -> Option<&'static BuiltinColumn> {
    BUILTIN_COLUMNS.iter().find(|c| c.id == id)
}

/// Indentation and alignment of a column that is not built in, by the
/// type of the attribute it shows
pub fn type_layout(attribute_type: Option<AttributeType>) -> (bool, Alignment) {
    match attribute_type {
        Some(AttributeType::Date | AttributeType::String | AttributeType::RichText) => {
            (false, Alignment::Left)
        }
        Some(AttributeType::Int | AttributeType::Float | AttributeType::Money) => {
            (false, Alignment::Right)
        }
        None => (false, Alignment::Center),
    }
}

/// Title used when a column definition has none.
///
/// Calendar and chart columns have no fixed title. Built-in columns use
/// their own title, other columns the attribute name from the task or
/// resource schema.
pub fn default_column_title(project: &Project, id: &str) -> String {
    if id == "chart" || TimeScale::from_column_id(id).is_some() {
        return String::new();
    }
    if let Some(column) = builtin_column(id) {
        return column.title.to_string();
    }
    project
        .attribute_name(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

/// What calendar cells show besides their colour
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellContent {
    Empty,
    #[default]
    Load,
}

/// User specification of one report column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Scale of chart columns
    #[serde(default)]
    pub scale: Option<TimeScale>,
    /// Maximum width in pixels for chart and calendar columns
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default)]
    pub content: CellContent,
    /// Template for the cell text, see [`expand_macros`](crate::expand_macros)
    #[serde(default)]
    pub cell_text: Option<String>,
    /// Template for the cell link target
    #[serde(default)]
    pub cell_url: Option<String>,
    /// Cells for which this predicate holds stay empty
    #[serde(default)]
    pub hide_cell_text: Option<Expression>,
}

fn default_width() -> u32 {
    450
}

impl ColumnDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            scale: None,
            width: default_width(),
            content: CellContent::default(),
            cell_text: None,
            cell_url: None,
            hide_cell_text: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn scale(mut self, scale: TimeScale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn content(mut self, content: CellContent) -> Self {
        self.content = content;
        self
    }

    pub fn cell_text(mut self, template: impl Into<String>) -> Self {
        self.cell_text = Some(template.into());
        self
    }

    pub fn cell_url(mut self, template: impl Into<String>) -> Self {
        self.cell_url = Some(template.into());
        self
    }

    pub fn hide_cell_text(mut self, predicate: Expression) -> Self {
        self.hide_cell_text = Some(predicate);
        self
    }

    /// Title shown in the header
    pub fn header_title(&self, project: &Project) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| default_column_title(project, &self.id))
    }

    pub fn is_calculated(&self) -> bool {
        builtin_column(&self.id).is_some_and(|c| c.calculated)
    }
}

/// Per-column state set up with the header and consulted for every row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnContext {
    /// Index into [`Table::charts`](crate::Table::charts)
    Chart { chart: usize },
    /// Calendar with its aligned start time
    Calendar { scale: TimeScale, start: NaiveDateTime },
    Calculated,
    Standard,
}
