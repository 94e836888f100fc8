//! Output independent table representation.
//!
//! A [`Table`] is built once per report run and then handed to a renderer.
//! Calendar columns embed a complete sub-table: the header cell of the
//! column holds the sub-column headers and every body cell holds a one-row
//! table with the per-interval cells.

use chrono::NaiveDateTime;
use tabula_core::{PropertyId, ScenarioIdx, TimeScale};

/// Default height of a table row in pixels
pub const DEFAULT_ROW_HEIGHT: u32 = 21;

/// Horizontal alignment of cell content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Non-text content attached to a cell
#[derive(Clone, Debug, PartialEq)]
pub enum CellSpecial {
    /// Header of a chart column; indexes [`Table::charts`]
    Chart(usize),
    /// Embedded calendar table
    Calendar(Table),
}

// ============================================================================
// Cell
// ============================================================================

/// One table cell
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub text: String,
    /// Hidden cells are covered by a spanning neighbour
    pub hidden: bool,
    pub indent: usize,
    pub alignment: Alignment,
    /// Style class, mostly the background colour
    pub category: Option<String>,
    /// Column span
    pub columns: usize,
    /// Row span
    pub rows: usize,
    pub url: Option<String>,
    pub special: Option<CellSpecial>,
    pub bold: bool,
    pub font_size: Option<u32>,
    pub font_color: Option<u32>,
    pub width: Option<u32>,
    /// Start of the interval for calendar header cells
    pub data: Option<NaiveDateTime>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            text: String::new(),
            hidden: false,
            indent: 0,
            alignment: Alignment::default(),
            category: None,
            columns: 1,
            rows: 1,
            url: None,
            special: None,
            bold: false,
            font_size: None,
            font_color: None,
            width: None,
            data: None,
        }
    }
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// True if both cells would look identical apart from their spans
    pub fn same_content(&self, other: &Cell) -> bool {
        self.text == other.text
            && self.category == other.category
            && self.bold == other.bold
            && self.alignment == other.alignment
            && self.font_color == other.font_color
            && self.url == other.url
            && self.special.is_none()
            && other.special.is_none()
    }

    /// The embedded calendar table, if any
    pub fn calendar(&self) -> Option<&Table> {
        match &self.special {
            Some(CellSpecial::Calendar(table)) => Some(table),
            _ => None,
        }
    }
}

// ============================================================================
// Column, Row
// ============================================================================

/// A table column with its two header cells
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Column {
    /// Id of the column definition
    pub id: String,
    pub upper: Cell,
    pub lower: Cell,
    /// Content may be wider than the column
    pub scrollbar: bool,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            upper: Cell::new(title),
            lower: Cell::default(),
            scrollbar: false,
        }
    }

    /// The embedded calendar header table, if any
    pub fn calendar(&self) -> Option<&Table> {
        self.upper.calendar()
    }
}

/// One table row, reporting one property in one scenario
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub property: PropertyId,
    /// Index of the enclosing row for nested rows
    pub scope_row: Option<usize>,
    pub scenario: ScenarioIdx,
    pub indent: usize,
    /// Primary number; absent for nested rows
    pub no: Option<usize>,
    /// Running line number, shared by all scenario rows of a property
    pub line_no: usize,
    /// 1-based position of the row in the table
    pub sub_line_no: usize,
    pub height: u32,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(property: PropertyId, scenario: ScenarioIdx) -> Self {
        Self {
            property,
            scope_row: None,
            scenario,
            indent: 0,
            no: None,
            line_no: 0,
            sub_line_no: 0,
            height: DEFAULT_ROW_HEIGHT,
            cells: Vec::new(),
        }
    }
}

// ============================================================================
// Legend and charts
// ============================================================================

/// An entry of the legend below the table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendItem {
    pub label: String,
    pub category: String,
}

/// Explanation of the calendar cell colours used in a table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Legend {
    pub calendar_items: Vec<LegendItem>,
}

impl Legend {
    /// Register a calendar colour; repeated registrations are ignored
    pub fn add_calendar_item(&mut self, label: &str, category: &str) {
        if !self.calendar_items.iter().any(|i| i.category == category) {
            self.calendar_items.push(LegendItem {
                label: label.to_string(),
                category: category.to_string(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calendar_items.is_empty()
    }
}

/// Placement of one property bar in a chart column
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartLine {
    pub property: PropertyId,
    pub scope: Option<PropertyId>,
    pub scenario: ScenarioIdx,
    /// Vertical offset from the top of the chart body
    pub y: u32,
    pub height: u32,
}

/// Layout data of a chart column. Drawing is left to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub column: usize,
    pub scale: TimeScale,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub width: u32,
    pub header_height: u32,
    pub lines: Vec<ChartLine>,
}

// ============================================================================
// Table
// ============================================================================

/// The abstract report table
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// All rows must have the same height (chart and calendar columns)
    pub equi_rows: bool,
    pub legend: Legend,
    pub charts: Vec<Chart>,
    pub header_line_height: u32,
    pub max_width: Option<u32>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            header_line_height: 19,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows reporting `property`, in table order
    pub fn rows_for(&self, property: PropertyId) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.property == property)
    }

    /// Visible text of all cells of a row, calendar sub-cells excluded
    pub fn row_texts(&self, row: usize) -> Vec<&str> {
        self.rows
            .get(row)
            .map(|r| r.cells.iter().map(|c| c.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_ignores_duplicates() {
        let mut legend = Legend::default();
        legend.add_calendar_item("Task", "caltask1");
        legend.add_calendar_item("Task", "caltask1");
        legend.add_calendar_item("Off duty time", "offduty");
        assert_eq!(legend.calendar_items.len(), 2);
    }

    #[test]
    fn content_comparison_ignores_spans() {
        let a = Cell::new("").category("offduty1");
        let mut b = a.clone();
        b.columns = 4;
        assert!(a.same_content(&b));
        assert!(!a.same_content(&Cell::new("").category("caltask1")));
    }
}
