//! CSV table renderer
//!
//! Every table row becomes one record. Calendar columns contribute one
//! field per interval, chart columns none. Hidden cells produce blank
//! fields so that all records line up with the header.

use tabula_report::{Cell, CellSpecial, Column, Table};
use tracing::debug;

use crate::{RenderError, TableRenderer};

/// CSV renderer configuration
#[derive(Clone, Debug)]
pub struct CsvRenderer {
    pub delimiter: u8,
    /// Write the header record
    pub headers: bool,
}

impl Default for CsvRenderer {
    fn default() -> Self {
        Self {
            delimiter: b';',
            headers: true,
        }
    }
}

impl CsvRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }

    /// All records of the table, header first
    pub fn to_records(&self, table: &Table) -> Vec<Vec<String>> {
        let mut records = Vec::with_capacity(table.rows.len() + 1);
        if self.headers {
            let mut header = Vec::new();
            for column in table.columns.iter().filter(|c| !is_chart(c)) {
                match column.calendar() {
                    Some(calendar) => {
                        header.extend(calendar.columns.iter().map(|c| c.lower.text.clone()));
                    }
                    None => header.push(column.upper.text.clone()),
                }
            }
            records.push(header);
        }

        for row in &table.rows {
            let mut record = Vec::new();
            for (cell, column) in row.cells.iter().zip(&table.columns) {
                if is_chart(column) {
                    continue;
                }
                match cell.calendar() {
                    Some(strip) => {
                        let cells = strip.rows.first().map(|r| r.cells.as_slice()).unwrap_or_default();
                        record.extend(cells.iter().map(field));
                    }
                    // A hidden calendar cell still covers all its intervals
                    None if cell.hidden => {
                        let width = column.calendar().map_or(1, |c| c.columns.len());
                        record.extend(std::iter::repeat(String::new()).take(width));
                    }
                    None => record.push(field(cell)),
                }
            }
            records.push(record);
        }
        records
    }
}

fn is_chart(column: &Column) -> bool {
    matches!(column.upper.special, Some(CellSpecial::Chart(_)))
}

fn field(cell: &Cell) -> String {
    if cell.hidden {
        String::new()
    } else {
        cell.text.clone()
    }
}

impl TableRenderer for CsvRenderer {
    type Output = String;

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        debug!(rows = table.rows.len(), delimiter = %char::from(self.delimiter), "rendering CSV");
        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());
        for record in self.to_records(table) {
            writer.write_record(&record)?;
        }
        writer.flush()?;
        let bytes = writer.into_inner().map_err(|e| RenderError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| RenderError::Format(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::PropertyId;
    use tabula_report::Row;

    fn calendar_header(labels: &[&str]) -> Table {
        let mut header = Table::new();
        for label in labels {
            let mut column = Column::new("", "");
            column.lower.text = label.to_string();
            header.columns.push(column);
        }
        header
    }

    fn table() -> Table {
        let mut table = Table::new();
        table.columns.push(Column::new("name", "Name"));
        let mut daily = Column::new("daily", "");
        daily.upper.special = Some(CellSpecial::Calendar(calendar_header(&["1", "2", "3"])));
        table.columns.push(daily);
        table.columns.push(Column::new("effort", "Effort; total"));

        let mut strip = Table::new();
        let mut strip_row = Row::new(PropertyId(0), 0);
        strip_row.cells = vec![Cell::new("1.0"), Cell::default(), Cell::hidden()];
        strip.rows.push(strip_row);

        let mut first = Row::new(PropertyId(0), 0);
        first.cells = vec![
            Cell::new("Spec"),
            Cell {
                special: Some(CellSpecial::Calendar(strip)),
                ..Cell::default()
            },
            Cell::new("1.0"),
        ];
        let mut second = Row::new(PropertyId(0), 1);
        second.cells = vec![Cell::hidden(), Cell::hidden(), Cell::new("2.0")];
        table.rows = vec![first, second];
        table
    }

    #[test]
    fn records_line_up() {
        let records = CsvRenderer::new().to_records(&table());
        assert_eq!(
            records,
            vec![
                vec!["Name", "1", "2", "3", "Effort; total"],
                vec!["Spec", "1.0", "", "", "1.0"],
                vec!["", "", "", "", "2.0"],
            ]
        );
    }

    #[test]
    fn render_quotes_delimiters() {
        let csv = CsvRenderer::new().render(&table()).unwrap();
        let first_line = csv.lines().next().unwrap();
        assert_eq!(first_line, "Name;1;2;3;\"Effort; total\"");

        let csv = CsvRenderer::new().delimiter(b',').headers(false).render(&table()).unwrap();
        assert_eq!(csv, "Spec,1.0,,,1.0\n,,,,2.0\n");
    }
}
