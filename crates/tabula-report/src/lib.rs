//! # tabula-report
//!
//! Turns a project property tree into an abstract report table.
//!
//! This crate provides:
//! - Ordered property lists with multi-level and tree sorting
//! - Filtering by root, counterpart, report window and user predicates
//! - Row and cell generation with multi-scenario rows and nested reports
//! - Calendar columns with load and working-time colouring
//! - Run-time macros in cell text and URL templates
//! - Report configurations loaded from TOML and a catalog of named reports
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tabula_core::{Project, Value};
//! use tabula_report::{generate, ReportConfig};
//!
//! let at = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let mut project = Project::new("web", "Website", at(1), at(31));
//! let phase = project.add_task("design", "Design", None).unwrap();
//! let task = project.add_task("mockups", "Mockups", Some(phase)).unwrap();
//! project.set_in(task, "start", 0, Value::Date(at(6))).unwrap();
//! project.set_in(task, "end", 0, Value::Date(at(10))).unwrap();
//!
//! let config = ReportConfig::tasks("overview")
//!     .columns(["name", "start", "end"])
//!     .task_root("design");
//! let table = generate(&project, &config).unwrap();
//!
//! assert_eq!(table.row_texts(0), ["Mockups", "2025-01-06", "2025-01-10"]);
//! ```

pub mod builder;
pub mod catalog;
pub mod columns;
pub mod config;
pub mod error;
pub mod filter;
pub mod macros;
pub mod property_list;
pub mod table;
pub mod timescale;

pub use builder::{Phase, TableBuilder, ERROR_COLOR, ERROR_MARKER};
pub use catalog::{generate, ReportCatalog};
pub use columns::{
    builtin_column, default_column_title, BuiltinColumn, CellContent, ColumnContext,
    ColumnDefinition, BUILTIN_COLUMNS,
};
pub use config::{ReportConfig, ReportKind};
pub use error::ReportError;
pub use filter::{AncestorIndex, FilterEngine, FilterSpec};
pub use macros::expand_macros;
pub use property_list::{PropertyList, SortLevel, TREE_CRITERION};
pub use table::{
    Alignment, Cell, CellSpecial, Chart, ChartLine, Column, Legend, LegendItem, Row, Table,
    DEFAULT_ROW_HEIGHT,
};
pub use timescale::{TimeScaleColumnBuilder, CALENDAR_CELL_WIDTH};
