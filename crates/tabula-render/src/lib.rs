//! # tabula-render
//!
//! Output backends for tabula report tables.
//!
//! This crate provides:
//! - HTML rendering with nested calendar tables, legend and footer
//! - CSV rendering with a configurable delimiter
//! - Inline report expansion for rich text (`ReportProtocolHandler`)
//! - The `TableRenderer` trait for custom backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabula_render::{CsvRenderer, HtmlRenderer, TableRenderer};
//!
//! let table = tabula_report::generate(&project, &config)?;
//!
//! let html = HtmlRenderer::new(&project)
//!     .headline("Project overview")
//!     .render(&table)?;
//!
//! let csv = CsvRenderer::new().delimiter(b',').render(&table)?;
//! ```

pub mod csv;
pub mod html;
pub mod protocol;

pub use self::csv::CsvRenderer;
pub use html::{HtmlElement, HtmlNode, HtmlRenderer};
pub use protocol::ReportProtocolHandler;

use tabula_report::{ReportError, Table};
use thiserror::Error;

/// Turns a finished report table into an output format
pub trait TableRenderer {
    type Output;

    fn render(&self, table: &Table) -> Result<Self::Output, RenderError>;
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<quick_xml::Error> for RenderError {
    fn from(e: quick_xml::Error) -> Self {
        RenderError::Format(e.to_string())
    }
}
