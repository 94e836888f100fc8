//! Inline reports in rich text.
//!
//! Rich text can reference a report with a `report` protocol call such as
//! `<-report id="overview"->`. The handler looks the report up in a catalog
//! and expands it into an HTML fragment.

use std::collections::HashMap;
use tabula_core::Project;
use tabula_report::ReportCatalog;
use tracing::debug;

use crate::html::HtmlRenderer;
use crate::{RenderError, TableRenderer};

/// Expands `report` protocol calls into HTML
pub struct ReportProtocolHandler<'a> {
    project: &'a Project,
    catalog: &'a ReportCatalog,
}

impl<'a> ReportProtocolHandler<'a> {
    /// Name of the protocol
    pub const PROTOCOL: &'static str = "report";

    pub fn new(project: &'a Project, catalog: &'a ReportCatalog) -> Self {
        Self { project, catalog }
    }

    /// Render the report named by the `id` argument.
    ///
    /// Inline reports carry the headline and caption of their configuration
    /// but no footer.
    pub fn to_html(&self, args: &HashMap<String, String>) -> Result<String, RenderError> {
        let id = args.get("id").map(String::as_str).unwrap_or_default();
        let config = self.catalog.lookup(id)?;
        debug!(report = %id, "expanding inline report");
        let table = self.catalog.generate(self.project, id)?;

        let mut renderer = HtmlRenderer::new(self.project).footer(false);
        renderer.headline = config.headline.clone();
        renderer.caption = config.caption.clone();
        renderer.render(&table)
    }
}
