//! Named report configurations and the one-call report pipeline.

use serde::{Deserialize, Serialize};
use tabula_core::{Project, PropertyKind};
use tracing::info;

use crate::builder::TableBuilder;
use crate::config::{ReportConfig, ReportKind};
use crate::error::ReportError;
use crate::property_list::PropertyList;
use crate::table::Table;

/// Generate the table of one report.
///
/// Runs the whole builder pipeline: filter, fit the report period, sort
/// and generate rows, with nested rows of the other kind if the
/// configuration asks for them.
pub fn generate(project: &Project, config: &ReportConfig) -> Result<Table, ReportError> {
    let mut builder = TableBuilder::new(project, config)?;
    let all_tasks = PropertyList::new(project, PropertyKind::Task);
    let all_resources = PropertyList::new(project, PropertyKind::Resource);

    match config.kind {
        ReportKind::Tasks => {
            let tasks = builder.filter_tasks(&all_tasks, None)?;
            builder.adjust_report_period(&tasks)?;
            let tasks = builder.sort(tasks)?;
            let nested = config.nested.then_some(&all_resources);
            builder.generate_task_rows(&tasks, nested, None)?;
        }
        ReportKind::Resources => {
            let resources = builder.filter_resources(&all_resources, None)?;
            let tasks = builder.filter_tasks(&all_tasks, None)?;
            builder.adjust_report_period(&tasks)?;
            let resources = builder.sort(resources)?;
            let nested = config.nested.then_some(&all_tasks);
            builder.generate_resource_rows(&resources, nested, None)?;
        }
    }
    builder.finish()
}

/// A set of report configurations addressed by id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportCatalog {
    #[serde(default, rename = "report")]
    reports: Vec<ReportConfig>,
}

impl ReportCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a report, replacing any report with the same id
    pub fn add(&mut self, config: ReportConfig) {
        match self.reports.iter_mut().find(|r| r.id == config.id) {
            Some(existing) => *existing = config,
            None => self.reports.push(config),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ReportConfig> {
        self.reports.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.reports.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Look up report `id` and generate its table
    pub fn generate(&self, project: &Project, id: &str) -> Result<Table, ReportError> {
        let config = self.lookup(id)?;
        info!(report = %id, project = %project.id, "generating report");
        generate(project, config)
    }

    /// Resolve a report id, rejecting empty and unknown ids
    pub fn lookup(&self, id: &str) -> Result<&ReportConfig, ReportError> {
        if id.is_empty() {
            return Err(ReportError::Usage(
                "Argument 'id' missing to specify the report to be used.".into(),
            ));
        }
        self.get(id)
            .ok_or_else(|| ReportError::Usage(format!("Unknown report {}", id)))
    }
}

impl FromIterator<ReportConfig> for ReportCatalog {
    fn from_iter<I: IntoIterator<Item = ReportConfig>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for config in iter {
            catalog.add(config);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_replaces_by_id() {
        let mut catalog = ReportCatalog::new();
        catalog.add(ReportConfig::tasks("a").columns(["name"]));
        catalog.add(ReportConfig::resources("b"));
        catalog.add(ReportConfig::tasks("a").columns(["name", "start"]));

        assert_eq!(catalog.ids().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(catalog.get("a").map(|r| r.columns.len()), Some(2));
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn lookup_errors() {
        let catalog: ReportCatalog = [ReportConfig::tasks("a")].into_iter().collect();
        let err = catalog.lookup("").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Usage error: Argument 'id' missing to specify the report to be used."
        );
        let err = catalog.lookup("nope").unwrap_err();
        assert_eq!(err.to_string(), "Usage error: Unknown report nope");
    }

    #[test]
    fn parse_catalog_from_toml() {
        let catalog: ReportCatalog = toml::from_str(
            r#"
            [[report]]
            id = "tasks"
            columns = [{ id = "name" }, { id = "effort" }]

            [[report]]
            id = "staff"
            kind = "resources"
            nested = true
            "#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("staff").map(|r| r.kind), Some(ReportKind::Resources));
    }
}
