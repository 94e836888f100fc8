//! tabula CLI - Tabular Report Generation
//!
//! Command-line interface for generating HTML and CSV reports from
//! project files.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tabula_core::Project;
use tabula_render::{CsvRenderer, HtmlRenderer, TableRenderer};
use tabula_report::{ReportCatalog, ReportConfig, BUILTIN_COLUMNS};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about = "Tabular report generation", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Html,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report
    Report {
        /// Project file (JSON)
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Report definitions (TOML), a single report or `[[report]]` tables
        #[arg(short, long, value_name = "CONFIG")]
        report: PathBuf,

        /// Report to generate when the definitions hold more than one
        #[arg(long)]
        id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,

        /// Field delimiter of CSV output
        #[arg(long, default_value_t = ';')]
        delimiter: char,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in columns
    Columns,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    match cli.command {
        Commands::Report {
            project,
            report,
            id,
            format,
            delimiter,
            output,
        } => cmd_report(&project, &report, id.as_deref(), format, delimiter, output.as_deref()),
        Commands::Columns => {
            cmd_columns();
            Ok(())
        }
    }
}

fn cmd_report(
    project_path: &Path,
    report_path: &Path,
    id: Option<&str>,
    format: OutputFormat,
    delimiter: char,
    output: Option<&Path>,
) -> Result<()> {
    let project = load_project(project_path)?;
    let catalog = load_catalog(report_path)?;

    // A single report needs no id
    let id = match (id, catalog.len()) {
        (Some(id), _) => id.to_string(),
        (None, 1) => catalog.ids().next().unwrap_or_default().to_string(),
        (None, _) => String::new(),
    };
    let config = catalog.lookup(&id)?;
    let table = catalog.generate(&project, &id)?;
    info!(report = %id, rows = table.rows.len(), "report generated");

    let rendered = match format {
        OutputFormat::Html => {
            let mut renderer = HtmlRenderer::new(&project).standalone(output.is_some());
            renderer.headline = config.headline.clone();
            renderer.caption = config.caption.clone();
            renderer.render(&table)?
        }
        OutputFormat::Csv => {
            if !delimiter.is_ascii() {
                bail!("CSV delimiter must be an ASCII character, got '{}'", delimiter);
            }
            CsvRenderer::new().delimiter(delimiter as u8).render(&table)?
        }
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report '{}' written to {}", id, path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn load_project(path: &Path) -> Result<Project> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    let project: Project = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse project {}", path.display()))?;
    project
        .validate()
        .with_context(|| format!("Invalid project {}", path.display()))?;
    debug!(project = %project.id, scenarios = project.scenarios().len(), "project loaded");
    Ok(project)
}

fn load_catalog(path: &Path) -> Result<ReportCatalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report definitions {}", path.display()))?;
    let catalog: ReportCatalog = toml::from_str(&text)
        .with_context(|| format!("Failed to parse report definitions {}", path.display()))?;
    if !catalog.is_empty() {
        return Ok(catalog);
    }

    let mut config: ReportConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse report definition {}", path.display()))?;
    if config.id.is_empty() {
        config.id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".into());
    }
    Ok([config].into_iter().collect())
}

fn cmd_columns() {
    println!("{:<10} {:<12} {:<11} {}", "ID", "TITLE", "CALCULATED", "PER SCENARIO");
    for column in &BUILTIN_COLUMNS {
        println!(
            "{:<10} {:<12} {:<11} {}",
            column.id,
            column.title,
            if column.calculated { "yes" } else { "no" },
            if column.scenario_specific { "yes" } else { "no" }
        );
    }
    println!("{:<10} {:<12} {:<11} no", "chart", "", "no");
    for scale in tabula_core::TimeScale::ALL {
        println!("{:<10} {:<12} {:<11} yes", scale.as_str(), "", "yes");
    }
}
