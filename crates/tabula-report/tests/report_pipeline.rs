//! End-to-end tests of the report pipeline
//!
//! These tests drive complete reports from a small project through
//! filtering, sorting and row generation.

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use tabula_core::{Expression, Interval, Project, PropertyKind, Value};
use tabula_report::{
    generate, ColumnDefinition, PropertyList, ReportCatalog, ReportConfig, ReportError, SortLevel,
    Table, TableBuilder,
};

fn at(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// P with P.1 (Jan 1 - 5) and P.2 (Jan 10 - 15), two developers in a team
fn project() -> Project {
    let mut project = Project::new("acso", "Accounting Software", at(1, 1), at(6, 30));
    let p = project.add_task("P", "Project", None).unwrap();
    let p1 = project.add_task("P.1", "Specification", Some(p)).unwrap();
    let p2 = project.add_task("P.2", "Implementation", Some(p)).unwrap();
    for (task, start, end) in [(p, 1, 15), (p1, 1, 5), (p2, 10, 15)] {
        project.set_in(task, "start", 0, Value::Date(at(1, start))).unwrap();
        project.set_in(task, "end", 0, Value::Date(at(1, end))).unwrap();
    }

    let team = project.add_resource("team", "Team", None).unwrap();
    let ana = project.add_resource("ana", "Ana", Some(team)).unwrap();
    let bo = project.add_resource("bo", "Bo", Some(team)).unwrap();
    project.book(0, p1, ana, Interval::new(at(1, 2), at(1, 4))).unwrap();
    project.book(0, p2, bo, Interval::new(at(1, 13), at(1, 15))).unwrap();
    project.book(0, p2, ana, Interval::new(at(1, 14), at(1, 15))).unwrap();
    project
}

fn row_ids(project: &Project, table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|r| project.property(r.property).id().to_string())
        .collect()
}

// =============================================================================
// Task reports
// =============================================================================

#[test]
fn children_of_root_with_their_dates() {
    let project = project();
    let config = ReportConfig::tasks("overview")
        .columns(["name", "start", "end"])
        .task_root("P")
        .period(at(1, 1), at(1, 15));
    let table = generate(&project, &config).unwrap();

    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.row_texts(0), ["Specification", "2025-01-01", "2025-01-05"]);
    assert_eq!(table.row_texts(1), ["Implementation", "2025-01-10", "2025-01-15"]);
}

#[test]
fn window_after_all_tasks_yields_no_rows() {
    let project = project();
    let config = ReportConfig::tasks("overview")
        .columns(["name", "start", "end"])
        .task_root("P")
        .period(at(1, 20), at(1, 25));
    let table = generate(&project, &config).unwrap();

    assert!(table.is_empty());
    // The header is still there
    assert_eq!(table.columns.len(), 3);
}

#[test]
fn milestone_at_window_end_is_reported() {
    let mut project = project();
    let m = project.add_task("M", "Release", None).unwrap();
    project.set_in(m, "start", 0, Value::Date(at(1, 15))).unwrap();
    project.set_in(m, "end", 0, Value::Date(at(1, 15))).unwrap();

    let config = ReportConfig::tasks("overview")
        .columns(["name"])
        .period(at(1, 1), at(1, 15));
    let table = generate(&project, &config).unwrap();
    assert_eq!(row_ids(&project, &table), ["P", "P.1", "P.2", "M"]);
}

#[test]
fn descending_sort_inside_tree() {
    let project = project();
    let config = ReportConfig::tasks("overview")
        .columns(["name"])
        .sort_tasks(vec![SortLevel::tree(), SortLevel::new("name", false)]);
    let table = generate(&project, &config).unwrap();
    assert_eq!(row_ids(&project, &table), ["P", "P.1", "P.2"]);

    let config = config.sort_tasks(vec![SortLevel::tree(), SortLevel::new("start", false).in_scenario(0)]);
    let table = generate(&project, &config).unwrap();
    assert_eq!(row_ids(&project, &table), ["P", "P.2", "P.1"]);
}

#[test]
fn rollup_hides_sub_tasks() {
    let project = project();
    let config = ReportConfig::tasks("overview")
        .columns(["name", "effort"])
        .rollup_task(Expression::IsContainer);
    let table = generate(&project, &config).unwrap();
    assert_eq!(row_ids(&project, &table), ["P"]);
    // Jan 2 and 3 for ana, Jan 13 and 14 for bo, Jan 14 for ana
    assert_eq!(table.row_texts(0), ["Project", "5.0"]);
}

// =============================================================================
// Nested reports
// =============================================================================

#[test]
fn tasks_with_nested_resources() {
    let project = project();
    let config = ReportConfig::tasks("assignments")
        .columns(["name", "no", "line", "effort"])
        .task_root("P")
        .nested(true)
        .period(at(1, 1), at(1, 31));
    let table = generate(&project, &config).unwrap();

    assert_eq!(
        row_ids(&project, &table),
        ["P.1", "team", "ana", "P.2", "team", "ana", "bo"]
    );
    assert_eq!(table.row_texts(0), ["Specification", "1", "1", "2.0"]);
    assert_eq!(table.row_texts(1), ["Team", "", "2", "2.0"]);
    assert_eq!(table.row_texts(3), ["Implementation", "2", "4", "3.0"]);
    assert_eq!(table.row_texts(6), ["Bo", "", "7", "2.0"]);
    let indents: Vec<_> = table.rows.iter().map(|r| r.indent).collect();
    assert_eq!(indents, [0, 1, 2, 0, 1, 2, 2]);
}

#[test]
fn line_numbers_continue_through_scoped_generation() {
    let project = project();
    let config = ReportConfig::resources("staff")
        .columns(["name", "line"])
        .resource_root("team")
        .period(at(1, 1), at(1, 31));
    let mut builder = TableBuilder::new(&project, &config).unwrap();

    let resources = builder
        .filter_resources(&PropertyList::new(&project, PropertyKind::Resource), None)
        .unwrap();
    let resources = builder.sort(resources).unwrap();
    let tasks = PropertyList::new(&project, PropertyKind::Task);
    let last = builder
        .generate_resource_rows(&resources, Some(&tasks), None)
        .unwrap();
    // ana: P, P.1, P.2; bo: P, P.2
    assert_eq!(last, 7);

    // A further task level below the first resource row continues from it
    let p1 = project.find(PropertyKind::Task, "P.1").unwrap();
    let below = PropertyList::from_ids(&project, PropertyKind::Task, vec![p1]);
    let last = builder.generate_task_rows(&below, None, Some(1)).unwrap();
    assert_eq!(last, 3);

    let table = builder.finish().unwrap();
    let lines: Vec<_> = table.rows.iter().map(|r| r.line_no).collect();
    assert_eq!(lines, [1, 2, 3, 4, 5, 6, 7, 3]);
    assert_eq!(table.rows[7].scope_row, Some(1));
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_rows_and_shared_cells() {
    let mut project = project();
    let late = project.add_scenario("late", "Delayed");
    for (id, start, end) in [("P.1", 1, 5), ("P.2", 12, 20)] {
        let task = project.find(PropertyKind::Task, id).unwrap();
        project.set_in(task, "start", late, Value::Date(at(1, start))).unwrap();
        project.set_in(task, "end", late, Value::Date(at(1, end))).unwrap();
    }

    let config = ReportConfig::tasks("compare")
        .columns(["name", "start", "end"])
        .scenario("plan")
        .scenario("late")
        .task_root("P")
        .period(at(1, 8), at(1, 31));
    let table = generate(&project, &config).unwrap();

    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].cells[0].rows, 2);
    assert!(table.rows[1].cells[0].hidden);
    assert_eq!(table.row_texts(0)[1..], ["2025-01-10", "2025-01-15"]);
    assert_eq!(table.row_texts(1)[1..], ["2025-01-12", "2025-01-20"]);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn catalog_rejects_bad_ids() {
    let project = project();
    let catalog: ReportCatalog = [ReportConfig::tasks("overview").columns(["name"])]
        .into_iter()
        .collect();

    assert!(matches!(
        catalog.generate(&project, ""),
        Err(ReportError::Usage(m)) if m.contains("'id' missing")
    ));
    assert!(matches!(
        catalog.generate(&project, "budget"),
        Err(ReportError::Usage(m)) if m == "Unknown report budget"
    ));
    assert_eq!(catalog.generate(&project, "overview").unwrap().rows.len(), 3);
}

#[test]
fn unknown_macro_aborts_the_report() {
    let project = project();
    let config = ReportConfig::tasks("overview")
        .column(ColumnDefinition::new("name").cell_text("${budget}"));
    let err = generate(&project, &config).unwrap_err();
    assert!(matches!(err, ReportError::Evaluation(_)));
    assert!(err.to_string().contains("budget"));

    let config = ReportConfig::tasks("overview")
        .column(ColumnDefinition::new("name").cell_text("${0}${?budget}"));
    let table = generate(&project, &config).unwrap();
    assert_eq!(table.row_texts(0), ["Project"]);
}

#[test]
fn invalid_time_format_is_reported() {
    let project = project();
    let mut config = ReportConfig::tasks("overview").columns(["name", "start"]);
    config.time_format = "%Q".into();
    let err = generate(&project, &config).unwrap_err();
    assert!(matches!(err, ReportError::Usage(_)));
    assert!(err.to_string().contains("Invalid time format"));
}
