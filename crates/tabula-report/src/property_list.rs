//! Sortable, tree-aware lists of properties.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tabula_core::{Project, PropertyId, PropertyKind, ScenarioIdx, Value};

/// Pseudo criterion that keeps children below their parents
pub const TREE_CRITERION: &str = "tree";

/// One level of a sort specification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortLevel {
    /// Attribute id, or `tree`
    pub criterion: String,
    #[serde(default = "ascending_default")]
    pub ascending: bool,
    /// Compare the value of this scenario; `None` uses the
    /// scenario-independent value
    #[serde(default)]
    pub scenario: Option<ScenarioIdx>,
}

fn ascending_default() -> bool {
    true
}

impl SortLevel {
    pub fn new(criterion: impl Into<String>, ascending: bool) -> Self {
        Self {
            criterion: criterion.into(),
            ascending,
            scenario: None,
        }
    }

    pub fn tree() -> Self {
        Self::new(TREE_CRITERION, true)
    }

    pub fn in_scenario(mut self, scenario: ScenarioIdx) -> Self {
        self.scenario = Some(scenario);
        self
    }

    fn compare(&self, project: &Project, a: PropertyId, b: PropertyId) -> Ordering {
        let left = project.attribute(a, &self.criterion, self.scenario);
        let right = project.attribute(b, &self.criterion, self.scenario);
        let ordering = compare_optional(left, right);
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// Absent values sort before any present value
fn compare_optional(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b),
    }
}

/// An ordered list of properties of one kind
#[derive(Clone, Debug)]
pub struct PropertyList<'a> {
    project: &'a Project,
    kind: PropertyKind,
    items: Vec<PropertyId>,
    levels: Vec<SortLevel>,
}

impl<'a> PropertyList<'a> {
    /// All properties of `kind`, in declaration order, with the default
    /// `seqno` sorting
    pub fn new(project: &'a Project, kind: PropertyKind) -> Self {
        Self::from_ids(project, kind, project.properties_of(kind).collect())
    }

    pub fn from_ids(project: &'a Project, kind: PropertyKind, items: Vec<PropertyId>) -> Self {
        let mut list = Self {
            project,
            kind,
            items,
            levels: Vec::new(),
        };
        list.reset_sorting();
        list.levels.push(SortLevel::new("seqno", true));
        list
    }

    /// An empty list sharing project, kind and sort specification
    pub fn empty_like(&self) -> Self {
        Self {
            project: self.project,
            kind: self.kind,
            items: Vec::new(),
            levels: self.levels.clone(),
        }
    }

    pub fn project(&self) -> &'a Project {
        self.project
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn levels(&self) -> &[SortLevel] {
        &self.levels
    }

    /// Remove all sort levels
    pub fn reset_sorting(&mut self) {
        self.levels.clear();
    }

    /// Replace the sort specification and sort the list
    pub fn set_sorting(&mut self, levels: Vec<SortLevel>) {
        self.levels = levels;
        self.sort();
    }

    /// True if the first sort level is the tree criterion
    pub fn tree_mode(&self) -> bool {
        self.levels
            .first()
            .is_some_and(|l| l.criterion == TREE_CRITERION)
    }

    /// Stable sort by the current specification
    pub fn sort(&mut self) {
        let project = self.project;
        if self.tree_mode() {
            let siblings = &self.levels[1..];
            self.items
                .sort_by(|a, b| compare_in_tree(project, siblings, *a, *b));
        } else {
            let levels = &self.levels;
            self.items.sort_by(|a, b| compare_levels(project, levels, *a, *b));
        }
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        self.items.contains(&id)
    }

    pub fn push(&mut self, id: PropertyId) {
        self.items.push(id);
    }

    /// Add the properties that are not yet in the list
    pub fn append(&mut self, ids: impl IntoIterator<Item = PropertyId>) {
        for id in ids {
            if !self.contains(id) {
                self.items.push(id);
            }
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&PropertyId) -> bool) {
        self.items.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.items.iter().copied()
    }

    pub fn ids(&self) -> &[PropertyId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn compare_levels(project: &Project, levels: &[SortLevel], a: PropertyId, b: PropertyId) -> Ordering {
    levels
        .iter()
        .map(|level| level.compare(project, a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Pre-order of the property tree. Siblings compare by `levels`, then by
/// `seqno`.
fn compare_in_tree(project: &Project, levels: &[SortLevel], a: PropertyId, b: PropertyId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    // Root-first paths including the properties themselves
    let mut path_a = project.ancestors(a);
    path_a.reverse();
    path_a.push(a);
    let mut path_b = project.ancestors(b);
    path_b.reverse();
    path_b.push(b);

    let common = path_a
        .iter()
        .zip(&path_b)
        .take_while(|(x, y)| x == y)
        .count();
    match (path_a.get(common), path_b.get(common)) {
        // `a` is an ancestor of `b`
        (None, _) => Ordering::Less,
        (_, None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_levels(project, levels, *x, *y)
            .then_with(|| SortLevel::new("seqno", true).compare(project, *x, *y)),
    }
}

impl fmt::Display for PropertyList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.items {
            let name = self
                .project
                .attribute(*id, "name", None)
                .map(|v| v.to_string())
                .unwrap_or_default();
            writeln!(f, "{}: {}", self.project.property(*id).id(), name)?;
        }
        Ok(())
    }
}
