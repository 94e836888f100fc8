//! Property list filtering.
//!
//! Filtering runs four passes over a list, each removing properties while
//! leaving the relative order of the survivors untouched:
//!
//! 1. root scoping
//! 2. cross reference against the enclosing property of the other kind
//! 3. report window overlap (tasks only)
//! 4. user hide and rollup predicates
//!
//! In tree mode the ancestors of all survivors are put back afterwards so
//! that the tree can still be drawn.

use std::collections::HashMap;

use chrono::Duration;
use tabula_core::{Interval, Predicate, Project, PropertyId, PropertyKind, Reportable, ScenarioIdx};
use tracing::debug;

use crate::property_list::PropertyList;

/// What to filter for
#[derive(Clone, Copy, Default)]
pub struct FilterSpec<'p> {
    /// Keep only strict descendants of this property. The root itself is
    /// never listed, not even when tree mode reinstates ancestors.
    pub root: Option<PropertyId>,
    /// Enclosing property of the other kind for nested lists
    pub counterpart: Option<PropertyId>,
    /// Remove properties matching this predicate
    pub hide: Option<&'p dyn Predicate>,
    /// Remove descendants of properties matching this predicate
    pub rollup: Option<&'p dyn Predicate>,
}

/// Strict ancestors of every list member, nearest first
#[derive(Debug, Default)]
pub struct AncestorIndex {
    paths: HashMap<PropertyId, Vec<PropertyId>>,
}

impl AncestorIndex {
    pub fn build(project: &Project, list: &PropertyList<'_>) -> Self {
        let paths = list
            .iter()
            .map(|id| (id, project.ancestors(id)))
            .collect();
        Self { paths }
    }

    pub fn ancestors(&self, id: PropertyId) -> &[PropertyId] {
        self.paths.get(&id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Applies the filter passes for one report
pub struct FilterEngine<'a> {
    project: &'a Project,
    scenarios: &'a [ScenarioIdx],
    window: Interval,
}

impl<'a> FilterEngine<'a> {
    pub fn new(project: &'a Project, scenarios: &'a [ScenarioIdx], window: Interval) -> Self {
        Self {
            project,
            scenarios,
            window,
        }
    }

    /// Filter `list` and return the survivors in list order
    pub fn filter<'p>(&self, list: &PropertyList<'p>, spec: &FilterSpec<'_>) -> PropertyList<'p> {
        let index = AncestorIndex::build(self.project, list);
        let mut result = list.clone();
        let before = result.len();

        if let Some(root) = spec.root {
            result.retain(|id| index.ancestors(*id).contains(&root));
        }
        let scoped = result.len();

        if let Some(counterpart) = spec.counterpart {
            result.retain(|id| self.matches_counterpart(*id, counterpart));
        }
        let crossed = result.len();

        if result.kind() == PropertyKind::Task {
            result.retain(|id| self.overlaps_window(*id));
        }
        let in_window = result.len();

        if let Some(hide) = spec.hide {
            result.retain(|id| !hide.eval(self.project, *id, spec.counterpart));
        }
        if let Some(rollup) = spec.rollup {
            let mut rolled_up: HashMap<PropertyId, bool> = HashMap::new();
            result.retain(|id| {
                !index.ancestors(*id).iter().any(|ancestor| {
                    *rolled_up
                        .entry(*ancestor)
                        .or_insert_with(|| rollup.eval(self.project, *ancestor, spec.counterpart))
                })
            });
        }

        if result.tree_mode() {
            let mut missing = Vec::new();
            for id in result.iter() {
                for ancestor in index.ancestors(id) {
                    if Some(*ancestor) == spec.root {
                        break;
                    }
                    if !result.contains(*ancestor) && !missing.contains(ancestor) {
                        missing.push(*ancestor);
                    }
                }
            }
            result.append(missing);
            result.sort();
        }

        debug!(
            kind = %result.kind(),
            before,
            scoped,
            crossed,
            in_window,
            after = result.len(),
            "filtered property list"
        );
        result
    }

    fn matches_counterpart(&self, id: PropertyId, counterpart: PropertyId) -> bool {
        match self.project.kind(id) {
            PropertyKind::Task => self
                .scenarios
                .iter()
                .any(|s| self.project.is_assigned(id, counterpart, *s)),
            PropertyKind::Resource => self
                .scenarios
                .iter()
                .any(|s| self.project.is_allocated(id, *s, &self.window, counterpart)),
        }
    }

    fn overlaps_window(&self, id: PropertyId) -> bool {
        let property = self.project.property(id);
        let fallback = self.project.interval();
        self.scenarios.iter().any(|scenario| {
            let Some(mut interval) = property.effective_interval(*scenario, &fallback) else {
                return true;
            };
            // Milestones at the very end of the window belong to it
            if interval.start == interval.end && interval.end == self.window.end {
                interval.start = interval.end - Duration::seconds(1);
            }
            interval.overlaps(&self.window)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property_list::SortLevel;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use tabula_core::{Expression, Value};

    fn at(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    struct Fixture {
        project: Project,
        dev: PropertyId,
    }

    /// p
    /// +- p.1   Jan 1 - 5, booked for dev
    /// |  +- p.1.a   Jan 2 - 3
    /// +- p.2   Jan 10 - 15
    /// q        milestone at Jan 20
    fn fixture() -> Fixture {
        let mut project = Project::new("prj", "Project", at(1), at(31));
        let p = project.add_task("p", "P", None).unwrap();
        let p1 = project.add_task("p.1", "P1", Some(p)).unwrap();
        let p1a = project.add_task("p.1.a", "P1a", Some(p1)).unwrap();
        let p2 = project.add_task("p.2", "P2", Some(p)).unwrap();
        let q = project.add_task("q", "Q", None).unwrap();
        let dev = project.add_resource("dev", "Dev", None).unwrap();
        project.add_resource("qa", "QA", None).unwrap();
        for (id, start, end) in [(p, 1, 15), (p1, 1, 5), (p1a, 2, 3), (p2, 10, 15), (q, 20, 20)] {
            project.set_in(id, "start", 0, Value::Date(at(start))).unwrap();
            project.set_in(id, "end", 0, Value::Date(at(end))).unwrap();
        }
        project
            .book(0, p1a, dev, Interval::new(at(2), at(3)))
            .unwrap();
        Fixture { project, dev }
    }

    fn ids(list: &PropertyList<'_>) -> Vec<String> {
        list.iter()
            .map(|id| list.project().property(id).id().to_string())
            .collect()
    }

    fn task(fx: &Fixture, id: &str) -> PropertyId {
        fx.project.find(PropertyKind::Task, id).unwrap()
    }

    #[test]
    fn root_scoping_keeps_strict_descendants() {
        let fx = fixture();
        let scenarios = [0];
        let engine = FilterEngine::new(&fx.project, &scenarios, fx.project.interval());
        let list = PropertyList::new(&fx.project, PropertyKind::Task);
        let spec = FilterSpec {
            root: Some(task(&fx, "p")),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&list, &spec)), ["p.1", "p.1.a", "p.2"]);
    }

    #[test]
    fn window_overlap_and_milestones() {
        let fx = fixture();
        let scenarios = [0];
        let list = PropertyList::new(&fx.project, PropertyKind::Task);

        let engine = FilterEngine::new(&fx.project, &scenarios, Interval::new(at(6), at(20)));
        // q is a milestone exactly at the window end
        assert_eq!(ids(&engine.filter(&list, &FilterSpec::default())), ["p", "p.2", "q"]);

        let engine = FilterEngine::new(&fx.project, &scenarios, Interval::new(at(21), at(25)));
        assert!(engine.filter(&list, &FilterSpec::default()).is_empty());
    }

    #[test]
    fn counterpart_restricts_both_kinds() {
        let fx = fixture();
        let scenarios = [0];
        let engine = FilterEngine::new(&fx.project, &scenarios, fx.project.interval());

        let tasks = PropertyList::new(&fx.project, PropertyKind::Task);
        let spec = FilterSpec {
            counterpart: Some(fx.dev),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&tasks, &spec)), ["p", "p.1", "p.1.a"]);

        let resources = PropertyList::new(&fx.project, PropertyKind::Resource);
        let spec = FilterSpec {
            counterpart: Some(task(&fx, "p.1")),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&resources, &spec)), ["dev"]);
    }

    #[test]
    fn hide_and_rollup_predicates() {
        let fx = fixture();
        let scenarios = [0];
        let engine = FilterEngine::new(&fx.project, &scenarios, fx.project.interval());
        let list = PropertyList::new(&fx.project, PropertyKind::Task);

        let hide = Expression::IsLeaf;
        let spec = FilterSpec {
            hide: Some(&hide),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&list, &spec)), ["p", "p.1"]);

        let rollup = Expression::AttributeEquals {
            attribute: "id".into(),
            value: Value::from("p.1"),
            scenario: None,
        };
        let spec = FilterSpec {
            rollup: Some(&rollup),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&list, &spec)), ["p", "p.1", "p.2", "q"]);
    }

    #[test]
    fn tree_mode_reinstates_ancestors_up_to_root() {
        let fx = fixture();
        let scenarios = [0];
        let engine = FilterEngine::new(&fx.project, &scenarios, fx.project.interval());
        let mut list = PropertyList::new(&fx.project, PropertyKind::Task);
        list.set_sorting(vec![SortLevel::tree()]);

        // Hide everything but the deepest leaf
        let keep = |project: &Project, id: PropertyId, _: Option<PropertyId>| {
            project.property(id).id() != "p.1.a"
        };
        let spec = FilterSpec {
            hide: Some(&keep),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&list, &spec)), ["p", "p.1", "p.1.a"]);

        let spec = FilterSpec {
            root: Some(task(&fx, "p")),
            hide: Some(&keep),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&engine.filter(&list, &spec)), ["p.1", "p.1.a"]);
    }
}
