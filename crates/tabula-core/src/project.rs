//! The property tree.
//!
//! Tasks and resources live in one arena owned by [`Project`] and are
//! addressed by [`PropertyId`]. Parent and child links are arena indices,
//! so walking the tree never follows owning pointers.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::attribute::{AttributeSchema, AttributeType, AttributeValue, Provenance, Value};
use crate::calendar::Calendar;
use crate::{Interval, ModelError, PropertyId, PropertyKind, ScenarioIdx};

// ============================================================================
// Reportable
// ============================================================================

/// The capabilities the report engine needs from a property
pub trait Reportable {
    /// Task or resource
    fn kind(&self) -> PropertyKind;

    /// Raw attribute lookup. `scenario` selects the per-scenario value set;
    /// `None` selects the scenario-independent values.
    fn attribute(&self, id: &str, scenario: Option<ScenarioIdx>) -> Option<&AttributeValue>;

    /// True if the property has children
    fn is_container(&self) -> bool;

    /// The `[start, end)` interval of the property in `scenario`. Undefined
    /// dates fall back to `fallback`. Properties without dates return `None`.
    fn effective_interval(&self, scenario: ScenarioIdx, fallback: &Interval) -> Option<Interval>;
}

// ============================================================================
// Property
// ============================================================================

/// A task or resource node
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property {
    kind: PropertyKind,
    id: String,
    parent: Option<PropertyId>,
    children: Vec<PropertyId>,
    level: usize,
    attributes: BTreeMap<String, AttributeValue>,
    scenario_attributes: Vec<BTreeMap<String, AttributeValue>>,
}

impl Property {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<PropertyId> {
        self.parent
    }

    pub fn children(&self) -> &[PropertyId] {
        &self.children
    }

    /// Depth in the tree; top-level properties have level 0
    pub fn level(&self) -> usize {
        self.level
    }

    fn date(&self, id: &str, scenario: ScenarioIdx) -> Option<NaiveDateTime> {
        self.attribute(id, Some(scenario))
            .and_then(AttributeValue::get)
            .and_then(Value::as_date)
    }
}

impl Reportable for Property {
    fn kind(&self) -> PropertyKind {
        self.kind
    }

    fn attribute(&self, id: &str, scenario: Option<ScenarioIdx>) -> Option<&AttributeValue> {
        match scenario {
            Some(idx) => self.scenario_attributes.get(idx)?.get(id),
            None => self.attributes.get(id),
        }
    }

    fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    fn effective_interval(&self, scenario: ScenarioIdx, fallback: &Interval) -> Option<Interval> {
        match self.kind {
            PropertyKind::Task => Some(Interval::new(
                self.date("start", scenario).unwrap_or(fallback.start),
                self.date("end", scenario).unwrap_or(fallback.end),
            )),
            PropertyKind::Resource => None,
        }
    }
}

/// A named what-if branch of the plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
}

/// A block of resource time booked for a task in one scenario
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub scenario: ScenarioIdx,
    pub task: PropertyId,
    pub resource: PropertyId,
    pub interval: Interval,
}

// ============================================================================
// Project
// ============================================================================

/// A scheduled project: property tree, scenarios, bookings and calendar
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Version string shown in report footers
    #[serde(default)]
    pub version: String,
    /// Copyright notice shown in report footers
    #[serde(default)]
    pub copyright: Option<String>,
    /// Project start
    pub start: NaiveDateTime,
    /// Project end
    pub end: NaiveDateTime,
    /// Currency symbol for cost columns
    #[serde(default)]
    pub currency: String,
    /// Working time calendar
    #[serde(default)]
    pub calendar: Calendar,
    scenarios: Vec<Scenario>,
    task_schema: AttributeSchema,
    resource_schema: AttributeSchema,
    properties: Vec<Property>,
    #[serde(default)]
    bookings: Vec<Booking>,
}

impl Project {
    /// Create a project with a single `plan` scenario
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: "1.0".into(),
            copyright: None,
            start,
            end,
            currency: "EUR".into(),
            calendar: Calendar::default(),
            scenarios: vec![Scenario {
                id: "plan".into(),
                name: "Plan".into(),
            }],
            task_schema: AttributeSchema::tasks(),
            resource_schema: AttributeSchema::resources(),
            properties: Vec::new(),
            bookings: Vec::new(),
        }
    }

    /// The overall project interval
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    // ========================================================================
    // Scenarios and schema
    // ========================================================================

    pub fn add_scenario(&mut self, id: impl Into<String>, name: impl Into<String>) -> ScenarioIdx {
        self.scenarios.push(Scenario {
            id: id.into(),
            name: name.into(),
        });
        for property in &mut self.properties {
            property.scenario_attributes.push(BTreeMap::new());
        }
        self.scenarios.len() - 1
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn scenario_index(&self, id: &str) -> Option<ScenarioIdx> {
        self.scenarios.iter().position(|s| s.id == id)
    }

    pub fn schema(&self, kind: PropertyKind) -> &AttributeSchema {
        match kind {
            PropertyKind::Task => &self.task_schema,
            PropertyKind::Resource => &self.resource_schema,
        }
    }

    pub fn schema_mut(&mut self, kind: PropertyKind) -> &mut AttributeSchema {
        match kind {
            PropertyKind::Task => &mut self.task_schema,
            PropertyKind::Resource => &mut self.resource_schema,
        }
    }

    pub fn attribute_type(&self, kind: PropertyKind, attribute: &str) -> Option<AttributeType> {
        self.schema(kind).get(attribute).map(|d| d.attribute_type)
    }

    pub fn scenario_specific(&self, kind: PropertyKind, attribute: &str) -> bool {
        self.schema(kind)
            .get(attribute)
            .map(|d| d.scenario_specific)
            .unwrap_or(false)
    }

    /// Name of an attribute, looked up in the task schema first
    pub fn attribute_name(&self, attribute: &str) -> Option<&str> {
        self.task_schema
            .get(attribute)
            .or_else(|| self.resource_schema.get(attribute))
            .map(|d| d.name.as_str())
    }

    // ========================================================================
    // Tree construction
    // ========================================================================

    pub fn add_task(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: Option<PropertyId>,
    ) -> Result<PropertyId, ModelError> {
        self.add_property(PropertyKind::Task, id.into(), name.into(), parent)
    }

    pub fn add_resource(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: Option<PropertyId>,
    ) -> Result<PropertyId, ModelError> {
        self.add_property(PropertyKind::Resource, id.into(), name.into(), parent)
    }

    fn add_property(
        &mut self,
        kind: PropertyKind,
        id: String,
        name: String,
        parent: Option<PropertyId>,
    ) -> Result<PropertyId, ModelError> {
        if self.find(kind, &id).is_some() {
            return Err(ModelError::DuplicateId { kind, id });
        }
        let level = match parent {
            Some(p) => {
                let parent_node = self.node(p)?;
                if parent_node.kind != kind {
                    return Err(ModelError::UnknownParent {
                        kind,
                        parent: parent_node.id.clone(),
                    });
                }
                parent_node.level + 1
            }
            None => 0,
        };
        let seqno = self.properties.iter().filter(|p| p.kind == kind).count() as i64 + 1;
        let pid = PropertyId(self.properties.len());
        self.properties.push(Property {
            kind,
            id: id.clone(),
            parent,
            children: Vec::new(),
            level,
            attributes: BTreeMap::new(),
            scenario_attributes: vec![BTreeMap::new(); self.scenarios.len()],
        });
        if let Some(p) = parent {
            self.properties[p.0].children.push(pid);
        }
        self.set(pid, "id", Value::String(id))?;
        self.set(pid, "name", Value::String(name))?;
        self.set(pid, "seqno", Value::Int(seqno))?;
        self.set(pid, "index", Value::Int(seqno))?;
        Ok(pid)
    }

    // ========================================================================
    // Attribute access
    // ========================================================================

    /// Set a scenario-independent attribute explicitly
    pub fn set(&mut self, property: PropertyId, attribute: &str, value: Value) -> Result<(), ModelError> {
        self.set_attribute(property, attribute, None, value, Provenance::Provided)
    }

    /// Set a scenario-specific attribute explicitly
    pub fn set_in(
        &mut self,
        property: PropertyId,
        attribute: &str,
        scenario: ScenarioIdx,
        value: Value,
    ) -> Result<(), ModelError> {
        self.set_attribute(property, attribute, Some(scenario), value, Provenance::Provided)
    }

    /// Set an attribute with an explicit provenance.
    ///
    /// Scenario-specific attributes require a scenario, the others must not
    /// be given one.
    pub fn set_attribute(
        &mut self,
        property: PropertyId,
        attribute: &str,
        scenario: Option<ScenarioIdx>,
        value: Value,
        provenance: Provenance,
    ) -> Result<(), ModelError> {
        let kind = self.node(property)?.kind;
        let definition = self
            .schema(kind)
            .get(attribute)
            .ok_or_else(|| ModelError::UnknownAttribute {
                kind,
                attribute: attribute.to_string(),
            })?
            .clone();
        if definition.attribute_type != value.attribute_type() {
            return Err(ModelError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: definition.attribute_type,
                found: value.attribute_type(),
            });
        }
        if let Some(idx) = scenario {
            if idx >= self.scenarios.len() {
                return Err(ModelError::UnknownScenario(idx.to_string()));
            }
        }
        let node = &mut self.properties[property.0];
        let slot = match (definition.scenario_specific, scenario) {
            (true, Some(idx)) => node.scenario_attributes[idx]
                .entry(attribute.to_string())
                .or_insert_with(|| AttributeValue::new(&definition)),
            (false, None) => node
                .attributes
                .entry(attribute.to_string())
                .or_insert_with(|| AttributeValue::new(&definition)),
            (true, None) => return Err(ModelError::ScenarioRequired(attribute.to_string())),
            (false, Some(_)) => return Err(ModelError::NotScenarioSpecific(attribute.to_string())),
        };
        slot.set(value, provenance);
        Ok(())
    }

    /// Resolve an attribute value, honouring the schema's scenario
    /// specificity. Unset attributes report the schema default.
    pub fn attribute(&self, property: PropertyId, attribute: &str, scenario: Option<ScenarioIdx>) -> Option<&Value> {
        let node = self.property(property);
        let definition = self.schema(node.kind).get(attribute)?;
        let lookup = if definition.scenario_specific {
            Some(scenario.unwrap_or(0))
        } else {
            None
        };
        match node.attribute(attribute, lookup) {
            Some(value) => value.get(),
            None => definition.default.as_ref(),
        }
    }

    /// Raw attribute holder, including provenance
    pub fn attribute_value(
        &self,
        property: PropertyId,
        attribute: &str,
        scenario: Option<ScenarioIdx>,
    ) -> Option<&AttributeValue> {
        self.property(property).attribute(attribute, scenario)
    }

    /// Push inheritable attribute values from parents to children that did
    /// not provide their own. Returns the number of values written.
    pub fn propagate_inherited(&mut self) -> usize {
        let mut written = 0;
        // Parents always precede their children in the arena
        for index in 0..self.properties.len() {
            let pid = PropertyId(index);
            let Some(parent) = self.properties[index].parent else {
                continue;
            };
            let kind = self.properties[index].kind;
            let inheritable: Vec<_> = self
                .schema(kind)
                .iter()
                .filter(|d| d.inheritable)
                .map(|d| (d.id.clone(), d.scenario_specific))
                .collect();
            for (attribute, scenario_specific) in inheritable {
                let scenarios: Vec<Option<ScenarioIdx>> = if scenario_specific {
                    (0..self.scenarios.len()).map(Some).collect()
                } else {
                    vec![None]
                };
                for scenario in scenarios {
                    let own_provided = self
                        .attribute_value(pid, &attribute, scenario)
                        .map(AttributeValue::provided)
                        .unwrap_or(false);
                    if own_provided {
                        continue;
                    }
                    let inherited = self
                        .attribute_value(parent, &attribute, scenario)
                        .filter(|v| !v.is_default())
                        .and_then(AttributeValue::get)
                        .cloned();
                    if let Some(value) = inherited {
                        if self
                            .set_attribute(pid, &attribute, scenario, value, Provenance::Inherited)
                            .is_ok()
                        {
                            written += 1;
                        }
                    }
                }
            }
        }
        debug!(written, "propagated inherited attribute values");
        written
    }

    // ========================================================================
    // Consistency
    // ========================================================================

    /// Check the invariants that [`Project::add_task`] and friends maintain.
    ///
    /// Projects read from JSON bypass those methods, so they must be
    /// validated before use. Parents have to precede their children in the
    /// arena, which also rules out cycles.
    pub fn validate(&self) -> Result<(), ModelError> {
        let inconsistent = |message: String| Err(ModelError::Inconsistent(message));
        let count = self.properties.len();
        for (index, property) in self.properties.iter().enumerate() {
            let pid = PropertyId(index);
            if property.scenario_attributes.len() != self.scenarios.len() {
                return inconsistent(format!(
                    "{} '{}' has values for {} scenarios, the project has {}",
                    property.kind,
                    property.id,
                    property.scenario_attributes.len(),
                    self.scenarios.len()
                ));
            }
            if self.properties[..index]
                .iter()
                .any(|p| p.kind == property.kind && p.id == property.id)
            {
                return Err(ModelError::DuplicateId {
                    kind: property.kind,
                    id: property.id.clone(),
                });
            }
            let expected_level = match property.parent {
                Some(parent) => {
                    if parent.0 >= index {
                        return inconsistent(format!(
                            "parent {} of {} '{}' does not precede it",
                            parent, property.kind, property.id
                        ));
                    }
                    let parent_node = &self.properties[parent.0];
                    if parent_node.kind != property.kind || !parent_node.children.contains(&pid) {
                        return inconsistent(format!(
                            "{} '{}' is not a child of its parent '{}'",
                            property.kind, property.id, parent_node.id
                        ));
                    }
                    parent_node.level + 1
                }
                None => 0,
            };
            if property.level != expected_level {
                return inconsistent(format!(
                    "{} '{}' has level {}, expected {}",
                    property.kind, property.id, property.level, expected_level
                ));
            }
            for child in &property.children {
                if child.0 >= count || self.properties[child.0].parent != Some(pid) {
                    return inconsistent(format!(
                        "child {} of {} '{}' does not refer back to it",
                        child, property.kind, property.id
                    ));
                }
            }
        }
        for booking in &self.bookings {
            let kind_of = |id: PropertyId| self.properties.get(id.0).map(|p| p.kind);
            if booking.scenario >= self.scenarios.len()
                || kind_of(booking.task) != Some(PropertyKind::Task)
                || kind_of(booking.resource) != Some(PropertyKind::Resource)
            {
                return inconsistent(format!(
                    "booking of {} for {} in scenario {} refers to unknown data",
                    booking.resource, booking.task, booking.scenario
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Tree navigation
    // ========================================================================

    fn node(&self, id: PropertyId) -> Result<&Property, ModelError> {
        self.properties
            .get(id.0)
            .ok_or_else(|| ModelError::UnknownProperty(id.to_string()))
    }

    /// Access a property. Ids are handed out by this project or checked by
    /// [`Project::validate`], so an out-of-range id is a programming error.
    pub fn property(&self, id: PropertyId) -> &Property {
        &self.properties[id.0]
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id.0)
    }

    pub fn kind(&self, id: PropertyId) -> PropertyKind {
        self.property(id).kind
    }

    /// Look a property up by its textual id
    pub fn find(&self, kind: PropertyKind, id: &str) -> Option<PropertyId> {
        self.properties
            .iter()
            .position(|p| p.kind == kind && p.id == id)
            .map(PropertyId)
    }

    /// All properties of one kind in declaration order
    pub fn properties_of(&self, kind: PropertyKind) -> impl Iterator<Item = PropertyId> + '_ {
        self.properties
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.kind == kind)
            .map(|(i, _)| PropertyId(i))
    }

    pub fn parent(&self, id: PropertyId) -> Option<PropertyId> {
        self.property(id).parent
    }

    pub fn children(&self, id: PropertyId) -> &[PropertyId] {
        &self.property(id).children
    }

    pub fn depth(&self, id: PropertyId) -> usize {
        self.property(id).level
    }

    pub fn is_container(&self, id: PropertyId) -> bool {
        self.property(id).is_container()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: PropertyId) -> Vec<PropertyId> {
        let mut result = Vec::with_capacity(self.depth(id));
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    /// True if `ancestor` is a strict ancestor of `id`
    pub fn is_descendant_of(&self, id: PropertyId, ancestor: PropertyId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    fn is_self_or_descendant(&self, id: PropertyId, ancestor: PropertyId) -> bool {
        id == ancestor || self.is_descendant_of(id, ancestor)
    }

    /// Leaf properties in the subtree rooted at `id`
    pub fn leaves(&self, id: PropertyId) -> Vec<PropertyId> {
        let children = self.children(id);
        if children.is_empty() {
            return vec![id];
        }
        children.iter().flat_map(|c| self.leaves(*c)).collect()
    }

    /// Work breakdown structure number, e.g. `1.2.1`
    pub fn wbs(&self, id: PropertyId) -> String {
        let mut path = Vec::with_capacity(self.depth(id) + 1);
        let mut current = Some(id);
        while let Some(node) = current {
            let position = match self.parent(node) {
                Some(p) => self.children(p).iter().position(|c| *c == node),
                None => self
                    .properties_of(self.kind(node))
                    .filter(|p| self.parent(*p).is_none())
                    .position(|p| p == node),
            };
            path.push(position.map(|i| i + 1).unwrap_or(0).to_string());
            current = self.parent(node);
        }
        path.reverse();
        path.join(".")
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Record a booking of `resource` for `task` in `scenario`
    pub fn book(
        &mut self,
        scenario: ScenarioIdx,
        task: PropertyId,
        resource: PropertyId,
        interval: Interval,
    ) -> Result<(), ModelError> {
        if scenario >= self.scenarios.len() {
            return Err(ModelError::UnknownScenario(scenario.to_string()));
        }
        if self.node(task)?.kind != PropertyKind::Task {
            return Err(ModelError::UnknownProperty(format!("{} is not a task", task)));
        }
        if self.node(resource)?.kind != PropertyKind::Resource {
            return Err(ModelError::UnknownProperty(format!("{} is not a resource", resource)));
        }
        self.bookings.push(Booking {
            scenario,
            task,
            resource,
            interval,
        });
        Ok(())
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    fn matching_bookings<'a>(
        &'a self,
        task: Option<PropertyId>,
        resource: Option<PropertyId>,
        scenario: ScenarioIdx,
    ) -> impl Iterator<Item = &'a Booking> + 'a {
        self.bookings.iter().filter(move |b| {
            b.scenario == scenario
                && task.map_or(true, |t| self.is_self_or_descendant(b.task, t))
                && resource.map_or(true, |r| self.is_self_or_descendant(b.resource, r))
        })
    }

    /// True if `resource` (or one of its members) works on `task` (or one of
    /// its sub tasks) in `scenario`
    pub fn is_assigned(&self, task: PropertyId, resource: PropertyId, scenario: ScenarioIdx) -> bool {
        self.matching_bookings(Some(task), Some(resource), scenario)
            .next()
            .is_some()
    }

    /// True if `resource` is booked for `task` within `interval`
    pub fn is_allocated(
        &self,
        resource: PropertyId,
        scenario: ScenarioIdx,
        interval: &Interval,
        task: PropertyId,
    ) -> bool {
        self.matching_bookings(Some(task), Some(resource), scenario)
            .any(|b| b.interval.overlaps(interval))
    }

    /// Booked working hours inside `interval`
    pub fn effort_hours(
        &self,
        task: Option<PropertyId>,
        resource: Option<PropertyId>,
        scenario: ScenarioIdx,
        interval: &Interval,
    ) -> f64 {
        self.matching_bookings(task, resource, scenario)
            .filter_map(|b| b.interval.intersection(interval))
            .map(|common| self.calendar.working_hours(&common))
            .sum()
    }

    /// Unbooked working hours of `resource` (all its leaf members) inside
    /// `interval`
    pub fn free_hours(&self, resource: PropertyId, scenario: ScenarioIdx, interval: &Interval) -> f64 {
        let capacity = self.calendar.working_hours(interval) * self.leaves(resource).len() as f64;
        (capacity - self.effort_hours(None, Some(resource), scenario, interval)).max(0.0)
    }

    /// Cost of the booked work: booked days times the resource rate
    pub fn cost(
        &self,
        task: Option<PropertyId>,
        resource: Option<PropertyId>,
        scenario: ScenarioIdx,
        interval: &Interval,
    ) -> Decimal {
        let hours_per_day = self.calendar.hours_per_day().max(f64::EPSILON);
        self.matching_bookings(task, resource, scenario)
            .filter_map(|b| {
                let common = b.interval.intersection(interval)?;
                let rate = self
                    .attribute(b.resource, "rate", Some(scenario))
                    .and_then(Value::as_decimal)?;
                let days = Decimal::from_f64_retain(self.calendar.working_hours(&common) / hours_per_day)?;
                Some(days * rate)
            })
            .sum()
    }

    /// Charges of `task` and its sub tasks
    pub fn revenue(&self, task: PropertyId, scenario: ScenarioIdx) -> Decimal {
        let own = self
            .attribute(task, "charge", Some(scenario))
            .and_then(Value::as_decimal)
            .unwrap_or_default();
        own + self
            .children(task)
            .iter()
            .map(|c| self.revenue(*c, scenario))
            .sum::<Decimal>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn project() -> Project {
        Project::new("p", "Test", at(2025, 1, 1, 0), at(2025, 3, 1, 0))
    }

    #[test]
    fn builtin_attributes_are_set_on_creation() {
        let mut project = project();
        let t = project.add_task("t1", "Design", None).unwrap();
        assert_eq!(project.attribute(t, "name", None), Some(&Value::from("Design")));
        assert_eq!(project.attribute(t, "seqno", None), Some(&Value::Int(1)));
        assert!(project.attribute_value(t, "name", None).unwrap().provided());
        // Scenario default from the schema
        assert_eq!(project.attribute(t, "priority", Some(0)), Some(&Value::Int(500)));
    }

    #[test]
    fn validate_rejects_broken_json() {
        let mut project = project();
        let p = project.add_task("p", "P", None).unwrap();
        let c = project.add_task("c", "C", Some(p)).unwrap();
        let dev = project.add_resource("dev", "Dev", None).unwrap();
        project.book(0, c, dev, Interval::new(at(2025, 1, 2, 9), at(2025, 1, 2, 17))).unwrap();
        project.validate().unwrap();

        let json = serde_json::to_value(&project).unwrap();
        let load = |edit: &dyn Fn(&mut serde_json::Value)| {
            let mut json = json.clone();
            edit(&mut json);
            serde_json::from_value::<Project>(json).unwrap().validate()
        };

        assert!(load(&|_| ()).is_ok());
        // Dangling parent
        let err = load(&|j| j["properties"][1]["parent"] = 7.into()).unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent(_)));
        // Parent cycle
        let err = load(&|j| {
            j["properties"][0]["parent"] = 1.into();
            j["properties"][1]["children"] = serde_json::json!([0]);
        })
        .unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent(_)));
        // Child that does not point back
        let err = load(&|j| j["properties"][2]["children"] = serde_json::json!([1])).unwrap_err();
        assert!(matches!(err, ModelError::Inconsistent(_)));
        // Booking of a task as resource
        let err = load(&|j| j["bookings"][0]["resource"] = 0.into()).unwrap_err();
        assert!(err.to_string().contains("booking"));
        // Missing scenario values
        let err = load(&|j| j["properties"][0]["scenario_attributes"] = serde_json::json!([])).unwrap_err();
        assert!(err.to_string().contains("scenarios"));
    }

    #[test]
    fn duplicate_ids_are_rejected_per_kind() {
        let mut project = project();
        project.add_task("x", "X", None).unwrap();
        assert!(matches!(project.add_task("x", "X", None), Err(ModelError::DuplicateId { .. })));
        // Same id for a resource is fine
        assert!(project.add_resource("x", "X", None).is_ok());
    }

    #[test]
    fn set_attribute_validates_schema() {
        let mut project = project();
        let t = project.add_task("t", "T", None).unwrap();
        assert!(matches!(
            project.set(t, "start", Value::Date(at(2025, 1, 2, 0))),
            Err(ModelError::ScenarioRequired(_))
        ));
        assert!(matches!(
            project.set_in(t, "start", 0, Value::Int(3)),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            project.set(t, "bogus", Value::Int(3)),
            Err(ModelError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            project.set_in(t, "start", 4, Value::Date(at(2025, 1, 2, 0))),
            Err(ModelError::UnknownScenario(_))
        ));
    }

    #[test]
    fn tree_navigation() {
        let mut project = project();
        let p = project.add_task("p", "P", None).unwrap();
        let a = project.add_task("a", "A", Some(p)).unwrap();
        let b = project.add_task("b", "B", Some(a)).unwrap();
        let q = project.add_task("q", "Q", None).unwrap();

        assert_eq!(project.depth(b), 2);
        assert_eq!(project.ancestors(b), vec![a, p]);
        assert!(project.is_descendant_of(b, p));
        assert!(!project.is_descendant_of(p, p));
        assert!(!project.is_descendant_of(q, p));
        assert_eq!(project.wbs(b), "1.1.1");
        assert_eq!(project.wbs(q), "2");
        assert_eq!(project.leaves(p), vec![b]);
    }

    #[test]
    fn inheritance_marks_values_inherited() {
        let mut project = project();
        let team = project.add_resource("team", "Team", None).unwrap();
        let dev = project.add_resource("dev", "Dev", Some(team)).unwrap();
        let lead = project.add_resource("lead", "Lead", Some(team)).unwrap();
        project.set_in(team, "rate", 0, Value::Money(dec!(400))).unwrap();
        project.set_in(lead, "rate", 0, Value::Money(dec!(600))).unwrap();

        assert_eq!(project.propagate_inherited(), 1);

        let dev_rate = project.attribute_value(dev, "rate", Some(0)).unwrap();
        assert!(dev_rate.inherited());
        assert_eq!(dev_rate.get(), Some(&Value::Money(dec!(400))));
        let lead_rate = project.attribute_value(lead, "rate", Some(0)).unwrap();
        assert!(lead_rate.provided());
        assert_eq!(lead_rate.get(), Some(&Value::Money(dec!(600))));
    }

    #[test]
    fn bookings_drive_effort_and_assignment() {
        let mut project = project();
        let phase = project.add_task("phase", "Phase", None).unwrap();
        let t = project.add_task("t", "T", Some(phase)).unwrap();
        let dev = project.add_resource("dev", "Dev", None).unwrap();
        let qa = project.add_resource("qa", "QA", None).unwrap();
        // Monday to Wednesday
        let iv = Interval::new(at(2025, 1, 6, 0), at(2025, 1, 9, 0));
        project.book(0, t, dev, iv).unwrap();
        project.set_in(dev, "rate", 0, Value::Money(dec!(100))).unwrap();

        assert!(project.is_assigned(phase, dev, 0));
        assert!(!project.is_assigned(phase, qa, 0));
        assert!(project.is_allocated(dev, 0, &project.interval(), t));
        assert!(!project.is_allocated(dev, 0, &Interval::new(at(2025, 2, 1, 0), at(2025, 2, 2, 0)), t));

        assert_eq!(project.effort_hours(Some(phase), None, 0, &project.interval()), 24.0);
        let monday = Interval::new(at(2025, 1, 6, 0), at(2025, 1, 7, 0));
        assert_eq!(project.free_hours(dev, 0, &monday), 0.0);
        assert_eq!(project.free_hours(qa, 0, &monday), 8.0);
        assert_eq!(project.cost(Some(t), None, 0, &project.interval()), dec!(300));
    }
}
