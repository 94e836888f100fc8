//! Value queries and predicates.
//!
//! The report engine never computes values itself. Calculated columns,
//! calendar cells and macros ask a [`ValueQuery`] for an attribute of a
//! property in a scenario and time window. Hide and rollup filters ask a
//! [`Predicate`]. [`ProjectQuery`] and [`Expression`] are the reference
//! implementations backed by a [`Project`].

use serde::{Deserialize, Serialize};

use crate::attribute::Value;
use crate::format::FormatOptions;
use crate::project::{Project, Reportable};
use crate::{Interval, PropertyId, PropertyKind, ScenarioIdx};

// ============================================================================
// Value queries
// ============================================================================

/// A request for one value of one property
#[derive(Clone, Debug)]
pub struct QueryRequest<'a> {
    pub property: PropertyId,
    /// Enclosing property of the other kind for nested rows
    pub scope_property: Option<PropertyId>,
    pub attribute_id: &'a str,
    pub scenario: ScenarioIdx,
    pub interval: Interval,
    pub format: &'a FormatOptions,
}

impl<'a> QueryRequest<'a> {
    pub fn new(
        property: PropertyId,
        attribute_id: &'a str,
        scenario: ScenarioIdx,
        interval: Interval,
        format: &'a FormatOptions,
    ) -> Self {
        Self {
            property,
            scope_property: None,
            attribute_id,
            scenario,
            interval,
            format,
        }
    }

    pub fn scope(mut self, scope_property: Option<PropertyId>) -> Self {
        self.scope_property = scope_property;
        self
    }

    /// Same request for another attribute
    pub fn with_attribute(&self, attribute_id: &'a str) -> Self {
        Self {
            attribute_id,
            ..self.clone()
        }
    }

    /// Same request over another interval
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self {
            interval,
            ..self.clone()
        }
    }
}

/// Outcome of a value query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub ok: bool,
    pub display_text: String,
    pub numeric_value: Option<f64>,
    pub error_message: Option<String>,
}

impl QueryResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            display_text: text.into(),
            ..Self::default()
        }
    }

    pub fn number(value: f64, text: impl Into<String>) -> Self {
        Self {
            ok: true,
            display_text: text.into(),
            numeric_value: Some(value),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Numeric value, 0 for failed or non-numeric results
    pub fn value_or_zero(&self) -> f64 {
        self.numeric_value.filter(|_| self.ok).unwrap_or(0.0)
    }
}

/// Evaluates attribute queries
pub trait ValueQuery {
    fn evaluate(&self, request: &QueryRequest<'_>) -> QueryResult;
}

/// Query evaluator backed by project attributes and bookings
#[derive(Clone, Copy, Debug)]
pub struct ProjectQuery<'a> {
    project: &'a Project,
}

impl<'a> ProjectQuery<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Split property and scope into (task, resource) roles
    fn roles(&self, request: &QueryRequest<'_>) -> (Option<PropertyId>, Option<PropertyId>) {
        match self.project.kind(request.property) {
            PropertyKind::Task => (Some(request.property), request.scope_property),
            PropertyKind::Resource => (request.scope_property, Some(request.property)),
        }
    }

    fn hours_per_day(&self, request: &QueryRequest<'_>) -> f64 {
        if request.format.hours_per_day > 0.0 {
            request.format.hours_per_day
        } else {
            self.project.calendar.hours_per_day().max(1.0)
        }
    }

    fn effort(&self, request: &QueryRequest<'_>) -> QueryResult {
        let (task, resource) = self.roles(request);
        let hours = self
            .project
            .effort_hours(task, resource, request.scenario, &request.interval);
        let days = hours / self.hours_per_day(request);
        QueryResult::number(days, request.format.format_load(days))
    }

    fn free_work(&self, request: &QueryRequest<'_>) -> QueryResult {
        if self.project.kind(request.property) != PropertyKind::Resource {
            return QueryResult::failed("'freework' is only available for resources");
        }
        let hours = self
            .project
            .free_hours(request.property, request.scenario, &request.interval);
        let days = hours / self.hours_per_day(request);
        QueryResult::number(days, request.format.format_load(days))
    }

    fn duration(&self, request: &QueryRequest<'_>) -> QueryResult {
        let property = self.project.property(request.property);
        let Some(interval) = property.effective_interval(request.scenario, &self.project.interval())
        else {
            return QueryResult::failed("'duration' is only available for tasks");
        };
        let seconds = interval
            .intersection(&request.interval)
            .map(|common| common.duration().num_seconds())
            .unwrap_or(0);
        let days = seconds as f64 / 86_400.0;
        QueryResult::number(days, request.format.number_format.format(days))
    }

    fn complete(&self, request: &QueryRequest<'_>) -> QueryResult {
        if self.project.kind(request.property) != PropertyKind::Task {
            return QueryResult::failed("'complete' is only available for tasks");
        }
        let percent = self
            .project
            .attribute(request.property, "complete", Some(request.scenario))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        QueryResult::number(percent, format!("{}%", request.format.number_format.format(percent)))
    }

    fn cost(&self, request: &QueryRequest<'_>) -> QueryResult {
        use rust_decimal::prelude::ToPrimitive;
        let (task, resource) = self.roles(request);
        let amount = self
            .project
            .cost(task, resource, request.scenario, &request.interval)
            .to_f64()
            .unwrap_or(0.0);
        QueryResult::number(amount, request.format.format_currency(amount))
    }

    fn revenue(&self, request: &QueryRequest<'_>) -> QueryResult {
        use rust_decimal::prelude::ToPrimitive;
        if self.project.kind(request.property) != PropertyKind::Task {
            return QueryResult::failed("'revenue' is only available for tasks");
        }
        let amount = self
            .project
            .revenue(request.property, request.scenario)
            .to_f64()
            .unwrap_or(0.0);
        QueryResult::number(amount, request.format.format_currency(amount))
    }

    fn plain_attribute(&self, request: &QueryRequest<'_>) -> QueryResult {
        let kind = self.project.kind(request.property);
        if !self.project.schema(kind).contains(request.attribute_id) {
            return QueryResult::failed(format!(
                "Unknown attribute '{}' for {} {}",
                request.attribute_id,
                kind,
                self.project.property(request.property).id()
            ));
        }
        match self
            .project
            .attribute(request.property, request.attribute_id, Some(request.scenario))
        {
            Some(value) => {
                let text = value.format_with(&request.format.time_format);
                match value.as_f64() {
                    Some(number) => QueryResult::number(number, text),
                    None => QueryResult::text(text),
                }
            }
            None => QueryResult::text(""),
        }
    }
}

impl ValueQuery for ProjectQuery<'_> {
    fn evaluate(&self, request: &QueryRequest<'_>) -> QueryResult {
        match request.attribute_id {
            "effort" => self.effort(request),
            "freework" => self.free_work(request),
            "duration" => self.duration(request),
            "complete" => self.complete(request),
            "cost" => self.cost(request),
            "revenue" => self.revenue(request),
            "wbs" => QueryResult::text(self.project.wbs(request.property)),
            // Numbering is assigned by the table builder
            "line" | "no" => QueryResult::text(""),
            _ => self.plain_attribute(request),
        }
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// A boolean test of a property, optionally in the context of a scope
/// property of the other kind
pub trait Predicate {
    fn eval(&self, project: &Project, property: PropertyId, scope: Option<PropertyId>) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Project, PropertyId, Option<PropertyId>) -> bool,
{
    fn eval(&self, project: &Project, property: PropertyId, scope: Option<PropertyId>) -> bool {
        self(project, property, scope)
    }
}

/// Serializable predicate used in report configurations
///
/// ```toml
/// hide = { op = "not", expr = { op = "is_leaf" } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expression {
    True,
    False,
    IsLeaf,
    IsContainer,
    /// Attribute equals a value; scenario-specific attributes use the
    /// given scenario or the first one
    AttributeEquals {
        attribute: String,
        value: Value,
        #[serde(default)]
        scenario: Option<ScenarioIdx>,
    },
    /// Depth in the tree is greater than `level`
    LevelGreaterThan { level: usize },
    /// Scope property is assigned to the property in `scenario`
    IsAssigned {
        #[serde(default)]
        scenario: ScenarioIdx,
    },
    Not { expr: Box<Expression> },
    All { exprs: Vec<Expression> },
    Any { exprs: Vec<Expression> },
}

impl Predicate for Expression {
    fn eval(&self, project: &Project, property: PropertyId, scope: Option<PropertyId>) -> bool {
        match self {
            Expression::True => true,
            Expression::False => false,
            Expression::IsLeaf => !project.is_container(property),
            Expression::IsContainer => project.is_container(property),
            Expression::AttributeEquals {
                attribute,
                value,
                scenario,
            } => project
                .attribute(property, attribute, *scenario)
                .is_some_and(|v| v.compare(value).is_eq()),
            Expression::LevelGreaterThan { level } => project.depth(property) > *level,
            Expression::IsAssigned { scenario } => scope.is_some_and(|s| match project.kind(property) {
                PropertyKind::Task => project.is_assigned(property, s, *scenario),
                PropertyKind::Resource => project.is_assigned(s, property, *scenario),
            }),
            Expression::Not { expr } => !expr.eval(project, property, scope),
            Expression::All { exprs } => exprs.iter().all(|e| e.eval(project, property, scope)),
            Expression::Any { exprs } => exprs.iter().any(|e| e.eval(project, property, scope)),
        }
    }
}
