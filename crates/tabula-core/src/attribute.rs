//! Typed attribute values with provenance tracking.
//!
//! Every property attribute is held in an [`AttributeValue`]. Besides the
//! value itself it records where the value came from: set explicitly by the
//! project author ([`Provenance::Provided`]) or propagated down the property
//! tree ([`Provenance::Inherited`]). A value that was never set reports the
//! type default of its [`AttributeDefinition`] and neither flag.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Format used when a date is rendered without an explicit time format
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d-%H:%M";

/// Whether `format` is a `strftime` format chrono can render
pub fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

// ============================================================================
// Value
// ============================================================================

/// The type of an attribute, as declared in the schema
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Float,
    Date,
    RichText,
    Money,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Date => "date",
            AttributeType::RichText => "richtext",
            AttributeType::Money => "money",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete attribute value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    RichText(String),
    Money(Decimal),
}

impl Value {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Value::String(_) => AttributeType::String,
            Value::Int(_) => AttributeType::Int,
            Value::Float(_) => AttributeType::Float,
            Value::Date(_) => AttributeType::Date,
            Value::RichText(_) => AttributeType::RichText,
            Value::Money(_) => AttributeType::Money,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Money(m) => m.to_f64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Money(m) => Some(*m),
            Value::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    /// Render the value, using `date_format` for dates. Dates fall back
    /// to [`DEFAULT_DATE_FORMAT`] if `date_format` cannot be rendered.
    pub fn format_with(&self, date_format: &str) -> String {
        match self {
            Value::Date(d) => {
                let mut text = String::new();
                if write!(text, "{}", d.format(date_format)).is_err() {
                    return d.format(DEFAULT_DATE_FORMAT).to_string();
                }
                text
            }
            other => other.to_string(),
        }
    }

    /// Total order over values.
    ///
    /// Values of the same variant compare naturally (floats via
    /// `total_cmp`). Values of different variants order by variant rank,
    /// except that the numeric variants compare by magnitude.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::String(a), Value::String(b)) | (Value::RichText(a), Value::RichText(b)) => {
                a.cmp(b)
            }
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Money(a), Value::Money(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::Money(_) => 2,
            Value::Date(_) => 3,
            Value::String(_) => 4,
            Value::RichText(_) => 5,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::RichText(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Date(d) => write!(f, "{}", d.format(DEFAULT_DATE_FORMAT)),
            Value::Money(m) => write!(f, "{}", m.round_dp(2)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<Decimal> for Value {
    fn from(m: Decimal) -> Self {
        Value::Money(m)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Where an attribute value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Set explicitly for this property
    Provided,
    /// Propagated from an ancestor property
    Inherited,
}

/// Schema entry describing one attribute of a property kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute identifier (e.g. `start`)
    pub id: String,
    /// Human-readable name, used as default column title
    pub name: String,
    /// Declared value type
    pub attribute_type: AttributeType,
    /// Whether each scenario carries its own value
    pub scenario_specific: bool,
    /// Whether children inherit the value from their parent
    #[serde(default)]
    pub inheritable: bool,
    /// Type default reported while the value was never set
    #[serde(default)]
    pub default: Option<Value>,
}

impl AttributeDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attribute_type,
            scenario_specific: false,
            inheritable: false,
            default: None,
        }
    }

    /// Mark the attribute as scenario specific
    pub fn scenario_specific(mut self) -> Self {
        self.scenario_specific = true;
        self
    }

    /// Mark the attribute as inherited by child properties
    pub fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    /// Set the type default
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// The set of attributes known for one property kind
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    definitions: BTreeMap<String, AttributeDefinition>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes shared by tasks and resources
    fn common() -> Self {
        let mut schema = Self::new();
        schema.define(AttributeDefinition::new("id", "Id", AttributeType::String));
        schema.define(AttributeDefinition::new("name", "Name", AttributeType::String));
        schema.define(AttributeDefinition::new("seqno", "Seq. No.", AttributeType::Int));
        schema.define(AttributeDefinition::new("index", "Index", AttributeType::Int));
        schema.define(AttributeDefinition::new("note", "Note", AttributeType::RichText));
        schema
    }

    /// Built-in task attributes
    pub fn tasks() -> Self {
        let mut schema = Self::common();
        schema.define(AttributeDefinition::new("start", "Start", AttributeType::Date).scenario_specific());
        schema.define(AttributeDefinition::new("end", "End", AttributeType::Date).scenario_specific());
        schema.define(
            AttributeDefinition::new("priority", "Priority", AttributeType::Int)
                .scenario_specific()
                .inheritable()
                .default_value(Value::Int(500)),
        );
        schema.define(AttributeDefinition::new("complete", "Completion", AttributeType::Float).scenario_specific());
        schema.define(AttributeDefinition::new("charge", "Charge", AttributeType::Money).scenario_specific());
        schema
    }

    /// Built-in resource attributes
    pub fn resources() -> Self {
        let mut schema = Self::common();
        schema.define(
            AttributeDefinition::new("efficiency", "Efficiency", AttributeType::Float)
                .scenario_specific()
                .default_value(Value::Float(1.0)),
        );
        schema.define(
            AttributeDefinition::new("rate", "Rate", AttributeType::Money)
                .scenario_specific()
                .inheritable(),
        );
        schema
    }

    /// Add or replace a definition
    pub fn define(&mut self, definition: AttributeDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&AttributeDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.values()
    }
}

// ============================================================================
// AttributeValue
// ============================================================================

/// One attribute value of one property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    type_id: String,
    attribute_type: AttributeType,
    value: Option<Value>,
    provided: bool,
    inherited: bool,
}

impl AttributeValue {
    /// Create a value holding the definition's type default
    pub fn new(definition: &AttributeDefinition) -> Self {
        Self {
            type_id: definition.id.clone(),
            attribute_type: definition.attribute_type,
            value: definition.default.clone(),
            provided: false,
            inherited: false,
        }
    }

    /// Overwrite the value and record where it came from.
    ///
    /// At most one of [`provided`](Self::provided) and
    /// [`inherited`](Self::inherited) is true after the call.
    pub fn set(&mut self, value: Value, provenance: Provenance) {
        self.value = Some(value);
        match provenance {
            Provenance::Provided => {
                self.provided = true;
                self.inherited = false;
            }
            Provenance::Inherited => {
                self.inherited = true;
                self.provided = false;
            }
        }
    }

    /// The current value, or the type default if never set
    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.type_id
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn provided(&self) -> bool {
        self.provided
    }

    pub fn inherited(&self) -> bool {
        self.inherited
    }

    /// True if the value is still the type default
    pub fn is_default(&self) -> bool {
        !self.provided && !self.inherited
    }

    pub fn to_display_string(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }

    /// `"<typeId> <value>"`, the form used in project declarations
    pub fn to_declaration_string(&self) -> String {
        format!("{} {}", self.type_id, self.to_display_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}
