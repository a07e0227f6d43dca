//! Field and record schema declarations.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

/// A user-supplied validator bound to one field.
///
/// Receives the already type-checked value and returns it (possibly
/// replaced) or a message explaining why it is rejected.
pub type Check = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

// ── FieldType ─────────────────────────────────────────────────────────────────

/// Declared type of a field. Input is coerced into it leniently: `"42"` is a
/// valid `Int`, `1` is a valid `Bool`.
#[derive(Clone, Debug)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    /// A `Str` shaped like `local@domain.tld`; the domain is lower-cased.
    Email,
    /// Any JSON value, passed through untouched.
    Any,
    List(Box<FieldType>),
    Record(Arc<RecordSchema>),
}

impl FieldType {
    pub fn list(item: FieldType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn record(schema: RecordSchema) -> Self {
        Self::Record(Arc::new(schema))
    }

    /// Name used in descriptions and error messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::Str       => "str".to_owned(),
            Self::Int       => "int".to_owned(),
            Self::Float     => "float".to_owned(),
            Self::Bool      => "bool".to_owned(),
            Self::Email     => "email".to_owned(),
            Self::Any       => "any".to_owned(),
            Self::List(t)   => format!("list[{}]", t.type_name()),
            Self::Record(s) => s.name().to_owned(),
        }
    }
}

// ── Constraint ────────────────────────────────────────────────────────────────

/// A built-in bound checked after type coercion.
///
/// Length bounds apply to strings (counted in characters) and lists (counted
/// in items); numeric bounds apply to `Int` and `Float`. A constraint that does
/// not apply to the value's type is ignored.
#[derive(Clone, Debug)]
pub enum Constraint {
    MinLength(usize),
    MaxLength(usize),
    Ge(f64),
    Gt(f64),
    Le(f64),
    Lt(f64),
    Pattern(Regex),
}

impl Constraint {
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression. Schemas are
    /// declared at startup, so a typo fails fast.
    pub fn pattern(pattern: &str) -> Self {
        let re = Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern `{pattern}`: {e}"));
        Self::Pattern(re)
    }

    /// `Err(message)` when `value` is out of bounds.
    pub(crate) fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Self::MinLength(n), Value::String(s)) if s.chars().count() < *n => {
                Err(format!("String should have at least {n} {}", plural(*n, "character")))
            }
            (Self::MaxLength(n), Value::String(s)) if s.chars().count() > *n => {
                Err(format!("String should have at most {n} {}", plural(*n, "character")))
            }
            (Self::MinLength(n), Value::Array(items)) if items.len() < *n => {
                Err(format!("List should have at least {n} {}", plural(*n, "item")))
            }
            (Self::MaxLength(n), Value::Array(items)) if items.len() > *n => {
                Err(format!("List should have at most {n} {}", plural(*n, "item")))
            }
            (Self::Pattern(re), Value::String(s)) if !re.is_match(s) => {
                Err(format!("String should match pattern '{}'", re.as_str()))
            }
            (Self::Ge(bound), Value::Number(n)) if n.as_f64().is_some_and(|x| x < *bound) => {
                Err(format!("Input should be greater than or equal to {bound}"))
            }
            (Self::Gt(bound), Value::Number(n)) if n.as_f64().is_some_and(|x| x <= *bound) => {
                Err(format!("Input should be greater than {bound}"))
            }
            (Self::Le(bound), Value::Number(n)) if n.as_f64().is_some_and(|x| x > *bound) => {
                Err(format!("Input should be less than or equal to {bound}"))
            }
            (Self::Lt(bound), Value::Number(n)) if n.as_f64().is_some_and(|x| x >= *bound) => {
                Err(format!("Input should be less than {bound}"))
            }
            _ => Ok(()),
        }
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 { word.to_owned() } else { format!("{word}s") }
}

// ── FieldSpec ─────────────────────────────────────────────────────────────────

/// Declaration of one field: name, type, optionality, default, bounds, and
/// custom validators. Immutable once placed in a [`RecordSchema`].
///
/// ```rust
/// use vetted::{FieldSpec, FieldType};
///
/// let name = FieldSpec::new("name", FieldType::Str).min_length(2);
/// let age = FieldSpec::new("age", FieldType::Int).optional();
/// let limit = FieldSpec::new("limit", FieldType::Int).default(10).le(100.0);
/// ```
#[derive(Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) ty: FieldType,
    pub(crate) optional: bool,
    pub(crate) default: Option<Value>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) checks: Vec<Check>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
}

impl FieldSpec {
    /// A required field of type `ty`.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
            constraints: Vec::new(),
            checks: Vec::new(),
            title: None,
            description: None,
        }
    }

    /// Accepts `null` and defaults to `null` when absent.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is absent. Not re-validated.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn constraint(mut self, c: Constraint) -> Self {
        self.constraints.push(c);
        self
    }

    pub fn min_length(self, n: usize) -> Self { self.constraint(Constraint::MinLength(n)) }
    pub fn max_length(self, n: usize) -> Self { self.constraint(Constraint::MaxLength(n)) }
    pub fn ge(self, bound: f64) -> Self { self.constraint(Constraint::Ge(bound)) }
    pub fn gt(self, bound: f64) -> Self { self.constraint(Constraint::Gt(bound)) }
    pub fn le(self, bound: f64) -> Self { self.constraint(Constraint::Le(bound)) }
    pub fn lt(self, bound: f64) -> Self { self.constraint(Constraint::Lt(bound)) }

    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    pub fn pattern(self, pattern: &str) -> Self { self.constraint(Constraint::pattern(pattern)) }

    /// Adds a custom validator. Validators run in the order they were added,
    /// after the type and every built-in constraint have passed.
    pub fn check<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(f));
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn ty(&self) -> &FieldType { &self.ty }
    pub fn is_optional(&self) -> bool { self.optional }
    pub fn default_value(&self) -> Option<&Value> { self.default.as_ref() }
    pub fn constraints(&self) -> &[Constraint] { &self.constraints }

    /// A field is required when it is neither optional nor defaulted.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("constraints", &self.constraints)
            .field("checks", &self.checks.len())
            .finish()
    }
}

// ── RecordSchema ──────────────────────────────────────────────────────────────

/// A named, ordered set of fields. Nest schemas with [`FieldType::Record`].
///
/// ```rust
/// use vetted::{FieldSpec, FieldType, RecordSchema};
///
/// let address = RecordSchema::new("Address")
///     .field(FieldSpec::new("street", FieldType::Str))
///     .field(FieldSpec::new("zip_code", FieldType::Str));
///
/// let user = RecordSchema::new("User")
///     .field(FieldSpec::new("id", FieldType::Int))
///     .field(FieldSpec::new("addresses", FieldType::list(FieldType::record(address))));
/// ```
#[derive(Clone, Debug)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Appends a field.
    ///
    /// # Panics
    ///
    /// Panics if a field with the same name is already declared.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        if self.fields.iter().any(|f| f.name == spec.name) {
            panic!("duplicate field `{}` in schema `{}`", spec.name, self.name);
        }
        self.fields.push(spec);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn fields(&self) -> &[FieldSpec] { &self.fields }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn length_bounds_count_characters() {
        assert!(Constraint::MinLength(3).check(&json!("héé")).is_ok());
        assert_eq!(
            Constraint::MinLength(3).check(&json!("ab")),
            Err("String should have at least 3 characters".to_owned())
        );
        assert_eq!(
            Constraint::MaxLength(1).check(&json!("ab")),
            Err("String should have at most 1 character".to_owned())
        );
    }

    #[test]
    fn numeric_bounds_render_integral_values_plainly() {
        assert_eq!(
            Constraint::Ge(1.0).check(&json!(0)),
            Err("Input should be greater than or equal to 1".to_owned())
        );
        assert_eq!(
            Constraint::Le(100.0).check(&json!(101)),
            Err("Input should be less than or equal to 100".to_owned())
        );
        assert!(Constraint::Gt(0.5).check(&json!(0.75)).is_ok());
        assert!(Constraint::Lt(10.0).check(&json!(10)).is_err());
    }

    #[test]
    fn bounds_ignore_other_types() {
        assert!(Constraint::Ge(1.0).check(&json!("zero")).is_ok());
        assert!(Constraint::MinLength(5).check(&json!(1)).is_ok());
    }

    #[test]
    fn pattern_matches_anywhere() {
        let c = Constraint::pattern(r"\d{3}");
        assert!(c.check(&json!("zip 001")).is_ok());
        assert_eq!(c.check(&json!("none")), Err(r"String should match pattern '\d{3}'".to_owned()));
    }

    #[test]
    #[should_panic(expected = "invalid pattern")]
    fn invalid_pattern_panics() {
        let _ = Constraint::pattern("(");
    }

    #[test]
    #[should_panic(expected = "duplicate field `id`")]
    fn duplicate_field_panics() {
        let _ = RecordSchema::new("User")
            .field(FieldSpec::new("id", FieldType::Int))
            .field(FieldSpec::new("id", FieldType::Str));
    }

    #[test]
    fn required_means_no_default_and_not_optional() {
        assert!(FieldSpec::new("id", FieldType::Int).is_required());
        assert!(!FieldSpec::new("age", FieldType::Int).optional().is_required());
        assert!(!FieldSpec::new("skip", FieldType::Int).default(0).is_required());
        assert_eq!(FieldType::list(FieldType::Str).type_name(), "list[str]");
    }
}
