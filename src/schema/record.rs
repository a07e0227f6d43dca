//! Validated records and typed models.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::field::RecordSchema;
use super::validate::validate;
use crate::rejection::{FieldPath, ValidationErrors, Violation, ViolationKind};

/// A successfully validated input: every declared field, in declaration
/// order, holding its coerced value.
///
/// Only [`validate`] and the parameter binder construct records, so holding
/// one means validation passed.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    name: String,
    fields: Map<String, Value>,
}

impl Record {
    pub(crate) fn new(name: &str, fields: Map<String, Value>) -> Self {
        Self { name: name.to_owned(), fields }
    }

    /// Name of the schema this record was validated against.
    pub fn name(&self) -> &str { &self.name }
    pub fn fields(&self) -> &Map<String, Value> { &self.fields }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field; `None` when absent, null, or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// The field mapping as a JSON object. Re-validating it against the same
    /// schema yields an identical record.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Converts the record into a serde type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_value())
    }
}

/// A serde type backed by a [`RecordSchema`].
///
/// Declare the schema once (a `static` `OnceLock` or `LazyLock` is the usual
/// home) and every input goes through the schema before it reaches serde:
///
/// ```rust
/// use std::sync::LazyLock;
///
/// use serde::Deserialize;
/// use serde_json::json;
/// use vetted::{FieldSpec, FieldType, Model, RecordSchema};
///
/// #[derive(Deserialize)]
/// struct Item {
///     name: String,
///     price: f64,
/// }
///
/// static ITEM: LazyLock<RecordSchema> = LazyLock::new(|| {
///     RecordSchema::new("Item")
///         .field(FieldSpec::new("name", FieldType::Str))
///         .field(FieldSpec::new("price", FieldType::Float).gt(0.0))
/// });
///
/// impl Model for Item {
///     fn schema() -> &'static RecordSchema { &ITEM }
/// }
///
/// let item = Item::validate(&json!({"name": "pen", "price": "1.5"})).unwrap();
/// assert_eq!(item.price, 1.5);
/// ```
pub trait Model: DeserializeOwned {
    fn schema() -> &'static RecordSchema;

    fn validate(input: &Value) -> Result<Self, ValidationErrors> {
        let record = validate(Self::schema(), input)?;
        record.deserialize().map_err(|e| {
            // The schema accepted something the serde type cannot hold.
            std::iter::once(Violation::new(
                FieldPath::root(),
                ViolationKind::TypeMismatch,
                format!("{} does not match its schema: {e}", Self::schema().name()),
            ))
            .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    fn user() -> RecordSchema {
        RecordSchema::new("User")
            .field(FieldSpec::new("id", FieldType::Int))
            .field(FieldSpec::new("name", FieldType::Str))
            .field(FieldSpec::new("age", FieldType::Int).optional())
    }

    #[test]
    fn keeps_declaration_order_and_drops_unknown_keys() {
        let record = validate(&user(), &json!({"name": "Al", "extra": true, "id": 1})).unwrap();
        let keys: Vec<&str> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "name", "age"]);
        assert_eq!(record.get("age"), Some(&Value::Null));
        assert_eq!(record.name(), "User");
    }

    #[test]
    fn typed_accessors() {
        let record = validate(&user(), &json!({"id": "9", "name": "Bo", "age": 23})).unwrap();
        assert_eq!(record.get_i64("id"), Some(9));
        assert_eq!(record.get_str("name"), Some("Bo"));
        assert_eq!(record.get_i64("age"), Some(23));
        assert_eq!(record.get_bool("name"), None);
    }

    #[test]
    fn deserializes_into_serde_types() {
        #[derive(serde::Deserialize)]
        struct User {
            id: i64,
            age: Option<i64>,
        }

        let record = validate(&user(), &json!({"id": 3, "name": "Cy"})).unwrap();
        let u: User = record.deserialize().unwrap();
        assert_eq!(u.id, 3);
        assert_eq!(u.age, None);
    }
}
