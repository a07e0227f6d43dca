//! Declarative record schemas and the validator that enforces them.
//!
//! A [`RecordSchema`] is plain data: an ordered list of [`FieldSpec`]s, each
//! with a [`FieldType`], optionality, an optional default, built-in
//! [`Constraint`]s and custom checks. Schemas nest by reference
//! ([`FieldType::Record`]) rather than by inheritance.
//!
//! [`validate`] turns untyped JSON into a [`Record`] or a
//! [`ValidationErrors`](crate::ValidationErrors) report listing every problem,
//! each tagged with its dotted path (`addresses.1.zip_code`).

mod field;
mod record;
mod validate;

pub use field::{Check, Constraint, FieldSpec, FieldType, RecordSchema};
pub use record::{Model, Record};
pub use validate::validate;

pub(crate) use validate::validate_field;

impl RecordSchema {
    /// Shorthand for [`validate(self, input)`](validate).
    pub fn validate(&self, input: &serde_json::Value) -> Result<Record, crate::ValidationErrors> {
        validate(self, input)
    }
}
