//! The validation algorithm.
//!
//! Fields are visited in declaration order. Each one is either produced
//! (present and valid, or defaulted) or contributes exactly one violation;
//! validation never stops at the first bad field. Nested schemas and list
//! items are validated with the same routine, so their violations carry the
//! full path down to the offending value.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value};

use super::field::{FieldSpec, FieldType, RecordSchema};
use super::record::Record;
use crate::rejection::{FieldPath, ValidationErrors, Violation, ViolationKind};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
});

/// Validates `input` against `schema`.
///
/// On success every field of the returned [`Record`] has its declared type and
/// satisfies all of its constraints and validators. On failure no record is
/// produced; the error lists every violation found.
///
/// ```rust
/// use serde_json::json;
/// use vetted::{FieldSpec, FieldType, RecordSchema, validate};
///
/// let user = RecordSchema::new("User")
///     .field(FieldSpec::new("id", FieldType::Int))
///     .field(FieldSpec::new("name", FieldType::Str).min_length(2));
///
/// let record = validate(&user, &json!({"id": "7", "name": "Al"})).unwrap();
/// assert_eq!(record.get_i64("id"), Some(7));
///
/// let errors = validate(&user, &json!({"id": "x", "name": "A"})).unwrap_err();
/// assert_eq!(errors.len(), 2);
/// ```
pub fn validate(schema: &RecordSchema, input: &Value) -> Result<Record, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let fields = validate_object(schema, input, &FieldPath::root(), &mut errors);
    match fields {
        Some(fields) if errors.is_empty() => Ok(Record::new(schema.name(), fields)),
        _ => Err(errors),
    }
}

/// Validates a JSON object against `schema`, reporting under `path`.
fn validate_object(
    schema: &RecordSchema,
    input: &Value,
    path: &FieldPath,
    errors: &mut ValidationErrors,
) -> Option<Map<String, Value>> {
    let Some(obj) = input.as_object() else {
        errors.push(Violation::new(
            path.clone(),
            ViolationKind::TypeMismatch,
            "Input should be a valid object",
        ));
        return None;
    };

    let before = errors.len();
    let mut out = Map::new();
    for spec in schema.fields() {
        if let Some(value) = validate_field(spec, obj.get(spec.name()), &path.child(spec.name()), errors) {
            out.insert(spec.name().to_owned(), value);
        }
    }
    (errors.len() == before).then_some(out)
}

/// Validates one field's raw value. Returns the value to store, or `None`
/// after recording exactly one violation for it (nested values may record
/// several).
pub(crate) fn validate_field(
    spec: &FieldSpec,
    raw: Option<&Value>,
    path: &FieldPath,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let raw = match raw {
        Some(v) => v,
        None => {
            return match (&spec.default, spec.optional) {
                (Some(default), _) => Some(default.clone()),
                (None, true)       => Some(Value::Null),
                (None, false)      => {
                    errors.push(Violation::missing(path.clone()));
                    None
                }
            };
        }
    };

    if raw.is_null() && spec.optional {
        return Some(Value::Null);
    }

    let value = coerce(&spec.ty, raw, path, errors)?;

    if let Some(message) = spec.constraints.iter().find_map(|c| c.check(&value).err()) {
        errors.push(Violation::new(path.clone(), ViolationKind::ConstraintViolation, message));
        return None;
    }

    spec.checks.iter().try_fold(value, |value, check| match check(value) {
        Ok(next) => Some(next),
        Err(message) => {
            errors.push(Violation::new(path.clone(), ViolationKind::CustomValidationFailure, message));
            None
        }
    })
}

// ── Coercion ──────────────────────────────────────────────────────────────────

fn coerce(ty: &FieldType, raw: &Value, path: &FieldPath, errors: &mut ValidationErrors) -> Option<Value> {
    let result = match ty {
        FieldType::Str   => coerce_str(raw),
        FieldType::Int   => coerce_int(raw),
        FieldType::Float => coerce_float(raw),
        FieldType::Bool  => coerce_bool(raw),
        FieldType::Email => coerce_email(raw),
        FieldType::Any   => Ok(raw.clone()),
        FieldType::List(item) => return coerce_list(item, raw, path, errors),
        FieldType::Record(schema) => {
            return validate_object(schema, raw, path, errors).map(Value::Object);
        }
    };
    result
        .map_err(|message| errors.push(Violation::new(path.clone(), ViolationKind::TypeMismatch, message)))
        .ok()
}

fn coerce_list(item: &FieldType, raw: &Value, path: &FieldPath, errors: &mut ValidationErrors) -> Option<Value> {
    let Some(items) = raw.as_array() else {
        errors.push(Violation::new(path.clone(), ViolationKind::TypeMismatch, "Input should be a valid list"));
        return None;
    };
    let coerced: Vec<Option<Value>> = items
        .iter()
        .enumerate()
        .map(|(i, v)| coerce(item, v, &path.index(i), errors))
        .collect();
    coerced.into_iter().collect::<Option<Vec<_>>>().map(Value::Array)
}

fn coerce_str(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(_) => Ok(raw.clone()),
        _ => Err("Input should be a valid string".to_owned()),
    }
}

fn coerce_int(raw: &Value) -> Result<Value, String> {
    const MSG: &str = "Input should be a valid integer";
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            if n.is_u64() {
                return Err(format!("{MSG}, number is out of range"));
            }
            // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(Value::from(f as i64))
                }
                Some(f) if f.fract() != 0.0 => {
                    Err(format!("{MSG}, got a number with a fractional part"))
                }
                _ => Err(MSG.to_owned()),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("{MSG}, unable to parse string as an integer")),
        _ => Err(MSG.to_owned()),
    }
}

fn coerce_float(raw: &Value) -> Result<Value, String> {
    const MSG: &str = "Input should be a valid number";
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => Some(f),
            Err(_) => return Err(format!("{MSG}, unable to parse string as a number")),
        },
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| MSG.to_owned())
}

fn coerce_bool(raw: &Value) -> Result<Value, String> {
    const MSG: &str = "Input should be a valid boolean";
    match raw {
        Value::Bool(_) => Ok(raw.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(MSG.to_owned()),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y"  => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "f" | "n" => Ok(Value::Bool(false)),
            _ => Err(format!("{MSG}, unable to interpret input")),
        },
        _ => Err(MSG.to_owned()),
    }
}

fn coerce_email(raw: &Value) -> Result<Value, String> {
    let Value::String(s) = raw else {
        return Err("Input should be a valid string".to_owned());
    };
    if !EMAIL.is_match(s) {
        return Err("value is not a valid email address".to_owned());
    }
    match s.rsplit_once('@') {
        Some((local, domain)) => Ok(Value::String(format!("{local}@{}", domain.to_ascii_lowercase()))),
        None => Err("value is not a valid email address".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn check(ty: FieldType, raw: Value) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let spec = FieldSpec::new("v", ty);
        match validate_field(&spec, Some(&raw), &FieldPath::key("v"), &mut errors) {
            Some(v) if errors.is_empty() => Ok(v),
            _ => Err(errors),
        }
    }

    #[test]
    fn int_accepts_numeric_strings_and_whole_floats() {
        assert_eq!(check(FieldType::Int, json!("42")).unwrap(), json!(42));
        assert_eq!(check(FieldType::Int, json!(3.0)).unwrap(), json!(3));
        assert!(check(FieldType::Int, json!(3.5)).is_err());
        assert!(check(FieldType::Int, json!(true)).is_err());
    }

    #[test]
    fn int_rejects_values_past_i64_instead_of_saturating() {
        assert_eq!(check(FieldType::Int, json!(i64::MAX)).unwrap(), json!(i64::MAX));

        let errors = check(FieldType::Int, json!(9_223_372_036_854_775_808_u64)).unwrap_err();
        assert_eq!(errors.violations()[0].kind, ViolationKind::TypeMismatch);

        // 2^63 as a float rounds onto i64::MAX as f64.
        assert!(check(FieldType::Int, json!(9.223_372_036_854_775_808e18)).is_err());
        assert!(check(FieldType::Int, json!(-9.223_372_036_854_775_808e18)).is_ok());
    }

    #[test]
    fn int_string_failure_says_why() {
        let errors = check(FieldType::Int, json!("not_an_int")).unwrap_err();
        let v = &errors.violations()[0];
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert_eq!(v.message, "Input should be a valid integer, unable to parse string as an integer");
    }

    #[test]
    fn float_widens_integers() {
        assert_eq!(check(FieldType::Float, json!(10)).unwrap(), json!(10.0));
        assert_eq!(check(FieldType::Float, json!("2.5")).unwrap(), json!(2.5));
        assert!(check(FieldType::Float, json!("cheap")).is_err());
    }

    #[test]
    fn str_does_not_stringify_numbers() {
        assert!(check(FieldType::Str, json!(5)).is_err());
        assert_eq!(check(FieldType::Str, json!("5")).unwrap(), json!("5"));
    }

    #[test]
    fn bool_interprets_common_spellings() {
        assert_eq!(check(FieldType::Bool, json!("Yes")).unwrap(), json!(true));
        assert_eq!(check(FieldType::Bool, json!(0)).unwrap(), json!(false));
        assert!(check(FieldType::Bool, json!("maybe")).is_err());
        assert!(check(FieldType::Bool, json!(2)).is_err());
    }

    #[test]
    fn email_lowercases_only_the_domain() {
        assert_eq!(
            check(FieldType::Email, json!("RaMESHAjaved1@Example.com")).unwrap(),
            json!("RaMESHAjaved1@example.com")
        );
        assert!(check(FieldType::Email, json!("Rameshajaved12gmail.com")).is_err());
        assert!(check(FieldType::Email, json!("a@b")).is_err());
    }

    #[test]
    fn null_is_a_type_mismatch_unless_optional() {
        assert!(check(FieldType::Int, Value::Null).is_err());

        let mut errors = ValidationErrors::new();
        let spec = FieldSpec::new("age", FieldType::Int).optional();
        let v = validate_field(&spec, Some(&Value::Null), &FieldPath::key("age"), &mut errors);
        assert_eq!(v, Some(Value::Null));
        assert!(errors.is_empty());
    }

    #[test]
    fn list_items_report_their_index() {
        let errors = check(FieldType::list(FieldType::Int), json!([1, "two", 3, "four"])).unwrap_err();
        let paths: Vec<String> = errors.iter().map(|v| v.path.to_string()).collect();
        assert_eq!(paths, ["v.1", "v.3"]);
    }

    #[test]
    fn only_first_failing_constraint_is_reported() {
        let spec = FieldSpec::new("q", FieldType::Str).min_length(3).pattern("^x");
        let mut errors = ValidationErrors::new();
        let out = validate_field(&spec, Some(&json!("ab")), &FieldPath::key("q"), &mut errors);
        assert!(out.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.violations()[0].message, "String should have at least 3 characters");
    }

    #[test]
    fn checks_run_after_constraints_and_may_rewrite() {
        let spec = FieldSpec::new("name", FieldType::Str)
            .min_length(1)
            .check(|v| Ok(Value::String(v.as_str().unwrap_or_default().trim().to_owned())))
            .check(|v| if v == "root" { Err("reserved name".to_owned()) } else { Ok(v) });

        let mut errors = ValidationErrors::new();
        let path = FieldPath::key("name");
        assert_eq!(validate_field(&spec, Some(&json!(" al ")), &path, &mut errors), Some(json!("al")));
        assert_eq!(validate_field(&spec, Some(&json!(" root")), &path, &mut errors), None);
        assert_eq!(errors.violations()[0].kind, ViolationKind::CustomValidationFailure);
        assert_eq!(errors.violations()[0].message, "reserved name");

        // A failed constraint skips the custom checks entirely.
        let mut errors = ValidationErrors::new();
        assert_eq!(validate_field(&spec, Some(&json!("")), &path, &mut errors), None);
        assert_eq!(errors.violations()[0].kind, ViolationKind::ConstraintViolation);
    }

    #[test]
    fn non_object_input_fails_at_root() {
        let schema = RecordSchema::new("User").field(FieldSpec::new("id", FieldType::Int));
        let errors = validate(&schema, &json!([1, 2])).unwrap_err();
        assert_eq!(errors.violations()[0].path, FieldPath::root());
        assert_eq!(errors.violations()[0].kind, ViolationKind::TypeMismatch);
    }
}
