use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::LazyLock;

use vetted::{FieldSpec, FieldType, Model, RecordSchema, ViolationKind, validate};

fn user() -> RecordSchema {
    RecordSchema::new("User")
        .field(FieldSpec::new("id", FieldType::Int))
        .field(FieldSpec::new("name", FieldType::Str).min_length(2))
        .field(FieldSpec::new("email", FieldType::Email))
}

fn customer() -> RecordSchema {
    let address = RecordSchema::new("Address")
        .field(FieldSpec::new("street", FieldType::Str))
        .field(FieldSpec::new("city", FieldType::Str))
        .field(FieldSpec::new("zip_code", FieldType::Str).pattern(r"^\d{5}$"));

    RecordSchema::new("Customer")
        .field(FieldSpec::new("name", FieldType::Str))
        .field(FieldSpec::new("age", FieldType::Int).optional())
        .field(FieldSpec::new("addresses", FieldType::list(FieldType::record(address))))
}

#[test]
fn valid_input_keeps_its_fields() {
    let input = json!({"id": 1, "name": "Al", "email": "a@b.com"});
    let record = validate(&user(), &input).unwrap();
    assert_eq!(record.to_value(), input);
}

#[test]
fn uncoercible_id_is_one_type_mismatch() {
    let input = json!({"id": "x", "name": "Bob", "email": "bob@example.com"});
    let errors = validate(&user(), &input).unwrap_err();

    assert_eq!(errors.len(), 1);
    let v = &errors.violations()[0];
    assert_eq!(v.path.to_string(), "id");
    assert_eq!(v.kind, ViolationKind::TypeMismatch);
}

#[test]
fn missing_required_field_is_named() {
    let errors = validate(&user(), &json!({"id": 1, "name": "Al"})).unwrap_err();
    let missing: Vec<_> = errors.at("email").collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].kind, ViolationKind::MissingRequiredField);
    assert_eq!(missing[0].message, "Field required");
}

#[test]
fn one_constraint_violation_per_violated_field() {
    let schema = RecordSchema::new("Query")
        .field(FieldSpec::new("q", FieldType::Str).min_length(3).max_length(50).pattern("^[a-z]+$"))
        .field(FieldSpec::new("skip", FieldType::Int).ge(0.0))
        .field(FieldSpec::new("limit", FieldType::Int).le(100.0));

    // `q` breaks two of its constraints but is reported once; `skip` complies.
    let errors = validate(&schema, &json!({"q": "A1", "skip": 0, "limit": 1000})).unwrap_err();
    let kinds: Vec<_> = errors.iter().map(|v| (v.path.to_string(), v.kind)).collect();
    assert_eq!(
        kinds,
        [
            ("q".to_owned(), ViolationKind::ConstraintViolation),
            ("limit".to_owned(), ViolationKind::ConstraintViolation),
        ]
    );
    assert_eq!(errors.at("limit").next().unwrap().message, "Input should be less than or equal to 100");
}

#[test]
fn every_problem_is_reported_at_once() {
    let errors = validate(&user(), &json!({"id": "x", "name": "B"})).unwrap_err();
    let paths: Vec<_> = errors.iter().map(|v| v.path.to_string()).collect();
    assert_eq!(paths, ["id", "name", "email"]);
}

#[test]
fn nested_list_violation_carries_the_index() {
    let input = json!({
        "name": "Ramesha",
        "addresses": [
            {"street": "1 Main St", "city": "Lahore", "zip_code": "54000"},
            {"street": "2 Side St", "city": "Karachi", "zip_code": "7400"},
        ],
    });
    let errors = validate(&customer(), &input).unwrap_err();

    assert_eq!(errors.len(), 1);
    let v = &errors.violations()[0];
    assert_eq!(v.path.to_string(), "addresses.1.zip_code");
    assert_eq!(v.kind, ViolationKind::ConstraintViolation);
}

#[test]
fn optional_field_defaults_to_null() {
    let record = validate(&customer(), &json!({"name": "Ali", "addresses": []})).unwrap();
    assert_eq!(record.get("age"), Some(&Value::Null));
}

#[test]
fn validate_encode_validate_is_idempotent() {
    let input = json!({
        "name": "Ramesha",
        "age": "30",
        "addresses": [{"street": "1 Main St", "city": "Lahore", "zip_code": "54000"}],
        "ignored": true,
    });
    let first = validate(&customer(), &input).unwrap();
    let second = validate(&customer(), &first.to_value()).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.get_i64("age"), Some(30));
    assert!(second.get("ignored").is_none());
}

#[test]
fn non_object_input_fails_at_root() {
    let errors = validate(&user(), &json!([1, 2, 3])).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.violations()[0].path.to_string(), "$root");
    assert_eq!(errors.violations()[0].kind, ViolationKind::TypeMismatch);
}

#[test]
fn custom_validator_failure_is_reported_with_its_message() {
    let schema = RecordSchema::new("User").field(
        FieldSpec::new("name", FieldType::Str).check(|v| match v.as_str() {
            Some(s) if s.chars().all(char::is_alphabetic) => Ok(json!(s.to_uppercase())),
            _ => Err("Name must contain only alphabets".to_owned()),
        }),
    );

    let errors = validate(&schema, &json!({"name": "R2D2"})).unwrap_err();
    assert_eq!(errors.violations()[0].kind, ViolationKind::CustomValidationFailure);
    assert_eq!(errors.violations()[0].message, "Name must contain only alphabets");

    let record = validate(&schema, &json!({"name": "ramesha"})).unwrap();
    assert_eq!(record.get_str("name"), Some("RAMESHA"));
}

#[derive(Debug, Deserialize)]
struct Item {
    name: String,
    price: f64,
    tags: Vec<String>,
}

static ITEM: LazyLock<RecordSchema> = LazyLock::new(|| {
    RecordSchema::new("Item")
        .field(FieldSpec::new("name", FieldType::Str).min_length(1))
        .field(FieldSpec::new("price", FieldType::Float).gt(0.0))
        .field(FieldSpec::new("tags", FieldType::list(FieldType::Str)).default(json!([])))
});

impl Model for Item {
    fn schema() -> &'static RecordSchema { &ITEM }
}

#[test]
fn model_validates_then_deserializes() {
    let item = Item::validate(&json!({"name": "pen", "price": "2"})).unwrap();
    assert_eq!(item.name, "pen");
    assert_eq!(item.price, 2.0);
    assert!(item.tags.is_empty());

    let errors = Item::validate(&json!({"name": "", "price": -1})).unwrap_err();
    assert_eq!(errors.len(), 2);
}
