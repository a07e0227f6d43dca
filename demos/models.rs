//! Record schemas on their own: flat and nested models, optional fields,
//! email normalisation and custom validators.
//!
//! Run with:
//!   cargo run --example models

use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;

use vetted::{FieldSpec, FieldType, Model, RecordSchema, validate};

// ── Flat model ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct User {
    id: i64,
    name: String,
    email: String,
    age: Option<i64>,
}

static USER: LazyLock<RecordSchema> = LazyLock::new(|| {
    RecordSchema::new("User")
        .field(FieldSpec::new("id", FieldType::Int))
        .field(FieldSpec::new("name", FieldType::Str))
        .field(FieldSpec::new("email", FieldType::Str))
        .field(FieldSpec::new("age", FieldType::Int).optional())
});

impl Model for User {
    fn schema() -> &'static RecordSchema { &USER }
}

// ── Nested model ──────────────────────────────────────────────────────────────

fn address() -> RecordSchema {
    RecordSchema::new("Address")
        .field(FieldSpec::new("street", FieldType::Str))
        .field(FieldSpec::new("city", FieldType::Str))
        .field(FieldSpec::new("zip_code", FieldType::Str))
}

fn user_with_address() -> RecordSchema {
    RecordSchema::new("UserWithAddress")
        .field(FieldSpec::new("id", FieldType::Int))
        .field(FieldSpec::new("name", FieldType::Str).check(|v| {
            match v.as_str() {
                Some(s) if s.chars().count() < 2 => Err("Name must be at least 2 characters long".to_owned()),
                _ => Ok(v),
            }
        }))
        .field(FieldSpec::new("email", FieldType::Email))
        .field(FieldSpec::new("addresses", FieldType::list(FieldType::record(address()))))
}

fn main() {
    // Lax coercion: "1" is an int, age may be left out.
    match User::validate(&json!({"id": "1", "name": "Ramesha javed", "email": "Rameshajaved12gmail.com"})) {
        Ok(user) => println!("{user:?}"),
        Err(errors) => println!("{errors}"),
    }

    match validate(&USER, &json!({"id": "not_an_int", "name": "Bob", "email": "bob@example.com"})) {
        Ok(record) => println!("{}", record.to_value()),
        Err(errors) => println!("{errors}"),
    }

    let schema = user_with_address();

    // Email domains are lower-cased; the local part is kept as sent.
    let valid = json!({
        "id": 2,
        "name": "Ramesha javed",
        "email": "RaMESHAjaved1@Example.com",
        "addresses": [
            {"street": "09 ", "city": "karachi", "zip_code": "001"},
            {"street": "04", "city": "lahore", "zip_code": "001"},
        ],
    });
    match schema.validate(&valid) {
        Ok(record) => println!("{}", record.to_value()),
        Err(errors) => println!("{errors}"),
    }

    // Every problem is reported at once, each with its dotted path.
    let invalid = json!({
        "id": 3,
        "name": "R",
        "email": "Rameshajaved12gmail.com",
        "addresses": [{"street": "200", "city": "karachi"}],
    });
    match schema.validate(&invalid) {
        Ok(record) => println!("{}", record.to_value()),
        Err(errors) => println!("{errors}"),
    }
}
