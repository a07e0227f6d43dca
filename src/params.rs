//! Parameter binding: path segments, query entries and the JSON body.
//!
//! Each [`Param`] names its source and carries an ordinary [`FieldSpec`], so
//! parameters are coerced and constrained exactly like schema fields:
//!
//! ```rust
//! use vetted::{FieldType, Param, RecordSchema, FieldSpec};
//!
//! let item = RecordSchema::new("Item")
//!     .field(FieldSpec::new("name", FieldType::Str))
//!     .field(FieldSpec::new("price", FieldType::Float));
//!
//! let params = [
//!     Param::path("item_id", FieldType::Int).ge(1.0),
//!     Param::query("q", FieldType::Str).optional().min_length(3),
//!     Param::query("limit", FieldType::Int).default(10).le(100.0),
//!     Param::body("item", item).optional(),
//! ];
//! ```
//!
//! Binding never stops at the first bad parameter: every violation from every
//! source ends up in one report, with paths prefixed by the source
//! (`path.item_id`, `query.limit`, `body.price`).
//!
//! A single body parameter binds the whole body. With several body
//! parameters, each binds the body key of the same name
//! (`{"item": {...}, "user": {...}}`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::rejection::{FieldPath, Rejection, ValidationErrors, Violation, ViolationKind};
use crate::request::Request;
use crate::schema::{FieldSpec, FieldType, Record, RecordSchema, validate_field};

/// Where a parameter's raw value comes from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Source {
    Path,
    Query,
    Body,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path  => "path",
            Self::Query => "query",
            Self::Body  => "body",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Param ─────────────────────────────────────────────────────────────────────

/// One declared input of an endpoint or resolver.
#[derive(Clone, Debug)]
pub struct Param {
    source: Source,
    spec: FieldSpec,
}

impl Param {
    /// A path segment captured by the route template. Always required.
    pub fn path(name: impl Into<String>, ty: FieldType) -> Self {
        Self { source: Source::Path, spec: FieldSpec::new(name, ty) }
    }

    /// A query-string entry. Required unless made optional or defaulted.
    ///
    /// A `FieldType::List` query parameter collects every value sent for the
    /// key (`?tag=a&tag=b`).
    pub fn query(name: impl Into<String>, ty: FieldType) -> Self {
        Self { source: Source::Query, spec: FieldSpec::new(name, ty) }
    }

    /// A JSON body validated against `schema`.
    pub fn body(name: impl Into<String>, schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self { source: Source::Body, spec: FieldSpec::new(name, FieldType::Record(schema.into())) }
    }

    /// # Panics
    ///
    /// Panics on a path parameter: path segments are part of the address and
    /// cannot be left out.
    pub fn optional(self) -> Self {
        self.assert_not_path("optional");
        self.map(FieldSpec::optional)
    }

    /// # Panics
    ///
    /// Panics on a path parameter.
    pub fn default(self, value: impl Into<Value>) -> Self {
        self.assert_not_path("a default");
        let value = value.into();
        self.map(|s| s.default(value))
    }

    pub fn min_length(self, n: usize) -> Self { self.map(|s| s.min_length(n)) }
    pub fn max_length(self, n: usize) -> Self { self.map(|s| s.max_length(n)) }
    pub fn ge(self, bound: f64) -> Self { self.map(|s| s.ge(bound)) }
    pub fn gt(self, bound: f64) -> Self { self.map(|s| s.gt(bound)) }
    pub fn le(self, bound: f64) -> Self { self.map(|s| s.le(bound)) }
    pub fn lt(self, bound: f64) -> Self { self.map(|s| s.lt(bound)) }

    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    pub fn pattern(self, pattern: &str) -> Self { self.map(|s| s.pattern(pattern)) }

    pub fn check<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.map(|s| s.check(f))
    }

    pub fn title(self, title: &str) -> Self { self.map(|s| s.title(title)) }
    pub fn description(self, description: &str) -> Self { self.map(|s| s.description(description)) }

    pub fn name(&self) -> &str { self.spec.name() }
    pub fn source(&self) -> Source { self.source }
    pub fn spec(&self) -> &FieldSpec { &self.spec }

    /// Documentation entry for this parameter.
    pub fn describe(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("name".into(), self.name().into());
        entry.insert("in".into(), self.source.as_str().into());
        entry.insert("type".into(), self.spec.ty().type_name().into());
        entry.insert("required".into(), self.spec.is_required().into());
        if let Some(default) = self.spec.default_value() {
            entry.insert("default".into(), default.clone());
        }
        if let Some(title) = &self.spec.title {
            entry.insert("title".into(), title.as_str().into());
        }
        if let Some(description) = &self.spec.description {
            entry.insert("description".into(), description.as_str().into());
        }
        Value::Object(entry)
    }

    fn map(self, f: impl FnOnce(FieldSpec) -> FieldSpec) -> Self {
        Self { source: self.source, spec: f(self.spec) }
    }

    fn assert_not_path(&self, what: &str) {
        if self.source == Source::Path {
            panic!("path parameter `{}` cannot be given {what}", self.name());
        }
    }
}

// ── Args ──────────────────────────────────────────────────────────────────────

/// Fully bound parameters for one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: Map<String, Value>,
    bodies: HashMap<String, Record>,
}

impl Args {
    /// Bound path or query value. Optional parameters that were not sent are
    /// present as `null` (or their default).
    pub fn get(&self, name: &str) -> Option<&Value> { self.values.get(name) }

    pub fn get_str(&self, name: &str) -> Option<&str> { self.get(name).and_then(Value::as_str) }
    pub fn get_i64(&self, name: &str) -> Option<i64> { self.get(name).and_then(Value::as_i64) }
    pub fn get_f64(&self, name: &str) -> Option<f64> { self.get(name).and_then(Value::as_f64) }
    pub fn get_bool(&self, name: &str) -> Option<bool> { self.get(name).and_then(Value::as_bool) }

    /// Validated body bound to the parameter `name`; `None` when an optional
    /// body was not sent.
    pub fn body(&self, name: &str) -> Option<&Record> { self.bodies.get(name) }

    /// Path and query values as a JSON object, bodies nested under their
    /// parameter names.
    pub fn to_value(&self) -> Value {
        let mut out = self.values.clone();
        for (name, record) in &self.bodies {
            out.insert(name.clone(), record.to_value());
        }
        Value::Object(out)
    }
}

// ── Binding ───────────────────────────────────────────────────────────────────

/// Binds every parameter in one pass.
///
/// Returns [`Rejection::RouteMismatch`] as soon as a path parameter is absent,
/// otherwise [`Rejection::Invalid`] holding the violations of all sources.
pub fn bind(params: &[Param], req: &Request) -> Result<Args, Rejection> {
    let mut errors = ValidationErrors::new();
    let mut args = bind_segments(params, req, &mut errors)?;
    bind_bodies(params, req, &mut args, &mut errors);
    errors.into_result(|| args).map_err(Rejection::Invalid)
}

/// Binds path and query parameters, collecting violations into `errors`.
pub(crate) fn bind_segments(
    params: &[Param],
    req: &Request,
    errors: &mut ValidationErrors,
) -> Result<Args, Rejection> {
    let mut args = Args::default();

    for param in params {
        let name = param.name();
        let path = FieldPath::key(param.source.as_str()).child(name);
        let raw = match param.source {
            Source::Path => match req.param(name) {
                Some(v) => Some(Value::String(v.to_owned())),
                None => return Err(Rejection::RouteMismatch { param: name.to_owned() }),
            },
            Source::Query => query_value(req, name, param.spec.ty()),
            Source::Body => continue,
        };
        if let Some(value) = validate_field(&param.spec, raw.as_ref(), &path, errors) {
            args.values.insert(name.to_owned(), value);
        }
    }

    Ok(args)
}

fn query_value(req: &Request, name: &str, ty: &FieldType) -> Option<Value> {
    if let FieldType::List(_) = ty {
        let all: Vec<Value> = req
            .query_pairs()
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| Value::String(v.clone()))
            .collect();
        return (!all.is_empty()).then_some(Value::Array(all));
    }
    req.query(name).map(|v| Value::String(v.to_owned()))
}

/// Decodes the body and validates it against every body parameter.
pub(crate) fn bind_bodies(params: &[Param], req: &Request, args: &mut Args, errors: &mut ValidationErrors) {
    let bodies: Vec<&Param> = params.iter().filter(|p| p.source == Source::Body).collect();
    if bodies.is_empty() {
        return;
    }

    let root = FieldPath::key(Source::Body.as_str());
    let decoded = if req.body().iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(req.body()) {
            Ok(v) => Some(v),
            Err(e) => {
                errors.push(Violation::new(root, ViolationKind::TypeMismatch, format!("Invalid JSON: {e}")));
                return;
            }
        }
    };

    let embedded = bodies.len() > 1;
    for param in bodies {
        let (raw, path) = if embedded {
            let raw = match &decoded {
                Some(Value::Object(obj)) => obj.get(param.name()),
                _ => None,
            };
            (raw, root.child(param.name()))
        } else {
            (decoded.as_ref(), root.clone())
        };

        let (Some(value), FieldType::Record(schema)) =
            (validate_field(&param.spec, raw, &path, errors), param.spec.ty())
        else {
            continue;
        };
        if let Value::Object(fields) = value {
            args.bodies.insert(param.name().to_owned(), Record::new(schema.name(), fields));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::method::Method;

    fn item() -> RecordSchema {
        RecordSchema::new("Item")
            .field(FieldSpec::new("name", FieldType::Str))
            .field(FieldSpec::new("description", FieldType::Str).optional())
            .field(FieldSpec::new("price", FieldType::Float))
    }

    fn listing() -> Vec<Param> {
        vec![
            Param::query("q", FieldType::Str).optional().min_length(3).max_length(50),
            Param::query("skip", FieldType::Int).default(0).ge(0.0),
            Param::query("limit", FieldType::Int).default(10).le(100.0),
        ]
    }

    fn paths(errors: &ValidationErrors) -> Vec<String> {
        errors.iter().map(|v| v.path.to_string()).collect()
    }

    #[test]
    fn query_defaults_apply_when_absent() {
        let req = Request::builder(Method::Get, "/items/").build();
        let args = bind(&listing(), &req).unwrap();
        assert_eq!(args.get("q"), Some(&Value::Null));
        assert_eq!(args.get_i64("skip"), Some(0));
        assert_eq!(args.get_i64("limit"), Some(10));
    }

    #[test]
    fn query_strings_are_coerced() {
        let req = Request::builder(Method::Get, "/items/?q=shoes&skip=20&limit=5").build();
        let args = bind(&listing(), &req).unwrap();
        assert_eq!(args.to_value(), json!({"q": "shoes", "skip": 20, "limit": 5}));
    }

    #[test]
    fn every_out_of_bounds_parameter_is_reported() {
        let req = Request::builder(Method::Get, "/items/?q=ab&skip=-1&limit=500").build();
        let Err(Rejection::Invalid(errors)) = bind(&listing(), &req) else {
            panic!("expected a validation failure");
        };
        assert_eq!(paths(&errors), ["query.q", "query.skip", "query.limit"]);
        assert!(errors.iter().all(|v| v.kind == ViolationKind::ConstraintViolation));
    }

    #[test]
    fn missing_path_parameter_is_a_route_mismatch() {
        let params = [Param::path("item_id", FieldType::Int)];
        let req = Request::builder(Method::Get, "/items/").build();
        assert_eq!(
            bind(&params, &req),
            Err(Rejection::RouteMismatch { param: "item_id".into() })
        );
    }

    #[test]
    fn path_parameters_are_coerced_and_bounded() {
        let params = [Param::path("item_id", FieldType::Int).ge(1.0)];

        let ok = Request::builder(Method::Get, "/items/7").param("item_id", "7").build();
        assert_eq!(bind(&params, &ok).unwrap().get_i64("item_id"), Some(7));

        let zero = Request::builder(Method::Get, "/items/0").param("item_id", "0").build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &zero) else { panic!() };
        assert_eq!(paths(&errors), ["path.item_id"]);

        let word = Request::builder(Method::Get, "/items/abc").param("item_id", "abc").build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &word) else { panic!() };
        assert_eq!(errors.violations()[0].kind, ViolationKind::TypeMismatch);
    }

    #[test]
    #[should_panic(expected = "path parameter `item_id` cannot be given a default")]
    fn path_parameter_rejects_default() {
        let _ = Param::path("item_id", FieldType::Int).default(1);
    }

    #[test]
    fn optional_body_may_be_absent() {
        let params = [Param::body("item", item()).optional()];
        let req = Request::builder(Method::Put, "/items/validated/1").build();
        let args = bind(&params, &req).unwrap();
        assert!(args.body("item").is_none());
    }

    #[test]
    fn required_body_must_be_present() {
        let params = [Param::body("item", item())];
        let req = Request::builder(Method::Put, "/items/validated/1").build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &req) else { panic!() };
        assert_eq!(paths(&errors), ["body"]);
        assert_eq!(errors.violations()[0].kind, ViolationKind::MissingRequiredField);
    }

    #[test]
    fn body_violations_are_prefixed() {
        let params = [Param::body("item", item())];
        let req = Request::builder(Method::Put, "/items/validated/1")
            .json(&json!({"name": 1, "price": "free"}))
            .build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &req) else { panic!() };
        assert_eq!(paths(&errors), ["body.name", "body.price"]);
    }

    #[test]
    fn malformed_json_is_a_single_type_mismatch() {
        let params = [Param::body("item", item())];
        let req = Request::builder(Method::Put, "/items/validated/1").body("{not json").build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &req) else { panic!() };
        assert_eq!(errors.len(), 1);
        assert_eq!(paths(&errors), ["body"]);
        assert!(errors.violations()[0].message.starts_with("Invalid JSON"));
    }

    #[test]
    fn several_body_parameters_are_embedded_by_name() {
        let user = RecordSchema::new("User").field(FieldSpec::new("username", FieldType::Str));
        let params = [Param::body("item", item()), Param::body("user", user)];
        let req = Request::builder(Method::Put, "/items/validated/1")
            .json(&json!({"item": {"name": "pen", "price": 2}, "user": {}}))
            .build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &req) else { panic!() };
        assert_eq!(paths(&errors), ["body.user.username"]);
    }

    #[test]
    fn list_query_collects_repeated_keys() {
        let params = [Param::query("tag", FieldType::list(FieldType::Str)).optional()];
        let req = Request::builder(Method::Get, "/items/?tag=a&tag=b").build();
        assert_eq!(bind(&params, &req).unwrap().get("tag"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn violations_across_sources_are_aggregated() {
        let params = [
            Param::path("item_id", FieldType::Int).ge(1.0),
            Param::query("q", FieldType::Str).optional().min_length(3),
            Param::body("item", item()).optional(),
        ];
        let req = Request::builder(Method::Put, "/items/validated/0?q=x")
            .param("item_id", "0")
            .json(&json!({"name": "pen"}))
            .build();
        let Err(Rejection::Invalid(errors)) = bind(&params, &req) else { panic!() };
        assert_eq!(paths(&errors), ["path.item_id", "query.q", "body.price"]);
    }

    #[test]
    fn describe_lists_metadata() {
        let p = Param::path("item_id", FieldType::Int).title("The ID of the item").ge(1.0);
        assert_eq!(
            p.describe(),
            json!({"name": "item_id", "in": "path", "type": "int", "required": true, "title": "The ID of the item"})
        );
    }
}
