//! Request rejections and the structured error payload.
//!
//! A request is rejected in one of three ways, each tied to the pipeline
//! stage that produced it:
//!
//! | Rejection | Stage | Status |
//! |---|---|---|
//! | [`Rejection::RouteMismatch`] | `Binding` | `404` |
//! | [`Rejection::Invalid`] | `Validating` | `422` |
//! | [`Rejection::Dependency`] | `ResolvingDependencies` | whatever the resolver raised |
//!
//! Field-level problems are collected into one [`ValidationErrors`] report so
//! the caller sees every violation at once. A resolver failure is never mixed
//! into that report: it aborts the request on its own.
//!
//! Every rejection renders the same JSON shape:
//!
//! ```json
//! {
//!   "status": "unprocessable",
//!   "detail": [
//!     {"loc": "query.limit", "kind": "constraint_violation", "msg": "Input should be less than or equal to 100"}
//!   ]
//! }
//! ```

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::endpoint::Stage;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

// ── FieldPath ─────────────────────────────────────────────────────────────────

/// One step in a [`FieldPath`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the request, rendered dotted:
/// `body.addresses.1.zip_code`. The empty path renders as `$root`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self { Self(Vec::new()) }

    pub fn key(name: impl Into<String>) -> Self {
        Self(vec![Segment::Key(name.into())])
    }

    pub fn segments(&self) -> &[Segment] { &self.0 }
    pub fn is_root(&self) -> bool { self.0.is_empty() }

    /// Returns `self` extended by a key segment.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(name.to_owned()));
        Self(segments)
    }

    /// Returns `self` extended by a list index segment.
    pub fn index(&self, i: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(i));
        Self(segments)
    }

    /// Returns `self` with `name` prepended, used when a nested report is
    /// lifted into its parent.
    pub fn prefixed(&self, name: &str) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(Segment::Key(name.to_owned()));
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                Segment::Key(k)   => f.write_str(k)?,
                Segment::Index(n) => write!(f, "{n}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

// ── Violations ────────────────────────────────────────────────────────────────

/// What went wrong with a single value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Required field or parameter absent.
    MissingRequiredField,
    /// Present but not coercible to the declared type.
    TypeMismatch,
    /// Correct type, outside a declared bound (length, range, pattern).
    ConstraintViolation,
    /// A user-supplied validator rejected the value.
    CustomValidationFailure,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequiredField    => "missing_required_field",
            Self::TypeMismatch            => "type_mismatch",
            Self::ConstraintViolation     => "constraint_violation",
            Self::CustomValidationFailure => "custom_validation_failure",
        }
    }
}

/// One field-level problem.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Violation {
    #[serde(rename = "loc")]
    pub path: FieldPath,
    pub kind: ViolationKind,
    #[serde(rename = "msg")]
    pub message: String,
}

impl Violation {
    pub fn new(path: FieldPath, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self { path, kind, message: message.into() }
    }

    pub fn missing(path: FieldPath) -> Self {
        Self::new(path, ViolationKind::MissingRequiredField, "Field required")
    }
}

/// Every violation found while validating one input, in discovery order.
///
/// Never empty when returned as an error.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn push(&mut self, violation: Violation) { self.0.push(violation); }
    pub fn extend(&mut self, other: ValidationErrors) { self.0.extend(other.0); }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> impl Iterator<Item = &Violation> { self.0.iter() }
    pub fn violations(&self) -> &[Violation] { &self.0 }

    /// Violations reported at exactly `path` (dotted form, e.g. `"addresses.1.zip_code"`).
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.0.iter().filter(move |v| v.path.to_string() == path)
    }

    /// Nests every violation under `name`.
    pub fn prefixed(self, name: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|v| Violation { path: v.path.prefixed(name), ..v })
                .collect(),
        )
    }

    /// `Ok(value)` when no violation was collected, the report otherwise.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.0.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.len();
        write!(f, "{n} validation error{}", if n == 1 { "" } else { "s" })?;
        for v in &self.0 {
            write!(f, "\n{}\n  {} [{}]", v.path, v.message, v.kind.as_str())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl FromIterator<Violation> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── HttpError ─────────────────────────────────────────────────────────────────

/// A terminal failure raised by a resolver: a status plus a message.
///
/// ```rust
/// use vetted::{HttpError, Status};
///
/// let err = HttpError::unauthorized("Invalid Credentials")
///     .with_header("www-authenticate", "Basic");
/// assert_eq!(err.status(), Status::Unauthorized);
/// ```
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{status}: {detail}")]
pub struct HttpError {
    status: Status,
    detail: String,
    headers: Vec<(String, String)>,
}

impl HttpError {
    pub fn new(status: Status, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into(), headers: Vec::new() }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self { Self::new(Status::BadRequest, detail) }
    pub fn unauthorized(detail: impl Into<String>) -> Self { Self::new(Status::Unauthorized, detail) }
    pub fn forbidden(detail: impl Into<String>) -> Self { Self::new(Status::Forbidden, detail) }
    pub fn not_found(detail: impl Into<String>) -> Self { Self::new(Status::NotFound, detail) }

    /// Adds a header sent along with the error response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn status(&self) -> Status { self.status }
    pub fn detail(&self) -> &str { &self.detail }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
}

// ── Rejection ─────────────────────────────────────────────────────────────────

/// Why a request never reached its handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rejection {
    /// A path parameter was absent: the request does not address this endpoint.
    RouteMismatch { param: String },
    /// One or more parameters or body fields failed validation.
    Invalid(ValidationErrors),
    /// A resolver rejected the request. Reported verbatim.
    Dependency { name: String, error: HttpError },
}

impl Rejection {
    /// The stage that produced this rejection.
    pub fn stage(&self) -> Stage {
        match self {
            Self::RouteMismatch { .. } => Stage::Binding,
            Self::Invalid(_)           => Stage::Validating,
            Self::Dependency { .. }    => Stage::ResolvingDependencies,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::RouteMismatch { .. }     => Status::NotFound,
            Self::Invalid(_)               => Status::UnprocessableContent,
            Self::Dependency { error, .. } => error.status(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteMismatch { param } => write!(f, "missing path parameter `{param}`"),
            Self::Invalid(errors)         => write!(f, "{errors}"),
            Self::Dependency { name, error } => write!(f, "dependency `{name}` failed: {error}"),
        }
    }
}

impl std::error::Error for Rejection {}

impl From<ValidationErrors> for Rejection {
    fn from(errors: ValidationErrors) -> Self { Self::Invalid(errors) }
}

// ── Payload ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Payload<'a> {
    status: String,
    detail: Vec<Entry<'a>>,
}

#[derive(Serialize)]
struct Entry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    loc: Option<&'a FieldPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ViolationKind>,
    msg: &'a str,
}

fn render(status: Status, detail: Vec<Entry<'_>>, headers: &[(String, String)]) -> Response {
    let payload = Payload { status: status.classification(), detail };
    let Ok(bytes) = serde_json::to_vec(&payload) else {
        return Response::status(Status::InternalServerError);
    };
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.json(bytes)
}

fn violation_entries(errors: &ValidationErrors) -> Vec<Entry<'_>> {
    errors
        .iter()
        .map(|v| Entry { loc: Some(&v.path), kind: Some(v.kind), msg: &v.message })
        .collect()
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        render(Status::UnprocessableContent, violation_entries(&self), &[])
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let entry = Entry { loc: None, kind: None, msg: &self.detail };
        render(self.status, vec![entry], &self.headers)
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Self::RouteMismatch { param } => {
                let msg = format!("missing path parameter `{param}`");
                render(Status::NotFound, vec![Entry { loc: None, kind: None, msg: &msg }], &[])
            }
            Self::Invalid(errors)         => errors.into_response(),
            Self::Dependency { error, .. } => error.into_response(),
        }
    }
}
