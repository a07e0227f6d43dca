//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, an [`HttpError`](crate::HttpError) raised by
//! a resolver, or as a bare handler return value.
//!
//! Every status also has a machine-readable *classification*, the slug that
//! appears in the `"status"` field of error payloads:
//!
//! | Status | Classification |
//! |---|---|
//! | `401 Unauthorized` | `unauthorized` |
//! | `404 Not Found` | `not-found` |
//! | `422 Unprocessable Content` | `unprocessable` |
//! | `503 Service Unavailable` | `service-unavailable` |
//!
//! ```rust
//! use vetted::Status;
//!
//! assert_eq!(Status::NotFound.code(), 404);
//! assert_eq!(Status::NotFound.classification(), "not-found");
//! ```

use std::fmt;

/// The HTTP status codes an API built on vetted is expected to send.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200
    Created,                       // 201
    Accepted,                      // 202
    NoContent,                     // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,                    // 400
    Unauthorized,                  // 401
    Forbidden,                     // 403
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    Conflict,                      // 409
    Gone,                          // 410
    ContentTooLarge,               // 413
    UnsupportedMediaType,          // 415
    UnprocessableContent,          // 422
    TooManyRequests,               // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
    NotImplemented,                // 501
    BadGateway,                    // 502
    ServiceUnavailable,            // 503
    GatewayTimeout,                // 504
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::Created              => 201,
            Self::Accepted             => 202,
            Self::NoContent            => 204,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::Forbidden            => 403,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::Conflict             => 409,
            Self::Gone                 => 410,
            Self::ContentTooLarge      => 413,
            Self::UnsupportedMediaType => 415,
            Self::UnprocessableContent => 422,
            Self::TooManyRequests      => 429,
            Self::InternalServerError  => 500,
            Self::NotImplemented       => 501,
            Self::BadGateway           => 502,
            Self::ServiceUnavailable   => 503,
            Self::GatewayTimeout       => 504,
        }
    }

    /// RFC 9110 reason phrase (e.g. `"Not Found"`).
    pub fn reason(self) -> &'static str {
        match self {
            Self::Ok                   => "OK",
            Self::Created              => "Created",
            Self::Accepted             => "Accepted",
            Self::NoContent            => "No Content",
            Self::BadRequest           => "Bad Request",
            Self::Unauthorized         => "Unauthorized",
            Self::Forbidden            => "Forbidden",
            Self::NotFound             => "Not Found",
            Self::MethodNotAllowed     => "Method Not Allowed",
            Self::Conflict             => "Conflict",
            Self::Gone                 => "Gone",
            Self::ContentTooLarge      => "Content Too Large",
            Self::UnsupportedMediaType => "Unsupported Media Type",
            Self::UnprocessableContent => "Unprocessable Content",
            Self::TooManyRequests      => "Too Many Requests",
            Self::InternalServerError  => "Internal Server Error",
            Self::NotImplemented       => "Not Implemented",
            Self::BadGateway           => "Bad Gateway",
            Self::ServiceUnavailable   => "Service Unavailable",
            Self::GatewayTimeout       => "Gateway Timeout",
        }
    }

    /// Machine-readable classification used in error payloads.
    ///
    /// The reason phrase in kebab case, except `422` which is reported as
    /// `unprocessable`.
    pub fn classification(self) -> String {
        match self {
            Self::UnprocessableContent => "unprocessable".to_owned(),
            other => other.reason().to_ascii_lowercase().replace(' ', "-"),
        }
    }

    /// `true` for 4xx and 5xx codes.
    pub fn is_error(self) -> bool {
        self.code() >= 400
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 { s.code() }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> Self {
        // Every variant is a registered code, so this never falls back.
        http::StatusCode::from_u16(s.code()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
