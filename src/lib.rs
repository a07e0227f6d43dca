//! # vetted
//!
//! Validated request pipelines for Rust HTTP services.
//!
//! A handler declares what it needs: typed path and query parameters, JSON
//! bodies described by a [`RecordSchema`], and named [`Dependency`]
//! resolvers. vetted binds, coerces and checks all of it before the handler
//! runs. A bad request never reaches your code. It gets a `422` listing every
//! problem at once, or the status a resolver raised (`401`, `404`, ...).
//!
//! ## The pipeline
//!
//! - **Schema validation**: lax coercion (`"42"` is an int), built-in
//!   constraints, custom checks, nested records and lists. Every violation
//!   carries a dotted path such as `addresses.1.zip_code`.
//! - **Parameter binding**: path, query and body sources merged into one
//!   [`Args`] map, with defaults and optionals.
//! - **Dependency resolution**: resolvers ordered so each runs after what it
//!   needs; cycles are caught when the endpoint is built, not per request.
//!
//! Routing ([`matchit`]) and the wire (hyper, HTTP/1.1 and HTTP/2) sit
//! underneath, with graceful shutdown on SIGTERM / Ctrl-C.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use vetted::{
//!     Dependency, Endpoint, FieldSpec, FieldType, HttpError, Inputs, Json, Param,
//!     RecordSchema, Router, Scope, Server,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let user = RecordSchema::new("User")
//!         .field(FieldSpec::new("name", FieldType::Str).min_length(1))
//!         .field(FieldSpec::new("email", FieldType::Email))
//!         .field(FieldSpec::new("age", FieldType::Int).optional().ge(0.0));
//!
//!     let admin = Dependency::from_fn("admin", |s: &Scope<'_>| {
//!         match s.args().get_str("token") {
//!             Some("letmein") => Ok("admin"),
//!             _ => Err(HttpError::unauthorized("Invalid Credentials")),
//!         }
//!     })
//!     .param(Param::query("token", FieldType::Str));
//!
//!     let create_user = Endpoint::builder()
//!         .param(Param::body("user", user))
//!         .depends(admin)
//!         .handler(|inputs: Inputs| async move {
//!             Json(json!({"created": inputs.body("user").map(|u| u.to_value())}))
//!         })
//!         .build()
//!         .unwrap();
//!
//!     let app = Router::new().post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod depends;
mod endpoint;
mod error;
mod handler;
mod method;
mod params;
mod rejection;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod schema;

pub use depends::{Dependencies, Dependency, Lookup, Resolved, Resolver, Scope};
pub use endpoint::{Endpoint, EndpointBuilder, Inputs, Stage};
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use params::{Args, Param, Source, bind};
pub use rejection::{FieldPath, HttpError, Rejection, Segment, ValidationErrors, Violation, ViolationKind};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use schema::{Check, Constraint, FieldSpec, FieldType, Model, Record, RecordSchema, validate};
pub use server::{DEFAULT_BODY_LIMIT, Server};
pub use status::Status;
