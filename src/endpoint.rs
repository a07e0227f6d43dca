//! Endpoints: parameters, dependencies and a handler, run as one pipeline.
//!
//! Every request walks the same stages:
//!
//! ```text
//! Pending → Binding → Validating → ResolvingDependencies → Executing → Responded
//!              │           │                │
//!              └───────────┴────────────────┴──→ Failed
//! ```
//!
//! | Stage | Work | Fails with |
//! |---|---|---|
//! | `Binding` | path and query parameters | `404` when a path parameter is absent |
//! | `Validating` | JSON body against its schema | `422` listing every violation from both stages |
//! | `ResolvingDependencies` | resolvers, in dependency order | the first resolver's own status |
//! | `Executing` | the handler | never (the handler builds its own response) |
//!
//! Once a stage fails nothing after it runs.
//!
//! ```rust,no_run
//! use vetted::{Endpoint, FieldType, Inputs, Json, Method, Param, Router};
//! use serde_json::json;
//!
//! let read_item = Endpoint::builder()
//!     .param(Param::path("item_id", FieldType::Int).ge(1.0))
//!     .handler(|inputs: Inputs| async move {
//!         Json(json!({"item_id": inputs.args().get_i64("item_id")}))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let app = Router::new().on(Method::Get, "/items/{item_id}", read_item);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::depends::{Dependencies, Dependency, Resolved};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::params::{self, Args, Param, Source};
use crate::rejection::{Rejection, ValidationErrors};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::schema::Record;

// ── Stage ─────────────────────────────────────────────────────────────────────

/// Where a request is in the pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    Pending,
    Binding,
    Validating,
    ResolvingDependencies,
    Executing,
    Responded,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending               => "pending",
            Self::Binding               => "binding",
            Self::Validating            => "validating",
            Self::ResolvingDependencies => "resolving_dependencies",
            Self::Executing             => "executing",
            Self::Responded             => "responded",
            Self::Failed                => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Everything a handler receives: bound parameters and resolved dependencies.
#[derive(Debug)]
pub struct Inputs {
    args: Args,
    resolved: Resolved,
}

impl Inputs {
    pub fn args(&self) -> &Args { &self.args }
    pub fn resolved(&self) -> &Resolved { &self.resolved }

    /// Validated body bound to `name`, if one was sent.
    pub fn body(&self, name: &str) -> Option<&Record> { self.args.body(name) }

    /// Output of the dependency `name`.
    pub fn get<T: Any>(&self, dependency: &str) -> Option<&T> {
        self.resolved.get(dependency)
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

type InputHandler = Arc<dyn Fn(Inputs) -> BoxFuture + Send + Sync + 'static>;

/// A handler together with the parameters and dependencies it is fed from.
///
/// Built once at startup with [`Endpoint::builder`] and registered on a
/// [`Router`](crate::Router) like any other handler.
pub struct Endpoint {
    params: Vec<Param>,
    dependencies: Dependencies,
    handler: InputHandler,
}

impl Endpoint {
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder { params: Vec::new(), dependencies: Vec::new(), handler: None }
    }

    /// Every parameter bound for this endpoint, its dependencies' included.
    pub fn params(&self) -> &[Param] { &self.params }
    pub fn dependencies(&self) -> &Dependencies { &self.dependencies }

    /// Runs every stage before `Executing`.
    pub fn prepare(&self, req: &Request) -> Result<Inputs, Rejection> {
        self.stages(req).inspect_err(|rejection| {
            debug!(
                method = %req.method(),
                path = req.path(),
                stage = %Stage::Failed,
                failed_in = %rejection.stage(),
                status = rejection.status().code(),
                "request rejected"
            );
        })
    }

    fn stages(&self, req: &Request) -> Result<Inputs, Rejection> {
        let enter = |stage: Stage| debug!(method = %req.method(), path = req.path(), %stage);

        enter(Stage::Binding);
        let mut errors = ValidationErrors::new();
        let mut args = params::bind_segments(&self.params, req, &mut errors)?;

        enter(Stage::Validating);
        params::bind_bodies(&self.params, req, &mut args, &mut errors);
        if !errors.is_empty() {
            return Err(Rejection::Invalid(errors));
        }

        enter(Stage::ResolvingDependencies);
        let resolved = self.dependencies.resolve(&args)?;

        Ok(Inputs { args, resolved })
    }

    /// Runs the full pipeline and produces the response.
    pub async fn run(&self, req: Request) -> Response {
        self.call(req).await
    }

    pub(crate) fn call(&self, req: Request) -> BoxFuture {
        let inputs = match self.prepare(&req) {
            Ok(inputs) => inputs,
            Err(rejection) => return Box::pin(async move { rejection.into_response() }),
        };

        debug!(method = %req.method(), path = req.path(), stage = %Stage::Executing);
        let fut = (self.handler)(inputs);
        Box::pin(async move {
            let response = fut.await;
            debug!(
                method = %req.method(),
                path = req.path(),
                stage = %Stage::Responded,
                status = response.status_code()
            );
            response
        })
    }

    /// Parameter and dependency listing, for documentation endpoints.
    pub fn describe(&self) -> Value {
        json!({
            "params": self.params.iter().map(Param::describe).collect::<Vec<_>>(),
            "dependencies": self.dependencies.iter().map(Dependency::name).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("params", &self.params.iter().map(Param::name).collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

// ── EndpointBuilder ───────────────────────────────────────────────────────────

/// Builder returned by [`Endpoint::builder`].
pub struct EndpointBuilder {
    params: Vec<Param>,
    dependencies: Vec<Dependency>,
    handler: Option<InputHandler>,
}

impl EndpointBuilder {
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn depends(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Sets the handler:
    ///
    /// ```text
    /// async fn name(inputs: Inputs) -> impl IntoResponse
    /// ```
    pub fn handler<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Inputs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.handler = Some(Arc::new(move |inputs: Inputs| -> BoxFuture {
            let fut = f(inputs);
            Box::pin(async move { fut.await.into_response() })
        }));
        self
    }

    /// Orders the dependencies and merges every declared parameter.
    ///
    /// A parameter declared more than once with the same source and name is
    /// bound once (first declaration wins). The same name under two different
    /// sources is an error.
    pub fn build(self) -> Result<Endpoint, Error> {
        let handler = self.handler.ok_or(Error::MissingHandler)?;
        let dependencies = Dependencies::new(self.dependencies)?;

        let declared = self.params.into_iter()
            .chain(dependencies.iter().flat_map(|d| d.params().iter().cloned()));

        let mut seen: HashMap<String, Source> = HashMap::new();
        let mut params = Vec::new();
        for param in declared {
            match seen.get(param.name()) {
                Some(&source) if source == param.source() => continue,
                Some(&source) => {
                    return Err(Error::ConflictingParam {
                        name: param.name().to_owned(),
                        first: source.as_str(),
                        second: param.source().as_str(),
                    });
                }
                None => {
                    seen.insert(param.name().to_owned(), param.source());
                    params.push(param);
                }
            }
        }

        Ok(Endpoint { params, dependencies, handler })
    }
}
