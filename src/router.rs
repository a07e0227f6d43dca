//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A route's path
//! parameters (`{item_id}`) are captured here and handed to the endpoint's
//! binder as percent-decoded strings.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::rejection::HttpError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or drive it in-process with [`Router::handle`].
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self { self.on(Method::Get, path, handler) }
    pub fn post(self, path: &str, handler: impl Handler) -> Self { self.on(Method::Post, path, handler) }
    pub fn put(self, path: &str, handler: impl Handler) -> Self { self.on(Method::Put, path, handler) }
    pub fn patch(self, path: &str, handler: impl Handler) -> Self { self.on(Method::Patch, path, handler) }
    pub fn delete(self, path: &str, handler: impl Handler) -> Self { self.on(Method::Delete, path, handler) }

    /// Routes one request and produces its response. Unknown routes get a
    /// `404` error payload.
    pub async fn handle(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => handler.call(req.with_params(params)).await,
            None => HttpError::not_found("Not Found").into_response(),
        }
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        // Captures arrive percent-encoded; `+` is literal in a path.
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;

    async fn hello(_req: Request) -> &'static str { "hello" }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    #[tokio::test]
    async fn routes_by_method_and_path() {
        let app = Router::new().get("/hello", hello).get("/users/{id}", echo_id);

        let res = app.handle(Request::builder(Method::Get, "/users/42").build()).await;
        assert_eq!(res.body(), b"42");

        let res = app.handle(Request::builder(Method::Post, "/hello").build()).await;
        assert_eq!(res.status_code(), Status::NotFound.code());
    }

    #[tokio::test]
    async fn path_params_are_percent_decoded() {
        let app = Router::new().get("/users/{id}", echo_id);

        let res = app.handle(Request::builder(Method::Get, "/users/a%20b%2Fc+d").build()).await;
        assert_eq!(res.body(), b"a b/c+d");

        let res = app.handle(Request::builder(Method::Get, "/users/caf%C3%A9").build()).await;
        assert_eq!(res.body(), "café".as_bytes());
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new().get("/a/{x}", hello).get("/a/{y}", hello);
    }
}
