//! Incoming HTTP request type.
//!
//! A [`Request`] is the untyped description the pipeline starts from: a
//! method, the path (with parameters captured by the router), the decoded
//! query string, headers, and the raw body bytes.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::method::Method;

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        raw_query: Option<&str>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        let query = raw_query
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { method, path, query, headers, body, params: HashMap::new() }
    }

    /// Starts building a request by hand, for tests or in-process dispatch.
    ///
    /// `target` is a path with an optional query string:
    ///
    /// ```rust
    /// use vetted::{Method, Request};
    ///
    /// let req = Request::builder(Method::Get, "/items/?q=rust&limit=5").build();
    /// assert_eq!(req.path(), "/items/");
    /// assert_eq!(req.query("limit"), Some("5"));
    /// ```
    pub fn builder(method: Method, target: &str) -> RequestBuilder {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None         => (target, None),
        };
        RequestBuilder { req: Self::new(method, path.to_owned(), query, Vec::new(), Vec::new()) }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Decoded query pairs in the order they were sent.
    pub fn query_pairs(&self) -> &[(String, String)] { &self.query }

    /// Query value for `key`. When a key repeats, the last value wins.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/items/{item_id}`, `req.param("item_id")` on `/items/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }
}

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    req: Request,
}

impl RequestBuilder {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.req.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.req.body = body.into();
        self
    }

    /// Sets a JSON body and the matching content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("content-type", "application/json").body(value.to_string())
    }

    /// Sets a path parameter directly, bypassing the router.
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.req.params.insert(name.to_owned(), value.to_owned());
        self
    }

    pub fn build(self) -> Request { self.req }
}
