//! Dependency resolution.
//!
//! A [`Dependency`] is a named [`Resolver`] plus the parameters it reads and
//! the names of the other dependencies whose outputs it needs. An endpoint's
//! dependencies are ordered once at startup ([`Dependencies::new`]) and then
//! resolved once per request, each resolver seeing the bound parameters and
//! every output resolved before it.
//!
//! A resolver that returns an [`HttpError`] stops the request on the spot: no
//! later resolver and no handler runs, and the error reaches the caller
//! unchanged.
//!
//! # Resolvers
//!
//! Plain functions and closures:
//!
//! ```rust
//! use vetted::{Dependency, FieldType, HttpError, Param, Scope};
//!
//! fn login_check(scope: &Scope<'_>) -> Result<&'static str, HttpError> {
//!     let args = scope.args();
//!     match (args.get_str("username"), args.get_str("password")) {
//!         (Some("admin"), Some("admin")) => Ok("Login Successful"),
//!         _ => Err(HttpError::unauthorized("Invalid Credentials")),
//!     }
//! }
//!
//! let login = Dependency::from_fn("login", login_check)
//!     .param(Param::query("username", FieldType::Str))
//!     .param(Param::query("password", FieldType::Str));
//! ```
//!
//! Stateful resolvers are structs implementing [`Resolver`]. They are built
//! once, shared by every request through an `Arc`, and only ever borrowed
//! immutably, so they may be called concurrently. [`Lookup`] is the stock
//! example: a read-only table that answers `404` for unknown keys.

use std::any::{Any, type_name};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::params::{Args, Param};
use crate::rejection::{HttpError, Rejection};

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Computes one request-scoped value for a handler.
pub trait Resolver: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn resolve(&self, scope: &Scope<'_>) -> Result<Self::Output, HttpError>;

    /// Parameters this resolver reads. They are bound together with the
    /// endpoint's own parameters.
    fn params(&self) -> Vec<Param> {
        Vec::new()
    }
}

/// What a resolver can see: the request's bound parameters and the outputs
/// of the dependencies resolved so far.
pub struct Scope<'a> {
    args: &'a Args,
    resolved: &'a Resolved,
}

impl<'a> Scope<'a> {
    pub fn args(&self) -> &'a Args { self.args }

    /// Output of an earlier dependency. `None` if it has not been resolved
    /// or has a different type.
    pub fn get<T: Any>(&self, dependency: &str) -> Option<&'a T> {
        self.resolved.get(dependency)
    }

    /// Like [`get`](Scope::get), but a missing output becomes a `500`.
    pub fn require<T: Any>(&self, dependency: &str) -> Result<&'a T, HttpError> {
        self.get(dependency).ok_or_else(|| {
            HttpError::new(
                crate::Status::InternalServerError,
                format!("dependency `{dependency}` did not produce a {}", type_name::<T>()),
            )
        })
    }
}

/// Outputs of the dependencies resolved for one request, keyed by name.
#[derive(Default)]
pub struct Resolved {
    outputs: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Resolved {
    pub fn get<T: Any>(&self, dependency: &str) -> Option<&T> {
        self.outputs.get(dependency)?.downcast_ref()
    }

    pub fn contains(&self, dependency: &str) -> bool { self.outputs.contains_key(dependency) }
    pub fn len(&self) -> usize { self.outputs.len() }
    pub fn is_empty(&self) -> bool { self.outputs.is_empty() }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.outputs.keys()).finish()
    }
}

// ── Type erasure ──────────────────────────────────────────────────────────────

trait ErasedResolver: Send + Sync {
    fn resolve(&self, scope: &Scope<'_>) -> Result<Box<dyn Any + Send + Sync>, HttpError>;
}

struct Erased<R>(R);

impl<R: Resolver> ErasedResolver for Erased<R> {
    fn resolve(&self, scope: &Scope<'_>) -> Result<Box<dyn Any + Send + Sync>, HttpError> {
        let out = self.0.resolve(scope)?;
        Ok(Box::new(out))
    }
}

/// Adapts a function to [`Resolver`]. Built by [`Dependency::from_fn`].
struct FnResolver<F, T>(F, PhantomData<fn() -> T>);

impl<F, T> Resolver for FnResolver<F, T>
where
    F: Fn(&Scope<'_>) -> Result<T, HttpError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn resolve(&self, scope: &Scope<'_>) -> Result<T, HttpError> {
        (self.0)(scope)
    }
}

// ── Dependency ────────────────────────────────────────────────────────────────

/// A named resolver attached to an endpoint.
#[derive(Clone)]
pub struct Dependency {
    name: String,
    needs: Vec<String>,
    params: Vec<Param>,
    output: &'static str,
    resolver: Arc<dyn ErasedResolver>,
}

impl Dependency {
    /// Wraps a [`Resolver`]; its declared parameters are picked up.
    pub fn new<R: Resolver>(name: impl Into<String>, resolver: R) -> Self {
        Self {
            name: name.into(),
            needs: Vec::new(),
            params: resolver.params(),
            output: type_name::<R::Output>(),
            resolver: Arc::new(Erased(resolver)),
        }
    }

    /// Wraps a function or closure.
    pub fn from_fn<F, T>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        Self::new(name, FnResolver(f, PhantomData))
    }

    /// Declares that this resolver reads the output of `dependency`.
    pub fn needs(mut self, dependency: impl Into<String>) -> Self {
        self.needs.push(dependency.into());
        self
    }

    /// Declares a parameter this resolver reads.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn params(&self) -> &[Param] { &self.params }
    pub fn needed(&self) -> &[String] { &self.needs }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("needs", &self.needs)
            .field("params", &self.params.iter().map(Param::name).collect::<Vec<_>>())
            .field("output", &self.output)
            .finish()
    }
}

// ── Dependencies ──────────────────────────────────────────────────────────────

/// An endpoint's dependencies in resolution order.
#[derive(Clone, Debug, Default)]
pub struct Dependencies {
    ordered: Vec<Dependency>,
}

impl Dependencies {
    /// Orders `declared` so every dependency comes after the ones it needs.
    /// Independent dependencies keep their declaration order.
    ///
    /// Fails on duplicate names, unknown names, and cycles.
    pub fn new(declared: Vec<Dependency>) -> Result<Self, Error> {
        let mut names = HashSet::new();
        for dep in &declared {
            if !names.insert(dep.name.as_str()) {
                return Err(Error::DuplicateDependency(dep.name.clone()));
            }
        }
        for dep in &declared {
            if let Some(missing) = dep.needs.iter().find(|n| !names.contains(n.as_str())) {
                return Err(Error::UnknownDependency {
                    dependency: dep.name.clone(),
                    missing: missing.clone(),
                });
            }
        }

        let mut placed: HashSet<String> = HashSet::new();
        let mut pending = declared;
        let mut ordered = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let Some(next) = pending.iter().position(|d| d.needs.iter().all(|n| placed.contains(n))) else {
                return Err(Error::DependencyCycle(find_cycle(&pending)));
            };
            let dep = pending.remove(next);
            placed.insert(dep.name.clone());
            ordered.push(dep);
        }

        Ok(Self { ordered })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> { self.ordered.iter() }
    pub fn len(&self) -> usize { self.ordered.len() }
    pub fn is_empty(&self) -> bool { self.ordered.is_empty() }

    /// Resolves every dependency in order, stopping at the first failure.
    pub fn resolve(&self, args: &Args) -> Result<Resolved, Rejection> {
        let mut resolved = Resolved::default();
        for dep in &self.ordered {
            let scope = Scope { args, resolved: &resolved };
            match dep.resolver.resolve(&scope) {
                Ok(out) => {
                    debug!(dependency = %dep.name, "resolved");
                    resolved.outputs.insert(dep.name.clone(), out);
                }
                Err(error) => {
                    warn!(dependency = %dep.name, status = error.status().code(), "dependency rejected request");
                    return Err(Rejection::Dependency { name: dep.name.clone(), error });
                }
            }
        }
        Ok(resolved)
    }
}

/// Walks unplaceable dependencies until one repeats. Every pending entry
/// needs at least one other pending entry, so the walk always closes.
fn find_cycle(pending: &[Dependency]) -> Vec<String> {
    let by_name: HashMap<&str, &Dependency> = pending.iter().map(|d| (d.name.as_str(), d)).collect();
    let mut chain: Vec<String> = Vec::new();
    let mut current = &pending[0];
    loop {
        if let Some(start) = chain.iter().position(|n| *n == current.name) {
            let mut cycle = chain.split_off(start);
            cycle.push(current.name.clone());
            return cycle;
        }
        chain.push(current.name.clone());
        match current.needs.iter().find_map(|n| by_name.get(n.as_str()).copied()) {
            Some(next) => current = next,
            None => return chain,
        }
    }
}

// ── Lookup ────────────────────────────────────────────────────────────────────

/// Fetches an entry from a fixed table by a bound parameter, or fails with
/// `404 Not Found`.
///
/// ```rust
/// use std::collections::HashMap;
///
/// use vetted::{Dependency, FieldType, Lookup, Param};
///
/// let items = HashMap::from([
///     ("1".to_owned(), "FastAPI Tutorial".to_owned()),
///     ("2".to_owned(), "Dependency Injection Guide".to_owned()),
/// ]);
/// let item = Dependency::new(
///     "item",
///     Lookup::new(Param::path("item_id", FieldType::Str), items).entity("Item"),
/// );
/// ```
pub struct Lookup<V> {
    key: Param,
    entity: String,
    table: Arc<HashMap<String, V>>,
}

impl<V> Lookup<V> {
    /// # Panics
    ///
    /// Panics if `key` is optional: an absent key has no ID to look up.
    pub fn new(key: Param, table: impl Into<Arc<HashMap<String, V>>>) -> Self {
        if key.spec().is_optional() {
            panic!("lookup key `{}` must not be optional", key.name());
        }
        Self { key, entity: "Item".to_owned(), table: table.into() }
    }

    /// Noun used in the not-found message: `"{entity} with ID {id} not found"`.
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }
}

impl<V: Clone + Send + Sync + 'static> Resolver for Lookup<V> {
    type Output = V;

    fn resolve(&self, scope: &Scope<'_>) -> Result<V, HttpError> {
        let id = match scope.args().get(self.key.name()) {
            Some(Value::String(s)) => s.clone(),
            Some(other)            => other.to_string(),
            None                   => String::new(),
        };
        self.table
            .get(&id)
            .cloned()
            .ok_or_else(|| HttpError::not_found(format!("{} with ID {id} not found", self.entity)))
    }

    fn params(&self) -> Vec<Param> {
        vec![self.key.clone()]
    }
}
