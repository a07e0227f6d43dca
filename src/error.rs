//! Unified error type.

use thiserror::Error;

/// The error type returned by vetted's fallible setup and serving operations.
///
/// Request-level failures (422 validation reports, 401/404 raised by
/// resolvers) are not `Error`s: they are [`Rejection`](crate::Rejection)
/// values turned into HTTP responses. This type surfaces infrastructure
/// failures (binding a port) and mistakes in endpoint declarations, which are
/// caught once at startup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("dependency `{dependency}` needs `{missing}`, which is not declared on this endpoint")]
    UnknownDependency { dependency: String, missing: String },

    #[error("dependency `{0}` is declared more than once")]
    DuplicateDependency(String),

    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("parameter `{name}` is declared both as a {first} and as a {second} parameter")]
    ConflictingParam { name: String, first: &'static str, second: &'static str },

    #[error("endpoint has no handler")]
    MissingHandler,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_the_chain() {
        let err = Error::DependencyCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "io: taken");
    }
}
