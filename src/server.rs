//! HTTP server and graceful shutdown.
//!
//! The server owns the wire: it accepts connections, lets hyper speak
//! HTTP/1.1 or HTTP/2, collects each request body, and hands a plain
//! [`Request`] to the [`Router`]. Everything after that (binding,
//! validation, dependency resolution) is the endpoint's business.
//!
//! # Graceful shutdown
//!
//! [`Server::serve`] stops on **SIGTERM** or **Ctrl-C**. It then:
//! 1. Stops `listener.accept()` so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns, which lets `main` exit cleanly.
//!
//! [`Server::serve_with_shutdown`] does the same on a future of your choice.
//!
//! # Body size
//!
//! Request bodies are buffered before binding, up to
//! [`DEFAULT_BODY_LIMIT`] bytes unless [`Server::body_limit`] says otherwise.
//! Larger bodies are answered with `413 Content Too Large`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// Largest request body buffered by default: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse()
            .unwrap_or_else(|e| panic!("invalid socket address `{addr}`: {e}"));
        Self { addr, body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Caps the bytes buffered per request body.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accepts connections until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Accepts connections until `signal` resolves, then drains in-flight
    /// connections and returns.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let limit = self.body_limit;

        info!(addr = %self.addr, body_limit = limit, "vetted listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting even if
                // more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(&router, req, limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("vetted stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, routes it, and converts the response back.
///
/// Every failure becomes a response, so hyper never sees an error.
async fn dispatch(
    router: &Router,
    req: hyper::Request<hyper::body::Incoming>,
    limit: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Ok(method) = Method::try_from(req.method()) else {
        return Ok(Response::status(Status::MethodNotAllowed).into_inner());
    };

    let (parts, body) = req.into_parts();
    let body = match read_body(body, limit).await {
        Ok(body) => body,
        Err(status) => {
            warn!(path = parts.uri.path(), status = status.code(), limit, "request body rejected");
            return Ok(Response::status(status).into_inner());
        }
    };

    let headers = parts.headers.iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();

    let request = Request::new(
        method,
        parts.uri.path().to_owned(),
        parts.uri.query(),
        headers,
        body,
    );

    Ok(router.handle(request).await.into_inner())
}

/// Buffers at most `limit` bytes of `body`.
///
/// Fails with `413` past the limit and `400` when the body cannot be read.
async fn read_body<B>(body: B, limit: usize) -> Result<Vec<u8>, Status>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(Status::ContentTooLarge),
        Err(e) => {
            warn!("failed to read request body: {e}");
            Err(Status::BadRequest)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On other platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_within_limit_is_buffered() {
        let body = Full::new(Bytes::from_static(b"{\"name\":\"pen\"}"));
        assert_eq!(read_body(body, 64).await.unwrap(), b"{\"name\":\"pen\"}");
    }

    #[tokio::test]
    async fn body_past_limit_is_too_large() {
        let body = Full::new(Bytes::from(vec![b'x'; 65]));
        assert_eq!(read_body(body, 64).await.unwrap_err(), Status::ContentTooLarge);
    }

    #[test]
    fn body_limit_is_configurable() {
        let server = Server::bind("127.0.0.1:0");
        assert_eq!(server.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(server.body_limit(1024).body_limit, 1024);
    }
}
