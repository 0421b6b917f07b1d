//! TCP listener handle with an explicit lifecycle state machine.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// The server task ended with an error while draining.
    Close(std::io::Error),
    /// The server task panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Close(e) => write!(f, "Failed to close: {}", e),
            ListenerError::Task(e) => write!(f, "Server task failed: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Lifecycle state of a [`ListenerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Unbound,
    Binding,
    Bound,
    Closing,
    Closed,
    BindFailed,
    CloseFailed,
}

/// One logical HTTP listener.
///
/// Only a `Bound` listener accepts connections. The serving task runs on the
/// runtime and drains gracefully when [`ListenerHandle::close`] is called.
pub struct ListenerHandle {
    name: &'static str,
    state: ListenerState,
    local_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl ListenerHandle {
    /// Create an unbound handle.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ListenerState::Unbound,
            local_addr: None,
            shutdown: Shutdown::new(),
            task: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Address the listener is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn transition(&mut self, state: ListenerState) {
        tracing::debug!(listener = self.name, from = ?self.state, to = ?state, "Listener state change");
        self.state = state;
        metrics::record_listener_state(self.name, state);
    }

    /// Bind `host:port` and start serving `app`.
    ///
    /// On failure the handle ends in `BindFailed`.
    pub async fn bind(&mut self, host: &str, port: u16, app: Router) -> Result<SocketAddr, ListenerError> {
        self.transition(ListenerState::Binding);

        let listener = match TcpListener::bind((host, port)).await {
            Ok(listener) => listener,
            Err(e) => {
                self.transition(ListenerState::BindFailed);
                return Err(ListenerError::Bind(e));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.transition(ListenerState::BindFailed);
                return Err(ListenerError::Bind(e));
            }
        };

        // Subscribe before spawning so a close issued right after bind is seen.
        let mut stop = self.shutdown.subscribe();
        let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(
            async move {
                let _ = stop.recv().await;
            },
        );
        self.task = Some(tokio::spawn(async move { server.await }));
        self.local_addr = Some(local_addr);
        self.transition(ListenerState::Bound);

        tracing::info!(listener = self.name, address = %local_addr, "Listener bound");
        Ok(local_addr)
    }

    /// Record a startup failure that happened before the socket was bound.
    pub fn mark_failed(&mut self) {
        if matches!(self.state, ListenerState::Unbound | ListenerState::Binding) {
            self.transition(ListenerState::BindFailed);
        }
    }

    /// A `Bound` handle driving an arbitrary serve task.
    #[cfg(test)]
    pub(crate) fn bound_with_task(name: &'static str, task: JoinHandle<std::io::Result<()>>) -> Self {
        Self {
            name,
            state: ListenerState::Bound,
            local_addr: None,
            shutdown: Shutdown::new(),
            task: Some(task),
        }
    }

    /// Stop accepting, drain in-flight requests and wait for the server task.
    ///
    /// Returns `None` when the listener is not `Bound`.
    pub async fn close(&mut self) -> Option<Result<(), ListenerError>> {
        if self.state != ListenerState::Bound {
            return None;
        }
        let task = self.task.take()?;

        self.transition(ListenerState::Closing);
        self.shutdown.trigger();

        let outcome = match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ListenerError::Close(e)),
            Err(e) => Err(ListenerError::Task(e)),
        };

        match &outcome {
            Ok(()) => {
                self.transition(ListenerState::Closed);
                tracing::info!(listener = self.name, "Listener closed");
            }
            Err(e) => {
                self.transition(ListenerState::CloseFailed);
                tracing::error!(listener = self.name, error = %e, "Listener failed to close");
            }
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    fn app() -> Router {
        Router::new().route("/", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn bind_then_close() {
        let mut handle = ListenerHandle::new("test");
        assert_eq!(handle.state(), ListenerState::Unbound);

        let addr = handle.bind("127.0.0.1", 0, app()).await.unwrap();
        assert_eq!(handle.state(), ListenerState::Bound);
        assert_eq!(handle.local_addr(), Some(addr));
        assert_ne!(addr.port(), 0);

        let outcome = handle.close().await;
        assert!(matches!(outcome, Some(Ok(()))));
        assert_eq!(handle.state(), ListenerState::Closed);
    }

    #[tokio::test]
    async fn close_is_a_noop_unless_bound() {
        let mut handle = ListenerHandle::new("test");
        assert!(handle.close().await.is_none());
        assert_eq!(handle.state(), ListenerState::Unbound);

        handle.bind("127.0.0.1", 0, app()).await.unwrap();
        assert!(handle.close().await.is_some());
        assert!(handle.close().await.is_none());
        assert_eq!(handle.state(), ListenerState::Closed);
    }

    #[tokio::test]
    async fn occupied_port_fails_to_bind() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut handle = ListenerHandle::new("test");
        let err = handle.bind("127.0.0.1", port, app()).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind(_)));
        assert_eq!(handle.state(), ListenerState::BindFailed);
        assert!(handle.close().await.is_none());
    }

    #[test]
    fn mark_failed_only_applies_before_bind() {
        let mut handle = ListenerHandle::new("test");
        handle.mark_failed();
        assert_eq!(handle.state(), ListenerState::BindFailed);
    }

    #[tokio::test]
    async fn failing_serve_task_ends_in_close_failed() {
        let task = tokio::spawn(async { Err(std::io::Error::other("accept loop died")) });
        let mut handle = ListenerHandle::bound_with_task("test", task);

        let outcome = handle.close().await;
        assert!(matches!(outcome, Some(Err(ListenerError::Close(_)))));
        assert_eq!(handle.state(), ListenerState::CloseFailed);
        assert!(handle.close().await.is_none());
    }
}
