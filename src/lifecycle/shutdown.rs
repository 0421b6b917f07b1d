//! Shutdown coordination for the listeners.

use tokio::sync::broadcast;

use crate::net::ListenerError;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that a serving task subscribes to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate outcome of closing every listener.
///
/// Successful only if every started listener closed cleanly. All closes are
/// attempted; failures are collected in the order the listeners are recorded.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    closed: Vec<&'static str>,
    failures: Vec<(&'static str, ListenerError)>,
}

impl ShutdownReport {
    /// Record one listener's close outcome (`None` = it was never bound).
    pub fn record(&mut self, listener: &'static str, outcome: Option<Result<(), ListenerError>>) {
        match outcome {
            None => {}
            Some(Ok(())) => self.closed.push(listener),
            Some(Err(e)) => self.failures.push((listener, e)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Listeners that closed cleanly.
    pub fn closed(&self) -> &[&'static str] {
        &self.closed
    }

    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    pub fn failures(&self) -> &[(&'static str, ListenerError)] {
        &self.failures
    }

    /// The first close error, if any.
    pub fn first_error(&self) -> Option<&ListenerError> {
        self.failures.first().map(|(_, e)| e)
    }

    /// Collapse into the number of closed listeners or the first error.
    pub fn into_result(self) -> Result<usize, ListenerError> {
        let closed = self.closed.len();
        match self.failures.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(closed),
        }
    }
}
