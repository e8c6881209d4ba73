//! Service lifecycle: background task supervision and graceful shutdown
//! (spec §4.2 "Service Base").

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long [`ServiceBase::stop`] waits for a task to notice cancellation
/// and exit before it is abandoned mid-shutdown (spec §4.2/§5 "shutdown
/// grace window is ≈1 s").
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Handed to every task a [`ServiceBase`] runs. Tasks select on
/// [`ShutdownSignal::cancelled`] at each suspension point instead of
/// polling, so shutdown is immediate rather than bound to a poll interval.
#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Resolves once [`ServiceBase::stop`] has been called. Safe to await
    /// repeatedly and to race inside `tokio::select!`.
    pub async fn cancelled(&mut self) {
        while !*self.0.borrow() {
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

type ServiceTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Aggregate of read/write handlers and other background tasks that make
/// up one running service instance (spec §4.2).
pub struct ServiceBase {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    pending: Vec<ServiceTask>,
    handles: Vec<JoinHandle<()>>,
    grace_period: Duration,
}

impl ServiceBase {
    pub fn new(name: impl Into<String>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            name: name.into(),
            shutdown_tx,
            shutdown_rx,
            pending: Vec::new(),
            handles: Vec::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.shutdown_rx.clone())
    }

    /// Registers a bus read handler's consume loop. The loop is built
    /// lazily from a [`ShutdownSignal`] so it can be constructed here and
    /// only actually spawned once [`ServiceBase::start`] runs.
    pub fn add_read_handler<F, Fut>(&mut self, build: F)
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(build(self.shutdown_signal())));
    }

    /// Registers a bus write handler's drain/flush loop. Symmetric with
    /// [`ServiceBase::add_read_handler`]; kept as a distinct method because
    /// the two are registered from different sites in a service's startup
    /// and the distinction matters for readability there.
    pub fn add_write_handler<F, Fut>(&mut self, build: F)
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(build(self.shutdown_signal())));
    }

    /// Registers any other background task (an FSM tick loop, an HTTP
    /// server future, ...) under the same shutdown discipline.
    pub fn add_task<F, Fut>(&mut self, build: F)
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(build(self.shutdown_signal())));
    }

    /// Spawns every registered task. Idempotent: a second call only spawns
    /// tasks added since the first.
    pub fn start(&mut self) {
        for task in self.pending.drain(..) {
            self.handles.push(tokio::spawn(task));
        }
    }

    /// Signals cancellation and waits up to the configured grace period for
    /// each task to exit; a task that overruns is logged and abandoned so
    /// shutdown itself never hangs.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);

        for handle in std::mem::take(&mut self.handles) {
            if tokio::time::timeout(self.grace_period, handle)
                .await
                .is_err()
            {
                warn!(service = %self.name, "task did not exit within the shutdown grace period");
            }
        }
    }

    /// Blocking convenience: start, then wait for SIGINT/SIGTERM, then stop.
    pub async fn run(mut self) -> std::io::Result<()> {
        self.start();
        info!(service = %self.name, "running");

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }

        info!(service = %self.name, "shutting down");
        self.stop().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn stop_signals_cancellation_and_joins_tasks() {
        let mut service = ServiceBase::new("test-service");
        let ran_to_completion = Arc::new(AtomicBool::new(false));
        let flag = ran_to_completion.clone();

        service.add_task(|mut shutdown| async move {
            shutdown.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        service.start();
        service.stop().await;

        assert!(ran_to_completion.load(Ordering::SeqCst));
    }
}
