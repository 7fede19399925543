//! # Execution contexts.
//!
//! [`ExecContext`] names the two lanes work can run in. The set is closed on
//! purpose: presentation-facing engines need exactly one serialized lane plus
//! one concurrent lane, and a closed enum keeps every `match` exhaustive.
//!
//! The `Ui` lane is backed by [`UiRuntime`], a current-thread tokio runtime on
//! a dedicated OS thread. Everything spawned there interleaves cooperatively
//! on one thread, which is the serialization guarantee `Ui` promises. When the
//! scheduler is built without a dedicated lane (tests, simple CLIs), `Ui`
//! falls back to the ambient runtime and the caller provides the
//! single-thread guarantee instead.

use std::io;
use std::sync::mpsc;
use std::thread;

use tokio::runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Which lane a piece of work runs in.
///
/// - [`ExecContext::Ui`] — serialized lane. Tasks never run in parallel with
///   each other; emission order observed there is total.
/// - [`ExecContext::Background`] — concurrent lane for work that tolerates
///   parallelism.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecContext {
    /// Serialized, presentation-facing lane.
    #[default]
    Ui,
    /// Concurrent lane on the ambient runtime.
    Background,
}

impl ExecContext {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecContext::Ui => "ui",
            ExecContext::Background => "background",
        }
    }
}

/// Dedicated current-thread runtime backing the `Ui` lane.
///
/// The runtime lives on its own OS thread and is kept alive by a shutdown
/// signal; dropping the `UiRuntime` releases the thread after its tasks are
/// dropped.
pub(crate) struct UiRuntime {
    handle: runtime::Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl UiRuntime {
    /// Starts the dedicated thread and waits for its runtime handle.
    pub(crate) fn start() -> io::Result<Self> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("streamvisor-ui".into())
            .spawn(move || {
                let rt = match runtime::Builder::new_current_thread().enable_time().build() {
                    Ok(rt) => rt,
                    Err(err) => {
                        let _ = handle_tx.send(Err(err));
                        return;
                    }
                };
                let _ = handle_tx.send(Ok(rt.handle().clone()));
                rt.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })?;

        let handle = handle_rx
            .recv()
            .map_err(|_| io::Error::other("ui thread exited during startup"))??;

        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Spawns a future onto the serialized lane.
    pub(crate) fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }
}

impl Drop for UiRuntime {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_labels() {
        assert_eq!(ExecContext::Ui.as_label(), "ui");
        assert_eq!(ExecContext::Background.as_label(), "background");
        assert_eq!(ExecContext::default(), ExecContext::Ui);
    }

    #[test]
    fn test_ui_runtime_runs_spawned_work() {
        let ui = UiRuntime::start().unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        ui.spawn(async move {
            let _ = tx.send(std::thread::current().name().map(str::to_owned));
        });
        let name = rx.recv().unwrap();
        assert_eq!(name.as_deref(), Some("streamvisor-ui"));
    }
}
