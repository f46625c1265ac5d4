//! Status tracking for remote operations.
//!
//! Every flow that talks to a store or the analysis backend goes through an
//! [`OperationCell`]: it moves `Idle → Pending → Ok | Failed`, refuses a
//! second run while one is pending, and can fall back from `Failed` to `Idle`
//! after a delay so a retry prompt clears itself.
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::{debug, trace, warn};

use crate::{PrepaseError, Result};

/// Error text left behind by a run whose future was dropped
pub const CANCELLED: &str = "cancelled";

/// The four user-visible states of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Default,
    Loading,
    Success,
    Issue,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Default => "default",
            Status::Loading => "loading",
            Status::Success => "success",
            Status::Issue => "issue",
        };
        f.write_str(label)
    }
}

/// State of one remote operation together with its outcome
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RemoteOp<T> {
    #[default]
    Idle,
    Pending,
    Ok(T),
    Failed(String),
}

impl<T> RemoteOp<T> {
    pub fn status(&self) -> Status {
        match self {
            RemoteOp::Idle => Status::Default,
            RemoteOp::Pending => Status::Loading,
            RemoteOp::Ok(_) => Status::Success,
            RemoteOp::Failed(_) => Status::Issue,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RemoteOp::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            RemoteOp::Ok(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RemoteOp::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        *self = RemoteOp::Idle;
    }
}

#[derive(Debug)]
struct CellState<T> {
    op: RemoteOp<T>,
    /// Bumped on every run so a delayed reset never clobbers a newer outcome
    generation: u64,
}

/// Shared, clonable holder of a [`RemoteOp`] that runs one future at a time.
#[derive(Debug)]
pub struct OperationCell<T> {
    name: String,
    state: Arc<Mutex<CellState<T>>>,
    issue_reset: Option<Duration>,
}

impl<T> Clone for OperationCell<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            issue_reset: self.issue_reset,
        }
    }
}

impl<T: Clone + Send + 'static> OperationCell<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(CellState {
                op: RemoteOp::Idle,
                generation: 0,
            })),
            issue_reset: None,
        }
    }

    /// Failed runs return to `Idle` after `delay`
    pub fn reset_issue_after(mut self, delay: Duration) -> Self {
        self.issue_reset = Some(delay);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> Result<MutexGuard<'_, CellState<T>>> {
        self.state
            .lock()
            .map_err(|_| PrepaseError::LockAcquisitionFailed {
                message: format!("Failed to acquire lock on {} state", self.name),
            })
    }

    /// Snapshot of the current state
    pub fn snapshot(&self) -> RemoteOp<T> {
        self.lock()
            .map(|state| state.op.clone())
            .unwrap_or_else(|e| RemoteOp::Failed(e.to_string()))
    }

    pub fn status(&self) -> Status {
        self.snapshot().status()
    }

    pub fn reset(&self) {
        if let Ok(mut state) = self.lock() {
            state.generation += 1;
            state.op.reset();
        }
    }

    /// Runs `task` unless a previous run is still pending, recording the
    /// outcome in the cell and handing it back to the caller. Dropping the
    /// returned future mid-run marks the run as cancelled.
    pub async fn run<F>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut pending = {
            let mut state = self.lock()?;
            if state.op.is_pending() {
                debug!("{} ignored, a run is already pending", self.name);
                return Err(PrepaseError::Busy {
                    operation: self.name.clone(),
                });
            }
            state.generation += 1;
            state.op = RemoteOp::Pending;
            PendingRun {
                cell: self,
                generation: state.generation,
                armed: true,
            }
        };
        trace!("{} -> {}", self.name, Status::Loading);

        let outcome = task.await;
        pending.armed = false;
        let generation = pending.generation;

        let mut state = self.lock()?;
        match &outcome {
            Ok(value) => {
                state.op = RemoteOp::Ok(value.clone());
                debug!("{} -> {}", self.name, Status::Success);
            }
            Err(e) => {
                state.op = RemoteOp::Failed(e.to_string());
                warn!("{} -> {}: {}", self.name, Status::Issue, e);
                if let Some(delay) = self.issue_reset {
                    self.schedule_reset(generation, delay);
                }
            }
        }
        outcome
    }

    fn schedule_reset(&self, generation: u64, delay: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let name = self.name.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut state) = state.lock() {
                if state.generation == generation && matches!(state.op, RemoteOp::Failed(_)) {
                    state.op = RemoteOp::Idle;
                    trace!("{} -> {}", name, Status::Default);
                }
            }
        });
    }
}

/// Marks an abandoned run as cancelled so the cell does not stay pending
struct PendingRun<'a, T> {
    cell: &'a OperationCell<T>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for PendingRun<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.cell.state.lock() {
            if state.generation == self.generation && state.op.is_pending() {
                state.generation += 1;
                state.op = RemoteOp::Failed(CANCELLED.to_string());
                warn!("{} -> {}: {}", self.cell.name, Status::Issue, CANCELLED);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_render_like_the_screens() {
        assert_eq!(RemoteOp::<()>::Idle.status().to_string(), "default");
        assert_eq!(RemoteOp::<()>::Pending.status().to_string(), "loading");
        assert_eq!(RemoteOp::Ok(1).status().to_string(), "success");
        assert_eq!(
            RemoteOp::<()>::Failed("x".into()).status().to_string(),
            "issue"
        );
    }

    #[tokio::test]
    async fn successful_runs_keep_their_value() {
        let cell = OperationCell::new("translate");
        let out = cell.run(async { Ok::<_, PrepaseError>(5) }).await.unwrap();

        assert_eq!(out, 5);
        assert_eq!(cell.snapshot(), RemoteOp::Ok(5));
    }

    #[tokio::test]
    async fn second_run_while_pending_is_busy() {
        let cell: OperationCell<u8> = OperationCell::new("access note");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let cell = cell.clone();
            tokio::spawn(async move {
                cell.run(async move {
                    let _ = rx.await;
                    Ok(1)
                })
                .await
            })
        };
        while !cell.snapshot().is_pending() {
            tokio::task::yield_now().await;
        }

        let second = cell.run(async { Ok(2) }).await;
        assert!(matches!(second, Err(PrepaseError::Busy { .. })));

        tx.send(()).unwrap();
        assert_eq!(slow.await.unwrap().unwrap(), 1);
        assert_eq!(cell.status(), Status::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_clear_themselves_after_the_delay() {
        let cell: OperationCell<()> =
            OperationCell::new("login").reset_issue_after(Duration::from_secs(3));

        let _ = cell
            .run(async { Err(PrepaseError::WrongPassword) })
            .await;
        assert_eq!(cell.snapshot().error(), Some("Wrong password provided"));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(cell.status(), Status::Default);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_resets_do_not_touch_newer_outcomes() {
        let cell: OperationCell<u8> =
            OperationCell::new("summarize").reset_issue_after(Duration::from_secs(3));

        let _ = cell.run(async { Err(PrepaseError::WrongPassword) }).await;
        cell.run(async { Ok(7) }).await.unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(cell.snapshot(), RemoteOp::Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_runs_do_not_block_the_next_one() {
        let cell: OperationCell<u8> = OperationCell::new("access note");

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            cell.run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1)
            }),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(cell.snapshot().error(), Some(CANCELLED));

        assert_eq!(cell.run(async { Ok(2) }).await.unwrap(), 2);
        assert_eq!(cell.status(), Status::Success);
    }
}
