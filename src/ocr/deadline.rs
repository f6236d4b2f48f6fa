use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::FailureKind;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cooperative cancellation flag shared between the deadline runner and the
/// work it supervises.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), FailureKind> {
        if self.is_cancelled() {
            Err(FailureKind::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Runs `task` on a worker thread and waits at most `timeout` for it.
///
/// On expiry the token handed to `task` is cancelled and the worker is
/// abandoned; whatever it produces afterwards is dropped with the channel.
pub fn run_with_deadline<T, F>(label: &str, timeout: Duration, task: F) -> Result<T, FailureKind>
where
    T: Send + 'static,
    F: FnOnce(CancelToken) -> Result<T, FailureKind> + Send + 'static,
{
    let token = CancelToken::new();
    let worker_token = token.clone();
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name(label.to_string())
        .spawn(move || {
            let result = task(worker_token);
            // Receiver is gone after a timeout.
            let _ = tx.send(result);
        })
        .map_err(|err| FailureKind::engine(format!("failed to spawn {label}: {err}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            debug!(worker = label, ?timeout, "deadline elapsed, abandoning worker");
            token.cancel();
            Err(FailureKind::Timeout)
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(FailureKind::engine(format!("{label} worker panicked")))
        }
    }
}

/// Waits for a child process, killing it as soon as `cancel` fires.
pub fn wait_child(child: &mut Child, cancel: &CancelToken) -> Result<ExitStatus, FailureKind> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FailureKind::Timeout);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    #[test]
    fn returns_result_within_deadline() {
        let out = run_with_deadline("fast", Duration::from_secs(2), |_| Ok(7));
        assert_eq!(out, Ok(7));
    }

    #[test]
    fn times_out_and_cancels_worker() {
        let (seen_tx, seen_rx) = mpsc::channel();
        let started = Instant::now();
        let out: Result<String, _> = run_with_deadline("slow", Duration::from_millis(50), move |token| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            let _ = seen_tx.send(());
            Ok("partial".to_string())
        });
        assert_eq!(out, Err(FailureKind::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(seen_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn propagates_task_error() {
        let out: Result<(), _> = run_with_deadline("err", Duration::from_secs(1), |_| {
            Err(FailureKind::engine("boom"))
        });
        assert_eq!(out, Err(FailureKind::EngineError("boom".into())));
    }

    #[test]
    fn panicking_worker_is_engine_error() {
        let out: Result<(), _> =
            run_with_deadline("panics", Duration::from_secs(1), |_| panic!("worker died"));
        assert!(matches!(out, Err(FailureKind::EngineError(_))));
    }
}
