//! Cancellable periodic refresh.
//!
//! A [`Poller`] runs a task on its own thread: once immediately, then once
//! per interval. The returned [`PollHandle`] stops it. Stopping wakes the
//! thread right away (it waits on a channel, not a sleep) and joins it, so
//! nothing keeps running after teardown. A tick already in progress is
//! allowed to finish; HTTP calls are bounded by the client timeout.
//!
//! Ticks never overlap: the next wait only starts after the task returns.
//! A failing tick is logged and the poller carries on with the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub struct Poller;

impl Poller {
    /// Spawn a named polling thread.
    pub fn start<F>(name: &str, interval: Duration, mut task: F) -> Result<PollHandle>
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let ticks = Arc::new(AtomicU64::new(0));
        let thread_ticks = Arc::clone(&ticks);
        let label = name.to_string();

        let thread = thread::Builder::new()
            .name(format!("poll-{name}"))
            .spawn(move || {
                loop {
                    if let Err(e) = task() {
                        warn!(poller = %label, error = %e, "refresh failed");
                    }
                    thread_ticks.fetch_add(1, Ordering::SeqCst);

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(poller = %label, "stopped");
            })
            .with_context(|| format!("failed to spawn poller thread '{name}'"))?;

        Ok(PollHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            ticks,
        })
    }
}

/// Start/stop handle for a running [`Poller`]. Dropping it stops the poller.
pub struct PollHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl PollHandle {
    /// Completed ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the poller and wait for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("poller thread panicked");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    use super::*;

    #[test]
    fn runs_immediately_then_on_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = Poller::start("test", Duration::from_millis(20), move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while count.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn stop_halts_further_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = Poller::start("halt", Duration::from_secs(3600), move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        // The first tick runs right away; stop must not wait out the hour.
        let started = Instant::now();
        while handle.ticks() == 0 && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));

        let after_stop = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert_eq!(after_stop, 1);
    }

    #[test]
    fn failing_tick_does_not_stop_poller() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = Poller::start("flaky", Duration::from_millis(10), move || {
            c.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("backend down")
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.ticks() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.ticks() >= 2);
        assert!(handle.is_running());
        drop(handle);
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
