//! Run-once guards and periodic background tasks.
//!
//! [`RunGuard`] is a non-blocking try-lock: a second run that starts while
//! the first is still going gets `None` back and returns immediately instead
//! of queuing. The index refresher and the preview pre-generator each own one.
//!
//! [`spawn_periodic`] runs a closure on a named thread once at startup and
//! then at a fixed interval until the returned [`Periodic`] handle is
//! stopped or dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

/// Held for the duration of one run; releases the guard on drop.
#[derive(Debug)]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard without blocking. `None` if a run is in progress.
    pub fn try_acquire(&self) -> Option<RunPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// Handle to a periodic background thread.
pub struct Periodic {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Periodic {
    /// Signal the thread and wait for its current run to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Periodic task thread panicked");
            }
        }
    }
}

impl Drop for Periodic {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `task` now and then every `interval` on a named thread.
pub fn spawn_periodic<F>(name: &str, interval: Duration, mut task: F) -> std::io::Result<Periodic>
where
    F: FnMut() + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<()>();
    let label = name.to_string();
    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            loop {
                task();
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(task = %label, "Periodic task stopped");
        })?;

    Ok(Periodic {
        stop: Some(tx),
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    // =========================================================================
    // RunGuard
    // =========================================================================

    #[test]
    fn second_acquire_fails_while_held() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn guard_is_exclusive_across_threads() {
        let guard = Arc::new(RunGuard::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let wins = wins.clone();
                let attempts = attempts.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let permit = guard.try_acquire();
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if permit.is_some() {
                        wins.fetch_add(1, Ordering::SeqCst);
                        // Hold until every thread has tried.
                        while attempts.load(Ordering::SeqCst) < 8 {
                            std::thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    // =========================================================================
    // spawn_periodic
    // =========================================================================

    #[test]
    fn runs_immediately_and_repeats() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let periodic = spawn_periodic("test-tick", Duration::from_millis(20), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(200));
        periodic.stop();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn stop_interrupts_long_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let periodic = spawn_periodic("test-slow", Duration::from_secs(3600), move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let started = std::time::Instant::now();
        periodic.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
