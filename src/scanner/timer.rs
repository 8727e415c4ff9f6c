//! Idle Timer - clears a burst that never got its terminator
//!
//! One worker thread per listener, parked on a condvar until a deadline is
//! armed. Rearming moves the deadline; cancelling disarms it. When a deadline
//! passes the worker hands the current time to the expiry callback, which
//! re-checks the classifier's own deadline, so a fire that races a newer key
//! or a cancel is a no-op.
//!
//! # Example
//!
//! ```ignore
//! let timer = IdleTimer::spawn(|now| println!("expired at {now:?}"))?;
//! timer.arm(Instant::now() + Duration::from_millis(200));
//! timer.cancel();
//! timer.shutdown();
//! ```

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::trace;

use super::lock;

struct TimerState {
    deadline: Option<Instant>,
    running: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// Background deadline timer.
pub struct IdleTimer {
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl IdleTimer {
    /// Start the worker thread.
    pub fn spawn<F>(on_expire: F) -> std::io::Result<Self>
    where
        F: Fn(Instant) + Send + 'static,
    {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                running: true,
            }),
            wake: Condvar::new(),
        });

        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name("spark-scan-idle".into())
            .spawn(move || run(&worker, on_expire))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Arm (or move) the deadline.
    pub fn arm(&self, deadline: Instant) {
        lock(&self.shared.state).deadline = Some(deadline);
        self.shared.wake.notify_one();
    }

    /// Disarm without firing.
    pub fn cancel(&self) {
        let mut state = lock(&self.shared.state);
        if state.deadline.take().is_some() {
            self.shared.wake.notify_one();
        }
    }

    /// Arm to `deadline`, or cancel when there is none.
    pub fn sync(&self, deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => self.arm(deadline),
            None => self.cancel(),
        }
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.shared.state).deadline.is_some()
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        {
            let mut state = lock(&self.shared.state);
            state.running = false;
            state.deadline = None;
        }
        self.shared.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            // A panicking expiry callback already unwound the worker
            let _ = handle.join();
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run<F: Fn(Instant)>(shared: &TimerShared, on_expire: F) {
    let mut state = lock(&shared.state);
    loop {
        if !state.running {
            return;
        }
        match state.deadline {
            None => {
                state = shared.wake.wait(state).unwrap_or_else(|e| e.into_inner());
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    state.deadline = None;
                    drop(state);
                    trace!("idle timer fired");
                    on_expire(now);
                    state = lock(&shared.state);
                } else {
                    let (next, _) = shared
                        .wake
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    state = next;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_timer() -> (IdleTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let timer = IdleTimer::spawn(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (timer, fired)
    }

    #[test]
    fn test_fires_once_after_deadline() {
        let (timer, fired) = counting_timer();

        timer.arm(Instant::now() + Duration::from_millis(20));
        assert!(timer.is_armed());

        thread::sleep(Duration::from_millis(120));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());

        timer.shutdown();
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let (timer, fired) = counting_timer();

        timer.arm(Instant::now() + Duration::from_millis(40));
        timer.cancel();
        assert!(!timer.is_armed());

        thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        timer.shutdown();
    }

    #[test]
    fn test_rearm_moves_deadline() {
        let (timer, fired) = counting_timer();

        timer.arm(Instant::now() + Duration::from_millis(30));
        timer.arm(Instant::now() + Duration::from_secs(60));

        thread::sleep(Duration::from_millis(100));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_armed());

        timer.shutdown();
    }

    #[test]
    fn test_sync() {
        let (timer, _fired) = counting_timer();

        timer.sync(Some(Instant::now() + Duration::from_secs(60)));
        assert!(timer.is_armed());
        timer.sync(None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_shutdown_with_pending_deadline_does_not_fire() {
        let (timer, fired) = counting_timer();

        timer.arm(Instant::now() + Duration::from_millis(30));
        timer.shutdown();

        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
