//! # Periodic Timer
//!
//! Background periodic timer driving the retry sequence. One timer can be
//! started, stopped, and restarted with a new period — including from
//! inside its own tick callback, which is how the retry sequence stretches
//! its period after every attempt.
//!
//! Each `start` bumps a generation counter and spawns a fresh worker
//! thread; a worker that wakes up under a stale generation exits quietly.
//! `stop` only flips the running flag and notifies — it never joins, so a
//! tick callback may stop the timer it runs on.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::lock;

#[derive(Debug)]
struct TimerState {
    running: bool,
    generation: u64,
    period: Duration,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

/// Restartable periodic timer backed by a background thread.
#[derive(Debug)]
pub struct PeriodicTimer {
    shared: Arc<Shared>,
    name: String,
}

impl PeriodicTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState {
                    running: false,
                    generation: 0,
                    period: Duration::ZERO,
                }),
                wakeup: Condvar::new(),
            }),
            name: name.into(),
        }
    }

    /// Start (or restart) the timer. `tick` runs on the timer thread once
    /// per period until the timer is stopped or restarted.
    pub fn start<F>(&self, period: Duration, tick: F)
    where
        F: Fn() + Send + 'static,
    {
        let my_generation = {
            let mut state = lock(&self.shared.state);
            state.generation = state.generation.wrapping_add(1);
            state.running = true;
            state.period = period;
            self.shared.wakeup.notify_all();
            state.generation
        };

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || loop {
                let period = {
                    let state = lock(&shared.state);
                    if !state.running || state.generation != my_generation {
                        return;
                    }
                    state.period
                };

                // Sleep one period, waking early on stop/restart.
                let mut state = lock(&shared.state);
                let mut remaining = period;
                loop {
                    if !state.running || state.generation != my_generation {
                        return;
                    }
                    let slept_from = Instant::now();
                    let (guard, result) = shared
                        .wakeup
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    state = guard;
                    if !state.running || state.generation != my_generation {
                        return;
                    }
                    if result.timed_out() {
                        break;
                    }
                    match remaining.checked_sub(slept_from.elapsed()) {
                        Some(left) if !left.is_zero() => remaining = left,
                        _ => break,
                    }
                }
                drop(state);

                tick();
            });

        if let Err(error) = spawned {
            tracing::error!(timer = %self.name, %error, "failed to spawn timer thread");
            lock(&self.shared.state).running = false;
        }
    }

    /// Stop the timer. Safe to call from inside the tick callback.
    pub fn stop(&self) {
        let mut state = lock(&self.shared.state);
        state.running = false;
        self.shared.wakeup.notify_all();
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
