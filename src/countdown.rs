/// Tick-driven countdown with cancellation.
///
/// The timer never sleeps or spawns anything; the owner feeds it timestamps
/// (milliseconds on some monotonic clock) and gets back at most one expiry
/// per run. Expiry is judged against the deadline captured at `start`, so
/// uneven tick delivery cannot drift the cutoff by more than one tick.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Cancelled,
}

/// Proof of a specific run having reached its deadline. Holders must check
/// it is still current before acting on it; a cancel invalidates the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    run: u64,
}

#[derive(Debug)]
pub struct CountdownTimer {
    state: TimerState,
    deadline_ms: u64,
    remaining_ms: u64,
    run: u64,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            deadline_ms: 0,
            remaining_ms: 0,
            run: 0,
        }
    }

    /// Begin a fresh run. A run already in flight is cancelled first; there
    /// is never more than one live run per timer.
    pub fn start(&mut self, now_ms: u64, duration_ms: u64) {
        if self.state == TimerState::Running {
            self.cancel();
        }
        self.run += 1;
        self.state = TimerState::Running;
        self.deadline_ms = now_ms + duration_ms;
        self.remaining_ms = duration_ms;
    }

    /// Stop the current run. Synchronous: any expiry minted for the old run
    /// is dead the moment this returns.
    pub fn cancel(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Cancelled;
            self.run += 1;
        }
    }

    /// Advance the clock. Returns the expiry exactly once, on the first tick
    /// at or past the deadline.
    pub fn tick(&mut self, now_ms: u64) -> Option<Expiry> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_ms = self.deadline_ms.saturating_sub(now_ms);
        if self.remaining_ms == 0 {
            self.state = TimerState::Expired;
            Some(Expiry { run: self.run })
        } else {
            None
        }
    }

    pub fn is_current(&self, expiry: Expiry) -> bool {
        expiry.run == self.run
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Remaining time as of the last tick (or the full duration before one).
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}
