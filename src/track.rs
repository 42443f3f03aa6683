use rand::Rng;

use crate::countdown::CountdownTimer;
use crate::equation::{self, Equation, GenPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Wrong,
    Timeout,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Wrong => write!(f, "wrong"),
            EndReason::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Continue,
    Eliminated {
        equation: Equation,
        reason: EndReason,
    },
}

/// One player's running state: score, the statement in front of them, and
/// their countdown. Once `active` drops it never comes back for the rest of
/// the session, and every further input is absorbed as a no-op.
#[derive(Debug)]
pub struct PlayerTrack {
    pub score: u32,
    pub equation: Equation,
    pub active: bool,
    pub first_question: bool,
    timer: CountdownTimer,
    time_limit_ms: u64,
    policy: GenPolicy,
    reaction_times_ms: Vec<u64>,
    question_shown_at_ms: u64,
}

impl PlayerTrack {
    /// The caller supplies the opening statement so coordinators can hand
    /// the same one to both players.
    pub fn new(equation: Equation, policy: GenPolicy, time_limit_ms: u64) -> Self {
        Self {
            score: 0,
            equation,
            active: true,
            // the opening statement runs without a clock
            first_question: true,
            timer: CountdownTimer::new(),
            time_limit_ms,
            policy,
            reaction_times_ms: Vec::new(),
            question_shown_at_ms: 0,
        }
    }

    /// Judge the current statement. Correct answers advance to the next
    /// statement (difficulty follows the new score) and restart the clock;
    /// a wrong answer is terminal. Returns `None` when the track is already
    /// out and the event should be dropped.
    pub fn answer<R: Rng>(&mut self, rng: &mut R, now_ms: u64, choice: bool) -> Option<AnswerOutcome> {
        if !self.active {
            return None;
        }
        if choice == self.equation.is_correct {
            self.record_correct(now_ms);
            let next = equation::generate(rng, self.policy, self.score);
            self.set_round(next, now_ms, true);
            Some(AnswerOutcome::Continue)
        } else {
            let last = self.equation;
            self.eliminate();
            Some(AnswerOutcome::Eliminated {
                equation: last,
                reason: EndReason::Wrong,
            })
        }
    }

    /// Score a correct judgement without advancing the statement. The
    /// coordinator decides what the next round looks like (shared statement
    /// in co-op, own stream otherwise).
    pub fn record_correct(&mut self, now_ms: u64) {
        self.timer.cancel();
        self.score += 1;
        self.reaction_times_ms
            .push(now_ms.saturating_sub(self.question_shown_at_ms));
    }

    /// Install the next statement. `run_clock` is false only for the opening
    /// statement of a session.
    pub fn set_round(&mut self, equation: Equation, now_ms: u64, run_clock: bool) {
        self.equation = equation;
        self.question_shown_at_ms = now_ms;
        if run_clock {
            self.first_question = false;
            self.timer.start(now_ms, self.time_limit_ms);
        }
    }

    pub fn eliminate(&mut self) {
        self.timer.cancel();
        self.active = false;
    }

    /// Advance the clock; an expiry of the live run is terminal. Idempotent:
    /// once out, later ticks (including a stale expiry from a cancelled run)
    /// do nothing.
    pub fn tick(&mut self, now_ms: u64) -> Option<AnswerOutcome> {
        if !self.active || self.first_question {
            return None;
        }
        let expiry = self.timer.tick(now_ms)?;
        if !self.timer.is_current(expiry) {
            return None;
        }
        self.active = false;
        Some(AnswerOutcome::Eliminated {
            equation: self.equation,
            reason: EndReason::Timeout,
        })
    }

    pub fn time_remaining_ms(&self) -> u64 {
        if !self.active {
            0
        } else if self.first_question {
            self.time_limit_ms
        } else {
            self.timer.remaining_ms()
        }
    }

    pub fn clock_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn reaction_times_ms(&self) -> &[u64] {
        &self.reaction_times_ms
    }
}
