use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::equation::{self, Equation, GenPolicy};
use crate::track::{AnswerOutcome, EndReason, PlayerTrack};

/// The three ways to play. Solo is one track; Coop is two players racing one
/// shared statement and one shared clock; Versus is two fully independent
/// runs racing each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Solo,
    Coop,
    Versus,
}

impl Mode {
    pub fn player_count(&self) -> usize {
        match self {
            Mode::Solo => 1,
            Mode::Coop | Mode::Versus => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Player1,
    Player2,
    Tie,
}

/// Higher score wins; equal scores tie. Pure, used only for presentation.
pub fn winner_of(p1: u32, p2: u32) -> Winner {
    match p1.cmp(&p2) {
        std::cmp::Ordering::Greater => Winner::Player1,
        std::cmp::Ordering::Less => Winner::Player2,
        std::cmp::Ordering::Equal => Winner::Tie,
    }
}

/// Why and how a session ended. Solo keeps the terminal statement and the
/// reason for the game-over screen; two-player modes report the score pair
/// only, since independent eliminations have no single "last statement".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResult {
    Solo {
        score: u32,
        equation: Equation,
        reason: EndReason,
    },
    Duo {
        scores: (u32, u32),
        winner: Winner,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: Mode,
    pub time_limit_ms: u64,
    pub policy: GenPolicy,
}

impl SessionConfig {
    pub fn new(mode: Mode, time_limit_ms: u64) -> Self {
        Self {
            mode,
            time_limit_ms,
            policy: GenPolicy::Scaled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub score: u32,
    pub equation: Equation,
    pub time_remaining_ms: u64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub over: bool,
    pub result: Option<SessionResult>,
}

/// The session state machine. Single-threaded by design: discrete answer
/// events arrive via `submit_answer`, and one external `tick` advances every
/// running clock. Timestamps are milliseconds since session start on any
/// monotonic clock the caller likes.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    tracks: Vec<PlayerTrack>,
    rng: StdRng,
    result: Option<SessionResult>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic statement stream, for tests and replayable runs.
    pub fn seeded(config: SessionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SessionConfig, mut rng: StdRng) -> Self {
        // every mode opens on one statement at difficulty zero; in the
        // two-player modes both tracks get the same one
        let opening = equation::generate(&mut rng, config.policy, 0);
        let tracks = (0..config.mode.player_count())
            .map(|_| PlayerTrack::new(opening, config.policy, config.time_limit_ms))
            .collect();
        Self {
            config,
            tracks,
            rng,
            result: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn time_limit_ms(&self) -> u64 {
        self.config.time_limit_ms
    }

    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<SessionResult> {
        self.result
    }

    pub fn reaction_times_ms(&self, player: usize) -> &[u64] {
        self.tracks[player].reaction_times_ms()
    }

    /// Route a TRUE/FALSE judgement to a player. An out-of-range index is a
    /// caller bug; answers after the session (or that track) ended are
    /// silently dropped.
    pub fn submit_answer(&mut self, player: usize, now_ms: u64, choice: bool) {
        assert!(
            player < self.tracks.len(),
            "player index {} out of range in {} mode",
            player,
            self.config.mode
        );
        if self.result.is_some() {
            return;
        }
        match self.config.mode {
            Mode::Coop => self.coop_answer(player, now_ms, choice),
            Mode::Solo | Mode::Versus => {
                let outcome = self.tracks[player].answer(&mut self.rng, now_ms, choice);
                if let Some(AnswerOutcome::Eliminated { equation, reason }) = outcome {
                    self.on_elimination(equation, reason);
                }
            }
        }
    }

    /// Advance all running clocks to `now_ms`. Every expiry is applied
    /// before the terminal condition is judged, so two players timing out on
    /// the same tick produce one combined game over.
    pub fn tick(&mut self, now_ms: u64) {
        if self.result.is_some() {
            return;
        }
        let mut expired: Vec<Equation> = Vec::new();
        for track in &mut self.tracks {
            if let Some(AnswerOutcome::Eliminated { equation, .. }) = track.tick(now_ms) {
                expired.push(equation);
            }
        }
        if expired.is_empty() {
            return;
        }
        match self.config.mode {
            Mode::Solo => {
                self.result = Some(SessionResult::Solo {
                    score: self.tracks[0].score,
                    equation: expired[0],
                    reason: EndReason::Timeout,
                });
            }
            Mode::Coop => {
                // one shared clock: either player running out ends the run
                for track in &mut self.tracks {
                    track.eliminate();
                }
                self.finish_duo();
            }
            Mode::Versus => {
                if self.tracks.iter().all(|t| !t.active) {
                    self.finish_duo();
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            players: self
                .tracks
                .iter()
                .map(|t| PlayerSnapshot {
                    score: t.score,
                    equation: t.equation,
                    time_remaining_ms: t.time_remaining_ms(),
                    active: t.active,
                })
                .collect(),
            over: self.result.is_some(),
            result: self.result,
        }
    }

    fn coop_answer(&mut self, player: usize, now_ms: u64, choice: bool) {
        if !self.tracks[player].active {
            return;
        }
        if choice == self.tracks[player].equation.is_correct {
            self.tracks[player].record_correct(now_ms);
            let combined: u32 = self.tracks.iter().map(|t| t.score).sum();
            let next = equation::generate(&mut self.rng, self.config.policy, combined);
            for track in &mut self.tracks {
                track.set_round(next, now_ms, true);
            }
        } else {
            // a miss by either player ends the run for both, even though the
            // other never got to answer this statement
            for track in &mut self.tracks {
                track.eliminate();
            }
            self.finish_duo();
        }
    }

    fn on_elimination(&mut self, equation: Equation, reason: EndReason) {
        match self.config.mode {
            Mode::Solo => {
                self.result = Some(SessionResult::Solo {
                    score: self.tracks[0].score,
                    equation,
                    reason,
                });
            }
            Mode::Versus => {
                if self.tracks.iter().all(|t| !t.active) {
                    self.finish_duo();
                }
            }
            // co-op eliminations are handled wholesale in coop_answer/tick
            Mode::Coop => {}
        }
    }

    fn finish_duo(&mut self) {
        let scores = (self.tracks[0].score, self.tracks[1].score);
        self.result = Some(SessionResult::Duo {
            scores,
            winner: winner_of(scores.0, scores.1),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const LIMIT: u64 = 2_000;

    fn session(mode: Mode) -> Session {
        Session::seeded(SessionConfig::new(mode, LIMIT), 1234)
    }

    fn correct_choice(s: &Session, player: usize) -> bool {
        s.snapshot().players[player].equation.is_correct
    }

    #[test]
    fn solo_two_right_then_wrong_scores_two() {
        let mut s = session(Mode::Solo);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 100, c);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 600, c);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 900, !c);

        assert!(s.is_over());
        assert_matches!(
            s.result(),
            Some(SessionResult::Solo {
                score: 2,
                reason: EndReason::Wrong,
                ..
            })
        );
    }

    #[test]
    fn solo_timeout_keeps_score_and_reports_the_statement() {
        let mut s = session(Mode::Solo);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 0, c); // starts the clock
        let on_screen = s.snapshot().players[0].equation;

        s.tick(LIMIT - 1);
        assert!(!s.is_over());
        s.tick(LIMIT);

        assert_matches!(
            s.result(),
            Some(SessionResult::Solo {
                score: 1,
                equation,
                reason: EndReason::Timeout,
            }) if equation == on_screen
        );
    }

    #[test]
    fn opening_statement_never_times_out() {
        let mut s = session(Mode::Solo);
        s.tick(10 * LIMIT);
        assert!(!s.is_over(), "grace period: no clock before the first answer");
    }

    #[test]
    fn snapshot_time_remaining_follows_ticks() {
        let mut s = session(Mode::Solo);
        assert_eq!(s.snapshot().players[0].time_remaining_ms, LIMIT);

        let c = correct_choice(&s, 0);
        s.submit_answer(0, 0, c);
        s.tick(700);
        assert_eq!(s.snapshot().players[0].time_remaining_ms, LIMIT - 700);
    }

    #[test]
    fn coop_players_always_share_the_statement() {
        let mut s = session(Mode::Coop);
        let snap = s.snapshot();
        assert_eq!(snap.players[0].equation, snap.players[1].equation);

        let c = correct_choice(&s, 1);
        s.submit_answer(1, 100, c);
        let snap = s.snapshot();
        assert_eq!(snap.players[0].equation, snap.players[1].equation);
        assert_eq!(snap.players[0].score, 0);
        assert_eq!(snap.players[1].score, 1);
    }

    #[test]
    fn coop_wrong_answer_ends_the_whole_run_immediately() {
        let mut s = session(Mode::Coop);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 100, c); // p1 scores
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 300, !c); // p1 misses before p2 answers

        assert!(s.is_over());
        let snap = s.snapshot();
        assert!(!snap.players[0].active && !snap.players[1].active);
        assert_matches!(
            s.result(),
            Some(SessionResult::Duo {
                scores: (1, 0),
                winner: Winner::Player1,
            })
        );
    }

    #[test]
    fn coop_shared_clock_running_out_ends_both() {
        let mut s = session(Mode::Coop);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 0, c); // both clocks arm together
        s.tick(LIMIT);

        assert!(s.is_over());
        assert_matches!(
            s.result(),
            Some(SessionResult::Duo { scores: (1, 0), .. })
        );
    }

    #[test]
    fn versus_survivor_keeps_playing_after_an_elimination() {
        let mut s = session(Mode::Versus);

        // player 1 banks three, then misses
        for _ in 0..3 {
            let c = correct_choice(&s, 0);
            s.submit_answer(0, 100, c);
        }
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 400, !c);
        assert!(!s.is_over(), "one track down is not terminal");
        assert!(!s.snapshot().players[0].active);

        // eliminated player is inert; the survivor scores on
        s.submit_answer(0, 450, true);
        let c = correct_choice(&s, 1);
        s.submit_answer(1, 500, c);
        assert_eq!(s.snapshot().players[1].score, 1);

        let c = correct_choice(&s, 1);
        s.submit_answer(1, 700, !c);
        assert!(s.is_over());
        assert_matches!(
            s.result(),
            Some(SessionResult::Duo {
                scores: (3, 1),
                winner: Winner::Player1,
            })
        );
    }

    #[test]
    fn versus_opens_shared_then_streams_diverge_independently() {
        let mut s = session(Mode::Versus);
        let snap = s.snapshot();
        assert_eq!(snap.players[0].equation, snap.players[1].equation);
        let opening = snap.players[1].equation;

        let c = correct_choice(&s, 0);
        s.submit_answer(0, 100, c);
        let snap = s.snapshot();
        // p1 moved on, p2 still faces the opening statement
        assert_eq!(snap.players[1].equation, opening);
        assert_eq!(snap.players[0].score, 1);
        assert_eq!(snap.players[1].score, 0);
    }

    #[test]
    fn versus_double_expiry_is_one_combined_game_over() {
        let mut s = session(Mode::Versus);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 0, c);
        let c = correct_choice(&s, 1);
        s.submit_answer(1, 0, c);

        // both deadlines land inside the same tick
        s.tick(LIMIT + 5);
        assert!(s.is_over());
        assert_matches!(
            s.result(),
            Some(SessionResult::Duo {
                scores: (1, 1),
                winner: Winner::Tie,
            })
        );
    }

    #[test]
    fn events_after_the_end_are_absorbed() {
        let mut s = session(Mode::Solo);
        let c = correct_choice(&s, 0);
        s.submit_answer(0, 100, !c);
        let result = s.result();

        s.submit_answer(0, 200, true);
        s.tick(100_000);
        assert_eq!(s.result(), result);
    }

    #[test]
    #[should_panic(expected = "player index")]
    fn out_of_range_player_is_a_caller_bug() {
        let mut s = session(Mode::Solo);
        s.submit_answer(1, 0, true);
    }

    #[test]
    fn winner_is_a_pure_function_of_scores() {
        assert_eq!(winner_of(3, 1), Winner::Player1);
        assert_eq!(winner_of(1, 3), Winner::Player2);
        assert_eq!(winner_of(2, 2), Winner::Tie);
    }
}
