use crate::leaderboard::{LeaderboardDb, SubmitOutcome};

pub const LEADERBOARD_ID: &str = "scores";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub player_alias: Option<String>,
    pub error: Option<String>,
}

/// Seam for a platform score service (Game Center and friends). The game
/// treats it as an alternate leaderboard backend chosen by availability and
/// sign-in state; it is never required, and every failure is a value.
pub trait ScoreService {
    fn authenticate(&mut self) -> AuthOutcome;
    fn is_authenticated(&self) -> bool;
    fn submit_score(&mut self, score: u32, leaderboard_id: &str) -> SubmitOutcome;
    fn fetch_best_score(&self, leaderboard_id: &str) -> Option<u32>;
    fn show_native_leaderboard(&mut self, leaderboard_id: &str) -> bool;
}

/// What ships on platforms without a native game service: never signed in,
/// so everything routes to the local store.
#[derive(Debug, Default)]
pub struct UnavailableScoreService;

impl ScoreService for UnavailableScoreService {
    fn authenticate(&mut self) -> AuthOutcome {
        AuthOutcome {
            authenticated: false,
            player_alias: None,
            error: Some("no native score service on this platform".into()),
        }
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    fn submit_score(&mut self, _score: u32, _leaderboard_id: &str) -> SubmitOutcome {
        SubmitOutcome::failed("native score service unavailable")
    }

    fn fetch_best_score(&self, _leaderboard_id: &str) -> Option<u32> {
        None
    }

    fn show_native_leaderboard(&mut self, _leaderboard_id: &str) -> bool {
        false
    }
}

/// Picks a backend per call: the native service when signed in, the local
/// store otherwise.
pub struct ScoreRouter<S: ScoreService> {
    service: S,
}

impl<S: ScoreService> ScoreRouter<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn submit(
        &mut self,
        db: &mut LeaderboardDb,
        username: Option<&str>,
        score: u32,
        time_limit_ms: u64,
    ) -> SubmitOutcome {
        if self.service.is_authenticated() {
            return self.service.submit_score(score, LEADERBOARD_ID);
        }
        match username {
            Some(name) => db.submit_score(name, score, time_limit_ms),
            None => SubmitOutcome::failed("Username required for local leaderboard"),
        }
    }

    /// Try the native leaderboard UI; false means the caller should render
    /// its own list.
    pub fn show_native_leaderboard(&mut self) -> bool {
        self.service.is_authenticated() && self.service.show_native_leaderboard(LEADERBOARD_ID)
    }

    /// The native backend always accepts a score; only the local list has a
    /// cutoff.
    pub fn would_make_top_list(&self, db: &LeaderboardDb, score: u32) -> bool {
        if self.service.is_authenticated() {
            return true;
        }
        db.would_make_top_list(score).unwrap_or(false)
    }
}
