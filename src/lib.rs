// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod countdown;
pub mod equation;
pub mod history;
pub mod leaderboard;
pub mod runtime;
pub mod score_service;
pub mod session;
pub mod track;
pub mod ui;
pub mod util;

/// Resolution of the shared scheduler tick driving all countdowns.
pub const TICK_RATE_MS: u64 = 10;
