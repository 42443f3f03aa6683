// End-to-end over the persistence seams with real files: play a scripted
// session, log it, and push the score through the leaderboard routing.

use assert_matches::assert_matches;
use rusqlite::Connection;
use tempfile::tempdir;

use mathdash::history::SessionRecord;
use mathdash::leaderboard::LeaderboardDb;
use mathdash::score_service::{ScoreRouter, UnavailableScoreService};
use mathdash::session::{Mode, Session, SessionConfig, SessionResult};

fn play_solo_to_score(target: u32, seed: u64) -> Session {
    let mut session = Session::seeded(SessionConfig::new(Mode::Solo, 2_000), seed);
    let mut now_ms = 0;
    for _ in 0..target {
        let choice = session.snapshot().players[0].equation.is_correct;
        now_ms += 500;
        session.submit_answer(0, now_ms, choice);
    }
    let choice = session.snapshot().players[0].equation.is_correct;
    session.submit_answer(0, now_ms + 500, !choice);
    assert!(session.is_over());
    session
}

#[test]
fn finished_session_lands_in_log_and_leaderboard() {
    let dir = tempdir().unwrap();
    let session = play_solo_to_score(6, 99);
    let result = session.result().unwrap();
    assert_matches!(result, SessionResult::Solo { score: 6, .. });

    // history log on disk
    let log_path = dir.path().join("sessions.csv");
    let record = SessionRecord::from_result(
        session.mode(),
        session.time_limit_ms(),
        &result,
        session.reaction_times_ms(0),
    );
    record.append_to(&log_path).unwrap();
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.lines().nth(1).unwrap().contains(",solo,2000,6,,wrong,"));

    // score through the router into a file-backed store
    let db_path = dir.path().join("scores.db");
    let mut db = LeaderboardDb::open(Connection::open(&db_path).unwrap()).unwrap();
    let mut router = ScoreRouter::new(UnavailableScoreService);

    let SessionResult::Solo { score, .. } = result else {
        unreachable!()
    };
    assert!(router.would_make_top_list(&db, score));
    let outcome = router.submit(&mut db, Some("integration"), score, session.time_limit_ms());
    assert!(outcome.success, "{:?}", outcome.error);

    // reopen from disk and confirm the entry survived
    drop(db);
    let db = LeaderboardDb::open(Connection::open(&db_path).unwrap()).unwrap();
    let entries = db.top_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "integration");
    assert_eq!(entries[0].score, 6);
    assert_eq!(entries[0].rank, 1);
}

#[test]
fn reaction_times_match_the_scripted_pace() {
    let session = play_solo_to_score(3, 5);
    // answers at 500ms intervals, counted from when each statement appeared
    assert_eq!(session.reaction_times_ms(0), &[500, 500, 500]);
}
