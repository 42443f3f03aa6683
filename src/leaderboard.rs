use chrono::Utc;
use rusqlite::{params, Connection, Result};

use crate::app_dirs::AppDirs;
use std::path::PathBuf;

pub const MAX_ENTRIES: usize = 10;

/// One row of the local top-ten list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub score: u32,
    pub time_limit_ms: u64,
    pub submitted_at_ms: i64,
}

/// Outcome of a submission. Collaborator failures are data, not panics:
/// the game session must never be affected by a leaderboard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SubmitOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 3-20 characters, letters/digits/underscores/spaces, judged after
/// trimming. Returns the trimmed name on success.
pub fn validate_username(username: &str) -> std::result::Result<String, String> {
    let trimmed = username.trim();
    if trimmed.len() < 3 {
        return Err("Username must be at least 3 characters".into());
    }
    if trimmed.len() > 20 {
        return Err("Username must be 20 characters or less".into());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ')
    {
        return Err("Username can only contain letters, numbers, spaces, and underscores".into());
    }
    Ok(trimmed.to_string())
}

/// Local leaderboard store. Keeps at most the ten best scores, ordered by
/// score and then recency.
#[derive(Debug)]
pub struct LeaderboardDb {
    conn: Connection,
}

impl LeaderboardDb {
    pub fn new() -> Result<Self> {
        let db_path = Self::db_path().unwrap_or_else(|| PathBuf::from("mathdash_scores.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::open(Connection::open(&db_path)?)
    }

    /// Build on an existing connection (in-memory in tests).
    pub fn open(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                score INTEGER NOT NULL,
                time_limit_ms INTEGER NOT NULL,
                submitted_at_ms INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_rank ON scores(score DESC, submitted_at_ms DESC)",
            [],
        )?;

        Ok(LeaderboardDb { conn })
    }

    fn db_path() -> Option<PathBuf> {
        AppDirs::leaderboard_db_path()
    }

    /// Record a score. Validation and storage errors come back in the
    /// outcome; nothing here is allowed to escape as a panic.
    pub fn submit_score(
        &mut self,
        username: &str,
        score: u32,
        time_limit_ms: u64,
    ) -> SubmitOutcome {
        let name = match validate_username(username) {
            Ok(name) => name,
            Err(error) => return SubmitOutcome::failed(error),
        };

        match self.insert_and_prune(&name, score, time_limit_ms) {
            Ok(()) => SubmitOutcome::ok(),
            Err(e) => SubmitOutcome::failed(format!("Failed to save score: {}", e)),
        }
    }

    fn insert_and_prune(&mut self, username: &str, score: u32, time_limit_ms: u64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO scores (username, score, time_limit_ms, submitted_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                score,
                time_limit_ms as i64,
                Utc::now().timestamp_millis(),
            ],
        )?;
        // only the top ten survive
        tx.execute(
            r#"
            DELETE FROM scores WHERE id NOT IN (
                SELECT id FROM scores
                ORDER BY score DESC, submitted_at_ms DESC
                LIMIT ?1
            )
            "#,
            params![MAX_ENTRIES as i64],
        )?;
        tx.commit()
    }

    /// The current top ten, best first, ties broken by most recent, with
    /// 1-based ranks filled in.
    pub fn top_entries(&self) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT username, score, time_limit_ms, submitted_at_ms
            FROM scores
            ORDER BY score DESC, submitted_at_ms DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![MAX_ENTRIES as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (username, score, time_limit_ms, submitted_at_ms) = row?;
            entries.push(LeaderboardEntry {
                rank: entries.len() + 1,
                username,
                score,
                time_limit_ms: time_limit_ms as u64,
                submitted_at_ms,
            });
        }
        Ok(entries)
    }

    /// True when the list is not full yet, otherwise when `score` beats the
    /// lowest score currently on it.
    pub fn would_make_top_list(&self, score: u32) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))?;
        if (count as usize) < MAX_ENTRIES {
            return Ok(true);
        }
        let lowest: u32 = self.conn.query_row(
            r#"
            SELECT MIN(score) FROM (
                SELECT score FROM scores
                ORDER BY score DESC, submitted_at_ms DESC
                LIMIT ?1
            )
            "#,
            params![MAX_ENTRIES as i64],
            |row| row.get(0),
        )?;
        Ok(score > lowest)
    }

    /// Wipe the list (reset from the settings screen, and tests).
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM scores", [])?;
        Ok(())
    }
}
