use chrono::prelude::*;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::app_dirs::AppDirs;
use crate::session::{Mode, SessionResult};
use crate::util::{mean, std_dev};

/// One finished session, flattened for the append-only CSV log.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub mode: Mode,
    pub time_limit_ms: u64,
    pub p1_score: u32,
    pub p2_score: Option<u32>,
    pub end: String,
    pub mean_reaction_ms: Option<f64>,
    pub std_dev_reaction_ms: Option<f64>,
}

impl SessionRecord {
    /// Flatten a session result; reaction stats are player 1's.
    pub fn from_result(
        mode: Mode,
        time_limit_ms: u64,
        result: &SessionResult,
        reactions_ms: &[u64],
    ) -> Self {
        let (p1_score, p2_score, end) = match result {
            SessionResult::Solo { score, reason, .. } => (*score, None, reason.to_string()),
            SessionResult::Duo { scores, .. } => (scores.0, Some(scores.1), String::new()),
        };
        let reactions: Vec<f64> = reactions_ms.iter().map(|&ms| ms as f64).collect();
        Self {
            mode,
            time_limit_ms,
            p1_score,
            p2_score,
            end,
            mean_reaction_ms: mean(&reactions),
            std_dev_reaction_ms: std_dev(&reactions),
        }
    }

    /// Append to the default log under the user state directory. Callers
    /// drop the error; a broken log never interferes with the game.
    pub fn append(&self) -> io::Result<()> {
        match AppDirs::history_log_path() {
            Some(path) => self.append_to(&path),
            None => Ok(()),
        }
    }

    pub fn append_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !path.exists();

        let mut log_file = OpenOptions::new().append(true).create(true).open(path)?;

        if needs_header {
            writeln!(
                log_file,
                "date,mode,time_limit_ms,p1_score,p2_score,end,mean_reaction_ms,std_dev_reaction_ms"
            )?;
        }

        writeln!(
            log_file,
            "{},{},{},{},{},{},{},{}",
            Local::now().format("%c"),
            self.mode.to_string().to_lowercase(),
            self.time_limit_ms,
            self.p1_score,
            self.p2_score.map_or(String::new(), |s| s.to_string()),
            self.end,
            self.mean_reaction_ms
                .map_or(String::new(), |m| format!("{:.1}", m)),
            self.std_dev_reaction_ms
                .map_or(String::new(), |s| format!("{:.1}", s)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::{Equation, Op};
    use crate::session::Winner;
    use crate::track::EndReason;
    use tempfile::tempdir;

    fn solo_result() -> SessionResult {
        SessionResult::Solo {
            score: 4,
            equation: Equation {
                left: 3,
                op: Op::Add,
                right: 4,
                shown_result: 8,
                is_correct: false,
            },
            reason: EndReason::Timeout,
        }
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.csv");

        let record =
            SessionRecord::from_result(Mode::Solo, 2_000, &solo_result(), &[500, 700, 600, 800]);
        record.append_to(&path).unwrap();
        record.append_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,mode,"));
        assert!(lines[1].contains(",solo,2000,4,,timeout,650.0,"));
    }

    #[test]
    fn duo_records_both_scores_and_no_reason() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.csv");

        let result = SessionResult::Duo {
            scores: (3, 5),
            winner: Winner::Player2,
        };
        let record = SessionRecord::from_result(Mode::Versus, 1_000, &result, &[]);
        record.append_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().nth(1).unwrap().contains(",versus,1000,3,5,,,"));
    }
}
