use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("mathdash"),
            )
        } else {
            ProjectDirs::from("", "", "mathdash").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn leaderboard_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("scores.db"))
    }

    pub fn history_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sessions.csv"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "mathdash").map(|pd| pd.config_dir().join("config.json"))
    }
}
