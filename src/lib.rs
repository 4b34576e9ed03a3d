use anyhow::{Result, anyhow};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub mod app;
pub mod cli;
pub mod database;
pub mod domain;
pub mod ipc;
pub mod library;
pub mod player;
pub mod settings;

pub use database::Database;
pub use library::Library;
pub use player::PlayerHandle;
pub use settings::Settings;

pub const CONFIG_DIRECTORY: &str = "doughnut";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const DATABASE_FILE: &str = "library.db";
pub const LOG_FILE: &str = "doughnut.log";
pub const STORAGE_DIRECTORY: &str = "Podcasts";

// Command polling cadence of the player thread, ~30fps
pub const REFRESH_RATE: Duration = Duration::from_millis(33);

/// `m:ss`, or `h:mm:ss` once the duration reaches an hour.
pub fn get_readable_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    match hours {
        0 => format!("{mins}:{secs:02}"),
        _ => format!("{hours}:{mins:02}:{secs:02}"),
    }
}

pub fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }

    let mut truncated: String = s.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Turn a podcast title into something safe to use as a directory name.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    match cleaned.trim_matches('.').trim() {
        "" => String::from("untitled"),
        s => s.to_string(),
    }
}

pub fn expand_tilde<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory!"))?;

    if path_str == "~" {
        return Ok(home);
    }

    if path_str.starts_with("~/") || path_str.starts_with("~\\") {
        return Ok(home.join(&path_str[2..]));
    }

    Err(anyhow!("Error expanding path with tilde (~): {path_str}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_duration_switches_to_hours_for_long_episodes() {
        let d = Duration::from_secs(3 * 3600 + 5 * 60 + 7);
        assert_eq!(get_readable_duration(d), "3:05:07");
    }

    #[test]
    fn readable_duration_compact_under_an_hour() {
        let d = Duration::from_secs(125);
        assert_eq!(get_readable_duration(d), "2:05");
    }

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_file_name("Tech/News: Daily"), "Tech-News- Daily");
        assert_eq!(sanitize_file_name("  ..  "), "untitled");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn expand_tilde_leaves_plain_paths() {
        let p = expand_tilde("/var/tmp").unwrap();
        assert_eq!(p, PathBuf::from("/var/tmp"));
    }
}
