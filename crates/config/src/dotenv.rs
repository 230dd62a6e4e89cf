//! `.env` discovery.
//!
//! Files are looked up in three places, in order:
//!
//! 1. the start directory
//! 2. the first ancestor that contains a `.git` entry (the project root)
//! 3. the home directory
//!
//! Variables already present in the environment are never overwritten, so
//! a file earlier in the list wins over a later one.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ENV_FILE: &str = ".env";

/// The `.env` paths to try for `start`, without duplicates.
///
/// Paths are returned whether or not they exist.
pub fn env_file_candidates(start: &Path, home: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![start.join(ENV_FILE)];

    if let Some(root) = start.ancestors().skip(1).find(|dir| dir.join(".git").exists()) {
        candidates.push(root.join(ENV_FILE));
    }

    candidates.push(home.join(ENV_FILE));

    let mut unique = Vec::with_capacity(candidates.len());
    for path in candidates {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}

/// Load every existing `.env` file for `start`. Returns the files loaded.
pub fn load_env_files(start: &Path) -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for path in env_file_candidates(start, &crate::dirs_home()) {
        if !path.is_file() {
            continue;
        }
        match dotenvy::from_path(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Loaded environment file");
                loaded.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable environment file"),
        }
    }
    loaded
}

/// Shorten a secret for display: first 10 and last 4 characters.
///
/// Values of 14 characters or fewer are hidden entirely.
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 14 {
        return "***".into();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
