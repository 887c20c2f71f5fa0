//! Rename-before-delete obfuscation.

use std::fs;
use std::path::{Path, PathBuf};

use rand::{Rng, thread_rng};
use tracing::{debug, warn};

const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MIN_NAME_LEN: usize = 8;
const MAX_NAME_LEN: usize = 18;

/// Random alphanumeric file name, 8 to 18 characters long.
pub fn random_name() -> String {
    let mut rng = thread_rng();
    let len = rng.gen_range(MIN_NAME_LEN..=MAX_NAME_LEN);
    (0..len)
        .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    /// Where the file lives after the last successful rename.
    pub path: PathBuf,
    pub renamed: u32,
}

/// Rename `path` up to `count` times, drawing each new name from `next_name`.
///
/// The first refusal stops the sequence; the file keeps its last good name.
/// A rename only counts once the file is observed under the new name.
pub fn obfuscate<F>(path: &Path, count: u32, mut next_name: F) -> RenameOutcome
where
    F: FnMut() -> String,
{
    let mut current = path.to_path_buf();
    let mut renamed = 0;

    for _ in 0..count {
        let candidate = current.with_file_name(next_name());
        if let Err(e) = fs::rename(&current, &candidate) {
            warn!("rename failed for {}: {}", current.display(), e);
            break;
        }
        if fs::symlink_metadata(&candidate).is_err() {
            warn!("{} vanished after rename", candidate.display());
            break;
        }
        debug!("renamed {} -> {}", current.display(), candidate.display());
        current = candidate;
        renamed += 1;
    }

    RenameOutcome {
        path: current,
        renamed,
    }
}
