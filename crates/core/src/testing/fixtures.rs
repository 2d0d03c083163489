//! Canned engine data for tests.

use crate::engine::{EngineStats, FileEntry, TorrentActivity};

/// A two-file torrent at the given completion fraction.
///
/// File names follow `<name>/file<i>` so tests can predict the path a
/// file-index token grant resolves to.
pub fn stats(hash_string: &str, name: &str, progress: f64) -> EngineStats {
    let file_size: u64 = 1000;
    let total_size = file_size * 2;

    EngineStats {
        hash_string: hash_string.to_string(),
        name: name.to_string(),
        activity: if progress >= 1.0 {
            TorrentActivity::Seeding
        } else {
            TorrentActivity::Downloading
        },
        total_size,
        percent_done: progress,
        downloaded_bytes: (total_size as f64 * progress) as u64,
        uploaded_bytes: 0,
        bytes_completed: (total_size as f64 * progress) as u64,
        rate_download: if progress >= 1.0 { 0 } else { 50_000 },
        rate_upload: 1_000,
        files: (0..2)
            .map(|i| FileEntry {
                name: format!("{}/file{}", name, i),
                size_bytes: file_size,
                progress,
            })
            .collect(),
    }
}
