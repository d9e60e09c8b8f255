//! Locates the audio files a run will operate on.

use std::path::{Path, PathBuf};

use log::debug;

/// Extensions the tag writer can handle (ID3, Vorbis, and MP4 families).
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "flac", "ogg", "m4a", "mp4"];

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Collects the audio files directly inside `directory`, sorted by name.
/// Album runs rely on this order for the positional matching fast path.
pub fn collect_audio_files_in_directory(directory: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Failed to read directory {}: {}", directory.display(), err);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(
                    "Failed to read a directory entry in {}: {}",
                    directory.display(),
                    err
                );
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_supported_audio_file(&path) {
            files.push(path);
        }
    }

    files.sort_unstable();
    files
}

#[cfg(test)]
mod tests {
    use super::{collect_audio_files_in_directory, is_supported_audio_file};
    use std::path::Path;

    #[test]
    fn test_supported_extensions_are_case_insensitive() {
        assert!(is_supported_audio_file(Path::new("track.MP3")));
        assert!(is_supported_audio_file(Path::new("track.flac")));
        assert!(!is_supported_audio_file(Path::new("notes.txt")));
        assert!(!is_supported_audio_file(Path::new("no_extension")));
    }

    #[test]
    fn test_collect_returns_sorted_audio_files_only() {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("retag_discovery_{nonce}"));
        std::fs::create_dir_all(&dir).expect("fixture dir should be creatable");

        for name in ["02 - b.mp3", "01 - a.mp3", "cover.jpg"] {
            std::fs::write(dir.join(name), b"x").expect("fixture file should be writable");
        }

        let files = collect_audio_files_in_directory(&dir);
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().and_then(|name| name.to_str()).unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["01 - a.mp3", "02 - b.mp3"]);

        std::fs::remove_dir_all(dir).expect("fixture should be removable");
    }
}
