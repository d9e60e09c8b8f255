//! Filesystem side effects: renames, artist/album sorting, sidecar
//! files. All operations are immediate and unbuffered; a failure is
//! logged and the file stays where it is.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{error, info};
use regex::Regex;

use crate::model::{RemoteTrack, TagRecord};

const MISSING_TRACKS_REPORT: &str = "missing_tracks.txt";

/// Strips characters the common filesystems reject.
pub fn sanitize_for_filesystem(name: &str) -> String {
    name.chars()
        .filter(|ch| !matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}

/// Cleans a filename stem into a title guess: bracketed junk and a
/// leading "NN - " prefix are dropped.
pub fn clean_filename_guess(stem: &str) -> String {
    static JUNK: OnceLock<Regex> = OnceLock::new();
    let junk = JUNK.get_or_init(|| {
        Regex::new(r"\[.*?\]|^\d+\s*-\s*").expect("filename junk pattern is valid")
    });
    junk.replace_all(stem, "").trim().to_string()
}

/// Reads "Artist/Album" from the two directories containing `path`.
pub fn infer_artist_album(path: &Path) -> Option<(String, String)> {
    let directory = if path.is_file() { path.parent()? } else { path };
    let album = directory.file_name()?.to_str()?.to_string();
    let artist = directory.parent()?.file_name()?.to_str()?.to_string();
    Some((artist, album))
}

pub struct FileActions {
    dry_run: bool,
}

impl FileActions {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Renames the file after the record's title. Returns the path the
    /// file now lives at; on failure the original path is kept.
    pub fn rename_to_title(&self, path: &Path, record: &TagRecord) -> PathBuf {
        let Some(title) = record.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
        else {
            return path.to_path_buf();
        };
        let clean_title = sanitize_for_filesystem(title);
        let mut file_name = clean_title;
        if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            file_name = format!("{file_name}.{ext}");
        }
        let new_path = match path.parent() {
            Some(parent) => parent.join(&file_name),
            None => PathBuf::from(&file_name),
        };
        if new_path == path {
            return new_path;
        }
        info!("mv '{}' '{}'", path.display(), new_path.display());
        if self.dry_run {
            return path.to_path_buf();
        }
        match fs::rename(path, &new_path) {
            Ok(()) => new_path,
            Err(err) => {
                error!("Rename failed: {err}");
                path.to_path_buf()
            }
        }
    }

    /// Moves the file into a `<parent>/<Artist>/<Album>/` tree next to
    /// the directory it currently lives in.
    pub fn autosort(&self, path: &Path, record: &TagRecord) -> PathBuf {
        let artist = record
            .album_artist
            .first()
            .or_else(|| record.artist.first())
            .map(String::as_str)
            .unwrap_or("Unknown");
        let album = record.album.as_deref().unwrap_or("Unknown Album");
        let Some(base) = path.parent().and_then(Path::parent) else {
            return path.to_path_buf();
        };
        let dest_dir = base
            .join(sanitize_for_filesystem(artist))
            .join(sanitize_for_filesystem(album));
        let Some(file_name) = path.file_name() else {
            return path.to_path_buf();
        };
        let dest = dest_dir.join(file_name);
        info!("mkdir -p '{}' && mv '{}' '{}'", dest_dir.display(), path.display(), dest.display());
        if self.dry_run {
            return path.to_path_buf();
        }
        if let Err(err) = fs::create_dir_all(&dest_dir) {
            error!("Could not create '{}': {err}", dest_dir.display());
            return path.to_path_buf();
        }
        match fs::rename(path, &dest) {
            Ok(()) => dest,
            Err(err) => {
                error!("Move failed: {err}");
                path.to_path_buf()
            }
        }
    }

    /// Writes lyrics to a `.lrc` sidecar next to the audio file.
    pub fn save_lrc(&self, audio_path: &Path, lyrics: &str) {
        if lyrics.is_empty() {
            return;
        }
        let lrc_path = audio_path.with_extension("lrc");
        info!("Writing lyrics to '{}'", lrc_path.display());
        if self.dry_run {
            return;
        }
        if let Err(err) = fs::write(&lrc_path, lyrics) {
            error!("Failed to save '{}': {err}", lrc_path.display());
        }
    }

    /// Writes the sidecar report for tracks no local file claimed.
    pub fn write_missing_tracks_report(
        &self,
        directory: &Path,
        album_title: &str,
        missing: &[RemoteTrack],
    ) -> Option<PathBuf> {
        if missing.is_empty() {
            return None;
        }
        let mut lines = vec![format!("Album: {album_title}"), "Missing tracks:".to_string()];
        for track in missing {
            let number = track
                .number
                .map(|number| number.to_string())
                .unwrap_or_else(|| "?".to_string());
            let artist = track.artist.as_deref().unwrap_or("Unknown");
            lines.push(format!("  {number}. {} ({artist})", track.title));
        }
        let report_path = directory.join(MISSING_TRACKS_REPORT);
        info!("Writing missing-track report to '{}'", report_path.display());
        if self.dry_run {
            return None;
        }
        match fs::write(&report_path, lines.join("\n") + "\n") {
            Ok(()) => Some(report_path),
            Err(err) => {
                error!("Failed to write '{}': {err}", report_path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        clean_filename_guess, infer_artist_album, sanitize_for_filesystem, FileActions,
    };
    use crate::model::{RemoteTrack, TagRecord};
    use std::path::{Path, PathBuf};

    fn temp_dir(label: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("retag_{label}_{nonce}"));
        std::fs::create_dir_all(&dir).expect("fixture dir should be creatable");
        dir
    }

    #[test]
    fn test_sanitize_strips_reserved_characters() {
        assert_eq!(
            sanitize_for_filesystem(r#"AC/DC: "Back\In|Black"?*"#),
            "ACDC BackInBlack"
        );
    }

    #[test]
    fn test_clean_filename_guess_drops_junk() {
        assert_eq!(clean_filename_guess("03 - The Woods [Official]"), "The Woods");
        assert_eq!(clean_filename_guess("Curio"), "Curio");
    }

    #[test]
    fn test_infer_artist_album_from_directory_layout() {
        let inferred = infer_artist_album(Path::new("/music/AllttA/The Upper Hand"));
        assert_eq!(
            inferred,
            Some(("AllttA".to_string(), "The Upper Hand".to_string()))
        );
    }

    #[test]
    fn test_rename_moves_file_to_clean_title() {
        let dir = temp_dir("rename");
        let original = dir.join("03 - track.mp3");
        std::fs::write(&original, b"x").expect("fixture should be writable");

        let record = TagRecord {
            title: Some("The Woods?".to_string()),
            ..TagRecord::default()
        };
        let renamed = FileActions::new(false).rename_to_title(&original, &record);
        assert_eq!(renamed, dir.join("The Woods.mp3"));
        assert!(renamed.exists());
        assert!(!original.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rename_under_dry_run_leaves_file_alone() {
        let dir = temp_dir("rename_dry");
        let original = dir.join("track.mp3");
        std::fs::write(&original, b"x").expect("fixture should be writable");

        let record = TagRecord {
            title: Some("New Name".to_string()),
            ..TagRecord::default()
        };
        let result = FileActions::new(true).rename_to_title(&original, &record);
        assert_eq!(result, original);
        assert!(original.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_autosort_moves_into_artist_album_tree() {
        let base = temp_dir("autosort");
        let album_dir = base.join("incoming");
        std::fs::create_dir_all(&album_dir).expect("fixture dir should be creatable");
        let file = album_dir.join("song.flac");
        std::fs::write(&file, b"x").expect("fixture should be writable");

        let record = TagRecord {
            artist: vec!["AllttA".to_string()],
            album: Some("The Upper Hand".to_string()),
            ..TagRecord::default()
        };
        let moved = FileActions::new(false).autosort(&file, &record);
        assert_eq!(moved, base.join("AllttA").join("The Upper Hand").join("song.flac"));
        assert!(moved.exists());

        std::fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn test_missing_tracks_report_lists_album_and_tracks() {
        let dir = temp_dir("report");
        let missing = vec![RemoteTrack {
            id: 9,
            number: Some(4),
            title: "Tunnel Vision".to_string(),
            artist: Some("AllttA".to_string()),
        }];
        let report = FileActions::new(false)
            .write_missing_tracks_report(&dir, "The Upper Hand", &missing)
            .expect("report should be written");

        let text = std::fs::read_to_string(&report).expect("report should be readable");
        assert!(text.contains("Album: The Upper Hand"));
        assert!(text.contains("4. Tunnel Vision (AllttA)"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_no_report_for_empty_missing_set() {
        let dir = temp_dir("report_empty");
        let report = FileActions::new(false).write_missing_tracks_report(&dir, "Album", &[]);
        assert!(report.is_none());
        assert!(!dir.join("missing_tracks.txt").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_lrc_writes_sidecar_next_to_audio() {
        let dir = temp_dir("lrc");
        let audio = dir.join("song.mp3");
        std::fs::write(&audio, b"x").expect("fixture should be writable");

        FileActions::new(false).save_lrc(&audio, "[00:01.00] line");
        let lrc = dir.join("song.lrc");
        assert_eq!(
            std::fs::read_to_string(&lrc).expect("sidecar should exist"),
            "[00:01.00] line"
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
