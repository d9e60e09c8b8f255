//! Pairs local files with a remote album tracklist.
//!
//! A clean rip (equal counts, no similarity matching requested) is paired
//! by position. Otherwise filenames are scored against track titles and
//! leftovers go through interactive manual matching.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::console::Console;
use crate::model::{MatchPair, RemoteTrack};

/// A fuzzy score must be strictly above this to take a track.
pub const MATCH_ACCEPT_THRESHOLD: u32 = 60;

/// Result of matching one directory against one tracklist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub pairs: Vec<MatchPair>,
    /// Files nothing was found for, even after manual matching.
    pub unmatched_files: Vec<PathBuf>,
    /// Tracks no file claimed; reported as missing and never tagged.
    pub missing_tracks: Vec<RemoteTrack>,
}

fn token_sort_key(text: &str) -> String {
    let mut tokens: Vec<String> = text
        .to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-order-independent similarity on a 0-100 scale.
pub fn similarity_score(left: &str, right: &str) -> u32 {
    let left_key = token_sort_key(left);
    let right_key = token_sort_key(right);
    if left_key == right_key {
        return 100;
    }
    if left_key.is_empty() || right_key.is_empty() {
        return 0;
    }
    (strsim::sorensen_dice(&left_key, &right_key) * 100.0).round() as u32
}

/// Strips a leading "track number + separator" prefix from a file stem.
pub fn strip_track_number_prefix(stem: &str) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"^\d+\s*[-.]?\s*").expect("track prefix pattern is valid")
    });
    prefix.replace(stem, "").to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

fn fuzzy_pair(files: &[PathBuf], tracks: &[RemoteTrack]) -> Vec<MatchPair> {
    let mut claimed_track_ids: HashSet<u64> = HashSet::new();
    let mut pairs = Vec::new();

    for file in files {
        let clean_stem = strip_track_number_prefix(&file_stem(file));
        let mut best_score = 0u32;
        let mut best_track: Option<&RemoteTrack> = None;
        for track in tracks {
            if claimed_track_ids.contains(&track.id) {
                continue;
            }
            let score = similarity_score(&clean_stem, &track.title);
            // Strictly-greater keeps ties on the first track in list order.
            if score > best_score {
                best_score = score;
                best_track = Some(track);
            }
        }

        if let Some(track) = best_track {
            if best_score > MATCH_ACCEPT_THRESHOLD {
                debug!(
                    "Matched '{}' -> '{}' (score {best_score})",
                    file.display(),
                    track.title
                );
                claimed_track_ids.insert(track.id);
                pairs.push(MatchPair {
                    file: file.clone(),
                    track: track.clone(),
                });
            }
        }
    }

    pairs
}

fn format_track_choice(index: usize, track: &RemoteTrack) -> String {
    let number = track
        .number
        .map(|number| number.to_string())
        .unwrap_or_else(|| "?".to_string());
    let artist = track.artist.as_deref().unwrap_or("Unknown");
    format!("  [{}] {}. {} ({})", index + 1, number, track.title, artist)
}

fn reconcile_manually(
    unmatched_files: &[PathBuf],
    available: &mut Vec<RemoteTrack>,
    console: &mut dyn Console,
) -> (Vec<MatchPair>, Vec<PathBuf>) {
    let mut pairs = Vec::new();
    let mut skipped = Vec::new();

    console.notify(
        crate::console::NoticeLevel::Info,
        "Some files could not be matched to the tracklist automatically.",
    );

    for file in unmatched_files {
        if available.is_empty() {
            skipped.push(file.clone());
            continue;
        }

        let name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let listing: Vec<String> = available
            .iter()
            .enumerate()
            .map(|(index, track)| format_track_choice(index, track))
            .collect();
        console.notify(
            crate::console::NoticeLevel::Info,
            &format!("File: {name}\nAvailable tracks:\n{}", listing.join("\n")),
        );

        loop {
            let choice = console
                .ask(&format!("Select track # for '{name}' (or 's' to skip):"))
                .to_lowercase();
            if choice == "s" {
                skipped.push(file.clone());
                break;
            }
            if let Ok(selection) = choice.parse::<usize>() {
                if selection >= 1 && selection <= available.len() {
                    let track = available.remove(selection - 1);
                    console.notify(
                        crate::console::NoticeLevel::Info,
                        &format!("Matched to: {}", track.title),
                    );
                    pairs.push(MatchPair {
                        file: file.clone(),
                        track,
                    });
                    break;
                }
            }
            console.notify(crate::console::NoticeLevel::Warn, "Invalid selection.");
        }
    }

    (pairs, skipped)
}

/// Matches `files` (sorted by name) against `tracks` (declared order).
///
/// `match_by_filename` forces the fuzzy path even when counts line up.
pub fn match_tracks(
    files: &[PathBuf],
    tracks: &[RemoteTrack],
    match_by_filename: bool,
    console: &mut dyn Console,
) -> MatchOutcome {
    if files.len() == tracks.len() && !match_by_filename {
        let pairs = files
            .iter()
            .zip(tracks.iter())
            .map(|(file, track)| MatchPair {
                file: file.clone(),
                track: track.clone(),
            })
            .collect();
        return MatchOutcome {
            pairs,
            unmatched_files: Vec::new(),
            missing_tracks: Vec::new(),
        };
    }

    let mut pairs = fuzzy_pair(files, tracks);
    let matched_files: HashSet<&PathBuf> = pairs.iter().map(|pair| &pair.file).collect();
    let matched_track_ids: HashSet<u64> = pairs.iter().map(|pair| pair.track.id).collect();

    let unmatched_files: Vec<PathBuf> = files
        .iter()
        .filter(|file| !matched_files.contains(file))
        .cloned()
        .collect();
    let mut available: Vec<RemoteTrack> = tracks
        .iter()
        .filter(|track| !matched_track_ids.contains(&track.id))
        .cloned()
        .collect();

    let unmatched_files = if !unmatched_files.is_empty() && !available.is_empty() {
        let (manual_pairs, skipped) =
            reconcile_manually(&unmatched_files, &mut available, console);
        pairs.extend(manual_pairs);
        skipped
    } else {
        unmatched_files
    };

    MatchOutcome {
        pairs,
        unmatched_files,
        missing_tracks: available,
    }
}
