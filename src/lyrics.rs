//! Multi-source lyrics acquisition.
//!
//! Four strategies: `auto` walks primary-by-id, primary search, the
//! synced provider, then an interactive rescue; `genius` and `synced`
//! each hit a single source; `interactive` goes straight to the picker.

use log::{debug, warn};

use crate::config::LyricsSource;
use crate::console::{Console, NoticeLevel};
use crate::providers::{PrimaryProvider, SyncedLyricsProvider};

const PICKER_MENU: &str = "\
  [1] Skip
  [2] Search the lyrics provider
  [3] Search for synced lyrics
  [4] Paste lyrics manually";

pub struct LyricsFetcher<'a> {
    primary: &'a dyn PrimaryProvider,
    synced: &'a dyn SyncedLyricsProvider,
}

impl<'a> LyricsFetcher<'a> {
    pub fn new(primary: &'a dyn PrimaryProvider, synced: &'a dyn SyncedLyricsProvider) -> Self {
        Self { primary, synced }
    }

    /// Fetches lyrics for one track under the selected strategy.
    /// Returns `None` when every source came up empty; never errors, so
    /// a batch run cannot be aborted from here.
    pub fn fetch(
        &self,
        console: &mut dyn Console,
        track_id: Option<u64>,
        title: &str,
        artist: &str,
        source: LyricsSource,
    ) -> Option<String> {
        match source {
            LyricsSource::Interactive => self.picker_loop(console, title, artist),
            LyricsSource::Synced => self.synced.search_lyrics(artist, title),
            LyricsSource::Genius => track_id.and_then(|id| self.lyrics_by_id(id)),
            LyricsSource::Auto => self.auto_pipeline(console, track_id, title, artist),
        }
    }

    fn auto_pipeline(
        &self,
        console: &mut dyn Console,
        track_id: Option<u64>,
        title: &str,
        artist: &str,
    ) -> Option<String> {
        if let Some(lyrics) = track_id.and_then(|id| self.lyrics_by_id(id)) {
            return Some(lyrics);
        }
        if !title.is_empty() && !artist.is_empty() {
            if let Some(lyrics) = self.lyrics_by_search(&format!("{artist} {title}")) {
                return Some(lyrics);
            }
        }
        if let Some(lyrics) = self.synced.search_lyrics(artist, title) {
            return Some(lyrics);
        }
        if console.is_interactive() {
            let answer = console.ask("No lyrics found. Search interactively? [y/N]");
            if answer.eq_ignore_ascii_case("y") {
                return self.picker_loop(console, title, artist);
            }
        }
        None
    }

    fn lyrics_by_id(&self, track_id: u64) -> Option<String> {
        match self.primary.song_details(track_id) {
            Ok(details) => details.and_then(|details| details.lyrics),
            Err(err) => {
                warn!("Lyrics fetch by id {track_id} failed: {err}");
                None
            }
        }
    }

    /// Free-text fallback: first search hit's full record.
    fn lyrics_by_search(&self, query: &str) -> Option<String> {
        debug!("Lyrics search fallback: {query}");
        let hits = match self.primary.search_songs(query) {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Lyrics search failed for '{query}': {err}");
                return None;
            }
        };
        hits.first().and_then(|hit| self.lyrics_by_id(hit.id))
    }

    /// Interactive picker. Unbounded: the only exits are a result, the
    /// skip option, or declining a retry.
    fn picker_loop(
        &self,
        console: &mut dyn Console,
        title: &str,
        artist: &str,
    ) -> Option<String> {
        loop {
            console.notify(NoticeLevel::Info, PICKER_MENU);
            let choice = console.ask("Choose an option [1-4]:");
            let attempt = match choice.as_str() {
                "1" => return None,
                "2" => self.pick_from_search(console, title, artist),
                "3" => self.synced.search_lyrics(artist, title),
                "4" => {
                    let pasted = console.read_block();
                    (!pasted.is_empty()).then_some(pasted)
                }
                _ => {
                    console.notify(NoticeLevel::Warn, "Invalid selection.");
                    continue;
                }
            };
            if attempt.is_some() {
                return attempt;
            }
            let again = console.ask("Nothing found. Try again? [y/N]");
            if !again.eq_ignore_ascii_case("y") {
                return None;
            }
        }
    }

    /// Lists up to 5 search hits and lets the user pick one or go back.
    fn pick_from_search(
        &self,
        console: &mut dyn Console,
        title: &str,
        artist: &str,
    ) -> Option<String> {
        let hits = match self.primary.search_songs(&format!("{artist} {title}")) {
            Ok(hits) => hits,
            Err(err) => {
                console.notify(NoticeLevel::Warn, &format!("Search failed: {err}"));
                return None;
            }
        };
        if hits.is_empty() {
            console.notify(NoticeLevel::Info, "No search results.");
            return None;
        }
        let listing: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(index, hit)| format!("  [{}] {} - {}", index + 1, hit.artist, hit.title))
            .collect();
        console.notify(NoticeLevel::Info, &listing.join("\n"));
        loop {
            let choice = console.ask("Select a result # (or 'b' to go back):");
            if choice.eq_ignore_ascii_case("b") {
                return None;
            }
            if let Ok(selection) = choice.parse::<usize>() {
                if selection >= 1 && selection <= hits.len() {
                    return self.lyrics_by_id(hits[selection - 1].id);
                }
            }
            console.notify(NoticeLevel::Warn, "Invalid selection.");
        }
    }
}
