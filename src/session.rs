//! Metadata reconciliation sessions: single-file and album-directory
//! runs. A session owns the per-run options, drives the providers, and
//! funnels all terminal interaction through the [`Console`] seam.

use std::path::{Path, PathBuf};

use log::{debug, error, warn};

use crate::config::{Config, FeatHandling, LyricsMode, LyricsSource};
use crate::console::{Console, NoticeLevel};
use crate::cover_art::{CoverArt, CoverPipeline, CoverSource};
use crate::file_actions::{clean_filename_guess, infer_artist_album, FileActions};
use crate::lyrics::LyricsFetcher;
use crate::matcher::{match_tracks, similarity_score};
use crate::media_file_discovery::collect_audio_files_in_directory;
use crate::model::{
    AlbumCandidate, AlbumContext, ManualOverrides, MatchPair, TagRecord, TrackQuery,
};
use crate::normalizer::Normalizer;
use crate::providers::{
    FingerprintResolver, PrimaryProvider, ReleaseYearProvider, SyncedLyricsProvider,
};
use crate::tag_writer::TagEditor;

/// Minimum similarity for accepting a search candidate as the file's
/// identity. Stricter than the track matcher's threshold.
pub const CANDIDATE_ACCEPT_THRESHOLD: u32 = 70;

/// Per-run behavior toggles resolved from the CLI and config defaults.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub search: TrackQuery,
    pub manual_tags: ManualOverrides,
    pub feat_handling: FeatHandling,
    pub lyrics_fetch: bool,
    pub lyrics_mode: LyricsMode,
    pub lyrics_source: LyricsSource,
    pub cover: Option<CoverSource>,
    pub rename: bool,
    pub match_filename: bool,
    pub infer_dirs: bool,
    pub autosort: bool,
    pub fingerprint: bool,
    pub dry_run: bool,
}

pub struct TagSession<'a> {
    config: &'a Config,
    primary: &'a dyn PrimaryProvider,
    synced: &'a dyn SyncedLyricsProvider,
    encyclopedia: &'a dyn ReleaseYearProvider,
    fingerprint: Option<&'a dyn FingerprintResolver>,
    normalizer: Normalizer,
    options: RunOptions,
}

impl<'a> TagSession<'a> {
    pub fn new(
        config: &'a Config,
        primary: &'a dyn PrimaryProvider,
        synced: &'a dyn SyncedLyricsProvider,
        encyclopedia: &'a dyn ReleaseYearProvider,
        fingerprint: Option<&'a dyn FingerprintResolver>,
        options: RunOptions,
    ) -> Result<Self, String> {
        Ok(Self {
            config,
            primary,
            synced,
            encyclopedia,
            fingerprint,
            normalizer: Normalizer::from_config(config)?,
            options,
        })
    }

    /// Builds the reconciliation query for one file. Priority: explicit
    /// search terms, then existing tags, then the fingerprint service,
    /// then the cleaned filename.
    fn build_query(&self, path: &Path, editor: &TagEditor) -> TrackQuery {
        let mut query = self.options.search.clone();
        if self.options.infer_dirs {
            if let Some((artist, album)) = infer_artist_album(path) {
                let inferred = TrackQuery {
                    artist: Some(artist),
                    album: Some(album),
                    ..TrackQuery::default()
                };
                query.fill_missing_from(&inferred);
            }
        }
        query.fill_missing_from(&editor.existing_query());
        if self.options.fingerprint && (query.name.is_none() || query.artist.is_none()) {
            if let Some(guess) = self.fingerprint.and_then(|resolver| resolver.identify(path)) {
                query.fill_missing_from(&guess);
            }
        }
        if query.name.is_none() {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            let guess = clean_filename_guess(stem);
            if !guess.is_empty() {
                query.name = Some(guess);
            }
        }
        debug!("Query for '{}': {query:?}", path.display());
        query
    }

    fn drop_blacklisted_genre(&self, record: &mut TagRecord) {
        if let Some(genre) = &record.genre {
            let blacklisted = self
                .config
                .blacklisted_genres
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(genre));
            if blacklisted {
                debug!("Dropping blacklisted genre '{genre}'");
                record.genre = None;
            }
        }
    }

    fn finalize_record(&self, console: &mut dyn Console, record: &mut TagRecord) {
        self.drop_blacklisted_genre(record);
        let outcome = self.normalizer.normalize(record, self.options.feat_handling);
        if let Some(clause) = outcome.feature_clause_kept {
            console.notify(
                NoticeLevel::Warn,
                &format!("Feature clause '{clause}' left in place (keep-both)."),
            );
        }
        self.options.manual_tags.apply_to(record);
    }

    /// Looks a song up by its page URL: searches with terms derived
    /// from the URL slug and takes the hit whose URL matches exactly.
    fn resolve_by_url(&self, url: &str) -> Option<u64> {
        let terms = search_terms_from_url(url)?;
        let hits = match self.primary.search_songs(&terms) {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Song search failed: {err}");
                return None;
            }
        };
        let wanted = url.trim_end_matches('/');
        let found = hits.iter().find(|hit| {
            hit.url
                .as_deref()
                .is_some_and(|hit_url| hit_url.trim_end_matches('/') == wanted)
        });
        if found.is_none() {
            warn!("No search hit matched URL '{url}'");
        }
        found.map(|hit| hit.id)
    }

    /// Single-file reconciliation: search, score, merge, normalize.
    /// A `url` in the query pins the song's identity and bypasses
    /// similarity scoring entirely.
    pub fn reconcile(&self, console: &mut dyn Console, query: &TrackQuery) -> TagRecord {
        let mut record = TagRecord::from_query(query);
        let mut accepted_id = None;

        if self.primary.is_enabled() {
            if let Some(url) = query.url.as_deref() {
                if let Some(id) = self.resolve_by_url(url) {
                    match self.primary.song_details(id) {
                        Ok(Some(details)) => {
                            record.merge_song_details(&details);
                            accepted_id = Some(details.id);
                        }
                        Ok(None) => debug!("No full record for id {id}"),
                        Err(err) => warn!("Song fetch failed: {err}"),
                    }
                }
            } else if let (Some(title), Some(artist)) = (&query.name, &query.artist) {
                match self.primary.search_songs(&format!("{artist} {title}")) {
                    Ok(hits) => {
                        let best = hits
                            .iter()
                            .map(|hit| (similarity_score(&hit.title, title), hit))
                            .max_by_key(|(score, _)| *score);
                        match best {
                            Some((score, hit)) if score >= CANDIDATE_ACCEPT_THRESHOLD => {
                                debug!("Accepted '{}' (score {score})", hit.title);
                                match self.primary.song_details(hit.id) {
                                    Ok(Some(details)) => {
                                        record.merge_song_details(&details);
                                        accepted_id = Some(details.id);
                                    }
                                    Ok(None) => debug!("No full record for id {}", hit.id),
                                    Err(err) => warn!("Song fetch failed: {err}"),
                                }
                            }
                            Some((score, hit)) => {
                                debug!("Best hit '{}' below threshold (score {score})", hit.title);
                            }
                            None => debug!("No search hits for '{artist} {title}'"),
                        }
                    }
                    Err(err) => warn!("Song search failed: {err}"),
                }
            }
        }

        if self.options.lyrics_fetch && record.lyrics.is_none() {
            let fetcher = LyricsFetcher::new(self.primary, self.synced);
            let title = record.title.clone().unwrap_or_default();
            let artist = record.artist.first().cloned().unwrap_or_default();
            record.lyrics =
                fetcher.fetch(console, accepted_id, &title, &artist, self.options.lyrics_source);
        }

        self.finalize_record(console, &mut record);
        record
    }

    fn save_lrc_if_wanted(&self, actions: &FileActions, path: &Path, record: &TagRecord) {
        let wanted = matches!(self.options.lyrics_mode, LyricsMode::Lrc | LyricsMode::Both);
        if wanted {
            if let Some(lyrics) = &record.lyrics {
                actions.save_lrc(path, lyrics);
            }
        }
    }

    fn should_embed_lyrics(&self) -> bool {
        matches!(self.options.lyrics_mode, LyricsMode::Embed | LyricsMode::Both)
    }

    /// Tags one file from an assembled record, then runs the requested
    /// filesystem actions. Shared by single and album modes.
    fn apply_to_file(
        &self,
        path: &Path,
        mut editor: TagEditor,
        record: &TagRecord,
        shared_art: Option<&CoverArt>,
        pipeline: &CoverPipeline,
    ) -> Result<(), String> {
        let mut tag_record = record.clone();
        if !self.should_embed_lyrics() {
            tag_record.lyrics = None;
        }
        editor.apply_record(&tag_record, &self.config.separators)?;

        let obtained;
        let art = match (&self.options.cover, shared_art) {
            (_, Some(art)) => Some(art),
            (Some(source), None) => {
                obtained = pipeline.obtain(source, record.cover_url.as_deref(), Some(&editor));
                obtained.as_ref()
            }
            (None, None) => None,
        };
        if let Some(art) = art {
            editor.embed_cover(art.bytes.clone(), art.mime.clone())?;
        }
        editor.save()?;

        if let Some(art) = art {
            let album = record.album.as_deref().unwrap_or("Unknown Album");
            pipeline.save_sidecar(path, album, art);
        }

        let actions = FileActions::new(self.options.dry_run);
        self.save_lrc_if_wanted(&actions, path, record);
        let mut current = path.to_path_buf();
        if self.options.rename {
            current = actions.rename_to_title(&current, record);
        }
        if self.options.autosort {
            actions.autosort(&current, record);
        }
        Ok(())
    }

    pub fn run_single(&self, console: &mut dyn Console, path: &Path) -> Result<(), String> {
        let editor = TagEditor::open(path, self.options.dry_run)?;
        let query = self.build_query(path, &editor);
        let record = self.reconcile(console, &query);
        let pipeline = CoverPipeline::new(self.config.defaults.cover.clone(), self.options.dry_run);
        self.apply_to_file(path, editor, &record, None, &pipeline)
    }

    /// Album mode: select an album interactively, match the tracklist
    /// against the directory, then tag track by track. One track's
    /// failure never aborts the rest.
    pub fn run_album(&self, console: &mut dyn Console, directory: &Path) -> Result<(), String> {
        let mut query = self.options.search.clone();
        let inferred = if self.options.infer_dirs {
            infer_artist_album(directory)
        } else {
            None
        };
        if let Some((artist, album)) = &inferred {
            query.fill_missing_from(&TrackQuery {
                artist: Some(artist.clone()),
                album: Some(album.clone()),
                ..TrackQuery::default()
            });
        }
        let (Some(artist), Some(album)) = (query.artist.clone(), query.album.clone()) else {
            return Err(
                "Cannot identify album. Use -f infer-dirs or -s artist=.. album=..".to_string(),
            );
        };
        let inferred_artist = inferred.map(|(artist, _)| artist);

        let search_query = format!("{artist} {album}");
        console.notify(NoticeLevel::Info, &format!("Searching for album: '{search_query}'..."));
        let candidates = self
            .primary
            .search_albums(&search_query)
            .map_err(|err| format!("Album search failed: {err}"))?;
        if candidates.is_empty() {
            return Err("No matching albums found.".to_string());
        }
        let Some(selected) = select_album(console, &candidates) else {
            console.notify(NoticeLevel::Info, "Aborting.");
            return Ok(());
        };

        let mut context = self
            .primary
            .album_context(selected.id)
            .map_err(|err| format!("Album fetch failed: {err}"))?;
        if context.tracks.is_empty() {
            return Err("No tracks found for this album.".to_string());
        }
        if context.cover_url.is_none() {
            context.cover_url = selected.cover_url.clone();
        }
        context.year = self.encyclopedia.release_year(&context.artist, &context.title);

        let files = collect_audio_files_in_directory(directory);
        if files.is_empty() {
            return Err(format!("No audio files in '{}'.", directory.display()));
        }

        let outcome = match_tracks(&files, &context.tracks, self.options.match_filename, console);

        let actions = FileActions::new(self.options.dry_run);
        if !outcome.missing_tracks.is_empty() {
            console.notify(
                NoticeLevel::Warn,
                &format!("{} track(s) have no local file.", outcome.missing_tracks.len()),
            );
            if let Some(report) =
                actions.write_missing_tracks_report(directory, &context.title, &outcome.missing_tracks)
            {
                console.notify(
                    NoticeLevel::Info,
                    &format!("Missing tracks listed in '{}'.", report.display()),
                );
            }
        }
        for file in &outcome.unmatched_files {
            console.notify(
                NoticeLevel::Warn,
                &format!("Skipping unmatched file '{}'.", file.display()),
            );
        }

        let pipeline = CoverPipeline::new(self.config.defaults.cover.clone(), self.options.dry_run);
        // Auto/file covers are fetched once and shared across tracks.
        let shared_art = match &self.options.cover {
            Some(source @ (CoverSource::Auto | CoverSource::File(_))) => {
                pipeline.obtain(source, context.cover_url.as_deref(), None)
            }
            _ => None,
        };

        console.begin_album(
            &format!("{} by {}", context.title, context.artist),
            outcome.pairs.len(),
        );
        for pair in &outcome.pairs {
            let label = pair
                .file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            console.begin_item(&label);
            if let Err(err) =
                self.process_album_track(console, pair, &context, inferred_artist.as_deref(), shared_art.as_ref(), &pipeline)
            {
                error!("Failed to tag '{}': {err}", pair.file.display());
                console.notify(NoticeLevel::Error, &err);
            }
            console.finish_item();
        }
        Ok(())
    }

    fn process_album_track(
        &self,
        console: &mut dyn Console,
        pair: &MatchPair,
        context: &AlbumContext,
        inferred_artist: Option<&str>,
        shared_art: Option<&CoverArt>,
        pipeline: &CoverPipeline,
    ) -> Result<(), String> {
        let mut record = build_album_record(pair, context, inferred_artist);

        if self.options.lyrics_fetch {
            console.step("Fetching lyrics...");
            let fetcher = LyricsFetcher::new(self.primary, self.synced);
            let artist = record.artist.first().cloned().unwrap_or_default();
            record.lyrics = fetcher.fetch(
                console,
                Some(pair.track.id),
                &pair.track.title,
                &artist,
                self.options.lyrics_source,
            );
        }

        self.finalize_record(console, &mut record);

        console.step("Applying tags...");
        let editor = TagEditor::open(&pair.file, self.options.dry_run)?;
        self.apply_to_file(&pair.file, editor, &record, shared_art, pipeline)
    }

    /// Expands a mixed file/directory argument list into audio files.
    pub fn resolve_targets(paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut targets = Vec::new();
        for path in paths {
            if path.is_dir() {
                targets.extend(collect_audio_files_in_directory(path));
            } else {
                targets.push(path.clone());
            }
        }
        targets
    }
}

/// Derives search terms from a song page URL's trailing slug, e.g.
/// "https://genius.com/Alltta-the-woods-lyrics" yields
/// "Alltta the woods".
fn search_terms_from_url(url: &str) -> Option<String> {
    let slug = url.trim_end_matches('/').rsplit('/').next()?;
    let slug = slug.strip_suffix("-lyrics").unwrap_or(slug);
    let terms = slug.replace('-', " ").trim().to_string();
    (!terms.is_empty()).then_some(terms)
}

/// Builds the base record for one matched album track. The inferred
/// directory artist (when used) leads both artist lists.
fn build_album_record(
    pair: &MatchPair,
    context: &AlbumContext,
    inferred_artist: Option<&str>,
) -> TagRecord {
    let mut artist = Vec::new();
    if let Some(inferred) = inferred_artist {
        artist.push(inferred.to_string());
    }
    if let Some(track_artist) = &pair.track.artist {
        if inferred_artist != Some(track_artist.as_str()) {
            artist.push(track_artist.clone());
        }
    }
    if artist.is_empty() {
        artist.push("Unknown".to_string());
    }

    let mut album_artist = Vec::new();
    if let Some(inferred) = inferred_artist {
        album_artist.push(inferred.to_string());
    }
    if inferred_artist != Some(context.artist.as_str()) {
        album_artist.push(context.artist.clone());
    }

    TagRecord {
        title: Some(pair.track.title.clone()),
        artist,
        album_artist,
        album: Some(context.title.clone()),
        year: context.year.clone(),
        genre: None,
        track_number: pair.track.number,
        lyrics: None,
        cover_url: context.cover_url.clone(),
    }
}

/// Interactive album selection. One candidate asks for confirmation;
/// several candidates ask for a pick. `None` means the user aborted.
fn select_album<'c>(
    console: &mut dyn Console,
    candidates: &'c [AlbumCandidate],
) -> Option<&'c AlbumCandidate> {
    if candidates.len() == 1 {
        let only = &candidates[0];
        console.notify(
            NoticeLevel::Info,
            &format!("Found 1 match: {} by {}", only.title, only.artist),
        );
        let answer = console.ask("Is this correct? [Y/n]").to_lowercase();
        return matches!(answer.as_str(), "" | "y" | "yes").then_some(only);
    }

    let listing: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            format!("  [{}] {} - {}", index + 1, candidate.title, candidate.artist)
        })
        .collect();
    console.notify(
        NoticeLevel::Info,
        &format!("Found {} matches:\n{}", candidates.len(), listing.join("\n")),
    );
    let choice = console.ask(&format!(
        "Select an album (1-{}, n to abort):",
        candidates.len()
    ));
    choice
        .parse::<usize>()
        .ok()
        .filter(|selection| (1..=candidates.len()).contains(selection))
        .map(|selection| &candidates[selection - 1])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::PathBuf;

    use super::{build_album_record, select_album, RunOptions, TagSession};
    use crate::config::Config;
    use crate::console::testing::ScriptedConsole;
    use crate::model::{
        AlbumCandidate, AlbumContext, CandidateTrack, ManualOverrides, MatchPair, RemoteTrack,
        SongDetails, TrackQuery,
    };
    use crate::providers::{
        PrimaryProvider, ProviderError, ReleaseYearProvider, SyncedLyricsProvider,
    };

    #[derive(Default)]
    struct FakePrimary {
        enabled: bool,
        hits: Vec<CandidateTrack>,
        details: Option<SongDetails>,
        calls: RefCell<Vec<String>>,
    }

    impl PrimaryProvider for FakePrimary {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn search_songs(&self, query: &str) -> Result<Vec<CandidateTrack>, ProviderError> {
            self.calls.borrow_mut().push(format!("search:{query}"));
            Ok(self.hits.clone())
        }

        fn song_details(&self, song_id: u64) -> Result<Option<SongDetails>, ProviderError> {
            self.calls.borrow_mut().push(format!("song:{song_id}"));
            Ok(self.details.clone())
        }

        fn search_albums(&self, _query: &str) -> Result<Vec<AlbumCandidate>, ProviderError> {
            Ok(Vec::new())
        }

        fn album_context(&self, _album_id: u64) -> Result<AlbumContext, ProviderError> {
            Err(ProviderError::Malformed("not used in tests".to_string()))
        }
    }

    struct NoSynced;
    impl SyncedLyricsProvider for NoSynced {
        fn search_lyrics(&self, _artist: &str, _title: &str) -> Option<String> {
            None
        }
    }

    struct NoYear;
    impl ReleaseYearProvider for NoYear {
        fn release_year(&self, _artist: &str, _album: &str) -> Option<String> {
            None
        }
    }

    fn hit(id: u64, title: &str) -> CandidateTrack {
        CandidateTrack {
            id,
            title: title.to_string(),
            artist: "AllttA".to_string(),
            album_artist: None,
            cover_url: None,
            url: None,
        }
    }

    fn session<'a>(
        config: &'a Config,
        primary: &'a FakePrimary,
        synced: &'a NoSynced,
        year: &'a NoYear,
        options: RunOptions,
    ) -> TagSession<'a> {
        TagSession::new(config, primary, synced, year, None, options)
            .expect("session should build")
    }

    fn query(title: &str, artist: &str) -> TrackQuery {
        TrackQuery {
            name: Some(title.to_string()),
            artist: Some(artist.to_string()),
            ..TrackQuery::default()
        }
    }

    #[test]
    fn test_reconcile_accepts_candidate_at_threshold() {
        let config = Config::default();
        let primary = FakePrimary {
            enabled: true,
            hits: vec![hit(5, "The Woods")],
            details: Some(SongDetails {
                id: 5,
                title: "The Woods".to_string(),
                artist: "AllttA".to_string(),
                album: Some("The Upper Hand".to_string()),
                ..SongDetails::default()
            }),
            ..FakePrimary::default()
        };
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());
        let mut console = ScriptedConsole::non_interactive();

        let record = session.reconcile(&mut console, &query("the woods", "AllttA"));
        assert_eq!(record.title.as_deref(), Some("The Woods"));
        assert_eq!(record.album.as_deref(), Some("The Upper Hand"));
        assert_eq!(
            record.artist,
            vec!["AllttA".to_string(), "20syl".to_string(), "Mr. J. Medeiros".to_string()],
            "group expansion should run on the merged artist"
        );
    }

    #[test]
    fn test_reconcile_rejects_low_scoring_candidate() {
        let config = Config::default();
        let primary = FakePrimary {
            enabled: true,
            hits: vec![hit(5, "Completely Different Song")],
            details: Some(SongDetails {
                id: 5,
                title: "Completely Different Song".to_string(),
                artist: "Someone Else".to_string(),
                ..SongDetails::default()
            }),
            ..FakePrimary::default()
        };
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());
        let mut console = ScriptedConsole::non_interactive();

        let record = session.reconcile(&mut console, &query("Curio", "AllttA"));
        assert_eq!(record.title.as_deref(), Some("Curio"));
        assert!(
            !primary.calls.borrow().iter().any(|call| call.starts_with("song:")),
            "rejected candidate should not be fetched in full"
        );
    }

    #[test]
    fn test_reconcile_without_provider_keeps_query_fields() {
        let config = Config::default();
        let primary = FakePrimary::default();
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());
        let mut console = ScriptedConsole::non_interactive();

        let record = session.reconcile(&mut console, &query("Curio", "AllttA"));
        assert_eq!(record.title.as_deref(), Some("Curio"));
        assert!(primary.calls.borrow().is_empty());
    }

    #[test]
    fn test_search_terms_derive_from_url_slug() {
        assert_eq!(
            super::search_terms_from_url("https://genius.com/Alltta-the-woods-lyrics").as_deref(),
            Some("Alltta the woods")
        );
        assert_eq!(
            super::search_terms_from_url("https://genius.com/Alltta-curio-lyrics/").as_deref(),
            Some("Alltta curio")
        );
        assert!(super::search_terms_from_url("").is_none());
    }

    fn pinned_hit(id: u64, title: &str, url: &str) -> CandidateTrack {
        CandidateTrack {
            url: Some(url.to_string()),
            ..hit(id, title)
        }
    }

    #[test]
    fn test_url_override_pins_song_without_scoring() {
        let config = Config::default();
        let primary = FakePrimary {
            enabled: true,
            // A title this far from the query would never clear the
            // similarity threshold; the URL match must win anyway.
            hits: vec![pinned_hit(
                9,
                "Completely Different Song",
                "https://genius.com/Alltta-the-woods-lyrics",
            )],
            details: Some(SongDetails {
                id: 9,
                title: "The Woods".to_string(),
                artist: "AllttA".to_string(),
                ..SongDetails::default()
            }),
            ..FakePrimary::default()
        };
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());
        let mut console = ScriptedConsole::non_interactive();

        let query = TrackQuery {
            url: Some("https://genius.com/Alltta-the-woods-lyrics".to_string()),
            ..TrackQuery::default()
        };
        let record = session.reconcile(&mut console, &query);
        assert_eq!(record.title.as_deref(), Some("The Woods"));
        let calls = primary.calls.borrow();
        assert!(calls.contains(&"search:Alltta the woods".to_string()));
        assert!(calls.contains(&"song:9".to_string()));
    }

    #[test]
    fn test_url_override_without_matching_hit_fetches_nothing() {
        let config = Config::default();
        let primary = FakePrimary {
            enabled: true,
            hits: vec![pinned_hit(9, "The Woods", "https://genius.com/some-other-song-lyrics")],
            ..FakePrimary::default()
        };
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());
        let mut console = ScriptedConsole::non_interactive();

        let query = TrackQuery {
            name: Some("Curio".to_string()),
            url: Some("https://genius.com/Alltta-curio-lyrics".to_string()),
            ..TrackQuery::default()
        };
        let record = session.reconcile(&mut console, &query);
        assert_eq!(record.title.as_deref(), Some("Curio"));
        assert!(
            !primary.calls.borrow().iter().any(|call| call.starts_with("song:")),
            "an unmatched URL must not fetch an arbitrary hit"
        );
    }

    #[test]
    fn test_manual_overrides_win_over_fetched_metadata() {
        let config = Config::default();
        let primary = FakePrimary {
            enabled: true,
            hits: vec![hit(5, "The Woods")],
            details: Some(SongDetails {
                id: 5,
                title: "The Woods".to_string(),
                artist: "AllttA".to_string(),
                ..SongDetails::default()
            }),
            ..FakePrimary::default()
        };
        let synced = NoSynced;
        let year = NoYear;
        let options = RunOptions {
            manual_tags: ManualOverrides {
                title: Some("Pinned Title".to_string()),
                ..ManualOverrides::default()
            },
            ..RunOptions::default()
        };
        let session = session(&config, &primary, &synced, &year, options);
        let mut console = ScriptedConsole::non_interactive();

        let record = session.reconcile(&mut console, &query("The Woods", "AllttA"));
        assert_eq!(record.title.as_deref(), Some("Pinned Title"));
    }

    #[test]
    fn test_blacklisted_genre_is_dropped_case_insensitively() {
        let config = Config::default();
        let primary = FakePrimary::default();
        let synced = NoSynced;
        let year = NoYear;
        let session = session(&config, &primary, &synced, &year, RunOptions::default());

        let mut record = crate::model::TagRecord {
            genre: Some("Soundtrack".to_string()),
            ..crate::model::TagRecord::default()
        };
        session.drop_blacklisted_genre(&mut record);
        assert!(record.genre.is_none());

        let mut kept = crate::model::TagRecord {
            genre: Some("Hip-Hop".to_string()),
            ..crate::model::TagRecord::default()
        };
        session.drop_blacklisted_genre(&mut kept);
        assert_eq!(kept.genre.as_deref(), Some("Hip-Hop"));
    }

    fn album_context() -> AlbumContext {
        AlbumContext {
            title: "The Upper Hand".to_string(),
            artist: "AllttA".to_string(),
            tracks: Vec::new(),
            year: Some("2017".to_string()),
            cover_url: None,
        }
    }

    fn pair(track_artist: Option<&str>) -> MatchPair {
        MatchPair {
            file: PathBuf::from("/music/01 Curio.mp3"),
            track: RemoteTrack {
                id: 1,
                number: Some(1),
                title: "Curio".to_string(),
                artist: track_artist.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_album_record_combines_inferred_and_remote_artists() {
        let record = build_album_record(&pair(Some("AllttA & Friends")), &album_context(), Some("AllttA"));
        assert_eq!(record.artist, vec!["AllttA", "AllttA & Friends"]);
        assert_eq!(record.album_artist, vec!["AllttA"]);
        assert_eq!(record.year.as_deref(), Some("2017"));
        assert_eq!(record.track_number, Some(1));
    }

    #[test]
    fn test_album_record_without_any_artist_falls_back_to_unknown() {
        let record = build_album_record(&pair(None), &album_context(), None);
        assert_eq!(record.artist, vec!["Unknown"]);
        assert_eq!(record.album_artist, vec!["AllttA"]);
    }

    fn candidates(count: usize) -> Vec<AlbumCandidate> {
        (0..count)
            .map(|index| AlbumCandidate {
                id: index as u64 + 1,
                title: format!("Album {}", index + 1),
                artist: "AllttA".to_string(),
                cover_url: None,
                url: None,
            })
            .collect()
    }

    #[test]
    fn test_single_album_candidate_accepts_default_answer() {
        let list = candidates(1);
        let mut console = ScriptedConsole::new(&[""]);
        let selected = select_album(&mut console, &list);
        assert_eq!(selected.map(|candidate| candidate.id), Some(1));
    }

    #[test]
    fn test_single_album_candidate_can_be_declined() {
        let list = candidates(1);
        let mut console = ScriptedConsole::new(&["n"]);
        assert!(select_album(&mut console, &list).is_none());
    }

    #[test]
    fn test_multiple_album_candidates_select_by_number() {
        let list = candidates(3);
        let mut console = ScriptedConsole::new(&["2"]);
        let selected = select_album(&mut console, &list);
        assert_eq!(selected.map(|candidate| candidate.id), Some(2));
    }

    #[test]
    fn test_multiple_album_candidates_abort_on_non_number() {
        let list = candidates(3);
        let mut console = ScriptedConsole::new(&["n"]);
        assert!(select_album(&mut console, &list).is_none());
    }
}
