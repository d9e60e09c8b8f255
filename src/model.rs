//! Core data model shared by the reconciliation pipeline.

use std::path::PathBuf;

/// Search input for one file, built from (in priority order) explicit
/// user search terms, existing local tags, the fingerprint result, or
/// the cleaned filename. Immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackQuery {
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
}

impl TrackQuery {
    /// Fills any empty field from `other`, leaving populated fields alone.
    pub fn fill_missing_from(&mut self, other: &TrackQuery) {
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.artist.is_none() {
            self.artist = other.artist.clone();
        }
        if self.album.is_none() {
            self.album = other.album.clone();
        }
        if self.url.is_none() {
            self.url = other.url.clone();
        }
        if self.duration_secs.is_none() {
            self.duration_secs = other.duration_secs;
        }
    }
}

/// One remote song search hit. Ephemeral, used only to pick a best match.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTrack {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub album_artist: Option<String>,
    pub cover_url: Option<String>,
    pub url: Option<String>,
}

/// Full song record fetched by id from the primary provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongDetails {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    pub lyrics: Option<String>,
}

/// One remote album search hit offered for interactive selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumCandidate {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub cover_url: Option<String>,
    pub url: Option<String>,
}

/// One entry of a remote album tracklist, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    pub id: u64,
    pub number: Option<u32>,
    pub title: String,
    pub artist: Option<String>,
}

/// Album-level metadata owned by the session for one directory run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumContext {
    pub title: String,
    pub artist: String,
    pub tracks: Vec<RemoteTrack>,
    pub year: Option<String>,
    pub cover_url: Option<String>,
}

/// A local file paired with the remote track it will be tagged from.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPair {
    pub file: PathBuf,
    pub track: RemoteTrack,
}

/// The mutable working record for one file. Artist lists keep insertion
/// order; the first entry is the primary artist. Lists are joined into a
/// delimited string only immediately before the tag write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagRecord {
    pub title: Option<String>,
    pub artist: Vec<String>,
    pub album_artist: Vec<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub lyrics: Option<String>,
    pub cover_url: Option<String>,
}

impl TagRecord {
    /// Seeds a record from a query's known fields.
    pub fn from_query(query: &TrackQuery) -> Self {
        let mut record = TagRecord {
            title: query.name.clone(),
            album: query.album.clone(),
            ..TagRecord::default()
        };
        if let Some(artist) = &query.artist {
            record.artist.push(artist.clone());
        }
        record
    }

    /// Overwrites fields present in `details`, keeping the rest.
    pub fn merge_song_details(&mut self, details: &SongDetails) {
        self.title = Some(details.title.clone());
        self.artist = vec![details.artist.clone()];
        if details.album.is_some() {
            self.album = details.album.clone();
        }
        if details.cover_url.is_some() {
            self.cover_url = details.cover_url.clone();
        }
        if details.lyrics.is_some() {
            self.lyrics = details.lyrics.clone();
        }
    }
}

/// Manual tag overrides from the CLI. Highest precedence, applied last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualOverrides {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
}

impl ManualOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ManualOverrides::default()
    }

    /// Unconditionally overwrites record fields the user pinned.
    pub fn apply_to(&self, record: &mut TagRecord) {
        if let Some(title) = &self.title {
            record.title = Some(title.clone());
        }
        if let Some(artist) = &self.artist {
            record.artist = vec![artist.clone()];
        }
        if let Some(album) = &self.album {
            record.album = Some(album.clone());
        }
        if let Some(year) = &self.year {
            record.year = Some(year.clone());
        }
        if let Some(genre) = &self.genre {
            record.genre = Some(genre.clone());
        }
        if let Some(track_number) = self.track_number {
            record.track_number = Some(track_number);
        }
    }
}
