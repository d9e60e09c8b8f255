//! Genius API adapter: song/album search, full records, lyrics text.

use std::cell::Cell;

use log::{debug, warn};
use serde_json::Value;

use crate::model::{AlbumCandidate, AlbumContext, CandidateTrack, RemoteTrack, SongDetails};
use crate::providers::{build_http_agent, call_with_retry, PrimaryProvider, ProviderError};

const API_BASE: &str = "https://api.genius.com";
const MAX_SEARCH_HITS: usize = 5;

/// Genius adapter backed by `ureq`. A 403 from any endpoint disables the
/// adapter for the rest of the run; later calls short-circuit to empty
/// results instead of hitting the network again.
pub struct GeniusClient {
    http_client: ureq::Agent,
    token: String,
    disabled: Cell<bool>,
    warned: Cell<bool>,
}

impl GeniusClient {
    pub fn new(token: &str) -> Self {
        Self {
            http_client: build_http_agent(),
            token: token.trim().to_string(),
            disabled: Cell::new(false),
            warned: Cell::new(false),
        }
    }

    fn disable_after_forbidden(&self) {
        self.disabled.set(true);
        if !self.warned.get() {
            self.warned.set(true);
            warn!("Genius rejected the API token (403). Lyrics and metadata search are disabled for this run.");
        }
    }

    fn request_json(&self, url: &str) -> Result<Value, ProviderError> {
        debug!("GET {url}");
        let response = self
            .http_client
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(ProviderError::from_ureq)?;
        response
            .into_json::<Value>()
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }

    /// Runs `url` through the retry policy; a 403 trips the disable
    /// latch and surfaces as `Forbidden`.
    fn fetch(&self, label: &str, url: &str) -> Result<Value, ProviderError> {
        let result = call_with_retry(label, || self.request_json(url));
        if matches!(result, Err(ProviderError::Forbidden)) {
            self.disable_after_forbidden();
        }
        result
    }
}

fn parse_song_hits(parsed: &Value) -> Vec<CandidateTrack> {
    let hits = parsed
        .pointer("/response/hits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    hits.iter()
        .filter(|hit| hit.get("type").and_then(Value::as_str) != Some("album"))
        .filter_map(|hit| {
            let result = hit.get("result")?;
            Some(CandidateTrack {
                id: result.get("id")?.as_u64()?,
                title: result.get("title")?.as_str()?.to_string(),
                artist: result
                    .pointer("/primary_artist/name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Artist")
                    .to_string(),
                album_artist: None,
                cover_url: result
                    .get("song_art_image_url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                url: result.get("url").and_then(Value::as_str).map(str::to_string),
            })
        })
        .take(MAX_SEARCH_HITS)
        .collect()
}

fn parse_song_details(parsed: &Value) -> Option<SongDetails> {
    let song = parsed.pointer("/response/song")?;
    Some(SongDetails {
        id: song.get("id")?.as_u64()?,
        title: song.get("title")?.as_str()?.to_string(),
        artist: song
            .get("artist_names")
            .and_then(Value::as_str)
            .or_else(|| song.pointer("/primary_artist/name").and_then(Value::as_str))
            .unwrap_or("Unknown Artist")
            .to_string(),
        album: song
            .pointer("/album/name")
            .and_then(Value::as_str)
            .map(str::to_string),
        cover_url: song
            .get("song_art_image_url")
            .and_then(Value::as_str)
            .map(str::to_string),
        lyrics: song
            .get("lyrics")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
    })
}

fn parse_album_sections(parsed: &Value) -> Vec<AlbumCandidate> {
    let sections = parsed
        .pointer("/response/sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    sections
        .iter()
        .filter(|section| section.get("type").and_then(Value::as_str) == Some("album"))
        .flat_map(|section| {
            section
                .get("hits")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
        })
        .filter_map(|hit| {
            let result = hit.get("result")?;
            Some(AlbumCandidate {
                id: result.get("id")?.as_u64()?,
                title: result
                    .get("name")
                    .or_else(|| result.get("title"))
                    .and_then(Value::as_str)?
                    .to_string(),
                artist: result
                    .pointer("/artist/name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown Artist")
                    .to_string(),
                cover_url: result
                    .get("cover_art_url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                url: result.get("url").and_then(Value::as_str).map(str::to_string),
            })
        })
        .take(MAX_SEARCH_HITS)
        .collect()
}

fn parse_album_tracks(parsed: &Value) -> Vec<RemoteTrack> {
    let tracks = parsed
        .pointer("/response/tracks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    tracks
        .iter()
        .filter_map(|track| {
            let song = track.get("song")?;
            Some(RemoteTrack {
                id: song.get("id")?.as_u64()?,
                number: track
                    .get("number")
                    .and_then(Value::as_u64)
                    .map(|number| number as u32),
                title: song.get("title")?.as_str()?.to_string(),
                artist: song
                    .get("artist_names")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

impl PrimaryProvider for GeniusClient {
    fn is_enabled(&self) -> bool {
        !self.token.is_empty() && !self.disabled.get()
    }

    fn search_songs(&self, query: &str) -> Result<Vec<CandidateTrack>, ProviderError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let url = format!("{API_BASE}/search?q={}", urlencoding::encode(query));
        match self.fetch("Genius song search", &url) {
            Ok(parsed) => Ok(parse_song_hits(&parsed)),
            Err(ProviderError::Forbidden) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn song_details(&self, song_id: u64) -> Result<Option<SongDetails>, ProviderError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let url = format!("{API_BASE}/songs/{song_id}");
        match self.fetch("Genius song fetch", &url) {
            Ok(parsed) => Ok(parse_song_details(&parsed)),
            Err(ProviderError::Forbidden) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn search_albums(&self, query: &str) -> Result<Vec<AlbumCandidate>, ProviderError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let url = format!("{API_BASE}/search/multi?q={}", urlencoding::encode(query));
        match self.fetch("Genius album search", &url) {
            Ok(parsed) => Ok(parse_album_sections(&parsed)),
            Err(ProviderError::Forbidden) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    fn album_context(&self, album_id: u64) -> Result<AlbumContext, ProviderError> {
        let album_url = format!("{API_BASE}/albums/{album_id}");
        let album = self.fetch("Genius album fetch", &album_url)?;
        let info = album
            .pointer("/response/album")
            .ok_or_else(|| ProviderError::Malformed("missing album object".to_string()))?;

        let tracks_url = format!("{API_BASE}/albums/{album_id}/tracks");
        let tracks = self.fetch("Genius tracklist fetch", &tracks_url)?;

        Ok(AlbumContext {
            title: info
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Album")
                .to_string(),
            artist: info
                .pointer("/artist/name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Artist")
                .to_string(),
            tracks: parse_album_tracks(&tracks),
            year: None,
            cover_url: info
                .get("cover_art_url")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
