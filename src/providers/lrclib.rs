//! LRCLIB synced-lyrics adapter. Best-effort: failures are logged and
//! swallowed, never propagated to the caller.

use log::{debug, warn};
use serde_json::Value;

use crate::providers::{build_http_agent, call_with_retry, ProviderError, SyncedLyricsProvider};

const API_BASE: &str = "https://lrclib.net/api";

pub struct LrclibClient {
    http_client: ureq::Agent,
}

impl LrclibClient {
    pub fn new() -> Self {
        Self {
            http_client: build_http_agent(),
        }
    }

    fn request_json(&self, url: &str) -> Result<Value, ProviderError> {
        debug!("GET {url}");
        let response = self
            .http_client
            .get(url)
            .call()
            .map_err(ProviderError::from_ureq)?;
        response
            .into_json::<Value>()
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the best lyrics text from one search record: timestamped lines
/// when available, the plain text otherwise.
fn lyrics_from_record(record: &Value) -> Option<String> {
    ["syncedLyrics", "plainLyrics"]
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn first_lyrics(parsed: &Value) -> Option<String> {
    parsed
        .as_array()?
        .iter()
        .find_map(lyrics_from_record)
}

impl SyncedLyricsProvider for LrclibClient {
    fn search_lyrics(&self, artist: &str, title: &str) -> Option<String> {
        let url = format!(
            "{API_BASE}/search?artist_name={}&track_name={}",
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        match call_with_retry("LRCLIB search", || self.request_json(&url)) {
            Ok(parsed) => first_lyrics(&parsed),
            Err(err) => {
                warn!("LRCLIB lookup failed for '{artist} - {title}': {err}");
                None
            }
        }
    }
}
