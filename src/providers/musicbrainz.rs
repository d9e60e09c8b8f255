//! MusicBrainz release-year lookup. Best-effort: failures are logged
//! and swallowed.

use log::{debug, warn};
use serde_json::Value;

use crate::providers::{build_http_agent, call_with_retry, ProviderError, ReleaseYearProvider};

const API_BASE: &str = "https://musicbrainz.org/ws/2";
// MusicBrainz requires an identifying User-Agent on every request.
const USER_AGENT: &str = concat!("retag/", env!("CARGO_PKG_VERSION"), " (user@localhost)");

pub struct MusicBrainzClient {
    http_client: ureq::Agent,
}

impl MusicBrainzClient {
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
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(ProviderError::from_ureq)?;
        response
            .into_json::<Value>()
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the four-digit year from the first release's date field.
fn year_from_releases(parsed: &Value) -> Option<String> {
    let date = parsed
        .get("releases")?
        .as_array()?
        .first()?
        .get("date")?
        .as_str()?;
    if date.len() < 4 {
        return None;
    }
    let year = &date[..4];
    year.chars().all(|ch| ch.is_ascii_digit()).then(|| year.to_string())
}

impl ReleaseYearProvider for MusicBrainzClient {
    fn release_year(&self, artist: &str, album: &str) -> Option<String> {
        let query = format!("artist:\"{artist}\" AND release:\"{album}\"");
        let url = format!(
            "{API_BASE}/release/?query={}&fmt=json&limit=1",
            urlencoding::encode(&query)
        );
        match call_with_retry("MusicBrainz release search", || self.request_json(&url)) {
            Ok(parsed) => year_from_releases(&parsed),
            Err(err) => {
                warn!("MusicBrainz lookup failed for '{artist} - {album}': {err}");
                None
            }
        }
    }
}
