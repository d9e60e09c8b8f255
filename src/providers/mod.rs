//! Remote metadata provider abstractions and concrete adapters.

pub mod acoustid;
pub mod genius;
pub mod lrclib;
pub mod musicbrainz;

use std::thread;
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::model::{AlbumCandidate, AlbumContext, CandidateTrack, SongDetails};

/// Failure modes of an outbound provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP 403. Converted by the caller into a permanent in-run
    /// disablement of the provider; never retried.
    #[error("access forbidden (check the configured API token)")]
    Forbidden,
    #[error("request failed with status {0}")]
    Http(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn from_ureq(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(403, _) => ProviderError::Forbidden,
            ureq::Error::Status(code, _) => ProviderError::Http(code),
            ureq::Error::Transport(transport) => ProviderError::Transport(transport.to_string()),
        }
    }
}

pub const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Retries `operation` with a delay that grows linearly per attempt.
pub fn call_with_retry<T>(
    label: &str,
    operation: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    call_with_retry_policy(label, RETRY_ATTEMPTS, RETRY_BASE_DELAY, operation)
}

fn call_with_retry_policy<T>(
    label: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut operation: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation() {
            Ok(value) => return Ok(value),
            // A permission failure will not heal on retry.
            Err(ProviderError::Forbidden) => return Err(ProviderError::Forbidden),
            Err(err) if attempt < max_attempts => {
                warn!("{label} attempt {attempt}/{max_attempts} failed: {err}");
                thread::sleep(base_delay * attempt);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Builds the blocking HTTP agent shared by the concrete adapters.
pub fn build_http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(15))
        .timeout_write(Duration::from_secs(15))
        .build()
}

/// First-choice metadata and lyrics service.
pub trait PrimaryProvider {
    /// False when no credential is configured or the provider was
    /// disabled after a permission failure.
    fn is_enabled(&self) -> bool;
    /// Full-text song search, up to 5 ranked hits.
    fn search_songs(&self, query: &str) -> Result<Vec<CandidateTrack>, ProviderError>;
    /// Full song record by id, including lyrics when the provider has them.
    fn song_details(&self, song_id: u64) -> Result<Option<SongDetails>, ProviderError>;
    /// Full-text album search, up to 5 ranked hits.
    fn search_albums(&self, query: &str) -> Result<Vec<AlbumCandidate>, ProviderError>;
    /// Album metadata plus its ordered tracklist.
    fn album_context(&self, album_id: u64) -> Result<AlbumContext, ProviderError>;
}

/// Fallback synced-lyrics aggregator. Best-effort only: adapters swallow
/// and log their failures rather than propagate them.
pub trait SyncedLyricsProvider {
    fn search_lyrics(&self, artist: &str, title: &str) -> Option<String>;
}

/// Music-encyclopedia release lookup. Best-effort only.
pub trait ReleaseYearProvider {
    fn release_year(&self, artist: &str, album: &str) -> Option<String>;
}

/// Acoustic-fingerprint identification. Best-effort only.
pub trait FingerprintResolver {
    fn identify(&self, path: &std::path::Path) -> Option<crate::model::TrackQuery>;
}
