//! AcoustID fingerprint identification. Needs the external `fpcalc`
//! binary; its absence degrades this feature only.

use std::cell::Cell;
use std::path::Path;
use std::process::Command;

use log::{debug, warn};
use serde_json::Value;

use crate::model::TrackQuery;
use crate::providers::{build_http_agent, call_with_retry, FingerprintResolver, ProviderError};

const API_BASE: &str = "https://api.acoustid.org/v2";
const FPCALC_BINARY: &str = "fpcalc";

pub struct AcoustidClient {
    http_client: ureq::Agent,
    api_key: String,
    warned_missing_binary: Cell<bool>,
}

struct Fingerprint {
    duration_secs: f64,
    fingerprint: String,
}

impl AcoustidClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            http_client: build_http_agent(),
            api_key: api_key.trim().to_string(),
            warned_missing_binary: Cell::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Computes the acoustic fingerprint with `fpcalc -json`.
    fn compute_fingerprint(&self, path: &Path) -> Option<Fingerprint> {
        let output = match Command::new(FPCALC_BINARY)
            .arg("-json")
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                if !self.warned_missing_binary.get() {
                    self.warned_missing_binary.set(true);
                    warn!("Could not run '{FPCALC_BINARY}' ({err}). Fingerprinting is disabled for this run.");
                }
                return None;
            }
        };
        if !output.status.success() {
            warn!(
                "'{FPCALC_BINARY}' failed for '{}' (exit {:?})",
                path.display(),
                output.status.code()
            );
            return None;
        }
        let parsed: Value = serde_json::from_slice(&output.stdout).ok()?;
        Some(Fingerprint {
            duration_secs: parsed.get("duration")?.as_f64()?,
            fingerprint: parsed.get("fingerprint")?.as_str()?.to_string(),
        })
    }

    fn lookup(&self, print: &Fingerprint) -> Result<Value, ProviderError> {
        let url = format!(
            "{API_BASE}/lookup?client={}&meta=recordings+releasegroups&duration={}&fingerprint={}",
            urlencoding::encode(&self.api_key),
            print.duration_secs.round() as u64,
            urlencoding::encode(&print.fingerprint)
        );
        debug!("GET {API_BASE}/lookup (fingerprint elided)");
        let response = self
            .http_client
            .get(&url)
            .call()
            .map_err(ProviderError::from_ureq)?;
        response
            .into_json::<Value>()
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }

    /// Identifies `path` by audio content. Best-effort: any failure
    /// along the way degrades to `None`.
    fn identify_path(&self, path: &Path) -> Option<TrackQuery> {
        if !self.is_enabled() {
            return None;
        }
        let print = self.compute_fingerprint(path)?;
        let parsed = match call_with_retry("AcoustID lookup", || self.lookup(&print)) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("AcoustID lookup failed for '{}': {err}", path.display());
                return None;
            }
        };
        let mut query = best_guess(&parsed)?;
        query.duration_secs = Some(print.duration_secs);
        Some(query)
    }
}

impl FingerprintResolver for AcoustidClient {
    fn identify(&self, path: &Path) -> Option<TrackQuery> {
        self.identify_path(path)
    }
}

/// Picks the first recording of the first result.
fn best_guess(parsed: &Value) -> Option<TrackQuery> {
    if parsed.get("status").and_then(Value::as_str) != Some("ok") {
        return None;
    }
    let recording = parsed
        .get("results")?
        .as_array()?
        .first()?
        .get("recordings")?
        .as_array()?
        .first()?;
    let title = recording.get("title")?.as_str()?.to_string();
    let artist = recording
        .pointer("/artists/0/name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let album = recording
        .pointer("/releasegroups/0/title")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(TrackQuery {
        name: Some(title),
        artist,
        album,
        url: None,
        duration_secs: None,
    })
}
