//! Cover-art pipeline: obtain image bytes (download, local file, or
//! extraction from the audio file), embed them, and keep an on-disk
//! copy under `Cover Art/` with the configured size cap.

use std::io::Read;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use lofty::picture::MimeType;
use log::{debug, error, info, warn};

use crate::config::CoverConfig;
use crate::file_actions::sanitize_for_filesystem;
use crate::providers::{build_http_agent, call_with_retry, ProviderError};
use crate::tag_writer::TagEditor;

const COVER_DIR_NAME: &str = "Cover Art";
// Sanity cap for downloaded images.
const MAX_DOWNLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Where the cover image comes from, parsed from the `-c` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    /// Use the cover URL the metadata provider returned.
    Auto,
    /// Use a local image file.
    File(PathBuf),
    /// Re-use the picture already embedded in the audio file.
    Extract,
}

impl CoverSource {
    pub fn parse(arg: &str) -> Result<Self, String> {
        match arg {
            "auto" => Ok(CoverSource::Auto),
            "extract" => Ok(CoverSource::Extract),
            other => match other.strip_prefix("file=") {
                Some(path) if !path.is_empty() => Ok(CoverSource::File(PathBuf::from(path))),
                _ => Err(format!(
                    "Invalid cover-art mode '{other}' (expected auto, extract, or file=PATH)"
                )),
            },
        }
    }
}

/// Image bytes plus the MIME type they should be embedded with.
pub struct CoverArt {
    pub bytes: Vec<u8>,
    pub mime: MimeType,
}

fn mime_for_path(path: &Path) -> MimeType {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => MimeType::Png,
        Some("gif") => MimeType::Gif,
        Some("bmp") => MimeType::Bmp,
        _ => MimeType::Jpeg,
    }
}

pub struct CoverPipeline {
    http_client: ureq::Agent,
    config: CoverConfig,
    dry_run: bool,
}

impl CoverPipeline {
    pub fn new(config: CoverConfig, dry_run: bool) -> Self {
        Self {
            http_client: build_http_agent(),
            config,
            dry_run,
        }
    }

    fn download(&self, url: &str) -> Option<Vec<u8>> {
        let fetch = || -> Result<Vec<u8>, ProviderError> {
            debug!("GET {url}");
            let response = self
                .http_client
                .get(url)
                .call()
                .map_err(ProviderError::from_ureq)?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .take(MAX_DOWNLOAD_BYTES)
                .read_to_end(&mut bytes)
                .map_err(|err| ProviderError::Transport(err.to_string()))?;
            Ok(bytes)
        };
        match call_with_retry("Cover download", fetch) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(err) => {
                warn!("Cover download failed: {err}");
                None
            }
        }
    }

    /// Resolves the cover bytes for one file. Best-effort: any failure
    /// degrades to `None` and the run continues without art.
    pub fn obtain(
        &self,
        source: &CoverSource,
        cover_url: Option<&str>,
        editor: Option<&TagEditor>,
    ) -> Option<CoverArt> {
        match source {
            CoverSource::Auto => {
                let bytes = self.download(cover_url?)?;
                Some(CoverArt {
                    bytes,
                    mime: MimeType::Jpeg,
                })
            }
            CoverSource::File(path) => match std::fs::read(path) {
                Ok(bytes) => Some(CoverArt {
                    bytes,
                    mime: mime_for_path(path),
                }),
                Err(err) => {
                    error!("Could not read cover file '{}': {err}", path.display());
                    None
                }
            },
            CoverSource::Extract => {
                let (bytes, mime) = editor?.extract_cover()?;
                Some(CoverArt {
                    bytes,
                    mime: mime.unwrap_or(MimeType::Jpeg),
                })
            }
        }
    }

    /// Saves the cover under `<album dir>/Cover Art/`. Oversized images
    /// are resized to the configured cap; the original is kept alongside
    /// (named with its kilopixel dimensions) when `keep_resized` is set.
    pub fn save_sidecar(&self, audio_path: &Path, album_name: &str, art: &CoverArt) {
        let Some(album_dir) = audio_path.parent() else {
            return;
        };
        let cover_dir = album_dir.join(COVER_DIR_NAME);
        let safe_name = sanitize_for_filesystem(album_name);
        info!("Saving cover art under '{}'", cover_dir.display());
        if self.dry_run {
            return;
        }
        if let Err(err) = std::fs::create_dir_all(&cover_dir) {
            error!("Could not create '{}': {err}", cover_dir.display());
            return;
        }

        let image = match image::load_from_memory(&art.bytes) {
            Ok(image) => image,
            Err(err) => {
                error!("Cover image could not be decoded: {err}");
                return;
            }
        };
        let (max_width, max_height) = self.config.max_dimensions();
        let (width, height) = (image.width(), image.height());
        let final_path = cover_dir.join(format!("{safe_name}.jpg"));

        if width <= max_width && height <= max_height {
            if let Err(err) = std::fs::write(&final_path, &art.bytes) {
                error!("Failed to save '{}': {err}", final_path.display());
            }
            return;
        }

        if self.config.keep_resized {
            let original_name = format!(
                "{safe_name} {}kx{}k.jpg",
                width / 1000,
                height / 1000
            );
            let original_path = cover_dir.join(original_name);
            if let Err(err) = std::fs::write(&original_path, &art.bytes) {
                error!("Failed to save '{}': {err}", original_path.display());
            }
        }
        let resized = image.thumbnail(max_width, max_height);
        if let Err(err) = resized.save_with_format(&final_path, ImageFormat::Jpeg) {
            error!("Failed to save '{}': {err}", final_path.display());
        }
    }
}
