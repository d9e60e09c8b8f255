//! Applies an assembled [`TagRecord`] onto an audio file's tag container.
//!
//! The mapping is written once against lofty's generic [`Tag`]; lofty
//! handles the per-format field identifiers (ID3 frames, Vorbis
//! comments, MP4 atoms). Repeatable fields are cleared before insertion
//! so repeated runs never accumulate duplicate frames.

use std::path::{Path, PathBuf};

use log::{debug, info};

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

use crate::config::SeparatorsConfig;
use crate::model::{TagRecord, TrackQuery};

/// One open audio file plus the dry-run switch. Saving is a distinct,
/// explicit step after tagging and cover embedding.
pub struct TagEditor {
    tagged_file: lofty::file::TaggedFile,
    path: PathBuf,
    dry_run: bool,
}

fn set_text(tag: &mut Tag, key: ItemKey, value: &str) {
    tag.remove_key(key.clone());
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        tag.insert_text(key, trimmed.to_string());
    }
}

/// Pure mapping of the semantic record onto a generic tag. Artist lists
/// are joined with the configured separator here and nowhere earlier.
pub fn apply_record_to_tag(tag: &mut Tag, record: &TagRecord, separators: &SeparatorsConfig) {
    if let Some(title) = &record.title {
        set_text(tag, ItemKey::TrackTitle, title);
    }
    if !record.artist.is_empty() {
        set_text(tag, ItemKey::TrackArtist, &record.artist.join(&separators.artist));
    }
    if !record.album_artist.is_empty() {
        set_text(
            tag,
            ItemKey::AlbumArtist,
            &record.album_artist.join(&separators.artist),
        );
    }
    if let Some(album) = &record.album {
        set_text(tag, ItemKey::AlbumTitle, album);
    }
    if let Some(year) = &record.year {
        set_text(tag, ItemKey::Year, year);
        tag.remove_key(ItemKey::RecordingDate);
    }
    if let Some(genre) = &record.genre {
        set_text(tag, ItemKey::Genre, genre);
    }
    if let Some(track_number) = record.track_number {
        set_text(tag, ItemKey::TrackNumber, &track_number.to_string());
    }
    if let Some(lyrics) = &record.lyrics {
        set_text(tag, ItemKey::Lyrics, lyrics);
    }
    tag.remove_empty();
}

impl TagEditor {
    pub fn open(path: &Path, dry_run: bool) -> Result<Self, String> {
        let tagged_file = read_from_path(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
        Ok(Self {
            tagged_file,
            path: path.to_path_buf(),
            dry_run,
        })
    }

    /// Seeds a query from whatever tags the file already carries.
    pub fn existing_query(&self) -> TrackQuery {
        let tag = self
            .tagged_file
            .primary_tag()
            .or_else(|| self.tagged_file.first_tag());
        let read = |key: ItemKey| {
            tag.and_then(|tag| tag.get_string(key))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        TrackQuery {
            name: read(ItemKey::TrackTitle),
            artist: read(ItemKey::TrackArtist),
            album: read(ItemKey::AlbumTitle),
            url: None,
            duration_secs: None,
        }
    }

    fn working_tag(&mut self) -> Result<&mut Tag, String> {
        let tag_type = self.tagged_file.primary_tag_type();
        if self.tagged_file.tag(tag_type).is_none() {
            self.tagged_file.insert_tag(Tag::new(tag_type));
        }
        self.tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| format!("No writable tag available for {tag_type:?}"))
    }

    pub fn apply_record(
        &mut self,
        record: &TagRecord,
        separators: &SeparatorsConfig,
    ) -> Result<(), String> {
        if self.dry_run {
            info!("[dry] Would tag '{}': {record:?}", self.path.display());
            return Ok(());
        }
        let tag = self.working_tag()?;
        apply_record_to_tag(tag, record, separators);
        Ok(())
    }

    /// Replaces the front-cover picture with `bytes`.
    pub fn embed_cover(&mut self, bytes: Vec<u8>, mime: MimeType) -> Result<(), String> {
        if self.dry_run {
            info!(
                "[dry] Would embed cover ({} bytes) into '{}'",
                bytes.len(),
                self.path.display()
            );
            return Ok(());
        }
        let picture = Picture::unchecked(bytes)
            .pic_type(PictureType::CoverFront)
            .mime_type(mime)
            .build();
        let tag = self.working_tag()?;
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(picture);
        Ok(())
    }

    /// Pulls the embedded front-cover (or first) picture out of the file.
    pub fn extract_cover(&self) -> Option<(Vec<u8>, Option<MimeType>)> {
        let tag = self
            .tagged_file
            .primary_tag()
            .or_else(|| self.tagged_file.first_tag())?;
        let picture = tag
            .pictures()
            .iter()
            .find(|picture| picture.pic_type() == PictureType::CoverFront)
            .or_else(|| tag.pictures().first())?;
        Some((picture.data().to_vec(), picture.mime_type().cloned()))
    }

    /// Writes the container back to disk. No-op under dry-run.
    pub fn save(&mut self) -> Result<(), String> {
        if self.dry_run {
            debug!("[dry] Skipping save of '{}'", self.path.display());
            return Ok(());
        }
        self.tagged_file
            .save_to_path(&self.path, WriteOptions::default())
            .map_err(|err| format!("Failed to write tags to '{}': {err}", self.path.display()))
    }
}
