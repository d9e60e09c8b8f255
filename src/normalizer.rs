//! Artist/title normalization: alias substitution, feature-clause
//! extraction, list re-splitting, and group-to-members expansion.
//!
//! Pure text transformation over a [`TagRecord`]; no I/O. Stages run in a
//! fixed order and the whole pass is idempotent.

use std::collections::BTreeMap;

use log::debug;
use regex::Regex;

use crate::config::{Config, FeatHandling};
use crate::model::TagRecord;

/// Result flags the caller may want to surface to the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    /// Set in `keep-both` mode when a feature clause was detected but
    /// deliberately left in place.
    pub feature_clause_kept: Option<String>,
}

pub struct Normalizer {
    feat_regex: Regex,
    /// Lowercased alias -> replacement names.
    aliases: BTreeMap<String, Vec<String>>,
    /// Lowercased group name -> member names.
    groups: BTreeMap<String, Vec<String>>,
}

fn lowercase_keys(table: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    table
        .iter()
        .map(|(key, values)| (key.to_lowercase(), values.clone()))
        .collect()
}

fn dedupe_preserving_order(names: &mut Vec<String>) {
    let mut seen = Vec::new();
    names.retain(|name| {
        if seen.contains(name) {
            false
        } else {
            seen.push(name.clone());
            true
        }
    });
}

/// Splits a bare "A, B & C" style list into trimmed names.
fn split_name_list(text: &str) -> Vec<String> {
    text.split(|ch| ch == ',' || ch == '&')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl Normalizer {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let feat_regex = Regex::new(&config.patterns.featured_artist)
            .map_err(|err| format!("Invalid featured-artist pattern: {err}"))?;
        Ok(Self {
            feat_regex,
            aliases: lowercase_keys(&config.artist_aliases),
            groups: lowercase_keys(&config.artist_groups),
        })
    }

    /// Extracts a feature clause from `text`, returning the guest names
    /// and the clause-stripped remainder.
    fn extract_feature_clause(&self, text: &str) -> (Vec<String>, String) {
        match self.feat_regex.captures(text) {
            Some(captures) => {
                let guests = captures
                    .get(1)
                    .map(|group| split_name_list(group.as_str()))
                    .unwrap_or_default();
                let cleaned = self.feat_regex.replace_all(text, "").trim().to_string();
                (guests, cleaned)
            }
            None => (Vec::new(), text.to_string()),
        }
    }

    fn substitute_aliases(&self, names: &mut Vec<String>) {
        if self.aliases.is_empty() {
            return;
        }
        let mut replaced = Vec::new();
        for name in names.iter() {
            match self.aliases.get(&name.to_lowercase()) {
                Some(canonical) => {
                    debug!("Alias '{name}' -> {canonical:?}");
                    replaced.extend(canonical.iter().cloned());
                }
                None => replaced.push(name.clone()),
            }
        }
        dedupe_preserving_order(&mut replaced);
        *names = replaced;
    }

    fn expand_groups(&self, names: &mut Vec<String>) {
        if self.groups.is_empty() {
            return;
        }
        let mut expanded = Vec::new();
        for name in names.iter() {
            expanded.push(name.clone());
            if let Some(members) = self.groups.get(&name.to_lowercase()) {
                debug!("Expanding group '{name}' -> {members:?}");
                expanded.extend(members.iter().cloned());
            }
        }
        dedupe_preserving_order(&mut expanded);
        *names = expanded;
    }

    /// Re-splits every artist entry: fetched artist strings can carry
    /// embedded feature clauses or bare "A, B & C" lists of their own.
    fn resplit_artist_entries(&self, names: &mut Vec<String>) {
        let mut flattened = Vec::new();
        for entry in names.iter() {
            let (guests, cleaned) = self.extract_feature_clause(entry);
            if guests.is_empty() && (cleaned.contains(',') || cleaned.contains('&')) {
                flattened.extend(split_name_list(&cleaned));
            } else {
                flattened.push(cleaned);
                flattened.extend(guests);
            }
        }
        flattened.retain(|name| !name.is_empty());
        dedupe_preserving_order(&mut flattened);
        *names = flattened;
    }

    fn detect_feature_clause(&self, record: &TagRecord) -> Option<String> {
        if let Some(title) = &record.title {
            if let Some(found) = self.feat_regex.find(title) {
                return Some(found.as_str().to_string());
            }
        }
        record
            .artist
            .iter()
            .find_map(|entry| self.feat_regex.find(entry))
            .map(|found| found.as_str().to_string())
    }

    /// Runs the full normalization pass over `record` in place.
    pub fn normalize(&self, record: &mut TagRecord, mode: FeatHandling) -> NormalizeOutcome {
        // Stage 1: alias substitution.
        self.substitute_aliases(&mut record.artist);
        self.substitute_aliases(&mut record.album_artist);

        let mut outcome = NormalizeOutcome::default();
        if mode == FeatHandling::KeepBoth {
            // Detection only: stages 2 and 3 are skipped entirely.
            outcome.feature_clause_kept = self.detect_feature_clause(record);
        } else {
            // Stage 2: feature extraction from the title.
            if let Some(title) = record.title.clone() {
                let (guests, cleaned) = self.extract_feature_clause(&title);
                if !guests.is_empty() {
                    if mode != FeatHandling::KeepArtist {
                        record.artist.extend(guests);
                        dedupe_preserving_order(&mut record.artist);
                    }
                    record.title = match mode {
                        FeatHandling::Split => Some(format!("! {cleaned}")),
                        FeatHandling::SplitClean | FeatHandling::KeepArtist => Some(cleaned),
                        FeatHandling::KeepTitle => Some(title),
                        FeatHandling::KeepBoth => unreachable!(),
                    };
                }
            }

            // Stage 3: re-split every artist entry.
            self.resplit_artist_entries(&mut record.artist);
        }

        // Stage 4: group expansion.
        self.expand_groups(&mut record.artist);
        self.expand_groups(&mut record.album_artist);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::{NormalizeOutcome, Normalizer};
    use crate::config::{Config, FeatHandling};
    use crate::model::TagRecord;

    fn normalizer() -> Normalizer {
        Normalizer::from_config(&Config::default()).unwrap()
    }

    fn record(title: &str, artists: &[&str]) -> TagRecord {
        TagRecord {
            title: Some(title.to_string()),
            artist: artists.iter().map(|name| name.to_string()).collect(),
            ..TagRecord::default()
        }
    }

    #[test]
    fn test_split_mode_marks_title_and_appends_guest() {
        let mut song = record("Love Song (feat. Jane Doe)", &["John Smith"]);
        normalizer().normalize(&mut song, FeatHandling::Split);

        assert_eq!(song.title.as_deref(), Some("! Love Song"));
        assert_eq!(song.artist, vec!["John Smith", "Jane Doe"]);
    }

    #[test]
    fn test_split_clean_mode_strips_clause_without_marker() {
        let mut song = record("Love Song (feat. Jane Doe)", &["John Smith"]);
        normalizer().normalize(&mut song, FeatHandling::SplitClean);

        assert_eq!(song.title.as_deref(), Some("Love Song"));
        assert_eq!(song.artist, vec!["John Smith", "Jane Doe"]);
    }

    #[test]
    fn test_keep_title_mode_appends_guest_but_leaves_title() {
        let mut song = record("Love Song (feat. Jane Doe)", &["John Smith"]);
        normalizer().normalize(&mut song, FeatHandling::KeepTitle);

        assert_eq!(song.title.as_deref(), Some("Love Song (feat. Jane Doe)"));
        assert_eq!(song.artist, vec!["John Smith", "Jane Doe"]);
    }

    #[test]
    fn test_keep_artist_mode_strips_title_but_not_artists() {
        let mut song = record("Love Song (feat. Jane Doe)", &["John Smith"]);
        normalizer().normalize(&mut song, FeatHandling::KeepArtist);

        assert_eq!(song.title.as_deref(), Some("Love Song"));
        assert_eq!(song.artist, vec!["John Smith"]);
    }

    #[test]
    fn test_keep_both_mode_detects_without_mutating() {
        let mut song = record("Love Song (feat. Jane Doe)", &["John Smith"]);
        let before = song.clone();
        let outcome = normalizer().normalize(&mut song, FeatHandling::KeepBoth);

        assert_eq!(song, before);
        assert_eq!(
            outcome.feature_clause_kept.as_deref(),
            Some("(feat. Jane Doe)")
        );
    }

    #[test]
    fn test_alias_substitution_replaces_and_dedupes() {
        let mut config = Config::default();
        config.artist_aliases.insert(
            "jay z".to_string(),
            vec!["Jay-Z".to_string()],
        );
        let normalizer = Normalizer::from_config(&config).unwrap();

        let mut song = record("Song", &["Jay Z", "Jay-Z"]);
        normalizer.normalize(&mut song, FeatHandling::SplitClean);
        assert_eq!(song.artist, vec!["Jay-Z"]);
    }

    #[test]
    fn test_group_expansion_keeps_band_and_appends_members() {
        let mut song = record("Curio", &["AllttA"]);
        normalizer().normalize(&mut song, FeatHandling::Split);

        assert_eq!(song.artist, vec!["AllttA", "20syl", "Mr. J. Medeiros"]);
    }

    #[test]
    fn test_fetched_artist_with_embedded_clause_is_resplit() {
        let mut song = record("Song", &["John Smith (feat. Jane Doe)"]);
        normalizer().normalize(&mut song, FeatHandling::Split);

        assert_eq!(song.artist, vec!["John Smith", "Jane Doe"]);
    }

    #[test]
    fn test_bare_comma_ampersand_artist_entry_splits() {
        let mut song = record("Song", &["John Smith, Jane Doe & Juan Perez"]);
        normalizer().normalize(&mut song, FeatHandling::SplitClean);

        assert_eq!(song.artist, vec!["John Smith", "Jane Doe", "Juan Perez"]);
    }

    #[test]
    fn test_missing_artist_list_never_panics() {
        let mut song = TagRecord {
            title: Some("Instrumental".to_string()),
            ..TagRecord::default()
        };
        let outcome = normalizer().normalize(&mut song, FeatHandling::Split);
        assert_eq!(outcome, NormalizeOutcome::default());
        assert!(song.artist.is_empty());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut once = record("Curio (feat. Jane Doe)", &["AllttA"]);
        let normalizer = normalizer();
        normalizer.normalize(&mut once, FeatHandling::Split);

        let mut twice = once.clone();
        normalizer.normalize(&mut twice, FeatHandling::Split);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_entry_retains_feature_clause_after_split() {
        let mut song = record(
            "Song (feat. Jane Doe)",
            &["John Smith (with. Grace Kim)", "John Smith"],
        );
        let normalizer = normalizer();
        normalizer.normalize(&mut song, FeatHandling::Split);

        let pattern = regex::Regex::new(
            &Config::default().patterns.featured_artist,
        )
        .unwrap();
        for entry in &song.artist {
            assert!(!pattern.is_match(entry), "entry still has a clause: {entry}");
        }
        let mut deduped = song.artist.clone();
        deduped.dedup();
        assert_eq!(deduped, song.artist);
    }
}
