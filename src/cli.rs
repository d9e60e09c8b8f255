//! Command-line surface and the parsers that turn raw flag values into
//! typed run options.

use std::path::PathBuf;

use clap::Parser;
use log::warn;

use crate::config::{FeatHandling, LyricsMode, LyricsSource};
use crate::model::{ManualOverrides, TrackQuery};

#[derive(Debug, Parser)]
#[command(
    name = "retag",
    version,
    about = "Interactive music tagger with online metadata, lyrics and cover art"
)]
pub struct Cli {
    /// Files or directories to tag.
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Album mode: reconcile a directory against a remote tracklist.
    #[arg(short, long)]
    pub album: bool,

    /// Manual search terms as key=value pairs (name, artist, album,
    /// url). A song page URL pins the match and skips scoring.
    #[arg(short, long, num_args = 1.., value_name = "KEY=VALUE")]
    pub search: Vec<String>,

    /// Tag overrides as key=value pairs (title, artist, album, year,
    /// genre, track). Applied last, over anything fetched.
    #[arg(short = 't', long, num_args = 1.., value_name = "KEY=VALUE")]
    pub manual_tags: Vec<String>,

    /// How "(feat. X)" clauses in titles are handled.
    #[arg(short = 'F', long, value_enum)]
    pub feat_handling: Option<FeatHandling>,

    /// Comma-joined filesystem actions: rename, match-filename,
    /// infer-dirs, autosort.
    #[arg(short = 'f', long, value_name = "ACTIONS")]
    pub filesystem: Option<String>,

    /// Cover art mode: auto, extract, or file=PATH.
    #[arg(short = 'c', long, value_name = "MODE")]
    pub cover_art: Option<String>,

    /// Where fetched lyrics end up.
    #[arg(short = 'l', long, value_enum)]
    pub lyrics: Option<LyricsMode>,

    /// Which lyrics sources are tried.
    #[arg(long, value_enum)]
    pub lyrics_source: Option<LyricsSource>,

    /// Identify files with no usable tags via acoustic fingerprinting.
    #[arg(long)]
    pub fingerprint: bool,

    /// Comma-joined debug categories: dry, network, cmd, vars, all.
    /// Bare -d performs a dry run.
    #[arg(
        short = 'd',
        long,
        num_args = 0..=1,
        default_missing_value = "dry",
        value_name = "CATEGORIES"
    )]
    pub debug: Option<String>,

    /// Config operations: `get <key>` or `set <key> <value>`.
    #[arg(short = 'C', long = "config", num_args = 1..=3, value_name = "ACTION")]
    pub config_action: Vec<String>,

    /// One-off config overrides as key=value pairs, never persisted.
    #[arg(short = 'S', long = "set", num_args = 1.., value_name = "KEY=VALUE")]
    pub temp_set: Vec<String>,

    /// Interactive wizard that obtains and stores a Genius API token.
    #[arg(long)]
    pub setup_token: bool,
}

/// Debug categories parsed from `-d`. `all` enables every logging
/// category but stays a live run; only `dry` suppresses writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOptions {
    pub dry: bool,
    pub network: bool,
    pub cmd: bool,
    pub vars: bool,
}

impl DebugOptions {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut options = DebugOptions::default();
        let Some(raw) = raw else {
            return options;
        };
        for category in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match category {
                "dry" => options.dry = true,
                "network" => options.network = true,
                "cmd" => options.cmd = true,
                "vars" => options.vars = true,
                "all" => {
                    options.network = true;
                    options.cmd = true;
                    options.vars = true;
                }
                other => warn!("Unknown debug category '{other}' ignored."),
            }
        }
        options
    }
}

/// Filesystem actions parsed from the comma-joined `-f` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilesystemActions {
    pub rename: bool,
    pub match_filename: bool,
    pub infer_dirs: bool,
    pub autosort: bool,
}

impl FilesystemActions {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut actions = FilesystemActions::default();
        let Some(raw) = raw else {
            return actions;
        };
        for action in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match action {
                "rename" => actions.rename = true,
                "match-filename" => actions.match_filename = true,
                "infer-dirs" => actions.infer_dirs = true,
                "autosort" => actions.autosort = true,
                other => warn!("Unknown filesystem action '{other}' ignored."),
            }
        }
        actions
    }
}

fn key_value_pairs(items: &[String]) -> impl Iterator<Item = (&str, &str)> {
    items.iter().filter_map(|item| {
        let pair = item.split_once('=');
        if pair.is_none() {
            warn!("Ignoring malformed key=value pair: {item}");
        }
        pair.map(|(key, value)| (key.trim(), value.trim()))
    })
}

/// Builds the search query from `-s` pairs. Unknown keys are ignored
/// with a warning so a typo cannot silently change the query.
pub fn parse_search(items: &[String]) -> TrackQuery {
    let mut query = TrackQuery::default();
    for (key, value) in key_value_pairs(items) {
        match key {
            "name" | "title" => query.name = Some(value.to_string()),
            "artist" => query.artist = Some(value.to_string()),
            "album" => query.album = Some(value.to_string()),
            "url" => query.url = Some(value.to_string()),
            other => warn!("Unknown search key '{other}' ignored."),
        }
    }
    query
}

/// Builds the manual overrides from `-t` pairs.
pub fn parse_manual_tags(items: &[String]) -> Result<ManualOverrides, String> {
    let mut overrides = ManualOverrides::default();
    for (key, value) in key_value_pairs(items) {
        match key {
            "title" | "name" => overrides.title = Some(value.to_string()),
            "artist" => overrides.artist = Some(value.to_string()),
            "album" => overrides.album = Some(value.to_string()),
            "year" => overrides.year = Some(value.to_string()),
            "genre" => overrides.genre = Some(value.to_string()),
            "track" => {
                let number = value
                    .parse::<u32>()
                    .map_err(|_| format!("track override must be a number, got '{value}'"))?;
                overrides.track_number = Some(number);
            }
            other => warn!("Unknown tag override key '{other}' ignored."),
        }
    }
    Ok(overrides)
}

/// Parsed `-C` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    Get(String),
    Set(String, String),
}

impl ConfigAction {
    pub fn parse(items: &[String]) -> Result<Self, String> {
        match items {
            [action, key] if action == "get" => Ok(ConfigAction::Get(key.clone())),
            [action, key, value] if action == "set" => {
                Ok(ConfigAction::Set(key.clone(), value.clone()))
            }
            _ => Err("usage: -C get <key> | -C set <key> <value>".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_manual_tags, parse_search, Cli, ConfigAction, DebugOptions, FilesystemActions};
    use crate::config::{FeatHandling, LyricsMode};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_bare_debug_flag_means_dry_run() {
        let cli = Cli::parse_from(["retag", "song.mp3", "-d"]);
        let debug = DebugOptions::parse(cli.debug.as_deref());
        assert!(debug.dry);
        assert!(!debug.network);
        assert_eq!(cli.paths, vec![std::path::PathBuf::from("song.mp3")]);
    }

    #[test]
    fn test_debug_all_is_live_with_every_category() {
        let debug = DebugOptions::parse(Some("all"));
        assert!(!debug.dry);
        assert!(debug.network && debug.cmd && debug.vars);

        let combined = DebugOptions::parse(Some("dry,network"));
        assert!(combined.dry && combined.network && !combined.cmd);
    }

    #[test]
    fn test_filesystem_actions_parse_comma_list() {
        let actions = FilesystemActions::parse(Some("rename,autosort"));
        assert!(actions.rename && actions.autosort);
        assert!(!actions.match_filename && !actions.infer_dirs);
        assert_eq!(FilesystemActions::parse(None), FilesystemActions::default());
    }

    #[test]
    fn test_search_pairs_map_to_query_fields() {
        let query = parse_search(&strings(&["artist=AllttA", "name=Curio", "bogus"]));
        assert_eq!(query.artist.as_deref(), Some("AllttA"));
        assert_eq!(query.name.as_deref(), Some("Curio"));
        assert!(query.album.is_none());

        let pinned = parse_search(&strings(&["url=https://genius.com/Alltta-the-woods-lyrics"]));
        assert_eq!(
            pinned.url.as_deref(),
            Some("https://genius.com/Alltta-the-woods-lyrics")
        );
    }

    #[test]
    fn test_manual_tags_parse_and_validate_track_number() {
        let overrides =
            parse_manual_tags(&strings(&["title=The Woods", "track=7"])).expect("valid pairs");
        assert_eq!(overrides.title.as_deref(), Some("The Woods"));
        assert_eq!(overrides.track_number, Some(7));

        assert!(parse_manual_tags(&strings(&["track=seven"])).is_err());
    }

    #[test]
    fn test_config_action_parses_get_and_set() {
        assert_eq!(
            ConfigAction::parse(&strings(&["get", "defaults.rename"])),
            Ok(ConfigAction::Get("defaults.rename".to_string()))
        );
        assert_eq!(
            ConfigAction::parse(&strings(&["set", "api_keys.genius", "tok"])),
            Ok(ConfigAction::Set("api_keys.genius".to_string(), "tok".to_string()))
        );
        assert!(ConfigAction::parse(&strings(&["frobnicate"])).is_err());
    }

    #[test]
    fn test_value_enums_accept_kebab_and_lower_case() {
        let cli = Cli::parse_from(["retag", "-F", "split-clean", "-l", "both", "x.mp3"]);
        assert_eq!(cli.feat_handling, Some(FeatHandling::SplitClean));
        assert_eq!(cli.lyrics, Some(LyricsMode::Both));
    }

    #[test]
    fn test_defaults_target_current_directory() {
        let cli = Cli::parse_from(["retag"]);
        assert_eq!(cli.paths, vec![std::path::PathBuf::from(".")]);
        assert!(!cli.album);
        assert!(cli.debug.is_none());
    }
}
