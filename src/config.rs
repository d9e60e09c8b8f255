//! Persistent application configuration model and defaults.

use std::collections::BTreeMap;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Per-run behavior defaults, overridable from the CLI.
    pub defaults: DefaultsConfig,
    #[serde(default)]
    /// Tag-join separators.
    pub separators: SeparatorsConfig,
    #[serde(default)]
    /// Text-extraction patterns.
    pub patterns: PatternsConfig,
    /// Band name mapped to its member names, appended after the band on expansion.
    #[serde(default = "default_artist_groups")]
    pub artist_groups: BTreeMap<String, Vec<String>>,
    /// Alternate spelling mapped to the canonical name(s) that replace it.
    #[serde(default)]
    pub artist_aliases: BTreeMap<String, Vec<String>>,
    /// Genres dropped instead of written when fetched from a provider.
    #[serde(default = "default_blacklisted_genres")]
    pub blacklisted_genres: Vec<String>,
    #[serde(default)]
    /// Credentials for the online services.
    pub api_keys: ApiKeysConfig,
}

/// Behavior defaults applied when the matching CLI flag is absent.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub rename: bool,
    /// Force similarity matching in album mode even when file and track
    /// counts line up.
    #[serde(default)]
    pub match_filename: bool,
    #[serde(default)]
    pub feat_handling: FeatHandling,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub cover: CoverConfig,
}

/// How a "(feat. X)" clause found in a title is handled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum FeatHandling {
    /// Move guests to the artist list and prefix the stripped title with "! ".
    #[default]
    Split,
    /// Move guests to the artist list and strip the clause from the title.
    SplitClean,
    /// Move guests to the artist list but leave the title untouched.
    KeepTitle,
    /// Strip the clause from the title but leave the artist list alone.
    KeepArtist,
    /// Detection only: warn about the clause without mutating anything.
    KeepBoth,
}

/// Lyrics fetching preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LyricsConfig {
    #[serde(default = "default_true")]
    pub fetch: bool,
    #[serde(default)]
    pub mode: LyricsMode,
    #[serde(default)]
    pub source: LyricsSource,
}

/// Where fetched lyrics end up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "lower")]
pub enum LyricsMode {
    /// Embed the lyrics text in the audio file tag.
    #[default]
    Embed,
    /// Save the lyrics as a sidecar `.lrc` file.
    Lrc,
    /// Embed and save the sidecar file.
    Both,
}

/// Which lyrics sources are tried, and in what shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "lower")]
pub enum LyricsSource {
    /// Primary by id, then primary search, then synced search, then an
    /// interactive rescue prompt when a terminal is attached.
    #[default]
    Auto,
    /// Primary provider by known id only.
    Genius,
    /// Synced-lyrics provider only.
    Synced,
    /// Always enter the interactive picker.
    Interactive,
}

/// Cover-art fetch/save behavior.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CoverConfig {
    /// Maximum embedded/saved size as "WIDTHxHEIGHT".
    #[serde(default = "default_cover_size")]
    pub size: String,
    /// Keep the oversized original next to the resized copy.
    #[serde(default = "default_true")]
    pub keep_resized: bool,
}

impl CoverConfig {
    /// Parses the configured "WxH" size, falling back to 1000x1000.
    pub fn max_dimensions(&self) -> (u32, u32) {
        let lowered = self.size.to_ascii_lowercase();
        let mut parts = lowered.splitn(2, 'x');
        let width = parts.next().and_then(|part| part.trim().parse().ok());
        let height = parts.next().and_then(|part| part.trim().parse().ok());
        match (width, height) {
            (Some(width), Some(height)) => (width, height),
            _ => (1000, 1000),
        }
    }
}

/// Strings used to join list-shaped tags at write time.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SeparatorsConfig {
    #[serde(default = "default_artist_separator")]
    pub artist: String,
    #[serde(default = "default_artist_separator")]
    pub genre: String,
}

/// Configurable extraction patterns.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PatternsConfig {
    /// Case-insensitive regex whose first capture is the guest-artist list.
    #[serde(default = "default_featured_artist_pattern")]
    pub featured_artist: String,
}

/// API credentials for the online services.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiKeysConfig {
    #[serde(default)]
    pub genius: String,
    #[serde(default)]
    pub acoustid: String,
}

// Derived Default would leave the seeded tables empty; the impl must go
// through the same functions the serde defaults name.
impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            separators: SeparatorsConfig::default(),
            patterns: PatternsConfig::default(),
            artist_groups: default_artist_groups(),
            artist_aliases: BTreeMap::new(),
            blacklisted_genres: default_blacklisted_genres(),
            api_keys: ApiKeysConfig::default(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            rename: false,
            match_filename: false,
            feat_handling: FeatHandling::Split,
            lyrics: LyricsConfig::default(),
            cover: CoverConfig::default(),
        }
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            fetch: true,
            mode: LyricsMode::Embed,
            source: LyricsSource::Auto,
        }
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            size: default_cover_size(),
            keep_resized: true,
        }
    }
}

impl Default for SeparatorsConfig {
    fn default() -> Self {
        Self {
            artist: default_artist_separator(),
            genre: default_artist_separator(),
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            featured_artist: default_featured_artist_pattern(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cover_size() -> String {
    "1920x1920".to_string()
}

fn default_artist_separator() -> String {
    "; ".to_string()
}

fn default_featured_artist_pattern() -> String {
    r"(?i)[(\[](?:feat|ft|featuring|with)\.?\s+(.*?)[)\]]".to_string()
}

fn default_blacklisted_genres() -> Vec<String> {
    vec!["soundtrack".to_string()]
}

fn default_artist_groups() -> BTreeMap<String, Vec<String>> {
    let mut groups = BTreeMap::new();
    groups.insert(
        "AllttA".to_string(),
        vec!["20syl".to_string(), "Mr. J. Medeiros".to_string()],
    );
    groups.insert(
        "Nirvana".to_string(),
        vec![
            "Kurt Cobain".to_string(),
            "Krist Novoselic".to_string(),
            "Dave Grohl".to_string(),
        ],
    );
    groups.insert(
        "KIDS SEE GHOSTS".to_string(),
        vec!["Kanye West".to_string(), "Kid Cudi".to_string()],
    );
    groups.insert(
        "Watch The Throne".to_string(),
        vec!["Kanye West".to_string(), "Jay-Z".to_string()],
    );
    groups
}
