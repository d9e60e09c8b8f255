mod cli;
mod config;
mod config_persistence;
mod console;
mod cover_art;
mod file_actions;
mod lyrics;
mod matcher;
mod media_file_discovery;
mod model;
mod normalizer;
mod providers;
mod session;
mod tag_writer;

use clap::Parser;
use log::{error, info, warn};

use cli::{Cli, ConfigAction, DebugOptions, FilesystemActions};
use config::Config;
use console::{Console, TreeConsole};
use cover_art::CoverSource;
use providers::{
    acoustid::AcoustidClient, genius::GeniusClient, lrclib::LrclibClient,
    musicbrainz::MusicBrainzClient, FingerprintResolver, PrimaryProvider,
};
use session::{RunOptions, TagSession};

const GENIUS_TOKEN_ENV: &str = "GENIUS_ACCESS_TOKEN";
const GENIUS_API_CLIENTS_URL: &str = "https://genius.com/api-clients";

fn init_logging(debug: &DebugOptions) {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    if debug.network {
        clog.filter(Some("retag::providers"), log::LevelFilter::Debug);
        clog.filter(Some("retag::cover_art"), log::LevelFilter::Debug);
    }
    if debug.cmd {
        clog.filter(Some("retag::file_actions"), log::LevelFilter::Debug);
        clog.filter(Some("retag::tag_writer"), log::LevelFilter::Debug);
    }
    if debug.vars {
        clog.filter(Some("retag::normalizer"), log::LevelFilter::Debug);
        clog.filter(Some("retag::matcher"), log::LevelFilter::Debug);
        clog.filter(Some("retag::session"), log::LevelFilter::Debug);
    }
    clog.init();
}

fn handle_config_action(
    config: &mut Config,
    config_path: &std::path::Path,
    action: &ConfigAction,
) -> Result<(), String> {
    match action {
        ConfigAction::Get(key) => {
            let value = config_persistence::dotted_get(config, key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            println!("{key} = {value}");
        }
        ConfigAction::Set(key, value) => {
            config_persistence::dotted_set(config, key, value)?;
            config_persistence::persist_config_file(config, config_path)?;
            println!("Set {key} to {value}");
        }
    }
    Ok(())
}

/// Walks the user through obtaining and storing a Genius token. The
/// token is validated with a throwaway search before being persisted.
fn run_token_wizard(
    console: &mut dyn Console,
    config: &mut Config,
    config_path: &std::path::Path,
) -> Result<(), String> {
    console.notify(console::NoticeLevel::Info, "=== Genius API Token Setup ===");
    if webbrowser::open(GENIUS_API_CLIENTS_URL).is_err() {
        console.notify(
            console::NoticeLevel::Info,
            &format!("Open {GENIUS_API_CLIENTS_URL} in a browser to create a client."),
        );
    }
    let token = console.ask("Paste your 'Client Access Token' here:");
    if token.is_empty() {
        return Ok(());
    }

    let client = GeniusClient::new(&token);
    if client
        .search_songs("Test")
        .map(|hits| hits.is_empty())
        .unwrap_or(true)
    {
        return Err("Token validation failed. Nothing saved.".to_string());
    }
    config.api_keys.genius = token;
    config_persistence::persist_config_file(config, config_path)?;
    console.notify(console::NoticeLevel::Info, "Token saved.");
    Ok(())
}

fn build_run_options(cli: &Cli, config: &Config, dry_run: bool) -> Result<RunOptions, String> {
    let actions = FilesystemActions::parse(cli.filesystem.as_deref());
    let cover = cli
        .cover_art
        .as_deref()
        .map(CoverSource::parse)
        .transpose()?;
    Ok(RunOptions {
        search: cli::parse_search(&cli.search),
        manual_tags: cli::parse_manual_tags(&cli.manual_tags)?,
        feat_handling: cli.feat_handling.unwrap_or(config.defaults.feat_handling),
        lyrics_fetch: config.defaults.lyrics.fetch,
        lyrics_mode: cli.lyrics.unwrap_or(config.defaults.lyrics.mode),
        lyrics_source: cli.lyrics_source.unwrap_or(config.defaults.lyrics.source),
        cover,
        rename: actions.rename || config.defaults.rename,
        match_filename: actions.match_filename || config.defaults.match_filename,
        infer_dirs: actions.infer_dirs,
        autosort: actions.autosort,
        fingerprint: cli.fingerprint,
        dry_run,
    })
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let debug = DebugOptions::parse(cli.debug.as_deref());
    init_logging(&debug);
    if debug.dry {
        info!("Dry run: no files will be modified.");
    }

    let config_path = config_persistence::resolve_config_path();
    let mut config = config_persistence::load_or_init_config(&config_path);
    config_persistence::apply_cli_overrides(&mut config, &cli.temp_set);

    let mut console = TreeConsole::new();

    if !cli.config_action.is_empty() {
        let action = ConfigAction::parse(&cli.config_action)?;
        return handle_config_action(&mut config, &config_path, &action);
    }
    if cli.setup_token {
        return run_token_wizard(&mut console, &mut config, &config_path);
    }

    let genius_token = if config.api_keys.genius.is_empty() {
        std::env::var(GENIUS_TOKEN_ENV).unwrap_or_default()
    } else {
        config.api_keys.genius.clone()
    };
    if genius_token.is_empty() {
        warn!("No Genius token found. Online metadata will be limited.");
    }
    let genius = GeniusClient::new(&genius_token);
    let lrclib = LrclibClient::new();
    let musicbrainz = MusicBrainzClient::new();
    let acoustid = AcoustidClient::new(&config.api_keys.acoustid);
    let fingerprint: Option<&dyn FingerprintResolver> = if cli.fingerprint {
        Some(&acoustid)
    } else {
        None
    };

    let options = build_run_options(&cli, &config, debug.dry)?;
    let has_search_override = options.search != model::TrackQuery::default();
    let session = TagSession::new(&config, &genius, &lrclib, &musicbrainz, fingerprint, options)?;

    if cli.album {
        let [directory] = cli.paths.as_slice() else {
            return Err("Album mode takes exactly one directory.".to_string());
        };
        if !directory.is_dir() {
            return Err("Album mode requires a directory.".to_string());
        }
        return session.run_album(&mut console, directory);
    }

    let targets = TagSession::resolve_targets(&cli.paths);
    if targets.is_empty() {
        return Err("No audio files to process.".to_string());
    }
    // A manual search describes one song; applying it to a batch would
    // stamp every file with the same metadata.
    if has_search_override && targets.len() > 1 {
        return Err(format!(
            "-s matched {} files. Manual search applies to a single target.",
            targets.len()
        ));
    }

    for target in &targets {
        info!("Processing: {}", target.display());
        if let Err(err) = session.run_single(&mut console, target) {
            error!("Failed to process '{}': {err}", target.display());
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}
