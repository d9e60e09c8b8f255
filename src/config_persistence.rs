//! Config file location, loading, and comment-preserving persistence.
//!
//! The config path is layered: an explicit `RETAG_CONFIG` env var wins,
//! then `XDG_CONFIG_HOME/retag/config.toml`, then the platform config
//! directory. The file is written only on explicit save or when the
//! default config is first created.

use std::path::{Path, PathBuf};

use log::{info, warn};
use toml_edit::{DocumentMut, Item, Table};

use crate::config::Config;

pub const CONFIG_PATH_ENV: &str = "RETAG_CONFIG";
pub const XDG_CONFIG_HOME_ENV: &str = "XDG_CONFIG_HOME";
const CONFIG_DIR_NAME: &str = "retag";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolves the config path from explicit layers, highest priority first.
pub fn resolve_config_path_from(
    explicit_path: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    platform_config_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = explicit_path {
        return path;
    }
    if let Some(xdg) = xdg_config_home {
        return xdg.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
    }
    platform_config_dir
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Resolves the config path from the process environment.
pub fn resolve_config_path() -> PathBuf {
    let explicit_path = std::env::var_os(CONFIG_PATH_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let xdg_config_home = std::env::var_os(XDG_CONFIG_HOME_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    resolve_config_path_from(explicit_path, xdg_config_home, dirs::config_dir())
}

/// Loads the config, creating a default file on first run. A corrupt
/// file degrades to defaults with a warning instead of aborting.
pub fn load_or_init_config(path: &Path) -> Config {
    if !path.exists() {
        let config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        if let Err(err) = write_default_config(&config, path) {
            warn!("Failed to create default config at {}: {err}", path.display());
        }
        return config;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={err}",
                path.display()
            );
            return Config::default();
        }
    };

    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={err}",
                path.display()
            );
            Config::default()
        }
    }
}

fn write_default_config(config: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    let text = toml::to_string(config).map_err(|err| format!("failed to serialize config: {err}"))?;
    std::fs::write(path, text).map_err(|err| format!("failed to write {}: {err}", path.display()))
}

fn merge_table_preserving_decor(destination: &mut Table, source: &Table) {
    for (key, source_item) in source.iter() {
        match source_item {
            Item::Table(source_table) => {
                if !destination.get(key).is_some_and(Item::is_table) {
                    destination.insert(key, Item::Table(Table::new()));
                }
                let destination_table = destination
                    .get_mut(key)
                    .and_then(Item::as_table_mut)
                    .expect("table inserted above");
                // Drop map entries the new config no longer carries so that
                // deleted aliases/groups do not resurrect on the next load.
                let stale_keys: Vec<String> = destination_table
                    .iter()
                    .map(|(child, _)| child.to_string())
                    .filter(|child| !source_table.contains_key(child))
                    .collect();
                for stale in stale_keys {
                    destination_table.remove(&stale);
                }
                merge_table_preserving_decor(destination_table, source_table);
            }
            _ => {
                let existing_decor = destination
                    .get(key)
                    .and_then(|current| current.as_value().map(|value| value.decor().clone()));
                destination.insert(key, source_item.clone());
                if let Some(decor) = existing_decor {
                    if let Some(next_value) = destination[key].as_value_mut() {
                        *next_value.decor_mut() = decor;
                    }
                }
            }
        }
    }
}

/// Rewrites an existing config text to match `config`, keeping the
/// user's comments and key ordering where possible.
pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let next_text =
        toml::to_string(config).map_err(|err| format!("failed to serialize config: {err}"))?;
    let next_document = next_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse serialized config as TOML document: {err}"))?;
    let mut existing_document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {err}"))?;
    merge_table_preserving_decor(existing_document.as_table_mut(), next_document.as_table());
    Ok(existing_document.to_string())
}

/// Persists the config to `path`. Only called on explicit save.
pub fn persist_config_file(config: &Config, path: &Path) -> Result<(), String> {
    let config_text = match std::fs::read_to_string(path) {
        Ok(existing_text) => match serialize_config_with_preserved_comments(&existing_text, config)
        {
            Ok(updated_text) => updated_text,
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({err}). Falling back to plain serialization.",
                    path.display()
                );
                toml::to_string(config)
                    .map_err(|err| format!("failed to serialize config: {err}"))?
            }
        },
        Err(_) => {
            toml::to_string(config).map_err(|err| format!("failed to serialize config: {err}"))?
        }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
    }
    std::fs::write(path, config_text)
        .map_err(|err| format!("failed to persist config to {}: {err}", path.display()))
}

/// Reads one config value by dotted key, e.g. `api_keys.genius`.
/// This adapter exists only for the CLI boundary; components read the
/// typed struct directly.
pub fn dotted_get(config: &Config, dotted_key: &str) -> Option<serde_json::Value> {
    let root = serde_json::to_value(config).ok()?;
    let mut current = &root;
    for segment in dotted_key.split('.') {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

fn coerce_cli_value(raw: &str) -> serde_json::Value {
    if raw.eq_ignore_ascii_case("true") {
        return serde_json::Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return serde_json::Value::Bool(false);
    }
    if let Ok(number) = raw.parse::<i64>() {
        return serde_json::Value::Number(number.into());
    }
    serde_json::Value::String(raw.to_string())
}

/// Sets one config value by dotted key from its CLI string form.
/// Unknown keys and type mismatches are rejected rather than invented.
pub fn dotted_set(config: &mut Config, dotted_key: &str, raw_value: &str) -> Result<(), String> {
    let mut root =
        serde_json::to_value(&*config).map_err(|err| format!("failed to inspect config: {err}"))?;

    let segments: Vec<&str> = dotted_key.split('.').collect();
    let (leaf_key, parents) = segments
        .split_last()
        .ok_or_else(|| "empty config key".to_string())?;

    let mut current = &mut root;
    for segment in parents {
        current = current
            .get_mut(*segment)
            .ok_or_else(|| format!("unknown config key: {dotted_key}"))?;
    }
    let target = current
        .as_object_mut()
        .ok_or_else(|| format!("config key is not settable: {dotted_key}"))?;

    // The alias/group tables accept new user-chosen keys; everywhere else
    // only keys the typed config already knows are settable.
    let user_table_insert = matches!(
        parents.last(),
        Some(&"artist_groups") | Some(&"artist_aliases")
    );
    if !user_table_insert && !target.contains_key(*leaf_key) {
        return Err(format!("unknown config key: {dotted_key}"));
    }
    let new_value = if user_table_insert {
        serde_json::Value::Array(
            raw_value
                .split(',')
                .map(|name| serde_json::Value::String(name.trim().to_string()))
                .collect(),
        )
    } else {
        coerce_cli_value(raw_value)
    };
    target.insert((*leaf_key).to_string(), new_value);

    *config = serde_json::from_value(root)
        .map_err(|err| format!("invalid value for {dotted_key}: {err}"))?;
    Ok(())
}

/// Applies `key=value` one-off overrides. Never persisted.
pub fn apply_cli_overrides(config: &mut Config, overrides: &[String]) {
    for item in overrides {
        let Some((key, value)) = item.split_once('=') else {
            warn!("Ignoring malformed --set override (expected key=value): {item}");
            continue;
        };
        if let Err(err) = dotted_set(config, key.trim(), value) {
            warn!("Ignoring --set override {key}: {err}");
        }
    }
}
