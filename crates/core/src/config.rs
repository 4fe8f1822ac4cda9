//! Engine configuration loaded from TOML.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resource::ResourceLimiter;

/// Settings for one playthrough; every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Event entered by a new game.
    pub start_event: String,
    pub hero: HeroConfig,
    pub assets: AssetPaths,
    /// Maximum number of chat lines kept while a chat sequence lasts.
    pub chat_history_limit: usize,
    pub limits: ResourceLimiter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_event: "init".to_string(),
            hero: HeroConfig::default(),
            assets: AssetPaths::default(),
            chat_history_limit: 200,
            limits: ResourceLimiter::default(),
        }
    }
}

/// The player character, whose name is chosen at a name input step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeroConfig {
    /// Speaker id that is displayed as the committed name.
    pub character_id: String,
    /// Name shown before one is committed.
    pub default_name: String,
    /// Text token replaced by the full committed name.
    pub full_name_token: String,
    /// Text token replaced by the given name (full name minus its first character).
    pub given_name_token: String,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            character_id: "character_hero".to_string(),
            default_name: "이도훈".to_string(),
            full_name_token: "이도훈".to_string(),
            given_name_token: "도훈".to_string(),
        }
    }
}

impl HeroConfig {
    /// Replaces the hero name tokens in `text`.
    ///
    /// The full token is replaced first so it never decays into a given-name
    /// match.
    pub fn substitute(&self, text: &str, name: &str) -> String {
        if self.full_name_token.is_empty() {
            return text.to_string();
        }
        let given = given_name(name);
        text.split(self.full_name_token.as_str())
            .map(|chunk| {
                if self.given_name_token.is_empty() {
                    chunk.to_string()
                } else {
                    chunk.replace(self.given_name_token.as_str(), given)
                }
            })
            .collect::<Vec<_>>()
            .join(name)
    }
}

/// Given name of a full name: everything after the first character, when
/// the name has more than one character.
pub fn given_name(name: &str) -> &str {
    let mut chars = name.char_indices();
    match (chars.next(), chars.next()) {
        (Some(_), Some((offset, _))) => &name[offset..],
        _ => name,
    }
}

/// Where image assets live and how bare ids are completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetPaths {
    pub background_dir: String,
    pub character_dir: String,
    pub background_ext: String,
    pub character_ext: String,
    /// Portrait id that clears a position.
    pub empty_portrait: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            background_dir: "/backgrounds".to_string(),
            character_dir: "/characters".to_string(),
            background_ext: "jpg".to_string(),
            character_ext: "png".to_string(),
            empty_portrait: "nobody".to_string(),
        }
    }
}

impl AssetPaths {
    pub fn background(&self, id: &str) -> String {
        asset_path(&self.background_dir, id, &self.background_ext)
    }

    /// Resolves a portrait id; the empty portrait resolves to nothing.
    pub fn character(&self, id: &str) -> Option<String> {
        if id == self.empty_portrait {
            return None;
        }
        Some(asset_path(&self.character_dir, id, &self.character_ext))
    }
}

fn asset_path(dir: &str, id: &str, default_ext: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if Path::new(id).extension().is_some() || default_ext.is_empty() {
        format!("{dir}/{id}")
    } else {
        format!("{dir}/{id}.{default_ext}")
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    #[diagnostic(
        code(config::not_found),
        help("pass --config with a path to an engine TOML file, or omit it for defaults")
    )]
    NotFound(PathBuf),

    #[error("failed to parse config: {0}")]
    #[diagnostic(code(config::parse_error))]
    ParseError(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    #[diagnostic(code(config::write_error))]
    WriteError(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    #[diagnostic(code(config::io_error))]
    IoError(#[from] std::io::Error),
}

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a config from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Saves the config to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
