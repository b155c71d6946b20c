use color_eyre::eyre::{Context as _, eyre};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::{GameRules, RuleProfile};
use crate::errors::EngineError;

const CONFIG_DIR: &str = "snake-server";
const CONFIG_FILE: &str = "config.toml";

/// Application configuration.
///
/// Read from TOML, then overridden by `DATABASE_URL`, `SNAKE_PROFILE` and
/// `SNAKE_RNG_SEED` from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub rules: RuleOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub profile: RuleProfile,
    /// Grid width for new games; the profile's default when unset
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub obstacles: usize,
    pub obstacles_enabled: bool,
    pub pause_enabled: bool,
    /// Fixed seed for food and obstacle placement
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            profile: RuleProfile::Classic,
            width: None,
            height: None,
            obstacles: 5,
            obstacles_enabled: true,
            pause_enabled: true,
            rng_seed: None,
        }
    }
}

// Per-constant overrides applied on top of the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    pub food_reward: Option<u32>,
    pub level_threshold: Option<u32>,
    pub base_speed: Option<u32>,
    pub speed_decrement: Option<u32>,
    pub speed_floor: Option<u32>,
}

impl AppConfig {
    /// Get the config directory path (~/.config/snake-server on Linux)
    pub fn config_dir() -> color_eyre::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not find config directory"))?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    pub fn config_path() -> color_eyre::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from `path`, or from the default location when no path is
    /// given. A missing default file yields the defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> color_eyre::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::config_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let contents = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> color_eyre::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> color_eyre::Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> color_eyre::Result<()> {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(profile) = lookup("SNAKE_PROFILE") {
            self.game.profile = profile.parse().wrap_err("Invalid SNAKE_PROFILE")?;
        }
        if let Some(seed) = lookup("SNAKE_RNG_SEED") {
            self.game.rng_seed = Some(seed.parse().wrap_err("Invalid SNAKE_RNG_SEED")?);
        }
        Ok(())
    }

    /// Effective rules: the profile's constants with overrides applied.
    pub fn rules(&self) -> GameRules {
        let base = self.game.profile.rules();
        let overrides = &self.rules;
        GameRules {
            food_reward: overrides.food_reward.unwrap_or(base.food_reward),
            level_threshold: overrides.level_threshold.unwrap_or(base.level_threshold),
            base_speed: overrides.base_speed.unwrap_or(base.base_speed),
            speed_decrement: overrides.speed_decrement.unwrap_or(base.speed_decrement),
            speed_floor: overrides.speed_floor.unwrap_or(base.speed_floor),
            obstacles_enabled: self.game.obstacles_enabled,
            pause_enabled: self.game.pause_enabled,
        }
    }

    /// Default (width, height) for new games.
    pub fn dimensions(&self) -> (i32, i32) {
        let (width, height) = self.game.profile.dimensions();
        (
            self.game.width.unwrap_or(width),
            self.game.height.unwrap_or(height),
        )
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.rules().validate()?;

        let (width, height) = self.dimensions();
        if width <= 0 || height <= 0 {
            return Err(EngineError::config(format!(
                "default grid must be positive, got {width}x{height}"
            )));
        }
        if self.game.obstacles_enabled
            && self.game.obstacles as i64 >= i64::from(width) * i64::from(height) - 1
        {
            return Err(EngineError::config(format!(
                "{} obstacles leave no room on the default {width}x{height} grid",
                self.game.obstacles
            )));
        }
        Ok(())
    }
}
