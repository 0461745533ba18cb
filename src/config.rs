//! Application-level configuration loading, including the game modes and their datasets.

use std::{env, fs, io::ErrorKind, path::PathBuf, sync::Arc};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::SessionError,
    state::game::{Entity, GameMode, SharedMode},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GEOQUIZ_CONFIG_PATH";
const DEFAULT_TURN_DURATION_SECS: u32 = 20;
const DEFAULT_POINTS_PER_CORRECT: u32 = 10;
const DEFAULT_MIN_PLAYERS: usize = 2;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_mode: String,
    modes: IndexMap<String, SharedMode>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in modes.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        modes = app_config.modes.len(),
                        default_mode = %app_config.default_mode,
                        "loaded game modes from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document.
    pub fn from_json_str(contents: &str) -> Result<Self, SessionError> {
        let raw: RawConfig = serde_json::from_str(contents)
            .map_err(|err| SessionError::Config(err.to_string()))?;
        raw.try_into()
    }

    /// Resolve a mode by identifier, or the default mode when `id` is `None`.
    ///
    /// Unknown modes and modes without entities are configuration errors.
    pub fn mode(&self, id: Option<&str>) -> Result<SharedMode, SessionError> {
        let id = id.unwrap_or(&self.default_mode);
        let mode = self
            .modes
            .get(id)
            .ok_or_else(|| SessionError::Config(format!("unknown mode `{id}`")))?;
        if mode.entities.is_empty() {
            return Err(SessionError::Config(format!("mode `{id}` has no entities")));
        }
        Ok(mode.clone())
    }

    /// Identifier of the mode used when a client does not pick one.
    pub fn default_mode(&self) -> &str {
        &self.default_mode
    }

    /// Configured modes in declaration order.
    pub fn modes(&self) -> impl Iterator<Item = &SharedMode> {
        self.modes.values()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let modes: IndexMap<String, SharedMode> = default_modes()
            .into_iter()
            .map(|mode| (mode.id.clone(), Arc::new(mode)))
            .collect();
        Self {
            default_mode: "countries".into(),
            modes,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_mode: Option<String>,
    modes: Vec<RawMode>,
}

#[derive(Debug, Deserialize)]
struct RawMode {
    id: String,
    name: String,
    #[serde(default = "default_turn_duration")]
    turn_duration_secs: u32,
    #[serde(default = "default_points_per_correct")]
    points_per_correct: u32,
    #[serde(default = "default_min_players")]
    min_players: usize,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: String,
    name: String,
    #[serde(default)]
    alt_names: Vec<String>,
}

fn default_turn_duration() -> u32 {
    DEFAULT_TURN_DURATION_SECS
}

fn default_points_per_correct() -> u32 {
    DEFAULT_POINTS_PER_CORRECT
}

fn default_min_players() -> usize {
    DEFAULT_MIN_PLAYERS
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = SessionError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let mut modes = IndexMap::with_capacity(value.modes.len());
        for raw in value.modes {
            if raw.turn_duration_secs == 0 {
                return Err(SessionError::Config(format!(
                    "mode `{}` has a zero turn duration",
                    raw.id
                )));
            }
            let mode = GameMode::from(raw);
            if modes.contains_key(&mode.id) {
                return Err(SessionError::Config(format!(
                    "mode `{}` declared twice",
                    mode.id
                )));
            }
            modes.insert(mode.id.clone(), Arc::new(mode));
        }

        let default_mode = match value.default_mode {
            Some(id) if modes.contains_key(&id) => id,
            Some(id) => {
                return Err(SessionError::Config(format!(
                    "default mode `{id}` is not declared"
                )));
            }
            None => modes
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| SessionError::Config("no mode declared".into()))?,
        };

        Ok(Self {
            default_mode,
            modes,
        })
    }
}

impl From<RawMode> for GameMode {
    fn from(value: RawMode) -> Self {
        Self {
            id: value.id,
            name: value.name,
            turn_duration_secs: value.turn_duration_secs,
            points_per_correct: value.points_per_correct,
            // A game needs someone to hold the turn.
            min_players: value.min_players.max(1),
            entities: value
                .entities
                .into_iter()
                .map(|entity| Entity::new(entity.id, entity.name).with_alt_names(entity.alt_names))
                .collect(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in modes shipped with the binary.
fn default_modes() -> Vec<GameMode> {
    vec![
        GameMode {
            id: "countries".into(),
            name: "Countries of the world".into(),
            turn_duration_secs: DEFAULT_TURN_DURATION_SECS,
            points_per_correct: DEFAULT_POINTS_PER_CORRECT,
            min_players: DEFAULT_MIN_PLAYERS,
            entities: vec![
                Entity::new("FRA", "France").with_alt_names(["French Republic"]),
                Entity::new("DEU", "Germany").with_alt_names(["Deutschland"]),
                Entity::new("ESP", "Spain").with_alt_names(["España"]),
                Entity::new("ITA", "Italy").with_alt_names(["Italia"]),
                Entity::new("GBR", "United Kingdom")
                    .with_alt_names(["UK", "Great Britain", "Britain"]),
                Entity::new("USA", "United States")
                    .with_alt_names(["USA", "United States of America", "America"]),
                Entity::new("CAN", "Canada"),
                Entity::new("MEX", "Mexico").with_alt_names(["México"]),
                Entity::new("BRA", "Brazil").with_alt_names(["Brasil"]),
                Entity::new("ARG", "Argentina"),
                Entity::new("CIV", "Côte d'Ivoire").with_alt_names(["Ivory Coast"]),
                Entity::new("EGY", "Egypt"),
                Entity::new("ZAF", "South Africa"),
                Entity::new("NGA", "Nigeria"),
                Entity::new("IND", "India"),
                Entity::new("CHN", "China").with_alt_names(["People's Republic of China"]),
                Entity::new("JPN", "Japan").with_alt_names(["Nippon"]),
                Entity::new("KOR", "South Korea").with_alt_names(["Korea"]),
                Entity::new("AUS", "Australia"),
                Entity::new("NZL", "New Zealand").with_alt_names(["Aotearoa"]),
            ],
        },
        GameMode {
            id: "us-states".into(),
            name: "US states".into(),
            turn_duration_secs: DEFAULT_TURN_DURATION_SECS,
            points_per_correct: DEFAULT_POINTS_PER_CORRECT,
            min_players: DEFAULT_MIN_PLAYERS,
            entities: vec![
                Entity::new("US-CA", "California"),
                Entity::new("US-TX", "Texas"),
                Entity::new("US-NY", "New York"),
                Entity::new("US-FL", "Florida"),
                Entity::new("US-WA", "Washington"),
                Entity::new("US-IL", "Illinois"),
                Entity::new("US-CO", "Colorado"),
                Entity::new("US-AK", "Alaska"),
                Entity::new("US-HI", "Hawaii").with_alt_names(["Hawaiʻi"]),
                Entity::new("US-MA", "Massachusetts"),
                Entity::new("US-AZ", "Arizona"),
                Entity::new("US-LA", "Louisiana"),
            ],
        },
    ]
}
