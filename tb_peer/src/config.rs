//! Simulation configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use tally_bust::{GameSettings, JinxPolicy, MAX_PLAYERS, MIN_PLAYERS};

/// Which bots sit at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMix {
    Cautious,
    Reckless,
    /// Alternates cautious and reckless seats.
    Mixed,
}

impl FromStr for BotMix {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cautious" => Ok(Self::Cautious),
            "reckless" => Ok(Self::Reckless),
            "mixed" => Ok(Self::Mixed),
            other => Err(ConfigError::Invalid {
                var: "TB_BOTS".to_string(),
                reason: format!("unknown bot mix '{other}' (cautious, reckless or mixed)"),
            }),
        }
    }
}

impl fmt::Display for BotMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotMix::Cautious => write!(f, "cautious"),
            BotMix::Reckless => write!(f, "reckless"),
            BotMix::Mixed => write!(f, "mixed"),
        }
    }
}

/// Complete simulation configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of peers in the match
    pub players: usize,
    /// Seed for every peer's generator; OS entropy when unset
    pub seed: Option<u64>,
    /// Stop after this many turn hand-offs even without a winner
    pub max_turns: usize,
    pub bots: BotMix,
    /// Game rules shared by every peer
    pub settings: GameSettings,
}

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub players: Option<usize>,
    pub seed: Option<u64>,
    pub max_turns: Option<usize>,
    pub bots: Option<BotMix>,
    pub settings_file: Option<PathBuf>,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable can't be parsed or the settings file
    /// can't be read
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let settings_file = overrides
            .settings_file
            .or_else(|| std::env::var("TB_SETTINGS_FILE").ok().map(PathBuf::from));
        let mut settings = match settings_file {
            Some(path) => load_settings(&path)?,
            None => GameSettings::default(),
        };

        if let Some(policy) = parse_env::<JinxPolicy>("TB_JINX_POLICY")? {
            settings.jinx_policy = policy;
        }
        if let Some(timeout_ms) = parse_env::<u64>("TB_BARRIER_TIMEOUT_MS")? {
            settings.barrier_timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        }

        let players = match overrides.players {
            Some(players) => players,
            None => parse_env("TB_PLAYERS")?.unwrap_or(MAX_PLAYERS),
        };
        let seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => parse_env("TB_SEED")?,
        };
        let max_turns = match overrides.max_turns {
            Some(max_turns) => max_turns,
            None => parse_env("TB_MAX_TURNS")?.unwrap_or(500),
        };
        let bots = match overrides.bots {
            Some(bots) => bots,
            None => parse_env("TB_BOTS")?.unwrap_or(BotMix::Mixed),
        };

        Ok(SimConfig {
            players,
            seed,
            max_turns,
            bots,
            settings,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending variable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players) {
            return Err(ConfigError::Invalid {
                var: "TB_PLAYERS".to_string(),
                reason: format!("Must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
            });
        }

        if self.max_turns == 0 {
            return Err(ConfigError::Invalid {
                var: "TB_MAX_TURNS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.settings
            .validate()
            .map_err(|err| ConfigError::Invalid {
                var: "TB_SETTINGS_FILE".to_string(),
                reason: err.to_string(),
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Failed to read settings file {}: {reason}", path.display())]
    SettingsFile { path: PathBuf, reason: String },
}

fn load_settings(path: &Path) -> Result<GameSettings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::SettingsFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| ConfigError::SettingsFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// `Ok(None)` when `key` is unset, an error when it's set but unparsable.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|err: T::Err| {
            ConfigError::Invalid {
                var: key.to_string(),
                reason: err.to_string(),
            }
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "TB_PLAYERS",
        "TB_SEED",
        "TB_MAX_TURNS",
        "TB_BOTS",
        "TB_BARRIER_TIMEOUT_MS",
        "TB_JINX_POLICY",
        "TB_SETTINGS_FILE",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = SimConfig::from_env(Overrides::default()).unwrap();
        assert_eq!(config.players, 4);
        assert_eq!(config.seed, None);
        assert_eq!(config.max_turns, 500);
        assert_eq!(config.bots, BotMix::Mixed);
        assert_eq!(config.settings, GameSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_values() {
        clear_env();
        set_env("TB_PLAYERS", "3");
        set_env("TB_SEED", "42");
        set_env("TB_JINX_POLICY", "Replenish");
        set_env("TB_BARRIER_TIMEOUT_MS", "250");
        let config = SimConfig::from_env(Overrides::default()).unwrap();
        clear_env();

        assert_eq!(config.players, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.settings.jinx_policy, JinxPolicy::Replenish);
        assert_eq!(config.settings.barrier_timeout_ms, Some(250));
    }

    #[test]
    #[serial]
    fn test_overrides_win() {
        clear_env();
        set_env("TB_PLAYERS", "3");
        let config = SimConfig::from_env(Overrides {
            players: Some(2),
            bots: Some(BotMix::Reckless),
            ..Overrides::default()
        })
        .unwrap();
        clear_env();

        assert_eq!(config.players, 2);
        assert_eq!(config.bots, BotMix::Reckless);
    }

    #[test]
    #[serial]
    fn test_unparsable_value_rejected() {
        clear_env();
        set_env("TB_SEED", "forty-two");
        let err = SimConfig::from_env(Overrides::default()).unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TB_SEED"));
    }

    #[test]
    #[serial]
    fn test_settings_file() {
        clear_env();
        let path = std::env::temp_dir().join(format!("tb_settings_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "max_tally": 30, "jinx_policy": "replenish" }"#).unwrap();
        set_env("TB_SETTINGS_FILE", path.to_str().unwrap());
        let config = SimConfig::from_env(Overrides::default()).unwrap();
        clear_env();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.settings.max_tally, 30);
        assert_eq!(config.settings.jinx_policy, JinxPolicy::Replenish);
        assert_eq!(config.settings.min_limit, 10);
    }

    #[test]
    #[serial]
    fn test_missing_settings_file() {
        clear_env();
        let err = SimConfig::from_env(Overrides {
            settings_file: Some(PathBuf::from("/nonexistent/tb.json")),
            ..Overrides::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::SettingsFile { .. }));
    }

    #[test]
    fn test_validation_player_count() {
        let config = SimConfig {
            players: 5,
            seed: None,
            max_turns: 10,
            bots: BotMix::Cautious,
            settings: GameSettings::default(),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TB_PLAYERS"));
    }

    #[test]
    fn test_validation_settings() {
        let config = SimConfig {
            players: 2,
            seed: None,
            max_turns: 10,
            bots: BotMix::Cautious,
            settings: GameSettings {
                min_limit: 50,
                ..GameSettings::default()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "TB_PLAYERS".to_string(),
            reason: "Must be between 2 and 4".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TB_PLAYERS"));
        assert!(msg.contains("between 2 and 4"));
    }
}
