//! CLI configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use league_engine::ranking::PointsTable;
use league_engine::tournament::{TournamentFormat, TournamentStructure};

/// Largest demo tournament the CLI will build
const MAX_TEAMS: usize = 128;

/// Complete CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Number of demo teams
    pub teams: usize,
    /// Tournament format
    pub format: TournamentFormat,
    /// Legs per pairing in round-robin formats
    pub legs: u8,
    /// Fixed RNG seed, random when absent
    pub seed: Option<u64>,
    /// Whether level scores stand as draws
    pub allow_draws: bool,
    /// Whether to play out the tournament with random scores
    pub simulate: bool,
    /// Fallback points table
    pub points: PointsTable,
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub teams: Option<usize>,
    pub format: Option<String>,
    pub legs: Option<u8>,
    pub seed: Option<u64>,
    pub simulate: bool,
}

impl CliConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if `LEAGUE_FORMAT` or `LEAGUE_SEED` cannot be parsed
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let format = match overrides.format.or_else(|| std::env::var("LEAGUE_FORMAT").ok()) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "LEAGUE_FORMAT".to_string(),
                reason,
            })?,
            None => TournamentFormat::League,
        };

        let seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => match std::env::var("LEAGUE_SEED") {
                Ok(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "LEAGUE_SEED".to_string(),
                    reason: format!("'{raw}' is not an unsigned integer"),
                })?),
                Err(_) => None,
            },
        };

        // Cups never end level
        let default_draws = format != TournamentFormat::Cup;
        let defaults = PointsTable::default();
        let points = PointsTable {
            win: parse_env_or("POINTS_WIN", defaults.win),
            draw: parse_env_or("POINTS_DRAW", defaults.draw),
            loss: parse_env_or("POINTS_LOSS", defaults.loss),
            ..defaults
        };

        Ok(CliConfig {
            teams: overrides
                .teams
                .unwrap_or_else(|| parse_env_or("LEAGUE_TEAMS", 8)),
            format,
            legs: overrides.legs.unwrap_or_else(|| parse_env_or("LEAGUE_LEGS", 2)),
            seed,
            allow_draws: parse_env_or("LEAGUE_ALLOW_DRAWS", default_draws),
            simulate: overrides.simulate || parse_env_or("LEAGUE_SIMULATE", false),
            points,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teams < 2 {
            return Err(ConfigError::Invalid {
                var: "LEAGUE_TEAMS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.teams > MAX_TEAMS {
            return Err(ConfigError::Invalid {
                var: "LEAGUE_TEAMS".to_string(),
                reason: format!("Must be at most {MAX_TEAMS}"),
            });
        }

        if !matches!(self.legs, 1 | 2) {
            return Err(ConfigError::Invalid {
                var: "LEAGUE_LEGS".to_string(),
                reason: "Must be 1 or 2".to_string(),
            });
        }

        if self.format == TournamentFormat::Cup && self.allow_draws {
            return Err(ConfigError::Invalid {
                var: "LEAGUE_ALLOW_DRAWS".to_string(),
                reason: "Cup matches always need a winner".to_string(),
            });
        }

        if self.points.win < self.points.draw || self.points.draw < self.points.loss {
            return Err(ConfigError::Invalid {
                var: "POINTS_WIN".to_string(),
                reason: format!(
                    "Expected win >= draw >= loss, got {}/{}/{}",
                    self.points.win, self.points.draw, self.points.loss
                ),
            });
        }

        Ok(())
    }

    /// Tournament structure described by this configuration
    pub fn structure(&self) -> TournamentStructure {
        let mut structure = if self.format == TournamentFormat::Cup {
            TournamentStructure::cup("Cup")
        } else {
            let mut league = TournamentStructure::league("League").with_legs(self.legs);
            league.format = self.format;
            league
        };
        structure.allow_draws = self.allow_draws;
        structure.points = self.points;
        structure
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
