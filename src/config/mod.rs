use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub engine: EngineSettings,
    /// Key under which this user's snapshot is stored.
    pub user_id: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Tunables for the reflection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reflections per rolling week that count as 100% progress.
    pub weekly_goal: u32,
    /// Maximum number of insights retained, newest first.
    pub insight_capacity: usize,
    /// Default for new stores: invoke the escalation hook on crisis content.
    pub auto_escalate_crisis: bool,
    /// Average mood below which a declining trend is reported as a crisis.
    pub crisis_mood_threshold: f64,
    /// Look-back window for the mood trend split.
    pub mood_trend_window_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weekly_goal: 7,
            insight_capacity: 20,
            auto_escalate_crisis: true,
            crisis_mood_threshold: 2.5,
            mood_trend_window_days: 30,
        }
    }
}

/// Longest accepted mood-trend window (ten years).
pub const MAX_MOOD_TREND_WINDOW_DAYS: i64 = 3650;

impl EngineSettings {
    /// Reject settings that would make the derived statistics meaningless.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.weekly_goal == 0 {
            return Err(AppError::Config {
                message: "WEEKLY_REFLECTION_GOAL must be greater than zero".to_string(),
            });
        }
        if self.insight_capacity == 0 {
            return Err(AppError::Config {
                message: "INSIGHT_CAPACITY must be greater than zero".to_string(),
            });
        }
        if self.mood_trend_window_days <= 0
            || self.mood_trend_window_days > MAX_MOOD_TREND_WINDOW_DAYS
        {
            return Err(AppError::Config {
                message: format!(
                    "MOOD_TREND_WINDOW_DAYS must be between 1 and {}",
                    MAX_MOOD_TREND_WINDOW_DAYS
                ),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/reflections.db".to_string()),
            ),
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let defaults = EngineSettings::default();
        let engine = EngineSettings {
            weekly_goal: parse_env("WEEKLY_REFLECTION_GOAL").unwrap_or(defaults.weekly_goal),
            insight_capacity: parse_env("INSIGHT_CAPACITY").unwrap_or(defaults.insight_capacity),
            auto_escalate_crisis: parse_env("AUTO_ESCALATE_CRISIS")
                .unwrap_or(defaults.auto_escalate_crisis),
            crisis_mood_threshold: parse_env("CRISIS_MOOD_THRESHOLD")
                .unwrap_or(defaults.crisis_mood_threshold),
            mood_trend_window_days: parse_env("MOOD_TREND_WINDOW_DAYS")
                .unwrap_or(defaults.mood_trend_window_days),
        };
        engine.validate()?;

        let user_id = env::var("REFLECTION_USER_ID").unwrap_or_else(|_| "local".to_string());
        if user_id.trim().is_empty() {
            return Err(AppError::Config {
                message: "REFLECTION_USER_ID cannot be empty".to_string(),
            });
        }

        Ok(Config {
            database,
            logging,
            engine,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_settings_are_valid() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.weekly_goal, 7);
        assert_eq!(settings.insight_capacity, 20);
        assert!(settings.auto_escalate_crisis);
    }

    #[test]
    fn test_zero_weekly_goal_rejected() {
        let settings = EngineSettings {
            weekly_goal: 0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("WEEKLY_REFLECTION_GOAL"));
    }

    #[test]
    fn test_zero_insight_capacity_rejected() {
        let settings = EngineSettings {
            insight_capacity: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_mood_trend_window_bounds() {
        let too_long = EngineSettings {
            mood_trend_window_days: 1_000_000_000_000,
            ..Default::default()
        };
        let err = too_long.validate().unwrap_err();
        assert!(err.to_string().contains("MOOD_TREND_WINDOW_DAYS"));

        let zero = EngineSettings {
            mood_trend_window_days: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let max = EngineSettings {
            mood_trend_window_days: MAX_MOOD_TREND_WINDOW_DAYS,
            ..Default::default()
        };
        assert!(max.validate().is_ok());
    }
}
