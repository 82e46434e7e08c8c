use config::ConfigError;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::models::category::{Category, Difficulty};
use crate::services::round_engine::{GameSettings, GameTimings};
use crate::services::scoring::PointTable;
use crate::services::session_service::RetentionPolicy;
use crate::utils::retry::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
    pub retry_attempts: usize,
    pub retry_backoff_ms: u64,
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub number_of_rounds: u32,
    pub max_rounds: u32,
    pub points: PointTable,
    pub timings: GameTimings,
    pub retention: RetentionPolicy,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// `username:password` for the /metrics endpoint
    pub metrics_auth: String,
    pub ai: AiConfig,
    pub game: GameConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            metrics_auth: "admin:changeme".to_string(),
            ai: AiConfig {
                endpoint: "http://localhost:8000".to_string(),
                timeout_ms: 15_000,
                retry_attempts: 3,
                retry_backoff_ms: 200,
            },
            game: GameConfig {
                difficulty: Difficulty::default(),
                number_of_rounds: 5,
                max_rounds: 20,
                points: PointTable::default(),
                timings: GameTimings::default(),
                retention: RetentionPolicy::default(),
            },
            telemetry: TelemetryConfig {
                otlp_endpoint: None,
                log_format: LogFormat::Pretty,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings)
    }

    /// Resolves every key against `settings`, then plain env fallbacks, then defaults
    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_addr = string_or(settings, "server.bind_addr", Some("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);
        let metrics_auth = string_or(settings, "metrics.auth", Some("METRICS_AUTH"))
            .unwrap_or(defaults.metrics_auth);

        let ai = AiConfig {
            endpoint: string_or(settings, "ai.endpoint", Some("AI_ENDPOINT"))
                .unwrap_or(defaults.ai.endpoint),
            timeout_ms: parsed_or(settings, "ai.timeout_ms", defaults.ai.timeout_ms)?,
            retry_attempts: parsed_or(settings, "ai.retry_attempts", defaults.ai.retry_attempts)?,
            retry_backoff_ms: parsed_or(
                settings,
                "ai.retry_backoff_ms",
                defaults.ai.retry_backoff_ms,
            )?,
        };
        if ai.timeout_ms == 0 {
            return Err(invalid("ai.timeout_ms", "must be greater than zero"));
        }
        if ai.retry_attempts == 0 {
            return Err(invalid("ai.retry_attempts", "must be at least 1"));
        }

        let mut points = defaults.game.points.clone();
        for category in Category::ALL {
            let key = format!("scoring.points.{}", category.key().to_ascii_lowercase());
            if let Some(raw) = string_or(settings, &key, None) {
                let base = parse_value::<u32>(&key, &raw)?;
                points.set(category, base).map_err(|e| invalid(&key, e))?;
            }
        }

        let timings = GameTimings {
            bonus_decline: millis_or(
                settings,
                "game.bonus_decline_delay_ms",
                defaults.game.timings.bonus_decline,
            )?,
            round_exhausted: millis_or(
                settings,
                "game.round_exhausted_delay_ms",
                defaults.game.timings.round_exhausted,
            )?,
            incorrect_answer: millis_or(
                settings,
                "game.incorrect_answer_delay_ms",
                defaults.game.timings.incorrect_answer,
            )?,
            celebration: millis_or(
                settings,
                "game.celebration_ms",
                defaults.game.timings.celebration,
            )?,
        };

        let retention = RetentionPolicy {
            idle_timeout: secs_or(
                settings,
                "game.idle_timeout_secs",
                defaults.game.retention.idle_timeout,
            )?,
            completed_grace: secs_or(
                settings,
                "game.completed_grace_secs",
                defaults.game.retention.completed_grace,
            )?,
            sweep_interval: secs_or(
                settings,
                "game.sweep_interval_secs",
                defaults.game.retention.sweep_interval,
            )?,
        };
        if retention.sweep_interval.is_zero() {
            return Err(invalid("game.sweep_interval_secs", "must be at least 1"));
        }

        let game = GameConfig {
            difficulty: parsed_or(settings, "game.difficulty", defaults.game.difficulty)?,
            number_of_rounds: parsed_or(
                settings,
                "game.number_of_rounds",
                defaults.game.number_of_rounds,
            )?,
            max_rounds: parsed_or(settings, "game.max_rounds", defaults.game.max_rounds)?,
            points,
            timings,
            retention,
        };
        if game.max_rounds == 0 {
            return Err(invalid("game.max_rounds", "must be at least 1"));
        }
        if game.number_of_rounds == 0 || game.number_of_rounds > game.max_rounds {
            return Err(invalid(
                "game.number_of_rounds",
                format!("must be between 1 and {}", game.max_rounds),
            ));
        }

        let telemetry = TelemetryConfig {
            otlp_endpoint: string_or(
                settings,
                "telemetry.otlp_endpoint",
                Some("OTEL_EXPORTER_OTLP_ENDPOINT"),
            )
            .filter(|endpoint| !endpoint.trim().is_empty()),
            log_format: parsed_or(settings, "telemetry.log_format", defaults.telemetry.log_format)?,
        };

        Ok(Config {
            bind_addr,
            metrics_auth,
            ai,
            game,
            telemetry,
        })
    }

    /// Settings for a new game, applying per-game overrides
    pub fn game_settings(
        &self,
        difficulty: Option<Difficulty>,
        number_of_rounds: Option<u32>,
    ) -> GameSettings {
        GameSettings {
            difficulty: difficulty.unwrap_or(self.game.difficulty),
            number_of_rounds: number_of_rounds.unwrap_or(self.game.number_of_rounds),
            points: self.game.points.clone(),
            timings: self.game.timings,
        }
    }
}

fn string_or(settings: &config::Config, key: &str, env_key: Option<&str>) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .or_else(|| env_key.and_then(|name| env::var(name).ok()))
}

fn parsed_or<T>(settings: &config::Config, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match settings.get_string(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(ConfigError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

fn millis_or(
    settings: &config::Config,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms = parsed_or(settings, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

fn secs_or(
    settings: &config::Config,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = parsed_or(settings, key, default.as_secs())?;
    Ok(Duration::from_secs(secs))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| invalid(key, e))
}

fn invalid(key: &str, reason: impl Display) -> ConfigError {
    ConfigError::Message(format!("invalid value for {}: {}", key, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn settings_from(pairs: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    #[serial]
    fn defaults_apply_when_nothing_is_set() {
        env::remove_var("AI_ENDPOINT");
        env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT");

        let config = Config::from_settings(&settings_from(&[])).unwrap();

        assert_eq!(config.game.number_of_rounds, 5);
        assert_eq!(config.game.difficulty, Difficulty::Medium);
        assert_eq!(config.ai.endpoint, "http://localhost:8000");
        assert_eq!(config.game.points.base_points(Category::Quote), 6);
        assert!(config.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn overrides_points_rounds_and_delays() {
        let config = Config::from_settings(&settings_from(&[
            ("scoring.points.quote", "1"),
            ("game.number_of_rounds", "3"),
            ("game.difficulty", "hard"),
            ("game.incorrect_answer_delay_ms", "250"),
            ("telemetry.log_format", "json"),
            ("game.completed_grace_secs", "30"),
        ]))
        .unwrap();

        assert_eq!(config.game.points.base_points(Category::Quote), 1);
        assert_eq!(config.game.number_of_rounds, 3);
        assert_eq!(config.game.difficulty, Difficulty::Hard);
        assert_eq!(
            config.game.timings.incorrect_answer,
            Duration::from_millis(250)
        );
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(
            config.game.retention.completed_grace,
            Duration::from_secs(30)
        );
        assert_eq!(
            config.game.retention.idle_timeout,
            RetentionPolicy::default().idle_timeout
        );
    }

    #[test]
    #[serial]
    fn plain_env_fallback_is_used() {
        env::set_var("AI_ENDPOINT", "http://ai.internal:9000");
        let config = Config::from_settings(&settings_from(&[])).unwrap();
        env::remove_var("AI_ENDPOINT");

        assert_eq!(config.ai.endpoint, "http://ai.internal:9000");
    }

    #[test]
    #[serial]
    fn invalid_values_are_config_errors() {
        let out_of_range = Config::from_settings(&settings_from(&[("scoring.points.song", "9")]));
        assert!(matches!(out_of_range, Err(ConfigError::Message(_))));

        let too_many_rounds = Config::from_settings(&settings_from(&[
            ("game.number_of_rounds", "30"),
            ("game.max_rounds", "10"),
        ]));
        assert!(matches!(too_many_rounds, Err(ConfigError::Message(_))));

        let not_a_number = Config::from_settings(&settings_from(&[("ai.timeout_ms", "soon")]));
        assert!(matches!(not_a_number, Err(ConfigError::Message(_))));

        let no_sweep = Config::from_settings(&settings_from(&[("game.sweep_interval_secs", "0")]));
        assert!(matches!(no_sweep, Err(ConfigError::Message(_))));
    }

    #[test]
    fn game_settings_apply_overrides() {
        let config = Config::default();
        let settings = config.game_settings(Some(Difficulty::Easy), Some(2));
        assert_eq!(settings.difficulty, Difficulty::Easy);
        assert_eq!(settings.number_of_rounds, 2);

        let settings = config.game_settings(None, None);
        assert_eq!(settings.number_of_rounds, config.game.number_of_rounds);
    }
}
