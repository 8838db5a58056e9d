use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

// Top-level configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub render: RenderConfig,
    pub tickets: TicketConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

// Template and output locations for printable tickets
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub batch_output_dir: PathBuf,
    pub render_on_reserve: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    /// Total ticket numbers drawn per insert before giving up, the first draw included.
    pub number_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let output_dir = PathBuf::from(required("TICKET_OUTPUT_DIR")?);
        let batch_output_dir = env::var("TICKET_BATCH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| output_dir.join("batches"));

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8000)?,
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "seat_ticketing=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed("DB_POOL_SIZE", 20)?,
                acquire_timeout_secs: parsed("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            },
            render: RenderConfig {
                template_path: PathBuf::from(required("TICKET_TEMPLATE_PATH")?),
                output_dir,
                batch_output_dir,
                render_on_reserve: parsed("RENDER_ON_RESERVE", true)?,
            },
            tickets: TicketConfig {
                number_attempts: parsed("TICKET_NUMBER_ATTEMPTS", 3)?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; each test uses its own variable names.

    #[test]
    fn parsed_falls_back_to_default_when_unset() {
        let value: u32 = parsed("SEAT_TICKETING_TEST_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parsed_rejects_garbage() {
        env::set_var("SEAT_TICKETING_TEST_BAD_NUMBER", "twenty");
        let err = parsed::<u32>("SEAT_TICKETING_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SEAT_TICKETING_TEST_BAD_NUMBER", .. }));
    }

    #[test]
    fn parsed_reads_booleans() {
        env::set_var("SEAT_TICKETING_TEST_FLAG", "false");
        assert!(!parsed("SEAT_TICKETING_TEST_FLAG", true).unwrap());
    }

    #[test]
    fn ticket_number_attempts_come_from_the_environment() {
        env::set_var("DATABASE_URL", "postgres://localhost/tickets");
        env::set_var("TICKET_TEMPLATE_PATH", "template.pdf");
        env::set_var("TICKET_OUTPUT_DIR", "out");
        env::set_var("TICKET_NUMBER_ATTEMPTS", "5");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tickets.number_attempts, 5);
    }

    #[test]
    fn required_reports_the_missing_name() {
        let err = required("SEAT_TICKETING_TEST_MISSING").unwrap_err();
        assert_eq!(err.to_string(), "SEAT_TICKETING_TEST_MISSING must be set");
    }
}
