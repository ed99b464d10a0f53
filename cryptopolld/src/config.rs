use rocket::config::LogLevel;
use std::env::var;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cryptopolld: CRYPTOPOLL_PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("cryptopolld: CRYPTOPOLL_ADDRESS must be an IP address, got {0:?}")]
    InvalidAddress(String),

    #[error("cryptopolld: CRYPTOPOLL_LOG_LEVEL must be one of off, critical, normal, debug, got {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,

    /// Where the sled database lives. Polls are kept in memory when unset.
    pub db_path: Option<PathBuf>,

    pub log_level: LogLevel,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let port = match lookup("CRYPTOPOLL_PORT") {
            Some(val) => val.parse().map_err(|_| ConfigError::InvalidPort(val))?,
            None => DEFAULT_PORT,
        };

        let address = match lookup("CRYPTOPOLL_ADDRESS") {
            Some(val) => val.parse().map_err(|_| ConfigError::InvalidAddress(val))?,
            None => Ipv4Addr::LOCALHOST.into(),
        };

        let db_path = lookup("CRYPTOPOLL_DB_PATH")
            .filter(|val| !val.is_empty())
            .map(PathBuf::from);

        let log_level = match lookup("CRYPTOPOLL_LOG_LEVEL").as_deref() {
            None | Some("normal") => LogLevel::Normal,
            Some("off") => LogLevel::Off,
            Some("critical") => LogLevel::Critical,
            Some("debug") => LogLevel::Debug,
            Some(other) => return Err(ConfigError::InvalidLogLevel(other.to_owned())),
        };

        Ok(Config {
            address,
            port,
            db_path,
            log_level,
        })
    }

    /// The rocket configuration for this daemon
    pub fn rocket(&self) -> rocket::Config {
        rocket::Config {
            address: self.address,
            port: self.port,
            log_level: self.log_level,
            ..rocket::Config::default()
        }
    }
}
