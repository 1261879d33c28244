use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::services::room::RoomSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Server settings read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub allowed_origin: String,
    pub room_idle: Duration,
    pub session_buffer: usize,
    /// Display name that always receives draft order 2 when present.
    pub pinned_second_pick: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/draft.db".into(),
            server_address: "0.0.0.0:3000".into(),
            allowed_origin: "http://localhost:5173".into(),
            room_idle: Duration::from_secs(600),
            session_buffer: 256,
            pinned_second_pick: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset or empty values take the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let room_idle = match get("ROOM_IDLE_SECS") {
            Some(value) => Duration::from_secs(positive("ROOM_IDLE_SECS", value)?),
            None => defaults.room_idle,
        };
        let session_buffer = match get("SESSION_BUFFER") {
            Some(value) => positive("SESSION_BUFFER", value)? as usize,
            None => defaults.session_buffer,
        };

        Ok(Config {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            server_address: get("SERVER_ADDRESS").unwrap_or(defaults.server_address),
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            room_idle,
            session_buffer,
            pinned_second_pick: get("PINNED_SECOND_PICK"),
        })
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            idle_timeout: self.room_idle,
            session_buffer: self.session_buffer,
        }
    }
}

fn positive(name: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite://./data/draft.db");
        assert_eq!(config.server_address, "0.0.0.0:3000");
        assert_eq!(config.room_idle, Duration::from_secs(600));
        assert_eq!(config.session_buffer, 256);
        assert!(config.pinned_second_pick.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = from_pairs(&[
            ("ROOM_IDLE_SECS", "30"),
            ("SESSION_BUFFER", "8"),
            ("PINNED_SECOND_PICK", "kak"),
            ("ALLOWED_ORIGIN", "https://draft.example"),
        ])
        .unwrap();
        assert_eq!(config.room_idle, Duration::from_secs(30));
        assert_eq!(config.room_settings().session_buffer, 8);
        assert_eq!(config.pinned_second_pick.as_deref(), Some("kak"));
        assert_eq!(config.allowed_origin, "https://draft.example");
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = from_pairs(&[("SESSION_BUFFER", "lots")]).unwrap_err();
        assert!(err.to_string().contains("SESSION_BUFFER"));
        assert!(from_pairs(&[("ROOM_IDLE_SECS", "0")]).is_err());
    }
}
