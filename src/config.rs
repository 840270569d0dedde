//! Runtime configuration
//!
//! Read from environment variables:
//! - `PORT`: listening port (default 8080)
//! - `CHAT_CODES`: comma-separated accepted room codes (default `123456`)
//! - `BCRYPT_COST`: password hash cost factor (default 10)

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;

use crate::types::RoomCode;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CHAT_CODE: &str = "123456";
pub const DEFAULT_HASH_COST: u32 = 10;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("CHAT_CODES must name at least one room code")]
    NoChatCodes,
}

/// Hub settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub chat_codes: Vec<RoomCode>,
    pub hash_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chat_codes: vec![RoomCode::from(DEFAULT_CHAT_CODE)],
            hash_cost: DEFAULT_HASH_COST,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("PORT") {
            config.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?;
        }

        if let Some(value) = lookup("CHAT_CODES") {
            config.chat_codes = value
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(RoomCode::from)
                .collect();
            if config.chat_codes.is_empty() {
                return Err(ConfigError::NoChatCodes);
            }
        }

        if let Some(value) = lookup("BCRYPT_COST") {
            config.hash_cost = value
                .trim()
                .parse()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::Invalid {
                    name: "BCRYPT_COST",
                    value,
                })?;
        }

        Ok(config)
    }

    /// Address to bind: all interfaces on the configured port
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
