use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Credentials are signed tokens issued on user creation.
    Token,
    /// Credentials are raw user ids.
    Direct,
}

impl FromStr for AuthMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" => Ok(AuthMode::Token),
            "direct" => Ok(AuthMode::Direct),
            _ => Err(()),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Capacity of each connection's outbound buffer.
    pub send_buffer: usize,
    pub auth_mode: AuthMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            send_buffer: 16,
            auth_mode: AuthMode::Token,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", value)?;
        }
        config.database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => warn!("JWT_SECRET not set, using development secret"),
        }
        if let Some(value) = lookup("TOKEN_TTL_HOURS") {
            config.token_ttl_hours = parse("TOKEN_TTL_HOURS", value)?;
        }
        if let Some(value) = lookup("SEND_BUFFER") {
            let send_buffer: usize = parse("SEND_BUFFER", value.clone())?;
            if send_buffer == 0 {
                return Err(ConfigError::Invalid {
                    key: "SEND_BUFFER",
                    value,
                });
            }
            config.send_buffer = send_buffer;
        }
        if let Some(value) = lookup("AUTH_MODE") {
            config.auth_mode = parse("AUTH_MODE", value)?;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
