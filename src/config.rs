use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Base URL shared invoice links are rendered against.
    pub public_base_url: String,
    /// Days until a freshly minted shared link expires; None = never.
    pub shared_link_ttl_days: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let shared_link_ttl_days = match std::env::var("SHARED_LINK_TTL_DAYS") {
            Ok(raw) => Some(raw.parse::<i64>().map_err(|_| {
                config::ConfigError::Message(format!("SHARED_LINK_TTL_DAYS is not a number: {}", raw))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/payroll".to_string()),
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            shared_link_ttl_days,
        })
    }
}
