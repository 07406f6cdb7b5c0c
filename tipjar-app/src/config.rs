//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Raw admin bearer token for the back-office endpoints.
    pub admin_token: String,
    pub iamport_api_key: String,
    pub iamport_api_secret: String,
    /// HMAC secret for signup link tokens.
    pub link_token_secret: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        Ok(Self {
            port,
            database_url: required("DATABASE_URL")?,
            admin_token: required("ADMIN_TOKEN")?,
            iamport_api_key: required("IAMPORT_API_KEY")?,
            iamport_api_secret: required("IAMPORT_API_SECRET")?,
            link_token_secret: required("LINK_TOKEN_SECRET")?,
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}
