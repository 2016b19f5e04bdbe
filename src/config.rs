use std::env;
use std::net::IpAddr;

/// Name used as the target of the request log.
pub const LOGGER_NAME: &str = "snow-api";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: IpAddr,
    pub db_path: String,
    pub max_photo_bytes: u64,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            port: env::var("SNOW_API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            host: env::var("SNOW_API_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string())
                .parse()?,
            db_path: env::var("SNOW_API_DB_PATH").unwrap_or_else(|_| "./data.db".to_string()),
            max_photo_bytes: env::var("SNOW_API_MAX_PHOTO_BYTES")
                .unwrap_or_else(|_| (16 * 1024 * 1024).to_string())
                .parse()?,
            max_connections: env::var("SNOW_API_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
        })
    }
}
