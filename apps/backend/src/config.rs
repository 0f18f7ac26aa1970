//! Process configuration read from the environment

use std::time::Duration;

/// Server settings. Values come from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often timed players are ticked.
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Read `HOST` and `PORT`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = match std::env::var("PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host,
            port,
            tick_interval: defaults.tick_interval,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addr() {
        assert_eq!(ServerConfig::default().addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_default_tick_is_one_second() {
        assert_eq!(ServerConfig::default().tick_interval, Duration::from_secs(1));
    }
}
