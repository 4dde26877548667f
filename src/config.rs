/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Milliseconds between engine ticks (one tick = one timer second)
    pub tick_interval_ms: u64,
    /// Port for the Prometheus metrics endpoint
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            metrics_port: 9090,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("TICK_INTERVAL_MS") {
            if let Ok(parsed) = interval.parse::<u64>() {
                if (50..=60_000).contains(&parsed) {
                    config.tick_interval_ms = parsed;
                } else {
                    tracing::warn!("TICK_INTERVAL_MS must be 50-60000, using default");
                }
            } else {
                tracing::warn!("Invalid TICK_INTERVAL_MS '{}', using default", interval);
            }
        }

        if let Ok(port) = std::env::var("METRICS_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.metrics_port = parsed;
                } else {
                    tracing::warn!("METRICS_PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid METRICS_PORT '{}', using default", port);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms cannot be 0".to_string());
        }
        if self.metrics_port == 0 {
            return Err("metrics_port cannot be 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ServerConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
