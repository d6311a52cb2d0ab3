use std::time::Duration;

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL (default: `http://localhost:8000/api`).
    pub gateway_url: String,
    /// Provider credential forwarded with every call.
    pub api_key: String,
    /// Batch status poll cadence in milliseconds (default: `2000`).
    pub poll_interval: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var            | Default                     |
    /// |--------------------|-----------------------------|
    /// | `GATEWAY_URL`      | `http://localhost:8000/api` |
    /// | `PROVIDER_API_KEY` | (required)                  |
    /// | `POLL_INTERVAL_MS` | `2000`                      |
    pub fn from_env() -> Self {
        let gateway_url = std::env::var("GATEWAY_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".into());

        let api_key = std::env::var("PROVIDER_API_KEY").expect("PROVIDER_API_KEY must be set");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        Self {
            gateway_url,
            api_key,
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}
