use crm_worker::config::DispatcherConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// the JWT secret. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Externally reachable base URL, used to build tracking links.
    pub public_base_url: String,
    /// Shared secret expected in `x-internal-token` on `/internal/*`.
    /// When unset, every internal call is rejected.
    pub internal_service_token: Option<String>,
    /// Run the import dispatcher inside the API process.
    pub import_worker_inline: bool,
    /// Draw random delivery failures for simulated email sends.
    pub simulate_delivery_failures: bool,
    /// Import queue settings for the inline dispatcher.
    pub dispatcher: DispatcherConfig,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `PUBLIC_BASE_URL`            | `http://localhost:3000`    |
    /// | `INTERNAL_SERVICE_TOKEN`     | unset                      |
    /// | `IMPORT_WORKER_INLINE`       | `true`                     |
    /// | `SIMULATE_DELIVERY_FAILURES` | `true`                     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let internal_service_token = std::env::var("INTERNAL_SERVICE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let import_worker_inline: bool = std::env::var("IMPORT_WORKER_INLINE")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("IMPORT_WORKER_INLINE must be true or false");

        let simulate_delivery_failures: bool = std::env::var("SIMULATE_DELIVERY_FAILURES")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("SIMULATE_DELIVERY_FAILURES must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url,
            internal_service_token,
            import_worker_inline,
            simulate_delivery_failures,
            dispatcher: DispatcherConfig::from_env(),
            jwt: JwtConfig::from_env(),
        }
    }
}
