use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI provider
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    // Remote rendering service
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // HTTP surface
    pub bind_host: String,
    pub bind_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            browserless_url: required_env("BROWSERLESS_URL"),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            bind_port: env::var("BIND_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("BIND_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
