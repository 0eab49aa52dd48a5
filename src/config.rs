use std::env;

/// Configuration loaded from environment variables
pub struct Config {
    pub fc_topic: String,
    pub eph_topic: String,
    pub error_topic: String,
    pub database_path: String,
    pub rust_log: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every key has a default so the processor can run unconfigured against
    /// a local database; deployments override the topic names per channel.
    pub fn from_env() -> Self {
        let fc_topic = env::var("FC_TOPIC").unwrap_or_else(|_| "nil-fc-dispatcher".to_string());
        let eph_topic = env::var("EPH_TOPIC").unwrap_or_else(|_| "nil-eph-dispatcher".to_string());
        let error_topic = env::var("ERROR_TOPIC").unwrap_or_else(|_| "nil-error".to_string());
        let database_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "camt59.db".to_string());
        let rust_log = env::var("RUST_LOG").ok();

        Self {
            fc_topic,
            eph_topic,
            error_topic,
            database_path,
            rust_log,
        }
    }
}
