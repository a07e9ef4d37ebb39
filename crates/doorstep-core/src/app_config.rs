use crate::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration, loaded once at startup and passed to the
/// geocoding client and picker constructors.
#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub geocode_api_key: String,
    pub geocode_base_url: String,
    pub geocode_timeout_secs: u64,
    pub user_agent: String,
    /// Quiet period after the last keystroke before a forward lookup fires.
    pub debounce_ms: u64,
    /// Forward lookups only fire when the query is longer than this.
    pub min_query_chars: usize,
    pub map_default_zoom: u8,
    pub map_default_center: Coordinate,
    pub auth_delay_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("geocode_api_key", &"[redacted]")
            .field("geocode_base_url", &self.geocode_base_url)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("debounce_ms", &self.debounce_ms)
            .field("min_query_chars", &self.min_query_chars)
            .field("map_default_zoom", &self.map_default_zoom)
            .field("map_default_center", &self.map_default_center)
            .field("auth_delay_ms", &self.auth_delay_ms)
            .finish()
    }
}
