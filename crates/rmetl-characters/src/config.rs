//! Character pipeline configuration

use std::time::Duration;

/// Runtime configuration for the character pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// API root, with trailing slash
    pub base_url: String,
    /// Endpoint appended to `base_url`
    pub resource: String,
    /// Whole-request timeout per page
    pub timeout: Duration,
    /// Pause after each page request
    pub page_delay: Duration,
    /// Trim names and title-case species before writing
    pub clean: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://rickandmortyapi.com/api/".to_string(),
            resource: "character".to_string(),
            timeout: Duration::from_secs(10),
            page_delay: Duration::from_millis(100),
            clean: false,
        }
    }
}
