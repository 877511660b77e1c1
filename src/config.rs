use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub reporting: ReportingConfig,
    pub browser: BrowserConfig,
}

/// Cadences and page-shape knobs for the watcher stack. The defaults match
/// the storefront's render behavior; tests shrink them to keep paused-clock
/// runs tight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// URL the browser session opens on.
    pub start_url: String,
    /// Route poll period, milliseconds.
    pub route_poll_ms: u64,
    /// Listing-grid rescan period, milliseconds. One second tolerates
    /// infinite-scroll content that loads while the user scrolls.
    pub grid_tick_ms: u64,
    /// Cart rescan period, milliseconds.
    pub cart_tick_ms: u64,
    /// Poll period while waiting for an element to appear, milliseconds.
    pub element_poll_ms: u64,
    /// How long to wait for a detail page's price element, milliseconds.
    pub element_wait_ms: u64,
    /// Forced session refresh period, hours. Blunt mitigation for pages
    /// left open long enough to leak.
    pub session_refresh_hours: u64,
    /// Suffix the storefront appends to document titles.
    pub title_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Collection endpoint for report batches.
    pub endpoint: String,
    /// Request timeout, seconds.
    pub request_timeout: u64,
    /// Initial value for the reporting opt-in preference.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub headless: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            start_url: "https://www.walmart.com/".to_string(),
            route_poll_ms: 500,
            grid_tick_ms: 1_000,
            cart_tick_ms: 2_500,
            element_poll_ms: 333,
            element_wait_ms: 10_000,
            session_refresh_hours: 24,
            title_suffix: " - Walmart.com".to_string(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/reports".to_string(),
            request_timeout: 30,
            enabled: true,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            headless: true,
        }
    }
}

impl WatchConfig {
    pub fn route_poll(&self) -> Duration {
        Duration::from_millis(self.route_poll_ms)
    }

    pub fn grid_tick(&self) -> Duration {
        Duration::from_millis(self.grid_tick_ms)
    }

    pub fn cart_tick(&self) -> Duration {
        Duration::from_millis(self.cart_tick_ms)
    }

    pub fn element_poll(&self) -> Duration {
        Duration::from_millis(self.element_poll_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn session_refresh(&self) -> Duration {
        Duration::from_secs(self.session_refresh_hours * 3_600)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "AISLE_"
            .add_source(Environment::with_prefix("AISLE").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.route_poll_ms == 0 {
            return Err(ConfigError::Message(
                "watch.route_poll_ms must be greater than 0".into(),
            ));
        }

        if self.watch.grid_tick_ms == 0 || self.watch.cart_tick_ms == 0 {
            return Err(ConfigError::Message(
                "watcher tick periods must be greater than 0".into(),
            ));
        }

        if self.watch.element_poll_ms == 0 || self.watch.element_wait_ms == 0 {
            return Err(ConfigError::Message(
                "element wait periods must be greater than 0".into(),
            ));
        }

        if self.watch.session_refresh_hours == 0 {
            return Err(ConfigError::Message(
                "watch.session_refresh_hours must be greater than 0".into(),
            ));
        }

        if Url::parse(&self.watch.start_url).is_err() {
            return Err(ConfigError::Message("Invalid start URL format".into()));
        }

        if Url::parse(&self.reporting.endpoint).is_err() {
            return Err(ConfigError::Message(
                "Invalid reporting endpoint format".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_poll_rejected() {
        let mut config = AppConfig::default();
        config.watch.route_poll_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut config = AppConfig::default();
        config.reporting.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_cadences() {
        let watch = WatchConfig::default();
        assert_eq!(watch.route_poll(), Duration::from_millis(500));
        assert_eq!(watch.grid_tick(), Duration::from_secs(1));
        assert_eq!(watch.cart_tick(), Duration::from_millis(2_500));
        assert_eq!(watch.session_refresh(), Duration::from_secs(86_400));
    }
}
