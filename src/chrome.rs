//! Live page surface backed by a managed headless Chrome tab. The
//! storefront runs its SPA inside the tab; this module only reads from it.
//! DevTools calls are blocking, so they run on the blocking pool.

use std::ffi::OsStr;
use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::info;

use crate::config::BrowserConfig;
use crate::session::{PageLocation, PageSession};
use crate::utils::error::{AppError, Result};

pub struct ChromeSession {
    // Held to keep the browser process alive for the tab's lifetime.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a browser, open one tab on `start_url`, and wait for the
    /// first navigation to settle.
    pub fn launch(config: &BrowserConfig, start_url: &str) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| AppError::Session(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Session(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Session(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| AppError::Session(format!("Failed to set user agent: {}", e)))?;

        tab.navigate_to(start_url)
            .map_err(|e| AppError::Session(format!("Navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| AppError::Session(format!("Page load failed: {}", e)))?;

        info!("Browser session opened on {}", start_url);
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> std::result::Result<T, String> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(tab))
            .await
            .map_err(|e| AppError::Session(format!("Blocking call panicked: {}", e)))?
            .map_err(AppError::Session)
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn location(&self) -> PageLocation {
        let url = self
            .blocking(|tab| Ok(tab.get_url()))
            .await
            .unwrap_or_default();
        PageLocation::from_url(&url)
    }

    async fn document(&self) -> Result<String> {
        self.blocking(|tab| {
            tab.get_content()
                .map_err(|e| format!("Failed to get page content: {}", e))
        })
        .await
    }

    async fn title(&self) -> String {
        self.blocking(|tab| {
            tab.get_title()
                .map_err(|e| format!("Failed to get page title: {}", e))
        })
        .await
        .unwrap_or_default()
    }

    async fn reload(&self) -> Result<()> {
        self.blocking(|tab| {
            tab.reload(true, None)
                .map(|_| ())
                .map_err(|e| format!("Reload failed: {}", e))
        })
        .await
    }
}
