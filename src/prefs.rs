//! User preferences. The watcher core reads the theme and the reporting
//! opt-in at startup and subscribes to changes; everything else about
//! preference storage (persistence, UI) lives outside this crate.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::models::Preferences;
use crate::utils::error::Result;

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Current preferences.
    async fn load(&self) -> Result<Preferences>;

    /// Change notifications. The receiver always holds the latest value.
    fn subscribe(&self) -> watch::Receiver<Preferences>;
}

/// In-memory preference store backed by a watch channel.
pub struct MemoryPreferenceStore {
    tx: watch::Sender<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(initial: Preferences) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn update(&self, preferences: Preferences) {
        debug!("Preferences updated: {:?}", preferences);
        self.tx.send_modify(|current| *current = preferences);
    }

    pub fn set_reporting_enabled(&self, enabled: bool) {
        self.tx
            .send_modify(|current| current.reporting_enabled = enabled);
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Preferences> {
        Ok(self.tx.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = MemoryPreferenceStore::new(Preferences::default());
        let rx = store.subscribe();
        assert!(!rx.borrow().reporting_enabled);

        store.set_reporting_enabled(true);
        assert!(rx.borrow().reporting_enabled);

        store.update(Preferences {
            theme: Theme::Dark,
            reporting_enabled: true,
            history_graphs: true,
        });
        assert_eq!(rx.borrow().theme, Theme::Dark);
        assert_eq!(store.load().await.unwrap().theme, Theme::Dark);
    }
}
