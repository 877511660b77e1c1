//! The page surface the watchers observe: current URL, rendered document,
//! title, and a reload escape hatch. Documents cross this boundary as
//! serialized HTML strings and are parsed per tick, so no parsed tree is
//! ever held across an await.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::utils::error::{AppError, Result};

/// Path + query of the current URL, the pair the route dispatcher compares
/// between polls. A client-side navigation changes this without a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub path: String,
    pub query: Option<String>,
}

impl PageLocation {
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Split a full browser URL. An unparseable URL keeps its raw text as
    /// the path so the dispatcher still notices it changing.
    pub fn from_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self {
                path: parsed.path().to_string(),
                query: parsed.query().map(str::to_string),
            },
            Err(_) => Self {
                path: url.to_string(),
                query: None,
            },
        }
    }
}

/// Read surface over a live storefront page.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Current path + query.
    async fn location(&self) -> PageLocation;

    /// Serialized document for the current page state.
    async fn document(&self) -> Result<String>;

    /// Document title.
    async fn title(&self) -> String;

    /// Force a full page reload.
    async fn reload(&self) -> Result<()>;
}

/// Joined, trimmed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Poll the session until `selector` matches, returning the first match's
/// text content, or `None` once `wait` has elapsed.
pub async fn wait_for_text(
    session: &dyn PageSession,
    selector: &Selector,
    wait: Duration,
    poll: Duration,
) -> Option<String> {
    tokio::time::timeout(wait, async {
        let mut tick = tokio::time::interval(poll);
        loop {
            tick.tick().await;
            if let Ok(html) = session.document().await {
                let document = Html::parse_document(&html);
                if let Some(element) = document.select(selector).next() {
                    return element_text(element);
                }
            }
        }
    })
    .await
    .ok()
}

struct MemoryState {
    location: PageLocation,
    document: String,
    title: String,
    reload_error: Option<String>,
    reload_count: usize,
}

/// In-process [`PageSession`] over a fixed document. Drives the watcher
/// stack from any HTML source; `navigate` swaps location and document in
/// place the way a client-side route change does.
pub struct MemorySession {
    state: Mutex<MemoryState>,
}

impl MemorySession {
    pub fn new(path: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                location: PageLocation::new(path, None),
                document: document.into(),
                title: String::new(),
                reload_error: None,
                reload_count: 0,
            }),
        }
    }

    /// Client-side navigation: new location, new rendered document, no
    /// reload.
    pub fn navigate(&self, path: impl Into<String>, query: Option<String>, document: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.location = PageLocation::new(path, query);
        state.document = document.into();
    }

    /// Replace the rendered document in place (lazy-loaded content).
    pub fn set_document(&self, document: impl Into<String>) {
        self.state.lock().unwrap().document = document.into();
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().unwrap().title = title.into();
    }

    /// Make subsequent `reload` calls fail with the given message.
    pub fn fail_reloads(&self, message: impl Into<String>) {
        self.state.lock().unwrap().reload_error = Some(message.into());
    }

    pub fn reload_count(&self) -> usize {
        self.state.lock().unwrap().reload_count
    }
}

#[async_trait]
impl PageSession for MemorySession {
    async fn location(&self) -> PageLocation {
        self.state.lock().unwrap().location.clone()
    }

    async fn document(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().document.clone())
    }

    async fn title(&self) -> String {
        self.state.lock().unwrap().title.clone()
    }

    async fn reload(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.reload_error {
            return Err(AppError::Session(message.clone()));
        }
        state.reload_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = PageLocation::from_url("https://store.example.com/search?q=bananas");
        assert_eq!(loc.path, "/search");
        assert_eq!(loc.query.as_deref(), Some("q=bananas"));

        let bare = PageLocation::from_url("https://store.example.com/cart");
        assert_eq!(bare.path, "/cart");
        assert_eq!(bare.query, None);
    }

    #[test]
    fn test_element_text_joins_fragments() {
        let html = Html::parse_fragment("<div><span>$0</span><span>.</span><span>26</span></div>");
        let selector = Selector::parse("div").unwrap();
        let element = html.select(&selector).next().unwrap();
        assert_eq!(element_text(element), "$0 . 26");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_finds_late_element() {
        let session = std::sync::Arc::new(MemorySession::new("/ip/x/1", "<html></html>"));

        let waiter = {
            let session = std::sync::Arc::clone(&session);
            tokio::spawn(async move {
                let selector = Selector::parse("[data-seo-id=\"hero-price\"]").unwrap();
                wait_for_text(
                    &*session,
                    &selector,
                    Duration::from_secs(10),
                    Duration::from_millis(333),
                )
                .await
            })
        };

        // The element shows up after a couple of polls.
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.set_document("<div data-seo-id=\"hero-price\">$4.98</div>");

        assert_eq!(waiter.await.unwrap(), Some("$4.98".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_times_out() {
        let session = MemorySession::new("/ip/x/1", "<html></html>");
        let selector = Selector::parse("[data-seo-id=\"hero-price\"]").unwrap();
        let found = wait_for_text(
            &session,
            &selector,
            Duration::from_secs(10),
            Duration::from_millis(333),
        )
        .await;
        assert_eq!(found, None);
    }
}
