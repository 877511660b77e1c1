//! Page watchers. Each recognized page type gets a watcher that owns its
//! polling loop(s) and hands back a teardown through [`ActiveWatcher`].
//! At most one watcher is live at a time; the dispatcher awaits the old
//! one's teardown before starting the next.

pub mod cart;
pub mod detail;
pub mod grid;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::WatchConfig;
use crate::listing::ListingExtractor;
use crate::normalize::PriceNormalizer;
use crate::reporting::{ReportedIds, Reporter};
use crate::session::PageSession;

pub use cart::CartWatcher;
pub use detail::DetailWatcher;
pub use grid::GridWatcher;

/// Which watcher family a route selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Grid,
    Detail,
    Cart,
}

/// The route-table match a watcher is started with. Capture groups come
/// from the route pattern; the detail page pulls its item id out of them.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub path: String,
    captures: Vec<Option<String>>,
}

impl RouteMatch {
    pub fn from_captures(path: &str, captures: &regex::Captures<'_>) -> Self {
        Self {
            path: path.to_string(),
            captures: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// Capture group by index; 0 is the whole match.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).and_then(|group| group.as_deref())
    }
}

/// Everything a watcher needs: the page surface, the reporting step, the
/// extraction helpers, and the configured cadences. One per page session.
pub struct WatchContext {
    pub session: Arc<dyn PageSession>,
    pub reporter: Arc<Reporter>,
    pub extractor: ListingExtractor,
    pub normalizer: PriceNormalizer,
    pub seen: ReportedIds,
    pub config: WatchConfig,
}

impl WatchContext {
    pub fn new(session: Arc<dyn PageSession>, reporter: Arc<Reporter>, config: WatchConfig) -> Self {
        let seen = reporter.seen();
        Self {
            extractor: ListingExtractor::new(PriceNormalizer::new(), seen.clone()),
            normalizer: PriceNormalizer::new(),
            session,
            reporter,
            seen,
            config,
        }
    }
}

/// A recurring observation loop with a cancel handle. Cancelling stops the
/// timer and then awaits the task, so an in-flight tick finishes instead of
/// being interrupted; it just never runs again.
pub(crate) struct TickTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TickTask {
    pub(crate) fn spawn<F, Fut>(period: Duration, mut work: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tokio::select! {
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                    _ = tick.tick() => work().await,
                }
            }
        });
        Self { stop, handle }
    }

    pub(crate) async fn cancel(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

/// The one live watcher, tagged by page kind. Composed watchers (the detail
/// page's related-items grid, the cart's recommendation grid) hang off
/// their parent variant, so teardown cascades through the whole tree.
pub enum ActiveWatcher {
    Grid(GridWatcher),
    Detail(DetailWatcher),
    Cart(CartWatcher),
}

impl ActiveWatcher {
    pub fn kind(&self) -> PageKind {
        match self {
            ActiveWatcher::Grid(_) => PageKind::Grid,
            ActiveWatcher::Detail(_) => PageKind::Detail,
            ActiveWatcher::Cart(_) => PageKind::Cart,
        }
    }

    /// Cancel every loop this watcher owns, children included. Completes
    /// only once all of them have stopped; after that no further side
    /// effects occur.
    pub async fn teardown(self) {
        match self {
            ActiveWatcher::Grid(watcher) => watcher.teardown().await,
            ActiveWatcher::Detail(watcher) => watcher.teardown().await,
            ActiveWatcher::Cart(watcher) => watcher.teardown().await,
        }
    }
}

/// Start the watcher for a matched route. The detail page does a bounded
/// wait for its price element during startup, so this can take a while;
/// the dispatcher stays blocked on it by design.
pub async fn start_watcher(
    kind: PageKind,
    ctx: Arc<WatchContext>,
    route: RouteMatch,
) -> ActiveWatcher {
    match kind {
        PageKind::Grid => ActiveWatcher::Grid(GridWatcher::start(ctx)),
        PageKind::Detail => ActiveWatcher::Detail(DetailWatcher::start(ctx, route).await),
        PageKind::Cart => ActiveWatcher::Cart(CartWatcher::start(ctx)),
    }
}
