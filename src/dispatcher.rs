//! Route-aware dispatch. The storefront is a single-page app, so
//! navigation happens without reloads; a URL poll compares path + query
//! between ticks and swaps the active page watcher on change.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, info};

use crate::session::PageLocation;
use crate::watchers::{start_watcher, ActiveWatcher, PageKind, RouteMatch, WatchContext};

/// Ordered pattern → watcher-kind table. First match wins; declaration
/// order is the only precedence.
pub struct RouteTable {
    routes: Vec<(Regex, PageKind)>,
}

impl RouteTable {
    pub fn new(routes: Vec<(Regex, PageKind)>) -> Self {
        Self { routes }
    }

    /// The production storefront table.
    ///
    /// Never watched: checkout, account, and auth pages. Only public
    /// listing surfaces appear here.
    pub fn storefront_defaults() -> Self {
        let routes = [
            // Item product page:
            (r"^/ip/(.*)/(.*)$", PageKind::Detail),
            // Cart page:
            (r"^/cart", PageKind::Cart),
            // Search results page:
            (r"^/search$", PageKind::Grid),
            (r"^/shop", PageKind::Grid),
            (r"^/cp/", PageKind::Grid),
            (r"^/browse", PageKind::Grid),
        ];
        Self::new(
            routes
                .into_iter()
                .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
                .collect(),
        )
    }

    /// First pattern matching the path, in declared order.
    pub fn match_path(&self, path: &str) -> Option<(PageKind, RouteMatch)> {
        self.routes.iter().find_map(|(pattern, kind)| {
            pattern
                .captures(path)
                .map(|captures| (*kind, RouteMatch::from_captures(path, &captures)))
        })
    }
}

/// Polls the session URL and keeps exactly one page watcher alive for the
/// current route. Also owns the long-horizon forced refresh that keeps a
/// perpetually open page from accumulating state.
pub struct RouteDispatcher {
    ctx: Arc<WatchContext>,
    routes: RouteTable,
    previous: Option<PageLocation>,
    active: Option<ActiveWatcher>,
}

impl RouteDispatcher {
    pub fn new(ctx: Arc<WatchContext>, routes: RouteTable) -> Self {
        Self {
            ctx,
            routes,
            previous: None,
            active: None,
        }
    }

    /// Run until the task is dropped. The poll body awaits each transition
    /// to completion before the next tick is taken, so transitions can
    /// never overlap and a new watcher never starts before the old one's
    /// teardown has finished.
    pub async fn run(mut self) {
        let route_poll = self.ctx.config.route_poll();
        let refresh_period = self.ctx.config.session_refresh();

        let mut poll = tokio::time::interval(route_poll);
        let mut refresh =
            tokio::time::interval_at(tokio::time::Instant::now() + refresh_period, refresh_period);

        info!("Route dispatcher started");
        loop {
            tokio::select! {
                _ = poll.tick() => self.poll_route().await,
                _ = refresh.tick() => self.force_refresh().await,
            }
        }
    }

    async fn poll_route(&mut self) {
        let location = self.ctx.session.location().await;
        if self.previous.as_ref() == Some(&location) {
            return;
        }

        debug!(
            "Location changed: {}{}",
            location.path,
            location
                .query
                .as_deref()
                .map(|q| format!("?{q}"))
                .unwrap_or_default()
        );
        self.previous = Some(location.clone());
        self.transition(&location).await;
    }

    /// Tear down the outgoing watcher, then start whatever the new path
    /// maps to. An unmatched path leaves the dispatcher idle.
    async fn transition(&mut self, location: &PageLocation) {
        if let Some(outgoing) = self.active.take() {
            outgoing.teardown().await;
        }

        match self.routes.match_path(&location.path) {
            Some((kind, route)) => {
                info!("Watching {} as {:?} page", location.path, kind);
                self.active = Some(start_watcher(kind, Arc::clone(&self.ctx), route).await);
            }
            None => {
                debug!("No watcher registered for {}", location.path);
            }
        }
    }

    /// Blunt mitigation for sessions left open for days: force a full
    /// reload, which restarts the page session (and with it the dedup
    /// state). If the reload itself fails, clearing the dedup set is the
    /// degraded fallback.
    async fn force_refresh(&mut self) {
        info!("Forcing session refresh");
        match self.ctx.session.reload().await {
            Ok(()) => {
                if let Some(outgoing) = self.active.take() {
                    outgoing.teardown().await;
                }
                self.previous = None;
                self.ctx.reporter.reset_session();
            }
            Err(err) => {
                error!("Session reload failed: {}", err);
                self.ctx.reporter.reset_session();
            }
        }
    }
}
