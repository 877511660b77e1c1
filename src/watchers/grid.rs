//! Watcher for listing-grid pages: search results, category and browse
//! pages, shop hubs. Rescans every tile currently in the DOM on each tick,
//! which also picks up lazy-loaded content as the user scrolls.

use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::debug;

use super::{TickTask, WatchContext};
use crate::listing::TILE_SELECTOR;
use crate::models::ItemReport;

pub struct GridWatcher {
    ticker: TickTask,
}

impl GridWatcher {
    pub fn start(ctx: Arc<WatchContext>) -> Self {
        debug!("Listing grid watcher started");
        let period = ctx.config.grid_tick();
        let ticker = TickTask::spawn(period, move || {
            let ctx = Arc::clone(&ctx);
            async move { scan_listing_grid(&ctx).await }
        });
        Self { ticker }
    }

    pub(crate) async fn teardown(self) {
        self.ticker.cancel().await;
        debug!("Listing grid watcher stopped");
    }
}

/// One tick: analyze every listing tile on the page and report the batch.
pub(crate) async fn scan_listing_grid(ctx: &WatchContext) {
    let html = match ctx.session.document().await {
        Ok(html) => html,
        Err(err) => {
            debug!("Skipping grid scan: {}", err);
            return;
        }
    };

    let found: Vec<ItemReport> = {
        let document = Html::parse_document(&html);
        let tiles = Selector::parse(TILE_SELECTOR).unwrap();
        document
            .select(&tiles)
            .filter_map(|tile| ctx.extractor.extract(tile))
            .collect()
    };

    if !found.is_empty() {
        ctx.reporter.submit(found).await;
    }
}
