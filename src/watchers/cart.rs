//! Watcher for the cart page. The cart can grow while it is being viewed
//! (items added, "show more" expanded), so its container is rescanned on
//! its own tick; cart pages also render recommended-item tiles, which a
//! composed grid watcher picks up concurrently.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{GridWatcher, TickTask, WatchContext};
use crate::models::ItemReport;
use crate::normalize::FAILED_PRICE;
use crate::session::element_text;

const CART_CONTAINER_SELECTOR: &str = r#"[data-testid="product-tile-container"]"#;
const LINE_NAME_SELECTOR: &str = r#"[link-identifier="itemClick"]"#;
const LINE_ID_SELECTOR: &str = "[data-usitemid]";
const LINE_PRICE_SELECTOR: &str = r#"[data-testid="line-price"]"#;

pub struct CartWatcher {
    ticker: TickTask,
    related: GridWatcher,
}

impl CartWatcher {
    pub fn start(ctx: Arc<WatchContext>) -> Self {
        debug!("Cart watcher started");
        let period = ctx.config.cart_tick();
        let ticker = {
            let ctx = Arc::clone(&ctx);
            TickTask::spawn(period, move || {
                let ctx = Arc::clone(&ctx);
                async move { scan_cart(&ctx).await }
            })
        };
        let related = GridWatcher::start(ctx);
        Self { ticker, related }
    }

    pub(crate) async fn teardown(self) {
        futures::future::join(self.ticker.cancel(), self.related.teardown()).await;
        debug!("Cart watcher stopped");
    }
}

/// One tick: walk the cart container's line items. An absent container
/// means an empty cart, which is a no-op.
pub(crate) async fn scan_cart(ctx: &WatchContext) {
    let html = match ctx.session.document().await {
        Ok(html) => html,
        Err(err) => {
            debug!("Skipping cart scan: {}", err);
            return;
        }
    };

    let found: Vec<ItemReport> = {
        let document = Html::parse_document(&html);
        let container = Selector::parse(CART_CONTAINER_SELECTOR).unwrap();
        match document.select(&container).next() {
            Some(list) => list
                .children()
                .filter_map(ElementRef::wrap)
                .filter_map(|line| extract_line_item(ctx, line))
                .collect(),
            None => Vec::new(),
        }
    };

    if !found.is_empty() {
        ctx.reporter.submit(found).await;
    }
}

fn extract_line_item(ctx: &WatchContext, line: ElementRef<'_>) -> Option<ItemReport> {
    let name = Selector::parse(LINE_NAME_SELECTOR).unwrap();
    let id = Selector::parse(LINE_ID_SELECTOR).unwrap();
    let line_price = Selector::parse(LINE_PRICE_SELECTOR).unwrap();

    let item_id = line
        .select(&id)
        .next()
        .and_then(|el| el.value().attr("data-usitemid"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)?;

    let price_text = line.select(&line_price).next().map(element_text);
    let price = ctx.normalizer.parse(price_text.as_deref());

    let item_name = line
        .select(&name)
        .next()
        .map(element_text)
        .filter(|name| !name.is_empty());

    if price == FAILED_PRICE || price == 0.0 || ctx.seen.contains(&item_id) {
        return None;
    }

    Some(ItemReport {
        item_id,
        item_name,
        price,
    })
}
