//! Watcher for item detail pages. Reports the hero item once, then keeps a
//! grid watcher running for the related-items tiles the page renders below
//! the fold.

use std::sync::Arc;

use scraper::Selector;
use tracing::debug;

use super::{GridWatcher, RouteMatch, WatchContext};
use crate::models::ItemReport;
use crate::session::wait_for_text;

/// The primary price element on a detail page.
const HERO_PRICE_SELECTOR: &str = r#"[data-seo-id="hero-price"]"#;

/// Capture group of the detail route that carries the item id.
const ITEM_ID_CAPTURE: usize = 2;

pub struct DetailWatcher {
    related: GridWatcher,
}

impl DetailWatcher {
    /// Waits (bounded) for the hero price to render, reports it, then
    /// transitions into a grid watcher either way. The dispatcher is
    /// blocked for the duration of the wait by design.
    pub async fn start(ctx: Arc<WatchContext>, route: RouteMatch) -> Self {
        debug!("Detail page watcher started for {}", route.path);

        let hero = Selector::parse(HERO_PRICE_SELECTOR).unwrap();
        let found = wait_for_text(
            &*ctx.session,
            &hero,
            ctx.config.element_wait(),
            ctx.config.element_poll(),
        )
        .await;

        match found {
            Some(text) => Self::report_hero(&ctx, &route, &text).await,
            None => debug!("Hero price never appeared on {}", route.path),
        }

        // Proceed to watch the rest of the page (related items and such).
        Self {
            related: GridWatcher::start(ctx),
        }
    }

    async fn report_hero(ctx: &WatchContext, route: &RouteMatch, price_text: &str) {
        let Some(item_id) = route.capture(ITEM_ID_CAPTURE).filter(|id| !id.is_empty()) else {
            debug!("Detail route carried no item id: {}", route.path);
            return;
        };

        let price = ctx.normalizer.parse(Some(price_text));
        let title = ctx.session.title().await;
        let item_name = Some(title.replacen(&ctx.config.title_suffix, "", 1))
            .filter(|name| !name.is_empty());

        ctx.reporter
            .submit(vec![ItemReport {
                item_id: item_id.to_string(),
                item_name,
                price,
            }])
            .await;
    }

    pub(crate) async fn teardown(self) {
        self.related.teardown().await;
        debug!("Detail page watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySession;
    use crate::watchers::test_support::context;
    use std::time::Duration;

    const DETAIL_PATH: &str = "/ip/bananas-each/55512";

    fn detail_route() -> RouteMatch {
        let pattern = regex::Regex::new(r"^/ip/(.*)/(.*)$").unwrap();
        let captures = pattern.captures(DETAIL_PATH).unwrap();
        RouteMatch::from_captures(DETAIL_PATH, &captures)
    }

    fn detail_page(with_hero: bool) -> String {
        let hero = if with_hero {
            r#"<div data-seo-id="hero-price">Now $4.98</div>"#
        } else {
            ""
        };
        format!(
            r#"
            <html><body>
            <div data-module-data='{{"configs":{{"ad":{{"storeId":"4512"}}}}}}'></div>
            {hero}
            <div data-item-id="R1">
                <a link-identifier="R1"><span>Related thing</span></a>
                <div data-automation-id="product-price"><span>$9.99</span></div>
            </div>
            </body></html>
        "#
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_hero_then_related_items() {
        let session = Arc::new(MemorySession::new(DETAIL_PATH, detail_page(true)));
        session.set_title("Bananas, each - Walmart.com");
        let (ctx, sink) = context(session);

        let watcher = DetailWatcher::start(Arc::clone(&ctx), detail_route()).await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].item.item_id, "55512");
        assert_eq!(reports[0].item.item_name.as_deref(), Some("Bananas, each"));
        assert_eq!(reports[0].item.price, 4.98);
        assert_eq!(reports[1].item.item_id, "R1");

        watcher.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_still_watches_related_items() {
        let session = Arc::new(MemorySession::new(DETAIL_PATH, detail_page(false)));
        let (ctx, sink) = context(session);

        let watcher = DetailWatcher::start(Arc::clone(&ctx), detail_route()).await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;

        // No hero report, but the related tile still got picked up.
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].item.item_id, "R1");

        watcher.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cascades_to_related_grid() {
        let session = Arc::new(MemorySession::new(DETAIL_PATH, detail_page(true)));
        session.set_title("Bananas, each - Walmart.com");
        let (ctx, sink) = context(Arc::clone(&session));

        let watcher = DetailWatcher::start(Arc::clone(&ctx), detail_route()).await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        watcher.teardown().await;

        let before = sink.reports().len();
        ctx.reporter.reset_session();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.reports().len(), before);
    }
}
