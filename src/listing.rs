//! Turns one listing tile into an [`ItemReport`]. The storefront renders
//! tiles differently per page type and rollout bucket, so both the
//! identifier and the price come from ordered fallback strategies.

use scraper::{ElementRef, Selector};

use crate::models::ItemReport;
use crate::normalize::{FAILED_PRICE, PriceNormalizer};
use crate::reporting::ReportedIds;
use crate::session::element_text;

/// Every listing tile carries an item id attribute; this is how the grid
/// scan finds them.
pub const TILE_SELECTOR: &str = "[data-item-id]";

pub struct ListingExtractor {
    normalizer: PriceNormalizer,
    seen: ReportedIds,
    link_id: Selector,
    price_span: Selector,
    price_first_child: Selector,
    price_any_child: Selector,
    name: Selector,
}

impl ListingExtractor {
    pub fn new(normalizer: PriceNormalizer, seen: ReportedIds) -> Self {
        Self {
            normalizer,
            seen,
            link_id: Selector::parse("a[link-identifier]").unwrap(),
            price_span: Selector::parse(r#"[data-automation-id="product-price"] > span"#).unwrap(),
            price_first_child: Selector::parse(
                r#"[data-automation-id="product-price"] > *:first-child"#,
            )
            .unwrap(),
            price_any_child: Selector::parse(r#"[data-automation-id="product-price"] > *"#)
                .unwrap(),
            name: Selector::parse("a span").unwrap(),
        }
    }

    /// Analyze one listing tile. Returns `None` when no identifier can be
    /// established, the price is missing or zero, or the item was already
    /// reported this session.
    pub fn extract(&self, tile: ElementRef<'_>) -> Option<ItemReport> {
        let item_id = self.tile_id(tile)?;
        let price = self.tile_price(tile);

        let item_name = tile
            .select(&self.name)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty());

        if price == FAILED_PRICE || price == 0.0 || self.seen.contains(&item_id) {
            return None;
        }

        Some(ItemReport {
            item_id,
            item_name,
            price,
        })
    }

    /// Identifier: the tile's product link, falling back to the tile's own
    /// item-id attribute.
    fn tile_id(&self, tile: ElementRef<'_>) -> Option<String> {
        tile.select(&self.link_id)
            .next()
            .and_then(|link| link.value().attr("link-identifier"))
            .filter(|id| !id.is_empty())
            .or_else(|| tile.value().attr("data-item-id").filter(|id| !id.is_empty()))
            .map(str::to_string)
    }

    /// Price: ordered selector strategies against the price container.
    /// The `:first-child` layout variant renders the amount in minor units,
    /// hence the divisor; the other variants are whole currency.
    fn tile_price(&self, tile: ElementRef<'_>) -> f64 {
        let strategies: [(&Selector, f64); 3] = [
            (&self.price_span, 1.0),
            (&self.price_first_child, 100.0),
            (&self.price_any_child, 1.0),
        ];

        for (selector, divisor) in strategies {
            if let Some(element) = tile.select(selector).next() {
                let parsed = self.normalizer.parse(Some(&element_text(element)));
                if parsed != FAILED_PRICE {
                    return parsed / divisor;
                }
            }
        }

        FAILED_PRICE
    }
}
