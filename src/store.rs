//! Store identity resolution. Storefront prices vary per store, so every
//! report carries the store the page was rendered for. The id lives in
//! different places depending on page type and rollout bucket; resolution
//! walks an ordered list of strategies and takes the first hit.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::search::{deep_search_key_value, parse_safe, probe_path, probe_string};

/// Returned when every strategy comes up empty.
pub const UNKNOWN_STORE: &str = "unknown";

/// Element id of the embedded full-page metadata blob.
const NEXT_DATA_SELECTOR: &str = "#__NEXT_DATA__";
/// Per-module metadata carried as a DOM attribute.
const MODULE_DATA_SELECTOR: &str = "[data-module-data]";
/// Debug payload some ad modules carry.
const DEBUG_DATA_SELECTOR: &str = "[data-debug]";

/// Paths probed on an ad-config shaped blob, most specific first.
const AD_CONFIG_PATHS: [&[&str]; 4] = [
    &["configs", "ad", "storeId"],
    &["configs", "ad", "adsContext", "locationContext", "storeId"],
    &["configs", "ad", "adsContext", "locationContext", "pickupStore"],
    &["configs", "ad", "adsContext", "locationContext", "deliveryStore"],
];

const PAGE_LOCATION_PATHS: [&[&str]; 3] = [
    &["contentLayout", "pageMetadata", "location", "storeId"],
    &["contentLayout", "pageMetadata", "location", "pickupStore"],
    &["contentLayout", "pageMetadata", "location", "deliveryStore"],
];

const DEBUG_STORE_PATH: &[&str] = &[
    "adContent",
    "dbg",
    "variables",
    "adsContext",
    "locationContext",
    "storeId",
];

pub struct StoreIdentityResolver {
    next_data: Selector,
    module_data: Selector,
    debug_data: Selector,
}

fn ad_config_store_id(blob: &Value) -> Option<String> {
    AD_CONFIG_PATHS.iter().find_map(|path| probe_string(blob, path))
}

impl StoreIdentityResolver {
    pub fn new() -> Self {
        Self {
            next_data: Selector::parse(NEXT_DATA_SELECTOR).unwrap(),
            module_data: Selector::parse(MODULE_DATA_SELECTOR).unwrap(),
            debug_data: Selector::parse(DEBUG_DATA_SELECTOR).unwrap(),
        }
    }

    /// Resolve the store the document was rendered for, or [`UNKNOWN_STORE`].
    /// A parse failure inside any strategy means "this strategy found
    /// nothing" and the next one runs.
    pub fn resolve(&self, document: &Html) -> String {
        self.from_next_data(document)
            .or_else(|| self.from_module_data(document))
            .or_else(|| self.from_debug_data(document))
            .or_else(|| self.from_deep_search(document))
            .unwrap_or_else(|| {
                debug!("No store id found in document");
                UNKNOWN_STORE.to_string()
            })
    }

    fn next_data_blob(&self, document: &Html) -> Option<Value> {
        let element = document.select(&self.next_data).next()?;
        parse_safe(&element.text().collect::<String>())
    }

    /// Strategy A: the full-page metadata blob. Ad-config modules first,
    /// then the page-level location block, then fulfillment entries.
    fn from_next_data(&self, document: &Html) -> Option<String> {
        let blob = self.next_data_blob(document)?;
        let data = probe_path(&blob, &["props", "pageProps", "initialData", "data"])?;

        if let Some(modules) = probe_path(data, &["contentLayout", "modules"]).and_then(Value::as_array) {
            for module in modules {
                if let Some(store_id) = ad_config_store_id(module) {
                    return Some(store_id);
                }
            }
        }

        if let Some(store_id) = PAGE_LOCATION_PATHS
            .iter()
            .find_map(|path| probe_string(data, path))
        {
            return Some(store_id);
        }

        probe_path(data, &["product", "fulfillmentSummary"])
            .and_then(Value::as_array)?
            .iter()
            .find_map(|entry| probe_string(entry, &["storeId"]))
    }

    /// Strategy B: a module's metadata attribute, same ad-config shape.
    fn from_module_data(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.module_data).next()?;
        let blob = parse_safe(element.value().attr("data-module-data")?)?;
        ad_config_store_id(&blob)
    }

    /// Strategy C: the debug attribute some ad modules carry.
    fn from_debug_data(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.debug_data).next()?;
        let blob = parse_safe(element.value().attr("data-debug")?)?;
        probe_string(&blob, DEBUG_STORE_PATH)
    }

    /// Strategy D: last resort, search the whole metadata blob for anything
    /// named `storeId`.
    fn from_deep_search(&self, document: &Html) -> Option<String> {
        let blob = self.next_data_blob(document)?;
        deep_search_key_value(&blob, "storeId")
    }
}

impl Default for StoreIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(html: &str) -> String {
        StoreIdentityResolver::new().resolve(&Html::parse_document(html))
    }

    #[test]
    fn test_resolves_from_module_ad_config() {
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"initialData":{"data":{"contentLayout":{
                "modules":[
                    {"configs":{"other":true}},
                    {"configs":{"ad":{"adsContext":{"locationContext":{"storeId":"2648"}}}}}
                ]}}}}}}
            </script>
        "#;
        assert_eq!(resolve(html), "2648");
    }

    #[test]
    fn test_resolves_from_page_metadata_location() {
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"initialData":{"data":{"contentLayout":{
                "modules":[],
                "pageMetadata":{"location":{"pickupStore":"881"}}
            }}}}}}
            </script>
        "#;
        assert_eq!(resolve(html), "881");
    }

    #[test]
    fn test_resolves_from_fulfillment_summary() {
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"initialData":{"data":{
                "product":{"fulfillmentSummary":[{"other":1},{"storeId":3105}]}
            }}}}}
            </script>
        "#;
        assert_eq!(resolve(html), "3105");
    }

    #[test]
    fn test_resolves_from_module_data_attribute() {
        let html = r#"
            <div data-module-data='{"configs":{"ad":{"storeId":"551"}}}'></div>
        "#;
        assert_eq!(resolve(html), "551");
    }

    #[test]
    fn test_resolves_from_debug_attribute() {
        let html = r#"
            <div data-debug='{"adContent":{"dbg":{"variables":{"adsContext":{"locationContext":{"storeId":"909"}}}}}}'></div>
        "#;
        assert_eq!(resolve(html), "909");
    }

    #[test]
    fn test_falls_through_to_deep_search() {
        // No known path matches, but a storeId hides somewhere unexpected.
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"initialData":{"data":{
                "somewhere":{"else":{"storeId":"7312"}}
            }}}}}
            </script>
        "#;
        assert_eq!(resolve(html), "7312");
    }

    #[test]
    fn test_malformed_blob_degrades_to_next_strategy() {
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">{broken</script>
            <div data-module-data='{"configs":{"ad":{"storeId":"142"}}}'></div>
        "#;
        assert_eq!(resolve(html), "142");
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        assert_eq!(resolve("<html><body></body></html>"), UNKNOWN_STORE);
    }

    #[test]
    fn test_empty_store_id_falls_through() {
        let html = r#"
            <div data-module-data='{"configs":{"ad":{"storeId":""}}}'></div>
            <div data-debug='{"adContent":{"dbg":{"variables":{"adsContext":{"locationContext":{"storeId":"77"}}}}}}'></div>
        "#;
        assert_eq!(resolve(html), "77");
    }
}
