use regex::Regex;
use tracing::warn;

/// Sentinel returned when a price could not be parsed. Negative on purpose:
/// no real price is negative, and downstream filtering keys off it.
pub const FAILED_PRICE: f64 = -1.0;

/// Parses the free-form price text the storefront renders into a number.
///
/// Variations seen in the wild:
///   Now $0.26
///   $0.26
///   $0.26 / each
///   $0.26 / ea
///   1.23
#[derive(Debug, Clone)]
pub struct PriceNormalizer {
    strip: Regex,
}

impl PriceNormalizer {
    pub fn new() -> Self {
        Self {
            strip: Regex::new(r"[^0-9.]").unwrap(),
        }
    }

    /// Strip everything that is not a digit or a decimal point, then parse.
    /// Absent text, nothing left after stripping, or a malformed number
    /// (e.g. two decimal points) all map to [`FAILED_PRICE`].
    pub fn parse(&self, text: Option<&str>) -> f64 {
        let Some(text) = text else {
            return FAILED_PRICE;
        };

        let stripped = self.strip.replace_all(text, "");
        match stripped.parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Failed to parse price: {:?}", text);
                FAILED_PRICE
            }
        }
    }
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
