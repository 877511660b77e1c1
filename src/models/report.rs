use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation pulled out of a listing tile. Immutable once produced;
/// consumed exactly once by the reporting step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub price: f64,
}

/// An `ItemReport` enriched with the store it was observed in. This is the
/// unit actually handed to the reporting channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullItemReport {
    #[serde(flatten)]
    pub item: ItemReport,
    pub store_id: String,
    pub observed_at: DateTime<Utc>,
}

/// Wire envelope for the reporting channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportBatch {
    pub version: u32,
    pub reports: Vec<FullItemReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_report_wire_shape() {
        let report = FullItemReport {
            item: ItemReport {
                item_id: "55512".to_string(),
                item_name: Some("Bananas".to_string()),
                price: 0.26,
            },
            store_id: "4512".to_string(),
            observed_at: Utc::now(),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["itemId"], "55512");
        assert_eq!(json["itemName"], "Bananas");
        assert_eq!(json["price"], 0.26);
        assert_eq!(json["storeId"], "4512");
        assert!(json.get("observedAt").is_some());
    }

    #[test]
    fn test_absent_name_is_omitted() {
        let report = ItemReport {
            item_id: "1".to_string(),
            item_name: None,
            price: 12.0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("itemName").is_none());
    }
}
