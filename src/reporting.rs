//! The reporting step: deduplicate, enrich with store identity, and hand
//! the batch to the external reporting channel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::ReportingConfig;
use crate::models::{FullItemReport, ItemReport, Preferences, ReportBatch};
use crate::normalize::FAILED_PRICE;
use crate::session::PageSession;
use crate::store::{StoreIdentityResolver, UNKNOWN_STORE};
use crate::utils::error::{AppError, Result};

/// Item ids already reported this page session. Insert-only while the
/// session lives; cleared only when the session resets. Shared between the
/// extractors (which read) and the reporter (which writes).
#[derive(Clone, Default)]
pub struct ReportedIds(Arc<Mutex<HashSet<String>>>);

impl ReportedIds {
    pub fn contains(&self, item_id: &str) -> bool {
        self.0.lock().unwrap().contains(item_id)
    }

    pub fn mark(&self, item_id: &str) {
        self.0.lock().unwrap().insert(item_id.to_string());
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Outbound reporting channel. Fire-and-forget from the watcher's point of
/// view; nobody upstream looks at the acknowledgement.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, reports: Vec<FullItemReport>) -> Result<()>;
}

/// POSTs report batches to the collection endpoint.
pub struct HttpReportSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReportSink {
    pub fn new(config: &ReportingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn submit(&self, reports: Vec<FullItemReport>) -> Result<()> {
        let body = ReportBatch {
            version: 1,
            reports,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Collects batches in memory. Backs tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<FullItemReport>>>,
}

impl MemorySink {
    pub fn batches(&self) -> Vec<Vec<FullItemReport>> {
        self.batches.lock().unwrap().clone()
    }

    /// All reported items across batches, in submission order.
    pub fn reports(&self) -> Vec<FullItemReport> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn submit(&self, reports: Vec<FullItemReport>) -> Result<()> {
        self.batches.lock().unwrap().push(reports);
        Ok(())
    }
}

/// Gates, enriches, and forwards extracted batches. At most one report per
/// item id is considered per session; that is a dedup discipline, not an
/// exactly-once guarantee.
pub struct Reporter {
    session: Arc<dyn PageSession>,
    sink: Arc<dyn ReportSink>,
    resolver: StoreIdentityResolver,
    seen: ReportedIds,
    preferences: watch::Receiver<Preferences>,
}

impl Reporter {
    pub fn new(
        session: Arc<dyn PageSession>,
        sink: Arc<dyn ReportSink>,
        preferences: watch::Receiver<Preferences>,
        seen: ReportedIds,
    ) -> Self {
        Self {
            session,
            sink,
            resolver: StoreIdentityResolver::new(),
            seen,
            preferences,
        }
    }

    pub fn seen(&self) -> ReportedIds {
        self.seen.clone()
    }

    /// Forget everything reported so far. The next scan reports from
    /// scratch, the way a full page reload would.
    pub fn reset_session(&self) {
        self.seen.clear();
    }

    /// Attach the current store identity to the batch and forward it.
    /// Sentinel-priced and already-reported entries are dropped first;
    /// an empty batch is a no-op.
    pub async fn submit(&self, batch: Vec<ItemReport>) {
        let batch: Vec<ItemReport> = batch
            .into_iter()
            .filter(|report| {
                if report.price == FAILED_PRICE {
                    warn!("Dropping report with unparsed price for item {}", report.item_id);
                    return false;
                }
                !self.seen.contains(&report.item_id)
            })
            .collect();

        if batch.is_empty() {
            debug!("No items to report");
            return;
        }

        let enabled = self.preferences.borrow().reporting_enabled;
        if !enabled {
            debug!("Reporting disabled, dropping {} item(s)", batch.len());
            return;
        }

        let store_id = self.current_store_id().await;
        let observed_at = Utc::now();

        for report in &batch {
            self.seen.mark(&report.item_id);
        }

        let reports: Vec<FullItemReport> = batch
            .into_iter()
            .map(|item| FullItemReport {
                item,
                store_id: store_id.clone(),
                observed_at,
            })
            .collect();

        debug!("Reporting {} item price(s) for store {}", reports.len(), store_id);
        if let Err(err) = self.sink.submit(reports).await {
            warn!("Report submission failed: {}", err);
        }
    }

    async fn current_store_id(&self) -> String {
        match self.session.document().await {
            Ok(html) => {
                let document = Html::parse_document(&html);
                self.resolver.resolve(&document)
            }
            Err(err) => {
                debug!("Could not read document for store resolution: {}", err);
                UNKNOWN_STORE.to_string()
            }
        }
    }
}
