//! Receipt ingestion: fetch -> parse -> dedup -> classify -> store.
//!
//! An [`Ingestor`] owns the receipt cache and is driven through `&mut self`,
//! so one instance serializes the read-history -> decide -> write-history
//! sequence. Share it behind [`SharedIngestor`] when scans can overlap.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use nota_core::{simplify_vendor_name, Classifier, DateFormatError, NewPriceRecord, PriceRecord};
use nota_ingest::{is_duplicate, normalize_portal_url, receipt_id, NfceParser, RawReceiptDocument};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::gateway::{KnownReceipt, PriceStore, ReceiptCache, ReceiptFetcher};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not load receipt {url}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Date(#[from] DateFormatError),

    #[error("no item of receipt {receipt_id} could be stored")]
    Store {
        receipt_id: String,
        #[source]
        source: BoxError,
    },

    #[error("receipt cache unavailable")]
    Cache(#[source] BoxError),
}

/// Records stored for one receipt
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedReceipt {
    pub receipt_id: String,
    pub vendor: String,
    pub purchase_date: NaiveDate,
    pub records: Vec<PriceRecord>,
}

/// A line item the store rejected
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub record: NewPriceRecord,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Every item stored; the receipt id is now known
    Stored(IngestedReceipt),
    /// Some items stored, some rejected. The receipt id is NOT recorded, so
    /// the caller can retry after [`Ingestor::rollback`] or keep what landed.
    Partial {
        receipt: IngestedReceipt,
        failed: Vec<FailedItem>,
    },
    /// The receipt was ingested before; nothing was stored
    Duplicate { receipt_id: String, vendor: String },
}

pub struct Ingestor<F, S, C> {
    fetcher: F,
    store: S,
    cache: C,
    parser: NfceParser,
    classifier: Classifier,
}

pub type SharedIngestor<F, S, C> = Arc<Mutex<Ingestor<F, S, C>>>;

impl<F, S, C> Ingestor<F, S, C>
where
    F: ReceiptFetcher,
    S: PriceStore,
    C: ReceiptCache,
{
    pub fn new(fetcher: F, store: S, cache: C, classifier: Classifier) -> Self {
        Self {
            fetcher,
            store,
            cache,
            parser: NfceParser::new(),
            classifier,
        }
    }

    pub fn with_parser(mut self, parser: NfceParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn shared(self) -> SharedIngestor<F, S, C> {
        Arc::new(Mutex::new(self))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Ingest the receipt behind a scanned QR code URL
    pub async fn ingest(&mut self, raw_url: &str) -> Result<IngestOutcome, IngestError> {
        let url = normalize_portal_url(raw_url);
        let markup = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| IngestError::Fetch {
                url: url.clone(),
                source: e.into(),
            })?;
        self.ingest_document(RawReceiptDocument::new(markup, url)).await
    }

    /// Ingest already-fetched receipt markup
    pub async fn ingest_document(
        &mut self,
        doc: RawReceiptDocument,
    ) -> Result<IngestOutcome, IngestError> {
        let receipt = self.parser.parse(&doc.markup);
        let receipt_id = receipt_id(&receipt, &doc.source_url);

        let known = self
            .cache
            .load_known()
            .map_err(|e| IngestError::Cache(e.into()))?;
        if is_duplicate(&receipt_id, known.iter().map(|k| &k.id)) {
            let vendor = known
                .iter()
                .find(|k| k.id == receipt_id)
                .map(|k| k.vendor.clone())
                .unwrap_or_else(|| receipt.vendor_name());
            info!(receipt_id = %receipt_id, vendor = %vendor, "duplicate receipt");
            return Ok(IngestOutcome::Duplicate { receipt_id, vendor });
        }

        if receipt.is_sentinel_only() {
            warn!(receipt_id = %receipt_id, "receipt has no readable items");
        }

        let records = receipt.to_records(&self.classifier)?;
        let purchase_date = receipt.purchase_date()?;
        let vendor = receipt.vendor_name();

        let mut stored = Vec::with_capacity(records.len());
        let mut failed = Vec::new();
        let mut last_error = None;

        for record in records {
            match self.store.insert(&record).await {
                Ok(saved) => {
                    debug!(id = %saved.id, product = %saved.product_name, "stored item");
                    stored.push(saved);
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(product = %record.product_name, error = %reason, "item not stored");
                    failed.push(FailedItem { record, reason });
                    last_error = Some(e);
                }
            }
        }

        if stored.is_empty() {
            if let Some(e) = last_error {
                return Err(IngestError::Store {
                    receipt_id,
                    source: e.into(),
                });
            }
        }

        let receipt = IngestedReceipt {
            receipt_id,
            vendor,
            purchase_date,
            records: stored,
        };

        if !failed.is_empty() {
            return Ok(IngestOutcome::Partial { receipt, failed });
        }

        self.cache
            .append(KnownReceipt {
                id: receipt.receipt_id.clone(),
                vendor: receipt.vendor.clone(),
                purchase_date: receipt.purchase_date,
                item_count: receipt.records.len(),
            })
            .map_err(|e| IngestError::Cache(e.into()))?;

        info!(
            receipt_id = %receipt.receipt_id,
            items = receipt.records.len(),
            "receipt ingested"
        );
        Ok(IngestOutcome::Stored(receipt))
    }

    /// Undo a partial ingestion by deleting what was stored for its vendor/date pairs
    pub async fn rollback(&mut self, stored: &[PriceRecord]) -> Result<()> {
        let pairs: BTreeSet<(&str, NaiveDate)> = stored
            .iter()
            .map(|r| (r.vendor_name.as_str(), r.purchase_date))
            .collect();
        for (vendor, date) in pairs {
            self.store.delete_by_vendor_and_date(vendor, date).await?;
        }
        Ok(())
    }

    /// Delete a vendor's receipt for a date from the store and forget it locally.
    ///
    /// `vendor` may be the full header label; records carry the simplified name.
    pub async fn remove_receipt(&mut self, vendor: &str, date: NaiveDate) -> Result<usize> {
        let vendor = simplify_vendor_name(vendor);
        self.store.delete_by_vendor_and_date(&vendor, date).await?;
        let removed = self.cache.remove_vendor_date(&vendor, date)?;
        info!(vendor = %vendor, %date, removed, "receipt removed");
        Ok(removed)
    }
}
