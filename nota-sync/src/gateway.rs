//! Contracts for the collaborators around the ingestion core: receipt page
//! fetching, the remote price store and the local receipt cache.

use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;
use nota_core::{NewPriceRecord, PriceRecord};
use serde::{Deserialize, Serialize};

/// Fetches receipt markup for a portal URL
pub trait ReceiptFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Remote store of price records
pub trait PriceStore {
    fn list_all(&self) -> impl Future<Output = Result<Vec<PriceRecord>>> + Send;

    fn insert(&self, record: &NewPriceRecord) -> impl Future<Output = Result<PriceRecord>> + Send;

    fn delete_by_vendor_and_date(
        &self,
        vendor_name: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// A receipt already ingested on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownReceipt {
    pub id: String,
    pub vendor: String,
    pub purchase_date: NaiveDate,
    pub item_count: usize,
}

/// Local record of ingested receipt ids
pub trait ReceiptCache {
    fn load_known(&self) -> Result<Vec<KnownReceipt>>;

    fn append(&mut self, receipt: KnownReceipt) -> Result<()>;

    /// Drop receipts of `vendor` on `date`; returns how many were removed
    fn remove_vendor_date(&mut self, vendor: &str, date: NaiveDate) -> Result<usize>;

    fn load_known_ids(&self) -> Result<Vec<String>> {
        Ok(self.load_known()?.into_iter().map(|r| r.id).collect())
    }
}
