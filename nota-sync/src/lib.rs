//! nota-sync: collaborator contracts (fetch, store, receipt cache), their
//! HTTP/JSON implementations, the ingestion pipeline and CSV export

pub mod cache;
pub mod export;
pub mod gateway;
pub mod http;
pub mod ingest;

pub use cache::JsonReceiptCache;
pub use export::write_series_csv;
pub use gateway::{KnownReceipt, PriceStore, ReceiptCache, ReceiptFetcher};
pub use http::{HttpPriceStore, ProxyFetcher};
pub use ingest::{FailedItem, IngestError, IngestOutcome, IngestedReceipt, Ingestor, SharedIngestor};
