//! nota-ingest: receipt markup parsing, receipt identity and duplicate detection.

pub mod dedup;
pub mod parsers;
pub mod query;
pub mod types;
pub mod url;

pub use dedup::{is_duplicate, receipt_id, receipt_id_from_url, resolve_receipt_id};
pub use parsers::{parse_receipt, NfceParser};
pub use query::{HtmlDocument, MarkupQuery};
pub use types::{LineItem, ParsedReceipt, RawReceiptDocument};
pub use url::normalize_portal_url;
