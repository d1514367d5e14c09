//! Receipt identity and duplicate detection.
//!
//! Checking and recording ids is not atomic: callers that ingest
//! concurrently must serialize read-history -> decide -> write-history.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ParsedReceipt;

static URL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]p=([0-9]+)").expect("receipt id regex"));

/// Numeric receipt key from the `p=` query parameter of a portal URL
pub fn receipt_id_from_url(url: &str) -> Option<String> {
    URL_ID_RE.captures(url).map(|caps| caps[1].to_string())
}

/// Identifier used for deduplication.
///
/// Order: id printed on the receipt, then the `p=` key of the source URL,
/// then the raw URL itself.
pub fn resolve_receipt_id(explicit: Option<&str>, source_url: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| receipt_id_from_url(source_url))
        .unwrap_or_else(|| source_url.to_string())
}

/// [`resolve_receipt_id`] for a parsed receipt
pub fn receipt_id(receipt: &ParsedReceipt, source_url: &str) -> String {
    resolve_receipt_id(receipt.fiscal_document_id.as_deref(), source_url)
}

/// Exact string comparison; no case or leading-zero normalization
pub fn is_duplicate<I, S>(candidate_id: &str, history: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    history.into_iter().any(|id| id.as_ref() == candidate_id)
}
