//! NFC-e receipt page parser (SVRS consumer portal markup)
//!
//! Expected markup, abridged:
//!   <div class="txtCenter"><div id="u20">VENDOR NAME</div> CNPJ: ...</div>
//!   <div class="txtCenter">... Emitida em 14/03/2025 10:22:01 ...</div>
//!   <table id="tabResult">
//!     <tr><td><span class="txtTit">PRODUCT</span>...</td><td><span class="valor">5,49</span></td></tr>
//!   </table>
//!   <span class="chave">4325 0393 0150 ... </span>
//!
//! Parsing is best-effort and never fails: a missing vendor, date or item
//! table degrades to defaults.

use std::sync::LazyLock;

use chrono::NaiveDate;
use nota_core::dates::{to_receipt_format, today};
use nota_core::UNKNOWN_VENDOR;
use regex::Regex;
use tracing::debug;

use crate::query::{HtmlDocument, MarkupQuery};
use crate::types::{LineItem, ParsedReceipt};

pub const HEADER_SELECTOR: &str = ".txtCenter";
pub const ITEM_ROW_SELECTOR: &str = "#tabResult tr";
pub const ITEM_NAME_SELECTOR: &str = ".txtTit";
pub const ITEM_VALUE_SELECTOR: &str = ".valor";
pub const ACCESS_KEY_SELECTOR: &str = ".chave";
pub const ISSUED_MARKER: &str = "Emitida em";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("date regex"));

// Leading numeric prefix, like a lenient float read
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)").expect("number regex"));

/// Parse a receipt value like `5,49` into a number.
///
/// Only the first comma becomes a decimal point and the longest numeric
/// prefix is read, so thousands separators are NOT understood:
/// `1.234,56` reads as `1.234`. Unreadable text is `0.0`.
pub fn parse_brl_value(text: &str) -> f64 {
    let swapped = text.trim().replacen(',', ".", 1);
    NUMBER_RE
        .find(&swapped)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Best-effort NFC-e parser. A receipt without a readable issue date gets
/// the pinned date, or the current date at parse time when unpinned.
#[derive(Debug, Clone, Default)]
pub struct NfceParser {
    today: Option<NaiveDate>,
}

impl NfceParser {
    pub fn new() -> Self {
        Self { today: None }
    }

    /// Pin the fallback date (tests, reprocessing old pages)
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn fallback_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(today)
    }

    pub fn parse(&self, markup: &str) -> ParsedReceipt {
        self.parse_document(&HtmlDocument::parse(markup))
    }

    pub fn parse_document<Q: MarkupQuery>(&self, doc: &Q) -> ParsedReceipt {
        let vendor_raw = vendor(doc);
        debug!(vendor = %vendor_raw, "receipt vendor");

        let purchase_date = issued_date(doc).unwrap_or_else(|| to_receipt_format(self.fallback_date()));
        debug!(date = %purchase_date, "receipt date");

        let mut items = line_items(doc);
        debug!(count = items.len(), "receipt items");
        if items.is_empty() {
            items.push(LineItem::sentinel());
        }

        ParsedReceipt {
            vendor_raw,
            purchase_date,
            items,
            fiscal_document_id: access_key(doc),
        }
    }
}

/// Parse with today's date as the fallback
pub fn parse_receipt(markup: &str) -> ParsedReceipt {
    NfceParser::new().parse(markup)
}

fn vendor<Q: MarkupQuery>(doc: &Q) -> String {
    doc.first_text(HEADER_SELECTOR)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
}

fn issued_date<Q: MarkupQuery>(doc: &Q) -> Option<String> {
    doc.all_texts(HEADER_SELECTOR).iter().find_map(|text| {
        let (_, after) = text.split_once(ISSUED_MARKER)?;
        DATE_RE
            .find_iter(after)
            .map(|m| m.as_str())
            .find(|d| NaiveDate::parse_from_str(d, "%d/%m/%Y").is_ok())
            .map(str::to_string)
    })
}

fn line_items<Q: MarkupQuery>(doc: &Q) -> Vec<LineItem> {
    doc.rows(ITEM_ROW_SELECTOR, &[ITEM_NAME_SELECTOR, ITEM_VALUE_SELECTOR])
        .into_iter()
        .filter_map(|fields| {
            let name = fields.first()?.trim().to_string();
            let value = parse_brl_value(fields.get(1)?);
            // footer/subtotal rows share the item markup; drop them quietly
            (!name.is_empty() && value > 0.0).then_some(LineItem { name, unit_price: value })
        })
        .collect()
}

fn access_key<Q: MarkupQuery>(doc: &Q) -> Option<String> {
    let key: String = doc
        .first_text(ACCESS_KEY_SELECTOR)?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (key.len() == 44 && key.chars().all(|c| c.is_ascii_digit())).then_some(key)
}
