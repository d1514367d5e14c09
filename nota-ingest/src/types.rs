use chrono::NaiveDate;
use nota_core::{normalize_date, simplify_vendor_name, Classifier, DateFormatError, NewPriceRecord};
use serde::{Deserialize, Serialize};

/// Name of the placeholder item emitted when a receipt yields no valid rows
pub const SENTINEL_ITEM_NAME: &str = "unknown";

/// Receipt page markup plus the URL it was fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReceiptDocument {
    pub markup: String,
    pub source_url: String,
}

impl RawReceiptDocument {
    pub fn new(markup: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            source_url: source_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit_price: f64,
}

impl LineItem {
    pub fn sentinel() -> Self {
        Self {
            name: SENTINEL_ITEM_NAME.to_string(),
            unit_price: 0.0,
        }
    }
}

/// Normalized output of the receipt parser (portal-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    /// Vendor label as printed, possibly with a CNPJ suffix
    pub vendor_raw: String,
    /// `DD/MM/YYYY`, today's date when the receipt has none
    pub purchase_date: String,
    /// Never empty; see [`LineItem::sentinel`]
    pub items: Vec<LineItem>,
    /// 44-digit access key when printed on the page
    pub fiscal_document_id: Option<String>,
}

impl ParsedReceipt {
    /// Vendor name with the tax-ID suffix stripped
    pub fn vendor_name(&self) -> String {
        simplify_vendor_name(&self.vendor_raw)
    }

    /// True when the parse found no real line items
    pub fn is_sentinel_only(&self) -> bool {
        self.items.len() == 1 && self.items[0] == LineItem::sentinel()
    }

    pub fn purchase_date(&self) -> Result<NaiveDate, DateFormatError> {
        normalize_date(&self.purchase_date)
    }

    /// Classify every line item into a storable record
    pub fn to_records(&self, classifier: &Classifier) -> Result<Vec<NewPriceRecord>, DateFormatError> {
        let date = self.purchase_date()?;
        let vendor = self.vendor_name();
        Ok(self
            .items
            .iter()
            .map(|item| {
                NewPriceRecord::new(
                    &item.name,
                    classifier.classify(&item.name),
                    &vendor,
                    date,
                    item.unit_price,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nota_core::Category;

    fn receipt() -> ParsedReceipt {
        ParsedReceipt {
            vendor_raw: "COMPANHIA ZAFFARI CNPJ: 93.015.006/0001-13".to_string(),
            purchase_date: "14/03/2025".to_string(),
            items: vec![
                LineItem { name: "DETERGENTE YPE".to_string(), unit_price: 2.99 },
                LineItem { name: "LEITE INTEGRAL".to_string(), unit_price: 5.49 },
            ],
            fiscal_document_id: None,
        }
    }

    #[test]
    fn test_to_records() {
        let records = receipt().to_records(&Classifier::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].vendor_name, "COMPANHIA ZAFFARI");
        assert_eq!(records[0].category, Category::Cleaning);
        assert_eq!(records[1].category, Category::Other);
        assert_eq!(records[1].purchase_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[test]
    fn test_bad_date_is_reported() {
        let mut r = receipt();
        r.purchase_date = "ontem".to_string();
        let err = r.to_records(&Classifier::default()).unwrap_err();
        assert_eq!(err.input, "ontem");
    }

    #[test]
    fn test_sentinel_detection() {
        let mut r = receipt();
        assert!(!r.is_sentinel_only());
        r.items = vec![LineItem::sentinel()];
        assert!(r.is_sentinel_only());
    }
}
