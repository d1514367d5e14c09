//! Canonical price record types shared by ingestion, storage and history views

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One product price observed on one receipt, as stored in the price ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    /// Identifier assigned by the store on creation
    pub id: String,
    /// Product name as printed on the receipt
    pub product_name: String,
    /// Category assigned by the keyword classifier
    pub category: Category,
    /// Vendor name with any tax-ID suffix stripped
    pub vendor_name: String,
    /// Purchase date (day precision)
    pub purchase_date: NaiveDate,
    /// Unit price in BRL, never negative
    pub unit_price: f64,
}

/// A price record that has not been persisted yet (no id)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPriceRecord {
    pub product_name: String,
    pub category: Category,
    pub vendor_name: String,
    pub purchase_date: NaiveDate,
    pub unit_price: f64,
}

impl NewPriceRecord {
    pub fn new(
        product_name: impl Into<String>,
        category: Category,
        vendor_name: impl Into<String>,
        purchase_date: NaiveDate,
        unit_price: f64,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            category,
            vendor_name: vendor_name.into(),
            purchase_date,
            unit_price: unit_price.max(0.0),
        }
    }

    /// Attach the store-assigned id
    pub fn with_id(self, id: impl Into<String>) -> PriceRecord {
        PriceRecord {
            id: id.into(),
            product_name: self.product_name,
            category: self.category,
            vendor_name: self.vendor_name,
            purchase_date: self.purchase_date,
            unit_price: self.unit_price,
        }
    }
}

/// Product categories matched by keyword
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "limpeza", alias = "cleaning")]
    Cleaning,
    #[serde(rename = "eletronicos", alias = "electronics")]
    Electronics,
    #[serde(rename = "carnes", alias = "meat")]
    Meat,
    #[serde(rename = "outros", alias = "other")]
    Other,
}

impl Category {
    /// All categories in declaration order
    pub const ALL: [Category; 4] = [
        Category::Cleaning,
        Category::Electronics,
        Category::Meat,
        Category::Other,
    ];

    /// Name used on the remote store and in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cleaning => "limpeza",
            Category::Electronics => "eletronicos",
            Category::Meat => "carnes",
            Category::Other => "outros",
        }
    }

    /// Parse either the Portuguese store name or the English name
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "limpeza" | "cleaning" => Some(Category::Cleaning),
            "eletronicos" | "eletrônicos" | "electronics" => Some(Category::Electronics),
            "carnes" | "meat" => Some(Category::Meat),
            "outros" | "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
