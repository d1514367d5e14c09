//! JSON-file receipt cache (`~/.nota/receipts.json`)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use nota_core::simplify_vendor_name;
use std::fs;
use std::path::{Path, PathBuf};

use crate::gateway::{KnownReceipt, ReceiptCache};

#[derive(Debug, Clone)]
pub struct JsonReceiptCache {
    path: PathBuf,
}

impl JsonReceiptCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, receipts: &[KnownReceipt]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(receipts)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

impl ReceiptCache for JsonReceiptCache {
    fn load_known(&self) -> Result<Vec<KnownReceipt>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn append(&mut self, receipt: KnownReceipt) -> Result<()> {
        let mut all = self.load_known()?;
        all.push(receipt);
        self.write(&all)
    }

    fn remove_vendor_date(&mut self, vendor: &str, date: NaiveDate) -> Result<usize> {
        let wanted = simplify_vendor_name(vendor);
        let all = self.load_known()?;
        let before = all.len();
        let kept: Vec<KnownReceipt> = all
            .into_iter()
            .filter(|r| simplify_vendor_name(&r.vendor) != wanted || r.purchase_date != date)
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write(&kept)?;
        }
        Ok(removed)
    }
}
