//! Price history aggregation: group records, order them chronologically and
//! compute period-over-period deltas for comparison views.
//!
//! Everything here is a pure transformation over borrowed records. Identical
//! input (including order) always yields identical output.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::{month_key, month_label};
use crate::record::{Category, PriceRecord};
use crate::vendor::simplify_vendor_name;

/// Dimension used to cluster records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Product,
    Vendor,
    Month,
}

/// Entry order inside each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Change from the chronologically previous entry of the same group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceDelta {
    pub absolute: f64,
    /// `None` when the previous price was zero
    pub percent: Option<f64>,
}

impl PriceDelta {
    pub fn between(previous: f64, current: f64) -> Self {
        let absolute = current - previous;
        let percent = if previous != 0.0 {
            Some(absolute * 100.0 / previous)
        } else {
            None
        };
        Self { absolute, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub record: PriceRecord,
    pub delta: Option<PriceDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedSeries {
    pub key: String,
    pub entries: Vec<SeriesEntry>,
}

impl GroupedSeries {
    /// Most recent entry by purchase date
    pub fn latest(&self) -> Option<&SeriesEntry> {
        self.entries.iter().max_by_key(|e| e.record.purchase_date)
    }
}

// Month groups order by the underlying date, never by the label text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupOrder {
    Text(String),
    Month(i32, u32),
}

fn group_of(record: &PriceRecord, group_by: GroupBy) -> (GroupOrder, String) {
    match group_by {
        GroupBy::Product => {
            let key = record.product_name.clone();
            (GroupOrder::Text(key.clone()), key)
        }
        GroupBy::Vendor => {
            let key = simplify_vendor_name(&record.vendor_name);
            (GroupOrder::Text(key.clone()), key)
        }
        GroupBy::Month => {
            let (y, m) = month_key(record.purchase_date);
            (GroupOrder::Month(y, m), month_label(record.purchase_date))
        }
    }
}

/// Group records, sort each group by purchase date and attach deltas.
///
/// Same-date entries keep their input order. Deltas always compare against
/// the chronological predecessor; `Descending` only reverses presentation.
pub fn aggregate(records: &[PriceRecord], group_by: GroupBy, order: SortOrder) -> Vec<GroupedSeries> {
    let mut groups: BTreeMap<GroupOrder, (String, Vec<&PriceRecord>)> = BTreeMap::new();
    for record in records {
        let (sort_key, label) = group_of(record, group_by);
        groups
            .entry(sort_key)
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push(record);
    }

    groups
        .into_values()
        .map(|(key, mut members)| {
            // stable: ties stay in input order
            members.sort_by_key(|r| r.purchase_date);

            let mut entries: Vec<SeriesEntry> = members
                .iter()
                .enumerate()
                .map(|(i, r)| SeriesEntry {
                    record: (*r).clone(),
                    delta: (i > 0).then(|| PriceDelta::between(members[i - 1].unit_price, r.unit_price)),
                })
                .collect();

            if order == SortOrder::Descending {
                entries.sort_by(|a, b| b.record.purchase_date.cmp(&a.record.purchase_date));
            }

            GroupedSeries { key, entries }
        })
        .collect()
}

/// Keep records of one category; `None` keeps everything
pub fn filter_by_category(records: &[PriceRecord], category: Option<Category>) -> Vec<PriceRecord> {
    records
        .iter()
        .filter(|r| category.is_none_or(|c| r.category == c))
        .cloned()
        .collect()
}

/// Case-insensitive substring search on the simplified vendor name
pub fn filter_by_vendor(records: &[PriceRecord], term: &str) -> Vec<PriceRecord> {
    let term = term.trim().to_lowercase();
    records
        .iter()
        .filter(|r| simplify_vendor_name(&r.vendor_name).to_lowercase().contains(&term))
        .cloned()
        .collect()
}

/// Product series for a single vendor, as shown after a duplicate scan
pub fn vendor_comparison(records: &[PriceRecord], vendor: &str) -> Vec<GroupedSeries> {
    let wanted = simplify_vendor_name(vendor);
    let own: Vec<PriceRecord> = records
        .iter()
        .filter(|r| simplify_vendor_name(&r.vendor_name) == wanted)
        .cloned()
        .collect();
    aggregate(&own, GroupBy::Product, SortOrder::Ascending)
}

/// Latest record per product, ordered by product name
pub fn latest_prices(records: &[PriceRecord]) -> Vec<PriceRecord> {
    let mut latest: BTreeMap<&str, &PriceRecord> = BTreeMap::new();
    for r in records {
        match latest.get(r.product_name.as_str()) {
            Some(prev) if prev.purchase_date > r.purchase_date => {}
            _ => {
                latest.insert(&r.product_name, r);
            }
        }
    }
    latest.into_values().cloned().collect()
}

/// Chart series: first chronological price of `product` in each month of `year`
pub fn monthly_prices(records: &[PriceRecord], product: &str, year: i32) -> [Option<f64>; 12] {
    let mut matching: Vec<&PriceRecord> = records
        .iter()
        .filter(|r| r.product_name == product && r.purchase_date.year() == year)
        .collect();
    matching.sort_by_key(|r| r.purchase_date);

    let mut out = [None; 12];
    for r in matching {
        let slot = &mut out[r.purchase_date.month0() as usize];
        if slot.is_none() {
            *slot = Some(r.unit_price);
        }
    }
    out
}

/// Distinct purchase dates of a vendor, newest first
pub fn vendor_dates(records: &[PriceRecord], vendor: &str) -> Vec<NaiveDate> {
    let wanted = simplify_vendor_name(vendor);
    let mut dates: Vec<NaiveDate> = records
        .iter()
        .filter(|r| simplify_vendor_name(&r.vendor_name) == wanted)
        .map(|r| r.purchase_date)
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    dates
}
