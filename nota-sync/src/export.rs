//! Flatten grouped price series into CSV rows

use std::io::Write;

use anyhow::Result;
use nota_core::dates::to_store_format;
use nota_core::GroupedSeries;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    group: &'a str,
    date: String,
    product: &'a str,
    vendor: &'a str,
    category: &'a str,
    unit_price: String,
    delta_abs: Option<String>,
    delta_pct: Option<String>,
}

/// Write one row per series entry; missing deltas are empty cells
pub fn write_series_csv<W: Write>(series: &[GroupedSeries], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for group in series {
        for entry in &group.entries {
            let r = &entry.record;
            wtr.serialize(SeriesRow {
                group: &group.key,
                date: to_store_format(r.purchase_date),
                product: &r.product_name,
                vendor: &r.vendor_name,
                category: r.category.as_str(),
                unit_price: format!("{:.2}", r.unit_price),
                delta_abs: entry.delta.map(|d| format!("{:.2}", d.absolute)),
                delta_pct: entry
                    .delta
                    .and_then(|d| d.percent)
                    .map(|p| format!("{p:.2}")),
            })?;
            rows += 1;
        }
    }
    wtr.flush()?;
    Ok(rows)
}
