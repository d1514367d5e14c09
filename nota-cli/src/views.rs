//! Terminal rendering of price history views

use nota_core::dates::to_receipt_format;
use nota_core::{GroupedSeries, PriceDelta, PriceRecord};

const MONTHS_SHORT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// `R$ 1234,50`
pub fn brl(value: f64) -> String {
    format!("R$ {:.2}", value).replace('.', ",")
}

pub fn delta(d: &PriceDelta) -> String {
    let sign = if d.absolute > 0.0 { "+" } else { "" };
    let abs = format!("{sign}{:.2}", d.absolute).replace('.', ",");
    match d.percent {
        Some(p) => format!("{abs} ({sign}{:.1}%)", p).replace('.', ","),
        None => format!("{abs} (n/a)"),
    }
}

pub fn print_series(series: &[GroupedSeries]) {
    if series.is_empty() {
        println!("(no records)");
        return;
    }
    for group in series {
        println!("## {}", group.key);
        for e in &group.entries {
            let r = &e.record;
            let change = e.delta.as_ref().map(delta).unwrap_or_default();
            println!(
                "  {}  {:<32} {:>12}  {}  [{}] {}",
                to_receipt_format(r.purchase_date),
                r.product_name,
                brl(r.unit_price),
                r.vendor_name,
                r.category,
                change
            );
        }
        println!();
    }
}

pub fn print_records(records: &[PriceRecord]) {
    for r in records {
        println!(
            "- {:<32} {:>12}  {}  {}  [{}]",
            r.product_name,
            brl(r.unit_price),
            r.vendor_name,
            to_receipt_format(r.purchase_date),
            r.category
        );
    }
}

pub fn print_monthly(product: &str, year: i32, months: &[Option<f64>; 12]) {
    println!("{product} ({year})");
    for (i, m) in months.iter().enumerate() {
        let value = m.map(brl).unwrap_or_else(|| "-".to_string());
        println!("  {}  {:>12}", MONTHS_SHORT[i], value);
    }
}
