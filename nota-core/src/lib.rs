//! nota-core: canonical price records, product classification and price history views

pub mod classifier;
pub mod dates;
pub mod history;
pub mod record;
pub mod vendor;

pub use classifier::{classify, Classifier, KeywordRule, KeywordTable};
pub use dates::{normalize_date, month_label, DateFormatError};
pub use history::{
    aggregate, filter_by_category, filter_by_vendor, latest_prices, monthly_prices,
    vendor_comparison, vendor_dates, GroupBy, GroupedSeries, PriceDelta, SeriesEntry, SortOrder,
};
pub use record::{Category, NewPriceRecord, PriceRecord};
pub use vendor::{simplify_vendor_name, UNKNOWN_VENDOR};
