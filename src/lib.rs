// Sales analytics for the storefront dashboard.
//
// Exports fetched from the backend are loaded (`loader`), flattened into
// typed order lines (`normalize`), and fed to the pure aggregators in
// `reports`: category breakdowns, top products, period series and
// month-over-month comparisons.
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod relation;
pub mod reports;
pub mod state;
pub mod types;
pub mod util;
pub mod window;

pub use error::{ReportError, Result};
pub use reports::{
    aggregate_category_sales, bucket_sales, compare_to_previous_month, rank_top_products, Period,
};
