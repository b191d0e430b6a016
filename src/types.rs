use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

use crate::relation::Related;
use crate::util::{format_change, format_int, format_number};

// ---------------------------------------------------------------------------
// Fetched shapes
// ---------------------------------------------------------------------------

/// One element of the `order_items` export with its embedded product and order.
///
/// Numeric fields stay as raw JSON values: the backend may hand them over as
/// numbers or as numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOrderItem {
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, alias = "unit_price")]
    pub price: Option<Value>,
    #[serde(default, alias = "product")]
    pub products: Option<Related<RawProduct>>,
    #[serde(default, alias = "order")]
    pub orders: Option<Related<RawOrderRef>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "category")]
    pub categories: Option<Related<RawCategory>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOrderRef {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawOrderRow {
    pub id: Option<String>,
    pub total: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawProfileRow {
    pub id: Option<String>,
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Clean records
// ---------------------------------------------------------------------------

/// A purchased quantity of one product, flattened out of its joins.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub quantity: u32,
    pub unit_price: f64,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
}

impl OrderLine {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Completed,
    Pending,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => OrderStatus::Completed,
            "pending" => OrderStatus::Pending,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: String,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}

impl OrderRecord {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn to_timed(&self) -> TimedTotal {
        TimedTotal {
            total: self.total,
            timestamp: self.created_at,
        }
    }
}

/// An amount stamped with the moment it was booked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedTotal {
    pub total: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signup {
    pub user_id: String,
    pub created_at: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Aggregation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySalesEntry {
    pub category_name: String,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSalesEntry {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: u64,
    pub revenue: f64,
    pub percentage_of_top: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComparisonMetric {
    pub current_value: f64,
    pub previous_value: f64,
    pub percentage_change: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub generated_for: String,
    pub total_revenue: f64,
    pub completed_orders: usize,
    pub units_sold: u64,
    pub total_categories: usize,
    pub total_products: usize,
    pub top_category: Option<String>,
    pub revenue_growth: ComparisonMetric,
    pub user_growth: ComparisonMetric,
}

// ---------------------------------------------------------------------------
// Display rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategorySalesRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "TotalValue")]
    #[tabled(rename = "TotalValue")]
    pub total_value: String,
}

impl From<&CategorySalesEntry> for CategorySalesRow {
    fn from(e: &CategorySalesEntry) -> Self {
        Self {
            category: e.category_name.clone(),
            total_value: format_number(e.total_value, 2),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopProductRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Product")]
    #[tabled(rename = "Product")]
    pub product: String,
    #[serde(rename = "UnitsSold")]
    #[tabled(rename = "UnitsSold")]
    pub units_sold: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "PctOfTop")]
    #[tabled(rename = "PctOfTop")]
    pub percentage_of_top: u8,
}

impl TopProductRow {
    pub fn ranked(entries: &[ProductSalesEntry]) -> Vec<Self> {
        entries
            .iter()
            .enumerate()
            .map(|(idx, e)| TopProductRow {
                rank: idx + 1,
                product: e.product_name.clone(),
                units_sold: format_int(e.units_sold),
                revenue: format_number(e.revenue, 2),
                percentage_of_top: e.percentage_of_top,
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PeriodRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

impl From<&PeriodBucket> for PeriodRow {
    fn from(b: &PeriodBucket) -> Self {
        Self {
            period: b.label.clone(),
            total: format_number(b.total, 2),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GrowthRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "CurrentMonth")]
    #[tabled(rename = "CurrentMonth")]
    pub current: String,
    #[serde(rename = "PreviousMonth")]
    #[tabled(rename = "PreviousMonth")]
    pub previous: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
}

impl GrowthRow {
    pub fn new(metric: &str, m: &ComparisonMetric, decimals: usize) -> Self {
        Self {
            metric: metric.to_string(),
            current: format_number(m.current_value, decimals),
            previous: format_number(m.previous_value, decimals),
            change: format_change(m.percentage_change),
        }
    }
}
