// Flattens fetched order items into `OrderLine`s.
//
// This is the only place that looks at the nested join shape. Missing
// product or category links are kept (the aggregators skip them); rows whose
// quantity or price cannot be trusted are dropped here with a warning.
use serde_json::Value;
use tracing::warn;

use crate::relation::Related;
use crate::types::{OrderLine, OrderStatus, RawOrderItem, RawProduct};
use crate::util::parse_f64_safe;

#[derive(Debug, Clone, Copy)]
pub struct LineFilter {
    /// Keep only items whose parent order is `completed`.
    pub completed_only: bool,
}

impl Default for LineFilter {
    fn default() -> Self {
        Self {
            completed_only: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub total_items: usize,
    /// Rows dropped before normalization because their shape did not fit.
    pub unreadable: usize,
    pub kept: usize,
    pub skipped_invalid: usize,
    pub skipped_status: usize,
    pub missing_product: usize,
    pub missing_category: usize,
}

pub fn normalize_order_items(
    raw: Vec<RawOrderItem>,
    filter: &LineFilter,
) -> (Vec<OrderLine>, NormalizeReport) {
    let mut report = NormalizeReport {
        total_items: raw.len(),
        ..Default::default()
    };
    let mut lines = Vec::with_capacity(raw.len());

    for (idx, item) in raw.into_iter().enumerate() {
        if filter.completed_only {
            let completed = item
                .orders
                .as_ref()
                .and_then(Related::first)
                .and_then(|o| o.status.as_deref())
                .map(|s| OrderStatus::parse(s).is_completed())
                .unwrap_or(false);
            if !completed {
                report.skipped_status += 1;
                continue;
            }
        }

        let Some(quantity) = parse_quantity(item.quantity.as_ref()) else {
            warn!(
                row = idx,
                quantity = ?item.quantity,
                "Skipping order item with invalid quantity"
            );
            report.skipped_invalid += 1;
            continue;
        };
        let Some(unit_price) = parse_price(item.price.as_ref()) else {
            warn!(row = idx, price = ?item.price, "Skipping order item with invalid price");
            report.skipped_invalid += 1;
            continue;
        };

        let product: Option<RawProduct> = item.products.and_then(Related::into_first);
        let (product_id, product_name, category_name) = match product {
            Some(p) => {
                let category = p
                    .categories
                    .and_then(Related::into_first)
                    .and_then(|c| non_blank(c.name));
                (p.id.as_ref().and_then(value_to_string), non_blank(p.name), category)
            }
            None => (None, None, None),
        };

        if product_id.is_none() || product_name.is_none() {
            report.missing_product += 1;
        }
        if category_name.is_none() {
            report.missing_category += 1;
        }

        lines.push(OrderLine {
            quantity,
            unit_price,
            product_id,
            product_name,
            category_name,
        });
    }

    report.kept = lines.len();
    (lines, report)
}

fn parse_number(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

fn parse_quantity(v: Option<&Value>) -> Option<u32> {
    let q = parse_number(v)?;
    if !q.is_finite() || q < 0.0 || q.fract() != 0.0 || q > u32::MAX as f64 {
        return None;
    }
    Some(q as u32)
}

fn parse_price(v: Option<&Value>) -> Option<f64> {
    parse_number(v).filter(|p| p.is_finite() && *p >= 0.0)
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => non_blank(Some(s.clone())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
