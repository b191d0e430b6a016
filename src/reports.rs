use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::ReportError;
use crate::types::{
    CategorySalesEntry, ComparisonMetric, DashboardSummary, OrderLine, PeriodBucket,
    ProductSalesEntry, TimedTotal,
};

pub const DEFAULT_TOP_PRODUCTS: usize = 5;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const QUARTER_LABELS: [&str; 4] = ["T1", "T2", "T3", "T4"];
const YEARLY_SPAN: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    pub fn next(self) -> Self {
        match self {
            Period::Monthly => Period::Quarterly,
            Period::Quarterly => Period::Yearly,
            Period::Yearly => Period::Monthly,
        }
    }
}

impl FromStr for Period {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Period::Monthly),
            "quarterly" => Ok(Period::Quarterly),
            "yearly" => Ok(Period::Yearly),
            _ => Err(ReportError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

/// Sales value per category, highest first.
///
/// Lines without a category are left out. Grouping keeps first-seen order and
/// the sort is stable, so equal totals stay in the order they first appeared.
pub fn aggregate_category_sales(lines: &[OrderLine]) -> Vec<CategorySalesEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<CategorySalesEntry> = Vec::new();

    for line in lines {
        let Some(category) = line.category_name.as_deref() else {
            continue;
        };
        let slot = *index.entry(category).or_insert_with(|| {
            entries.push(CategorySalesEntry {
                category_name: category.to_string(),
                total_value: 0.0,
            });
            entries.len() - 1
        });
        entries[slot].total_value += line.line_total();
    }

    entries.sort_by(|a, b| {
        b.total_value
            .partial_cmp(&a.total_value)
            .unwrap_or(Ordering::Equal)
    });
    entries
}

/// Best sellers by units, at most `limit` of them.
///
/// `percentage_of_top` is relative to the first (largest) entry and rounded
/// half-up; it is 0 for every entry when nothing was sold.
pub fn rank_top_products(lines: &[OrderLine], limit: usize) -> Vec<ProductSalesEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<ProductSalesEntry> = Vec::new();

    for line in lines {
        let (Some(id), Some(name)) = (line.product_id.as_deref(), line.product_name.as_deref())
        else {
            continue;
        };
        let slot = *index.entry(id).or_insert_with(|| {
            entries.push(ProductSalesEntry {
                product_id: id.to_string(),
                product_name: name.to_string(),
                units_sold: 0,
                revenue: 0.0,
                percentage_of_top: 0,
            });
            entries.len() - 1
        });
        let e = &mut entries[slot];
        e.units_sold += u64::from(line.quantity);
        e.revenue += line.line_total();
    }

    entries.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
    entries.truncate(limit);

    let max_units = entries.iter().map(|e| e.units_sold).max().unwrap_or(0);
    if max_units > 0 {
        for e in &mut entries {
            let pct = (e.units_sold as f64 / max_units as f64 * 100.0).round();
            e.percentage_of_top = pct.clamp(0.0, 100.0) as u8;
        }
    }
    entries
}

/// Zero-filled sales series for `period`, anchored on `current_year`.
///
/// Always 12 / 4 / 5 buckets in label order. Rows outside the covered
/// range are ignored.
pub fn bucket_sales(lines: &[TimedTotal], period: Period, current_year: i32) -> Vec<PeriodBucket> {
    let mut buckets: Vec<PeriodBucket> = match period {
        Period::Monthly => MONTH_LABELS.iter().map(|l| zero_bucket(l)).collect(),
        Period::Quarterly => QUARTER_LABELS.iter().map(|l| zero_bucket(l)).collect(),
        Period::Yearly => (current_year - (YEARLY_SPAN - 1)..=current_year)
            .map(|y| zero_bucket(&y.to_string()))
            .collect(),
    };

    for line in lines {
        let year = line.timestamp.year();
        let month0 = line.timestamp.month0() as usize;
        let slot = match period {
            Period::Monthly if year == current_year => Some(month0),
            Period::Quarterly if year == current_year => Some(month0 / 3),
            Period::Yearly if (current_year - (YEARLY_SPAN - 1)..=current_year).contains(&year) => {
                Some((year - (current_year - (YEARLY_SPAN - 1))) as usize)
            }
            _ => None,
        };
        if let Some(slot) = slot {
            buckets[slot].total += line.total;
        }
    }
    buckets
}

fn zero_bucket(label: &str) -> PeriodBucket {
    PeriodBucket {
        label: label.to_string(),
        total: 0.0,
    }
}

/// Relative change from `previous` to `current`, in percent.
///
/// A start from zero counts as a full (100%) increase, and zero to zero is no change.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Compare two pre-filtered windows using `measure` (a sum or a count).
pub fn compare_to_previous_month<T>(
    current: &[T],
    previous: &[T],
    measure: fn(&[T]) -> f64,
) -> ComparisonMetric {
    let current_value = measure(current);
    let previous_value = measure(previous);
    ComparisonMetric {
        current_value,
        previous_value,
        percentage_change: percentage_change(current_value, previous_value),
    }
}

pub fn sum_totals(rows: &[TimedTotal]) -> f64 {
    rows.iter().map(|r| r.total).sum()
}

pub fn count_rows<T>(rows: &[T]) -> f64 {
    rows.len() as f64
}

pub fn summarize(
    today: NaiveDate,
    lines: &[OrderLine],
    completed_sales: &[TimedTotal],
    revenue_growth: ComparisonMetric,
    user_growth: ComparisonMetric,
) -> DashboardSummary {
    let categories = aggregate_category_sales(lines);
    let products: HashSet<&str> = lines
        .iter()
        .filter_map(|l| l.product_id.as_deref())
        .collect();
    DashboardSummary {
        generated_for: today.format("%Y-%m-%d").to_string(),
        total_revenue: sum_totals(completed_sales),
        completed_orders: completed_sales.len(),
        units_sold: lines.iter().map(|l| u64::from(l.quantity)).sum(),
        total_categories: categories.len(),
        total_products: products.len(),
        top_category: categories.first().map(|c| c.category_name.clone()),
        revenue_growth,
        user_growth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn line(qty: u32, price: f64, product: Option<&str>, category: Option<&str>) -> OrderLine {
        OrderLine {
            quantity: qty,
            unit_price: price,
            product_id: product.map(str::to_string),
            product_name: product.map(|p| format!("Product {p}")),
            category_name: category.map(str::to_string),
        }
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn sale(total: f64, y: i32, m: u32) -> TimedTotal {
        TimedTotal {
            total,
            timestamp: at(y, m, 15),
        }
    }

    #[test]
    fn category_scenario() {
        let lines = vec![
            line(2, 10.0, Some("a"), Some("Shoes")),
            line(1, 30.0, Some("b"), Some("Shoes")),
            line(1, 5.0, Some("c"), Some("Hats")),
        ];
        let out = aggregate_category_sales(&lines);
        assert_eq!(
            out,
            vec![
                CategorySalesEntry {
                    category_name: "Shoes".into(),
                    total_value: 50.0,
                },
                CategorySalesEntry {
                    category_name: "Hats".into(),
                    total_value: 5.0,
                },
            ]
        );
    }

    #[test]
    fn category_skips_missing_and_sums_match() {
        let lines = vec![
            line(3, 2.5, Some("a"), Some("Bags")),
            line(4, 100.0, Some("b"), None),
            line(1, 1.0, None, Some("Socks")),
        ];
        let out = aggregate_category_sales(&lines);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| e.category_name != "Unknown"));
        assert!(out.iter().all(|e| e.total_value >= 0.0));
        let expected: f64 = lines
            .iter()
            .filter(|l| l.category_name.is_some())
            .map(|l| l.line_total())
            .sum();
        let got: f64 = out.iter().map(|e| e.total_value).sum();
        assert!((expected - got).abs() < 1e-9);
    }

    #[test]
    fn category_ties_keep_first_seen_order() {
        let lines = vec![
            line(1, 10.0, Some("a"), Some("Rings")),
            line(1, 10.0, Some("b"), Some("Scarves")),
            line(1, 30.0, Some("c"), Some("Coats")),
            line(1, 10.0, Some("d"), Some("Belts")),
        ];
        let names: Vec<String> = aggregate_category_sales(&lines)
            .into_iter()
            .map(|e| e.category_name)
            .collect();
        assert_eq!(names, vec!["Coats", "Rings", "Scarves", "Belts"]);
    }

    #[test]
    fn empty_inputs_give_empty_outputs() {
        assert!(aggregate_category_sales(&[]).is_empty());
        assert!(rank_top_products(&[], DEFAULT_TOP_PRODUCTS).is_empty());
    }

    #[test]
    fn top_products_scenario() {
        let lines = vec![
            line(5, 20.0, Some("B"), Some("Hats")),
            line(6, 10.0, Some("A"), Some("Shoes")),
            line(4, 10.0, Some("A"), Some("Shoes")),
        ];
        let out = rank_top_products(&lines, DEFAULT_TOP_PRODUCTS);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].product_id, "A");
        assert_eq!(out[0].units_sold, 10);
        assert_eq!(out[0].revenue, 100.0);
        assert_eq!(out[0].percentage_of_top, 100);
        assert_eq!(out[1].product_id, "B");
        assert_eq!(out[1].units_sold, 5);
        assert_eq!(out[1].percentage_of_top, 50);
    }

    #[test]
    fn top_products_respects_limit_and_order() {
        let lines: Vec<OrderLine> = (0..9u32)
            .map(|i| line(i % 4 + 1, 1.0, Some(format!("p{i}").as_str()), None))
            .collect();
        let out = rank_top_products(&lines, 3);
        assert!(out.len() <= 3);
        assert!(out.windows(2).all(|w| w[0].units_sold >= w[1].units_sold));
    }

    #[test]
    fn top_products_keeps_first_name_and_skips_unknown() {
        let mut renamed = line(1, 1.0, Some("x"), None);
        renamed.product_name = Some("Later name".into());
        let lines = vec![
            line(2, 1.0, Some("x"), None),
            renamed,
            line(9, 1.0, None, None),
        ];
        let out = rank_top_products(&lines, 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].product_name, "Product x");
        assert_eq!(out[0].units_sold, 3);
    }

    #[test]
    fn top_products_ties_keep_first_seen_order() {
        let lines = vec![
            line(3, 1.0, Some("A"), None),
            line(3, 2.0, Some("B"), None),
            line(7, 1.0, Some("C"), None),
            line(3, 4.0, Some("D"), None),
        ];
        let ids: Vec<String> = rank_top_products(&lines, 5)
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(ids, vec!["C", "A", "B", "D"]);

        let cut: Vec<String> = rank_top_products(&lines, 2)
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(cut, vec!["C", "A"]);
    }

    #[test]
    fn percentage_of_top_rounds_half_up_and_handles_zero() {
        let lines = vec![
            line(8, 1.0, Some("a"), None),
            line(1, 1.0, Some("b"), None),
            line(3, 1.0, Some("c"), None),
        ];
        let out = rank_top_products(&lines, 5);
        // 1/8 = 12.5% and 3/8 = 37.5%
        assert_eq!(out[1].percentage_of_top, 38);
        assert_eq!(out[2].percentage_of_top, 13);

        let zero = rank_top_products(&[line(0, 9.0, Some("a"), None)], 5);
        assert_eq!(zero[0].percentage_of_top, 0);
    }

    #[test]
    fn monthly_buckets_are_always_twelve() {
        let empty = bucket_sales(&[], Period::Monthly, 2026);
        assert_eq!(empty.len(), 12);
        assert!(empty.iter().all(|b| b.total == 0.0));
        assert_eq!(empty[0].label, "Jan");
        assert_eq!(empty[11].label, "Dec");

        let rows = vec![sale(10.0, 2026, 3), sale(5.0, 2026, 3), sale(99.0, 2025, 3)];
        let out = bucket_sales(&rows, Period::Monthly, 2026);
        assert_eq!(out.len(), 12);
        assert_eq!(out[2].total, 15.0);
        assert_eq!(out.iter().map(|b| b.total).sum::<f64>(), 15.0);
    }

    #[test]
    fn quarterly_buckets() {
        let rows = vec![
            sale(1.0, 2026, 1),
            sale(2.0, 2026, 4),
            sale(3.0, 2026, 12),
            sale(4.0, 2024, 6),
        ];
        let out = bucket_sales(&rows, Period::Quarterly, 2026);
        let labels: Vec<&str> = out.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["T1", "T2", "T3", "T4"]);
        let totals: Vec<f64> = out.iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![1.0, 2.0, 0.0, 3.0]);
    }

    #[test]
    fn yearly_buckets_cover_five_years() {
        let rows = vec![
            sale(1.0, 2021, 5),
            sale(2.0, 2022, 5),
            sale(3.0, 2026, 1),
            sale(7.0, 2027, 1),
        ];
        let out = bucket_sales(&rows, Period::Yearly, 2026);
        let labels: Vec<&str> = out.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2022", "2023", "2024", "2025", "2026"]);
        assert_eq!(out[0].total, 2.0);
        assert_eq!(out[4].total, 3.0);
    }

    #[test]
    fn period_parses_and_rejects() {
        assert_eq!("Quarterly".parse::<Period>().unwrap(), Period::Quarterly);
        assert!(matches!("weekly".parse::<Period>(), Err(ReportError::InvalidPeriod(_))));
        assert_eq!(Period::Yearly.next(), Period::Monthly);
        assert_eq!(Period::Monthly.to_string(), "monthly");
    }

    #[test]
    fn percentage_change_rules() {
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert_eq!(percentage_change(50.0, 0.0), 100.0);
        assert_eq!(percentage_change(100.0, 200.0), -50.0);
        assert_eq!(percentage_change(300.0, 200.0), 50.0);
    }

    #[test]
    fn comparison_sums_and_counts() {
        let current = vec![sale(100.0, 2026, 10)];
        let previous = vec![sale(150.0, 2026, 9), sale(50.0, 2026, 9)];

        let revenue = compare_to_previous_month(&current, &previous, sum_totals);
        assert_eq!(revenue.current_value, 100.0);
        assert_eq!(revenue.previous_value, 200.0);
        assert_eq!(revenue.percentage_change, -50.0);

        let users = compare_to_previous_month(&current, &previous, count_rows);
        assert_eq!(users.current_value, 1.0);
        assert_eq!(users.previous_value, 2.0);
        assert_eq!(users.percentage_change, -50.0);
    }

    #[test]
    fn aggregators_are_idempotent() {
        let lines = vec![
            line(2, 3.0, Some("a"), Some("Hats")),
            line(1, 7.0, Some("b"), Some("Shoes")),
            line(2, 3.5, Some("a"), Some("Hats")),
        ];
        let rows = vec![sale(5.0, 2026, 2), sale(6.0, 2025, 7)];
        assert_eq!(aggregate_category_sales(&lines), aggregate_category_sales(&lines));
        assert_eq!(rank_top_products(&lines, 5), rank_top_products(&lines, 5));
        assert_eq!(
            bucket_sales(&rows, Period::Yearly, 2026),
            bucket_sales(&rows, Period::Yearly, 2026)
        );
    }

    #[test]
    fn summary_collects_headline_numbers() {
        let lines = vec![
            line(2, 10.0, Some("a"), Some("Shoes")),
            line(1, 5.0, Some("b"), Some("Hats")),
            line(1, 5.0, Some("b"), None),
        ];
        let sales = vec![sale(25.0, 2026, 10), sale(5.0, 2026, 9)];
        let flat = ComparisonMetric {
            current_value: 0.0,
            previous_value: 0.0,
            percentage_change: 0.0,
        };
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let s = summarize(today, &lines, &sales, flat, flat);
        assert_eq!(s.generated_for, "2026-10-16");
        assert_eq!(s.total_revenue, 30.0);
        assert_eq!(s.completed_orders, 2);
        assert_eq!(s.units_sold, 4);
        assert_eq!(s.total_categories, 2);
        assert_eq!(s.total_products, 2);
        assert_eq!(s.top_category.as_deref(), Some("Shoes"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const PRODUCTS: [&str; 4] = ["a", "b", "c", "d"];
        const CATEGORIES: [&str; 3] = ["Shoes", "Hats", "Bags"];

        fn arb_line() -> impl Strategy<Value = OrderLine> {
            (
                0u32..=50,
                0u32..=10_000,
                prop::option::of(prop::sample::select(PRODUCTS.to_vec())),
                prop::option::of(prop::sample::select(CATEGORIES.to_vec())),
            )
                .prop_map(|(qty, cents, product, category)| {
                    line(qty, f64::from(cents) / 100.0, product, category)
                })
        }

        fn arb_sale() -> impl Strategy<Value = TimedTotal> {
            (0u32..=100_000, 2019i32..=2027, 1u32..=12)
                .prop_map(|(cents, y, m)| sale(f64::from(cents) / 100.0, y, m))
        }

        #[test]
        fn category_totals_match_line_totals() {
            proptest!(|(lines in prop::collection::vec(arb_line(), 0..40))| {
                let out = aggregate_category_sales(&lines);
                prop_assert!(out.iter().all(|e| e.total_value >= 0.0));
                prop_assert!(out.windows(2).all(|w| w[0].total_value >= w[1].total_value));
                let expected: f64 = lines
                    .iter()
                    .filter(|l| l.category_name.is_some())
                    .map(|l| l.line_total())
                    .sum();
                let got: f64 = out.iter().map(|e| e.total_value).sum();
                prop_assert!((expected - got).abs() < 1e-6);
                prop_assert_eq!(out, aggregate_category_sales(&lines));
            });
        }

        #[test]
        fn top_products_are_bounded_and_sorted() {
            proptest!(|(lines in prop::collection::vec(arb_line(), 0..40), limit in 0usize..=6)| {
                let out = rank_top_products(&lines, limit);
                prop_assert!(out.len() <= limit);
                prop_assert!(out.windows(2).all(|w| w[0].units_sold >= w[1].units_sold));
                prop_assert!(out.iter().all(|e| e.percentage_of_top <= 100));
                if let Some(first) = out.first() {
                    if first.units_sold > 0 {
                        prop_assert_eq!(first.percentage_of_top, 100);
                    }
                }
                prop_assert_eq!(out, rank_top_products(&lines, limit));
            });
        }

        #[test]
        fn bucket_counts_are_fixed() {
            proptest!(|(rows in prop::collection::vec(arb_sale(), 0..40), year in 2020i32..=2027)| {
                prop_assert_eq!(bucket_sales(&rows, Period::Monthly, year).len(), 12);
                prop_assert_eq!(bucket_sales(&rows, Period::Quarterly, year).len(), 4);
                let yearly = bucket_sales(&rows, Period::Yearly, year);
                prop_assert_eq!(yearly.len(), 5);
                prop_assert!(yearly.iter().all(|b| b.total >= 0.0));
                prop_assert_eq!(yearly, bucket_sales(&rows, Period::Yearly, year));
            });
        }
    }
}
