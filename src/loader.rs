use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::{OrderRecord, OrderStatus, RawOrderItem, RawOrderRow, RawProfileRow, Signup};
use crate::util::{parse_f64_safe, parse_timestamp_safe};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

pub fn load_order_items(path: impl AsRef<Path>) -> Result<(Vec<RawOrderItem>, LoadReport)> {
    let file = File::open(path.as_ref())?;
    let (items, report) = read_order_items(BufReader::new(file))?;
    info!(
        path = %path.as_ref().display(),
        rows = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "Loaded order items"
    );
    Ok((items, report))
}

/// Read the JSON array of order items. A document that is not an array is an
/// error; an element whose shape does not fit is skipped and counted.
pub fn read_order_items<R: Read>(reader: R) -> Result<(Vec<RawOrderItem>, LoadReport)> {
    let rows: Vec<Value> = serde_json::from_reader(reader)?;
    let mut report = LoadReport {
        total_rows: rows.len(),
        ..Default::default()
    };
    let mut items = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<RawOrderItem>(row) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(row = idx, error = %e, "Skipping unreadable order item");
                report.parse_errors += 1;
            }
        }
    }

    report.loaded_rows = items.len();
    Ok((items, report))
}

pub fn load_orders(path: impl AsRef<Path>) -> Result<(Vec<OrderRecord>, LoadReport)> {
    let file = File::open(path.as_ref())?;
    let (orders, report) = read_orders(file)?;
    info!(
        path = %path.as_ref().display(),
        rows = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "Loaded orders"
    );
    Ok((orders, report))
}

pub fn read_orders<R: Read>(reader: R) -> Result<(Vec<OrderRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
    let mut report = LoadReport::default();
    let mut orders = Vec::new();

    for (idx, result) in rdr.deserialize::<RawOrderRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = idx, error = %e, "Skipping unreadable order row");
                report.parse_errors += 1;
                continue;
            }
        };

        let total = match parse_f64_safe(row.total.as_deref()) {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!(row = idx, total = ?row.total, "Skipping order with invalid total");
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(created_at) = parse_timestamp_safe(row.created_at.as_deref()) else {
            warn!(row = idx, created_at = ?row.created_at, "Skipping order with invalid timestamp");
            report.parse_errors += 1;
            continue;
        };
        let id = row
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("row-{}", idx + 1));
        let status = OrderStatus::parse(row.status.as_deref().unwrap_or(""));

        orders.push(OrderRecord {
            id,
            total,
            status,
            created_at,
        });
    }

    report.loaded_rows = orders.len();
    Ok((orders, report))
}

pub fn load_signups(path: impl AsRef<Path>) -> Result<(Vec<Signup>, LoadReport)> {
    let file = File::open(path.as_ref())?;
    let (signups, report) = read_signups(file)?;
    info!(
        path = %path.as_ref().display(),
        rows = report.total_rows,
        loaded = report.loaded_rows,
        skipped = report.parse_errors,
        "Loaded signups"
    );
    Ok((signups, report))
}

pub fn read_signups<R: Read>(reader: R) -> Result<(Vec<Signup>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
    let mut report = LoadReport::default();
    let mut signups = Vec::new();

    for (idx, result) in rdr.deserialize::<RawProfileRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };
        let (Some(user_id), Some(created_at)) = (
            row.id.filter(|s| !s.is_empty()),
            parse_timestamp_safe(row.created_at.as_deref()),
        ) else {
            warn!(row = idx, "Skipping profile without id or signup date");
            report.parse_errors += 1;
            continue;
        };
        signups.push(Signup {
            user_id,
            created_at,
        });
    }

    report.loaded_rows = signups.len();
    Ok((signups, report))
}
