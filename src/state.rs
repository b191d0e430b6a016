// Explicit application state handed to every CLI handler.
//
// Fetched datasets are cached under a serialized request descriptor so that
// generating reports repeatedly does not re-read the exports. A reload clears
// every cache before fetching again.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::loader::{load_order_items, load_orders, load_signups, LoadReport};
use crate::normalize::{normalize_order_items, LineFilter, NormalizeReport};
use crate::reports::Period;
use crate::types::{OrderLine, OrderRecord, Signup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    OrderItems,
    Orders,
    Profiles,
}

/// Everything that distinguishes one fetch from another.
#[derive(Debug, Serialize)]
pub struct FetchKey<'a> {
    pub source: Source,
    pub path: &'a Path,
    pub completed_only: bool,
}

impl FetchKey<'_> {
    pub fn cache_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug)]
pub struct FetchCache<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for FetchCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> FetchCache<V> {
    /// Return the cached value for `key`, running `load` only on a miss.
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<F>(&mut self, key: &FetchKey<'_>, load: F) -> Result<&V>
    where
        F: FnOnce() -> Result<V>,
    {
        use std::collections::hash_map::Entry;

        match self.entries.entry(key.cache_key()?) {
            Entry::Occupied(slot) => {
                debug!(key = %slot.key(), "Fetch cache hit");
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                debug!(key = %slot.key(), "Fetch cache miss");
                let value = load()?;
                Ok(slot.insert(value))
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct AppState {
    pub config: Config,
    pub period: Period,
    lines: FetchCache<(Vec<OrderLine>, NormalizeReport)>,
    orders: FetchCache<(Vec<OrderRecord>, LoadReport)>,
    signups: FetchCache<(Vec<Signup>, LoadReport)>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            period: config.period,
            config,
            lines: FetchCache::default(),
            orders: FetchCache::default(),
            signups: FetchCache::default(),
        }
    }

    pub fn order_lines(&mut self) -> Result<(Vec<OrderLine>, NormalizeReport)> {
        let path: PathBuf = self.config.order_items_path.clone();
        let filter = LineFilter {
            completed_only: self.config.completed_only,
        };
        let key = FetchKey {
            source: Source::OrderItems,
            path: &path,
            completed_only: filter.completed_only,
        };
        let cached = self.lines.get_or_load(&key, || {
            let (raw, load_report) = load_order_items(&path)?;
            let (lines, mut report) = normalize_order_items(raw, &filter);
            report.unreadable = load_report.parse_errors;
            report.total_items += load_report.parse_errors;
            info!(
                kept = report.kept,
                unreadable = report.unreadable,
                skipped_invalid = report.skipped_invalid,
                skipped_status = report.skipped_status,
                missing_category = report.missing_category,
                "Normalized order items"
            );
            Ok((lines, report))
        })?;
        Ok(cached.clone())
    }

    pub fn orders(&mut self) -> Result<(Vec<OrderRecord>, LoadReport)> {
        let path = self.config.orders_path.clone();
        let key = FetchKey {
            source: Source::Orders,
            path: &path,
            completed_only: false,
        };
        let cached = self.orders.get_or_load(&key, || load_orders(&path))?;
        Ok(cached.clone())
    }

    pub fn signups(&mut self) -> Result<(Vec<Signup>, LoadReport)> {
        let path = self.config.profiles_path.clone();
        let key = FetchKey {
            source: Source::Profiles,
            path: &path,
            completed_only: false,
        };
        let cached = self.signups.get_or_load(&key, || load_signups(&path))?;
        Ok(cached.clone())
    }

    pub fn invalidate(&mut self, source: Source) {
        debug!(?source, "Invalidating fetch cache");
        match source {
            Source::OrderItems => self.lines.invalidate(),
            Source::Orders => self.orders.invalidate(),
            Source::Profiles => self.signups.invalidate(),
        }
    }

    pub fn invalidate_all(&mut self) {
        for source in [Source::OrderItems, Source::Orders, Source::Profiles] {
            self.invalidate(source);
        }
    }

    pub fn has_data(&self) -> bool {
        !self.lines.is_empty() && !self.orders.is_empty() && !self.signups.is_empty()
    }
}
