//! Date-indexed cache of daily history rows.
//!
//! Every day of a range that was fetched with both bounds is recorded: days
//! the provider returned a row for hold `Some(row)`, the rest hold `None`
//! ("queried, no trading"). A day with no entry at all has never been queried.
//! The cache only grows; it lives exactly as long as its owning security.

use std::collections::BTreeMap;

use crate::domain::{HistoryRecord, HistoryRow, TradingDay};

/// How a history query treats the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve fully covered ranges from the cache; otherwise fetch and merge. (Default)
    #[default]
    Use,
    /// Always fetch, then merge the response into the cache.
    Refresh,
    /// Always fetch and leave the cache untouched.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryCache {
    days: BTreeMap<TradingDay, Option<HistoryRow>>,
    stats: CacheStats,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for `[from, to]` when every day of the range is known, gap days dropped.
    ///
    /// Walks the range day by day, so two separately fetched ranges with a hole
    /// between them never answer a query spanning the hole.
    pub fn lookup(&mut self, from: TradingDay, to: TradingDay) -> Option<Vec<(TradingDay, HistoryRow)>> {
        let mut rows = Vec::new();
        for day in from.through(to) {
            match self.days.get(&day) {
                Some(Some(row)) => rows.push((day, *row)),
                Some(None) => {}
                None => {
                    self.stats.misses += 1;
                    return None;
                }
            }
        }

        self.stats.hits += 1;
        Some(rows)
    }

    /// Merges freshly fetched rows. With both bounds known, every day of the
    /// range without a row is recorded as a gap. Fetched rows overwrite
    /// earlier entries for the same day, including earlier gap markers.
    ///
    /// Returns the fetched rows inside `bounds`, in date order.
    pub fn merge(
        &mut self,
        records: &[HistoryRecord],
        bounds: Option<(TradingDay, TradingDay)>,
    ) -> Vec<(TradingDay, HistoryRow)> {
        let fetched = Self::index(records);

        if let Some((from, to)) = bounds {
            for day in from.through(to) {
                self.days
                    .insert(day, fetched.get(&day).copied());
            }
        }
        for (day, row) in &fetched {
            self.days.insert(*day, Some(*row));
        }

        Self::within(fetched, bounds)
    }

    /// Fetched rows inside `bounds` without touching any cache.
    pub fn requested(
        records: &[HistoryRecord],
        bounds: Option<(TradingDay, TradingDay)>,
    ) -> Vec<(TradingDay, HistoryRow)> {
        Self::within(Self::index(records), bounds)
    }

    fn within(
        fetched: BTreeMap<TradingDay, HistoryRow>,
        bounds: Option<(TradingDay, TradingDay)>,
    ) -> Vec<(TradingDay, HistoryRow)> {
        match bounds {
            Some((from, to)) => fetched.range(from..=to).map(|(day, row)| (*day, *row)).collect(),
            None => fetched.into_iter().collect(),
        }
    }

    /// Fetched rows keyed by day, later duplicates winning.
    pub fn index(records: &[HistoryRecord]) -> BTreeMap<TradingDay, HistoryRow> {
        records
            .iter()
            .map(|record| (record.trade_date, record.row))
            .collect()
    }

    pub fn get(&self, day: TradingDay) -> Option<Option<&HistoryRow>> {
        self.days.get(&day).map(Option::as_ref)
    }

    pub fn contains(&self, day: TradingDay) -> bool {
        self.days.contains_key(&day)
    }

    /// Whether `day` was queried and found to have no trading.
    pub fn is_gap(&self, day: TradingDay) -> bool {
        matches!(self.days.get(&day), Some(None))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Maximal runs of consecutive known days, in order.
    pub fn covered_ranges(&self) -> Vec<(TradingDay, TradingDay)> {
        let mut ranges: Vec<(TradingDay, TradingDay)> = Vec::new();
        for day in self.days.keys().copied() {
            match ranges.last_mut() {
                Some((_, end)) if end.next() == Some(day) => *end = day,
                _ => ranges.push((day, day)),
            }
        }
        ranges
    }
}
