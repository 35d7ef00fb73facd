use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::{MoversError, Result};

/// How two movers with the same change are ranked against each other.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// "BBB" outranks "DDD" at equal change.
    #[default]
    SymbolAscending,
    SymbolDescending,
}

/// One scraped listing row: ticker and its intraday percent change.
#[derive(Debug, Clone, PartialEq)]
pub struct Mover {
    pub symbol: String,
    pub change: f64,
}

/// Heap key. Greater means "ranks higher": larger change first, then the
/// symbol order picked by the tie-break policy.
#[derive(Debug, Clone)]
struct RankKey {
    mover: Mover,
    tie_break: TieBreak,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_change = self.mover.change.total_cmp(&other.mover.change);
        let by_symbol = match self.tie_break {
            TieBreak::SymbolAscending => other.mover.symbol.cmp(&self.mover.symbol),
            TieBreak::SymbolDescending => self.mover.symbol.cmp(&other.mover.symbol),
        };
        by_change.then(by_symbol)
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// Keeps the `capacity` greatest items seen so far in a min-oriented heap.
pub struct BoundedTopK<T: Ord> {
    capacity: usize,
    heap: BinaryHeap<Reverse<T>>,
}

impl<T: Ord> BoundedTopK<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
        }
    }

    pub fn push(&mut self, item: T) {
        self.heap.push(Reverse(item));
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drains the heap greatest first.
    pub fn into_sorted_desc(self) -> Vec<T> {
        // `into_sorted_vec` is ascending over `Reverse<T>`, i.e. descending over `T`.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(item)| item)
            .collect()
    }
}

impl<T: Ord> Extend<T> for BoundedTopK<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

/// Returns at most `k` movers, largest change first.
///
/// `-0.0` and `0.0` count as the same change, so they tie on symbol.
pub fn top_movers<I>(changes: I, k: usize, tie_break: TieBreak) -> Vec<Mover>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut selector = BoundedTopK::new(k);
    selector.extend(changes.into_iter().map(|(symbol, change)| RankKey {
        // Adding 0.0 turns -0.0 into 0.0 and leaves every other value alone.
        mover: Mover { symbol, change: change + 0.0 },
        tie_break,
    }));
    selector
        .into_sorted_desc()
        .into_iter()
        .map(|key| key.mover)
        .collect()
}

/// Like [`top_movers`], but fails unless exactly `k` movers are available.
pub fn top_movers_exact<I>(changes: I, k: usize, tie_break: TieBreak) -> Result<Vec<Mover>>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let movers = top_movers(changes, k, tie_break);
    if movers.len() < k {
        return Err(MoversError::NotEnoughMovers {
            required: k,
            available: movers.len(),
        });
    }
    Ok(movers)
}
