//! Sorted index keyed by (mz, rt), queried by an mz band plus an rt filter

use std::cmp::Ordering;

use crate::error::{MatchError, Result};
use crate::point::Coordinates;

/// Secondary-key filter applied to candidates inside the mz band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RtFilter {
    /// Ignore retention time entirely
    Any,
    /// `rt` falls inside the candidate's `[rt_min, rt_max]` window widened by `tolerance`
    Within { rt: f64, tolerance: f64 },
    /// The candidate's window lies inside `[rt_min, rt_max]` widened by `tolerance`
    ContainedIn {
        rt_min: f64,
        rt_max: f64,
        tolerance: f64,
    },
}

impl RtFilter {
    /// Filter on a single retention time against each candidate's window
    pub fn within(rt: f64, tolerance: f64) -> Self {
        RtFilter::Within { rt, tolerance }
    }

    /// Filter on candidates whose window fits inside `reference`'s window
    pub fn contained_in<C: Coordinates>(reference: &C, tolerance: f64) -> Self {
        RtFilter::ContainedIn {
            rt_min: reference.rt_min(),
            rt_max: reference.rt_max(),
            tolerance,
        }
    }

    pub fn matches<C: Coordinates>(&self, candidate: &C) -> bool {
        match *self {
            RtFilter::Any => true,
            RtFilter::Within { rt, tolerance } => {
                candidate.rt_min() - tolerance <= rt && rt <= candidate.rt_max() + tolerance
            }
            RtFilter::ContainedIn {
                rt_min,
                rt_max,
                tolerance,
            } => rt_min - tolerance <= candidate.rt_min() && candidate.rt_max() <= rt_max + tolerance,
        }
    }
}

fn key_order<C: Coordinates>(a: &C, b: &C) -> Ordering {
    a.mz()
        .total_cmp(&b.mz())
        .then_with(|| a.rt().total_cmp(&b.rt()))
}

/// All payloads in one ascending (mz, rt) order.
///
/// Entries with identical keys are all kept, in insertion order.
#[derive(Debug, Clone)]
pub struct OrderedIndex<T> {
    items: Vec<T>,
}

impl<T: Coordinates> OrderedIndex<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build from a batch; sorting is stable so equal keys keep input order.
    pub fn build<I: IntoIterator<Item = T>>(items: I) -> Self {
        let mut items: Vec<T> = items.into_iter().collect();
        items.sort_by(key_order);
        Self { items }
    }

    /// Insert after any existing entries with the same key.
    pub fn insert(&mut self, payload: T) {
        let at = self
            .items
            .partition_point(|x| key_order(x, &payload) != Ordering::Greater);
        self.items.insert(at, payload);
    }

    /// Entries with mz in `[mz - tolerance, mz + tolerance]` accepted by `filter`.
    pub fn find(&self, mz: f64, tolerance: f64, filter: RtFilter) -> Vec<&T> {
        self.find_by(mz, tolerance, |candidate| filter.matches(candidate))
    }

    /// Entries in the mz band accepted by an arbitrary predicate.
    pub fn find_by<F>(&self, mz: f64, tolerance: f64, mut predicate: F) -> Vec<&T>
    where
        F: FnMut(&T) -> bool,
    {
        let (lo, hi) = self.band(mz - tolerance, mz + tolerance);
        self.items[lo..hi]
            .iter()
            .filter(|candidate| predicate(*candidate))
            .collect()
    }

    /// Number of entries with mz in `[low, high]`.
    pub fn count_in_band(&self, low: f64, high: f64) -> usize {
        let (lo, hi) = self.band(low, high);
        hi - lo
    }

    fn band(&self, low: f64, high: f64) -> (usize, usize) {
        let lo = self.items.partition_point(|x| x.mz() < low);
        let hi = self.items.partition_point(|x| x.mz() <= high);
        (lo, hi.max(lo))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Coordinates + PartialEq> OrderedIndex<T> {
    /// Remove the first entry equal to `payload` among those sharing its key.
    pub fn try_remove(&mut self, payload: &T) -> Option<T> {
        let lo = self
            .items
            .partition_point(|x| key_order(x, payload) == Ordering::Less);
        let hi = self
            .items
            .partition_point(|x| key_order(x, payload) != Ordering::Greater);
        let offset = self.items[lo..hi.max(lo)].iter().position(|x| x == payload)?;
        Some(self.items.remove(lo + offset))
    }

    /// Like [`OrderedIndex::try_remove`], but a missing payload is an error.
    pub fn remove(&mut self, payload: &T) -> Result<T> {
        self.try_remove(payload)
            .ok_or_else(|| MatchError::PayloadNotFound {
                mz: payload.mz(),
                rt: payload.rt(),
            })
    }
}

impl<T: Coordinates> Default for OrderedIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Coordinates> FromIterator<T> for OrderedIndex<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::build(iter)
    }
}
