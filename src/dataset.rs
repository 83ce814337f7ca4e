//! A dataset of domain records held in a grid index

use std::collections::BTreeMap;

use tracing::debug;

use crate::grid::{BinSize, EntryId, GridIndex};
use crate::point::{Coordinates, Point};
use crate::records::PeptideId;
use crate::warp::RtWarp;

/// A record kind that can be loaded into a [`Dataset`].
///
/// Coordinates are derived from the record on every call and never cached
/// apart from it. `BIN_SIZE` is the default cell size for this kind.
pub trait Record: Coordinates + Clone + PartialEq {
    const BIN_SIZE: BinSize;

    /// Rewrite every retention time the record carries.
    fn map_rt<F: Fn(f64) -> f64>(&mut self, f: F);
}

/// Records from one acquisition, indexed by (mz, rt)
#[derive(Debug, Clone)]
pub struct Dataset<R> {
    index: GridIndex<R>,
    /// Retention times have been aligned to another dataset
    rt_calibrated: bool,
    /// Records carry sequence labels from MS/MS
    has_ms2_labels: bool,
}

impl<R: Record> Dataset<R> {
    /// Empty dataset using the record kind's default bin size
    pub fn new() -> Self {
        Self::with_bin_size(Vec::new(), R::BIN_SIZE)
    }

    /// Load records using the record kind's default bin size
    pub fn from_records<I: IntoIterator<Item = R>>(records: I) -> Self {
        Self::with_bin_size(records, R::BIN_SIZE)
    }

    pub fn with_bin_size<I: IntoIterator<Item = R>>(records: I, bin_size: BinSize) -> Self {
        let items = records.into_iter().map(|record| (record.point(), record));
        Self {
            index: GridIndex::build(items, bin_size),
            rt_calibrated: false,
            has_ms2_labels: false,
        }
    }

    pub fn update(&mut self, record: R) -> EntryId {
        let point = record.point();
        self.index.update(record, point)
    }

    /// Remove a record equal to `record`; `None` if there was none.
    pub fn erase(&mut self, record: &R) -> Option<R> {
        self.index.erase(record, record.point())
    }

    /// Copy every record of `other` into `self`, one `update` at a time.
    pub fn merge(&mut self, other: &Dataset<R>) {
        for record in other.records() {
            self.update(record.clone());
        }
    }

    /// Records in exactly the cell containing `(mz, rt)`.
    ///
    /// A record just over a cell boundary is missed; use
    /// [`Dataset::adjacent_contents`] when that matters.
    pub fn get_contents(&self, mz: f64, rt: f64) -> Vec<&R> {
        self.index.bin_contents_at(Point::new(mz, rt))
    }

    /// Records in the 3x3 cell neighborhood around `(mz, rt)`.
    pub fn adjacent_contents(&self, mz: f64, rt: f64) -> Vec<&R> {
        self.index.adjacent_bin_contents(Point::new(mz, rt))
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.index.payloads()
    }

    pub fn index(&self) -> &GridIndex<R> {
        &self.index
    }

    pub fn into_index(self) -> GridIndex<R> {
        self.index
    }

    pub fn rebin(&mut self, bin_size: BinSize) {
        self.index.rebin(bin_size);
    }

    /// Map every record's retention times through `warp` and rebuild the
    /// grid at the current bin size. Marks the dataset as rt-calibrated.
    ///
    /// Entry handles from before the warp are invalidated.
    pub fn warp_rt(&mut self, warp: &RtWarp) {
        let bin_size = self.index.bin_size();
        let index = std::mem::replace(&mut self.index, GridIndex::new(bin_size));
        let items = index.into_payloads().map(|mut record| {
            record.map_rt(|rt| warp.apply(rt));
            (record.point(), record)
        });
        self.index = GridIndex::build(items, bin_size);
        self.rt_calibrated = true;
    }

    pub fn rt_calibrated(&self) -> bool {
        self.rt_calibrated
    }

    pub fn set_rt_calibrated(&mut self, calibrated: bool) {
        self.rt_calibrated = calibrated;
    }

    pub fn has_ms2_labels(&self) -> bool {
        self.has_ms2_labels
    }

    pub fn set_has_ms2_labels(&mut self, labelled: bool) {
        self.has_ms2_labels = labelled;
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl Dataset<PeptideId> {
    /// Identifications of the same peptide in both datasets, one pair per
    /// shared sequence, ordered by sequence.
    ///
    /// When a sequence was identified more than once on a side, the most
    /// probable identification represents it (the first loaded on ties).
    pub fn shared_peptides<'a>(
        &'a self,
        other: &'a Dataset<PeptideId>,
    ) -> Vec<(&'a PeptideId, &'a PeptideId)> {
        let ours = best_by_peptide(self);
        let theirs = best_by_peptide(other);
        let pairs: Vec<(&PeptideId, &PeptideId)> = ours
            .iter()
            .filter_map(|(peptide, a)| theirs.get(peptide).map(|b| (*a, *b)))
            .collect();
        debug!(
            ours = ours.len(),
            theirs = theirs.len(),
            shared = pairs.len(),
            "joined identifications by sequence"
        );
        pairs
    }
}

fn best_by_peptide(dataset: &Dataset<PeptideId>) -> BTreeMap<&str, &PeptideId> {
    let mut best: BTreeMap<&str, &PeptideId> = BTreeMap::new();
    for id in dataset.records() {
        best.entry(id.peptide.as_str())
            .and_modify(|current| {
                if id.probability > current.probability {
                    *current = id;
                }
            })
            .or_insert(id);
    }
    best
}

impl<R: Record> Default for Dataset<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> FromIterator<R> for Dataset<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
