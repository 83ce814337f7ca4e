//! Uniform grid index over the (mz, rt) plane.
//!
//! Payloads live once in an arena of `(Point, payload)` entries; the cell map
//! only stores [`EntryId`] handles into that arena. The flat payload view and
//! the (point, payload) view are both iterations over the arena, so a
//! mutation touches the arena slot and one cell bucket and nothing else.
//!
//! Cell dimensions double as a search radius: [`GridIndex::adjacent_bin_contents`]
//! returns the 3x3 neighborhood around a point, so resizing the cells with
//! [`GridIndex::rebin`] turns the grid into an approximate box query of any
//! width.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MatchError, Result};
use crate::point::Point;

/// Stable handle to an entry of a [`GridIndex`].
///
/// Handles are never reused, so a handle to an erased entry simply resolves
/// to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    /// Position of the entry in insertion order
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Integer coordinate of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub mz: i64,
    pub rt: i64,
}

impl Cell {
    pub fn new(mz: i64, rt: i64) -> Self {
        Self { mz, rt }
    }

    /// The 3x3 block of cells centered on `self`, mz offset outermost.
    /// Cells that would overflow `i64` are left out.
    pub fn neighborhood(&self) -> impl Iterator<Item = Cell> + '_ {
        (-1i64..=1).flat_map(move |dmz| {
            (-1i64..=1).filter_map(move |drt| {
                Some(Cell::new(
                    self.mz.checked_add(dmz)?,
                    self.rt.checked_add(drt)?,
                ))
            })
        })
    }
}

/// Width (mz) and height (rt) of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSize {
    width: f64,
    height: f64,
}

impl BinSize {
    /// Tight preset for precursor-level identifications
    pub const TIGHT: BinSize = BinSize {
        width: 0.005,
        height: 60.0,
    };

    /// Lenient preset for detected features
    pub const LENIENT: BinSize = BinSize {
        width: 0.5,
        height: 100.0,
    };

    /// Create a bin size; both dimensions must be finite and positive.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |x: f64| x.is_finite() && x > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(MatchError::InvalidBinSize {
                width: self.width,
                height: self.height,
            })
        }
    }

    /// The cell containing `point`
    pub fn cell(&self, point: Point) -> Cell {
        Cell::new(
            (point.mz / self.width).floor() as i64,
            (point.rt / self.height).floor() as i64,
        )
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    point: Point,
    payload: T,
}

/// A grid of fixed-size cells answering exact-cell and neighborhood queries.
#[derive(Debug, Clone)]
pub struct GridIndex<T> {
    /// Slots are `None` after erasure.
    entries: Vec<Option<Entry<T>>>,
    cells: HashMap<Cell, Vec<EntryId>>,
    bin_size: BinSize,
    count: usize,
}

impl<T> GridIndex<T> {
    /// Create an empty grid with the given cell dimensions.
    pub fn new(bin_size: BinSize) -> Self {
        Self {
            entries: Vec::new(),
            cells: HashMap::new(),
            bin_size,
            count: 0,
        }
    }

    /// Bulk-load a batch of `(point, payload)` pairs.
    pub fn build<I>(items: I, bin_size: BinSize) -> Self
    where
        I: IntoIterator<Item = (Point, T)>,
    {
        let mut grid = Self::new(bin_size);
        for (point, payload) in items {
            grid.update(payload, point);
        }
        debug!(
            entries = grid.count,
            cells = grid.cells.len(),
            width = bin_size.width,
            height = bin_size.height,
            "built grid index"
        );
        grid
    }

    /// Append one entry. No deduplication: the same payload and point
    /// submitted twice are stored twice.
    pub fn update(&mut self, payload: T, point: Point) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(Some(Entry { point, payload }));
        self.cells
            .entry(self.bin_size.cell(point))
            .or_default()
            .push(id);
        self.count += 1;
        id
    }

    /// Rebuild the cell map from the retained entries at new dimensions.
    ///
    /// Entries are re-bucketed in insertion order, so the result is the same
    /// as building a fresh grid from the surviving `(point, payload)` pairs.
    pub fn rebin(&mut self, bin_size: BinSize) {
        let mut cells: HashMap<Cell, Vec<EntryId>> = HashMap::new();
        for (i, slot) in self.entries.iter().enumerate() {
            if let Some(entry) = slot {
                cells
                    .entry(bin_size.cell(entry.point))
                    .or_default()
                    .push(EntryId(i));
            }
        }
        self.cells = cells;
        self.bin_size = bin_size;
        debug!(
            entries = self.count,
            cells = self.cells.len(),
            width = bin_size.width,
            height = bin_size.height,
            "rebinned grid index"
        );
    }

    /// Handles stored in exactly this cell, in bucket order.
    pub fn bin_entries(&self, cell: Cell) -> &[EntryId] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Payloads stored in exactly this cell.
    pub fn bin_contents(&self, cell: Cell) -> Vec<&T> {
        self.resolve(self.bin_entries(cell).iter().copied())
    }

    /// Payloads stored in the cell containing `point`.
    ///
    /// This is an exact-cell lookup: an entry just across a cell boundary
    /// from `point` is not returned.
    pub fn bin_contents_at(&self, point: Point) -> Vec<&T> {
        self.bin_contents(self.bin_size.cell(point))
    }

    /// Handles in the 3x3 block of cells around the cell containing `point`.
    pub fn adjacent_entries(&self, point: Point) -> Vec<EntryId> {
        let center = self.bin_size.cell(point);
        center
            .neighborhood()
            .flat_map(|cell| self.bin_entries(cell).iter().copied())
            .collect()
    }

    /// Payloads in the 3x3 block of cells around the cell containing `point`.
    ///
    /// Not a radius query: anything in a neighboring cell is returned, and
    /// anything further than one cell away is not.
    pub fn adjacent_bin_contents(&self, point: Point) -> Vec<&T> {
        self.resolve(self.adjacent_entries(point))
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.entry(id).map(|e| &e.payload)
    }

    pub fn point(&self, id: EntryId) -> Option<Point> {
        self.entry(id).map(|e| e.point)
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, Point, &T)> {
        self.entries.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|entry| (EntryId(i), entry.point, &entry.payload))
        })
    }

    /// All live payloads in insertion order.
    pub fn payloads(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, _, payload)| payload)
    }

    /// Consume the grid, yielding live payloads in insertion order.
    pub fn into_payloads(self) -> impl Iterator<Item = T> {
        self.entries
            .into_iter()
            .flatten()
            .map(|entry| entry.payload)
    }

    pub fn bin_size(&self) -> BinSize {
        self.bin_size
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn entry(&self, id: EntryId) -> Option<&Entry<T>> {
        self.entries.get(id.0).and_then(Option::as_ref)
    }

    fn resolve(&self, ids: impl IntoIterator<Item = EntryId>) -> Vec<&T> {
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }
}

impl<T: PartialEq> GridIndex<T> {
    /// Remove the first payload equal to `payload` from the cell of `point`.
    ///
    /// A miss is not an error: it is logged and reported as `None`.
    pub fn erase(&mut self, payload: &T, point: Point) -> Option<T> {
        let cell = self.bin_size.cell(point);
        let Some(bucket) = self.cells.get_mut(&cell) else {
            warn!(mz = point.mz, rt = point.rt, "erase: no entries in target cell");
            return None;
        };

        let entries = &self.entries;
        let position = bucket.iter().position(|id| {
            entries[id.0]
                .as_ref()
                .is_some_and(|entry| entry.payload == *payload)
        });
        let Some(position) = position else {
            warn!(mz = point.mz, rt = point.rt, "erase: payload not found in target cell");
            return None;
        };

        let id = bucket.remove(position);
        if bucket.is_empty() {
            self.cells.remove(&cell);
        }
        self.count -= 1;
        self.entries[id.0].take().map(|entry| entry.payload)
    }

    /// Whether any live entry equals `payload`.
    pub fn contains(&self, payload: &T) -> bool {
        self.payloads().any(|p| p == payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GridIndex<u32> {
        let items = vec![
            (Point::new(1.5, 2.0), 1),
            (Point::new(2.5, 3.0), 2),
            (Point::new(3.0, 2.0), 3),
        ];
        GridIndex::build(items, BinSize::new(4.0, 4.0).unwrap())
    }

    fn sorted(mut v: Vec<&u32>) -> Vec<u32> {
        v.sort();
        v.into_iter().copied().collect()
    }

    #[test]
    fn test_bin_size_validation() {
        assert!(BinSize::new(0.5, 0.5).is_ok());
        assert!(matches!(
            BinSize::new(0.0, 1.0),
            Err(MatchError::InvalidBinSize { .. })
        ));
        assert!(BinSize::new(1.0, f64::NAN).is_err());
        assert!(BinSize::new(-1.0, 1.0).is_err());
    }

    #[test]
    fn test_cell_of_negative_coordinates() {
        let size = BinSize::new(1.0, 1.0).unwrap();
        assert_eq!(size.cell(Point::new(-0.5, 0.5)), Cell::new(-1, 0));
        assert_eq!(size.cell(Point::new(2.0, -2.0)), Cell::new(2, -2));
    }

    #[test]
    fn test_neighborhood_has_nine_cells() {
        let cells: Vec<Cell> = Cell::new(0, 0).neighborhood().collect();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], Cell::new(-1, -1));
        assert_eq!(cells[4], Cell::new(0, 0));
        assert_eq!(cells[8], Cell::new(1, 1));
    }

    #[test]
    fn test_neighborhood_at_i64_edge() {
        let cells: Vec<Cell> = Cell::new(i64::MAX, 0).neighborhood().collect();
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn test_exact_cell_lookup() {
        let grid = sample();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(sorted(grid.bin_contents_at(Point::new(1.6, 2.0))), vec![1, 2, 3]);
        assert_eq!(sorted(grid.bin_contents(Cell::new(0, 0))), vec![1, 2, 3]);
        assert!(grid.bin_contents(Cell::new(1, 0)).is_empty());
    }

    #[test]
    fn test_exact_cell_misses_across_boundary() {
        let mut grid = GridIndex::new(BinSize::new(1.0, 1.0).unwrap());
        grid.update("a", Point::new(0.99, 0.5));
        assert!(grid.bin_contents_at(Point::new(1.01, 0.5)).is_empty());
        assert_eq!(grid.adjacent_bin_contents(Point::new(1.01, 0.5)), vec![&"a"]);
    }

    #[test]
    fn test_rebin_then_adjacent_then_erase() {
        let mut grid = sample();
        grid.rebin(BinSize::new(0.5, 0.5).unwrap());
        assert_eq!(grid.occupied_cells(), 3);

        let found = sorted(grid.adjacent_bin_contents(Point::new(1.0, 2.0)));
        assert!(found.contains(&1));
        assert!(!found.contains(&2));

        assert_eq!(grid.erase(&1, Point::new(1.5, 2.0)), Some(1));
        let found = sorted(grid.adjacent_bin_contents(Point::new(1.0, 2.0)));
        assert!(!found.contains(&1));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_erase_miss_is_soft() {
        let mut grid = sample();
        assert_eq!(grid.erase(&42, Point::new(1.5, 2.0)), None);
        assert_eq!(grid.erase(&1, Point::new(100.0, 100.0)), None);
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_update_does_not_deduplicate() {
        let mut grid = sample();
        grid.update(1, Point::new(1.5, 2.0));
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.erase(&1, Point::new(1.5, 2.0)), Some(1));
        assert!(grid.contains(&1));
        assert_eq!(grid.erase(&1, Point::new(1.5, 2.0)), Some(1));
        assert!(!grid.contains(&1));
    }

    #[test]
    fn test_handles_survive_erase_of_others() {
        let mut grid = GridIndex::new(BinSize::new(1.0, 1.0).unwrap());
        let a = grid.update("a", Point::new(0.1, 0.1));
        let b = grid.update("b", Point::new(0.2, 0.2));
        grid.erase(&"a", Point::new(0.1, 0.1));
        assert_eq!(grid.get(a), None);
        assert_eq!(grid.get(b), Some(&"b"));
        assert_eq!(grid.point(b), Some(Point::new(0.2, 0.2)));
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn test_iteration_in_insertion_order() {
        let grid = sample();
        let payloads: Vec<u32> = grid.payloads().copied().collect();
        assert_eq!(payloads, vec![1, 2, 3]);
        let points: Vec<Point> = grid.iter().map(|(_, p, _)| p).collect();
        assert_eq!(points[1], Point::new(2.5, 3.0));
    }

    #[test]
    fn test_erasing_last_entry_clears_cell() {
        let mut grid = GridIndex::new(BinSize::new(1.0, 1.0).unwrap());
        grid.update(7, Point::new(5.5, 5.5));
        grid.erase(&7, Point::new(5.5, 5.5));
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }
}
