//! Grid map state.
//!
//! A fixed-size square grid of cell ownership records. The map is mutated
//! only by territory resolution, respawns and disconnect cleanup, all of
//! which run inside the single tick step.

use protocol::{CellState, MapState};

/// One cell of the grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Owning player, `None` for neutral land.
    pub owner: Option<String>,
    /// Whether the cell is sealed territory (`false` on a trail).
    pub claimed: bool,
}

impl Cell {
    /// Whether `username` owns this cell (trail or claimed alike).
    #[inline]
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner.as_deref() == Some(username)
    }
}

/// The shared game map.
///
/// Coordinates are `[0, size)` on both axes. Out-of-bounds access is a
/// programming error and panics; callers pre-clip.
#[derive(Debug, Clone)]
pub struct GridMap {
    size: usize,
    cells: Vec<Cell>,
}

impl GridMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    /// Side length in cells.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packed index of `(x, y)`, usable as a key into a visited bitset.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size);
        x * self.size + y
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &Cell {
        &self.cells[x * self.size + y]
    }

    /// Overwrite a cell. A claimed cell must always carry an owner.
    pub fn set(&mut self, x: usize, y: usize, owner: Option<&str>, claimed: bool) {
        debug_assert!(owner.is_some() || !claimed, "claimed cell without owner");
        let idx = self.index(x, y);
        self.cells[idx] = Cell {
            owner: owner.map(str::to_owned),
            claimed,
        };
    }

    /// Reset every cell owned by `username` to neutral.
    pub fn release(&mut self, username: &str) {
        for cell in &mut self.cells {
            if cell.is_owned_by(username) {
                *cell = Cell::default();
            }
        }
    }

    /// Seal every cell owned by `username` into claimed territory.
    pub fn seal(&mut self, username: &str) {
        for cell in &mut self.cells {
            if cell.is_owned_by(username) {
                cell.claimed = true;
            }
        }
    }

    /// Hand every claimed cell of `from` over to `to`, still claimed.
    /// `from`'s unsealed trail is left behind.
    pub fn transfer_claimed(&mut self, from: &str, to: &str) {
        for cell in &mut self.cells {
            if cell.is_owned_by(from) && cell.claimed {
                cell.owner = Some(to.to_owned());
            }
        }
    }

    /// Number of cells owned by `username`, trail included.
    pub fn owned_count(&self, username: &str) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.is_owned_by(username))
            .count()
    }

    /// Snapshot in the wire layout (outer index x, inner index y).
    pub fn to_wire(&self) -> MapState {
        (0..self.size)
            .map(|x| {
                (0..self.size)
                    .map(|y| {
                        let cell = self.get(x, y);
                        CellState(cell.owner.clone(), cell.claimed)
                    })
                    .collect()
            })
            .collect()
    }

    /// `claimed == true` implies `owner != None`, for every cell.
    pub fn check_invariants(&self) -> bool {
        self.cells.iter().all(|cell| cell.owner.is_some() || !cell.claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_is_neutral() {
        let map = GridMap::new(50);
        assert_eq!(map.get(0, 0), &Cell::default());
        assert_eq!(map.get(49, 49), &Cell::default());
        assert!(map.check_invariants());
    }

    #[test]
    fn test_set_get() {
        let mut map = GridMap::new(50);
        map.set(3, 7, Some("alice"), true);
        assert!(map.get(3, 7).is_owned_by("alice"));
        assert!(map.get(3, 7).claimed);
        assert!(!map.get(7, 3).is_owned_by("alice"));
    }

    #[test]
    fn test_release_resets_trail_and_territory() {
        let mut map = GridMap::new(50);
        map.set(1, 1, Some("alice"), true);
        map.set(1, 2, Some("alice"), false);
        map.set(2, 2, Some("bob"), true);
        map.release("alice");
        assert_eq!(map.owned_count("alice"), 0);
        assert!(map.get(2, 2).is_owned_by("bob"));
        assert!(map.check_invariants());
    }

    #[test]
    fn test_seal_claims_trail_only_for_owner() {
        let mut map = GridMap::new(50);
        map.set(4, 4, Some("alice"), false);
        map.set(4, 5, Some("bob"), false);
        map.seal("alice");
        assert!(map.get(4, 4).claimed);
        assert!(!map.get(4, 5).claimed);
    }

    #[test]
    fn test_transfer_claimed_leaves_trail_behind() {
        let mut map = GridMap::new(50);
        map.set(10, 10, Some("bob"), true);
        map.set(10, 11, Some("bob"), false);
        map.transfer_claimed("bob", "alice");
        assert!(map.get(10, 10).is_owned_by("alice"));
        assert!(map.get(10, 10).claimed);
        assert!(map.get(10, 11).is_owned_by("bob"));
        assert!(!map.get(10, 11).claimed);
    }

    #[test]
    fn test_wire_snapshot_layout() {
        let mut map = GridMap::new(20);
        map.set(2, 5, Some("alice"), true);
        let wire = map.to_wire();
        assert_eq!(wire.len(), 20);
        assert_eq!(wire[0].len(), 20);
        assert_eq!(wire[2][5].0.as_deref(), Some("alice"));
        assert!(wire[2][5].1);
        assert_eq!(wire[5][2].0, None);
    }
}
