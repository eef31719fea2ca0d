//! Cell model and the registry of predicted hardmount state.
//!
//! A client is attached to exactly one primary cell and any number of remote
//! cells. Each cell carries the tester's *predicted* hardmount flags; the live
//! flags are only ever read back through the
//! [`CommandGateway`](crate::gateway::CommandGateway).

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Hardmount flags for a single cell.
    ///
    /// A set bit means access of that volume class blocks and retries when the
    /// cell's servers are unreachable; a clear bit means it fails fast.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HardMount: u8 {
        /// Hard-mount read-write volumes.
        const RW = 1 << 0;
        /// Hard-mount read-only volumes.
        const RO = 1 << 1;
    }
}

impl HardMount {
    /// Build a flag set from separate RW and RO switches.
    #[must_use]
    pub const fn from_switches(rw: bool, ro: bool) -> Self {
        let mut bits = 0;
        if rw {
            bits |= Self::RW.bits();
        }
        if ro {
            bits |= Self::RO.bits();
        }
        Self::from_bits_truncate(bits)
    }

    /// Whether read-write volumes are hard-mounted.
    #[must_use]
    pub const fn rw(self) -> bool { self.contains(Self::RW) }

    /// Whether read-only volumes are hard-mounted.
    #[must_use]
    pub const fn ro(self) -> bool { self.contains(Self::RO) }
}

impl fmt::Display for HardMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RW={} RO={}", self.rw(), self.ro())
    }
}

/// Prefix used for generated remote cell names.
pub const REMOTE_CELL_PREFIX: &str = "cellname_";

/// A cell known to the client along with its predicted hardmount flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Cell name as it appears in the server list.
    pub name: String,
    /// Whether this is the client's primary cell.
    pub is_primary: bool,
    /// Flags the tester expects the live client to report.
    pub predicted: HardMount,
}

impl Cell {
    fn new(name: String, is_primary: bool) -> Self {
        Self {
            name,
            is_primary,
            predicted: HardMount::empty(),
        }
    }
}

/// Ordered set of cells. Index 0 is always the primary cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellRegistry {
    cells: Vec<Cell>,
}

impl CellRegistry {
    /// Create a registry holding `primary` followed by `ncells - 1` remote
    /// cells named `cellname_1`, `cellname_2`, and so on.
    ///
    /// A count of zero is saturated to one so the primary cell always exists.
    #[must_use]
    pub fn new(primary: &str, ncells: usize) -> Self {
        let remote = ncells.saturating_sub(1);
        let mut cells = Vec::with_capacity(remote + 1);
        cells.push(Cell::new(primary.to_owned(), true));
        cells.extend((1..=remote).map(|i| Cell::new(format!("{REMOTE_CELL_PREFIX}{i}"), false)));
        Self { cells }
    }

    /// Returns the cell at `index`, if it exists.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Cell> { self.cells.get(index) }

    /// Overwrite the predicted flags of the cell at `index`.
    ///
    /// Out-of-range indices are ignored; callers draw indices from
    /// `0..self.len()`.
    pub fn set_predicted(&mut self, index: usize, flags: HardMount) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.predicted = flags;
        }
    }

    /// Index of the primary cell.
    #[must_use]
    pub const fn primary_index(&self) -> usize { 0 }

    /// Returns `true` if `index` refers to the primary cell.
    #[must_use]
    pub fn is_primary(&self, index: usize) -> bool { self.get(index).is_some_and(|c| c.is_primary) }

    /// Predicted flags of the cell at `index`, or empty flags when absent.
    #[must_use]
    pub fn predicted(&self, index: usize) -> HardMount {
        self.get(index).map_or(HardMount::empty(), |c| c.predicted)
    }

    /// Number of cells, including the primary.
    #[must_use]
    pub const fn len(&self) -> usize { self.cells.len() }

    /// Always `false`: the primary cell is never removed.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Iterate over every cell in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> { self.cells.iter() }

    /// Names of the remote cells, in creation order.
    pub fn remote_names(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .filter(|c| !c.is_primary)
            .map(|c| c.name.as_str())
    }

    /// Number of cells flagged as primary. Always one.
    #[must_use]
    pub fn primary_count(&self) -> usize { self.cells.iter().filter(|c| c.is_primary).count() }
}
