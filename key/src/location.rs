//! Packed resource location.
//!
//! Every resource record stores a single `u32` that tells in which archive
//! and in which slot of that archive the resource payload lives. The bits
//! are laid out as follows:
//!
//! ``` text
//!  31                    20 19        14 13                     0
//! +------------------------+------------+------------------------+
//! |     archive index      |  tileset   |       slot index       |
//! +------------------------+------------+------------------------+
//! ```
//!
//! No other bit ranges are defined.

use serde::Serialize;
use std::fmt::{Display, Formatter};

const ARCHIVE_SHIFT: u32 = 20;
const TILESET_SHIFT: u32 = 14;
const SLOT_MASK: u32 = 0x3FFF;
const TILESET_MASK: u32 = 0x000F_C000;
const NON_ARCHIVE_MASK: u32 = 0x000F_FFFF;

/// Largest archive index representable in a `Location`.
pub const MAX_ARCHIVE: u32 = 0xFFF;

/// Largest tileset index representable in a `Location`.
pub const MAX_TILESET: u32 = 0x3F;

/// Largest slot index representable in a `Location`.
pub const MAX_SLOT: u32 = SLOT_MASK;

/// Bit-packed location of a resource (archive, tileset and slot).
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Location(u32);

impl Location {
    /// Composes a location from its three parts. Tileset and slot are masked
    /// to their bit widths, archive bits above `MAX_ARCHIVE` are discarded.
    pub fn new(archive: u32, tileset: u32, slot: u32) -> Self {
        Location(
            (archive << ARCHIVE_SHIFT)
                | ((tileset << TILESET_SHIFT) & TILESET_MASK)
                | (slot & SLOT_MASK),
        )
    }

    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Location(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn archive(self) -> u32 {
        self.0 >> ARCHIVE_SHIFT
    }

    #[inline]
    pub fn slot(self) -> u32 {
        self.0 & SLOT_MASK
    }

    #[inline]
    pub fn tileset(self) -> u32 {
        (self.0 & TILESET_MASK) >> TILESET_SHIFT
    }

    /// Returns a copy of this location pointing into archive `id`. Tileset
    /// and slot bits are kept.
    #[inline]
    pub fn with_archive(self, id: u32) -> Self {
        Location((self.0 & NON_ARCHIVE_MASK) | (id << ARCHIVE_SHIFT))
    }

    /// Returns a copy of this location pointing at slot `id`. Archive and
    /// tileset bits are kept.
    #[inline]
    pub fn with_slot(self, id: u32) -> Self {
        Location((self.0 & !SLOT_MASK) | (id & SLOT_MASK))
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.archive(), self.slot())
    }
}
