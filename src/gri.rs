//! Genomic range index (GRI): hierarchical binning of intervals on reference sequences.
//!
//! Each reference sequence is partitioned into tiles at [`Bin::LEVELS`] levels.
//! At level `l < TOP_LEVEL`, tiles are `2^(14 + 3l)` bp long: 16 KiB, 128 KiB, 1 MiB, 8 MiB, 64 MiB, and 512 MiB.
//! The top level has a single tile covering the entire sequence.
//! An interval is assigned to the lowest level where a single tile contains it.
//!
//! A bin is stored in the database as a single integer packing `(rid, level, tile)`.
//! The packing preserves the lexicographic order of the triples.
//! Hence the candidate tiles of a query at each level form a contiguous range of bin ids.
//! See [`candidate_ranges`].
//!
//! # Examples
//!
//! ```
//! use vcf_base::gri::{self, Bin};
//!
//! // A SNV and a 200 kbp deletion on the same sequence.
//! let snv = Bin::new(3, 1_000_000, 1);
//! assert_eq!(snv.level(), 0);
//! assert_eq!(snv.tile(), 1_000_000 >> 14);
//! let deletion = Bin::new(3, 1_000_000, 200_000);
//! assert_eq!(deletion.level(), 3);
//!
//! // Both are candidates for a query overlapping them.
//! let ranges = gri::candidate_ranges(3, 1_100_000, 1_100_001);
//! assert!(!ranges.iter().any(|range| range.contains(&snv.id())));
//! assert!(ranges.iter().any(|range| range.contains(&deletion.id())));
//! ```

use std::fmt::Display;
use std::ops::RangeInclusive;


//-----------------------------------------------------------------------------

/// A GRI bin identified by reference sequence, level, and tile.
///
/// Bins are pure values.
/// The same interval always maps to the same bin, and the bin has no meaning beyond indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bin {
    rid: u32,
    level: u8,
    tile: u32,
}

impl Bin {
    /// Number of levels, including the top level.
    pub const LEVELS: usize = 7;

    /// The top level with a single tile per sequence.
    pub const TOP_LEVEL: usize = Self::LEVELS - 1;

    /// Tile size at level 0 is `2^BASE_SHIFT` bp.
    pub const BASE_SHIFT: usize = 14;

    /// Tile size is multiplied by `2^LEVEL_SHIFT` at each level.
    pub const LEVEL_SHIFT: usize = 3;

    /// Number of bits for the tile index.
    pub const TILE_BITS: usize = 28;

    /// Number of bits for the level.
    pub const LEVEL_BITS: usize = 3;

    /// Largest tile index.
    pub const MAX_TILE: u64 = (1 << Self::TILE_BITS) - 1;

    /// Intervals reaching this position or beyond are always placed at the top level.
    pub const MAX_POSITION: u64 = 1 << (Self::BASE_SHIFT + Self::TILE_BITS);

    const RID_SHIFT: usize = Self::TILE_BITS + Self::LEVEL_BITS;

    /// Returns the bin for interval `[pos, pos + len)` on reference sequence `rid`.
    ///
    /// Zero-length intervals are binned like the single base at `pos`.
    pub fn new(rid: u32, pos: u64, len: u64) -> Self {
        let first = pos;
        let last = pos.saturating_add(len.max(1) - 1);
        if last < Self::MAX_POSITION {
            for level in 0..Self::TOP_LEVEL {
                let shift = BinLevel::new(level).shift();
                if first >> shift == last >> shift {
                    return Bin { rid, level: level as u8, tile: (first >> shift) as u32 };
                }
            }
        }
        Bin { rid, level: Self::TOP_LEVEL as u8, tile: 0 }
    }

    /// Returns the bin at the given level and tile.
    ///
    /// Returns [`None`] if the level or the tile is out of range.
    pub fn at(rid: u32, level: usize, tile: u64) -> Option<Self> {
        if level >= Self::LEVELS || tile > Self::MAX_TILE || (level == Self::TOP_LEVEL && tile != 0) {
            return None;
        }
        Some(Bin { rid, level: level as u8, tile: tile as u32 })
    }

    /// Decodes a bin from its integer identifier.
    ///
    /// Returns [`None`] if the identifier does not correspond to a valid bin.
    pub fn from_id(id: i64) -> Option<Self> {
        if id < 0 {
            return None;
        }
        let id = id as u64;
        let rid = id >> Self::RID_SHIFT;
        let level = (id >> Self::TILE_BITS) & ((1 << Self::LEVEL_BITS) - 1);
        let tile = id & Self::MAX_TILE;
        if rid > u32::MAX as u64 {
            return None;
        }
        Self::at(rid as u32, level as usize, tile)
    }

    /// Returns the integer identifier of the bin.
    ///
    /// The identifiers are non-negative and ordered by `(rid, level, tile)`.
    pub fn id(&self) -> i64 {
        ((self.rid as i64) << Self::RID_SHIFT) | ((self.level as i64) << Self::TILE_BITS) | (self.tile as i64)
    }

    /// Returns the reference sequence identifier.
    pub fn rid(&self) -> u32 {
        self.rid
    }

    /// Returns the level of the bin.
    pub fn level(&self) -> usize {
        self.level as usize
    }

    /// Returns the tile index within the level.
    pub fn tile(&self) -> u64 {
        self.tile as u64
    }

    /// Returns the sequence interval covered by the tile.
    ///
    /// The interval of the top-level tile is unbounded.
    pub fn span(&self) -> (u64, Option<u64>) {
        let level = BinLevel::new(self.level());
        if level.is_top() {
            (0, None)
        } else {
            let start = self.tile() << level.shift();
            (start, Some(start + level.tile_size()))
        }
    }
}

impl Display for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.rid, self.level, self.tile)
    }
}

//-----------------------------------------------------------------------------

/// A level in the tile hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinLevel(usize);

impl BinLevel {
    /// Creates a level.
    ///
    /// # Panics
    ///
    /// Panics if `level >= Bin::LEVELS`.
    pub fn new(level: usize) -> Self {
        assert!(level < Bin::LEVELS, "Invalid GRI level {}", level);
        BinLevel(level)
    }

    /// Returns an iterator over all levels from the lowest to the top.
    pub fn all() -> impl Iterator<Item = BinLevel> {
        (0..Bin::LEVELS).map(BinLevel)
    }

    /// Returns the level number.
    pub fn number(&self) -> usize {
        self.0
    }

    /// Returns `true` if this is the top level.
    pub fn is_top(&self) -> bool {
        self.0 == Bin::TOP_LEVEL
    }

    /// Returns the base-2 logarithm of the tile size.
    ///
    /// The top level reports the shift that would be used for an ordinary level.
    pub fn shift(&self) -> usize {
        Bin::BASE_SHIFT + Bin::LEVEL_SHIFT * self.0
    }

    /// Returns the tile size in bp.
    ///
    /// The top level has a single tile of unbounded size, and this returns `u64::MAX` for it.
    pub fn tile_size(&self) -> u64 {
        if self.is_top() { u64::MAX } else { 1 << self.shift() }
    }
}

/// Returns a human-readable description of the tile size ladder.
pub fn describe_levels() -> String {
    let sizes: Vec<String> = BinLevel::all().map(|level| {
        if level.is_top() {
            String::from("sequence")
        } else {
            level.tile_size().to_string()
        }
    }).collect();
    sizes.join(",")
}

//-----------------------------------------------------------------------------

/// Returns the inclusive bin id ranges that may contain intervals overlapping `[start, end)` on sequence `rid`.
///
/// There is one range per level, ordered by level.
/// Returns an empty vector if the query interval is empty or inverted.
/// Every interval overlapping the query has its bin id in one of the ranges.
pub fn candidate_ranges(rid: u32, start: u64, end: u64) -> Vec<RangeInclusive<i64>> {
    let mut result = Vec::with_capacity(Bin::LEVELS);
    if start >= end {
        return result;
    }
    let last = end - 1;
    for level in BinLevel::all() {
        if level.is_top() {
            let top = Bin { rid, level: level.number() as u8, tile: 0 }.id();
            result.push(top..=top);
            continue;
        }
        let first_tile = start >> level.shift();
        if first_tile > Bin::MAX_TILE {
            // No interval below the top level can start this late.
            continue;
        }
        let last_tile = (last >> level.shift()).min(Bin::MAX_TILE);
        let low = Bin { rid, level: level.number() as u8, tile: first_tile as u32 }.id();
        let high = Bin { rid, level: level.number() as u8, tile: last_tile as u32 }.id();
        result.push(low..=high);
    }
    result
}

//-----------------------------------------------------------------------------
