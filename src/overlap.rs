//! Compiling interval overlap queries into SQL predicates backed by the GRI.
//!
//! An [`OverlapQuery`] finds rows of a variant table whose interval `[pos, pos + rlen)` overlaps the query interval `[start, end)` on reference sequence `rid`.
//! The compiled predicate has two stages:
//!
//! * A bin filter restricting `_gri_bin` to the candidate ranges from [`gri::candidate_ranges`].
//!   This can use the index on the bin column, and it never excludes a true overlap.
//! * An exact refinement `rid = R AND pos < end AND pos + rlen > start`.
//!   The refinement alone defines the result.
//!
//! Query operands are either literal integers or SQL expressions.
//! With literal operands, the candidate ranges are computed at compile time.
//! With expressions, the ranges are computed by the database using integer arithmetic.
//! Each expression may be repeated in the output, so it must be safe to evaluate multiple times.
//! Use numbered (`?1`) or named (`:start`) parameters instead of anonymous `?` parameters.
//!
//! # Examples
//!
//! ```
//! use vcf_base::overlap::{Operand, OverlapQuery};
//! use rusqlite::Connection;
//!
//! let connection = Connection::open_in_memory().unwrap();
//! connection.execute_batch(
//!     "CREATE TABLE variants (rowid INTEGER PRIMARY KEY, rid INTEGER, pos INTEGER, rlen INTEGER, _gri_bin INTEGER);
//!     CREATE TABLE refseq (rid INTEGER PRIMARY KEY, name TEXT);
//!     INSERT INTO refseq VALUES (0, 'chr1'), (1, 'chr2');"
//! ).unwrap();
//! let mut insert = connection.prepare("INSERT INTO variants VALUES (?1, ?2, ?3, ?4, ?5)").unwrap();
//! for (rowid, rid, pos, rlen) in [(1, 0, 100, 1), (2, 0, 150, 10), (3, 1, 120, 1), (4, 0, 300, 5)] {
//!     let bin = vcf_base::Bin::new(rid, pos, rlen).id();
//!     insert.execute((rowid, rid, pos, rlen, bin)).unwrap();
//! }
//!
//! // The reference sequence is resolved by a join, and the interval is given as parameters.
//! let query = OverlapQuery::new("variants", Operand::expr("chrom.rid"), Operand::expr("?2"), Operand::expr("?3"));
//! let sql = format!(
//!     "SELECT variants.rowid FROM (SELECT rid FROM refseq WHERE name = ?1) AS chrom, {} ORDER BY variants.rowid",
//!     query.fragment()
//! );
//! let mut statement = connection.prepare(&sql).unwrap();
//! let rowids: Vec<i64> = statement.query_map(("chr1", 100, 155), |row| row.get(0)).unwrap()
//!     .map(|x| x.unwrap()).collect();
//! assert_eq!(rowids, vec![1, 2]);
//! ```

use crate::gri::{self, Bin, BinLevel};
use crate::utils;

use std::fmt::Display;
use std::ops::RangeInclusive;


//-----------------------------------------------------------------------------

/// An operand of an overlap query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// A literal integer value.
    Literal(i64),
    /// An SQL expression evaluating to an integer, such as a parameter or a column of another table.
    Expr(String),
}

impl Operand {
    /// Creates an expression operand.
    pub fn expr(expression: &str) -> Self {
        Operand::Expr(expression.to_string())
    }

    /// Returns the literal value, if the operand is a literal.
    pub fn literal(&self) -> Option<i64> {
        match self {
            Operand::Literal(value) => Some(*value),
            Operand::Expr(_) => None,
        }
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Literal(value)
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Literal(value as i64)
    }
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Literal(value.min(i64::MAX as u64) as i64)
    }
}

impl From<&str> for Operand {
    fn from(expression: &str) -> Self {
        Operand::expr(expression)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Expr(expression) => write!(f, "({})", expression),
        }
    }
}

//-----------------------------------------------------------------------------

/// Column names used by the compiled predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlapColumns {
    /// Reference sequence identifier.
    pub rid: String,
    /// Starting position (0-based).
    pub pos: String,
    /// Length of the reference interval.
    pub rlen: String,
    /// GRI bin.
    pub bin: String,
}

impl Default for OverlapColumns {
    fn default() -> Self {
        OverlapColumns {
            rid: String::from("rid"),
            pos: String::from("pos"),
            rlen: String::from("rlen"),
            bin: String::from(OverlapQuery::BIN_COLUMN),
        }
    }
}

/// An interval overlap query against a table with GRI bins.
///
/// The compiler never resolves contig names.
/// The caller passes the reference sequence identifier as a literal or as an expression, such as a column from a join against the reference sequence table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlapQuery {
    table: String,
    columns: OverlapColumns,
    rid: Operand,
    start: Operand,
    end: Operand,
}

impl OverlapQuery {
    /// Name of the bin column.
    pub const BIN_COLUMN: &'static str = "_gri_bin";

    /// Creates a query for overlaps with `[start, end)` on sequence `rid` in the given table.
    pub fn new<R, S, E>(table: &str, rid: R, start: S, end: E) -> Self
        where R: Into<Operand>, S: Into<Operand>, E: Into<Operand>
    {
        OverlapQuery {
            table: table.to_string(),
            columns: OverlapColumns::default(),
            rid: rid.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Uses the given column names instead of the defaults.
    pub fn with_columns(mut self, columns: OverlapColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    // Returns the qualified name of a column.
    fn column(&self, name: &str) -> String {
        format!("{}.{}", utils::quote_identifier(&self.table), utils::quote_identifier(name))
    }

    // Returns (rid, start, end) if all operands are literals.
    fn literals(&self) -> Option<(i64, i64, i64)> {
        Some((self.rid.literal()?, self.start.literal()?, self.end.literal()?))
    }

    /// Returns the candidate bin ranges, if all operands are literals.
    ///
    /// Returns [`None`] if any operand is an expression.
    /// Returns an empty vector if the query interval is empty or inverted, or if the rid is invalid.
    pub fn candidate_ranges(&self) -> Option<Vec<RangeInclusive<i64>>> {
        let (rid, start, end) = self.literals()?;
        if rid < 0 || rid > u32::MAX as i64 || end <= 0 || start >= end {
            return Some(Vec::new());
        }
        Some(gri::candidate_ranges(rid as u32, start.max(0) as u64, end as u64))
    }

    /// Returns the bin filter.
    ///
    /// The filter is a disjunction of `BETWEEN` conditions, one for each level.
    pub fn bin_filter(&self) -> String {
        if let Some(ranges) = self.candidate_ranges() {
            if ranges.is_empty() {
                return String::from("0");
            }
            let bin = self.column(&self.columns.bin);
            let terms: Vec<String> = ranges.iter().map(|range| {
                if range.start() == range.end() {
                    format!("{} = {}", bin, range.start())
                } else {
                    format!("{} BETWEEN {} AND {}", bin, range.start(), range.end())
                }
            }).collect();
            return format!("({})", terms.join(" OR "));
        }
        self.symbolic_bin_filter()
    }

    // Candidate ranges computed by the database.
    fn symbolic_bin_filter(&self) -> String {
        let bin = self.column(&self.columns.bin);
        let rid_part = format!("({} << {})", self.rid, Bin::TILE_BITS + Bin::LEVEL_BITS);
        let start = format!("max({}, 0)", self.start);
        let last = format!("max({} - 1, 0)", self.end);
        let mut terms: Vec<String> = Vec::with_capacity(Bin::LEVELS);
        for level in BinLevel::all() {
            let level_part = (level.number() as i64) << Bin::TILE_BITS;
            if level.is_top() {
                terms.push(format!("{} = ({} | {})", bin, rid_part, level_part));
                continue;
            }
            let low = format!("min({} >> {}, {})", start, level.shift(), Bin::MAX_TILE);
            let high = format!("min({} >> {}, {})", last, level.shift(), Bin::MAX_TILE);
            terms.push(format!(
                "{} BETWEEN ({} | {} | {}) AND ({} | {} | {})",
                bin, rid_part, level_part, low, rid_part, level_part, high
            ));
        }
        format!("({})", terms.join(" OR "))
    }

    /// Returns the exact refinement.
    pub fn refinement(&self) -> String {
        let pos = self.column(&self.columns.pos);
        let rlen = self.column(&self.columns.rlen);
        format!(
            "{} = {} AND {} < {} AND {} + {} > {}",
            self.column(&self.columns.rid), self.rid,
            pos, self.end,
            pos, rlen, self.start
        )
    }

    /// Returns the full predicate: guard, bin filter, and exact refinement.
    ///
    /// An empty or inverted literal interval compiles to `0`, which matches nothing.
    pub fn predicate(&self) -> String {
        if let Some(ranges) = self.candidate_ranges() {
            if ranges.is_empty() {
                return String::from("0");
            }
            return format!("{} AND {}", self.bin_filter(), self.refinement());
        }
        format!("{} < {} AND {} AND {}", self.start, self.end, self.bin_filter(), self.refinement())
    }

    /// Returns a fragment `table WHERE predicate` for use in a `FROM` clause.
    ///
    /// Additional conditions can be appended with `AND`.
    pub fn fragment(&self) -> String {
        format!("{} WHERE {}", utils::quote_identifier(&self.table), self.predicate())
    }

    /// Returns a subquery selecting the rowids of the overlapping rows.
    pub fn rowid_subquery(&self) -> String {
        format!("SELECT {} FROM {}", self.column("rowid"), self.fragment())
    }

    /// Evaluates the predicate for a row in Rust.
    ///
    /// Returns [`None`] if any operand is an expression.
    /// The result is the same as the result of the exact refinement in the database.
    pub fn matches(&self, rid: i64, pos: i64, rlen: i64) -> Option<bool> {
        let (query_rid, start, end) = self.literals()?;
        Some(start < end && rid == query_rid && pos < end && pos + rlen > start)
    }

    /// Returns `true` if the bin filter would accept the given bin.
    ///
    /// Returns [`None`] if any operand is an expression.
    pub fn accepts_bin(&self, bin: i64) -> Option<bool> {
        let ranges = self.candidate_ranges()?;
        Some(ranges.iter().any(|range| range.contains(&bin)))
    }
}

//-----------------------------------------------------------------------------
