//! # VCF-base: variant call files in SQLite with a genomic range index.
//!
//! This crate loads VCF files into a SQLite database and answers interval overlap queries using plain SQL.
//! The database is intended for interactive applications that need a small region of a large call set.
//! Rows are never fetched by scanning the entire variant table, as long as the query region is known.
//!
//! ### Genomic range index
//!
//! Every variant row is assigned to a bin in a hierarchical binning scheme (GRI).
//! The scheme has seven levels.
//! At level `l < 6`, the bins are tiles of `2^(14 + 3l)` bp, from 16 kbp to 512 Mbp.
//! Level 6 contains a single bin for the entire reference sequence.
//! A variant is placed in the finest bin that contains its entire reference interval.
//! The bin identifier combines the reference sequence, the level, and the tile into a single integer stored in column `_gri_bin`.
//!
//! A query interval corresponds to one contiguous range of bin identifiers at each level.
//! [`OverlapQuery`] turns a query into an SQL predicate that filters by these ranges using the index and refines the result with the exact overlap test.
//! See [`gri`] and [`overlap`].
//!
//! ### Tables
//!
//! A database may contain several datasets, each using its own table name prefix:
//!
//! * `{prefix}gri_refseq`: reference sequences with dense integer identifiers (`rid`).
//! * `{prefix}samples`: sample names in header order.
//! * `{prefix}variants`: one row per VCF record with coordinates, alleles, and typed INFO columns.
//! * `{prefix}genotypes`: one row per record and sample with the genotype call and FORMAT fields.
//! * `{prefix}tags`: dataset information as key-value pairs.
//!
//! Coordinates in the database are 0-based.
//! Column `pos` is the VCF position minus one, and `rlen` is the length of the reference interval.
//! Multi-valued fields are stored as JSON arrays in columns with suffix `_jsarray`.
//!
//! See [`VcfLoader`] and [`LoadSession`] for loading data.
//! See [`VariantBase`] and [`VariantInterface`] for reading it back.
//! See [`ReferenceCatalog`] for reference sequences and [`GenotypeEncoder`] for genotype rows.

pub mod db;
pub mod error;
pub mod formats;
pub mod genotype;
pub mod gri;
pub mod loader;
pub mod overlap;
pub mod reference;
pub mod utils;

#[cfg(test)]
pub(crate) mod internal;

pub use db::{ColumnDef, DatabaseFileType, GenotypeRecord, TableNames, VariantBase, VariantInterface, VariantRecord};
pub use error::{Error, Result};
pub use formats::{FieldDef, FieldValue, InfoEncoder, VcfHeader, VcfRecord};
pub use genotype::{Genotype, GenotypeEncoder, PhaseHandling};
pub use gri::Bin;
pub use loader::{AssemblySelection, LoadSession, LoadSummary, LoaderState, VcfLoader};
pub use overlap::{Operand, OverlapQuery};
pub use reference::{ReferenceCatalog, ReferenceSequence};
