//! Error type shared by the loader, the reference catalog, and the database interface.

use thiserror::Error;

//-----------------------------------------------------------------------------

/// Errors from building or reading a VCF-base database.
///
/// Every error is fatal to the current load.
/// The enclosing transaction is dropped, which leaves the database unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested reference assembly is not in the built-in catalog.
    #[error("Unknown assembly: {0}")]
    UnknownAssembly(String),

    /// A contig name could not be resolved to a reference sequence identifier.
    #[error("Contig {name} is not in assembly {assembly}")]
    UnresolvedContig { name: String, assembly: String },

    /// A genotype call has more than two alleles.
    #[error("Unsupported ploidy {ploidy} in genotype {token}")]
    UnsupportedPloidy { ploidy: usize, token: String },

    /// A field declared as numeric could not be parsed.
    #[error("Malformed numeric value {value} for field {field}")]
    MalformedNumericField { field: String, value: String },

    /// A genotype string could not be parsed.
    #[error("Malformed genotype token {0}")]
    MalformedGenotypeToken(String),

    /// A table with the same name already exists in the database.
    #[error("Table {0} already exists")]
    TablePrefixCollision(String),

    /// The table prefix is not a valid SQL identifier prefix.
    #[error("Invalid table prefix: {0}")]
    InvalidTablePrefix(String),

    /// The VCF header is missing required information or cannot be parsed.
    #[error("Malformed VCF header: {0}")]
    MalformedHeader(String),

    /// A VCF data line cannot be parsed.
    #[error("Malformed VCF record: {0}")]
    MalformedRecord(String),

    /// The database was not created by this version or with these tables.
    #[error("Incompatible database: {0}")]
    IncompatibleDatabase(String),

    /// A loader step was called in the wrong state.
    #[error("Loader is in state {found}; expected {expected}")]
    InvalidState { expected: String, found: String },

    /// Passed through from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Passed through from I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Passed through from JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

//-----------------------------------------------------------------------------
