//! VCF-base: SQLite tables storing variants, genotypes, and reference sequences with a genomic range index.
//!
//! Each dataset lives in its own set of tables, namespaced by a table prefix ([`TableNames`]).
//! Several datasets can coexist in the same database file.
//! The tables are created by the loader (see [`crate::loader`]) and read through [`VariantBase`] and [`VariantInterface`].

use crate::{Error, Result};
use crate::genotype::PhaseHandling;
use crate::gri::{self, Bin};
use crate::overlap::{Operand, OverlapQuery};
use crate::reference::ReferenceCatalog;
use crate::utils;

use std::fs;
use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Statement};


//-----------------------------------------------------------------------------

/// A column in a table created for a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// SQL type of the column.
    pub sql_type: &'static str,
}

impl ColumnDef {
    /// Creates a new column definition.
    pub fn new(name: &str, sql_type: &'static str) -> Self {
        ColumnDef { name: name.to_string(), sql_type }
    }

    /// Returns the column definition for `CREATE TABLE`.
    pub fn definition(&self) -> String {
        format!("{} {}", utils::quote_identifier(&self.name), self.sql_type)
    }

    /// Checks that the column names are distinct when compared without case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] on the first clash.
    pub fn check_unique(columns: &[ColumnDef]) -> Result<()> {
        let mut seen: std::collections::HashMap<String, &str> = std::collections::HashMap::new();
        for column in columns.iter() {
            if let Some(previous) = seen.insert(column.name.to_lowercase(), &column.name) {
                return Err(Error::MalformedHeader(format!("Column {} clashes with column {}", column.name, previous)));
            }
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Names of the tables for a dataset with the given prefix.
///
/// The prefix must be empty or match `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Examples
///
/// ```
/// use vcf_base::TableNames;
///
/// let tables = TableNames::new("gnomad_").unwrap();
/// assert_eq!(tables.variants, "gnomad_variants");
/// assert_eq!(tables.refseq, "gnomad_gri_refseq");
/// assert!(TableNames::new("1kg").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    /// The table prefix.
    pub prefix: String,
    /// Reference sequences.
    pub refseq: String,
    /// Sample names.
    pub samples: String,
    /// Variant sites.
    pub variants: String,
    /// Genotypes, one row per site and sample.
    pub genotypes: String,
    /// Key-value pairs describing the dataset.
    pub tags: String,
    /// Index on the GRI bin column of the variant table.
    pub variant_index: String,
}

impl TableNames {
    /// Returns the table names for the given prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTablePrefix`] if the prefix is not a valid identifier prefix.
    pub fn new(prefix: &str) -> Result<Self> {
        let mut chars = prefix.chars();
        let valid = match chars.next() {
            None => true,
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            },
        };
        if !valid {
            return Err(Error::InvalidTablePrefix(prefix.to_string()));
        }
        Ok(TableNames {
            prefix: prefix.to_string(),
            refseq: format!("{}gri_refseq", prefix),
            samples: format!("{}samples", prefix),
            variants: format!("{}variants", prefix),
            genotypes: format!("{}genotypes", prefix),
            tags: format!("{}tags", prefix),
            variant_index: format!("{}variants_gri", prefix),
        })
    }

    /// Returns the names of all tables.
    pub fn tables(&self) -> [&str; 5] {
        [&self.refseq, &self.samples, &self.variants, &self.genotypes, &self.tags]
    }

    /// Returns the tables that already exist in the database.
    pub fn existing(&self, connection: &Connection) -> Result<Vec<String>> {
        let mut result = Vec::new();
        for table in self.tables() {
            if utils::table_exists(connection, table)? {
                result.push(table.to_string());
            }
        }
        Ok(result)
    }

    /// Checks that none of the tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TablePrefixCollision`] for the first existing table.
    pub fn check_available(&self, connection: &Connection) -> Result<()> {
        match self.existing(connection)?.into_iter().next() {
            Some(table) => Err(Error::TablePrefixCollision(table)),
            None => Ok(()),
        }
    }

    /// Fixed columns of the variant table, before the INFO columns.
    pub fn variant_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("rowid", "INTEGER PRIMARY KEY"),
            ColumnDef::new("rid", "INTEGER NOT NULL"),
            ColumnDef::new("pos", "INTEGER NOT NULL"),
            ColumnDef::new("rlen", "INTEGER NOT NULL"),
            ColumnDef::new("ref", "TEXT NOT NULL"),
            ColumnDef::new("alt_jsarray", "TEXT NOT NULL"),
            ColumnDef::new("qual", "REAL"),
            ColumnDef::new("id_jsarray", "TEXT"),
            ColumnDef::new("filter_jsarray", "TEXT"),
            ColumnDef::new(OverlapQuery::BIN_COLUMN, "INTEGER NOT NULL"),
        ]
    }

    /// Creates the samples table and inserts the samples in order.
    pub fn create_samples(&self, connection: &Connection, samples: &[String]) -> Result<()> {
        let table = utils::quote_identifier(&self.samples);
        connection.execute(
            &format!(
                "CREATE TABLE {} (
                    sample_id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                ) STRICT",
                table
            ),
            (),
        )?;
        let mut insert = connection.prepare(&format!("INSERT INTO {}(sample_id, name) VALUES (?1, ?2)", table))?;
        for (sample_id, name) in samples.iter().enumerate() {
            insert.execute((sample_id, name))?;
        }
        Ok(())
    }

    /// Creates the variant table with the given INFO columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the column names clash.
    /// Passes through database errors.
    pub fn create_variants(&self, connection: &Connection, info: &[ColumnDef]) -> Result<()> {
        let mut columns = Self::variant_columns();
        columns.extend(info.iter().cloned());
        ColumnDef::check_unique(&columns)?;
        let definitions: Vec<String> = columns.iter().map(|column| column.definition()).collect();
        connection.execute(
            &format!("CREATE TABLE {} ({}) STRICT", utils::quote_identifier(&self.variants), definitions.join(", ")),
            (),
        )?;
        Ok(())
    }

    /// Creates the genotype table with the given columns.
    ///
    /// The first two columns are the variant rowid and the sample id, which form the primary key.
    pub fn create_genotypes(&self, connection: &Connection, layout: &[ColumnDef]) -> Result<()> {
        ColumnDef::check_unique(layout)?;
        let mut definitions: Vec<String> = layout.iter().map(|column| column.definition()).collect();
        if layout.len() >= 2 {
            definitions[0] = format!(
                "{} NOT NULL REFERENCES {}(rowid)",
                definitions[0], utils::quote_identifier(&self.variants)
            );
            definitions[1] = format!("{} NOT NULL", definitions[1]);
            definitions.push(format!(
                "PRIMARY KEY ({}, {})",
                utils::quote_identifier(&layout[0].name), utils::quote_identifier(&layout[1].name)
            ));
        }
        connection.execute(
            &format!("CREATE TABLE {} ({}) STRICT", utils::quote_identifier(&self.genotypes), definitions.join(", ")),
            (),
        )?;
        Ok(())
    }

    /// Creates the index on the GRI bin column of the variant table.
    pub fn create_variant_index(&self, connection: &Connection) -> Result<()> {
        connection.execute(
            &format!(
                "CREATE INDEX {} ON {}({})",
                utils::quote_identifier(&self.variant_index),
                utils::quote_identifier(&self.variants),
                utils::quote_identifier(OverlapQuery::BIN_COLUMN)
            ),
            (),
        )?;
        Ok(())
    }

    /// Creates the tags table and inserts the key-value pairs.
    pub fn create_tags(&self, connection: &Connection, tags: &[(&str, String)]) -> Result<()> {
        let table = utils::quote_identifier(&self.tags);
        connection.execute(
            &format!(
                "CREATE TABLE {} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                ) STRICT",
                table
            ),
            (),
        )?;
        let mut insert = connection.prepare(&format!("INSERT INTO {}(key, value) VALUES (?1, ?2)", table))?;
        for (key, value) in tags.iter() {
            insert.execute((key, value))?;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// A database connection to one dataset in a VCF-base database.
///
/// This structure stores a database connection and the dataset header from the tags table.
/// In multi-threaded applications, each thread should have its own connection.
/// Queries are supported through the [`VariantInterface`] structure.
#[derive(Debug)]
pub struct VariantBase {
    connection: Connection,
    tables: TableNames,
    version: String,
    assembly: String,
    variants: usize,
    samples: usize,
    genotypes: usize,
    phasing: PhaseHandling,
}

/// Using the database.
impl VariantBase {
    /// Current database version.
    pub const VERSION: &'static str = "VCF-base v0.1.0";

    // Key for database version.
    pub(crate) const KEY_VERSION: &'static str = "version";

    // Key for assembly name.
    pub(crate) const KEY_ASSEMBLY: &'static str = "assembly";

    // Key for variant count.
    pub(crate) const KEY_VARIANTS: &'static str = "variants";

    // Key for sample count.
    pub(crate) const KEY_SAMPLES: &'static str = "samples";

    // Key for genotype count.
    pub(crate) const KEY_GENOTYPES: &'static str = "genotypes";

    // Key for phase handling.
    pub(crate) const KEY_PHASE_HANDLING: &'static str = "phase_handling";

    // Key for the tile size ladder.
    pub(crate) const KEY_GRI_LEVELS: &'static str = "gri_levels";

    /// Opens a read-only connection to the dataset with the given table prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleDatabase`] if the dataset does not exist or was created with another version or bin layout.
    /// Passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P, prefix: &str) -> Result<Self> {
        let tables = TableNames::new(prefix)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(filename, flags)?;
        if !utils::table_exists(&connection, &tables.tags)? {
            return Err(Error::IncompatibleDatabase(format!("No dataset with table prefix {:?}", prefix)));
        }

        // Get the header information.
        let mut get_tag = connection.prepare(
            &format!("SELECT value FROM {} WHERE key = ?1", utils::quote_identifier(&tables.tags))
        )?;
        let version = get_string_value(&mut get_tag, Self::KEY_VERSION)?;
        if version != Self::VERSION {
            return Err(Error::IncompatibleDatabase(format!("Unsupported database version: {} (expected {})", version, Self::VERSION)));
        }
        let levels = get_string_value(&mut get_tag, Self::KEY_GRI_LEVELS)?;
        if levels != gri::describe_levels() {
            return Err(Error::IncompatibleDatabase(format!("Unsupported GRI levels: {}", levels)));
        }
        let assembly = get_string_value(&mut get_tag, Self::KEY_ASSEMBLY)?;
        let variants = get_numeric_value(&mut get_tag, Self::KEY_VARIANTS)?;
        let samples = get_numeric_value(&mut get_tag, Self::KEY_SAMPLES)?;
        let genotypes = get_numeric_value(&mut get_tag, Self::KEY_GENOTYPES)?;
        let phasing = get_string_value(&mut get_tag, Self::KEY_PHASE_HANDLING)?;
        let phasing = PhaseHandling::parse(&phasing).ok_or_else(|| {
            Error::IncompatibleDatabase(format!("Unknown phase handling: {}", phasing))
        })?;
        drop(get_tag);

        Ok(VariantBase {
            connection, tables, version,
            assembly, variants, samples, genotypes, phasing,
        })
    }

    /// Returns the filename of the database or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the underlying connection for custom queries.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the table names of the dataset.
    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the name of the reference assembly.
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Returns the number of variant sites.
    pub fn variants(&self) -> usize {
        self.variants
    }

    /// Returns the number of samples.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the number of genotype rows.
    pub fn genotypes(&self) -> usize {
        self.genotypes
    }

    /// Returns the phase handling used when loading the dataset.
    pub fn phasing(&self) -> PhaseHandling {
        self.phasing
    }

    /// Returns the reference catalog of the dataset.
    pub fn catalog(&self) -> Result<ReferenceCatalog> {
        ReferenceCatalog::load(&self.connection, &self.tables)
    }
}

//-----------------------------------------------------------------------------

/// A variant site read from the database.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    /// Row identifier, 1-based in input order.
    pub rowid: i64,
    /// Reference sequence identifier.
    pub rid: u32,
    /// 0-based starting position.
    pub pos: u64,
    /// Length of the reference interval.
    pub rlen: u64,
    /// Reference allele.
    pub reference: String,
    /// Alternate alleles.
    pub alt: Vec<String>,
    /// Quality.
    pub qual: Option<f64>,
    /// Identifiers, or [`None`] if the ID column was missing.
    pub ids: Option<Vec<String>>,
    /// Filters, or [`None`] if the FILTER column was missing.
    pub filters: Option<Vec<String>>,
    /// GRI bin identifier.
    pub bin: i64,
}

impl VariantRecord {
    /// Returns the end of the reference interval (exclusive).
    pub fn end(&self) -> u64 {
        self.pos + self.rlen
    }

    /// Returns the decoded GRI bin.
    pub fn bin(&self) -> Option<Bin> {
        Bin::from_id(self.bin)
    }
}

/// A genotype row read from the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenotypeRecord {
    /// Rowid of the variant.
    pub variant_rowid: i64,
    /// Sample identifier.
    pub sample_id: usize,
    /// First allele index.
    pub gt1: Option<u32>,
    /// Second allele index.
    pub gt2: Option<u32>,
    /// Phase, if it was retained and the call was present.
    pub phased: Option<bool>,
}

//-----------------------------------------------------------------------------

/// Database query interface.
///
/// This structure stores prepared statements for accessing one dataset.
/// Overlap queries use the fragment from [`OverlapQuery`] with the contig name resolved through a join against the reference sequence table.
///
/// # Examples
///
/// ```
/// use vcf_base::{utils, loader, LoadSession, PhaseHandling, VariantBase, VariantInterface};
///
/// let vcf_file = utils::get_test_data("small.vcf");
/// let dir = tempfile::tempdir().unwrap();
/// let db_file = dir.path().join("small.db");
/// let session = LoadSession::new("", PhaseHandling::Retain);
/// loader::create_from_file(&vcf_file, &db_file, &session).unwrap();
///
/// let database = VariantBase::open(&db_file, "").unwrap();
/// let mut interface = VariantInterface::new(&database).unwrap();
/// let sites = interface.overlapping("chr1", 0, 20000).unwrap();
/// assert!(!sites.is_empty());
/// for site in sites.iter() {
///     assert!(site.pos < 20000 && site.end() > 0);
/// }
/// ```
#[derive(Debug)]
pub struct VariantInterface<'a> {
    get_tag: Statement<'a>,
    find_rid: Statement<'a>,
    sample_names: Statement<'a>,
    get_variant: Statement<'a>,
    overlapping: Statement<'a>,
    overlapping_rid: Statement<'a>,
    genotypes: Statement<'a>,
    phased: bool,
}

impl<'a> VariantInterface<'a> {
    /// Returns a new interface to the given dataset.
    ///
    /// Passes through any database errors.
    pub fn new(database: &'a VariantBase) -> Result<Self> {
        let tables = &database.tables;
        let variants = utils::quote_identifier(&tables.variants);
        let columns = Self::variant_columns(&variants);

        let get_tag = database.connection.prepare(
            &format!("SELECT value FROM {} WHERE key = ?1", utils::quote_identifier(&tables.tags))
        )?;

        let find_rid = database.connection.prepare(
            &format!("SELECT rid FROM {} WHERE name = ?1", utils::quote_identifier(&tables.refseq))
        )?;

        let sample_names = database.connection.prepare(
            &format!("SELECT name FROM {} ORDER BY sample_id", utils::quote_identifier(&tables.samples))
        )?;

        let get_variant = database.connection.prepare(
            &format!("SELECT {} FROM {} WHERE rowid = ?1", columns, variants)
        )?;

        let by_name = OverlapQuery::new(&tables.variants, Operand::expr("chrom.rid"), Operand::expr("?2"), Operand::expr("?3"));
        let overlapping = database.connection.prepare(
            &format!(
                "SELECT {} FROM (SELECT rid FROM {} WHERE name = ?1) AS chrom, {} ORDER BY {}.pos, {}.rowid",
                columns, utils::quote_identifier(&tables.refseq), by_name.fragment(), variants, variants
            )
        )?;

        let by_rid = OverlapQuery::new(&tables.variants, Operand::expr("?1"), Operand::expr("?2"), Operand::expr("?3"));
        let overlapping_rid = database.connection.prepare(
            &format!("SELECT {} FROM {} ORDER BY {}.pos, {}.rowid", columns, by_rid.fragment(), variants, variants)
        )?;

        let phased = database.phasing == PhaseHandling::Retain;
        let genotypes = database.connection.prepare(
            &format!(
                "SELECT variant_rowid, sample_id, GT1, GT2, {} FROM {} WHERE variant_rowid = ?1 ORDER BY sample_id",
                if phased { "phased" } else { "NULL" },
                utils::quote_identifier(&tables.genotypes)
            )
        )?;

        Ok(VariantInterface {
            get_tag, find_rid, sample_names,
            get_variant, overlapping, overlapping_rid,
            genotypes, phased,
        })
    }

    fn variant_columns(table: &str) -> String {
        let names = ["rowid", "rid", "pos", "rlen", "ref", "alt_jsarray", "qual", "id_jsarray", "filter_jsarray", OverlapQuery::BIN_COLUMN];
        let columns: Vec<String> = names.iter().map(|name| format!("{}.{}", table, utils::quote_identifier(name))).collect();
        columns.join(", ")
    }

    /// Returns the value of the tag with the given key, or [`None`] if the tag does not exist.
    pub fn get_tag(&mut self, key: &str) -> Result<Option<String>> {
        let value = self.get_tag.query_row((key,), |row| row.get(0)).optional()?;
        Ok(value)
    }

    /// Returns the identifier of the reference sequence with the given name, or [`None`] if there is no such sequence.
    pub fn find_rid(&mut self, name: &str) -> Result<Option<u32>> {
        let rid = self.find_rid.query_row((name,), |row| row.get(0)).optional()?;
        Ok(rid)
    }

    /// Returns the sample names in sample id order.
    pub fn sample_names(&mut self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        let mut rows = self.sample_names.query(())?;
        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }
        Ok(result)
    }

    fn row_to_variant(row: &Row) -> rusqlite::Result<VariantRecord> {
        let alt: String = row.get(5)?;
        let ids: Option<String> = row.get(7)?;
        let filters: Option<String> = row.get(8)?;
        Ok(VariantRecord {
            rowid: row.get(0)?,
            rid: row.get(1)?,
            pos: row.get::<_, i64>(2)? as u64,
            rlen: row.get::<_, i64>(3)? as u64,
            reference: row.get(4)?,
            alt: decode_list(5, &alt)?,
            qual: row.get(6)?,
            ids: ids.map(|value| decode_list(7, &value)).transpose()?,
            filters: filters.map(|value| decode_list(8, &value)).transpose()?,
            bin: row.get(9)?,
        })
    }

    /// Returns the variant with the given rowid, or [`None`] if there is no such variant.
    pub fn get_variant(&mut self, rowid: i64) -> Result<Option<VariantRecord>> {
        let variant = self.get_variant.query_row((rowid,), Self::row_to_variant).optional()?;
        Ok(variant)
    }

    fn collect_variants(rows: &mut rusqlite::Rows) -> Result<Vec<VariantRecord>> {
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(Self::row_to_variant(row)?);
        }
        Ok(result)
    }

    /// Returns the variants overlapping `[start, end)` on the named contig in order of position.
    ///
    /// Returns an empty vector if the contig does not exist or the interval is empty.
    pub fn overlapping(&mut self, contig: &str, start: i64, end: i64) -> Result<Vec<VariantRecord>> {
        let mut rows = self.overlapping.query((contig, start, end))?;
        Self::collect_variants(&mut rows)
    }

    /// Returns the variants overlapping `[start, end)` on reference sequence `rid` in order of position.
    pub fn overlapping_rid(&mut self, rid: u32, start: i64, end: i64) -> Result<Vec<VariantRecord>> {
        let mut rows = self.overlapping_rid.query((rid, start, end))?;
        Self::collect_variants(&mut rows)
    }

    /// Returns the genotypes for the variant in sample id order.
    pub fn genotypes(&mut self, variant_rowid: i64) -> Result<Vec<GenotypeRecord>> {
        let mut result = Vec::new();
        let mut rows = self.genotypes.query((variant_rowid,))?;
        while let Some(row) = rows.next()? {
            let phased: Option<i64> = row.get(4)?;
            result.push(GenotypeRecord {
                variant_rowid: row.get(0)?,
                sample_id: row.get(1)?,
                gt1: row.get(2)?,
                gt2: row.get(3)?,
                phased: if self.phased { phased.map(|x| x != 0) } else { None },
            });
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------

// Helper types and functions for using the databases.

/// Type of a potential database file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseFileType {
    /// The file does not exist.
    Missing,
    /// The file is not a valid SQLite database.
    NotDatabase,
    /// The file is a SQLite database without a dataset with the given prefix.
    UnknownDatabase,
    /// The file contains a dataset with the given version string.
    Version(String),
}

/// Determines the type of the given file, which may be a SQLite database with a dataset using the given table prefix.
pub fn identify_database<P: AsRef<Path>>(filename: P, prefix: &str) -> DatabaseFileType {
    let metadata = match fs::metadata(&filename) {
        Ok(metadata) => metadata,
        Err(_) => return DatabaseFileType::Missing,
    };
    if !metadata.is_file() {
        return DatabaseFileType::NotDatabase;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = match Connection::open_with_flags(filename, flags) {
        Ok(connection) => connection,
        Err(_) => return DatabaseFileType::NotDatabase,
    };
    // Opening succeeds lazily, so a non-database file fails here.
    if connection.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0)).is_err() {
        return DatabaseFileType::NotDatabase;
    }

    let tables = match TableNames::new(prefix) {
        Ok(tables) => tables,
        Err(_) => return DatabaseFileType::UnknownDatabase,
    };
    let sql = format!("SELECT value FROM {} WHERE key = 'version'", utils::quote_identifier(&tables.tags));
    let version: rusqlite::Result<String> = connection.query_row(&sql, [], |row| row.get(0));
    match version {
        Ok(version) => DatabaseFileType::Version(version),
        Err(_) => DatabaseFileType::UnknownDatabase,
    }
}

// Decodes a JSON array of strings stored in the given column.
fn decode_list(column: usize, value: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(value).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
    })
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value.
fn get_string_value(statement: &mut Statement, key: &str) -> Result<String> {
    let result: rusqlite::Result<String> = statement.query_row(
        (key,),
        |row| row.get(0)
    );
    result.map_err(|x| Error::IncompatibleDatabase(format!("Key not found: {} ({})", key, x)))
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value as an integer.
fn get_numeric_value(statement: &mut Statement, key: &str) -> Result<usize> {
    let value = get_string_value(statement, key)?;
    value.parse::<usize>().map_err(|x| Error::IncompatibleDatabase(format!("Invalid value for {}: {}", key, x)))
}

//-----------------------------------------------------------------------------
