//! Loading VCF files into a VCF-base database.
//!
//! A load is described by an immutable [`LoadSession`], which is passed by reference to every stage.
//! [`VcfLoader`] streams the input into the tables of one dataset:
//!
//! * the reference catalog in `{prefix}gri_refseq`;
//! * sample names in `{prefix}samples`;
//! * one row per site in `{prefix}variants`, with the GRI bin in column `_gri_bin`;
//! * one row per site and sample in `{prefix}genotypes`;
//! * dataset information in `{prefix}tags`.
//!
//! Everything happens in a single transaction.
//! Any error aborts the load, and dropping the loader rolls back the transaction, which leaves the database unchanged.
//! There is no mode for skipping bad records.
//!
//! Use [`load_vcf`] for a reader and an open connection, or [`create_from_file`] for files.

use crate::{Error, Result};
use crate::db::{TableNames, VariantBase};
use crate::formats::{InfoEncoder, VcfHeader, VcfRecord};
use crate::genotype::{FormatLayout, GenotypeEncoder, PhaseHandling};
use crate::gri::{self, Bin};
use crate::reference::ReferenceCatalog;
use crate::utils;

use std::fmt::Display;
use std::fs;
use std::io::BufRead;
use std::path::Path;

use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Which reference catalog to use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblySelection {
    /// Build the catalog from the `##contig` lines of the header.
    Header,
    /// Use the named built-in assembly.
    Named(String),
}

impl AssemblySelection {
    /// Returns the catalog for the given header.
    ///
    /// With a built-in assembly, contigs with different lengths in the header are reported as warnings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAssembly`] if the assembly is not built-in.
    /// Returns [`Error::MalformedHeader`] if a header contig has no length.
    pub fn catalog(&self, header: &VcfHeader) -> Result<ReferenceCatalog> {
        match self {
            AssemblySelection::Header => ReferenceCatalog::from_header(header),
            AssemblySelection::Named(name) => {
                let catalog = ReferenceCatalog::resolve(name)?;
                catalog.check_header(header);
                Ok(catalog)
            },
        }
    }
}

/// Parameters for a load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadSession {
    /// Prefix for the names of all tables.
    pub table_prefix: String,
    /// Reference catalog.
    pub assembly: AssemblySelection,
    /// Whether to store genotype phase.
    pub phasing: PhaseHandling,
    /// Number of variant sites inserted at a time.
    pub batch_size: usize,
}

impl LoadSession {
    /// Default for [`LoadSession::batch_size`].
    pub const BATCH_SIZE: usize = 1000;

    /// Creates a session using the header as the reference catalog.
    pub fn new(table_prefix: &str, phasing: PhaseHandling) -> Self {
        LoadSession {
            table_prefix: table_prefix.to_string(),
            assembly: AssemblySelection::Header,
            phasing,
            batch_size: Self::BATCH_SIZE,
        }
    }

    /// Uses the named built-in assembly.
    pub fn with_assembly(mut self, assembly: &str) -> Self {
        self.assembly = AssemblySelection::Named(assembly.to_string());
        self
    }

    /// Sets the batch size. Batches always contain at least one site.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

//-----------------------------------------------------------------------------

/// Loader states in the order they are visited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderState {
    /// The transaction is open, but the header has not been read.
    Open,
    /// The header has been read and the tables have been created.
    HeaderParsed,
    /// Records are being buffered.
    Streaming,
    /// All buffered records have been inserted.
    Flushed,
    /// The transaction has been committed.
    Closed,
    /// A step failed and the transaction has been rolled back.
    Failed,
}

impl Display for LoaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoaderState::Open => "OPEN",
            LoaderState::HeaderParsed => "HEADER_PARSED",
            LoaderState::Streaming => "STREAMING",
            LoaderState::Flushed => "FLUSHED",
            LoaderState::Closed => "CLOSED",
            LoaderState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Statistics from a completed load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    /// Assembly of the reference catalog.
    pub assembly: String,
    /// Number of reference sequences.
    pub reference_sequences: usize,
    /// Number of samples.
    pub samples: usize,
    /// Number of variant rows.
    pub variants: usize,
    /// Number of genotype rows.
    pub genotypes: usize,
    /// Number of input lines, including the header.
    pub lines: usize,
}

// Everything derived from the header.
#[derive(Debug)]
struct Schema {
    catalog: ReferenceCatalog,
    samples: usize,
    info: InfoEncoder,
    genotypes: GenotypeEncoder,
    insert_variant: String,
    insert_genotype: String,
}

//-----------------------------------------------------------------------------

/// A streaming loader for one dataset.
///
/// The loader owns a transaction on the connection.
/// It walks the states in [`LoaderState`], and calling a step in the wrong state fails with [`Error::InvalidState`].
/// If the loader is dropped before [`VcfLoader::finish`], the transaction is rolled back.
/// If a step fails for any other reason, the transaction is rolled back immediately and the loader moves to [`LoaderState::Failed`].
/// No further steps are accepted after that.
///
/// # Examples
///
/// ```
/// use vcf_base::{LoadSession, LoaderState, PhaseHandling, VcfLoader};
/// use rusqlite::Connection;
///
/// let vcf = "##fileformat=VCFv4.3
/// ###contig=<ID=chr1,length=1000000>
/// #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
/// chr1\t100\trs1\tA\tG\t50\tPASS\t.\tGT\t0/1\t./.
/// chr1\t200\t.\tAC\tA\t.\t.\t.\tGT\t1|1\t0|0
/// ";
///
/// let mut connection = Connection::open_in_memory().unwrap();
/// let session = LoadSession::new("demo_", PhaseHandling::Discard);
/// let mut loader = VcfLoader::new(&mut connection, &session).unwrap();
/// let mut reader = vcf.as_bytes();
/// loader.read_header(&mut reader).unwrap();
/// assert_eq!(loader.state(), LoaderState::HeaderParsed);
/// for line in vcf.lines().skip(3) {
///     loader.push_record(line.as_bytes()).unwrap();
/// }
/// let summary = loader.finish().unwrap();
/// assert_eq!(summary.variants, 2);
/// assert_eq!(summary.genotypes, 4);
/// drop(loader);
///
/// let missing: i64 = connection.query_row(
///     "SELECT COUNT(*) FROM demo_genotypes WHERE GT1 IS NULL AND GT2 IS NULL", (), |row| row.get(0)
/// ).unwrap();
/// assert_eq!(missing, 1);
/// ```
pub struct VcfLoader<'conn, 'session> {
    transaction: Option<Transaction<'conn>>,
    session: &'session LoadSession,
    tables: TableNames,
    state: LoaderState,
    schema: Option<Schema>,
    layout: FormatLayout,
    variant_batch: Vec<Vec<Value>>,
    genotype_batch: Vec<Vec<Value>>,
    next_rowid: i64,
    variants: usize,
    genotypes: usize,
    lines: usize,
}

impl<'conn, 'session> VcfLoader<'conn, 'session> {
    /// Starts a load into the given connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTablePrefix`] if the table prefix is invalid.
    /// Returns [`Error::TablePrefixCollision`] if any of the tables already exists.
    /// Passes through database errors.
    pub fn new(connection: &'conn mut Connection, session: &'session LoadSession) -> Result<Self> {
        let tables = TableNames::new(&session.table_prefix)?;
        let transaction = connection.transaction()?;
        tables.check_available(&transaction)?;
        Ok(VcfLoader {
            transaction: Some(transaction),
            session,
            tables,
            state: LoaderState::Open,
            schema: None,
            layout: FormatLayout::default(),
            variant_batch: Vec::new(),
            genotype_batch: Vec::new(),
            next_rowid: 1,
            variants: 0,
            genotypes: 0,
            lines: 0,
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Returns the session.
    pub fn session(&self) -> &LoadSession {
        self.session
    }

    /// Returns the table names.
    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Returns the number of input lines consumed so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    fn require(&self, allowed: &[LoaderState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            let expected: Vec<String> = allowed.iter().map(|state| state.to_string()).collect();
            Err(Error::InvalidState { expected: expected.join(" or "), found: self.state.to_string() })
        }
    }

    // Any failed step drops the buffered rows and rolls back the transaction.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = LoaderState::Failed;
            self.variant_batch.clear();
            self.genotype_batch.clear();
            self.transaction = None;
        }
        result
    }

    fn transaction(&self) -> Result<&Transaction<'conn>> {
        self.transaction.as_ref().ok_or_else(|| Error::InvalidState {
            expected: String::from("an open transaction"),
            found: self.state.to_string(),
        })
    }

    /// Reads the header and creates the tables.
    ///
    /// The reader is left at the first data line.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid, if the reference catalog cannot be built, or if the column names clash.
    /// Passes through database and I/O errors.
    pub fn read_header<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        self.require(&[LoaderState::Open])?;
        let result = self.parse_header(reader);
        self.check(result)
    }

    fn parse_header<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        let (header, lines) = VcfHeader::read(reader)?;
        self.lines += lines;

        let catalog = self.session.assembly.catalog(&header)?;
        let info = InfoEncoder::new(&header.info);
        let genotypes = GenotypeEncoder::new(&header.format, self.session.phasing)?;
        info!(
            "Header: {} samples, {} contigs, {} INFO fields, {} FORMAT fields; assembly {}",
            header.samples.len(), header.contigs.len(), header.info.len(), header.format.len(), catalog.assembly()
        );

        let transaction = self.transaction()?;
        catalog.register(transaction, &self.tables)?;
        self.tables.create_samples(transaction, &header.samples)?;
        let info_columns = info.columns();
        self.tables.create_variants(transaction, &info_columns)?;
        // Sites-only files still get an empty genotype table.
        let layout = genotypes.layout();
        self.tables.create_genotypes(transaction, &layout)?;

        let mut variant_columns: Vec<String> = TableNames::variant_columns().iter().map(|column| column.name.clone()).collect();
        variant_columns.extend(info_columns.into_iter().map(|column| column.name));
        let insert_variant = insert_statement(&self.tables.variants, &variant_columns);
        let genotype_columns: Vec<String> = layout.into_iter().map(|column| column.name).collect();
        let insert_genotype = insert_statement(&self.tables.genotypes, &genotype_columns);

        self.schema = Some(Schema {
            catalog,
            samples: header.samples.len(),
            info,
            genotypes,
            insert_variant,
            insert_genotype,
        });
        self.state = LoaderState::HeaderParsed;
        Ok(())
    }

    /// Parses a data line and buffers its rows.
    ///
    /// Empty lines are skipped.
    /// Inserts the buffered rows when the batch is full.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is invalid or names a contig absent from the catalog.
    /// The error is also logged with the line number.
    pub fn push_record(&mut self, line: &[u8]) -> Result<()> {
        self.require(&[LoaderState::HeaderParsed, LoaderState::Streaming, LoaderState::Flushed])?;
        self.lines += 1;
        if line.iter().all(|c| c.is_ascii_whitespace()) {
            return Ok(());
        }
        self.state = LoaderState::Streaming;

        if let Err(err) = self.buffer_record(line) {
            error!("Line {}: {}", self.lines, err);
            return self.check(Err(err));
        }
        if self.variant_batch.len() >= self.session.batch_size {
            let result = self.insert_batches();
            self.check(result)?;
        }
        Ok(())
    }

    fn buffer_record(&mut self, line: &[u8]) -> Result<()> {
        let schema = self.schema.as_ref().ok_or_else(|| Error::InvalidState {
            expected: LoaderState::HeaderParsed.to_string(),
            found: self.state.to_string(),
        })?;
        let record = VcfRecord::parse(line, schema.samples)?;
        let rid = schema.catalog.lookup(record.chrom)?;
        let pos = record.start();
        let rlen = record.reference_length()?;
        if pos.checked_add(rlen).map_or(true, |end| end > i64::MAX as u64) {
            return Err(Error::MalformedRecord(format!(
                "Interval at {}:{} with length {} is too large", record.chrom, record.pos, rlen
            )));
        }
        let bin = Bin::new(rid, pos, rlen);
        let rowid = self.next_rowid;

        let mut row: Vec<Value> = Vec::with_capacity(10 + schema.info.fields().len());
        row.push(Value::Integer(rowid));
        row.push(Value::Integer(rid as i64));
        // Both fit, as pos + rlen does.
        row.push(Value::Integer(pos as i64));
        row.push(Value::Integer(rlen as i64));
        row.push(Value::Text(String::from_utf8_lossy(record.reference).to_string()));
        row.push(Value::Text(serde_json::to_string(&record.alt_alleles())?));
        row.push(record.quality()?.map(Value::Real).unwrap_or(Value::Null));
        row.push(json_or_null(record.ids())?);
        row.push(json_or_null(record.filters())?);
        row.push(Value::Integer(bin.id()));
        row.extend(schema.info.encode(&record)?.into_iter().map(Value::from));

        let mut genotype_rows: Vec<Vec<Value>> = Vec::with_capacity(record.samples.len());
        if !record.samples.is_empty() {
            let format = record.format.unwrap_or(b".");
            if !self.layout.is_for(format) {
                self.layout = schema.genotypes.format_layout(format);
            }
            let alt_count = record.alt_count();
            for (sample_id, sample) in record.samples.iter().enumerate() {
                let encoded = schema.genotypes.encode(&self.layout, sample, alt_count)?;
                let mut values = vec![Value::Integer(rowid), Value::Integer(sample_id as i64)];
                values.extend(encoded.into_values(self.session.phasing));
                genotype_rows.push(values);
            }
        }

        self.variant_batch.push(row);
        self.genotype_batch.extend(genotype_rows);
        self.next_rowid += 1;
        Ok(())
    }

    /// Inserts all buffered rows.
    ///
    /// # Errors
    ///
    /// Passes through database errors.
    pub fn flush(&mut self) -> Result<()> {
        self.require(&[LoaderState::HeaderParsed, LoaderState::Streaming, LoaderState::Flushed])?;
        let result = self.insert_batches();
        self.check(result)
    }

    fn insert_batches(&mut self) -> Result<()> {
        let schema = self.schema.as_ref().ok_or_else(|| Error::InvalidState {
            expected: LoaderState::HeaderParsed.to_string(),
            found: self.state.to_string(),
        })?;
        let transaction = self.transaction()?;

        let variants = self.variant_batch.len();
        let genotypes = self.genotype_batch.len();
        {
            let mut insert = transaction.prepare_cached(&schema.insert_variant)?;
            for row in self.variant_batch.iter() {
                insert.execute(params_from_iter(row.iter()))?;
            }
        }
        if genotypes > 0 {
            let mut insert = transaction.prepare_cached(&schema.insert_genotype)?;
            for row in self.genotype_batch.iter() {
                insert.execute(params_from_iter(row.iter()))?;
            }
        }
        self.variant_batch.clear();
        self.genotype_batch.clear();
        self.variants += variants;
        self.genotypes += genotypes;
        if variants > 0 {
            debug!("Inserted {} variants and {} genotypes (total {} variants)", variants, genotypes, self.variants);
        }

        self.state = LoaderState::Flushed;
        Ok(())
    }

    /// Inserts the remaining rows, builds the index, writes the tags, and commits the transaction.
    ///
    /// # Errors
    ///
    /// Passes through database errors.
    pub fn finish(&mut self) -> Result<LoadSummary> {
        self.require(&[LoaderState::HeaderParsed, LoaderState::Streaming, LoaderState::Flushed])?;
        let result = self.commit();
        self.check(result)
    }

    fn commit(&mut self) -> Result<LoadSummary> {
        self.insert_batches()?;
        let schema = self.schema.as_ref().ok_or_else(|| Error::InvalidState {
            expected: LoaderState::HeaderParsed.to_string(),
            found: self.state.to_string(),
        })?;
        let summary = LoadSummary {
            assembly: schema.catalog.assembly().to_string(),
            reference_sequences: schema.catalog.len(),
            samples: schema.samples,
            variants: self.variants,
            genotypes: self.genotypes,
            lines: self.lines,
        };

        let transaction = self.transaction()?;
        info!("Building the GRI index");
        self.tables.create_variant_index(transaction)?;
        let tags = [
            (VariantBase::KEY_VERSION, VariantBase::VERSION.to_string()),
            (VariantBase::KEY_ASSEMBLY, summary.assembly.clone()),
            (VariantBase::KEY_VARIANTS, summary.variants.to_string()),
            (VariantBase::KEY_SAMPLES, summary.samples.to_string()),
            (VariantBase::KEY_GENOTYPES, summary.genotypes.to_string()),
            (VariantBase::KEY_PHASE_HANDLING, self.session.phasing.to_string()),
            (VariantBase::KEY_GRI_LEVELS, gri::describe_levels()),
        ];
        self.tables.create_tags(transaction, &tags)?;

        if let Some(transaction) = self.transaction.take() {
            transaction.commit()?;
        }
        self.state = LoaderState::Closed;
        info!(
            "Loaded {} variants and {} genotypes for {} samples into tables with prefix {:?}",
            summary.variants, summary.genotypes, summary.samples, self.tables.prefix
        );
        Ok(summary)
    }

    /// Reads the header and all records from the reader.
    ///
    /// This does not call [`VcfLoader::finish`].
    ///
    /// # Errors
    ///
    /// Passes through errors from [`VcfLoader::read_header`] and [`VcfLoader::push_record`] and I/O errors.
    pub fn load<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        self.read_header(&mut reader)?;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            buf.clear();
            let len = reader.read_until(b'\n', &mut buf)?;
            if len == 0 {
                break;
            }
            self.push_record(&buf)?;
        }
        Ok(())
    }
}

// Builds an INSERT statement with numbered parameters.
fn insert_statement(table: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|name| utils::quote_identifier(name)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {}({}) VALUES ({})",
        utils::quote_identifier(table), names.join(", "), params.join(", ")
    )
}

fn json_or_null(values: Option<Vec<String>>) -> Result<Value> {
    match values {
        Some(values) => Ok(Value::Text(serde_json::to_string(&values)?)),
        None => Ok(Value::Null),
    }
}

//-----------------------------------------------------------------------------

/// Loads a VCF file from the reader into the database.
///
/// The load is committed only if it succeeds.
/// On failure, the database is left unchanged.
///
/// # Errors
///
/// Passes through any error from [`VcfLoader`].
pub fn load_vcf<R: BufRead>(connection: &mut Connection, reader: R, session: &LoadSession) -> Result<LoadSummary> {
    let mut loader = VcfLoader::new(connection, session)?;
    loader.load(reader)?;
    loader.finish()
}

/// Loads a VCF file, which may be gzip-compressed, into a database file.
///
/// If the database file did not exist before and the load fails, the file is removed.
///
/// # Errors
///
/// Passes through any error from [`load_vcf`] and I/O errors.
pub fn create_from_file<P: AsRef<Path>, Q: AsRef<Path>>(vcf_file: P, db_file: Q, session: &LoadSession) -> Result<LoadSummary> {
    info!("Loading {} into {}", vcf_file.as_ref().display(), db_file.as_ref().display());
    let reader = utils::open_file(&vcf_file)?;
    let existed = utils::file_exists(&db_file);

    let result = Connection::open(&db_file).map_err(Error::from).and_then(|mut connection| {
        load_vcf(&mut connection, reader, session)
    });
    if result.is_err() && !existed {
        if let Err(err) = fs::remove_file(&db_file) {
            warn!("Could not remove database {}: {}", db_file.as_ref().display(), err);
        }
    }
    result
}

//-----------------------------------------------------------------------------
