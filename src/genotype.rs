//! Genotype encoding: flattening per-sample FORMAT values into typed genotype columns.
//!
//! Each sample of each variant becomes one row in the genotype table.
//! The genotype call (`GT`) is stored as two nullable allele indices `GT1` and `GT2`.
//! Phase is stored in column `phased` only with [`PhaseHandling::Retain`].
//! Other declared FORMAT fields become columns named by their identifiers, typed as in [`FieldDef::column`].
//!
//! Calls with more than two alleles are rejected with [`Error::UnsupportedPloidy`].
//!
//! # Examples
//!
//! ```
//! use vcf_base::genotype::{parse_genotype, Genotype};
//!
//! assert_eq!(parse_genotype(b"0|1", 1).unwrap(), Genotype { first: Some(0), second: Some(1), phased: true });
//! assert_eq!(parse_genotype(b"./.", 1).unwrap(), Genotype::missing());
//! assert_eq!(parse_genotype(b"2", 2).unwrap(), Genotype { first: Some(2), second: None, phased: false });
//! assert!(parse_genotype(b"0/1/1", 1).is_err());
//! ```

use crate::{Error, Result};
use crate::db::ColumnDef;
use crate::formats::{self, FieldDef, FieldValue};

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use log::warn;
use rusqlite::types::Value;


//-----------------------------------------------------------------------------

/// A parsed genotype call with at most two alleles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Genotype {
    /// First allele index, or [`None`] if missing.
    pub first: Option<u32>,
    /// Second allele index, or [`None`] if missing or haploid.
    pub second: Option<u32>,
    /// Were the alleles separated by `|`?
    pub phased: bool,
}

impl Genotype {
    /// Returns a missing genotype.
    pub fn missing() -> Self {
        Genotype::default()
    }

    /// Returns `true` if both alleles are missing.
    pub fn is_missing(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }
}

/// Parses a genotype call.
///
/// The empty string and `.` are missing genotypes.
/// Alleles are separated by `/` (unphased) or `|` (phased), and each allele is an index or `.`.
/// A haploid call has only the first allele.
///
/// # Arguments
///
/// * `token`: The GT value.
/// * `alt_count`: Number of alternate alleles at the site.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPloidy`] if there are more than two alleles.
/// Returns [`Error::MalformedGenotypeToken`] if an allele is not an index or `.`, or if the index exceeds `alt_count`.
pub fn parse_genotype(token: &[u8], alt_count: usize) -> Result<Genotype> {
    if formats::is_missing(token) {
        return Ok(Genotype::missing());
    }
    let malformed = || Error::MalformedGenotypeToken(String::from_utf8_lossy(token).to_string());

    let alleles: Vec<&[u8]> = token.split(|c| *c == b'/' || *c == b'|').collect();
    if alleles.len() > 2 {
        return Err(Error::UnsupportedPloidy {
            ploidy: alleles.len(),
            token: String::from_utf8_lossy(token).to_string(),
        });
    }

    let mut parsed: [Option<u32>; 2] = [None, None];
    for (i, allele) in alleles.iter().enumerate() {
        if *allele == b"." {
            continue;
        }
        if allele.is_empty() || !allele.iter().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        let index = std::str::from_utf8(allele).ok().and_then(|s| s.parse::<u32>().ok()).ok_or_else(malformed)?;
        if index as usize > alt_count {
            return Err(malformed());
        }
        parsed[i] = Some(index);
    }

    Ok(Genotype {
        first: parsed[0],
        second: parsed[1],
        phased: token.contains(&b'|'),
    })
}

//-----------------------------------------------------------------------------

/// What to do with genotype phase.
///
/// There is no default: the caller must make the choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseHandling {
    /// Store phase in column `phased`.
    Retain,
    /// Do not store phase.
    Discard,
}

impl PhaseHandling {
    /// Returns the name stored in the tags table.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseHandling::Retain => "retain",
            PhaseHandling::Discard => "discard",
        }
    }

    /// Parses the name returned by [`PhaseHandling::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "retain" => Some(PhaseHandling::Retain),
            "discard" => Some(PhaseHandling::Discard),
            _ => None,
        }
    }
}

impl Display for PhaseHandling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//-----------------------------------------------------------------------------

/// Where a FORMAT key goes in the genotype row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatSlot {
    /// The genotype call.
    Genotype,
    /// A declared field with the given index.
    Field(usize),
    /// An undeclared key.
    Ignored,
}

/// FORMAT keys of a record mapped to slots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatLayout {
    key: Vec<u8>,
    slots: Vec<FormatSlot>,
}

impl FormatLayout {
    /// Returns the slots in FORMAT key order.
    pub fn slots(&self) -> &[FormatSlot] {
        &self.slots
    }

    /// Returns `true` if the layout was built for the given FORMAT column.
    pub fn is_for(&self, format: &[u8]) -> bool {
        self.key == format
    }
}

/// A genotype row for one sample at one site.
#[derive(Clone, Debug, PartialEq)]
pub struct GenotypeRow {
    /// The genotype call, or [`None`] if the sample has no GT value.
    pub genotype: Option<Genotype>,
    /// Values of the declared FORMAT fields in column order.
    pub fields: Vec<FieldValue>,
}

impl GenotypeRow {
    /// Returns the values for columns `GT1`, `GT2`, optionally `phased`, and the field columns.
    pub fn into_values(self, phasing: PhaseHandling) -> Vec<Value> {
        let mut result: Vec<Value> = Vec::with_capacity(self.fields.len() + 3);
        let as_value = |allele: Option<u32>| allele.map(|x| Value::Integer(x as i64)).unwrap_or(Value::Null);
        match self.genotype {
            Some(genotype) => {
                result.push(as_value(genotype.first));
                result.push(as_value(genotype.second));
                if phasing == PhaseHandling::Retain {
                    result.push(Value::Integer(genotype.phased as i64));
                }
            },
            None => {
                result.push(Value::Null);
                result.push(Value::Null);
                if phasing == PhaseHandling::Retain {
                    result.push(Value::Null);
                }
            },
        }
        result.extend(self.fields.into_iter().map(Value::from));
        result
    }
}

//-----------------------------------------------------------------------------

/// Encoder from sample columns to genotype rows.
///
/// The encoder is built once from the FORMAT definitions in the header.
/// `GT` is always interpreted as the genotype call, even if it is not declared.
#[derive(Clone, Debug)]
pub struct GenotypeEncoder {
    fields: Vec<FieldDef>,
    index: HashMap<Vec<u8>, usize>,
    phasing: PhaseHandling,
    warned: RefCell<HashSet<Vec<u8>>>,
}

impl GenotypeEncoder {
    /// FORMAT key for the genotype call.
    pub const GT_KEY: &'static str = "GT";

    /// Column referencing the variant.
    pub const VARIANT_COLUMN: &'static str = "variant_rowid";

    /// Column referencing the sample.
    pub const SAMPLE_COLUMN: &'static str = "sample_id";

    /// Allele columns.
    pub const ALLELE_COLUMNS: [&'static str; 2] = ["GT1", "GT2"];

    /// Phase column.
    pub const PHASE_COLUMN: &'static str = "phased";

    /// Creates an encoder for the given FORMAT definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the column names clash when compared without case.
    pub fn new(format: &[FieldDef], phasing: PhaseHandling) -> Result<Self> {
        let fields: Vec<FieldDef> = format.iter().filter(|field| field.id != Self::GT_KEY).cloned().collect();
        let index = fields.iter().enumerate().map(|(i, field)| (field.id.as_bytes().to_vec(), i)).collect();
        let encoder = GenotypeEncoder { fields, index, phasing, warned: RefCell::new(HashSet::new()) };
        ColumnDef::check_unique(&encoder.layout())?;
        Ok(encoder)
    }

    /// Returns the phase handling.
    pub fn phasing(&self) -> PhaseHandling {
        self.phasing
    }

    /// Returns the declared FORMAT fields stored as columns.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns all columns of the genotype table in order.
    pub fn layout(&self) -> Vec<ColumnDef> {
        let mut result = vec![
            ColumnDef::new(Self::VARIANT_COLUMN, "INTEGER"),
            ColumnDef::new(Self::SAMPLE_COLUMN, "INTEGER"),
        ];
        for name in Self::ALLELE_COLUMNS {
            result.push(ColumnDef::new(name, "INTEGER"));
        }
        if self.phasing == PhaseHandling::Retain {
            result.push(ColumnDef::new(Self::PHASE_COLUMN, "INTEGER"));
        }
        result.extend(self.fields.iter().map(|field| field.column("")));
        result
    }

    /// Maps the keys of a FORMAT column to slots.
    ///
    /// Undeclared keys are ignored with a warning, which is issued once per key.
    pub fn format_layout(&self, format: &[u8]) -> FormatLayout {
        let mut slots = Vec::new();
        if !formats::is_missing(format) {
            for key in format.split(|c| *c == b':') {
                if key == Self::GT_KEY.as_bytes() {
                    slots.push(FormatSlot::Genotype);
                } else if let Some(i) = self.index.get(key) {
                    slots.push(FormatSlot::Field(*i));
                } else {
                    if self.warned.borrow_mut().insert(key.to_vec()) {
                        warn!("Ignoring undeclared FORMAT key {}", String::from_utf8_lossy(key));
                    }
                    slots.push(FormatSlot::Ignored);
                }
            }
        }
        FormatLayout { key: format.to_vec(), slots }
    }

    /// Encodes a sample column into a genotype row.
    ///
    /// Keys missing from the sample, including trailing keys omitted from the value, yield nulls.
    ///
    /// # Arguments
    ///
    /// * `layout`: Layout for the FORMAT column of the record.
    /// * `sample`: The sample column.
    /// * `alt_count`: Number of alternate alleles at the site.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the sample has more values than the FORMAT column has keys.
    /// Passes through errors from [`parse_genotype`] and [`FieldDef::parse_value`].
    pub fn encode(&self, layout: &FormatLayout, sample: &[u8], alt_count: usize) -> Result<GenotypeRow> {
        let mut genotype: Option<Genotype> = None;
        let mut raw: Vec<Option<&[u8]>> = vec![None; self.fields.len()];
        if sample != b"." {
            let values: Vec<&[u8]> = sample.split(|c| *c == b':').collect();
            if values.len() > layout.slots.len() {
                return Err(Error::MalformedRecord(format!(
                    "Sample value {} has more entries than FORMAT keys", String::from_utf8_lossy(sample)
                )));
            }
            for (slot, value) in layout.slots.iter().zip(values) {
                match slot {
                    FormatSlot::Genotype => genotype = Some(parse_genotype(value, alt_count)?),
                    FormatSlot::Field(i) => raw[*i] = Some(value),
                    FormatSlot::Ignored => {},
                }
            }
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for (field, value) in self.fields.iter().zip(raw) {
            // Absent FORMAT values are null, also for flags.
            let value = match value {
                Some(value) => field.parse_value(Some(value))?,
                None => FieldValue::Null,
            };
            fields.push(value);
        }
        Ok(GenotypeRow { genotype, fields })
    }
}

//-----------------------------------------------------------------------------
