//! Support for reading the VCF format.
//!
//! The VCF format is a text-based format for representing sequence variants.
//! See the [VCF 4.3 format description](https://samtools.github.io/hts-specs/VCFv4.3.pdf) for details.
//! Parsing covers what is needed to populate the database and nothing more.
//!
//! ### Header
//!
//! [`VcfHeader::read`] reads all meta-information lines and the `#CHROM` line from a reader.
//! The header captures the contig dictionary ([`ContigDef`]), field definitions for INFO and FORMAT keys ([`FieldDef`]), and the sample names.
//!
//! ### Records
//!
//! A data line is parsed into a [`VcfRecord`], which borrows the line.
//! Parsing is based on bytes rather than characters to avoid unnecessary UTF-8 validation.
//!
//! ### Typed fields
//!
//! Values of INFO and FORMAT keys are converted to [`FieldValue`] objects according to their definitions.
//! Scalar values (`Number=1`) keep their type, while list values are stored as JSON arrays.
//! The missing value `.` always becomes a null value.
//! A value that fails to parse as its declared numeric type is an error.

use crate::{Error, Result};
use crate::db::ColumnDef;

use std::collections::HashMap;
use std::io::BufRead;
use std::str;

use log::warn;
use rusqlite::types::{ToSql, ToSqlOutput, Value};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Type of an INFO or FORMAT field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

impl FieldType {
    /// Parses the value of a `Type` attribute.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Integer" => Ok(FieldType::Integer),
            "Float" => Ok(FieldType::Float),
            "Flag" => Ok(FieldType::Flag),
            "Character" => Ok(FieldType::Character),
            "String" => Ok(FieldType::String),
            _ => Err(Error::MalformedHeader(format!("Unknown field type {}", value))),
        }
    }

    /// Returns `true` if values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

/// Number of values in an INFO or FORMAT field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldNumber {
    /// A fixed number of values.
    Count(usize),
    /// One value per alternate allele (`A`).
    PerAltAllele,
    /// One value per allele, including the reference (`R`).
    PerAllele,
    /// One value per possible genotype (`G`).
    PerGenotype,
    /// Unknown or varying number of values (`.`).
    Unbounded,
}

impl FieldNumber {
    /// Parses the value of a `Number` attribute.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "A" => Ok(FieldNumber::PerAltAllele),
            "R" => Ok(FieldNumber::PerAllele),
            "G" => Ok(FieldNumber::PerGenotype),
            "." => Ok(FieldNumber::Unbounded),
            _ => value.parse::<usize>().map(FieldNumber::Count).map_err(|_| {
                Error::MalformedHeader(format!("Invalid field number {}", value))
            }),
        }
    }
}

//-----------------------------------------------------------------------------

/// A typed field value ready to be stored in the database.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    /// A JSON array serialized as a string.
    Json(String),
}

impl FieldValue {
    /// Returns `true` if the value is null.
    pub fn is_null(&self) -> bool {
        *self == FieldValue::Null
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Integer(value) => Value::Integer(value),
            FieldValue::Float(value) => if value.is_nan() { Value::Null } else { Value::Real(value) },
            FieldValue::Text(value) => Value::Text(value),
            FieldValue::Json(value) => Value::Text(value),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::from(self.clone())))
    }
}

//-----------------------------------------------------------------------------

/// Definition of an INFO or FORMAT field from a header line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Field identifier.
    pub id: String,
    /// Number of values.
    pub number: FieldNumber,
    /// Type of the values.
    pub ty: FieldType,
    /// Free-text description.
    pub description: String,
}

impl FieldDef {
    /// Creates a new field definition without a description.
    pub fn new(id: &str, number: FieldNumber, ty: FieldType) -> Self {
        FieldDef { id: id.to_string(), number, ty, description: String::new() }
    }

    /// Creates a field definition from the attributes of an `##INFO` or `##FORMAT` line.
    pub fn from_attributes(attributes: &[(String, String)]) -> Result<Self> {
        fn get<'a>(attributes: &'a [(String, String)], key: &str) -> Result<&'a str> {
            attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()).ok_or_else(|| {
                Error::MalformedHeader(format!("Field definition without {}", key))
            })
        }
        let id = get(attributes, "ID")?;
        let number = FieldNumber::parse(get(attributes, "Number")?)?;
        let ty = FieldType::parse(get(attributes, "Type")?)?;
        let description = get(attributes, "Description").unwrap_or("").to_string();
        Ok(FieldDef { id: id.to_string(), number, ty, description })
    }

    /// Returns `true` if the field holds at most one value.
    pub fn is_scalar(&self) -> bool {
        self.ty == FieldType::Flag || self.number == FieldNumber::Count(1) || self.number == FieldNumber::Count(0)
    }

    /// Returns the SQL type of the column storing the field.
    pub fn sql_type(&self) -> &'static str {
        if !self.is_scalar() {
            return "TEXT";
        }
        match self.ty {
            FieldType::Integer | FieldType::Flag => "INTEGER",
            FieldType::Float => "REAL",
            FieldType::Character | FieldType::String => "TEXT",
        }
    }

    /// Returns the column definition for the field with the given name prefix.
    ///
    /// List-valued fields get suffix `_jsarray`.
    pub fn column(&self, prefix: &str) -> ColumnDef {
        let name = if self.is_scalar() {
            format!("{}{}", prefix, self.id)
        } else {
            format!("{}{}_jsarray", prefix, self.id)
        };
        ColumnDef::new(&name, self.sql_type())
    }

    /// Converts a raw value to a typed value.
    ///
    /// `None` means that the key was not present.
    /// Absent flags are false, and other absent fields are null.
    /// Only the value `.` is missing, so an empty numeric value is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedNumericField`] if a numeric value cannot be parsed.
    pub fn parse_value(&self, raw: Option<&[u8]>) -> Result<FieldValue> {
        let raw = match raw {
            Some(raw) => raw,
            None => {
                return Ok(if self.ty == FieldType::Flag { FieldValue::Integer(0) } else { FieldValue::Null });
            },
        };
        if self.ty == FieldType::Flag {
            return Ok(FieldValue::Integer(1));
        }
        if raw == MISSING {
            return Ok(FieldValue::Null);
        }

        if self.is_scalar() {
            return match self.ty {
                FieldType::Integer => Ok(FieldValue::Integer(self.parse_integer(raw)?)),
                FieldType::Float => Ok(FieldValue::Float(self.parse_float(raw)?)),
                _ => Ok(FieldValue::Text(String::from_utf8_lossy(raw).to_string())),
            };
        }

        let mut values: Vec<serde_json::Value> = Vec::new();
        for element in raw.split(|c| *c == b',') {
            if element == MISSING {
                values.push(serde_json::Value::Null);
                continue;
            }
            let value = match self.ty {
                FieldType::Integer => serde_json::Value::from(self.parse_integer(element)?),
                FieldType::Float => serde_json::Value::from(self.parse_float(element)?),
                _ => serde_json::Value::from(String::from_utf8_lossy(element).to_string()),
            };
            values.push(value);
        }
        Ok(FieldValue::Json(serde_json::to_string(&values)?))
    }

    fn malformed(&self, raw: &[u8]) -> Error {
        Error::MalformedNumericField {
            field: self.id.clone(),
            value: String::from_utf8_lossy(raw).to_string(),
        }
    }

    fn parse_integer(&self, raw: &[u8]) -> Result<i64> {
        let value = str::from_utf8(raw).map_err(|_| self.malformed(raw))?;
        value.parse::<i64>().map_err(|_| self.malformed(raw))
    }

    fn parse_float(&self, raw: &[u8]) -> Result<f64> {
        let value = str::from_utf8(raw).map_err(|_| self.malformed(raw))?;
        value.parse::<f64>().map_err(|_| self.malformed(raw))
    }
}

// The missing value.
const MISSING: &[u8] = b".";

// Largest accepted POS or END, so that stored coordinates fit in SQL integers.
const MAX_COORDINATE: u64 = i64::MAX as u64;

/// Returns `true` if the value is the missing value `.` or empty.
pub fn is_missing(value: &[u8]) -> bool {
    value.is_empty() || value == b"."
}

//-----------------------------------------------------------------------------

/// A contig from a `##contig` header line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContigDef {
    /// Contig name.
    pub name: String,
    /// Contig length, if given.
    pub length: Option<u64>,
}

/// VCF header: contig dictionary, field definitions, and sample names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VcfHeader {
    /// Value of the `##fileformat` line.
    pub file_format: Option<String>,
    /// Contigs in declaration order.
    pub contigs: Vec<ContigDef>,
    /// INFO field definitions in declaration order.
    pub info: Vec<FieldDef>,
    /// FORMAT field definitions in declaration order.
    pub format: Vec<FieldDef>,
    /// Sample names in column order.
    pub samples: Vec<String>,
}

impl VcfHeader {
    /// Number of fixed columns before FORMAT.
    pub const FIXED_COLUMNS: usize = 8;

    const COLUMN_NAMES: [&'static str; 9] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT"];

    /// Reads the header from the reader.
    ///
    /// Returns the header and the number of lines read.
    /// The reader is advanced past the `#CHROM` line.
    ///
    /// # Errors
    ///
    /// Returns an error if the header ends before the `#CHROM` line or if a header line is invalid.
    /// Passes through any I/O errors.
    pub fn read<R: BufRead>(reader: &mut R) -> Result<(Self, usize)> {
        let mut header = VcfHeader::default();
        let mut line_num = 0;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            buf.clear();
            let len = reader.read_until(b'\n', &mut buf)?;
            if len == 0 {
                return Err(Error::MalformedHeader(String::from("No #CHROM line before the end of the file")));
            }
            line_num += 1;
            let line = trim_newline(&buf);
            if line.starts_with(b"##") {
                header.add_meta_line(line)?;
            } else if line.starts_with(b"#") {
                header.set_columns(line)?;
                return Ok((header, line_num));
            } else {
                return Err(Error::MalformedHeader(format!("Line {} is not a header line", line_num)));
            }
        }
    }

    fn add_meta_line(&mut self, line: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(&line[2..]);
        let (key, value) = match line.split_once('=') {
            Some(pair) => pair,
            None => return Ok(()),
        };
        match key {
            "fileformat" => {
                self.file_format = Some(value.to_string());
            },
            "contig" => {
                let attributes = parse_structured(value)?;
                let name = attributes.iter().find(|(k, _)| k == "ID").map(|(_, v)| v.clone()).ok_or_else(|| {
                    Error::MalformedHeader(format!("Contig line without ID: {}", line))
                })?;
                let length = match attributes.iter().find(|(k, _)| k == "length") {
                    Some((_, v)) => Some(v.parse::<u64>().map_err(|_| {
                        Error::MalformedHeader(format!("Invalid length for contig {}: {}", name, v))
                    })?),
                    None => None,
                };
                if self.contigs.iter().any(|contig| contig.name == name) {
                    return Err(Error::MalformedHeader(format!("Duplicate contig {}", name)));
                }
                self.contigs.push(ContigDef { name, length });
            },
            "INFO" | "FORMAT" => {
                let attributes = parse_structured(value)?;
                let field = FieldDef::from_attributes(&attributes)?;
                let fields = if key == "INFO" { &mut self.info } else { &mut self.format };
                if let Some(existing) = fields.iter().position(|f| f.id == field.id) {
                    warn!("Replacing duplicate {} definition for {}", key, field.id);
                    fields[existing] = field;
                } else {
                    fields.push(field);
                }
            },
            _ => {},
        }
        Ok(())
    }

    fn set_columns(&mut self, line: &[u8]) -> Result<()> {
        let columns: Vec<&[u8]> = line.split(|c| *c == b'\t').collect();
        if columns.len() < Self::FIXED_COLUMNS {
            return Err(Error::MalformedHeader(format!("Too few columns in {}", String::from_utf8_lossy(line))));
        }
        let expected = if columns.len() > Self::FIXED_COLUMNS { Self::COLUMN_NAMES.len() } else { Self::FIXED_COLUMNS };
        for (column, name) in columns.iter().zip(Self::COLUMN_NAMES.iter()).take(expected) {
            if *column != name.as_bytes() {
                return Err(Error::MalformedHeader(format!("Expected column {}, found {}", name, String::from_utf8_lossy(column))));
            }
        }
        let mut samples: HashMap<String, usize> = HashMap::new();
        for column in columns.iter().skip(Self::COLUMN_NAMES.len()) {
            let name = String::from_utf8_lossy(column).to_string();
            if samples.insert(name.clone(), self.samples.len()).is_some() {
                return Err(Error::MalformedHeader(format!("Duplicate sample name {}", name)));
            }
            self.samples.push(name);
        }
        Ok(())
    }

    /// Returns the definition of the INFO field with the given identifier.
    pub fn info_field(&self, id: &str) -> Option<&FieldDef> {
        self.info.iter().find(|field| field.id == id)
    }

    /// Returns the definition of the FORMAT field with the given identifier.
    pub fn format_field(&self, id: &str) -> Option<&FieldDef> {
        self.format.iter().find(|field| field.id == id)
    }
}

/// Parses the value of a structured meta-information line, such as `<ID=chr1,length=1000>`.
///
/// Returns the attributes in order.
/// Quoted values may contain commas and escaped quotes.
pub fn parse_structured(value: &str) -> Result<Vec<(String, String)>> {
    let inner = value.strip_prefix('<').and_then(|v| v.strip_suffix('>')).ok_or_else(|| {
        Error::MalformedHeader(format!("Structured value not enclosed in <>: {}", value))
    })?;

    let mut result: Vec<(String, String)> = Vec::new();
    let mut chars = inner.chars().peekable();
    while chars.peek().is_some() {
        let mut key = String::new();
        for c in chars.by_ref() {
            if c == '=' {
                break;
            }
            key.push(c);
        }
        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    },
                    '"' => {
                        closed = true;
                        break;
                    },
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(Error::MalformedHeader(format!("Unterminated quoted value in {}", value)));
            }
            // Skip to the next attribute.
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ',' {
                    break;
                }
                value.push(c);
            }
        }
        result.push((key.trim().to_string(), value));
    }

    Ok(result)
}

fn trim_newline(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
        end -= 1;
    }
    &buf[..end]
}

//-----------------------------------------------------------------------------

/// A VCF data line split into its columns.
///
/// The record borrows the line.
/// Positions are 1-based as in the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VcfRecord<'a> {
    /// Contig name.
    pub chrom: &'a str,
    /// 1-based position of the first base of REF.
    pub pos: u64,
    /// Raw ID column.
    pub id: &'a [u8],
    /// Reference allele.
    pub reference: &'a [u8],
    /// Raw ALT column.
    pub alt: &'a [u8],
    /// Raw QUAL column.
    pub qual: &'a [u8],
    /// Raw FILTER column.
    pub filter: &'a [u8],
    /// Raw INFO column.
    pub info: &'a [u8],
    /// Raw FORMAT column, if present.
    pub format: Option<&'a [u8]>,
    /// Raw sample columns.
    pub samples: Vec<&'a [u8]>,
}

impl<'a> VcfRecord<'a> {
    /// Parses a data line with the given number of sample columns.
    ///
    /// A trailing newline is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the number of columns is wrong or if the position is invalid.
    pub fn parse(line: &'a [u8], sample_count: usize) -> Result<Self> {
        let line = trim_newline(line);
        let columns: Vec<&'a [u8]> = line.split(|c| *c == b'\t').collect();
        let valid = if sample_count == 0 {
            columns.len() == VcfHeader::FIXED_COLUMNS || columns.len() == VcfHeader::FIXED_COLUMNS + 1
        } else {
            columns.len() == VcfHeader::FIXED_COLUMNS + 1 + sample_count
        };
        if !valid {
            return Err(Error::MalformedRecord(format!(
                "Expected {} sample columns, found {} columns in total", sample_count, columns.len()
            )));
        }

        let chrom = str::from_utf8(columns[0]).map_err(|_| {
            Error::MalformedRecord(format!("Invalid contig name {}", String::from_utf8_lossy(columns[0])))
        })?;
        let pos = str::from_utf8(columns[1]).ok().and_then(|s| s.parse::<u64>().ok()).filter(|pos| *pos > 0 && *pos <= MAX_COORDINATE).ok_or_else(|| {
            Error::MalformedRecord(format!("Invalid position {}", String::from_utf8_lossy(columns[1])))
        })?;
        if columns[3].is_empty() {
            return Err(Error::MalformedRecord(format!("Empty reference allele at {}:{}", chrom, pos)));
        }

        Ok(VcfRecord {
            chrom, pos,
            id: columns[2],
            reference: columns[3],
            alt: columns[4],
            qual: columns[5],
            filter: columns[6],
            info: columns[7],
            format: columns.get(8).copied(),
            samples: columns.iter().skip(VcfHeader::FIXED_COLUMNS + 1).copied().collect(),
        })
    }

    /// Returns the 0-based starting position.
    pub fn start(&self) -> u64 {
        self.pos - 1
    }

    /// Returns the identifiers.
    ///
    /// Returns [`None`] for the missing value `.`.
    /// An empty column is present but contains no identifiers.
    pub fn ids(&self) -> Option<Vec<String>> {
        if self.id == b"." {
            return None;
        }
        Some(self.id.split(|c| *c == b';').filter(|id| !id.is_empty()).map(|id| {
            String::from_utf8_lossy(id).to_string()
        }).collect())
    }

    /// Returns the alternate alleles.
    ///
    /// The missing value `.` means no alternate alleles.
    pub fn alt_alleles(&self) -> Vec<String> {
        if is_missing(self.alt) {
            return Vec::new();
        }
        self.alt.split(|c| *c == b',').map(|allele| String::from_utf8_lossy(allele).to_string()).collect()
    }

    /// Returns the number of alternate alleles.
    pub fn alt_count(&self) -> usize {
        if is_missing(self.alt) { 0 } else { self.alt.split(|c| *c == b',').count() }
    }

    /// Returns the filters, or [`None`] if the filter column is missing.
    pub fn filters(&self) -> Option<Vec<String>> {
        if is_missing(self.filter) {
            return None;
        }
        Some(self.filter.split(|c| *c == b';').map(|f| String::from_utf8_lossy(f).to_string()).collect())
    }

    /// Returns the quality, or [`None`] if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedNumericField`] if the quality is not a number.
    pub fn quality(&self) -> Result<Option<f64>> {
        if is_missing(self.qual) {
            return Ok(None);
        }
        let qual = str::from_utf8(self.qual).ok().and_then(|s| s.parse::<f64>().ok()).ok_or_else(|| {
            Error::MalformedNumericField { field: String::from("QUAL"), value: String::from_utf8_lossy(self.qual).to_string() }
        })?;
        Ok(Some(qual))
    }

    /// Returns an iterator over INFO entries as `(key, value)` pairs.
    ///
    /// Flags have no value.
    pub fn info_entries(&self) -> impl Iterator<Item = (&'a [u8], Option<&'a [u8]>)> {
        let info: &'a [u8] = self.info;
        let info = if is_missing(info) { &info[..0] } else { info };
        info.split(|c| *c == b';').filter(|entry| !entry.is_empty()).map(|entry| {
            match entry.iter().position(|c| *c == b'=') {
                Some(offset) => (&entry[..offset], Some(&entry[offset + 1..])),
                None => (entry, None),
            }
        })
    }

    /// Returns the value of the INFO key `END`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedNumericField`] if the value is not a non-negative integer.
    pub fn end(&self) -> Result<Option<u64>> {
        for (key, value) in self.info_entries() {
            if key == b"END" {
                let value = value.unwrap_or(b"");
                if is_missing(value) {
                    return Ok(None);
                }
                let end = str::from_utf8(value).ok().and_then(|s| s.parse::<u64>().ok()).ok_or_else(|| {
                    Error::MalformedNumericField { field: String::from("END"), value: String::from_utf8_lossy(value).to_string() }
                })?;
                return Ok(Some(end));
            }
        }
        Ok(None)
    }

    /// Returns the length of the reference interval covered by the record.
    ///
    /// Uses the INFO key `END` if present and the length of the reference allele otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `END` is invalid or before the position.
    pub fn reference_length(&self) -> Result<u64> {
        match self.end()? {
            Some(end) => {
                if end > MAX_COORDINATE {
                    return Err(Error::MalformedRecord(format!("END {} is too large at {}:{}", end, self.chrom, self.pos)));
                }
                match (end + 1).checked_sub(self.pos) {
                    Some(len) => Ok(len),
                    None => Err(Error::MalformedRecord(format!("END {} is before POS {} at {}", end, self.pos, self.chrom))),
                }
            },
            None => Ok(self.reference.len() as u64),
        }
    }

    /// Returns the FORMAT keys.
    pub fn format_keys(&self) -> Vec<&'a [u8]> {
        match self.format {
            Some(format) if !is_missing(format) => format.split(|c| *c == b':').collect(),
            _ => Vec::new(),
        }
    }
}

//-----------------------------------------------------------------------------

/// Converts INFO columns to typed values according to the header.
///
/// Each declared INFO field becomes a column `info_<ID>`.
/// Undeclared keys are ignored with a warning, which is issued once per key.
#[derive(Clone, Debug)]
pub struct InfoEncoder {
    fields: Vec<FieldDef>,
    index: HashMap<Vec<u8>, usize>,
    warned: std::cell::RefCell<std::collections::HashSet<Vec<u8>>>,
}

impl InfoEncoder {
    /// Column name prefix for INFO fields.
    pub const PREFIX: &'static str = "info_";

    /// Creates an encoder for the given field definitions.
    pub fn new(fields: &[FieldDef]) -> Self {
        let index = fields.iter().enumerate().map(|(i, field)| (field.id.as_bytes().to_vec(), i)).collect();
        InfoEncoder {
            fields: fields.to_vec(),
            index,
            warned: std::cell::RefCell::new(std::collections::HashSet::new()),
        }
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns the column definitions in field order.
    pub fn columns(&self) -> Vec<ColumnDef> {
        self.fields.iter().map(|field| field.column(Self::PREFIX)).collect()
    }

    /// Returns typed values for the INFO column of the record in field order.
    ///
    /// # Errors
    ///
    /// Passes through errors from [`FieldDef::parse_value`].
    pub fn encode(&self, record: &VcfRecord) -> Result<Vec<FieldValue>> {
        let mut raw: Vec<Option<&[u8]>> = vec![None; self.fields.len()];
        for (key, value) in record.info_entries() {
            match self.index.get(key) {
                Some(i) => {
                    raw[*i] = Some(value.unwrap_or(b""));
                },
                None => {
                    if self.warned.borrow_mut().insert(key.to_vec()) {
                        warn!("Ignoring undeclared INFO key {}", String::from_utf8_lossy(key));
                    }
                },
            }
        }
        self.fields.iter().zip(raw).map(|(field, value)| field.parse_value(value)).collect()
    }
}

//-----------------------------------------------------------------------------
