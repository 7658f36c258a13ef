//! Reference catalog: contig dictionaries mapping contig names to dense reference sequence identifiers.
//!
//! A [`ReferenceCatalog`] is either one of the built-in assemblies (see [`ReferenceCatalog::known_assemblies`]) or built from the `##contig` lines of a VCF header.
//! Identifiers (rids) are assigned densely from 0 in declaration order.
//! Lookups are exact and case-sensitive: `chr1` and `1` are different contigs.
//!
//! The catalog is stored in table `{prefix}gri_refseq` with [`ReferenceCatalog::register`] and read back with [`ReferenceCatalog::load`].

use crate::{Error, Result};
use crate::db::TableNames;
use crate::formats::VcfHeader;

use std::collections::HashMap;

use log::{info, warn};
use rusqlite::{Connection, OptionalExtension};


//-----------------------------------------------------------------------------

const GRCH38: [(&str, u64); 25] = [
    ("chr1", 248956422), ("chr2", 242193529), ("chr3", 198295559), ("chr4", 190214555),
    ("chr5", 181538259), ("chr6", 170805979), ("chr7", 159345973), ("chr8", 145138636),
    ("chr9", 138394717), ("chr10", 133797422), ("chr11", 135086622), ("chr12", 133275309),
    ("chr13", 114364328), ("chr14", 107043718), ("chr15", 101991189), ("chr16", 90338345),
    ("chr17", 83257441), ("chr18", 80373285), ("chr19", 58617616), ("chr20", 64444167),
    ("chr21", 46709983), ("chr22", 50818468), ("chrX", 156040895), ("chrY", 57227415),
    ("chrM", 16569),
];

const GRCH37: [(&str, u64); 25] = [
    ("1", 249250621), ("2", 243199373), ("3", 198022430), ("4", 191154276),
    ("5", 180915260), ("6", 171115067), ("7", 159138663), ("8", 146364022),
    ("9", 141213431), ("10", 135534747), ("11", 135006516), ("12", 133851895),
    ("13", 115169878), ("14", 107349540), ("15", 102531392), ("16", 90354753),
    ("17", 81195210), ("18", 78077248), ("19", 59128983), ("20", 63025520),
    ("21", 48129895), ("22", 51304566), ("X", 155270560), ("Y", 59373566),
    ("MT", 16569),
];

// Same as GRCh37, except for the names and the mitochondrial sequence.
const HG19: [(&str, u64); 25] = [
    ("chr1", 249250621), ("chr2", 243199373), ("chr3", 198022430), ("chr4", 191154276),
    ("chr5", 180915260), ("chr6", 171115067), ("chr7", 159138663), ("chr8", 146364022),
    ("chr9", 141213431), ("chr10", 135534747), ("chr11", 135006516), ("chr12", 133851895),
    ("chr13", 115169878), ("chr14", 107349540), ("chr15", 102531392), ("chr16", 90354753),
    ("chr17", 81195210), ("chr18", 78077248), ("chr19", 59128983), ("chr20", 63025520),
    ("chr21", 48129895), ("chr22", 51304566), ("chrX", 155270560), ("chrY", 59373566),
    ("chrM", 16571),
];

const ASSEMBLIES: [(&str, &[(&str, u64)]); 3] = [
    ("GRCh38", &GRCH38),
    ("GRCh37", &GRCH37),
    ("hg19", &HG19),
];

//-----------------------------------------------------------------------------

/// A reference sequence in a catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceSequence {
    /// Dense identifier within the catalog.
    pub rid: u32,
    /// Contig name.
    pub name: String,
    /// Sequence length in bp.
    pub length: u64,
    /// Assembly the sequence belongs to.
    pub assembly: String,
}

/// An ordered contig dictionary for one assembly.
///
/// The catalog is immutable after construction.
///
/// # Examples
///
/// ```
/// use vcf_base::ReferenceCatalog;
///
/// let catalog = ReferenceCatalog::resolve("GRCh38").unwrap();
/// assert_eq!(catalog.lookup("chr1").unwrap(), 0);
/// assert_eq!(catalog.lookup("chrX").unwrap(), 22);
/// assert!(catalog.lookup("1").is_err());
/// assert_eq!(catalog.get(0).unwrap().length, 248956422);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceCatalog {
    assembly: String,
    sequences: Vec<ReferenceSequence>,
    index: HashMap<String, u32>,
}

impl ReferenceCatalog {
    /// Assembly name for catalogs built from a VCF header.
    pub const HEADER_ASSEMBLY: &'static str = "header";

    /// Returns the names of the built-in assemblies.
    pub fn known_assemblies() -> Vec<&'static str> {
        ASSEMBLIES.iter().map(|(name, _)| *name).collect()
    }

    /// Returns the catalog for a built-in assembly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAssembly`] if the assembly is not built-in.
    /// Assembly names are case-sensitive.
    pub fn resolve(assembly: &str) -> Result<Self> {
        let (name, contigs) = ASSEMBLIES.iter().find(|(name, _)| *name == assembly).ok_or_else(|| {
            Error::UnknownAssembly(assembly.to_string())
        })?;
        Self::from_contigs(name, contigs.iter().map(|(contig, length)| (*contig, *length)))
    }

    /// Builds a catalog from contigs in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if a contig name is repeated.
    pub fn from_contigs<'a, I>(assembly: &str, contigs: I) -> Result<Self>
        where I: IntoIterator<Item = (&'a str, u64)>
    {
        let mut sequences = Vec::new();
        let mut index = HashMap::new();
        for (name, length) in contigs {
            let rid = sequences.len() as u32;
            if index.insert(name.to_string(), rid).is_some() {
                return Err(Error::MalformedHeader(format!("Duplicate contig {} in assembly {}", name, assembly)));
            }
            sequences.push(ReferenceSequence {
                rid,
                name: name.to_string(),
                length,
                assembly: assembly.to_string(),
            });
        }
        Ok(ReferenceCatalog { assembly: assembly.to_string(), sequences, index })
    }

    /// Builds a catalog from the `##contig` lines of a VCF header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if a contig has no length.
    pub fn from_header(header: &VcfHeader) -> Result<Self> {
        let mut contigs: Vec<(&str, u64)> = Vec::with_capacity(header.contigs.len());
        for contig in header.contigs.iter() {
            let length = contig.length.ok_or_else(|| {
                Error::MalformedHeader(format!("No length for contig {}", contig.name))
            })?;
            contigs.push((contig.name.as_str(), length));
        }
        Self::from_contigs(Self::HEADER_ASSEMBLY, contigs)
    }

    /// Compares the `##contig` lines of a VCF header with the catalog.
    ///
    /// Logs a warning for each contig present in both with a different length.
    /// Returns the number of such contigs.
    pub fn check_header(&self, header: &VcfHeader) -> usize {
        let mut mismatches = 0;
        for contig in header.contigs.iter() {
            if let (Some(length), Ok(rid)) = (contig.length, self.lookup(&contig.name)) {
                let expected = self.sequences[rid as usize].length;
                if length != expected {
                    warn!(
                        "Contig {} has length {} in the header but {} in assembly {}",
                        contig.name, length, expected, self.assembly
                    );
                    mismatches += 1;
                }
            }
        }
        mismatches
    }

    /// Returns the assembly name.
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// Returns the number of reference sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Returns the identifier of the contig with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedContig`] if there is no such contig.
    pub fn lookup(&self, name: &str) -> Result<u32> {
        self.index.get(name).copied().ok_or_else(|| Error::UnresolvedContig {
            name: name.to_string(),
            assembly: self.assembly.clone(),
        })
    }

    /// Returns the reference sequence with the given identifier.
    pub fn get(&self, rid: u32) -> Option<&ReferenceSequence> {
        self.sequences.get(rid as usize)
    }

    /// Returns an iterator over the reference sequences in rid order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceSequence> {
        self.sequences.iter()
    }

    /// Stores the catalog in a new reference sequence table.
    ///
    /// This should be called within a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TablePrefixCollision`] if the table already exists.
    /// Passes through database errors.
    pub fn register(&self, connection: &Connection, tables: &TableNames) -> Result<()> {
        if crate::utils::table_exists(connection, &tables.refseq)? {
            return Err(Error::TablePrefixCollision(tables.refseq.clone()));
        }
        let table = crate::utils::quote_identifier(&tables.refseq);
        connection.execute(
            &format!(
                "CREATE TABLE {} (
                    rid INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    length INTEGER NOT NULL,
                    assembly TEXT NOT NULL
                ) STRICT",
                table
            ),
            (),
        )?;

        let mut insert = connection.prepare(
            &format!("INSERT INTO {}(rid, name, length, assembly) VALUES (?1, ?2, ?3, ?4)", table)
        )?;
        for sequence in self.sequences.iter() {
            insert.execute((sequence.rid, &sequence.name, sequence.length as i64, &sequence.assembly))?;
        }
        info!("Registered {} reference sequences from assembly {}", self.len(), self.assembly);
        Ok(())
    }

    /// Loads the catalog from the reference sequence table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the stored rids are not dense.
    /// Passes through database errors.
    pub fn load(connection: &Connection, tables: &TableNames) -> Result<Self> {
        let table = crate::utils::quote_identifier(&tables.refseq);
        let assembly: Option<String> = connection.query_row(
            &format!("SELECT assembly FROM {} ORDER BY rid LIMIT 1", table),
            (),
            |row| row.get(0)
        ).optional()?;
        let assembly = assembly.unwrap_or_default();

        let mut statement = connection.prepare(
            &format!("SELECT rid, name, length FROM {} ORDER BY rid", table)
        )?;
        let rows = statement.query_map((), |row| {
            let rid: u32 = row.get(0)?;
            let name: String = row.get(1)?;
            let length: i64 = row.get(2)?;
            Ok((rid, name, length as u64))
        })?;
        let mut contigs: Vec<(String, u64)> = Vec::new();
        for row in rows {
            let (rid, name, length) = row?;
            if rid as usize != contigs.len() {
                return Err(Error::MalformedHeader(format!("Reference sequence {} has non-dense rid {}", name, rid)));
            }
            contigs.push((name, length));
        }
        Self::from_contigs(&assembly, contigs.iter().map(|(name, length)| (name.as_str(), *length)))
    }
}

//-----------------------------------------------------------------------------
