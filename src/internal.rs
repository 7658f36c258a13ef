use crate::{LoadSession, PhaseHandling, VariantBase};
use crate::formats::{VcfHeader, VcfRecord};
use crate::loader;
use crate::utils;

use std::io::BufRead;
use std::path::PathBuf;

use tempfile::TempDir;

//-----------------------------------------------------------------------------

// Databases built from test files.

// Returns a new temporary directory and a database file name inside it.
pub(crate) fn temp_db_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir();
    assert!(dir.is_ok(), "Failed to create a temporary directory: {}", dir.err().unwrap());
    let dir = dir.unwrap();
    let db_file = dir.path().join("test.db");
    (dir, db_file)
}

pub(crate) fn create_db_from_file(filename: &'static str, session: &LoadSession) -> (TempDir, PathBuf) {
    let vcf_file = utils::get_test_data(filename);
    let (dir, db_file) = temp_db_file();
    let result = loader::create_from_file(&vcf_file, &db_file, session);
    if let Err(err) = result {
        panic!("Failed to load {}: {}", vcf_file.display(), err);
    }
    (dir, db_file)
}

pub(crate) fn open_db(db_file: &PathBuf, prefix: &str) -> VariantBase {
    let database = VariantBase::open(db_file, prefix);
    if let Err(err) = database {
        panic!("Failed to open database {} with prefix {:?}: {}", db_file.display(), prefix, err);
    }
    database.unwrap()
}

pub(crate) fn create_small_db(prefix: &str, phasing: PhaseHandling) -> (TempDir, PathBuf, VariantBase) {
    let session = LoadSession::new(prefix, phasing);
    let (dir, db_file) = create_db_from_file("small.vcf", &session);
    let database = open_db(&db_file, prefix);
    (dir, db_file, database)
}

//-----------------------------------------------------------------------------

// Records parsed directly from the test files.

// A site as (contig, 0-based start, reference length, sample columns).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Site {
    pub chrom: String,
    pub start: u64,
    pub rlen: u64,
    pub samples: Vec<String>,
}

pub(crate) fn read_vcf(filename: &'static str) -> (VcfHeader, Vec<Site>) {
    let vcf_file = utils::get_test_data(filename);
    let reader = utils::open_file(&vcf_file);
    assert!(reader.is_ok(), "Failed to open VCF file {}: {}", vcf_file.display(), reader.err().unwrap());
    let mut reader = reader.unwrap();

    let header = VcfHeader::read(&mut reader);
    assert!(header.is_ok(), "Failed to read the header of {}: {}", vcf_file.display(), header.err().unwrap());
    let (header, mut line_num) = header.unwrap();

    let mut result = Vec::new();
    loop {
        let mut buf: Vec<u8> = Vec::new();
        let len = reader.read_until(b'\n', &mut buf);
        assert!(len.is_ok(), "Failed to read line {}: {}", line_num + 1, len.err().unwrap());
        if len.unwrap() == 0 {
            break;
        }
        line_num += 1;
        let record = VcfRecord::parse(&buf, header.samples.len());
        assert!(record.is_ok(), "Failed to parse line {}: {}", line_num, record.err().unwrap());
        let record = record.unwrap();
        let rlen = record.reference_length();
        assert!(rlen.is_ok(), "Invalid reference length on line {}: {}", line_num, rlen.err().unwrap());
        result.push(Site {
            chrom: record.chrom.to_string(),
            start: record.start(),
            rlen: rlen.unwrap(),
            samples: record.samples.iter().map(|s| String::from_utf8_lossy(s).to_string()).collect(),
        });
    }

    (header, result)
}

//-----------------------------------------------------------------------------
