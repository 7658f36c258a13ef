use super::*;

use crate::internal;
use crate::VariantInterface;

use std::io::BufReader;

//-----------------------------------------------------------------------------

const VCF: &str = "##fileformat=VCFv4.3
##contig=<ID=chr1,length=248956422>
##contig=<ID=chr2,length=242193529>
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
chr1\t100\trs1\tA\tG\t50\tPASS\tDP=10;AF=0.5;DB\tGT:DP\t0|1:4\t./.:.
chr1\t200\t.\tAC\tA,ACC\t.\t.\tDP=7;AF=0.1,.;XX=1\tGT:DP\t1/2:3\t0/0
chr2\t300\t\tG\tT\t12.5\tq10;lowDP\t.\tGT\t1|1\t.
";

fn count_rows(connection: &Connection, table: &str) -> usize {
    let sql = format!("SELECT COUNT(*) FROM {}", utils::quote_identifier(table));
    let count = connection.query_row(&sql, (), |row| row.get(0));
    assert!(count.is_ok(), "Failed to count rows in {}: {}", table, count.unwrap_err());
    count.unwrap()
}

fn load_string(connection: &mut Connection, vcf: &str, session: &LoadSession) -> Result<LoadSummary> {
    load_vcf(connection, vcf.as_bytes(), session)
}

fn user_tables(connection: &Connection) -> Vec<String> {
    let mut statement = connection.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name").unwrap();
    let names = statement.query_map((), |row| row.get(0)).unwrap();
    names.map(|name| name.unwrap()).collect()
}

//-----------------------------------------------------------------------------

#[test]
fn session_defaults() {
    let session = LoadSession::new("x_", PhaseHandling::Discard);
    assert_eq!(session.table_prefix, "x_", "Wrong table prefix");
    assert_eq!(session.assembly, AssemblySelection::Header, "Wrong default assembly");
    assert_eq!(session.batch_size, LoadSession::BATCH_SIZE, "Wrong default batch size");
    let session = session.with_assembly("GRCh38").with_batch_size(0);
    assert_eq!(session.assembly, AssemblySelection::Named(String::from("GRCh38")), "Wrong named assembly");
    assert_eq!(session.batch_size, 1, "Batch size should be at least 1");
}

#[test]
fn load_from_string() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Retain);
    let summary = load_string(&mut connection, VCF, &session).unwrap();
    assert_eq!(summary, LoadSummary {
        assembly: String::from(ReferenceCatalog::HEADER_ASSEMBLY),
        reference_sequences: 2,
        samples: 2,
        variants: 3,
        genotypes: 6,
        lines: 12,
    }, "Wrong summary");
    assert_eq!(count_rows(&connection, "variants"), 3, "Wrong number of variant rows");
    assert_eq!(count_rows(&connection, "genotypes"), 6, "Wrong number of genotype rows");
    assert_eq!(count_rows(&connection, "samples"), 2, "Wrong number of sample rows");
    assert_eq!(count_rows(&connection, "gri_refseq"), 2, "Wrong number of reference sequences");
    assert_eq!(count_rows(&connection, "tags"), 7, "Wrong number of tags");

    // ID: present, missing, and empty.
    let ids: Vec<Option<String>> = {
        let mut statement = connection.prepare("SELECT id_jsarray FROM variants ORDER BY rowid").unwrap();
        let rows = statement.query_map((), |row| row.get(0)).unwrap();
        rows.map(|x| x.unwrap()).collect()
    };
    assert_eq!(ids, vec![Some(String::from("[\"rs1\"]")), None, Some(String::from("[]"))], "Wrong ID values");

    let (alt, qual, filters): (String, Option<f64>, Option<String>) = connection.query_row(
        "SELECT alt_jsarray, qual, filter_jsarray FROM variants WHERE rowid = 3", (), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    ).unwrap();
    assert_eq!(alt, "[\"T\"]", "Wrong ALT");
    assert_eq!(qual, Some(12.5), "Wrong QUAL");
    assert_eq!(filters, Some(String::from("[\"q10\",\"lowDP\"]")), "Wrong FILTER");

    let (rlen, dp, af, db): (i64, Option<i64>, Option<String>, i64) = connection.query_row(
        "SELECT rlen, info_DP, info_AF_jsarray, info_DB FROM variants WHERE rowid = 2", (), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    ).unwrap();
    assert_eq!((rlen, dp, db), (2, Some(7), 0), "Wrong values for the second variant");
    assert_eq!(af, Some(String::from("[0.1,null]")), "Wrong list value");
    let db: i64 = connection.query_row("SELECT info_DB FROM variants WHERE rowid = 1", (), |row| row.get(0)).unwrap();
    assert_eq!(db, 1, "Wrong flag value");

    // Sample S2 at the first site has a missing call and depth.
    let (gt1, gt2, phased, dp): (Option<i64>, Option<i64>, Option<i64>, Option<i64>) = connection.query_row(
        "SELECT GT1, GT2, phased, DP FROM genotypes WHERE variant_rowid = 1 AND sample_id = 1", (), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    ).unwrap();
    assert_eq!((gt1, gt2, phased, dp), (None, None, Some(0), None), "Wrong missing genotype");
    let (gt1, gt2, phased): (Option<i64>, Option<i64>, Option<i64>) = connection.query_row(
        "SELECT GT1, GT2, phased FROM genotypes WHERE variant_rowid = 3 AND sample_id = 1", (), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    ).unwrap();
    assert_eq!((gt1, gt2, phased), (None, None, None), "Wrong values for a missing sample");
}

#[test]
fn phase_handling() {
    for phasing in [PhaseHandling::Retain, PhaseHandling::Discard] {
        let mut connection = Connection::open_in_memory().unwrap();
        let session = LoadSession::new("", phasing);
        load_string(&mut connection, VCF, &session).unwrap();
        let has_column = connection.prepare("SELECT phased FROM genotypes").is_ok();
        assert_eq!(has_column, phasing == PhaseHandling::Retain, "Wrong phase column status with {}", phasing);
        let tag: String = connection.query_row("SELECT value FROM tags WHERE key = 'phase_handling'", (), |row| row.get(0)).unwrap();
        assert_eq!(tag, phasing.as_str(), "Wrong phase handling tag");

        // Phase does not change the alleles.
        let (gt1, gt2): (i64, i64) = connection.query_row(
            "SELECT GT1, GT2 FROM genotypes WHERE variant_rowid = 1 AND sample_id = 0", (), |row| Ok((row.get(0)?, row.get(1)?))
        ).unwrap();
        assert_eq!((gt1, gt2), (0, 1), "Wrong alleles with {}", phasing);
    }
}

#[test]
fn small_batches() {
    let (_, sites) = internal::read_vcf("small.vcf");
    for batch_size in [1, 7, 1000] {
        let mut connection = Connection::open_in_memory().unwrap();
        let session = LoadSession::new("", PhaseHandling::Discard).with_batch_size(batch_size);
        let reader = utils::open_file(utils::get_test_data("small.vcf")).unwrap();
        let summary = load_vcf(&mut connection, reader, &session).unwrap();
        assert_eq!(summary.variants, sites.len(), "Wrong number of variants with batch size {}", batch_size);
        assert_eq!(summary.genotypes, sites.len() * 3, "Wrong number of genotypes with batch size {}", batch_size);
        assert_eq!(count_rows(&connection, "genotypes"), sites.len() * 3, "Wrong number of genotype rows with batch size {}", batch_size);
    }
}

//-----------------------------------------------------------------------------

#[test]
fn loader_states() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Discard);
    let mut loader = VcfLoader::new(&mut connection, &session).unwrap();
    assert_eq!(loader.state(), LoaderState::Open, "Wrong initial state");

    let result = loader.push_record(b"chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1");
    assert!(matches!(result, Err(Error::InvalidState { .. })), "Pushed a record before the header");
    assert!(matches!(loader.finish(), Err(Error::InvalidState { .. })), "Finished before the header");

    let mut reader = VCF.as_bytes();
    loader.read_header(&mut reader).unwrap();
    assert_eq!(loader.state(), LoaderState::HeaderParsed, "Wrong state after the header");
    let mut again = VCF.as_bytes();
    assert!(matches!(loader.read_header(&mut again), Err(Error::InvalidState { .. })), "Read the header twice");

    loader.push_record(b"chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n").unwrap();
    assert_eq!(loader.state(), LoaderState::Streaming, "Wrong state after a record");
    loader.push_record(b"\n").unwrap();
    loader.flush().unwrap();
    assert_eq!(loader.state(), LoaderState::Flushed, "Wrong state after flushing");
    loader.push_record(b"chr2\t5\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n").unwrap();
    let summary = loader.finish().unwrap();
    assert_eq!(loader.state(), LoaderState::Closed, "Wrong state after finishing");
    assert_eq!(summary.variants, 2, "Wrong number of variants");
    assert!(matches!(loader.push_record(b"chr1\t1\t.\tA\tG\t.\t.\t.\tGT\t0\t0"), Err(Error::InvalidState { .. })), "Pushed a record after closing");
    assert!(matches!(loader.flush(), Err(Error::InvalidState { .. })), "Flushed after closing");
    drop(loader);

    assert_eq!(count_rows(&connection, "variants"), 2, "Wrong number of committed variants");
    assert_eq!(LoaderState::HeaderParsed.to_string(), "HEADER_PARSED", "Wrong state name");
}

#[test]
fn failed_steps_roll_back() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Discard);
    {
        let mut loader = VcfLoader::new(&mut connection, &session).unwrap();
        let mut reader = VCF.as_bytes();
        loader.read_header(&mut reader).unwrap();
        loader.push_record(b"chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n").unwrap();
        let result = loader.push_record(b"chrZ\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n");
        assert!(matches!(result, Err(Error::UnresolvedContig { .. })), "Accepted an unknown contig");
        assert_eq!(loader.state(), LoaderState::Failed, "Wrong state after a failed record");

        let result = loader.push_record(b"chr1\t200\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n");
        assert!(matches!(result, Err(Error::InvalidState { .. })), "Pushed a record after a failure");
        assert!(matches!(loader.flush(), Err(Error::InvalidState { .. })), "Flushed after a failure");
        assert!(matches!(loader.finish(), Err(Error::InvalidState { .. })), "Finished after a failure");
        assert_eq!(loader.state(), LoaderState::Failed, "Wrong state after rejected steps");
    }
    assert!(user_tables(&connection).is_empty(), "Tables remain after a failed record");

    {
        let mut loader = VcfLoader::new(&mut connection, &session).unwrap();
        let mut reader = "##contig=<ID=chr1>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n".as_bytes();
        assert!(matches!(loader.read_header(&mut reader), Err(Error::MalformedHeader(_))), "Accepted a contig without length");
        assert_eq!(loader.state(), LoaderState::Failed, "Wrong state after a failed header");
        let mut again = VCF.as_bytes();
        assert!(matches!(loader.read_header(&mut again), Err(Error::InvalidState { .. })), "Read a header after a failure");
    }
    assert!(user_tables(&connection).is_empty(), "Tables remain after a failed header");
    assert_eq!(LoaderState::Failed.to_string(), "FAILED", "Wrong state name");
}

#[test]
fn dropped_loader_rolls_back() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Discard);
    {
        let mut loader = VcfLoader::new(&mut connection, &session).unwrap();
        loader.load(BufReader::new(VCF.as_bytes())).unwrap();
        loader.flush().unwrap();
    }
    assert!(user_tables(&connection).is_empty(), "Tables remain after dropping the loader");
}

//-----------------------------------------------------------------------------

#[test]
fn multiple_datasets() {
    let mut connection = Connection::open_in_memory().unwrap();
    let first = LoadSession::new("first_", PhaseHandling::Retain);
    let second = LoadSession::new("second_", PhaseHandling::Discard).with_assembly("GRCh38");
    load_string(&mut connection, VCF, &first).unwrap();
    let summary = load_string(&mut connection, VCF, &second).unwrap();
    assert_eq!(summary.assembly, "GRCh38", "Wrong assembly for the second dataset");
    assert_eq!(summary.reference_sequences, 25, "Wrong number of reference sequences for the second dataset");
    assert_eq!(user_tables(&connection).len(), 10, "Wrong number of tables");
    assert_eq!(count_rows(&connection, "first_variants"), 3, "Wrong number of variants in the first dataset");
    assert_eq!(count_rows(&connection, "second_variants"), 3, "Wrong number of variants in the second dataset");

    // Both datasets bin chr1 as rid 0, so the bins agree.
    let first_bins: Vec<i64> = connection.prepare("SELECT _gri_bin FROM first_variants ORDER BY rowid").unwrap()
        .query_map((), |row| row.get(0)).unwrap().map(|x| x.unwrap()).collect();
    let second_bins: Vec<i64> = connection.prepare("SELECT _gri_bin FROM second_variants ORDER BY rowid").unwrap()
        .query_map((), |row| row.get(0)).unwrap().map(|x| x.unwrap()).collect();
    assert_eq!(first_bins, second_bins, "Bins differ between datasets");

    let result = load_string(&mut connection, VCF, &first);
    assert!(matches!(result, Err(Error::TablePrefixCollision(_))), "Loaded the same prefix twice");
    assert_eq!(user_tables(&connection).len(), 10, "A failed load changed the tables");
}

#[test]
fn invalid_sessions() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("bad-prefix", PhaseHandling::Discard);
    assert!(matches!(load_string(&mut connection, VCF, &session), Err(Error::InvalidTablePrefix(_))), "Accepted an invalid prefix");
    let session = LoadSession::new("", PhaseHandling::Discard).with_assembly("hg38");
    assert!(matches!(load_string(&mut connection, VCF, &session), Err(Error::UnknownAssembly(_))), "Accepted an unknown assembly");
    assert!(user_tables(&connection).is_empty(), "Failed loads left tables behind");
}

//-----------------------------------------------------------------------------

#[test]
fn record_errors() {
    let cases: [(&str, fn(&Error) -> bool); 4] = [
        ("bad-contig.vcf", |err| matches!(err, Error::UnresolvedContig { .. })),
        ("triploid.vcf", |err| matches!(err, Error::UnsupportedPloidy { ploidy: 3, .. })),
        ("bad-numeric.vcf", |err| matches!(err, Error::MalformedNumericField { .. })),
        ("missing.vcf", |err| matches!(err, Error::Io(_))),
    ];
    for (filename, expected) in cases {
        let (dir, db_file) = internal::temp_db_file();
        let session = LoadSession::new("", PhaseHandling::Discard);
        let result = create_from_file(utils::get_test_data(filename), &db_file, &session);
        match result {
            Err(err) => assert!(expected(&err), "Wrong error for {}: {}", filename, err),
            Ok(summary) => panic!("Loaded {}: {:?}", filename, summary),
        }
        assert!(!utils::file_exists(&db_file), "Database file remains after failing to load {}", filename);
        drop(dir);
    }
}

#[test]
fn failed_load_keeps_existing_database() {
    let (_dir, db_file) = internal::temp_db_file();
    let session = LoadSession::new("good_", PhaseHandling::Discard);
    create_from_file(utils::get_test_data("small.vcf"), &db_file, &session).unwrap();

    let session = LoadSession::new("bad_", PhaseHandling::Discard);
    let result = create_from_file(utils::get_test_data("bad-contig.vcf"), &db_file, &session);
    assert!(matches!(result, Err(Error::UnresolvedContig { .. })), "Loaded a VCF with an unknown contig");
    assert!(utils::file_exists(&db_file), "Existing database was removed");

    let connection = Connection::open(&db_file).unwrap();
    let tables = user_tables(&connection);
    assert!(tables.iter().all(|name| name.starts_with("good_")), "Failed load left tables behind: {:?}", tables);
    assert_eq!(tables.len(), 5, "Wrong number of tables");
}

#[test]
fn header_errors() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Discard);

    let no_length = "##contig=<ID=chr1>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
    assert!(matches!(load_string(&mut connection, no_length, &session), Err(Error::MalformedHeader(_))), "Accepted a contig without length");

    let clash = "##contig=<ID=chr1,length=100>\n##INFO=<ID=dp,Number=1,Type=Integer,Description=\"a\">\n##INFO=<ID=DP,Number=1,Type=Integer,Description=\"b\">\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
    assert!(matches!(load_string(&mut connection, clash, &session), Err(Error::MalformedHeader(_))), "Accepted INFO columns differing by case");
    assert!(user_tables(&connection).is_empty(), "Failed loads left tables behind");

    // A built-in assembly does not need contig lengths.
    let session = LoadSession::new("", PhaseHandling::Discard).with_assembly("GRCh38");
    let sites_only = format!("{}chr1\t10\t.\tA\tT\t.\t.\t.\n", no_length);
    let summary = load_string(&mut connection, &sites_only, &session).unwrap();
    assert_eq!((summary.variants, summary.samples, summary.genotypes), (1, 0, 0), "Wrong summary for a sites-only file");
}

#[test]
fn coordinate_limits() {
    let mut connection = Connection::open_in_memory().unwrap();
    let session = LoadSession::new("", PhaseHandling::Discard);
    let header: String = VCF.lines().take(9).map(|line| format!("{}\n", line)).collect();

    let cases = [
        ("chr1\t9223372036854775809\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n", "POS beyond the SQL integer range"),
        ("chr1\t100\t.\tA\t<DEL>\t.\t.\tEND=18446744073709551615\tGT\t0/1\t1/1\n", "END beyond the SQL integer range"),
        ("chr1\t9223372036854775807\t.\tACGT\tA\t.\t.\t.\tGT\t0/1\t1/1\n", "REF reaching beyond the SQL integer range"),
    ];
    for (line, description) in cases {
        let vcf = format!("{}{}", header, line);
        let result = load_string(&mut connection, &vcf, &session);
        assert!(matches!(result, Err(Error::MalformedRecord(_))), "Accepted a record with {}", description);
        assert!(user_tables(&connection).is_empty(), "Tables remain after a record with {}", description);
    }

    // The largest interval that still fits.
    let vcf = format!("{}chr1\t9223372036854775807\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1/1\n", header);
    let summary = load_string(&mut connection, &vcf, &session).unwrap();
    assert_eq!(summary.variants, 1, "Wrong number of variants at the last position");
    let (pos, rlen): (i64, i64) = connection.query_row("SELECT pos, rlen FROM variants", (), |row| Ok((row.get(0)?, row.get(1)?))).unwrap();
    assert_eq!((pos, rlen), (i64::MAX - 1, 1), "Wrong interval at the last position");
}

//-----------------------------------------------------------------------------

#[test]
fn reference_blocks() {
    let session = LoadSession::new("", PhaseHandling::Discard);
    let (_dir, db_file) = internal::create_db_from_file("blocks.g.vcf", &session);
    let database = internal::open_db(&db_file, "");
    let mut interface = VariantInterface::new(&database).unwrap();

    let expected: [(u32, u64, u64); 5] = [(0, 0, 10000), (0, 10000, 1), (0, 10001, 189999), (0, 200000, 1), (1, 0, 3000000)];
    for (i, (rid, pos, rlen)) in expected.iter().enumerate() {
        let variant = interface.get_variant(i as i64 + 1).unwrap().unwrap();
        assert_eq!((variant.rid, variant.pos, variant.rlen), (*rid, *pos, *rlen), "Wrong interval for block {}", i + 1);
        assert_eq!(variant.bin, Bin::new(*rid, *pos, *rlen).id(), "Wrong bin for block {}", i + 1);
    }

    // A long block is found from the middle.
    let found: Vec<i64> = interface.overlapping("chr1", 150000, 150001).unwrap().iter().map(|v| v.rowid).collect();
    assert_eq!(found, vec![3], "Wrong blocks in the middle of chr1");
    let found: Vec<i64> = interface.overlapping("chr1", 9999, 10002).unwrap().iter().map(|v| v.rowid).collect();
    assert_eq!(found, vec![1, 2, 3], "Wrong blocks around a variant");
    let found: Vec<i64> = interface.overlapping("chr2", 2999999, 3000000).unwrap().iter().map(|v| v.rowid).collect();
    assert_eq!(found, vec![5], "Wrong blocks at the end of chr2");
}

#[test]
fn gzip_input() {
    let session = LoadSession::new("", PhaseHandling::Retain);
    let (_plain_dir, plain) = internal::create_db_from_file("small.vcf", &session);
    let (_gzip_dir, gzip) = internal::create_db_from_file("small.vcf.gz", &session);
    let plain = internal::open_db(&plain, "");
    let gzip = internal::open_db(&gzip, "");
    assert_eq!(plain.variants(), gzip.variants(), "Wrong number of variants from gzip input");
    assert_eq!(plain.genotypes(), gzip.genotypes(), "Wrong number of genotypes from gzip input");

    let mut plain = VariantInterface::new(&plain).unwrap();
    let mut gzip = VariantInterface::new(&gzip).unwrap();
    assert_eq!(plain.overlapping("chr1", 0, 1000000).unwrap(), gzip.overlapping("chr1", 0, 1000000).unwrap(), "Different variants from gzip input");
}

//-----------------------------------------------------------------------------
