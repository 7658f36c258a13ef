use super::*;

use std::io::BufReader;

//-----------------------------------------------------------------------------

const HEADER: &str = "##fileformat=VCFv4.3
##contig=<ID=chr1,length=248956422>
##contig=<ID=chr2,length=242193529,assembly=GRCh38>
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth, all samples\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">
##INFO=<ID=END,Number=1,Type=Integer,Description=\"End position\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878\tNA12891
chr1\t100\trs1\tA\tG\t50\tPASS\tDP=10\tGT\t0/1\t1/1
";

fn read_header(text: &str) -> Result<(VcfHeader, usize)> {
    let mut reader = BufReader::new(text.as_bytes());
    VcfHeader::read(&mut reader)
}

fn header() -> VcfHeader {
    read_header(HEADER).unwrap().0
}

//-----------------------------------------------------------------------------

// Tests for the header.

#[test]
fn header_contents() {
    let (header, lines) = read_header(HEADER).unwrap();
    assert_eq!(lines, 11, "Wrong number of header lines");
    assert_eq!(header.file_format.as_deref(), Some("VCFv4.3"), "Wrong file format");
    assert_eq!(header.contigs, vec![
        ContigDef { name: String::from("chr1"), length: Some(248956422) },
        ContigDef { name: String::from("chr2"), length: Some(242193529) },
    ], "Wrong contigs");
    assert_eq!(header.info.len(), 4, "Wrong number of INFO fields");
    assert_eq!(header.format.len(), 3, "Wrong number of FORMAT fields");
    assert_eq!(header.samples, vec![String::from("NA12878"), String::from("NA12891")], "Wrong samples");

    let dp = header.info_field("DP").unwrap();
    assert_eq!(dp.number, FieldNumber::Count(1), "Wrong number for INFO/DP");
    assert_eq!(dp.ty, FieldType::Integer, "Wrong type for INFO/DP");
    assert_eq!(dp.description, "Total depth, all samples", "Quoted comma not handled");
    assert_eq!(header.info_field("AF").unwrap().number, FieldNumber::PerAltAllele, "Wrong number for INFO/AF");
    assert_eq!(header.format_field("AD").unwrap().number, FieldNumber::PerAllele, "Wrong number for FORMAT/AD");
    assert!(header.info_field("MQ").is_none(), "Undeclared INFO field found");
}

#[test]
fn sites_only_header() {
    let text = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
    let (header, lines) = read_header(text).unwrap();
    assert_eq!(lines, 2, "Wrong number of header lines");
    assert!(header.samples.is_empty(), "Sites-only file has samples");
    assert!(header.contigs.is_empty(), "Unexpected contigs");
}

#[test]
fn invalid_headers() {
    let cases = [
        ("##fileformat=VCFv4.3\n", "missing #CHROM line"),
        ("chr1\t100\t.\tA\tG\t.\t.\t.\n", "data before the header"),
        ("#CHROM\tPOS\tID\n", "too few columns"),
        ("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tSAMPLE1\n", "samples without FORMAT"),
        ("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tA\n", "duplicate sample"),
        ("##contig=<ID=chr1,length=abc>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n", "invalid length"),
        ("##contig=<ID=chr1>\n##contig=<ID=chr1>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n", "duplicate contig"),
        ("##INFO=<ID=X,Number=1,Type=Text>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n", "unknown type"),
        ("##INFO=<ID=X,Number=Q,Type=Integer>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n", "invalid number"),
        ("##INFO=<ID=X,Type=Integer>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n", "missing number"),
    ];
    for (text, description) in cases {
        let result = read_header(text);
        assert!(matches!(result, Err(Error::MalformedHeader(_))), "Accepted a header with {}", description);
    }
}

#[test]
fn structured_values() {
    let attributes = parse_structured("<ID=X,Description=\"A \\\"quoted\\\" value, with a comma\",Source=test>").unwrap();
    assert_eq!(attributes, vec![
        (String::from("ID"), String::from("X")),
        (String::from("Description"), String::from("A \"quoted\" value, with a comma")),
        (String::from("Source"), String::from("test")),
    ]);
    assert!(parse_structured("ID=X").is_err(), "Accepted a value without brackets");
    assert!(parse_structured("<ID=X,Description=\"open>").is_err(), "Accepted an unterminated quote");
}

//-----------------------------------------------------------------------------

// Tests for records.

#[test]
fn record_columns() {
    let line = b"chr1\t100\trs1;rs2\tA\tG,T\t50.5\tq10;s50\tDP=10;DB;AF=0.25,0.5\tGT:DP\t0/1:7\t1|2:.\n";
    let record = VcfRecord::parse(line, 2).unwrap();
    assert_eq!(record.chrom, "chr1", "Wrong contig");
    assert_eq!(record.pos, 100, "Wrong position");
    assert_eq!(record.start(), 99, "Wrong 0-based start");
    assert_eq!(record.ids(), Some(vec![String::from("rs1"), String::from("rs2")]), "Wrong ids");
    assert_eq!(record.alt_alleles(), vec![String::from("G"), String::from("T")], "Wrong alt alleles");
    assert_eq!(record.alt_count(), 2, "Wrong alt count");
    assert_eq!(record.quality().unwrap(), Some(50.5), "Wrong quality");
    assert_eq!(record.filters(), Some(vec![String::from("q10"), String::from("s50")]), "Wrong filters");
    assert_eq!(record.reference_length().unwrap(), 1, "Wrong reference length");
    assert_eq!(record.format_keys(), vec![&b"GT"[..], &b"DP"[..]], "Wrong FORMAT keys");
    assert_eq!(record.samples, vec![&b"0/1:7"[..], &b"1|2:."[..]], "Wrong sample columns");

    let entries: Vec<(&[u8], Option<&[u8]>)> = record.info_entries().collect();
    assert_eq!(entries, vec![
        (&b"DP"[..], Some(&b"10"[..])),
        (&b"DB"[..], None),
        (&b"AF"[..], Some(&b"0.25,0.5"[..])),
    ], "Wrong INFO entries");
}

#[test]
fn missing_values() {
    let record = VcfRecord::parse(b"chr2\t5\t.\tAC\t.\t.\t.\t.", 0).unwrap();
    assert_eq!(record.ids(), None, "Missing ids should be None");
    assert!(record.alt_alleles().is_empty(), "Missing ALT should have no alleles");
    assert_eq!(record.alt_count(), 0, "Wrong alt count");
    assert_eq!(record.quality().unwrap(), None, "Missing quality should be None");
    assert_eq!(record.filters(), None, "Missing filters should be None");
    assert_eq!(record.info_entries().count(), 0, "Missing INFO should have no entries");
    assert_eq!(record.reference_length().unwrap(), 2, "Wrong reference length");
    assert!(record.format.is_none(), "Sites-only record has FORMAT");

    let empty_id = VcfRecord::parse(b"chr2\t5\t\tA\tC\t.\t.\t.", 0).unwrap();
    assert_eq!(empty_id.ids(), Some(Vec::new()), "Empty ID column should be an empty list");
}

#[test]
fn reference_blocks() {
    let record = VcfRecord::parse(b"chr1\t1000\t.\tA\t<NON_REF>\t.\t.\tEND=1999\tGT\t0/0", 1).unwrap();
    assert_eq!(record.end().unwrap(), Some(1999), "Wrong END");
    assert_eq!(record.reference_length().unwrap(), 1000, "Wrong reference length for a block");

    let single = VcfRecord::parse(b"chr1\t1000\t.\tA\t<NON_REF>\t.\t.\tEND=1000\tGT\t0/0", 1).unwrap();
    assert_eq!(single.reference_length().unwrap(), 1, "Wrong reference length for a one-base block");

    let before = VcfRecord::parse(b"chr1\t1000\t.\tA\t<NON_REF>\t.\t.\tEND=900\tGT\t0/0", 1).unwrap();
    assert!(matches!(before.reference_length(), Err(Error::MalformedRecord(_))), "Accepted END before POS");

    let invalid = VcfRecord::parse(b"chr1\t1000\t.\tA\t<NON_REF>\t.\t.\tEND=x\tGT\t0/0", 1).unwrap();
    assert!(matches!(invalid.end(), Err(Error::MalformedNumericField { .. })), "Accepted a non-numeric END");
}

#[test]
fn invalid_records() {
    let cases: [(&[u8], usize, &str); 6] = [
        (b"chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1", 2, "missing sample column"),
        (b"chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t0/0", 1, "extra sample column"),
        (b"chr1\t0\t.\tA\tG\t.\t.\t.", 0, "position 0"),
        (b"chr1\tx\t.\tA\tG\t.\t.\t.", 0, "non-numeric position"),
        (b"chr1\t9223372036854775809\t.\tA\tG\t.\t.\t.", 0, "position beyond the SQL integer range"),
        (b"chr1\t100\t.\t\tG\t.\t.\t.", 0, "empty REF"),
    ];
    for (line, samples, description) in cases {
        let result = VcfRecord::parse(line, samples);
        assert!(matches!(result, Err(Error::MalformedRecord(_))), "Accepted a record with {}", description);
    }

    let record = VcfRecord::parse(b"chr1\t100\t.\tA\tG\thigh\t.\t.", 0).unwrap();
    assert!(matches!(record.quality(), Err(Error::MalformedNumericField { .. })), "Accepted a non-numeric QUAL");

    let record = VcfRecord::parse(b"chr1\t100\t.\tA\t<DEL>\t.\t.\tEND=18446744073709551615", 0).unwrap();
    assert!(matches!(record.reference_length(), Err(Error::MalformedRecord(_))), "Accepted an END beyond the SQL integer range");
    let record = VcfRecord::parse(b"chr1\t100\t.\tA\t<DEL>\t.\t.\tEND=50", 0).unwrap();
    assert!(matches!(record.reference_length(), Err(Error::MalformedRecord(_))), "Accepted an END before POS");
    let record = VcfRecord::parse(b"chr1\t100\t.\tA\t<DEL>\t.\t.\tEND=99", 0).unwrap();
    assert_eq!(record.reference_length().unwrap(), 0, "Wrong length for an empty interval");
}

//-----------------------------------------------------------------------------

// Tests for typed fields.

#[test]
fn scalar_values() {
    let header = header();
    let dp = header.info_field("DP").unwrap();
    assert_eq!(dp.parse_value(Some(b"42")).unwrap(), FieldValue::Integer(42), "Wrong integer");
    assert_eq!(dp.parse_value(Some(b".")).unwrap(), FieldValue::Null, "Missing value should be null");
    assert_eq!(dp.parse_value(None).unwrap(), FieldValue::Null, "Absent value should be null");
    assert_eq!(dp.sql_type(), "INTEGER", "Wrong SQL type for INFO/DP");
    assert_eq!(dp.column("info_"), ColumnDef::new("info_DP", "INTEGER"), "Wrong column for INFO/DP");

    let result = dp.parse_value(Some(b"4x2"));
    match result {
        Err(Error::MalformedNumericField { field, value }) => {
            assert_eq!(field, "DP", "Wrong field in the error");
            assert_eq!(value, "4x2", "Wrong value in the error");
        },
        _ => panic!("Accepted a malformed integer: {:?}", result),
    }
    assert!(matches!(dp.parse_value(Some(b"")), Err(Error::MalformedNumericField { .. })), "Accepted an empty integer");

    let qual = FieldDef::new("Q", FieldNumber::Count(1), FieldType::Float);
    assert_eq!(qual.parse_value(Some(b"1e-3")).unwrap(), FieldValue::Float(0.001), "Wrong float");
    assert!(qual.parse_value(Some(b"one")).is_err(), "Accepted a malformed float");
    assert!(matches!(qual.parse_value(Some(b"")), Err(Error::MalformedNumericField { .. })), "Accepted an empty float");
    assert_eq!(qual.sql_type(), "REAL", "Wrong SQL type for a float");

    let text = FieldDef::new("S", FieldNumber::Count(1), FieldType::String);
    assert_eq!(text.parse_value(Some(b"abc")).unwrap(), FieldValue::Text(String::from("abc")), "Wrong string");
}

#[test]
fn flag_values() {
    let header = header();
    let db = header.info_field("DB").unwrap();
    assert!(db.is_scalar(), "Flags should be scalar");
    assert_eq!(db.sql_type(), "INTEGER", "Wrong SQL type for a flag");
    assert_eq!(db.parse_value(None).unwrap(), FieldValue::Integer(0), "Absent flag should be false");
    assert_eq!(db.parse_value(Some(b"")).unwrap(), FieldValue::Integer(1), "Present flag should be true");
}

#[test]
fn list_values() {
    let header = header();
    let af = header.info_field("AF").unwrap();
    assert!(!af.is_scalar(), "Number=A should not be scalar");
    assert_eq!(af.column("info_"), ColumnDef::new("info_AF_jsarray", "TEXT"), "Wrong column for INFO/AF");
    assert_eq!(af.parse_value(Some(b"0.25,.,1")).unwrap(), FieldValue::Json(String::from("[0.25,null,1.0]")), "Wrong float list");
    assert_eq!(af.parse_value(Some(b".")).unwrap(), FieldValue::Null, "Missing list should be null");
    assert!(matches!(af.parse_value(Some(b"0.1,x")), Err(Error::MalformedNumericField { .. })), "Accepted a malformed list element");
    assert!(matches!(af.parse_value(Some(b"0.1,")), Err(Error::MalformedNumericField { .. })), "Accepted an empty list element");

    let ad = header.format_field("AD").unwrap();
    assert_eq!(ad.parse_value(Some(b"3,7")).unwrap(), FieldValue::Json(String::from("[3,7]")), "Wrong integer list");

    let names = FieldDef::new("N", FieldNumber::Unbounded, FieldType::String);
    assert_eq!(names.parse_value(Some(b"a,b\"c")).unwrap(), FieldValue::Json(String::from("[\"a\",\"b\\\"c\"]")), "Wrong string list");
}

#[test]
fn info_encoding() {
    let header = header();
    let encoder = InfoEncoder::new(&header.info);
    let columns: Vec<String> = encoder.columns().into_iter().map(|column| column.name).collect();
    assert_eq!(columns, vec!["info_DP", "info_AF_jsarray", "info_DB", "info_END"], "Wrong INFO columns");

    let record = VcfRecord::parse(b"chr1\t100\t.\tA\tG,T\t.\t.\tAF=0.1,0.2;XX=1;DP=5;XX=2", 0).unwrap();
    let values = encoder.encode(&record).unwrap();
    assert_eq!(values, vec![
        FieldValue::Integer(5),
        FieldValue::Json(String::from("[0.1,0.2]")),
        FieldValue::Integer(0),
        FieldValue::Null,
    ], "Wrong INFO values");

    let bad = VcfRecord::parse(b"chr1\t100\t.\tA\tG\t.\t.\tDP=many", 0).unwrap();
    assert!(matches!(encoder.encode(&bad), Err(Error::MalformedNumericField { .. })), "Accepted a malformed INFO/DP");
    let empty = VcfRecord::parse(b"chr1\t100\t.\tA\tG\t.\t.\tDP=", 0).unwrap();
    assert!(matches!(encoder.encode(&empty), Err(Error::MalformedNumericField { .. })), "Accepted an empty INFO/DP");
}

#[test]
fn sql_values() {
    assert_eq!(Value::from(FieldValue::Null), Value::Null);
    assert_eq!(Value::from(FieldValue::Integer(3)), Value::Integer(3));
    assert_eq!(Value::from(FieldValue::Float(f64::NAN)), Value::Null, "NaN should be stored as null");
    assert_eq!(Value::from(FieldValue::Json(String::from("[1]"))), Value::Text(String::from("[1]")));
}

//-----------------------------------------------------------------------------
