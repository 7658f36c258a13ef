use vcf_base::{GenotypeRecord, VariantBase, VariantInterface, VariantRecord};

use std::io::{self, BufWriter, Write};
use std::ops::Range;
use std::{env, process};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse arguments.
    let config = Config::new()?;

    // Open the database.
    let database = VariantBase::open(&config.filename, &config.prefix).map_err(|x| x.to_string())?;
    let mut interface = VariantInterface::new(&database).map_err(|x| x.to_string())?;
    if interface.find_rid(&config.contig).map_err(|x| x.to_string())?.is_none() {
        return Err(format!("Contig {} is not in the reference catalog", config.contig));
    }

    // Find the overlapping variants.
    let variants = interface.overlapping(
        &config.contig, config.interval.start as i64, config.interval.end as i64
    ).map_err(|x| x.to_string())?;
    let samples = if config.genotypes {
        interface.sample_names().map_err(|x| x.to_string())?
    } else {
        Vec::new()
    };

    // TSV output.
    let mut output = BufWriter::new(io::stdout());
    write_header(&samples, &mut output).map_err(|x| x.to_string())?;
    for variant in variants.iter() {
        let genotypes = if config.genotypes {
            interface.genotypes(variant.rowid).map_err(|x| x.to_string())?
        } else {
            Vec::new()
        };
        write_variant(&config.contig, variant, &genotypes, &mut output).map_err(|x| x.to_string())?;
    }
    output.flush().map_err(|x| x.to_string())?;

    Ok(())
}

//-----------------------------------------------------------------------------

pub struct Config {
    pub filename: String,
    pub prefix: String,
    pub contig: String,
    // 0-based half-open interval.
    pub interval: Range<u64>,
    pub genotypes: bool,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("r", "region", "query region as 1-based inclusive coordinates (required)", "CHR:START-END");
        opts.optopt("p", "table-prefix", "prefix for table names (default: none)", "STR");
        opts.optflag("g", "genotypes", "print genotypes for all samples");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        let header = format!("Usage: {} [options] --region chr:start-end variants.db", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let filename = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        let region = matches.opt_str("r").ok_or("Query region must be provided with --region".to_string())?;
        let (contig, interval) = parse_region(&region)?;

        Ok(Config {
            filename,
            prefix: matches.opt_str("p").unwrap_or_default(),
            contig,
            interval,
            genotypes: matches.opt_present("g"),
        })
    }
}

// Parses `chr:start-end` with 1-based inclusive coordinates into a 0-based half-open interval.
// Contig names may contain colons.
fn parse_region(region: &str) -> Result<(String, Range<u64>), String> {
    let (contig, range) = region.rsplit_once(':').ok_or(format!("Invalid region: {}", region))?;
    let (start, end) = range.split_once('-').ok_or(format!("Invalid region: {}", region))?;
    let start = start.replace(',', "").parse::<u64>().map_err(|x| format!("Invalid start in {}: {}", region, x))?;
    let end = end.replace(',', "").parse::<u64>().map_err(|x| format!("Invalid end in {}: {}", region, x))?;
    if contig.is_empty() || start == 0 || end < start {
        return Err(format!("Invalid region: {}", region));
    }
    Ok((contig.to_string(), (start - 1)..end))
}

//-----------------------------------------------------------------------------

fn write_header<T: Write>(samples: &[String], output: &mut T) -> io::Result<()> {
    write!(output, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tRLEN\tBIN")?;
    for sample in samples.iter() {
        write!(output, "\t{}", sample)?;
    }
    writeln!(output)
}

fn join_or_missing(values: &Option<Vec<String>>, separator: &str) -> String {
    match values {
        Some(values) if !values.is_empty() => values.join(separator),
        _ => String::from("."),
    }
}

fn format_genotype(genotype: &GenotypeRecord) -> String {
    let allele = |x: Option<u32>| x.map(|a| a.to_string()).unwrap_or(String::from("."));
    let separator = if genotype.phased == Some(true) { "|" } else { "/" };
    match (genotype.gt1, genotype.gt2) {
        (None, None) => String::from("./."),
        (first, None) => allele(first),
        (first, second) => format!("{}{}{}", allele(first), separator, allele(second)),
    }
}

fn write_variant<T: Write>(contig: &str, variant: &VariantRecord, genotypes: &[GenotypeRecord], output: &mut T) -> io::Result<()> {
    let alt = if variant.alt.is_empty() { String::from(".") } else { variant.alt.join(",") };
    let qual = variant.qual.map(|q| q.to_string()).unwrap_or(String::from("."));
    let bin = variant.bin().map(|b| b.to_string()).unwrap_or(String::from("."));
    write!(
        output, "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        contig, variant.pos + 1, join_or_missing(&variant.ids, ";"), variant.reference,
        alt, qual, join_or_missing(&variant.filters, ";"), variant.rlen, bin
    )?;
    for genotype in genotypes.iter() {
        write!(output, "\t{}", format_genotype(genotype))?;
    }
    writeln!(output)
}

//-----------------------------------------------------------------------------
