use std::time::Instant;
use std::{env, process};

use vcf_base::{loader, utils, LoadSession, PhaseHandling, ReferenceCatalog, VariantBase};
use getopts::Options;
use log::info;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse arguments.
    let config = Config::new();

    // Load the dataset. The output may already contain datasets with other prefixes.
    if utils::file_exists(&config.db_file) {
        info!("Adding tables with prefix {:?} to database {}", config.session.table_prefix, config.db_file);
    }
    loader::create_from_file(&config.vcf_file, &config.db_file, &config.session).map_err(|x| x.to_string())?;

    // Statistics.
    let database = VariantBase::open(&config.db_file, &config.session.table_prefix).map_err(|x| x.to_string())?;
    info!(
        "The dataset contains {} variants, {} samples, and {} genotypes on assembly {}",
        database.variants(), database.samples(), database.genotypes(), database.assembly()
    );
    if let Some(size) = database.file_size() {
        info!("Database size: {}", size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    info!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub vcf_file: String,
    pub db_file: String,
    pub session: LoadSession,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        let assembly_help = format!(
            "use a built-in assembly ({}; default: contigs in the header)",
            ReferenceCatalog::known_assemblies().join(", ")
        );
        opts.optopt("a", "assembly", &assembly_help, "NAME");
        opts.optopt("p", "table-prefix", "prefix for table names (default: none)", "STR");
        opts.optopt("", "phase", "genotype phase handling (required)", "retain|discard");
        let batch_help = format!("insert this many variants at a time (default: {})", LoadSession::BATCH_SIZE);
        opts.optopt("b", "batch-size", &batch_help, "INT");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] --phase retain|discard input.vcf[.gz] output.db", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        if matches.free.len() != 2 {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }
        let vcf_file = matches.free[0].clone();
        let db_file = matches.free[1].clone();

        let phasing = match matches.opt_str("phase") {
            Some(s) => match PhaseHandling::parse(&s) {
                Some(phasing) => phasing,
                None => {
                    eprintln!("Invalid phase handling: {}", s);
                    process::exit(1);
                }
            },
            None => {
                eprintln!("Option --phase is required");
                eprint!("{}", opts.usage(&header));
                process::exit(1);
            }
        };

        let prefix = matches.opt_str("p").unwrap_or_default();
        let mut session = LoadSession::new(&prefix, phasing);
        if let Some(s) = matches.opt_str("a") {
            session = session.with_assembly(&s);
        }
        if let Some(s) = matches.opt_str("b") {
            match s.parse::<usize>() {
                Ok(n) => session = session.with_batch_size(n),
                Err(f) => {
                    eprintln!("--batch-size: {}", f);
                    process::exit(1);
                }
            }
        }

        Config {
            vcf_file,
            db_file,
            session,
        }
    }
}

//-----------------------------------------------------------------------------
