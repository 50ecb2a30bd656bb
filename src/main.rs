//! svmatch: structural variant benchmarking
//!
//! Usage: svmatch <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use svmatch::bench::{BenchCommand, Strategy};
use svmatch::config::{
    MatchParameters, NoRefPolicy, SeqSimAlgorithm, DEFAULT_CHUNKSIZE, DEFAULT_REFDIST,
};
use svmatch::error::BenchError;

#[derive(Parser)]
#[command(name = "svmatch")]
#[command(version)]
#[command(about = "Structural variant benchmarking: compare a base VCF against a comparison VCF", long_about = None)]
struct Cli {
    /// Number of threads to use (default: sequential)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Log progress messages
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Log every failed comparison
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify base and comparison calls into TP/FN/FP and report performance
    Bench {
        /// Baseline truth-set calls
        #[arg(short = 'b', long)]
        base: PathBuf,

        /// Comparison set of calls
        #[arg(short = 'c', long)]
        comp: PathBuf,

        /// Output directory (must not exist)
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// FASTA reference (plain or gzip), required when --pctseq is above 0
        #[arg(short = 'f', long)]
        reference: Option<PathBuf>,

        /// Only compare calls fully contained in these BED regions
        #[arg(long)]
        includebed: Option<PathBuf>,

        /// Candidate search strategy
        #[arg(long, value_enum, default_value_t = Strategy::Chunk)]
        strategy: Strategy,

        /// Max reference location distance
        #[arg(short = 'r', long, default_value_t = DEFAULT_REFDIST)]
        refdist: u64,

        /// Min percent sequence similarity, 0 to skip the comparison
        #[arg(short = 'p', long, default_value_t = 0.70)]
        pctseq: f64,

        /// Bases added around both calls when building haplotypes
        #[arg(short = 'B', long, default_value_t = 50)]
        minhaplen: u64,

        /// Min percent size similarity
        #[arg(short = 'P', long, default_value_t = 0.70)]
        pctsize: f64,

        /// Min reciprocal overlap
        #[arg(short = 'O', long, default_value_t = 0.0)]
        pctovl: f64,

        /// Apply --pctovl to deletions only
        #[arg(long)]
        pctovl_del_only: bool,

        /// Variant types don't need to match to compare
        #[arg(long)]
        typeignore: bool,

        /// Sequence similarity algorithm
        #[arg(long, value_enum, default_value_t = SeqSimAlgorithm::EditDistance)]
        seqsim: SeqSimAlgorithm,

        /// Use the Levenshtein ratio (same as --seqsim levenshtein)
        #[arg(long)]
        use_lev: bool,

        /// Max gap between calls of one chunk
        #[arg(short = 'C', long, default_value_t = DEFAULT_CHUNKSIZE)]
        chunksize: u64,

        /// Compare genotypes; drop calls without a non-reference genotype
        #[arg(long)]
        gtcomp: bool,

        /// Baseline sample to use (default: first)
        #[arg(long = "bSample")]
        b_sample: Option<String>,

        /// Comparison sample to use (default: first)
        #[arg(long = "cSample")]
        c_sample: Option<String>,

        /// Treat DUP as INS when checking types
        #[arg(long)]
        dup_to_ins: bool,

        /// Minimum variant size to consider
        #[arg(short = 's', long, default_value_t = 50)]
        sizemin: u64,

        /// Minimum comparison call size considered for matching
        #[arg(short = 'S', long, default_value_t = 30)]
        sizefilt: u64,

        /// Maximum variant size to consider
        #[arg(long, default_value_t = 50_000)]
        sizemax: u64,

        /// Only consider calls with FILTER == PASS
        #[arg(long)]
        passonly: bool,

        /// Exclude calls without a non-reference genotype
        #[arg(long, value_enum, default_value_t = NoRefPolicy::Off)]
        no_ref: NoRefPolicy,

        /// Allow base calls to match multiple comparison calls, and vice versa
        #[arg(long)]
        multimatch: bool,
    },
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("svmatch=debug,info")
    } else if verbose {
        EnvFilter::new("svmatch=info")
    } else {
        EnvFilter::new("svmatch=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }
    let parallel = cli.threads.is_some_and(|n| n > 1);

    let result = match cli.command {
        Commands::Bench {
            base,
            comp,
            output,
            reference,
            includebed,
            strategy,
            refdist,
            pctseq,
            minhaplen,
            pctsize,
            pctovl,
            pctovl_del_only,
            typeignore,
            seqsim,
            use_lev,
            chunksize,
            gtcomp,
            b_sample,
            c_sample,
            dup_to_ins,
            sizemin,
            sizefilt,
            sizemax,
            passonly,
            no_ref,
            multimatch,
        } => {
            let mut params = MatchParameters::new()
                .with_refdist(refdist)
                .with_pctseq(pctseq)
                .with_pctsize(pctsize)
                .with_pctovl(pctovl)
                .with_sizes(sizemin, sizefilt, sizemax)
                .with_chunksize(chunksize)
                .with_multimatch(multimatch)
                .with_typeignore(typeignore)
                .with_no_ref(no_ref)
                .with_passonly(passonly)
                .with_gtcomp(gtcomp);
            params.minhaplen = minhaplen;
            params.pctovl_del_only = pctovl_del_only;
            params.seqsim_algorithm = if use_lev {
                SeqSimAlgorithm::Levenshtein
            } else {
                seqsim
            };
            params.b_sample = b_sample;
            params.c_sample = c_sample;
            params.dup_to_ins = dup_to_ins;

            run_bench(
                BenchCommand::new(base, comp, output)
                    .with_params(params)
                    .with_strategy(strategy)
                    .with_parallel(parallel),
                reference,
                includebed,
            )
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run_bench(
    mut cmd: BenchCommand,
    reference: Option<PathBuf>,
    includebed: Option<PathBuf>,
) -> Result<(), BenchError> {
    if let Some(reference) = reference {
        cmd = cmd.with_reference(reference);
    }
    if let Some(includebed) = includebed {
        cmd = cmd.with_includebed(includebed);
    }
    let stats = cmd.run()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
