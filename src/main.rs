//! pirphase: read-backed rephasing of heterozygous calls
//!
//! Usage: pirphase <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use pirphase::commands::{
    CheckCommand, DiffCommand, DiffStats, MergeCommand, RephaseRunStats, ShowCommand, ShowStats,
    SplitCommand, SplitSelection, SplitStats, SwitchCommand,
};
use pirphase::config::{CramLocator, ExtractConfig, PileupFilter, RephaseConfig, SyntheticScore};
use pirphase::error::{PhaseError, Result};
use pirphase::samples::SampleList;
use pirphase::store::{OpenMode, PhaseStore};
use pirphase::variants::VariantCatalog;

#[derive(Parser)]
#[command(name = "pirphase")]
#[command(version)]
#[command(about = "Read-backed rephasing of low-confidence heterozygous calls in cohort call sets", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Log per-site decisions
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Print run statistics to stderr
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SyntheticArg {
    /// Use the PP field of the call set
    None,
    /// Derive from the minor allele frequency (AC/AN)
    Maf,
    /// Derive from the AF INFO field
    Af,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract low-confidence heterozygous calls from a VCF/BCF into a phase store
    Extract {
        /// Input VCF/BCF call set
        #[arg(short = 'f', long)]
        call_set: PathBuf,

        /// Output phase store
        #[arg(short, long)]
        output: PathBuf,

        /// Window width around each low-confidence call (forced odd)
        #[arg(short = 'w', long, default_value = "5")]
        window_size: usize,

        /// Calls with PP below this are kept with their neighbours
        #[arg(long, default_value = "0.99")]
        pp_threshold: f32,

        /// First sample to extract
        #[arg(long, default_value = "0")]
        sample_start: u32,

        /// Sample after the last one to extract
        #[arg(long)]
        sample_end: Option<u32>,

        /// Score source when the call set has no PP field
        #[arg(long, value_enum, default_value = "none")]
        synthetic: SyntheticArg,

        /// Frequencies above this get no synthetic score
        #[arg(long, default_value = "0.001")]
        maf_threshold: f32,

        /// Give singleton calls at or above the threshold a score of 0.97
        #[arg(long)]
        singleton_workaround: bool,
    },

    /// Rephase a phase store in place using sequencing reads
    Rephase {
        /// Phase store (rewritten in place)
        #[arg(short = 'b', long)]
        store: PathBuf,

        /// VCF/BCF the store was extracted from
        #[arg(short = 'f', long)]
        call_set: PathBuf,

        /// Sample list (`name` or `index,name[,alignment]` per line);
        /// defaults to the call-set header
        #[arg(short = 'S', long)]
        samples: Option<PathBuf>,

        /// Only rephase the samples named in this list
        #[arg(short = 'l', long)]
        subset: Option<PathBuf>,

        /// Directory holding `{name[0..2]}/{name}_{project}_0_0.cram`
        #[arg(long)]
        cram_dir: Option<PathBuf>,

        /// Project tag of generated alignment file names
        #[arg(long, default_value = "")]
        project: String,

        /// Reference FASTA for CRAM decoding
        #[arg(short = 'r', long)]
        reference: Option<PathBuf>,

        /// Calls with PP below this are rephased
        #[arg(long, default_value = "1.0")]
        pp_threshold: f32,

        /// Maximum distance (bp) to a linked neighbour
        #[arg(long, default_value = "1000")]
        max_distance: u64,

        /// Maximum neighbours walked in each direction
        #[arg(long, default_value = "100")]
        max_steps: usize,

        /// SNPs without a SNP neighbour this close are not rephased
        #[arg(long, default_value = "1000")]
        chain_distance: u64,

        /// Only neighbours scoring above this vote (e.g. 0.9); all vote when unset
        #[arg(long)]
        min_neighbor_score: Option<f32>,

        /// Minimum base quality
        #[arg(long, default_value = "30")]
        min_base_quality: u8,

        /// Minimum mapping quality
        #[arg(long, default_value = "50")]
        min_mapping_quality: u8,

        /// Bases fetched on each side of a site
        #[arg(long, default_value = "300")]
        flank: u64,

        /// Disable read and base filters (gaps are still skipped)
        #[arg(long)]
        no_filter: bool,
    },

    /// Write rephased GT and PP values back into a VCF/BCF
    Update {
        /// Input VCF/BCF call set
        #[arg(short = 'f', long)]
        call_set: PathBuf,

        /// Rephased phase store
        #[arg(short = 'b', long)]
        store: PathBuf,

        /// Output VCF/BCF (format from extension)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the contents of a phase store
    Show {
        /// Phase store
        store: PathBuf,

        /// Dump the records of this sample (store position)
        #[arg(short, long)]
        sample: Option<u32>,

        /// Annotate records with their locus from this VCF/BCF
        #[arg(short = 'f', long)]
        call_set: Option<PathBuf>,

        /// Low-score threshold for counting
        #[arg(long, default_value = "0.99")]
        threshold: f32,
    },

    /// Check the integrity of a phase store
    Check {
        /// Phase store
        store: PathBuf,
    },

    /// Merge phase stores into one
    Merge {
        /// Input stores
        inputs: Vec<PathBuf>,

        /// Merge `{prefix}_0`, `{prefix}_1`, ... instead of listed inputs
        #[arg(short, long, conflicts_with = "inputs")]
        prefix: Option<String>,

        /// Output store
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a subset of the samples of a store to a new store
    Split {
        /// Input store
        #[arg(short, long)]
        input: PathBuf,

        /// Output store
        #[arg(short, long)]
        output: PathBuf,

        /// Full sample list of the call set
        #[arg(short = 'S', long, requires = "subset")]
        samples: Option<PathBuf>,

        /// Samples to keep
        #[arg(short = 'l', long, requires = "samples")]
        subset: Option<PathBuf>,

        /// Keep this many random samples instead
        #[arg(long, conflicts_with = "subset")]
        random: Option<usize>,

        /// Seed of the random selection
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Compare a store before and after rephasing
    Diff {
        /// Store before rephasing
        original: PathBuf,

        /// Store after rephasing
        rephased: PathBuf,

        /// Full sample list of the call set
        #[arg(short = 'S', long, requires = "subset")]
        samples: Option<PathBuf>,

        /// Only compare these samples
        #[arg(short = 'l', long, requires = "samples")]
        subset: Option<PathBuf>,

        /// Low-score threshold
        #[arg(long, default_value = "0.99")]
        threshold: f32,
    },

    /// Flip the phase of every record of a store in place
    Switch {
        /// Phase store
        store: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Configure thread pool if --threads specified
    let threads = cli.threads.unwrap_or(0);
    if threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            warn!("Failed to initialize thread pool: {}", e);
        }
    }
    let stats = cli.stats;

    let result = match cli.command {
        Commands::Extract {
            call_set,
            output,
            window_size,
            pp_threshold,
            sample_start,
            sample_end,
            synthetic,
            maf_threshold,
            singleton_workaround,
        } => {
            let synthetic = match synthetic {
                SyntheticArg::None => SyntheticScore::None,
                SyntheticArg::Maf => SyntheticScore::FromMaf,
                SyntheticArg::Af => SyntheticScore::FromAf,
            };
            let config = ExtractConfig::default()
                .with_window_size(window_size)
                .with_pp_threshold(pp_threshold)
                .with_sample_range(sample_start, sample_end)
                .with_synthetic(synthetic)
                .with_maf_threshold(maf_threshold)
                .with_singleton_workaround(singleton_workaround);
            run_extract(&call_set, &output, config, stats)
        }

        Commands::Rephase {
            store,
            call_set,
            samples,
            subset,
            cram_dir,
            project,
            reference,
            pp_threshold,
            max_distance,
            max_steps,
            chain_distance,
            min_neighbor_score,
            min_base_quality,
            min_mapping_quality,
            flank,
            no_filter,
        } => {
            let filter = PileupFilter::default()
                .with_min_base_quality(min_base_quality)
                .with_min_mapping_quality(min_mapping_quality)
                .with_flank(flank)
                .with_no_filter(no_filter);
            let config = RephaseConfig::default()
                .with_pp_threshold(pp_threshold)
                .with_max_distance(max_distance)
                .with_max_steps(max_steps)
                .with_chain_distance(chain_distance)
                .with_min_neighbor_score(min_neighbor_score)
                .with_filter(filter);
            let locator = CramLocator {
                directory: cram_dir,
                project,
                reference,
            };
            run_rephase(
                &store,
                &call_set,
                samples.as_deref(),
                subset.as_deref(),
                locator,
                config,
                threads,
            )
            .map(|s| report(stats, "Rephase", &s))
        }

        Commands::Update {
            call_set,
            store,
            output,
        } => run_update(&call_set, &store, &output, stats),

        Commands::Show {
            store,
            sample,
            call_set,
            threshold,
        } => run_show(&store, sample, call_set.as_deref(), threshold)
            .map(|s| println!("{}", s)),

        Commands::Check { store } => match CheckCommand::new().run(&store) {
            Ok(s) => {
                println!("{}: {}", store.display(), s);
                for issue in &s.issues {
                    println!("  {}", issue);
                }
                if !s.passed() {
                    process::exit(2);
                }
                Ok(())
            }
            Err(e) => Err(e),
        },

        Commands::Merge {
            inputs,
            prefix,
            output,
        } => {
            let cmd = match prefix {
                Some(prefix) => MergeCommand::from_prefix(&prefix),
                None => MergeCommand::new(inputs),
            };
            cmd.run(&output).map(|s| report(stats, "Merge", &s))
        }

        Commands::Split {
            input,
            output,
            samples,
            subset,
            random,
            seed,
        } => run_split(&input, &output, samples, subset, random, seed)
            .map(|s| report(stats, "Split", &s)),

        Commands::Diff {
            original,
            rephased,
            samples,
            subset,
            threshold,
        } => run_diff(&original, &rephased, samples, subset, threshold)
            .map(|s| report(stats, "Diff", &s)),

        Commands::Switch { store } => SwitchCommand::new()
            .run(&store)
            .map(|s| report(stats, "Switch", &s)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Log a command summary, or print it to stderr with `--stats`.
fn report<S: std::fmt::Display>(print: bool, command: &str, stats: &S) {
    if print {
        eprintln!("{} stats:\n{}", command, stats);
    } else {
        info!("{} done. {}", command, stats);
    }
}

#[cfg(not(feature = "htslib"))]
fn htslib_missing<T>() -> Result<T> {
    Err(PhaseError::InvalidArgument(
        "reading call sets and alignments requires the htslib feature".into(),
    ))
}

#[cfg(feature = "htslib")]
fn run_extract(call_set: &Path, output: &Path, config: ExtractConfig, stats: bool) -> Result<()> {
    pirphase::commands::ExtractCommand::new(config)
        .run(call_set, output)
        .map(|s| report(stats, "Extract", &s))
}

#[cfg(not(feature = "htslib"))]
fn run_extract(_: &Path, _: &Path, _: ExtractConfig, _: bool) -> Result<()> {
    htslib_missing()
}

#[cfg(feature = "htslib")]
fn run_update(call_set: &Path, store: &Path, output: &Path, stats: bool) -> Result<()> {
    pirphase::commands::UpdateCommand::new()
        .run(call_set, store, output)
        .map(|s| report(stats, "Update", &s))
}

#[cfg(not(feature = "htslib"))]
fn run_update(_: &Path, _: &Path, _: &Path, _: bool) -> Result<()> {
    htslib_missing()
}

#[cfg(feature = "htslib")]
fn run_rephase(
    store: &Path,
    call_set: &Path,
    samples: Option<&Path>,
    subset: Option<&Path>,
    locator: CramLocator,
    config: RephaseConfig,
    threads: usize,
) -> Result<RephaseRunStats> {
    use pirphase::commands::RephaseCommand;
    use pirphase::hts::{call_set_samples, load_catalog, HtsOpener};

    let samples = match samples {
        Some(path) => SampleList::load(path)?,
        None => call_set_samples(call_set)?,
    };
    let catalog = load_catalog(call_set)?;
    let mut cmd = RephaseCommand::new(config).with_threads(threads);
    if let Some(path) = subset {
        cmd = cmd.with_subset(SampleList::load(path)?);
    }
    cmd.run(store, &catalog, &samples, &HtsOpener::new(locator))
}

#[cfg(not(feature = "htslib"))]
fn run_rephase(
    _: &Path,
    _: &Path,
    _: Option<&Path>,
    _: Option<&Path>,
    _: CramLocator,
    _: RephaseConfig,
    _: usize,
) -> Result<RephaseRunStats> {
    htslib_missing()
}

fn load_catalog(call_set: Option<&Path>) -> Result<Option<VariantCatalog>> {
    match call_set {
        None => Ok(None),
        #[cfg(feature = "htslib")]
        Some(path) => pirphase::hts::load_catalog(path).map(Some),
        #[cfg(not(feature = "htslib"))]
        Some(_) => htslib_missing(),
    }
}

fn run_show(
    store: &Path,
    sample: Option<u32>,
    call_set: Option<&Path>,
    threshold: f32,
) -> Result<ShowStats> {
    let catalog = load_catalog(call_set)?;
    let mut cmd = ShowCommand::new().with_low_score_threshold(threshold);
    if let Some(n) = sample {
        cmd = cmd.with_sample(n);
    }
    let stdout = io::stdout();
    cmd.run(store, catalog.as_ref(), stdout.lock())
}

fn run_split(
    input: &Path,
    output: &Path,
    samples: Option<PathBuf>,
    subset: Option<PathBuf>,
    random: Option<usize>,
    seed: u64,
) -> Result<SplitStats> {
    let selection = match (samples, subset, random) {
        (Some(all), Some(subset), _) => SplitSelection::Names {
            all: SampleList::load(all)?,
            subset: SampleList::load(subset)?,
        },
        (_, _, Some(count)) => SplitSelection::Random { count, seed },
        _ => {
            return Err(PhaseError::InvalidArgument(
                "split needs --samples with --subset, or --random".into(),
            ))
        }
    };
    SplitCommand::new(selection).run(input, output)
}

fn run_diff(
    original: &Path,
    rephased: &Path,
    samples: Option<PathBuf>,
    subset: Option<PathBuf>,
    threshold: f32,
) -> Result<DiffStats> {
    let mut cmd = DiffCommand::new().with_low_score_threshold(threshold);
    if let (Some(all), Some(subset)) = (samples, subset) {
        let store = PhaseStore::open(original, OpenMode::ReadOnly)?;
        let positions = pirphase::commands::resolve_store_positions(
            &store,
            &SampleList::load(all)?,
            &SampleList::load(subset)?,
        )?;
        cmd = cmd.with_samples(positions);
    }
    let stdout = io::stdout();
    cmd.run(original, rephased, stdout.lock())
}
