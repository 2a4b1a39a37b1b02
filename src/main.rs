use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use kmer_mapper::align::{self, MapOpt};
use kmer_mapper::index::builder::{BuildOpt, IndexBuilder};
use kmer_mapper::index::file::{read_index, write_index, SequenceEntry};
use kmer_mapper::io::names::write_names;
use kmer_mapper::logging;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "kmer-mapper", author, version, about = "k-mer genome index and approximate read mapper", arg_required_else_help = true)]
struct Cli {
    /// 日志详细程度（-v info，-vv debug，-vvv trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a k-mer index from one or more FASTA files
    Index {
        /// Reference FASTA files
        #[arg(required = true)]
        fasta: Vec<PathBuf>,
        /// Word length k (1-16)
        #[arg(short = 'n', long = "word-length", default_value_t = 16)]
        word_length: usize,
        /// Output prefix; writes <prefix>.idx and <prefix>.names
        #[arg(short, long, default_value = "genome")]
        output: String,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
    /// Map reads against an index
    Map {
        /// Index file (.idx)
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
        /// Names file (.names) written alongside the index
        #[arg(short = 'g', long = "names")]
        names: PathBuf,
        /// Reads: FASTA, FASTQ, or whitespace separated sequences
        reads: PathBuf,
        /// Maximum edit distance (0-10)
        #[arg(short = 'm', long = "mismatches", default_value_t = 0)]
        mismatches: u32,
        /// Seed step (1-10)
        #[arg(long = "step", default_value_t = 5)]
        step: usize,
        #[arg(long = "max-candidates", default_value_t = align::MAX_CANDIDATES)]
        max_candidates: usize,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Output path (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print every word of an index with its locations
    Dump {
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);
    match cli.command {
        Commands::Index { fasta, word_length, output, threads } => {
            run_index(&fasta, BuildOpt { word_length, threads }, &output)
        }
        Commands::Map {
            index,
            names,
            reads,
            mismatches,
            step,
            max_candidates,
            threads,
            out,
        } => {
            let opt = MapOpt { mismatches, step, max_candidates, threads };
            align::map_reads(&index, &names, &reads, out.as_deref(), opt)?;
            Ok(())
        }
        Commands::Dump { index } => run_dump(&index),
    }
}

fn run_index(fasta: &[PathBuf], opt: BuildOpt, output: &str) -> Result<()> {
    let builder = IndexBuilder::new(opt)?;
    info!("indexing {} file(s) with k={}", fasta.len(), opt.word_length);
    let built = builder.build_files(fasta)?;
    if built.sequences.is_empty() {
        anyhow::bail!("no sequences found in the input files");
    }

    let entries: Vec<SequenceEntry> = built
        .sequences
        .iter()
        .map(|r| SequenceEntry { name: r.name.clone(), start: r.start })
        .collect();

    let idx_path = PathBuf::from(format!("{}.idx", output));
    let names_path = PathBuf::from(format!("{}.names", output));
    write_index(&idx_path, &built.table, &entries)
        .with_context(|| format!("cannot write index to '{}'", idx_path.display()))?;
    write_names(&names_path, &built.sequences)
        .with_context(|| format!("cannot write names to '{}'", names_path.display()))?;

    info!(
        "{} sequences, {} unique words, {} locations",
        built.sequences.len(),
        built.table.words.len(),
        built.table.locations.len()
    );
    info!("index saved: {} / {}", idx_path.display(), names_path.display());
    Ok(())
}

fn run_dump(index: &Path) -> Result<()> {
    let idx = read_index(index)?;
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    idx.dump(&mut out)?;
    out.flush()?;
    Ok(())
}
