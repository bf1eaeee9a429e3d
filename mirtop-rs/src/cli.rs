use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mirtop-rs",
    about = "Annotate miRNA/isomiR variants and summarize them across samples",
    version
)]
pub struct Args {
    /// Set logging level to WARN
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Realign reads on precursors and write annotated GFF
    Annotate(AnnotateArgs),
    /// Merge annotated GFF files into one
    Merge(MergeArgs),
    /// Summarize annotated GFF files per sample
    Stats(StatsArgs),
    /// Export an annotated GFF file as an expression matrix
    Counts(CountsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// PROST tabular output
    Prost,
    /// BAM aligned to precursor hairpins
    Bam,
}

#[derive(ClapArgs, Debug)]
pub struct AnnotateArgs {
    /// Input files, one sample each
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Input format
    #[arg(long, value_enum)]
    pub format: InputFormat,

    /// Precursor hairpin sequences (FASTA)
    #[arg(long, value_name = "FASTA")]
    pub hairpin: PathBuf,

    /// miRBase annotation (GFF3)
    #[arg(long, value_name = "GFF3")]
    pub gtf: PathBuf,

    /// Keep only precursors of this species prefix, e.g. hsa
    #[arg(long)]
    pub sps: Option<String>,

    /// Sample name per input file (defaults to the file stem)
    #[arg(long)]
    pub sample: Vec<String>,

    /// Largest 5'/3' shift still attributed to a mature
    #[arg(long, default_value_t = 4)]
    pub max_offset: usize,

    /// Output directory
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct MergeArgs {
    /// Annotated GFF files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output GFF path
    #[arg(short = 'o', long = "out", value_name = "GFF")]
    pub out: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct StatsArgs {
    /// Annotated GFF files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out: PathBuf,

    /// Number of threads (CPUs) to use
    #[arg(short = 'p', long = "threads", default_value_t = 1)]
    pub threads: u8,
}

#[derive(ClapArgs, Debug)]
pub struct CountsArgs {
    /// Annotated GFF file
    pub gff: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out: PathBuf,
}
