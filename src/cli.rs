//! Command-line surface: variant file, one translation table or a directory
//! of them, optional `.cnv` companions, output directory, single-sample
//! filter, verbosity.

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "pgxcaller",
    about = "Calls named haplotypes (star-alleles) for pharmacogenes from per-sample variant calls"
)]
pub struct Opt {
    #[structopt(subcommand)]
    pub command: Command,

    /// Use more verbose (info-level) logging output.
    #[structopt(short, long)]
    pub verbose: bool,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Call diplotypes for every gene/translation table against a variant file.
    Call(CallOpt),
}

#[derive(Debug, StructOpt)]
pub struct CallOpt {
    /// Path to an indexed VCF/BCF file.
    #[structopt(short = "f", long = "vcf")]
    pub vcf: PathBuf,

    /// A single translation table file, or a directory containing one `.tsv`
    /// per gene.
    #[structopt(short = "t", long = "translation-tables")]
    pub translation_tables: PathBuf,

    /// Directory to write `<sample>.haplotypes.tsv` reports to. Calls go to
    /// stdout when omitted.
    #[structopt(short = "o", long = "output-directory")]
    pub output_directory: Option<PathBuf>,

    /// Path to a JSON configuration overlay.
    #[structopt(short = "c", long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// Restrict calling to a single sample (default: every sample in the file).
    #[structopt(short = "s", long = "sample")]
    pub sample: Option<String>,
}
