//! Entry point: CLI parsing, logging setup, and per-sample/per-gene dispatch.
//! Calling is embarrassingly parallel across samples and genes once a
//! `GeneContext` is built, so the per-gene loop fans out over samples with
//! `rayon`.

use anyhow::{Context, Result};
use log::{error, info, warn};
use pgxcaller::cli::{CallOpt, Command, Opt};
use pgxcaller::config::{Config, ConfigOverlay};
use pgxcaller::error::CallError;
use pgxcaller::gene_context::GeneContext;
use pgxcaller::io::translation_table::FileTranslationTableReader;
use pgxcaller::io::variant_source::BcfVariantSource;
use pgxcaller::model::{Diplotype, DiplotypeCall};
use pgxcaller::{assemble, matcher, output, solver};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// Exit codes.
const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_NO_TRANSLATION_TABLE: i32 = 2;
const EXIT_INPUT_UNOPENABLE: i32 = 3;

fn main() {
    let opt = Opt::from_args();
    setup_logging(opt.verbose);

    let Command::Call(call_opt) = opt.command;
    let code = match run(&call_opt) {
        Ok(()) => EXIT_OK,
        Err(CliError::NoTranslationTable(e)) => {
            error!("{e:#}");
            EXIT_NO_TRANSLATION_TABLE
        }
        Err(CliError::InputUnopenable(e)) => {
            error!("{e:#}");
            EXIT_INPUT_UNOPENABLE
        }
        Err(CliError::Other(e)) => {
            error!("{e:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

/// Every other fatal condition (bad config, unknown `--sample`, I/O failure
/// writing reports) falls back to `Other`/1.
enum CliError {
    NoTranslationTable(anyhow::Error),
    InputUnopenable(anyhow::Error),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> Self {
        CliError::Other(e)
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono_like_timestamp(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .expect("logger can only be initialised once");
}

/// A bare, dependency-free timestamp; this crate has no use for wall-clock
/// precision beyond "which run produced this line in the log file".
fn chrono_like_timestamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

fn run(opt: &CallOpt) -> Result<(), CliError> {
    let config = load_config(opt.config_file.as_deref())?;

    let genes = discover_genes(&opt.translation_tables, &config)
        .map_err(CliError::NoTranslationTable)?;
    if genes.is_empty() {
        return Err(CliError::NoTranslationTable(anyhow::anyhow!(
            "no translation tables found at {}",
            opt.translation_tables.display()
        )));
    }

    let mut variant_source = BcfVariantSource::open(&opt.vcf)
        .with_context(|| format!("opening variant file {}", opt.vcf.display()))
        .map_err(CliError::InputUnopenable)?;

    let samples: Vec<String> = match &opt.sample {
        Some(sample) => {
            if !variant_source.samples().iter().any(|s| s == sample) {
                return Err(CliError::Other(anyhow::anyhow!(
                    "sample {sample} not present in {}",
                    opt.vcf.display()
                )));
            }
            vec![sample.clone()]
        }
        None => variant_source.samples().to_vec(),
    };

    let mut calls_by_sample: std::collections::HashMap<String, Vec<DiplotypeCall>> =
        samples.iter().map(|s| (s.clone(), Vec::new())).collect();

    for gene in &genes {
        let variants = gene
            .query_variants(&mut variant_source)
            .with_context(|| format!("querying variants for gene {}", gene.gene()))?;

        let gene_calls: Vec<(String, DiplotypeCall)> = samples
            .par_iter()
            .map(|sample| {
                let sample_view = gene.sample_view(&variants, sample);
                (sample.clone(), call_one(gene, &sample_view, &config, sample))
            })
            .collect();

        for (sample, call) in gene_calls {
            calls_by_sample.entry(sample).or_default().push(call);
        }
    }

    write_reports(&calls_by_sample, opt.output_directory.as_deref())?;
    Ok(())
}

/// Runs match -> solve -> assemble for one sample against one gene,
/// collapsing every failure mode to a defined `DiplotypeCall` rather than
/// propagating an error.
fn call_one(
    gene: &GeneContext,
    sample_view: &std::collections::HashMap<String, pgxcaller::model::Genotype>,
    config: &Config,
    sample: &str,
) -> DiplotypeCall {
    let result = match matcher::match_table(gene, sample_view, config) {
        Some(r) => r,
        None => {
            info!(
                "{}",
                CallError::NoVariants {
                    sample: sample.to_string(),
                    gene: gene.gene().to_string(),
                }
            );
            return DiplotypeCall::na(sample, gene.gene(), gene.chromosome());
        }
    };

    if result.haplotypes.is_empty() {
        let reference = gene.reference_name().clone();
        return output::build_call(
            sample,
            gene.gene(),
            gene.chromosome(),
            vec![Diplotype::new(reference.clone(), reference)],
            Vec::new(),
        );
    }

    let solutions = solver::solve(
        &result.rows,
        &result.haplotypes,
        &result.variants,
        config,
        sample,
        gene.gene(),
    );
    if solutions.is_empty() {
        warn!(
            "{}",
            CallError::Infeasible {
                sample: sample.to_string(),
                gene: gene.gene().to_string(),
            }
        );
        return DiplotypeCall::na(sample, gene.gene(), gene.chromosome());
    }

    let assembled = assemble::assemble(&solutions, gene.reference_name());
    let variants_used: Vec<String> = assembled
        .iter()
        .flat_map(|(_, variants)| variants.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let diplotypes: Vec<Diplotype> = assembled.into_iter().map(|(d, _)| d).collect();
    output::build_call(sample, gene.gene(), gene.chromosome(), diplotypes, variants_used)
}

fn load_config(config_file: Option<&Path>) -> Result<Config> {
    let base = Config::default();
    match config_file {
        None => Ok(base),
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening config file {}", path.display()))?;
            let overlay: ConfigOverlay = serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("parsing config file {}", path.display()))?;
            Ok(base.with_overlay(overlay))
        }
    }
}

/// Accepts either a single `.tsv` translation table or a directory of them.
/// A same-stem `.cnv` file next to a table is loaded as its CNV companion.
fn discover_genes(translation_tables: &Path, config: &Config) -> Result<Vec<GeneContext>> {
    let table_paths: Vec<PathBuf> = if translation_tables.is_dir() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(translation_tables)
            .with_context(|| format!("reading directory {}", translation_tables.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("tsv"))
            .collect();
        paths.sort();
        paths
    } else {
        vec![translation_tables.to_path_buf()]
    };

    let mut genes = Vec::with_capacity(table_paths.len());
    for table_path in table_paths {
        let table_reader = FileTranslationTableReader::new(&table_path);
        let cnv_path = table_path.with_extension("cnv");
        let cnv_reader = if cnv_path.exists() {
            Some(FileTranslationTableReader::new(&cnv_path))
        } else {
            None
        };
        let cnv_reader_ref = cnv_reader.as_ref().map(|r| r as &dyn pgxcaller::io::translation_table::TranslationTableSource);
        let gene = GeneContext::load(&table_reader, cnv_reader_ref, config)
            .with_context(|| format!("loading translation table {}", table_path.display()))?;
        genes.push(gene);
    }
    Ok(genes)
}

/// Writes one `<sample>.haplotypes.tsv` per sample when an output directory
/// is given; otherwise writes one combined TSV to stdout.
fn write_reports(
    calls_by_sample: &std::collections::HashMap<String, Vec<DiplotypeCall>>,
    output_directory: Option<&Path>,
) -> Result<()> {
    match output_directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
            for (sample, calls) in calls_by_sample {
                let path = dir.join(format!("{sample}.haplotypes.tsv"));
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating report {}", path.display()))?;
                output::write_tsv(calls, file)?;
            }
        }
        None => {
            let mut all: Vec<DiplotypeCall> = calls_by_sample.values().flatten().cloned().collect();
            all.sort_by(|a, b| (a.sample.as_str(), a.gene.as_str()).cmp(&(b.sample.as_str(), b.gene.as_str())));
            output::write_tsv(&all, std::io::stdout())?;
        }
    }
    Ok(())
}
