//! Gene Context.
//!
//! Holds the parsed translation table, reference allele name, chromosome
//! tag, and genomic window; exposes a per-sample view. Immutable once
//! built and safe to share by reference across worker threads -- matchers
//! only ever read from it. The accession-to-chromosome lookup and the
//! `.cnv` cross-join both go through the explicit `Config` rather than
//! module-level state.

use crate::config::Config;
use crate::io::translation_table::{cross_join_cnv, TranslationTableSource, REFERENCE_TAG};
use crate::io::variant_source::{GeneVariants, VariantSource};
use crate::model::{Genotype, HaplotypeName, TranslationTableRow};
use anyhow::Result;
use log::{info, warn};
use std::collections::HashMap;

pub struct GeneContext {
    gene: String,
    chromosome: String,
    version: String,
    reference_name: HaplotypeName,
    table: Vec<TranslationTableRow>,
    window: (i64, i64),
}

impl GeneContext {
    /// Loads a translation table (plus optional `.cnv` companion) once per
    /// gene. `Send + Sync` by construction (every field is owned, plain
    /// data), so one `GeneContext` can be shared across sample worker
    /// threads.
    pub fn load(
        table_source: &dyn TranslationTableSource,
        cnv_source: Option<&dyn TranslationTableSource>,
        config: &Config,
    ) -> Result<Self> {
        let parsed = table_source.load()?;
        let mut rows = parsed.rows;

        if let Some(cnv_source) = cnv_source {
            match cnv_source.load() {
                Ok(cnv_parsed) => {
                    let sid_rows = rows.clone();
                    let mut combined = cross_join_cnv(&sid_rows, &cnv_parsed.rows);
                    rows.append(&mut combined);
                }
                Err(e) => {
                    info!("no CNV definition file available, proceeding with SID-only table: {e}");
                }
            }
        }

        let gene = rows
            .last()
            .map(|r| r.gene.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let accession = rows
            .iter()
            .find(|r| r.reference_sequence_tag != REFERENCE_TAG)
            .map(|r| r.reference_sequence_tag.clone());
        let chromosome = match accession {
            Some(accession) => match config.chromosome_accessions.get(&accession) {
                Some(chrom) => chrom.clone(),
                None => {
                    warn!("unknown chromosome accession {accession}, using NA placeholder");
                    "NA".to_string()
                }
            },
            None => "NA".to_string(),
        };

        let reference_name = rows
            .iter()
            .find(|r| r.reference_sequence_tag == REFERENCE_TAG)
            .map(|r| r.haplotype_name.clone())
            .unwrap_or_else(|| HaplotypeName::reference(""));

        let min_start = rows.iter().filter_map(|r| r.variant_start).min().unwrap_or(0);
        let max_stop = rows
            .iter()
            .filter_map(|r| r.variant_stop.or(r.variant_start))
            .max()
            .unwrap_or(0);
        let window = (
            min_start - config.five_prime_offset,
            max_stop + config.three_prime_offset,
        );

        Ok(GeneContext {
            gene,
            chromosome,
            version: parsed.version,
            reference_name,
            table: rows,
            window,
        })
    }

    /// Build directly from parts, for unit tests that don't want to read a
    /// file from disk.
    pub fn from_parts(
        gene: String,
        chromosome: String,
        version: String,
        table: Vec<TranslationTableRow>,
    ) -> Self {
        let min_start = table.iter().filter_map(|r| r.variant_start).min().unwrap_or(0);
        let max_stop = table
            .iter()
            .filter_map(|r| r.variant_stop.or(r.variant_start))
            .max()
            .unwrap_or(0);
        GeneContext {
            gene,
            chromosome,
            version,
            reference_name: HaplotypeName::reference(""),
            table,
            window: (min_start - 1000, max_stop + 1000),
        }
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn reference_name(&self) -> &HaplotypeName {
        &self.reference_name
    }

    pub fn window(&self) -> (i64, i64) {
        self.window
    }

    pub fn translation_table(&self) -> &[TranslationTableRow] {
        &self.table
    }

    /// Queries the variant source over this gene's window once, returning
    /// every sample's records keyed by variant id. Callers slice out a
    /// single sample's view with [`GeneContext::sample_view`].
    pub fn query_variants(&self, source: &mut dyn VariantSource) -> Result<GeneVariants> {
        let (min, max) = self.window;
        source.get_range(&self.chromosome, min, max)
    }

    pub fn sample_view(&self, variants: &GeneVariants, sample: &str) -> HashMap<String, Genotype> {
        variants
            .iter()
            .filter_map(|(key, per_sample)| {
                per_sample.get(sample).map(|g| (key.clone(), g.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::translation_table::FileTranslationTableReader;
    use std::io::Write;

    #[test]
    fn load_resolves_chromosome_and_reference() {
        let mut file = tempfile_table(
            "#version=2024a\n\nCYP2D6*1\tCYP2D6\t.\tREFERENCE\t.\t.\tC\tC\tsubstitution\nCYP2D6*4\tCYP2D6\trs3892097\tNC_000022.11\t42128945\t42128945\tC\tT\tsubstitution\n",
        );
        let reader = FileTranslationTableReader::new(file.path());
        let config = Config::default();
        let ctx = GeneContext::load(&reader, None, &config).unwrap();
        assert_eq!(ctx.chromosome(), "22");
        assert_eq!(ctx.gene(), "CYP2D6");
        assert_eq!(ctx.reference_name().to_string(), "CYP2D6(star)1");
        assert_eq!(ctx.window(), (42128945 - 1000, 42128945 + 1000));
        file.flush().unwrap();
    }

    fn tempfile_table(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn query_variants_slices_into_per_sample_views() {
        use crate::io::variant_source::FakeVariantSource;
        use crate::model::Genotype;

        let file = tempfile_table(
            "#version=2024a\n\nCYP2D6*1\tCYP2D6\t.\tREFERENCE\t.\t.\tC\tC\tsubstitution\nCYP2D6*4\tCYP2D6\trs3892097\tNC_000022.11\t42128945\t42128945\tC\tT\tsubstitution\n",
        );
        let reader = FileTranslationTableReader::new(file.path());
        let config = Config::default();
        let ctx = GeneContext::load(&reader, None, &config).unwrap();

        let mut variants = GeneVariants::new();
        let mut per_sample = HashMap::new();
        per_sample.insert(
            "sampleA".to_string(),
            Genotype {
                alleles: ("C".to_string(), "T".to_string()),
                phased: false,
                phase_set: Genotype::unphased_phase_set(),
                ref_allele: "C".to_string(),
            },
        );
        variants.insert("c22_42128945_SID".to_string(), per_sample);
        let mut source = FakeVariantSource { variants };

        let queried = ctx.query_variants(&mut source).unwrap();
        let view = ctx.sample_view(&queried, "sampleA");
        assert_eq!(view.len(), 1);
        assert_eq!(
            ctx.sample_view(&queried, "sampleB").len(),
            0,
            "a sample absent from the source's records gets an empty view"
        );
    }
}
