//! External variant-source interface.
//!
//! The variant-file reader is an external collaborator; this module defines
//! the trait boundary plus one concrete, testable implementation over
//! `rust-htslib::bcf::Reader`, and an in-memory fake used by tests.

use crate::model::Genotype;
use anyhow::Result;
use rust_htslib::bcf::{self, Read};
use std::collections::HashMap;

/// `c<chrom>_<pos>_<SID|CNV>` -> sample id -> genotype.
pub type GeneVariants = HashMap<String, HashMap<String, Genotype>>;

/// Position-scoped, deterministic variant lookups. A single call covers one
/// gene window and is shared across every sample in the file.
pub trait VariantSource {
    fn get_range(&mut self, chrom: &str, min: i64, max: i64) -> Result<GeneVariants>;
}

/// `rust-htslib::bcf::Reader`-backed implementation. Accepts both
/// `chr`-prefixed and bare chromosome names by retrying the fetch under the
/// other convention.
pub struct BcfVariantSource {
    reader: bcf::IndexedReader,
    samples: Vec<String>,
}

impl BcfVariantSource {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let reader = bcf::IndexedReader::from_path(path)?;
        let samples = reader
            .header()
            .samples()
            .iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect();
        Ok(BcfVariantSource { reader, samples })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    fn fetch_tid(&mut self, chrom: &str) -> Result<u32> {
        if let Ok(tid) = self.reader.header().name2rid(chrom.as_bytes()) {
            return Ok(tid);
        }
        let alt = if let Some(stripped) = chrom.strip_prefix("chr") {
            stripped.to_string()
        } else {
            format!("chr{}", chrom)
        };
        Ok(self.reader.header().name2rid(alt.as_bytes())?)
    }
}

impl VariantSource for BcfVariantSource {
    fn get_range(&mut self, chrom: &str, min: i64, max: i64) -> Result<GeneVariants> {
        let tid = self.fetch_tid(chrom)?;
        let start = min.max(0) as u64;
        let stop = max.max(0) as u64;
        self.reader.fetch(tid, start, Some(stop))?;

        let mut out: GeneVariants = HashMap::new();
        let samples = self.samples.clone();
        for record_result in self.reader.records() {
            let mut record = record_result?;
            record.unpack();
            let pos = record.pos() + 1; // htslib positions are 0-based
            let var_type = if record.info(b"SVTYPE").integer().is_ok()
                || record.info(b"SVTYPE").string().map(|v| v.is_some()).unwrap_or(false)
            {
                "CNV"
            } else {
                "SID"
            };
            let chrom_tag = chrom.trim_start_matches("chr");
            let key = format!("c{}_{}_{}", chrom_tag, pos, var_type);

            let ref_allele = String::from_utf8_lossy(record.alleles()[0]).to_string();
            let gts = record.genotypes()?;
            let mut per_sample = HashMap::new();
            for (index, sample) in samples.iter().enumerate() {
                let gt = gts.get(index);
                let mut alleles = Vec::new();
                let mut phased = false;
                for (i, gta) in gt.iter().enumerate() {
                    use bcf::record::GenotypeAllele::*;
                    let (allele_index, is_phased) = match gta {
                        Unphased(a) => (*a, false),
                        Phased(a) => (*a, true),
                        UnphasedMissing => (-1, false),
                        PhasedMissing => (-1, true),
                    };
                    if i > 0 {
                        phased = phased || is_phased;
                    }
                    let allele_str = if allele_index < 0 {
                        ".".to_string()
                    } else {
                        String::from_utf8_lossy(record.alleles()[allele_index as usize]).to_string()
                    };
                    alleles.push(allele_str);
                }
                while alleles.len() < 2 {
                    alleles.push(alleles.first().cloned().unwrap_or_else(|| ".".to_string()));
                }
                let phase_set = record
                    .format(b"PS")
                    .integer()
                    .ok()
                    .and_then(|v| v.get(index).and_then(|row| row.first().copied()))
                    .unwrap_or(-1);
                per_sample.insert(
                    sample.clone(),
                    Genotype {
                        alleles: (alleles[0].clone(), alleles[1].clone()),
                        phased,
                        phase_set,
                        ref_allele: ref_allele.clone(),
                    },
                );
            }
            out.insert(key, per_sample);
        }
        Ok(out)
    }
}

/// In-memory fake for unit/integration tests.
#[derive(Default, Clone)]
pub struct FakeVariantSource {
    pub variants: GeneVariants,
}

impl VariantSource for FakeVariantSource {
    fn get_range(&mut self, _chrom: &str, _min: i64, _max: i64) -> Result<GeneVariants> {
        Ok(self.variants.clone())
    }
}
