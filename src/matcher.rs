//! Matcher.
//!
//! Aligns translation-table rows to one sample's observed genotypes,
//! annotates each row with a match count and phase-strand label, then
//! prunes rows with no information and haplotypes that cannot appear.
//! Plain iteration over a `Vec<TranslationTableRow>` with `HashMap`
//! indices rather than a dataframe `.apply()`/boolean-mask pipeline.

use crate::config::Config;
use crate::gene_context::GeneContext;
use crate::model::{Genotype, HaplotypeName, MatchCount, MatchedRow, MatchedVariant, Strand};
use crate::normalise;
use std::collections::{BTreeMap, HashMap};

pub struct MatchResult {
    pub rows: Vec<MatchedRow>,
    pub variants: Vec<MatchedVariant>,
    pub haplotypes: Vec<HaplotypeName>,
}

/// Runs the full match/prune procedure for one sample against one gene's
/// translation table.
///
/// Returns `None` when the sample has zero observed variants in the
/// window at all -- the caller reports the gene as `NA` for that sample.
pub fn match_table(
    gene: &GeneContext,
    sample_view: &HashMap<String, Genotype>,
    config: &Config,
) -> Option<MatchResult> {
    if sample_view.is_empty() {
        return None;
    }

    let mut rows: Vec<MatchedRow> = Vec::new();
    for row in gene.translation_table() {
        let lookup_pos = match row.lookup_position() {
            Some(p) => p,
            None => continue,
        };
        let suffix = if row.var_type == crate::model::VarType::Cnv {
            "CNV"
        } else {
            "SID"
        };
        let key = format!("c{}_{}_{}", gene.chromosome(), lookup_pos, suffix);
        let genotype = match sample_view.get(&key) {
            Some(g) => g,
            None => continue, // MISSING: drop this row, not (necessarily) the haplotype
        };

        let definition = normalise::definition_tokens(row.var_type, &row.alt_allele, config);
        let observed = normalise::observed_tokens(genotype);
        let match_count = normalise::match_count(&definition, &observed);
        if match_count.is_missing() {
            continue;
        }

        let strand = compute_strand(genotype, &definition, &observed, match_count);
        rows.push(MatchedRow {
            var_key: row.var_key(gene.chromosome()),
            row: row.clone(),
            match_count,
            strand,
            phase_set: genotype.phase_set,
        });
    }

    // Drop every haplotype for which any remaining row has match == 0: a
    // haplotype only matches when ALL its defining (non-missing) rows do.
    let mut by_haplotype: BTreeMap<HaplotypeName, Vec<MatchedRow>> = BTreeMap::new();
    for row in rows {
        by_haplotype
            .entry(row.row.haplotype_name.clone())
            .or_default()
            .push(row);
    }
    let pruned_rows: Vec<MatchedRow> = by_haplotype
        .into_iter()
        .filter(|(_, rows)| !rows.iter().any(|r| matches!(r.match_count, MatchCount::Zero)))
        .flat_map(|(_, rows)| rows)
        .collect();

    let haplotypes: Vec<HaplotypeName> = {
        let mut names: Vec<HaplotypeName> = pruned_rows
            .iter()
            .map(|r| r.row.haplotype_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    };

    let mut variants_by_key: BTreeMap<String, MatchedVariant> = BTreeMap::new();
    for row in &pruned_rows {
        variants_by_key
            .entry(row.var_key.clone())
            .and_modify(|existing| {
                if row.match_count.as_u8() < existing.match_count.as_u8() {
                    existing.match_count = row.match_count;
                }
            })
            .or_insert_with(|| MatchedVariant {
                var_key: row.var_key.clone(),
                variant_id: row.row.variant_id(gene.chromosome()),
                var_type: row.row.var_type,
                match_count: row.match_count,
            });
    }
    let variants: Vec<MatchedVariant> = variants_by_key.into_values().collect();

    Some(MatchResult {
        rows: pruned_rows,
        variants,
        haplotypes,
    })
}

/// Determines the phased-strand label for a row that matched with count 1
/// or 2. Homozygous alt (count 2) is always `3`; count 1 is `0` unless the
/// genotype is phased, in which case it is `-1`/`+1` depending on which
/// chromosome copy carries the matching token.
fn compute_strand(
    genotype: &Genotype,
    definition: &[String],
    observed: &(String, String),
    match_count: MatchCount,
) -> Strand {
    match match_count {
        MatchCount::Two => Strand::HomozygousAlt,
        MatchCount::Zero | MatchCount::Missing => Strand::Unphased,
        MatchCount::One => {
            if !genotype.phased {
                return Strand::Unphased;
            }
            if definition.contains(&observed.0) {
                Strand::Left
            } else if definition.contains(&observed.1) {
                Strand::Right
            } else {
                Strand::Unphased
            }
        }
    }
}

/// A haplotype is phase-feasible iff, within every phase-set value
/// appearing among its heterozygous rows (strand ∈ {±1}), all strand
/// labels are identical. A pre-filter rather than a linear constraint,
/// since it's strictly stronger and cheaper to check up front.
pub fn is_phase_compatible(rows: &[&MatchedRow]) -> bool {
    let mut strand_by_phase_set: HashMap<i32, i8> = HashMap::new();
    for row in rows {
        let strand = row.strand.as_i8();
        if strand != -1 && strand != 1 {
            continue;
        }
        match strand_by_phase_set.get(&row.phase_set) {
            Some(existing) if *existing != strand => return false,
            _ => {
                strand_by_phase_set.insert(row.phase_set, strand);
            }
        }
    }
    true
}
