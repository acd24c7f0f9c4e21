//! ILP Builder.
//!
//! Translates a pruned, matched table into a max-variant-use ILP
//! description: haplotype copy-number variables, variant-usage variables,
//! the incidence matrix between them, and the zygosity/CNV/phase
//! constraints. This module only describes the problem; `solver` turns it
//! into a `good_lp` model and solves it (the model is rebuilt on every
//! alternate-optimum iteration, so the description here is kept solver
//! agnostic and cheap to hold onto).

use crate::config::Config;
use crate::matcher::is_phase_compatible;
use crate::model::{HaplotypeName, MatchedRow, MatchedVariant, VarType};
use std::collections::{HashMap, HashSet};

pub struct IlpModel {
    pub haplotypes: Vec<HaplotypeName>,
    pub variants: Vec<MatchedVariant>,
    /// `A[h][v] == true` iff haplotype `h`'s definition contains variant `v`.
    pub incidence: HashMap<(HaplotypeName, String), bool>,
    /// Number of `match > 0` rows per haplotype, the objective's per-haplotype weight.
    pub objective_weight: HashMap<HaplotypeName, i64>,
    pub max_haps: u8,
}

impl IlpModel {
    pub fn incidence_of(&self, haplotype: &HaplotypeName, var_key: &str) -> bool {
        self.incidence
            .get(&(haplotype.clone(), var_key.to_string()))
            .copied()
            .unwrap_or(false)
    }
}

/// Builds the ILP description from a matcher result. Haplotypes that fail
/// the phase-compatibility check are dropped here, before any variable is
/// created, rather than encoded as linear constraints -- a pre-filter is
/// strictly stronger and simpler to reason about.
pub fn build(
    rows: &[MatchedRow],
    candidate_haplotypes: &[HaplotypeName],
    variants: &[MatchedVariant],
    config: &Config,
) -> IlpModel {
    let mut rows_by_haplotype: HashMap<HaplotypeName, Vec<&MatchedRow>> = HashMap::new();
    for row in rows {
        rows_by_haplotype
            .entry(row.row.haplotype_name.clone())
            .or_default()
            .push(row);
    }

    let haplotypes: Vec<HaplotypeName> = candidate_haplotypes
        .iter()
        .filter(|h| {
            if !config.phased {
                return true;
            }
            match rows_by_haplotype.get(*h) {
                Some(rows) => is_phase_compatible(rows),
                None => true,
            }
        })
        .cloned()
        .collect();

    let mut incidence = HashMap::new();
    let mut objective_weight = HashMap::new();
    for haplotype in &haplotypes {
        let hap_rows = rows_by_haplotype.get(haplotype).cloned().unwrap_or_default();
        let matched_var_keys: HashSet<&str> = hap_rows
            .iter()
            .filter(|r| !matches!(r.match_count, crate::model::MatchCount::Zero))
            .map(|r| r.var_key.as_str())
            .collect();
        for var_key in &matched_var_keys {
            incidence.insert((haplotype.clone(), var_key.to_string()), true);
        }
        objective_weight.insert(haplotype.clone(), matched_var_keys.len() as i64);
    }

    IlpModel {
        haplotypes,
        variants: variants.to_vec(),
        incidence,
        objective_weight,
        max_haps: config.max_haps,
    }
}

pub fn is_cnv(variant: &MatchedVariant) -> bool {
    variant.var_type == VarType::Cnv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchCount, Strand, TranslationTableRow, VarType};

    fn row(hap: &str, var_key: &str, match_count: MatchCount, strand: Strand, phase_set: i32) -> MatchedRow {
        MatchedRow {
            row: TranslationTableRow::new(
                HaplotypeName::new(hap),
                "TEST".into(),
                "".into(),
                Some(1),
                Some(1),
                "C".into(),
                "T".into(),
                VarType::Substitution,
                "rs1".into(),
            ),
            match_count,
            strand,
            phase_set,
            var_key: var_key.to_string(),
        }
    }

    #[test]
    fn phase_incompatible_haplotype_excluded() {
        let rows = vec![
            row("H1", "v1", MatchCount::One, Strand::Left, 1),
            row("H1", "v2", MatchCount::One, Strand::Right, 1),
        ];
        let haplotypes = vec![HaplotypeName::new("H1")];
        let variants = vec![];
        let config = Config::default();
        let model = build(&rows, &haplotypes, &variants, &config);
        assert!(model.haplotypes.is_empty());
    }

    #[test]
    fn incidence_and_objective_weight() {
        let rows = vec![
            row("H1", "v1", MatchCount::One, Strand::Unphased, -1),
            row("H1", "v2", MatchCount::One, Strand::Unphased, -1),
        ];
        let haplotypes = vec![HaplotypeName::new("H1")];
        let variants = vec![];
        let config = Config::default();
        let model = build(&rows, &haplotypes, &variants, &config);
        assert!(model.incidence_of(&HaplotypeName::new("H1"), "v1"));
        assert_eq!(model.objective_weight[&HaplotypeName::new("H1")], 2);
    }
}
