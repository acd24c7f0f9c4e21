//! Diplotype Assembler.
//!
//! Turns the solver's tie set of `SolverSolution`s into canonical
//! `Diplotype`s: a selection with zero haplotypes is (reference, reference),
//! one haplotype with one copy pairs with the reference, one haplotype with
//! two copies is homozygous, and two distinct haplotypes pair directly.

use crate::model::{Diplotype, HaplotypeName, SolverSolution};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// Assembles one solver tie set into its deduplicated set of canonical
/// diplotypes, each paired with the union of the `variants_used` of every
/// solver solution that assembled to it. If any assembled diplotype carries
/// a reference slot (`refs > 0`, the biologically conservative reading --
/// the evidence is compatible with the reference on at least one strand),
/// every `refs == 0` alternative is dropped, not merely deprioritised, and
/// its variants are dropped with it -- a variant is only ever reported as
/// used if it helps define a haplotype in a diplotype that survives into
/// the returned tie set.
pub fn assemble(
    solutions: &[SolverSolution],
    reference: &HaplotypeName,
) -> Vec<(Diplotype, Vec<String>)> {
    let assembled: Vec<(Diplotype, u8, &SolverSolution)> = solutions
        .iter()
        .map(|solution| {
            let (diplotype, refs) = assemble_one(solution, reference);
            (diplotype, refs, solution)
        })
        .collect();

    let any_refs = assembled.iter().any(|(_, refs, _)| *refs > 0);

    let mut variants_by_diplotype: BTreeMap<Diplotype, BTreeSet<String>> = BTreeMap::new();
    for (diplotype, refs, solution) in &assembled {
        if any_refs && *refs == 0 {
            continue;
        }
        variants_by_diplotype
            .entry(diplotype.clone())
            .or_default()
            .extend(solution.variants_used.iter().cloned());
    }

    let diplotypes: Vec<(Diplotype, Vec<String>)> = variants_by_diplotype
        .into_iter()
        .map(|(diplotype, variants)| (diplotype, variants.into_iter().collect()))
        .collect();

    if diplotypes.len() > 1 {
        warn!(
            "{} equally likely diplotypes remain after assembly: {}",
            diplotypes.len(),
            diplotypes
                .iter()
                .map(|(d, _)| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    diplotypes
}

/// Returns the assembled diplotype together with `refs`, the number of its
/// two slots filled by the reference allele.
fn assemble_one(solution: &SolverSolution, reference: &HaplotypeName) -> (Diplotype, u8) {
    match solution.haplotypes.as_slice() {
        [] => (Diplotype::new(reference.clone(), reference.clone()), 2),
        [(h, copies)] => {
            if *copies >= 2 {
                (Diplotype::new(h.clone(), h.clone()), 0)
            } else {
                (Diplotype::new(h.clone(), reference.clone()), 1)
            }
        }
        [(h1, _), (h2, _)] => (Diplotype::new(h1.clone(), h2.clone()), 0),
        more => {
            // Only reachable with a non-default `max_haps > 2`: expand by
            // copy number, take the lexicographically first two copies, and
            // warn that the rest don't fit the pair shape.
            let mut expanded: Vec<HaplotypeName> = more
                .iter()
                .flat_map(|(h, copies)| std::iter::repeat(h.clone()).take((*copies).max(1) as usize))
                .collect();
            expanded.sort();
            warn!(
                "solver selected {} haplotype copies under max_haps > 2; truncating to a pair: {}",
                expanded.len(),
                expanded
                    .iter()
                    .map(|h| h.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let first = expanded.remove(0);
            let second = expanded.into_iter().next().unwrap_or_else(|| reference.clone());
            let refs = (first == *reference) as u8 + (second == *reference) as u8;
            (Diplotype::new(first, second), refs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SolverSolution;

    fn reference() -> HaplotypeName {
        HaplotypeName::new("TEST*1")
    }

    fn diplotypes_only(assembled: Vec<(Diplotype, Vec<String>)>) -> Vec<Diplotype> {
        assembled.into_iter().map(|(d, _)| d).collect()
    }

    #[test]
    fn empty_selection_is_reference_homozygous() {
        let solution = SolverSolution::new(vec![], vec![], 0.0);
        let diplotypes = diplotypes_only(assemble(&[solution], &reference()));
        assert_eq!(diplotypes, vec![Diplotype::new(reference(), reference())]);
    }

    #[test]
    fn single_copy_pairs_with_reference() {
        let hap = HaplotypeName::new("TEST*4");
        let solution = SolverSolution::new(vec![(hap.clone(), 1)], vec![], 1.0);
        let diplotypes = diplotypes_only(assemble(&[solution], &reference()));
        assert_eq!(diplotypes, vec![Diplotype::new(hap, reference())]);
    }

    #[test]
    fn two_copies_is_homozygous() {
        let hap = HaplotypeName::new("TEST*4");
        let solution = SolverSolution::new(vec![(hap.clone(), 2)], vec![], 2.0);
        let diplotypes = diplotypes_only(assemble(&[solution], &reference()));
        assert_eq!(diplotypes, vec![Diplotype::new(hap.clone(), hap)]);
    }

    #[test]
    fn two_distinct_haplotypes_pair_directly() {
        let h1 = HaplotypeName::new("TEST*4");
        let h2 = HaplotypeName::new("TEST*10");
        let solution = SolverSolution::new(vec![(h1.clone(), 1), (h2.clone(), 1)], vec![], 2.0);
        let diplotypes = diplotypes_only(assemble(&[solution], &reference()));
        assert_eq!(diplotypes, vec![Diplotype::new(h1, h2)]);
    }

    #[test]
    fn duplicate_solutions_collapse_to_one_diplotype_with_merged_variants() {
        let h1 = HaplotypeName::new("TEST*4");
        let h2 = HaplotypeName::new("TEST*10");
        let a = SolverSolution::new(vec![(h1.clone(), 1), (h2.clone(), 1)], vec!["v1".into()], 2.0);
        let b = SolverSolution::new(vec![(h1.clone(), 1), (h2.clone(), 1)], vec!["v2".into()], 2.0);
        let assembled = assemble(&[a, b], &reference());
        assert_eq!(assembled.len(), 1);
        let (diplotype, variants) = &assembled[0];
        assert_eq!(*diplotype, Diplotype::new(h1, h2));
        assert_eq!(variants, &vec!["v1".to_string(), "v2".to_string()]);
    }

    #[test]
    fn genuinely_ambiguous_tie_set_keeps_every_diplotype() {
        let h1 = HaplotypeName::new("TEST*4");
        let h2 = HaplotypeName::new("TEST*10");
        let a = SolverSolution::new(vec![(h1.clone(), 1)], vec![], 1.0);
        let b = SolverSolution::new(vec![(h2.clone(), 1)], vec![], 1.0);
        let diplotypes = assemble(&[a, b], &reference());
        assert_eq!(diplotypes.len(), 2);
    }

    /// A tied solution pairing with the reference (`refs > 0`) is preferred
    /// over one that doesn't, so the all-distinct-haplotypes solution is
    /// dropped from the tie set, taking its variants with it.
    #[test]
    fn refs_positive_solution_drops_refs_zero_tie() {
        let h1 = HaplotypeName::new("TEST*4");
        let h2 = HaplotypeName::new("TEST*10");
        let with_ref = SolverSolution::new(vec![(h1.clone(), 1)], vec!["v1".into()], 1.0);
        let without_ref = SolverSolution::new(vec![(h1, 1), (h2, 1)], vec!["v2".into()], 1.0);
        let assembled = assemble(&[with_ref, without_ref], &reference());
        assert_eq!(
            assembled,
            vec![(
                Diplotype::new(HaplotypeName::new("TEST*4"), reference()),
                vec!["v1".to_string()]
            )]
        );
    }
}
