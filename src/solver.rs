//! Solver Driver.
//!
//! Turns an `IlpModel` into a `good_lp` problem, solves it with the
//! configured backend, and enumerates alternate optima by adding exclusion
//! cuts and re-solving. `good_lp`'s `UnsolvedProblem`/`Solution` types give
//! no way to mutate a model in place after `.solve()`, so each iteration
//! rebuilds the problem from scratch with the accumulated cuts -- the same
//! outcome as mutating one instance, just expressed functionally.

use crate::config::{Config, SolverKind};
use crate::error::{CallError, SolveStatus};
use crate::ilp::{self, is_cnv, IlpModel};
use crate::model::{HaplotypeName, MatchedRow, MatchedVariant, SolverSolution};
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use log::warn;
use std::collections::HashMap;

/// Runs the full solve-then-enumerate procedure for one sample/gene. Returns
/// the tie set of solutions sharing the best objective value within
/// `config.optimal_decay`; empty when infeasible.
pub fn solve(
    rows: &[MatchedRow],
    haplotypes: &[HaplotypeName],
    variants: &[MatchedVariant],
    config: &Config,
    sample: &str,
    gene: &str,
) -> Vec<SolverSolution> {
    if haplotypes.is_empty() {
        return Vec::new();
    }

    let mut active_config = config.clone();
    let mut model_desc = ilp::build(rows, haplotypes, variants, &active_config);
    let (mut solution, mut status) = solve_once(&model_desc, &active_config, &[]);

    if status == SolveStatus::Infeasible && active_config.phased {
        warn!("ILP infeasible under the phase pre-filter, retrying with phasing disabled");
        active_config.phased = false;
        model_desc = ilp::build(rows, haplotypes, variants, &active_config);
        let retried = solve_once(&model_desc, &active_config, &[]);
        solution = retried.0;
        status = retried.1;
    }

    let first = match (solution, status) {
        (Some(s), SolveStatus::Optimal) => s,
        (_, SolveStatus::Infeasible) => {
            warn!("no feasible diplotype: ILP infeasible even without phasing");
            return Vec::new();
        }
        (_, SolveStatus::Error(reason)) => {
            warn!(
                "{}",
                CallError::SolverAborted {
                    sample: sample.to_string(),
                    gene: gene.to_string(),
                    reason,
                }
            );
            return Vec::new();
        }
        (None, SolveStatus::Optimal) => return Vec::new(),
    };

    let max_opt = first.objective;
    let mut cuts = vec![hap_values(&first)];
    let mut previous = first.clone();
    let mut results = vec![first];

    // Each accepted cut strictly shrinks the feasible region around the
    // haplotype sets already seen, so this terminates well before the
    // number of candidate haplotypes is exhausted.
    let iteration_cap = model_desc.haplotypes.len() + 1;
    for _ in 0..iteration_cap {
        let (next, status) = solve_once(&model_desc, &active_config, &cuts);
        let next = match (next, status) {
            (Some(n), SolveStatus::Optimal) => n,
            _ => break,
        };
        if next.objective < max_opt - active_config.optimal_decay {
            break;
        }
        if next.haplotypes.is_empty() {
            break; // all-reference: stop enumerating.
        }
        if haplotype_sets_equal(&next, &previous) {
            break;
        }
        cuts.push(hap_values(&next));
        previous = next.clone();
        results.push(next);
    }
    results
}

fn hap_values(solution: &SolverSolution) -> HashMap<HaplotypeName, u8> {
    solution.haplotypes.iter().cloned().collect()
}

fn haplotype_sets_equal(a: &SolverSolution, b: &SolverSolution) -> bool {
    let mut a_sorted = a.haplotypes.clone();
    let mut b_sorted = b.haplotypes.clone();
    a_sorted.sort();
    b_sorted.sort();
    a_sorted == b_sorted
}

/// Builds one model (haplotype + variant-usage variables, the zygosity/CNV/
/// phase constraint families, plus whatever exclusion cuts are passed) and
/// solves it once.
fn solve_once(
    model_desc: &IlpModel,
    config: &Config,
    cuts: &[HashMap<HaplotypeName, u8>],
) -> (Option<SolverSolution>, SolveStatus) {
    let mut vars = ProblemVariables::new();
    let mut hap_vars: HashMap<HaplotypeName, Variable> = HashMap::new();
    for h in &model_desc.haplotypes {
        hap_vars.insert(
            h.clone(),
            vars.add(variable().integer().min(0.0).max(model_desc.max_haps as f64)),
        );
    }
    let mut var_vars: HashMap<String, Variable> = HashMap::new();
    for variant in &model_desc.variants {
        var_vars.insert(variant.var_key.clone(), vars.add(variable().binary()));
    }

    let mut objective = Expression::from_other_affine(0.0);
    for h in &model_desc.haplotypes {
        let weight = *model_desc.objective_weight.get(h).unwrap_or(&0);
        objective += scaled(hap_vars[h], weight);
    }

    match config.solver {
        SolverKind::Cbc => {
            let model = vars
                .maximise(objective.clone())
                .using(good_lp::solvers::coin_cbc::coin_cbc);
            let model = apply_constraints(model, model_desc, &hap_vars, &var_vars, cuts);
            finish(model.solve(), &hap_vars, &var_vars, &objective)
        }
        SolverKind::Glpk => {
            let model = vars
                .maximise(objective.clone())
                .using(good_lp::solvers::microlp::microlp);
            let model = apply_constraints(model, model_desc, &hap_vars, &var_vars, cuts);
            finish(model.solve(), &hap_vars, &var_vars, &objective)
        }
    }
}

/// Builds `coefficient * variable` by repeated addition. Every coefficient
/// this module uses is a small non-negative count (a copy number, a match
/// count, or a number of matched rows), so this avoids leaning on a
/// `Variable: Mul<f64>` impl this crate hasn't otherwise exercised.
fn scaled(var: Variable, coefficient: i64) -> Expression {
    let mut expr = Expression::from_other_affine(0.0);
    for _ in 0..coefficient.max(0) {
        expr += var;
    }
    expr
}

fn apply_constraints<M: SolverModel>(
    mut model: M,
    model_desc: &IlpModel,
    hap_vars: &HashMap<HaplotypeName, Variable>,
    var_vars: &HashMap<String, Variable>,
    cuts: &[HashMap<HaplotypeName, u8>],
) -> M {
    // Constraint 1: diploid cap, Σ_h H_h <= K.
    let mut hap_sum = Expression::from_other_affine(0.0);
    for h in &model_desc.haplotypes {
        hap_sum += hap_vars[h];
    }
    model = model.with(constraint!(hap_sum <= model_desc.max_haps as f64));

    for variant in &model_desc.variants {
        let mut incidence_sum = Expression::from_other_affine(0.0);
        for h in &model_desc.haplotypes {
            if model_desc.incidence_of(h, &variant.var_key) {
                incidence_sum += hap_vars[h];
            }
        }
        let v_var = var_vars[&variant.var_key];
        let m_v = variant.match_count.as_u8() as i64;

        if is_cnv(variant) {
            // Constraint 4: CNV markers are mandatory, not merely usable.
            model = model.with(constraint!(incidence_sum.clone() == m_v as f64));
            model = model.with(constraint!(Expression::from_other_affine(v_var) == 1.0));
        } else {
            // Constraint 2: V_v <= Σ_h A[h][v]·H_h (usage needs support).
            model = model.with(constraint!(
                Expression::from_other_affine(v_var) <= incidence_sum.clone()
            ));
            // Constraint 3: Σ_h A[h][v]·H_h <= M_v·V_v (usage can't exceed zygosity).
            model = model.with(constraint!(incidence_sum <= scaled(v_var, m_v)));
        }
    }

    for cut in cuts {
        let mut cut_expr = Expression::from_other_affine(0.0);
        let l = cut.len();
        for (h, value) in cut {
            if let Some(var) = hap_vars.get(h) {
                cut_expr += scaled(*var, *value as i64);
            }
        }
        model = model.with(constraint!(cut_expr <= (l as f64 - 1.0)));
    }

    model
}

fn finish<S: Solution, E: std::fmt::Display>(
    result: Result<S, E>,
    hap_vars: &HashMap<HaplotypeName, Variable>,
    var_vars: &HashMap<String, Variable>,
    objective: &Expression,
) -> (Option<SolverSolution>, SolveStatus) {
    match result {
        Ok(solution) => {
            let mut haplotypes: Vec<(HaplotypeName, u8)> = hap_vars
                .iter()
                .filter_map(|(h, v)| {
                    let rounded = solution.value(*v).round();
                    if rounded >= 1.0 {
                        Some((h.clone(), rounded as u8))
                    } else {
                        None
                    }
                })
                .collect();
            haplotypes.sort();

            let mut variants_used: Vec<String> = var_vars
                .iter()
                .filter(|(_, v)| solution.value(**v) > 0.5)
                .map(|(key, _)| key.clone())
                .collect();
            variants_used.sort();

            let objective_value = solution.eval(objective.clone());
            (
                Some(SolverSolution::new(haplotypes, variants_used, objective_value)),
                SolveStatus::Optimal,
            )
        }
        Err(e) => {
            let message = e.to_string();
            let status = if message.to_lowercase().contains("infeasible") {
                SolveStatus::Infeasible
            } else {
                SolveStatus::Error(message)
            };
            (None, status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchCount, Strand, TranslationTableRow, VarType};

    fn matched_row(hap: &str, var_key: &str, match_count: MatchCount) -> MatchedRow {
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
            strand: Strand::Unphased,
            phase_set: -1,
            var_key: var_key.to_string(),
        }
    }

    fn matched_variant(var_key: &str, var_type: VarType, match_count: MatchCount) -> MatchedVariant {
        MatchedVariant {
            var_key: var_key.to_string(),
            variant_id: var_key.to_string(),
            var_type,
            match_count,
        }
    }

    #[test]
    fn heterozygous_single_haplotype_pairs_with_reference() {
        let rows = vec![matched_row("TEST*4", "v1", MatchCount::One)];
        let haplotypes = vec![HaplotypeName::new("TEST*4")];
        let variants = vec![matched_variant("v1", VarType::Substitution, MatchCount::One)];
        let config = Config::default();
        let solutions = solve(&rows, &haplotypes, &variants, &config, "s1", "TEST");
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].haplotypes, vec![(HaplotypeName::new("TEST*4"), 1)]);
    }

    #[test]
    fn homozygous_variant_selects_two_copies() {
        let rows = vec![matched_row("TEST*4", "v1", MatchCount::Two)];
        let haplotypes = vec![HaplotypeName::new("TEST*4")];
        let variants = vec![matched_variant("v1", VarType::Substitution, MatchCount::Two)];
        let config = Config::default();
        let solutions = solve(&rows, &haplotypes, &variants, &config, "s1", "TEST");
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].haplotypes, vec![(HaplotypeName::new("TEST*4"), 2)]);
    }

    #[test]
    fn no_matched_haplotypes_yields_empty_tie_set() {
        let rows: Vec<MatchedRow> = vec![];
        let haplotypes: Vec<HaplotypeName> = vec![];
        let variants: Vec<MatchedVariant> = vec![];
        let config = Config::default();
        let solutions = solve(&rows, &haplotypes, &variants, &config, "s1", "TEST");
        assert!(solutions.is_empty());
    }

    #[test]
    fn mandatory_cnv_marker_is_satisfied_exactly() {
        let rows = vec![matched_row("TEST*5.CNV2", "cnv1", MatchCount::Two)];
        let haplotypes = vec![HaplotypeName::new("TEST*5.CNV2")];
        let variants = vec![matched_variant("cnv1", VarType::Cnv, MatchCount::Two)];
        let config = Config::default();
        let solutions = solve(&rows, &haplotypes, &variants, &config, "s1", "TEST");
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0]
            .variants_used
            .contains(&"cnv1".to_string()));
    }
}
