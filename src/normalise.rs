//! Allele Normaliser.
//!
//! Both observed and definition alt alleles are mapped into a small token
//! alphabet before comparison, so a substitution, an insertion, a deletion
//! and an IUPAC-ambiguous definition can all be compared by plain string
//! equality. Returns token sets rather than a single collapsed match
//! integer so the Matcher can also derive the strand label.

use crate::config::Config;
use crate::model::{Genotype, MatchCount, VarType};

const NULL_ALLELE: &str = "-";

/// Null/missing allele strings as they appear in VCF records.
fn is_null_allele(allele: &str) -> bool {
    allele.is_empty() || allele == "." || allele == NULL_ALLELE
}

/// Observed side: given one allele and the reference base at the position,
/// return its token.
pub fn observed_token(alt: &str, reference: &str) -> String {
    if is_null_allele(alt) {
        return NULL_ALLELE.to_string();
    }
    if let Some(symbolic) = alt.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return format!("s{}", symbolic);
    }
    if reference.len() > alt.len() {
        "id-".to_string()
    } else if reference.len() < alt.len() {
        format!("id{}", &alt[1..])
    } else {
        format!("s{}", alt)
    }
}

/// Observed side for both chromosome copies.
pub fn observed_tokens(genotype: &Genotype) -> (String, String) {
    (
        observed_token(&genotype.alleles.0, &genotype.ref_allele),
        observed_token(&genotype.alleles.1, &genotype.ref_allele),
    )
}

/// Definition side: the set of tokens a translation-table row's
/// `(var_type, alt)` expands to. Insertions and deletions collapse to a
/// single token; substitutions expand through the IUPAC code table (with
/// unknown codes passed through literally as a single-base token).
pub fn definition_tokens(var_type: VarType, alt: &str, config: &Config) -> Vec<String> {
    match var_type {
        VarType::Insertion => vec![format!("id{}", alt)],
        VarType::Deletion => vec!["id-".to_string()],
        VarType::Cnv => vec![format!("s{}", alt.trim_start_matches('<').trim_end_matches('>'))],
        VarType::Substitution => {
            if alt.chars().count() == 1 {
                let code = alt.chars().next().unwrap().to_ascii_uppercase();
                if let Some(nucleotides) = config.iupac_codes.get(&code) {
                    return nucleotides.iter().map(|nt| format!("s{}", nt)).collect();
                }
            }
            vec![format!("s{}", alt)]
        }
    }
}

/// Match count of a row's definition tokens against one subject's observed
/// pair. `(-,-)` (both chromosome copies missing) is `Missing`; any other
/// combination sums occurrences of each definition token in the observed
/// pair, bounded by 2 since the pair holds exactly two alleles.
pub fn match_count(definition: &[String], observed: &(String, String)) -> MatchCount {
    if observed.0 == NULL_ALLELE && observed.1 == NULL_ALLELE {
        return MatchCount::Missing;
    }
    let observed_pair = [observed.0.as_str(), observed.1.as_str()];
    let matches: usize = definition
        .iter()
        .map(|token| observed_pair.iter().filter(|o| **o == token).count())
        .sum();
    MatchCount::from_raw(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn substitution_observed_token() {
        assert_eq!(observed_token("T", "C"), "sT");
    }

    #[test]
    fn deletion_observed_token() {
        // ref longer than alt: deletion
        assert_eq!(observed_token("A", "ATG"), "id-");
    }

    #[test]
    fn insertion_observed_token() {
        // alt longer than ref: insertion, keep the inserted suffix
        assert_eq!(observed_token("ATG", "A"), "idTG");
    }

    #[test]
    fn symbolic_observed_token() {
        assert_eq!(observed_token("<CNV>", "A"), "sCNV");
    }

    #[test]
    fn null_allele_token() {
        assert_eq!(observed_token(".", "A"), "-");
    }

    #[test]
    fn iupac_expansion_matches_either_base() {
        let config = config();
        let def = definition_tokens(VarType::Substitution, "R", &config);
        assert_eq!(def, vec!["sA".to_string(), "sG".to_string()]);
        assert_eq!(
            match_count(&def, &("sA".to_string(), "sT".to_string())),
            MatchCount::One
        );
        assert_eq!(
            match_count(&def, &("sA".to_string(), "sG".to_string())),
            MatchCount::Two
        );
        assert_eq!(
            match_count(&def, &("sC".to_string(), "sT".to_string())),
            MatchCount::Zero
        );
    }

    #[test]
    fn unknown_iupac_code_passes_through() {
        let config = config();
        let def = definition_tokens(VarType::Substitution, "Z", &config);
        assert_eq!(def, vec!["sZ".to_string()]);
    }

    #[test]
    fn missing_genotype_is_missing() {
        let def = vec!["sT".to_string()];
        assert_eq!(
            match_count(&def, &("-".to_string(), "-".to_string())),
            MatchCount::Missing
        );
    }

    #[test]
    fn insertion_definition_single_token() {
        let config = config();
        let def = definition_tokens(VarType::Insertion, "ATG", &config);
        assert_eq!(def, vec!["idATG".to_string()]);
    }

    #[test]
    fn deletion_definition_single_token() {
        let config = config();
        let def = definition_tokens(VarType::Deletion, "A", &config);
        assert_eq!(def, vec!["id-".to_string()]);
    }
}
