//! Output encodings.
//!
//! Two views of the same `DiplotypeCall`: a flat TSV row per sample/gene for
//! spreadsheet consumption, and a VCF-shaped ALT token
//! (`<CYP2D6*4>`/`<CYP2D6*4/CYP2D6*10>`) for pipelines that want the call
//! folded back into variant-call records. Neither replaces the other;
//! `main` writes whichever (or both) the CLI was asked for.

use crate::model::{Diplotype, DiplotypeCall, HaplotypeName};
use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

/// Builds a call record from an assembled tie set, computing confidence as
/// `1 / |tie set|` -- 0.0 for the `NA` (no-variants) case.
pub fn build_call(
    sample: &str,
    gene: &str,
    chromosome: &str,
    diplotypes: Vec<Diplotype>,
    variants_used: Vec<String>,
) -> DiplotypeCall {
    let confidence = if diplotypes.is_empty() {
        0.0
    } else {
        1.0 / diplotypes.len() as f64
    };
    DiplotypeCall {
        sample: sample.to_string(),
        gene: gene.to_string(),
        chromosome: chromosome.to_string(),
        diplotypes,
        variants_used,
        confidence,
    }
}

#[derive(Serialize)]
struct TsvRow {
    sample: String,
    gene: String,
    chromosome: String,
    diplotype: String,
    variants_used: String,
    confidence: f64,
}

/// One row per call, diplotype tie set pipe-separated, e.g.
/// `CYP2D6*4/CYP2D6*1|CYP2D6*10/CYP2D6*1` when ambiguous.
pub fn write_tsv<W: Write>(calls: &[DiplotypeCall], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for call in calls {
        csv_writer.serialize(TsvRow {
            sample: call.sample.clone(),
            gene: call.gene.clone(),
            chromosome: call.chromosome.clone(),
            diplotype: if call.is_na() {
                "NA".to_string()
            } else {
                call.diplotypes
                    .iter()
                    .map(diplotype_to_string)
                    .collect::<Vec<_>>()
                    .join("|")
            },
            variants_used: call.variants_used.join(";"),
            confidence: call.confidence,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn diplotype_to_string(diplotype: &Diplotype) -> String {
    format!(
        "{}/{}",
        diplotype.first.star_display(),
        diplotype.second.star_display()
    )
}

/// Angle-bracketed symbolic ALT token for one haplotype, as a VCF record's
/// `ALT` column would carry a structural variant: `<CYP2D6*4>`.
pub fn star_allele_alt_token(name: &HaplotypeName) -> String {
    format!("<{}>", name.star_display())
}

/// A diplotype as a pair of symbolic ALT tokens, for callers building their
/// own VCF record around the pair (this crate doesn't own VCF header/FORMAT
/// plumbing -- that lives with the variant source).
pub fn diplotype_alt_tokens(diplotype: &Diplotype) -> (String, String) {
    (
        star_allele_alt_token(&diplotype.first),
        star_allele_alt_token(&diplotype.second),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HaplotypeName;

    #[test]
    fn confidence_is_inverse_tie_set_size() {
        let h1 = HaplotypeName::new("TEST*4");
        let h2 = HaplotypeName::new("TEST*10");
        let ref_hap = HaplotypeName::new("TEST*1");
        let call = build_call(
            "sample1",
            "TEST",
            "22",
            vec![Diplotype::new(h1, ref_hap.clone()), Diplotype::new(h2, ref_hap)],
            vec!["v1".to_string()],
        );
        assert_eq!(call.confidence, 0.5);
    }

    #[test]
    fn na_call_has_zero_confidence() {
        let call = build_call("sample1", "TEST", "22", vec![], vec![]);
        assert!(call.is_na());
        assert_eq!(call.confidence, 0.0);
    }

    #[test]
    fn tsv_row_contains_star_escaped_back() {
        let mut buffer = Vec::new();
        let h = HaplotypeName::new("TEST*4");
        let ref_hap = HaplotypeName::new("TEST*1");
        let call = build_call("sample1", "TEST", "22", vec![Diplotype::new(h, ref_hap)], vec![]);
        write_tsv(&[call], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("TEST*1/TEST*4") || text.contains("TEST*4/TEST*1"));
    }

    #[test]
    fn alt_token_is_angle_bracketed() {
        let h = HaplotypeName::new("CYP2D6*4");
        assert_eq!(star_allele_alt_token(&h), "<CYP2D6*4>");
    }

    #[test]
    fn diplotype_alt_tokens_brackets_both_sides() {
        let diplotype = Diplotype::new(HaplotypeName::new("CYP2D6*1"), HaplotypeName::new("CYP2D6*4"));
        assert_eq!(
            diplotype_alt_tokens(&diplotype),
            ("<CYP2D6*1>".to_string(), "<CYP2D6*4>".to_string())
        );
    }
}
