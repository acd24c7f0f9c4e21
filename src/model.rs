//! Shared data types for translation tables, genotypes, and match results.
//!
//! Rows are a typed struct with named fields rather than dataframe columns,
//! so callers get `row.var_type` instead of positional column indexing.

use derefable::Derefable;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named allele, e.g. `CYP2D6(star)4.001`.
///
/// Star tokens (`*`) are canonicalised to the literal `(star)` on
/// construction so the name is unambiguous in file paths, CSV output, and
/// variant IDs built from string concatenation.
#[derive(Derefable, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HaplotypeName(#[deref] String);

impl HaplotypeName {
    pub fn new(raw: &str) -> Self {
        HaplotypeName(raw.replace('*', "(star)"))
    }

    pub fn reference(tag: &str) -> Self {
        if tag.is_empty() {
            HaplotypeName("REF".to_string())
        } else {
            HaplotypeName::new(tag)
        }
    }

    /// Restores the literal `*` for human-facing output (VCF ALT tokens,
    /// TSV columns) where the `(star)` escaping that keeps names
    /// filesystem/CSV-safe internally isn't needed.
    pub fn star_display(&self) -> String {
        self.0.replace("(star)", "*")
    }
}

impl fmt::Display for HaplotypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One defining variant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    Substitution,
    Insertion,
    Deletion,
    Cnv,
}

impl VarType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "insertion" => VarType::Insertion,
            "deletion" => VarType::Deletion,
            "CNV" => VarType::Cnv,
            _ => VarType::Substitution,
        }
    }
}

/// One defining variant of one named allele, as read from the translation
/// table (or its `.cnv` companion).
#[derive(Debug, Clone, new, Serialize, Deserialize)]
pub struct TranslationTableRow {
    pub haplotype_name: HaplotypeName,
    pub gene: String,
    pub reference_sequence_tag: String,
    pub variant_start: Option<i64>,
    pub variant_stop: Option<i64>,
    pub ref_allele: String,
    pub alt_allele: String,
    pub var_type: VarType,
    pub rs_id: String,
}

impl TranslationTableRow {
    /// `c<chrom>_<start>_<SID|CNV>`.
    pub fn variant_id(&self, chromosome: &str) -> String {
        let suffix = if self.var_type == VarType::Cnv {
            "CNV"
        } else {
            "SID"
        };
        format!(
            "c{}_{}_{}",
            chromosome,
            self.variant_start.unwrap_or_default(),
            suffix
        )
    }

    /// `variant_id` plus ref/alt, unique across alt-alleles at the same position.
    pub fn var_key(&self, chromosome: &str) -> String {
        format!(
            "{}_{}_{}",
            self.variant_id(chromosome),
            self.ref_allele,
            self.alt_allele
        )
    }

    /// The record position the Matcher should look up in the observed
    /// genotypes: `start - 1` for indels (VCF left-anchoring), `start`
    /// otherwise. CNV rows use `start` as well (their suffix already
    /// distinguishes them).
    pub fn lookup_position(&self) -> Option<i64> {
        match self.var_type {
            VarType::Insertion | VarType::Deletion => self.variant_start.map(|p| p - 1),
            _ => self.variant_start,
        }
    }
}

/// One observed variant for one sample at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    /// Unordered pair of allele strings, or a single symbolic allele (e.g.
    /// `<CNV>`) duplicated for CNV records.
    pub alleles: (String, String),
    pub phased: bool,
    pub phase_set: i32,
    pub ref_allele: String,
}

impl Genotype {
    pub fn unphased_phase_set() -> i32 {
        -1
    }
}

/// Count of subject alleles equal to a row's alt allele, or `Missing` when
/// the subject has no record at the looked-up position at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCount {
    Zero,
    One,
    Two,
    Missing,
}

impl MatchCount {
    pub fn from_raw(n: usize) -> Self {
        match n {
            0 => MatchCount::Zero,
            1 => MatchCount::One,
            _ => MatchCount::Two,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, MatchCount::Missing)
    }

    pub fn as_u8(self) -> u8 {
        match self {
            MatchCount::Zero => 0,
            MatchCount::One => 1,
            MatchCount::Two => 2,
            MatchCount::Missing => 0,
        }
    }
}

/// Phased-strand label: `0` unphased/unknown, `±1` single-copy
/// on left/right strand, `3` homozygous alt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Left,
    Right,
    Unphased,
    HomozygousAlt,
}

impl Strand {
    pub fn as_i8(self) -> i8 {
        match self {
            Strand::Left => -1,
            Strand::Right => 1,
            Strand::Unphased => 0,
            Strand::HomozygousAlt => 3,
        }
    }
}

/// A translation-table row after matching, annotated with match count,
/// strand label, and phase set.
#[derive(Debug, Clone)]
pub struct MatchedRow {
    pub row: TranslationTableRow,
    pub match_count: MatchCount,
    pub strand: Strand,
    pub phase_set: i32,
    pub var_key: String,
}

/// One distinct matched variant, carrying the minimum (i.e. most
/// conservative / maximum-usable) match count seen across the rows that
/// reference it.
#[derive(Debug, Clone)]
pub struct MatchedVariant {
    pub var_key: String,
    pub variant_id: String,
    pub var_type: VarType,
    pub match_count: MatchCount,
}

/// Unordered pair of haplotype names making up a sample's call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diplotype {
    pub first: HaplotypeName,
    pub second: HaplotypeName,
}

impl Diplotype {
    /// Builds a diplotype with its two haplotypes in canonical
    /// (lexicographic) order, so `(a, b)` and `(b, a)` always compare equal.
    pub fn new(a: HaplotypeName, b: HaplotypeName) -> Self {
        if a <= b {
            Diplotype {
                first: a,
                second: b,
            }
        } else {
            Diplotype {
                first: b,
                second: a,
            }
        }
    }
}

impl fmt::Display for Diplotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// A single solver solution, converted into haplotype selections but not
/// yet assembled into a canonical diplotype (that's `assemble::assemble`).
#[derive(Debug, Clone, new)]
pub struct SolverSolution {
    /// Selected haplotypes with their chosen copy number (`H_h > 0`).
    pub haplotypes: Vec<(HaplotypeName, u8)>,
    pub variants_used: Vec<String>,
    pub objective: f64,
}

/// Per-sample, per-gene output record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplotypeCall {
    pub sample: String,
    pub gene: String,
    pub chromosome: String,
    /// Tie set: all diplotypes judged equally likely.
    pub diplotypes: Vec<Diplotype>,
    pub variants_used: Vec<String>,
    pub confidence: f64,
}

impl DiplotypeCall {
    pub fn na(sample: &str, gene: &str, chromosome: &str) -> Self {
        DiplotypeCall {
            sample: sample.to_string(),
            gene: gene.to_string(),
            chromosome: chromosome.to_string(),
            diplotypes: Vec::new(),
            variants_used: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_na(&self) -> bool {
        self.diplotypes.is_empty()
    }
}
