//! Explicit configuration threaded through `GeneContext` and `Matcher`.
//!
//! A plain value type with no global mutable state -- callers build one
//! `Config`, optionally merge a file-supplied overlay on top, and pass it
//! by reference into every gene/sample call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which MILP backend `good_lp` should dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    /// `good_lp`'s `coin_cbc` backend (the default).
    Cbc,
    /// Backed by `good_lp`'s `microlp` feature, a pure-Rust MILP solver
    /// used in place of an external GLPK binary so the crate invokes no
    /// subprocess and needs no system GLPK install.
    Glpk,
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::Cbc
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Accession -> chromosome tag, e.g. `NC_000022.11` -> `22`.
    pub chromosome_accessions: HashMap<String, String>,
    /// IUPAC ambiguity code -> set of nucleotides.
    pub iupac_codes: HashMap<char, Vec<char>>,
    /// Upstream window padding in bp (`5p_offset`).
    pub five_prime_offset: i64,
    /// Downstream window padding in bp (`3p_offset`).
    pub three_prime_offset: i64,
    /// Sentinel match value used internally when a haplotype has no
    /// observed record at a defining position. Must stay distinct from
    /// 0/1/2/3 (the real match/strand values).
    pub missing_variants: i32,
    /// Diploid cap `K` for the ILP (`max_haps`).
    pub max_haps: u8,
    /// Allowed objective gap for tie enumeration.
    pub optimal_decay: f64,
    pub solver: SolverKind,
    /// Whether to enforce the phase-compatibility pre-filter.
    pub phased: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chromosome_accessions: default_chromosome_accessions(),
            iupac_codes: default_iupac_codes(),
            five_prime_offset: 1000,
            three_prime_offset: 1000,
            missing_variants: 99,
            max_haps: 2,
            optimal_decay: 0.0,
            solver: SolverKind::default(),
            phased: true,
        }
    }
}

impl Config {
    /// Merge a partial override (e.g. parsed from a user-supplied JSON
    /// config file) on top of the defaults. Missing accessions/codes in the
    /// override are added to, not replacing, the defaults, so a config file
    /// only needs to list what it changes.
    pub fn with_overlay(mut self, overlay: ConfigOverlay) -> Self {
        self.chromosome_accessions
            .extend(overlay.chromosome_accessions.into_iter().flatten());
        self.iupac_codes.extend(overlay.iupac_codes.into_iter().flatten());
        if let Some(v) = overlay.five_prime_offset {
            self.five_prime_offset = v;
        }
        if let Some(v) = overlay.three_prime_offset {
            self.three_prime_offset = v;
        }
        if let Some(v) = overlay.missing_variants {
            self.missing_variants = v;
        }
        if let Some(v) = overlay.max_haps {
            self.max_haps = v;
        }
        if let Some(v) = overlay.optimal_decay {
            self.optimal_decay = v;
        }
        if let Some(v) = overlay.solver {
            self.solver = v;
        }
        if let Some(v) = overlay.phased {
            self.phased = v;
        }
        self
    }
}

/// Deserializable partial configuration, as read from a user-supplied file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverlay {
    pub chromosome_accessions: Option<HashMap<String, String>>,
    pub iupac_codes: Option<HashMap<char, Vec<char>>>,
    pub five_prime_offset: Option<i64>,
    pub three_prime_offset: Option<i64>,
    pub missing_variants: Option<i32>,
    pub max_haps: Option<u8>,
    pub optimal_decay: Option<f64>,
    pub solver: Option<SolverKind>,
    pub phased: Option<bool>,
}

/// GRCh38 accessions, overlaid with a GRCh37 alternative.
fn default_chromosome_accessions() -> HashMap<String, String> {
    let grch38 = [
        ("NC_000001.11", "1"),
        ("NC_000002.12", "2"),
        ("NC_000003.12", "3"),
        ("NC_000004.12", "4"),
        ("NC_000005.10", "5"),
        ("NC_000006.12", "6"),
        ("NC_000007.14", "7"),
        ("NC_000008.11", "8"),
        ("NC_000009.12", "9"),
        ("NC_000010.11", "10"),
        ("NC_000011.10", "11"),
        ("NC_000012.12", "12"),
        ("NC_000013.11", "13"),
        ("NC_000014.9", "14"),
        ("NC_000015.10", "15"),
        ("NC_000016.10", "16"),
        ("NC_000017.11", "17"),
        ("NC_000018.10", "18"),
        ("NC_000019.10", "19"),
        ("NC_000020.11", "20"),
        ("NC_000021.9", "21"),
        ("NC_000022.11", "22"),
        ("NC_000023.11", "X"),
        ("NC_000024.10", "Y"),
    ];
    let grch37 = [
        ("NC_000001.10", "1"),
        ("NC_000002.11", "2"),
        ("NC_000003.11", "3"),
        ("NC_000004.11", "4"),
        ("NC_000005.9", "5"),
        ("NC_000006.11", "6"),
        ("NC_000007.13", "7"),
        ("NC_000008.10", "8"),
        ("NC_000009.11", "9"),
        ("NC_000010.10", "10"),
        ("NC_000011.9", "11"),
        ("NC_000012.11", "12"),
        ("NC_000013.10", "13"),
        ("NC_000014.8", "14"),
        ("NC_000015.9", "15"),
        ("NC_000016.9", "16"),
        ("NC_000017.10", "17"),
        ("NC_000018.9", "18"),
        ("NC_000019.9", "19"),
        ("NC_000020.10", "20"),
        ("NC_000021.8", "21"),
        ("NC_000022.10", "22"),
        ("NC_000023.10", "X"),
        ("NC_000024.9", "Y"),
    ];
    grch38
        .iter()
        .chain(grch37.iter())
        .map(|(accession, chrom)| (accession.to_string(), chrom.to_string()))
        .collect()
}

fn default_iupac_codes() -> HashMap<char, Vec<char>> {
    [
        ('R', vec!['A', 'G']),
        ('Y', vec!['C', 'T']),
        ('S', vec!['G', 'C']),
        ('W', vec!['A', 'T']),
        ('K', vec!['G', 'T']),
        ('M', vec!['A', 'C']),
        ('N', vec!['A', 'C', 'G', 'T']),
        ('A', vec!['A']),
        ('C', vec!['C']),
        ('G', vec!['G']),
        ('T', vec!['T']),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.five_prime_offset, 1000);
        assert_eq!(config.three_prime_offset, 1000);
        assert_eq!(config.missing_variants, 99);
        assert_eq!(config.max_haps, 2);
        assert_eq!(config.optimal_decay, 0.0);
        assert_eq!(config.solver, SolverKind::Cbc);
        assert!(config.chromosome_accessions.contains_key("NC_000022.11"));
        assert_eq!(config.iupac_codes.get(&'R'), Some(&vec!['A', 'G']));
    }

    #[test]
    fn overlay_extends_rather_than_replaces() {
        let mut extra = HashMap::new();
        extra.insert("NC_TEST.1".to_string(), "99".to_string());
        let overlay = ConfigOverlay {
            chromosome_accessions: Some(extra),
            max_haps: Some(3),
            ..Default::default()
        };
        let config = Config::default().with_overlay(overlay);
        assert_eq!(config.max_haps, 3);
        assert!(config.chromosome_accessions.contains_key("NC_000001.11"));
        assert_eq!(
            config.chromosome_accessions.get("NC_TEST.1"),
            Some(&"99".to_string())
        );
    }
}
