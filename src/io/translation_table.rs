//! External translation-table interface.
//!
//! The translation-table reader is an external collaborator whose only
//! contract is supplying typed rows; this module defines the typed row it
//! supplies and one concrete tab-separated reader, using named-field
//! parsing rather than positional column access.
//!
//! File shape: one `#version=<tag>` line, one blank/comment line, then
//! tab-separated rows of: haplotype name, gene, rsID, reference-sequence
//! tag (an `NC_*` accession, or the literal `REFERENCE` for the row(s)
//! defining the gene's reference allele), variant start, variant stop,
//! reference allele, variant allele, type. Missing numeric fields are `.`.

use crate::model::{HaplotypeName, TranslationTableRow, VarType};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::Path;

pub const REFERENCE_TAG: &str = "REFERENCE";

pub struct ParsedTable {
    pub version: String,
    pub rows: Vec<TranslationTableRow>,
}

pub trait TranslationTableSource {
    fn load(&self) -> Result<ParsedTable>;
}

pub struct FileTranslationTableReader {
    pub path: std::path::PathBuf,
}

impl FileTranslationTableReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileTranslationTableReader {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TranslationTableSource for FileTranslationTableReader {
    fn load(&self) -> Result<ParsedTable> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("opening translation table {}", self.path.display()))?;
        parse_reader(std::io::BufReader::new(file))
    }
}

fn parse_reader<R: BufRead>(reader: R) -> Result<ParsedTable> {
    let mut lines = reader.lines();
    let version_line = lines
        .next()
        .context("translation table is empty")??;
    let version = version_line
        .trim_start_matches('#')
        .trim_start_matches("version=")
        .trim()
        .to_string();

    // one blank or comment line separates the version header from data.
    lines.next();

    let mut rows = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        if let Some(row) = parse_row(&line) {
            rows.push(row);
        }
    }
    Ok(ParsedTable { version, rows })
}

fn parse_row(line: &str) -> Option<TranslationTableRow> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < 9 {
        return None;
    }
    let reference_sequence_tag = fields[3].to_string();
    if reference_sequence_tag.is_empty() {
        // a row with no reference-sequence tag carries no data to match on.
        return None;
    }
    let parse_pos = |s: &str| -> Option<i64> {
        if s == "." || s.is_empty() {
            None
        } else {
            s.parse().ok()
        }
    };
    Some(TranslationTableRow::new(
        HaplotypeName::new(fields[0]),
        fields[1].to_string(),
        reference_sequence_tag,
        parse_pos(fields[4]),
        parse_pos(fields[5]),
        fields[6].to_string(),
        fields[7].to_string(),
        VarType::from_tag(fields[8]),
        fields[2].to_string(),
    ))
}

/// Cross-joins a `.cnv` companion table against same-base SID haplotypes:
/// for every SID haplotype `<base>` and CNV haplotype `<cnv_suffix>`
/// sharing a gene, produces a combined haplotype `<base>.<cnv_suffix>`
/// whose defining rows are the union of both.
pub fn cross_join_cnv(
    sid_rows: &[TranslationTableRow],
    cnv_rows: &[TranslationTableRow],
) -> Vec<TranslationTableRow> {
    use std::collections::BTreeSet;

    let mut sid_bases: BTreeSet<String> = BTreeSet::new();
    for row in sid_rows {
        sid_bases.insert(row.haplotype_name.to_string());
    }

    let mut cnv_by_name: std::collections::BTreeMap<String, Vec<&TranslationTableRow>> =
        Default::default();
    for row in cnv_rows {
        cnv_by_name
            .entry(row.haplotype_name.to_string())
            .or_default()
            .push(row);
    }

    let mut combined = Vec::new();
    for base in &sid_bases {
        for (cnv_suffix, cnv_defining_rows) in &cnv_by_name {
            let combined_name = HaplotypeName::new(&format!("{}.{}", base, cnv_suffix));
            for sid_row in sid_rows.iter().filter(|r| &r.haplotype_name.to_string() == base) {
                let mut row = sid_row.clone();
                row.haplotype_name = combined_name.clone();
                combined.push(row);
            }
            for cnv_row in cnv_defining_rows {
                let mut row = (*cnv_row).clone();
                row.haplotype_name = combined_name.clone();
                combined.push(row);
            }
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "#version=2024a\n# comment line\nCYP2D6*1\tCYP2D6\t.\tREFERENCE\t.\t.\tC\tC\tsubstitution\nCYP2D6*4\tCYP2D6\trs3892097\tNC_000022.11\t42128945\t42128945\tC\tT\tsubstitution\n";

    #[test]
    fn parses_version_and_rows() {
        let parsed = parse_reader(std::io::Cursor::new(TABLE)).unwrap();
        assert_eq!(parsed.version, "2024a");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].reference_sequence_tag, REFERENCE_TAG);
        assert_eq!(parsed.rows[1].variant_start, Some(42128945));
        assert_eq!(parsed.rows[1].var_type, VarType::Substitution);
    }

    #[test]
    fn drops_rows_with_empty_reference_tag() {
        let table = "#version=x\n\nBAD\tGENE\t.\t\t.\t.\tA\tA\tsubstitution\n";
        let parsed = parse_reader(std::io::Cursor::new(table)).unwrap();
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn star_token_escaped() {
        let parsed = parse_reader(std::io::Cursor::new(TABLE)).unwrap();
        assert_eq!(parsed.rows[1].haplotype_name.to_string(), "CYP2D6(star)4");
    }
}
