use crate::error::{PreflightError, Result};
use crate::types::{HashMap, HashMapExt, HashSet};
use needletail::parse_fastx_file;
use needletail::parser::Format;
use serde::Serialize;
use std::path::Path;

/// Nucleotides, IUPAC ambiguity codes and gaps, either case.
const ALLOWED: &[u8] = b"ACGTUNRYSWKMBDHV-acgtunryswkmbdhv";

/// How the effective genome size treats bases inside included contigs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveSizePolicy {
    /// Every base of a non-excluded contig counts.
    #[default]
    AllBases,
    /// N, IUPAC ambiguity codes and gaps are dropped as well.
    UnambiguousBases,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContigLength {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeSequenceSummary {
    /// Contigs in file order.
    pub contigs: Vec<ContigLength>,
    pub total_length: u64,
    pub effective_length: u64,
    /// Ambiguous bases across all contigs, excluded ones included.
    pub ambiguous_bases: u64,
    pub excluded: Vec<ContigLength>,
}

impl GenomeSequenceSummary {
    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }

    pub fn has_contig(&self, name: &str) -> bool {
        self.contigs.iter().any(|c| c.name == name)
    }
}

fn is_unambiguous(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'U')
}

/// Stream the FASTA at `path` once, check its structure and size it.
///
/// Contigs named in `exclude` must exist; they count towards `total_length`
/// but not `effective_length`.
pub fn validate_and_size(
    path: &Path,
    exclude: &[String],
    policy: EffectiveSizePolicy,
) -> Result<GenomeSequenceSummary> {
    let malformed = |reason: String| PreflightError::MalformedSequenceFile {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| PreflightError::io(path, e))?;
    if metadata.len() == 0 {
        return Err(malformed("file is empty".to_string()));
    }

    let mut allowed = [false; 256];
    for &b in ALLOWED {
        allowed[b as usize] = true;
    }
    let exclude: HashSet<&str> = exclude.iter().map(String::as_str).collect();

    let mut reader = parse_fastx_file(path).map_err(|e| malformed(e.to_string()))?;
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut contigs: Vec<ContigLength> = Vec::new();
    let mut excluded: Vec<ContigLength> = Vec::new();
    let mut total_length: u64 = 0;
    let mut effective_length: u64 = 0;
    let mut ambiguous_bases: u64 = 0;

    while let Some(result) = reader.next() {
        let record = result.map_err(|e| malformed(e.to_string()))?;
        let line = record.start_line_number();
        if matches!(record.format(), Format::Fastq) {
            return Err(malformed(format!("record at line {line} is FASTQ, expected FASTA")));
        }

        let header = String::from_utf8_lossy(record.id()).to_string();
        if header.contains('>') {
            return Err(malformed(format!("header at line {line} contains an embedded '>'")));
        }
        let name = header.split_whitespace().next().unwrap_or("").to_string();
        if name.is_empty() {
            return Err(malformed(format!("header at line {line} has no identifier")));
        }
        if let Some(first) = seen.get(&name) {
            return Err(malformed(format!(
                "contig '{name}' at line {line} was already defined at line {first}"
            )));
        }
        seen.insert(name.clone(), line as usize);

        let seq = record.seq();
        let mut unambiguous: u64 = 0;
        for (offset, &base) in seq.iter().enumerate() {
            if !allowed[base as usize] {
                return Err(malformed(format!(
                    "contig '{name}' has disallowed character {:?} at base {}",
                    base as char,
                    offset + 1
                )));
            }
            if is_unambiguous(base) {
                unambiguous += 1;
            }
        }

        let length = seq.len() as u64;
        if length == 0 {
            tracing::warn!(contig = %name, "contig has no sequence");
        }
        total_length += length;
        ambiguous_bases += length - unambiguous;

        let entry = ContigLength { name, length };
        if exclude.contains(entry.name.as_str()) {
            excluded.push(entry.clone());
        } else {
            effective_length += match policy {
                EffectiveSizePolicy::AllBases => length,
                EffectiveSizePolicy::UnambiguousBases => unambiguous,
            };
        }
        contigs.push(entry);
    }

    if contigs.is_empty() {
        return Err(malformed("no sequence records found".to_string()));
    }

    let mut missing: Vec<&str> = exclude
        .iter()
        .copied()
        .filter(|name| !seen.contains_key(*name))
        .collect();
    missing.sort_unstable();
    if let Some(contig) = missing.first() {
        return Err(PreflightError::ContigNotFound {
            path: path.to_path_buf(),
            contig: contig.to_string(),
        });
    }

    tracing::debug!(
        contigs = contigs.len(),
        total_length,
        effective_length,
        ambiguous_bases,
        "sized genome"
    );

    Ok(GenomeSequenceSummary {
        contigs,
        total_length,
        effective_length,
        ambiguous_bases,
        excluded,
    })
}
