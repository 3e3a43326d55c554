//! Sample sheet and comparison design checks.
//!
//! The sample sheet is a tab-separated table with a header row. Its first
//! column holds sample identifiers, every further column is a factor:
//!
//! ```text
//! sample    condition   batch
//! ctrl_1    control     b1
//! treat_1   treated     b1
//! ```
//!
//! The first line is always the header; a leading `#` on it is ignored.
//! Later lines whose first field starts with `#` are comments.
//!
//! Sample `<id>` owns `<id>.bam` when that file exists, otherwise the single
//! `<id>.<x>.bam` in the alignment directory.
//!
//! The comparison file is YAML, mapping a comparison name to the factor
//! levels it contrasts:
//!
//! ```yaml
//! treated_vs_control:
//!   condition: [treated, control]
//! ```

use crate::error::{PreflightError, Result};
use crate::types::{HashMap, HashMapExt, HashSet, HashSetExt};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const BAM_SUFFIX: &str = ".bam";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleSheetEntry {
    pub sample_id: String,
    pub factors: BTreeMap<String, String>,
    /// The one BAM in the alignment directory that belongs to this sample.
    pub alignment: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonSpec {
    pub name: String,
    pub contrasts: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedDesign {
    /// Factor columns in sample sheet order.
    pub factors: Vec<String>,
    pub samples: Vec<SampleSheetEntry>,
    pub comparisons: Vec<ComparisonSpec>,
    pub interaction: bool,
}

impl ValidatedDesign {
    /// Model formula for differential testing: `~a*b` with interactions,
    /// `~a+b` without.
    pub fn formula(&self) -> String {
        let join = if self.interaction { "*" } else { "+" };
        format!("~{}", self.factors.join(join))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignCheck {
    /// Neither a sample sheet nor a comparison file was given.
    NoDesign,
    Validated(ValidatedDesign),
}

/// Validate the sample sheet / comparison pair against the BAM files found
/// in the alignment directory.
///
/// Both files or neither must be given. `interaction` is passed through.
pub fn check_design(
    sample_sheet: Option<&Path>,
    comparison: Option<&Path>,
    bam_listing: &[PathBuf],
    interaction: bool,
) -> Result<DesignCheck> {
    let (sheet_path, comparison_path) = match (sample_sheet, comparison) {
        (None, None) => {
            if interaction {
                tracing::warn!("--interaction has no effect without a sample sheet");
            }
            return Ok(DesignCheck::NoDesign);
        }
        (Some(_), None) => return Err(PreflightError::IncompleteDesign { missing: "comparison file" }),
        (None, Some(_)) => return Err(PreflightError::IncompleteDesign { missing: "sample sheet" }),
        (Some(s), Some(c)) => (s, c),
    };

    let (factors, rows) = parse_sample_sheet(sheet_path)?;

    let mut samples: Vec<SampleSheetEntry> = Vec::with_capacity(rows.len());
    for (sample_id, levels) in rows {
        let alignment = resolve_alignment(&sample_id, bam_listing)?;
        samples.push(SampleSheetEntry {
            sample_id,
            factors: factors.iter().cloned().zip(levels).collect(),
            alignment,
        });
    }

    let claimed: HashSet<&Path> = samples.iter().map(|s| s.alignment.as_path()).collect();
    for bam in bam_listing.iter().filter(|p| !claimed.contains(p.as_path())) {
        tracing::warn!(bam = %bam.display(), "BAM file is not listed in the sample sheet");
    }

    let comparisons = parse_comparisons(comparison_path)?;
    check_factor_levels(&comparisons, &samples)?;

    tracing::info!(
        samples = samples.len(),
        factors = factors.len(),
        comparisons = comparisons.len(),
        interaction,
        "design validated"
    );

    Ok(DesignCheck::Validated(ValidatedDesign {
        factors,
        samples,
        comparisons,
        interaction,
    }))
}

type SheetRows = Vec<(String, Vec<String>)>;

fn parse_sample_sheet(path: &Path) -> Result<(Vec<String>, SheetRows)> {
    let malformed = |reason: String| PreflightError::MalformedSampleSheet {
        path: path.to_path_buf(),
        reason,
    };

    // Comment handling is done here rather than by the csv reader, which would
    // also swallow a `#sample` header line.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| malformed(e.to_string()))?;
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or_else(|| malformed("file is empty".to_string()))?
        .map_err(|e| malformed(e.to_string()))?;
    if header.len() < 2 {
        return Err(malformed(
            "expected a sample column followed by at least one factor column".to_string(),
        ));
    }
    let factors: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    let mut unique: HashSet<&str> = HashSet::new();
    for factor in &factors {
        if factor.is_empty() {
            return Err(malformed("empty factor name in header".to_string()));
        }
        if !unique.insert(factor.as_str()) {
            return Err(malformed(format!("factor '{factor}' appears twice in header")));
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut rows: SheetRows = Vec::new();
    for record in records {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        let row = record.position().map_or(0, |p| p.line());
        let sample_id = record.get(0).unwrap_or("").to_string();
        if sample_id.starts_with('#') {
            continue;
        }
        if sample_id.is_empty() {
            return Err(malformed(format!("row {row} has an empty sample identifier")));
        }
        if record.len() != header.len() {
            return Err(malformed(format!(
                "row {row} has {} fields, header has {}",
                record.len(),
                header.len()
            )));
        }
        let levels: Vec<String> = record.iter().skip(1).map(str::to_string).collect();
        if let Some(pos) = levels.iter().position(String::is_empty) {
            return Err(malformed(format!(
                "sample '{sample_id}' has no level for factor '{}'",
                factors[pos]
            )));
        }
        if !seen.insert(sample_id.clone()) {
            return Err(PreflightError::DuplicateSampleId {
                path: path.to_path_buf(),
                sample: sample_id,
            });
        }
        rows.push((sample_id, levels));
    }

    if rows.is_empty() {
        return Err(malformed("no samples listed".to_string()));
    }
    Ok((factors, rows))
}

/// `<id>.bam` and `<id>.<anything>.bam` both belong to sample `<id>`.
fn belongs_to(sample_id: &str, bam: &Path) -> bool {
    let Some(stem) = bam
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(BAM_SUFFIX))
    else {
        return false;
    };
    stem == sample_id
        || stem
            .strip_prefix(sample_id)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// An exact `<id>.bam` wins; otherwise exactly one `<id>.<x>.bam` must match.
fn resolve_alignment(sample_id: &str, bam_listing: &[PathBuf]) -> Result<PathBuf> {
    let exact = format!("{sample_id}{BAM_SUFFIX}");
    if let Some(bam) = bam_listing
        .iter()
        .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(exact.as_str()))
    {
        return Ok(bam.clone());
    }

    let mut candidates: Vec<PathBuf> = bam_listing
        .iter()
        .filter(|p| belongs_to(sample_id, p))
        .cloned()
        .collect();
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    Err(PreflightError::UnresolvedSample {
        sample: sample_id.to_string(),
        candidates,
    })
}

fn parse_comparisons(path: &Path) -> Result<Vec<ComparisonSpec>> {
    let malformed = |reason: String| PreflightError::MalformedComparison {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| PreflightError::io(path, e))?;
    if content.trim().is_empty() {
        return Err(malformed("file is empty".to_string()));
    }
    let parsed: Value = serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    let Value::Mapping(parsed) = parsed else {
        return Err(malformed("expected a mapping of comparison names".to_string()));
    };
    if parsed.is_empty() {
        return Err(malformed("no comparisons declared".to_string()));
    }

    let mut comparisons = Vec::with_capacity(parsed.len());
    for (name, body) in &parsed {
        let name = scalar(name).ok_or_else(|| malformed("comparison names must be scalars".to_string()))?;
        let Value::Mapping(body) = body else {
            return Err(malformed(format!("comparison '{name}' must map factors to levels")));
        };
        if body.is_empty() {
            return Err(malformed(format!("comparison '{name}' names no factor")));
        }

        let mut contrasts = BTreeMap::new();
        for (factor, levels) in body {
            let factor = scalar(factor)
                .ok_or_else(|| malformed(format!("comparison '{name}' has a non-scalar factor name")))?;
            // a single level may be written without a list
            let levels: Vec<String> = match levels {
                Value::Sequence(items) => items.iter().map(scalar).collect::<Option<_>>(),
                other => scalar(other).map(|l| vec![l]),
            }
            .ok_or_else(|| malformed(format!("comparison '{name}' has non-scalar levels for '{factor}'")))?;
            if levels.is_empty() {
                return Err(malformed(format!(
                    "comparison '{name}' lists no levels for factor '{factor}'"
                )));
            }
            contrasts.insert(factor, levels);
        }
        comparisons.push(ComparisonSpec { name, contrasts });
    }
    Ok(comparisons)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn check_factor_levels(comparisons: &[ComparisonSpec], samples: &[SampleSheetEntry]) -> Result<()> {
    let mut known: HashMap<&str, HashSet<&str>> = HashMap::new();
    for sample in samples {
        for (factor, level) in &sample.factors {
            known
                .entry(factor.as_str())
                .or_default()
                .insert(level.as_str());
        }
    }

    for comparison in comparisons {
        for (factor, levels) in &comparison.contrasts {
            let Some(available) = known.get(factor.as_str()) else {
                return Err(PreflightError::UnknownFactorLevel {
                    comparison: comparison.name.clone(),
                    factor: factor.clone(),
                    level: None,
                });
            };
            if let Some(level) = levels.iter().find(|l| !available.contains(l.as_str())) {
                return Err(PreflightError::UnknownFactorLevel {
                    comparison: comparison.name.clone(),
                    factor: factor.clone(),
                    level: Some(level.clone()),
                });
            }
        }
    }
    Ok(())
}
