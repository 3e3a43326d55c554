//! Structural checks for BED inputs: the read-attracting region list and an
//! optional external peak set.

use crate::error::{PreflightError, Result};
use crate::reader::open_text;
use crate::types::HashSet;
use std::io::BufRead;
use std::path::Path;

const MIN_BED_FIELDS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct BedSummary {
    pub intervals: usize,
    pub contigs: HashSet<String>,
}

/// Check every data line of a BED file: at least three tab-separated fields,
/// a non-empty contig and integer coordinates with `start < end`.
///
/// `track`, `browser` and `#` lines are skipped.
pub fn validate_bed(path: &Path) -> Result<BedSummary> {
    let malformed = |line: usize, reason: String| PreflightError::MalformedRegions {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let reader = open_text(path)?;
    let mut summary = BedSummary::default();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| PreflightError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_BED_FIELDS {
            return Err(malformed(
                line_no,
                format!("expected at least {MIN_BED_FIELDS} tab-separated fields, found {}", fields.len()),
            ));
        }
        let contig = fields[0].trim();
        if contig.is_empty() {
            return Err(malformed(line_no, "empty contig name".to_string()));
        }
        let start: u64 = fields[1]
            .trim()
            .parse()
            .map_err(|_| malformed(line_no, format!("start '{}' is not an integer", fields[1])))?;
        let end: u64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| malformed(line_no, format!("end '{}' is not an integer", fields[2])))?;
        if end <= start {
            return Err(malformed(line_no, format!("end {end} is not after start {start}")));
        }

        summary.intervals += 1;
        if !summary.contigs.contains(contig) {
            summary.contigs.insert(contig.to_string());
        }
    }

    if summary.intervals == 0 {
        return Err(malformed(0, "no intervals found".to_string()));
    }
    Ok(summary)
}
