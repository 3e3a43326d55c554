use crate::error::{PreflightError, Result};
use crate::reader::open_text;
use std::io::BufRead;
use std::path::Path;

/// Check that `path` looks like a MEME motif file: the first non-blank line
/// declares `MEME version` and at least one `MOTIF` entry follows.
///
/// Returns the number of motifs.
pub fn validate_meme(path: &Path) -> Result<usize> {
    let malformed = |reason: String| PreflightError::MalformedMotifs {
        path: path.to_path_buf(),
        reason,
    };

    let reader = open_text(path)?;
    let mut saw_version = false;
    let mut motifs = 0usize;
    for line in reader.lines() {
        let line = line.map_err(|e| PreflightError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !saw_version {
            if !line.starts_with("MEME version") {
                return Err(malformed(format!("expected a 'MEME version' header, found '{line}'")));
            }
            saw_version = true;
            continue;
        }
        if line.starts_with("MOTIF") {
            if line.split_whitespace().nth(1).is_none() {
                return Err(malformed(format!("motif {} has no identifier", motifs + 1)));
            }
            motifs += 1;
        }
    }

    if !saw_version {
        return Err(malformed("file is empty".to_string()));
    }
    if motifs == 0 {
        return Err(malformed("no MOTIF entries".to_string()));
    }
    Ok(motifs)
}
