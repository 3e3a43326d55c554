use std::path::PathBuf;
use thiserror::Error;

/// Every way a preflight run can reject its inputs.
///
/// All variants are terminal: they describe invalid or inconsistent input,
/// so nothing is retried and no configuration is written.
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("malformed annotation {}:{line}: {reason}", .path.display())]
    MalformedAnnotation {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("no '{feature_type}' features found in {}", .path.display())]
    EmptyResult { path: PathBuf, feature_type: String },

    #[error("malformed sequence file {}: {reason}", .path.display())]
    MalformedSequenceFile { path: PathBuf, reason: String },

    #[error("contig '{contig}' requested for exclusion is not present in {}", .path.display())]
    ContigNotFound { path: PathBuf, contig: String },

    #[error("a sample sheet and a comparison file must be given together (missing {missing})")]
    IncompleteDesign { missing: &'static str },

    #[error("sample '{sample}' appears more than once in {}", .path.display())]
    DuplicateSampleId { path: PathBuf, sample: String },

    #[error("sample '{sample}' does not resolve to exactly one BAM file (found {})", format_candidates(.candidates))]
    UnresolvedSample {
        sample: String,
        candidates: Vec<PathBuf>,
    },

    #[error("comparison '{comparison}' references unknown {}", format_factor_level(.factor, .level))]
    UnknownFactorLevel {
        comparison: String,
        factor: String,
        level: Option<String>,
    },

    #[error("malformed sample sheet {}: {reason}", .path.display())]
    MalformedSampleSheet { path: PathBuf, reason: String },

    #[error("malformed comparison file {}: {reason}", .path.display())]
    MalformedComparison { path: PathBuf, reason: String },

    #[error("malformed BED file {}:{line}: {reason}", .path.display())]
    MalformedRegions {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("malformed MEME motif file {}: {reason}", .path.display())]
    MalformedMotifs { path: PathBuf, reason: String },

    #[error("no BAM files found in {}", .dir.display())]
    NoAlignmentFiles { dir: PathBuf },

    #[error("{what} not found: {}", .path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("failed to serialize configuration: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreflightError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PreflightError::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }
    candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_factor_level(factor: &str, level: &Option<String>) -> String {
    match level {
        Some(level) => format!("level '{level}' of factor '{factor}'"),
        None => format!("factor '{factor}'"),
    }
}

pub type Result<T> = std::result::Result<T, PreflightError>;
