//! The run configuration handed to the workflow engine.
//!
//! A `RunConfiguration` can only be built by [`assemble`] from the typed
//! results of the validators, so a failed validator never yields a document.
//! It is immutable and consumed by [`RunConfiguration::persist`].

use crate::design::{DesignCheck, ValidatedDesign};
use crate::error::{PreflightError, Result};
use crate::fasta::{ContigLength, EffectiveSizePolicy, GenomeSequenceSummary};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_FRAGMENT_SIZE: u32 = 150;
pub const DEFAULT_PSEUDOCOUNT: u32 = 8;
pub const DEFAULT_UPSTREAM_WINDOW: u64 = 20_000;
pub const DEFAULT_DOWNSTREAM_WINDOW: u64 = 15_000;
pub const DEFAULT_MITO_CONTIG: &str = "MT";

/// Numeric and naming parameters echoed verbatim to the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameters {
    /// Maximum fragment size in bp; 150 keeps nucleosome-free fragments.
    pub fragment_size: u32,
    pub pseudocount: u32,
    /// Peak annotation: maximum distance upstream of a feature.
    pub upstream_window: u64,
    /// Peak annotation: maximum distance downstream of a feature.
    pub downstream_window: u64,
    pub feature_type: String,
    pub mito_contig: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            fragment_size: DEFAULT_FRAGMENT_SIZE,
            pseudocount: DEFAULT_PSEUDOCOUNT,
            upstream_window: DEFAULT_UPSTREAM_WINDOW,
            downstream_window: DEFAULT_DOWNSTREAM_WINDOW,
            feature_type: crate::annotation::DEFAULT_FEATURE_TYPE.to_string(),
            mito_contig: DEFAULT_MITO_CONTIG.to_string(),
        }
    }
}

/// Absolute paths of the user-supplied inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputPaths {
    pub bam_dir: PathBuf,
    pub gtf: PathBuf,
    pub genome_fasta: PathBuf,
    pub read_attracting_regions: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motifs: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peakset: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_sheet: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<PathBuf>,
}

/// Everything `assemble` needs, each piece produced by its own validator.
#[derive(Debug, Clone)]
pub struct AssemblyInputs {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub alignments: Vec<PathBuf>,
    pub tss_bed: PathBuf,
    pub parameters: Parameters,
    pub genome: GenomeSequenceSummary,
    pub size_policy: EffectiveSizePolicy,
    pub design: DesignCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSection {
    #[serde(flatten)]
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    pub tss_bed: PathBuf,
    pub alignments: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenomeSection {
    /// Effective genome size passed to the peak caller.
    pub effective_size: u64,
    pub total_length: u64,
    pub contig_count: usize,
    pub ambiguous_bases: u64,
    pub size_policy: EffectiveSizePolicy,
    pub excluded_contigs: Vec<ContigLength>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesignSection {
    pub formula: String,
    #[serde(flatten)]
    pub design: ValidatedDesign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    version: String,
    paths: PathSection,
    parameters: Parameters,
    genome: GenomeSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    design: Option<DesignSection>,
}

pub fn assemble(inputs: AssemblyInputs) -> RunConfiguration {
    let AssemblyInputs {
        inputs,
        output_dir,
        alignments,
        tss_bed,
        parameters,
        genome,
        size_policy,
        design,
    } = inputs;

    let design = match design {
        DesignCheck::NoDesign => None,
        DesignCheck::Validated(design) => Some(DesignSection {
            formula: design.formula(),
            design,
        }),
    };

    RunConfiguration {
        version: VERSION.to_string(),
        paths: PathSection {
            inputs,
            output_dir,
            tss_bed,
            alignments,
        },
        parameters,
        genome: GenomeSection {
            effective_size: genome.effective_length,
            total_length: genome.total_length,
            contig_count: genome.contig_count(),
            ambiguous_bases: genome.ambiguous_bases,
            size_policy,
            excluded_contigs: genome.excluded,
        },
        design,
    }
}

impl RunConfiguration {
    pub fn effective_genome_size(&self) -> u64 {
        self.genome.effective_size
    }

    pub fn paths(&self) -> &PathSection {
        &self.paths
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn genome(&self) -> &GenomeSection {
        &self.genome
    }

    pub fn design(&self) -> Option<&DesignSection> {
        self.design.as_ref()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write `config.yaml` into `output_dir`, replacing any previous file.
    ///
    /// The document is written to a sibling temporary file first and renamed
    /// into place, so readers never observe a partial configuration.
    pub fn persist(self, output_dir: &Path) -> Result<PathBuf> {
        let yaml = self.to_yaml()?;
        let target = output_dir.join(CONFIG_FILE);
        let staging = output_dir.join(format!(".{CONFIG_FILE}.tmp"));

        let written = std::fs::File::create(&staging).and_then(|mut file| {
            writeln!(file, "# generated by aos-preflight {VERSION}")?;
            file.write_all(yaml.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(PreflightError::io(&staging, e));
        }
        if let Err(e) = std::fs::rename(&staging, &target) {
            let _ = std::fs::remove_file(&staging);
            return Err(PreflightError::io(&target, e));
        }

        tracing::info!(path = %target.display(), "wrote run configuration");
        Ok(target)
    }
}
