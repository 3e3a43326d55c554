use crate::config::{
    Parameters, DEFAULT_DOWNSTREAM_WINDOW, DEFAULT_FRAGMENT_SIZE, DEFAULT_MITO_CONTIG,
    DEFAULT_PSEUDOCOUNT, DEFAULT_UPSTREAM_WINDOW,
};
use crate::error::{PreflightError, Result};
use crate::fasta::EffectiveSizePolicy;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "aos-preflight",
    about = "Validate ATAC-seq inputs, write the workflow configuration and launch snakemake",
    version
)]
pub struct Args {
    /// Directory that contains your BAM files
    #[arg(short = 'i', long = "bamdir", value_name = "DIR")]
    pub bam_dir: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "outputdir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Gene annotation, used to extract TSS
    #[arg(short = 'g', long = "gtf", value_name = "GTF")]
    pub gtf: PathBuf,

    /// Reference genome
    #[arg(short = 'r', long = "genomefasta", value_name = "FASTA")]
    pub genome_fasta: PathBuf,

    /// Name of your snakemake profile
    #[arg(short = 'p', long = "snakemakeprofile", value_name = "PROFILE")]
    pub profile: String,

    /// BED file with read-attracting regions; should contain at least the mitochondrial genome
    #[arg(short = 'b', long = "readattractingregions", value_name = "BED")]
    pub read_attracting_regions: PathBuf,

    /// Motif file in MEME format
    #[arg(short = 'm', long = "motifs", value_name = "MEME")]
    pub motifs: Option<PathBuf>,

    /// Maximum fragment size (bp); 150 captures only nucleosome-free regions
    #[arg(short = 'f', long = "fragsize", default_value_t = DEFAULT_FRAGMENT_SIZE)]
    pub fragment_size: u32,

    /// Sample sheet (tsv)
    #[arg(long = "samplesheet", value_name = "TSV")]
    pub sample_sheet: Option<PathBuf>,

    /// YAML file with comparisons; required if a sample sheet is given
    #[arg(long = "comparison", value_name = "YAML")]
    pub comparison: Option<PathBuf>,

    /// Add interactions in the differential model (~a*b instead of ~a+b)
    #[arg(long)]
    pub interaction: bool,

    /// Name of the mitochondrial contig, excluded from the effective genome size
    #[arg(long = "mitostring", default_value = DEFAULT_MITO_CONTIG)]
    pub mito_contig: String,

    /// Further contigs to exclude from the effective genome size (repeatable)
    #[arg(long = "exclude-contig", value_name = "NAME")]
    pub exclude_contigs: Vec<String>,

    /// Also drop N and IUPAC ambiguity bases from the effective genome size
    #[arg(long = "exclude-ambiguous")]
    pub exclude_ambiguous: bool,

    /// Maximum permitted distance upstream of a feature (peak annotation)
    #[arg(long = "upstreamuro", default_value_t = DEFAULT_UPSTREAM_WINDOW)]
    pub upstream_window: u64,

    /// Maximum permitted distance downstream of a feature (peak annotation)
    #[arg(long = "downstreamuro", default_value_t = DEFAULT_DOWNSTREAM_WINDOW)]
    pub downstream_window: u64,

    /// Feature type in the GTF (column 3) used for TSS extraction and peak annotation
    #[arg(long = "featureuro", default_value = crate::annotation::DEFAULT_FEATURE_TYPE)]
    pub feature_type: String,

    /// Pseudocount added to the count matrix prior to differential calling
    #[arg(long = "pseudocount", default_value_t = DEFAULT_PSEUDOCOUNT)]
    pub pseudocount: u32,

    /// External peak file (BED)
    #[arg(long = "peakset", value_name = "BED")]
    pub peakset: Option<PathBuf>,

    /// Snakefile of the ATAC-seq workflow
    #[arg(long = "snakefile", default_value = "workflow/Snakefile", value_name = "PATH")]
    pub snakefile: PathBuf,

    /// Validate inputs and write the configuration without running snakemake
    #[arg(long = "preflight-only")]
    pub preflight_only: bool,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn sample_sheet(&self) -> Option<&Path> {
        self.sample_sheet.as_deref()
    }

    pub fn comparison(&self) -> Option<&Path> {
        self.comparison.as_deref()
    }

    pub fn motifs(&self) -> Option<&Path> {
        self.motifs.as_deref()
    }

    pub fn peakset(&self) -> Option<&Path> {
        self.peakset.as_deref()
    }

    /// Mitochondrial contig first, then any extra contigs, without repeats.
    pub fn excluded_contigs(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(1 + self.exclude_contigs.len());
        for name in std::iter::once(&self.mito_contig).chain(&self.exclude_contigs) {
            if !name.is_empty() && !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }

    pub fn size_policy(&self) -> EffectiveSizePolicy {
        if self.exclude_ambiguous {
            EffectiveSizePolicy::UnambiguousBases
        } else {
            EffectiveSizePolicy::AllBases
        }
    }

    pub fn parameters(&self) -> Parameters {
        Parameters {
            fragment_size: self.fragment_size,
            pseudocount: self.pseudocount,
            upstream_window: self.upstream_window,
            downstream_window: self.downstream_window,
            feature_type: self.feature_type.clone(),
            mito_contig: self.mito_contig.clone(),
        }
    }

    /// Existence checks for every path argument, before any file is parsed.
    pub fn check(&self) -> Result<()> {
        require_dir("BAM directory", &self.bam_dir)?;
        require_file("annotation", &self.gtf)?;
        require_file("genome FASTA", &self.genome_fasta)?;
        require_file("read-attracting regions", &self.read_attracting_regions)?;
        if let Some(path) = self.motifs() {
            require_file("motif file", path)?;
        }
        if let Some(path) = self.peakset() {
            require_file("peak set", path)?;
        }
        if let Some(path) = self.sample_sheet() {
            require_file("sample sheet", path)?;
        }
        if let Some(path) = self.comparison() {
            require_file("comparison file", path)?;
        }
        if !self.preflight_only {
            require_file("snakefile", &self.snakefile)?;
        }
        Ok(())
    }
}

fn require_file(what: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PreflightError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn require_dir(what: &'static str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PreflightError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}
