use crate::annotation::derive_tss;
use crate::cli::Args;
use crate::config::{assemble, AssemblyInputs, InputPaths};
use crate::design::{check_design, BAM_SUFFIX};
use crate::error::PreflightError;
use crate::executor::{ExecutionRequest, PipelineExecutor};
use crate::fasta::validate_and_size;
use crate::motifs::validate_meme;
use crate::regions::validate_bed;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub config: PathBuf,
    pub tss_bed: PathBuf,
    pub output_dir: PathBuf,
    pub effective_genome_size: u64,
    pub alignments: usize,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn absolute_opt(path: Option<&Path>) -> Result<Option<PathBuf>> {
    path.map(absolute).transpose()
}

/// BAM files directly inside `dir`, sorted by path.
pub fn list_alignments(dir: &Path) -> Result<Vec<PathBuf>, PreflightError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PreflightError::io(dir, e))?;
    let mut bams: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PreflightError::io(dir, e))?.path();
        let is_bam = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(BAM_SUFFIX));
        if is_bam && path.is_file() {
            bams.push(path);
        }
    }
    if bams.is_empty() {
        return Err(PreflightError::NoAlignmentFiles {
            dir: dir.to_path_buf(),
        });
    }
    bams.sort();
    Ok(bams)
}

/// Validate every input, derive the TSS file and persist the configuration.
///
/// Runs each check in turn and stops at the first failure; the configuration
/// is only written once all of them have passed.
pub fn preflight(args: &Args) -> Result<PreflightReport> {
    args.check()?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let output_dir = absolute(&args.output_dir)?;
    let inputs = InputPaths {
        bam_dir: absolute(&args.bam_dir)?,
        gtf: absolute(&args.gtf)?,
        genome_fasta: absolute(&args.genome_fasta)?,
        read_attracting_regions: absolute(&args.read_attracting_regions)?,
        motifs: absolute_opt(args.motifs())?,
        peakset: absolute_opt(args.peakset())?,
        sample_sheet: absolute_opt(args.sample_sheet())?,
        comparison: absolute_opt(args.comparison())?,
    };

    let alignments = list_alignments(&inputs.bam_dir)?;
    tracing::info!(count = alignments.len(), dir = %inputs.bam_dir.display(), "found BAM files");

    tracing::info!("sorting GTF and creating {}", crate::annotation::TSS_BED);
    let tss_bed = derive_tss(&inputs.gtf, &args.feature_type, &output_dir)?;

    let regions = validate_bed(&inputs.read_attracting_regions)?;
    if !regions.contigs.contains(&args.mito_contig) {
        tracing::warn!(
            contig = %args.mito_contig,
            "read-attracting regions do not cover the mitochondrial contig"
        );
    }
    if let Some(peakset) = &inputs.peakset {
        let peaks = validate_bed(peakset)?;
        tracing::info!(peaks = peaks.intervals, "external peak set accepted");
    }
    if let Some(motifs) = &inputs.motifs {
        let count = validate_meme(motifs)?;
        tracing::info!(motifs = count, "motif file accepted");
    }

    tracing::info!("checking comparisons (if present)");
    let design = check_design(
        inputs.sample_sheet.as_deref(),
        inputs.comparison.as_deref(),
        &alignments,
        args.interaction,
    )?;

    tracing::info!("checking FASTA formatting and inferring effective genome size");
    let size_policy = args.size_policy();
    let genome = validate_and_size(&inputs.genome_fasta, &args.excluded_contigs(), size_policy)?;
    tracing::info!(
        effective_genome_size = genome.effective_length,
        total_length = genome.total_length,
        contigs = genome.contig_count(),
        "effective genome size set"
    );
    let unknown = regions.contigs.iter().filter(|c| !genome.has_contig(c)).count();
    if unknown > 0 {
        tracing::warn!(contigs = unknown, "read-attracting regions name contigs absent from the genome");
    }

    let effective_genome_size = genome.effective_length;
    let alignment_count = alignments.len();
    let configuration = assemble(AssemblyInputs {
        inputs,
        output_dir: output_dir.clone(),
        alignments,
        tss_bed: tss_bed.clone(),
        parameters: args.parameters(),
        genome,
        size_policy,
        design,
    });
    let config = configuration.persist(&output_dir)?;

    Ok(PreflightReport {
        config,
        tss_bed,
        output_dir,
        effective_genome_size,
        alignments: alignment_count,
    })
}

/// Run the preflight and, unless `--preflight-only` is set, hand the
/// configuration to `executor`.
pub fn launch(args: &Args, executor: &dyn PipelineExecutor) -> Result<PreflightReport> {
    let report = preflight(args)?;
    if args.preflight_only {
        tracing::info!("preflight only, not running the workflow");
        return Ok(report);
    }

    let request = ExecutionRequest {
        config: report.config.clone(),
        output_dir: report.output_dir.clone(),
        profile: args.profile.clone(),
    };
    executor.execute(&request).context("workflow execution failed")?;
    Ok(report)
}
