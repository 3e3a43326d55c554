//! Boundary to the workflow engine that does the actual ATAC-seq processing.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// What the workflow engine is told about a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub config: PathBuf,
    pub output_dir: PathBuf,
    /// Engine profile selecting concurrency and cluster settings.
    pub profile: String,
}

/// Runs a persisted configuration. Only success or failure is reported back.
pub trait PipelineExecutor {
    fn execute(&self, request: &ExecutionRequest) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SnakemakeExecutor {
    pub program: String,
    pub snakefile: PathBuf,
}

impl SnakemakeExecutor {
    pub fn new(snakefile: &Path) -> Self {
        Self {
            program: "snakemake".to_string(),
            snakefile: snakefile.to_path_buf(),
        }
    }

    pub fn command(&self, binary: &Path, request: &ExecutionRequest) -> Command {
        let mut cmd = Command::new(binary);
        cmd.arg("-s")
            .arg(&self.snakefile)
            .arg("--profile")
            .arg(&request.profile)
            .arg("--max-jobs-per-second")
            .arg("1")
            .arg("-p")
            .arg("--configfile")
            .arg(&request.config)
            .arg("-d")
            .arg(&request.output_dir);
        cmd
    }
}

impl PipelineExecutor for SnakemakeExecutor {
    fn execute(&self, request: &ExecutionRequest) -> Result<()> {
        let binary = which::which(&self.program)
            .with_context(|| format!("'{}' not found on PATH", self.program))?;
        let mut cmd = self.command(&binary, request);

        tracing::info!(profile = %request.profile, config = %request.config.display(), "running snakemake");
        tracing::debug!("about to spawn: {:?}", cmd);
        let status = cmd
            .status()
            .with_context(|| format!("failed to spawn {}", binary.display()))?;
        if !status.success() {
            bail!("snakemake exited with {status}");
        }
        Ok(())
    }
}
