//! aos-preflight: validate the inputs of the AOS ATAC-seq workflow and write
//! the configuration it runs from.
//!
//! # Library usage
//!
//! ```no_run
//! use aos_preflight::annotation::derive_tss;
//! use aos_preflight::fasta::{validate_and_size, EffectiveSizePolicy};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), aos_preflight::PreflightError> {
//! let tss = derive_tss(Path::new("genes.gtf"), "gene", Path::new("out"))?;
//! let genome = validate_and_size(
//!     Path::new("genome.fa"),
//!     &["MT".to_string()],
//!     EffectiveSizePolicy::AllBases,
//! )?;
//! println!("{} -> {}", tss.display(), genome.effective_length);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod cli;
pub mod config;
pub mod design;
pub mod error;
pub mod executor;
pub mod fasta;
pub mod motifs;
pub mod pipeline;
pub mod regions;
pub mod types;

pub(crate) mod reader;

pub use config::{assemble, AssemblyInputs, RunConfiguration};
pub use design::{check_design, DesignCheck, ValidatedDesign};
pub use error::PreflightError;
pub use executor::{ExecutionRequest, PipelineExecutor, SnakemakeExecutor};
pub use fasta::{validate_and_size, EffectiveSizePolicy, GenomeSequenceSummary};
pub use types::{GenomicInterval, Strand, TssRecord};
