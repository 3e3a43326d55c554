/// End-to-end tests: build a small but complete input set on disk, run the
/// preflight through the library and through the binary, and inspect the
/// emitted TSS file and configuration document.
use aos_preflight::cli::Args;
use aos_preflight::config::CONFIG_FILE;
use aos_preflight::pipeline::{launch, preflight};
use aos_preflight::{ExecutionRequest, PipelineExecutor, PreflightError};
use clap::Parser;
use serde_yaml::Value;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

const GTF: &str = "\
chr1\ttest\tgene\t12\t15\t.\t+\t.\tgene_id \"g3\";
chr1\ttest\tgene\t5\t10\t.\t+\t.\tgene_id \"g1\";
chr1\ttest\texon\t5\t7\t.\t+\t.\tgene_id \"g1\"; transcript_id \"t1\";
chr1\ttest\tgene\t2\t8\t.\t-\t.\tgene_id \"g2\";
";

// chr1 is 20 bp, MT is 8 bp
const FASTA: &str = ">chr1 test chromosome\nACGTACGTAC\nACGTACGTAC\n>MT\nACGTACGT\n";

struct Inputs {
    root: tempfile::TempDir,
}

impl Inputs {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bams = root.path().join("bams");
        std::fs::create_dir(&bams).unwrap();
        for name in ["ctrl_1.bam", "treat_1.bam"] {
            std::fs::write(bams.join(name), b"").unwrap();
        }
        let inputs = Self { root };
        inputs.write("genes.gtf", GTF);
        inputs.write("genome.fa", FASTA);
        inputs.write("regions.bed", "MT\t0\t8\n");
        inputs.write("Snakefile", "rule all:\n    input: []\n");
        inputs
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn argv(&self, extra: &[&str]) -> Vec<String> {
        let mut argv: Vec<String> = vec!["aos-preflight".to_string()];
        let pairs = [
            ("-i", self.path("bams")),
            ("-o", self.path("out")),
            ("-g", self.path("genes.gtf")),
            ("-r", self.path("genome.fa")),
            ("-b", self.path("regions.bed")),
            ("--snakefile", self.path("Snakefile")),
        ];
        for (flag, path) in pairs {
            argv.push(flag.to_string());
            argv.push(path.display().to_string());
        }
        argv.extend(["-p".to_string(), "local".to_string()]);
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv
    }

    fn args(&self, extra: &[&str]) -> Args {
        Args::parse_from(self.argv(extra))
    }

    fn config(&self) -> Value {
        let text = std::fs::read_to_string(self.path("out").join(CONFIG_FILE)).unwrap();
        serde_yaml::from_str(&text).unwrap()
    }
}

#[derive(Default)]
struct RecordingExecutor {
    calls: RefCell<Vec<ExecutionRequest>>,
}

impl PipelineExecutor for RecordingExecutor {
    fn execute(&self, request: &ExecutionRequest) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(request.clone());
        Ok(())
    }
}

fn preflight_error(err: &anyhow::Error) -> &PreflightError {
    err.downcast_ref::<PreflightError>()
        .unwrap_or_else(|| panic!("expected a PreflightError, got {err:#}"))
}

// ── tests ────────────────────────────────────────────────────────────────────

#[test]
fn three_genes_two_contigs_end_to_end() {
    let inputs = Inputs::new();
    let report = preflight(&inputs.args(&["--preflight-only"])).unwrap();

    assert_eq!(report.effective_genome_size, 20);
    assert_eq!(report.alignments, 2);

    let tss = std::fs::read_to_string(&report.tss_bed).unwrap();
    assert_eq!(
        tss,
        "chr1\t4\t5\tg1\t0\t+\nchr1\t7\t8\tg2\t0\t-\nchr1\t11\t12\tg3\t0\t+\n"
    );

    let config = inputs.config();
    assert_eq!(config["genome"]["effective_size"].as_u64(), Some(20));
    assert_eq!(config["genome"]["total_length"].as_u64(), Some(28));
    assert_eq!(config["genome"]["excluded_contigs"][0]["name"].as_str(), Some("MT"));
    assert_eq!(
        config["paths"]["tss_bed"].as_str(),
        Some(report.tss_bed.to_str().unwrap())
    );
    assert_eq!(config["parameters"]["fragment_size"].as_u64(), Some(150));
    assert_eq!(config["parameters"]["pseudocount"].as_u64(), Some(8));
    assert_eq!(config["parameters"]["upstream_window"].as_u64(), Some(20000));
    assert_eq!(config["parameters"]["downstream_window"].as_u64(), Some(15000));
    assert_eq!(config["parameters"]["feature_type"].as_str(), Some("gene"));
    assert!(config.get("design").is_none());
    assert!(Path::new(config["paths"]["gtf"].as_str().unwrap()).is_absolute());
}

#[test]
fn design_is_embedded_in_the_configuration() {
    let inputs = Inputs::new();
    let sheet = inputs.write("samples.tsv", "sample\tcondition\nctrl_1\tcontrol\ntreat_1\ttreated\n");
    let comparison = inputs.write("comparison.yaml", "treated_vs_control:\n  condition: [treated, control]\n");

    let args = inputs.args(&[
        "--preflight-only",
        "--samplesheet",
        sheet.to_str().unwrap(),
        "--comparison",
        comparison.to_str().unwrap(),
    ]);
    preflight(&args).unwrap();

    let config = inputs.config();
    assert_eq!(config["design"]["formula"].as_str(), Some("~condition"));
    assert_eq!(config["design"]["interaction"].as_bool(), Some(false));
    assert_eq!(config["design"]["samples"].as_sequence().map(Vec::len), Some(2));
    assert_eq!(
        config["design"]["comparisons"][0]["name"].as_str(),
        Some("treated_vs_control")
    );
}

#[test]
fn launch_hands_the_configuration_to_the_executor() {
    let inputs = Inputs::new();
    let executor = RecordingExecutor::default();
    let report = launch(&inputs.args(&[]), &executor).unwrap();

    let calls = executor.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].config, report.config);
    assert_eq!(calls[0].output_dir, report.output_dir);
    assert_eq!(calls[0].profile, "local");
}

#[test]
fn preflight_only_skips_the_executor() {
    let inputs = Inputs::new();
    let executor = RecordingExecutor::default();
    launch(&inputs.args(&["--preflight-only"]), &executor).unwrap();
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn invalid_genome_writes_nothing_and_runs_nothing() {
    let inputs = Inputs::new();
    inputs.write("genome.fa", ">chr1\nACGT*ACGT\n>MT\nACGT\n");
    let executor = RecordingExecutor::default();

    let err = launch(&inputs.args(&[]), &executor).unwrap_err();
    assert!(matches!(
        preflight_error(&err),
        PreflightError::MalformedSequenceFile { .. }
    ));
    assert!(!inputs.path("out").join(CONFIG_FILE).exists());
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn rerun_replaces_existing_configuration() {
    let inputs = Inputs::new();
    std::fs::create_dir(inputs.path("out")).unwrap();
    std::fs::write(inputs.path("out").join(CONFIG_FILE), "stale: true\n").unwrap();

    preflight(&inputs.args(&["--preflight-only", "-f", "200"])).unwrap();
    assert!(inputs.config().get("stale").is_none());
    assert_eq!(inputs.config()["parameters"]["fragment_size"].as_u64(), Some(200));

    preflight(&inputs.args(&["--preflight-only"])).unwrap();
    assert_eq!(inputs.config()["parameters"]["fragment_size"].as_u64(), Some(150));
    assert!(!inputs.path("out").join(format!(".{CONFIG_FILE}.tmp")).exists());
}

#[test]
fn failed_rename_leaves_no_staging_file() {
    let inputs = Inputs::new();
    // a non-empty directory in the way makes the final rename fail
    let blocker = inputs.path("out").join(CONFIG_FILE);
    std::fs::create_dir_all(blocker.join("keep")).unwrap();

    let err = preflight(&inputs.args(&["--preflight-only"])).unwrap_err();
    assert!(matches!(preflight_error(&err), PreflightError::Io { .. }));
    assert!(!inputs.path("out").join(format!(".{CONFIG_FILE}.tmp")).exists());
    assert!(blocker.is_dir());
}

#[test]
fn missing_mitochondrial_contig_fails() {
    let inputs = Inputs::new();
    let err = preflight(&inputs.args(&["--preflight-only", "--mitostring", "chrM"])).unwrap_err();
    match preflight_error(&err) {
        PreflightError::ContigNotFound { contig, .. } => assert_eq!(contig, "chrM"),
        other => panic!("expected ContigNotFound, got {other}"),
    }
}

#[test]
fn empty_bam_directory_fails() {
    let inputs = Inputs::new();
    for name in ["ctrl_1.bam", "treat_1.bam"] {
        std::fs::remove_file(inputs.path("bams").join(name)).unwrap();
    }
    let err = preflight(&inputs.args(&["--preflight-only"])).unwrap_err();
    assert!(matches!(
        preflight_error(&err),
        PreflightError::NoAlignmentFiles { .. }
    ));
}

#[test]
fn binary_exit_status_reflects_validation() {
    let inputs = Inputs::new();
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_aos-preflight"));

    let ok = Command::new(&bin)
        .args(&inputs.argv(&["--preflight-only", "--quiet"])[1..])
        .status()
        .expect("failed to spawn aos-preflight");
    assert!(ok.success());
    assert!(inputs.path("out").join(CONFIG_FILE).is_file());
    assert!(inputs.path("out").join("TSS.bed").is_file());

    let sheet = inputs.write("samples.tsv", "sample\tcondition\nctrl_1\tcontrol\n");
    let failed = Command::new(&bin)
        .args(&inputs.argv(&["--preflight-only", "--quiet", "--samplesheet", sheet.to_str().unwrap()])[1..])
        .status()
        .expect("failed to spawn aos-preflight");
    assert!(!failed.success());
}
