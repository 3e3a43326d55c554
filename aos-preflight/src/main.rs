use aos_preflight::cli::Args;
use aos_preflight::executor::SnakemakeExecutor;
use aos_preflight::pipeline;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let executor = SnakemakeExecutor::new(&args.snakefile);
    match pipeline::launch(&args, &executor) {
        Ok(report) => {
            tracing::info!(
                config = %report.config.display(),
                effective_genome_size = report.effective_genome_size,
                alignments = report.alignments,
                "aos-preflight: complete"
            );
        }
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    }
}
