//! Example demonstrating the job pipeline
//!
//! Submits a parse job and one export job per format for a container, runs
//! them with the default retry policy and prints each final status. Pass
//! `--recover` to run the repair tool first; the parse then reads the
//! repaired copy.

use anyhow::Result;
use mcap_export::{
    compute_export_path, ExportFormat, JobKind, Orchestrator, PipelineRunner, RetryPolicy, SourceRef,
};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let recover = args.iter().any(|a| a == "--recover");
    let Some(input) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: {} <mcap_file> [--recover]", args[0]);
        std::process::exit(1);
    };
    let input = Path::new(input);

    let orchestrator = Orchestrator::new(Arc::new(PipelineRunner::default()), RetryPolicy::default());
    let source = SourceRef::new(input);

    println!("=== MCAP Job Demo ===");
    let mut jobs = Vec::new();
    if recover {
        jobs.push(orchestrator.submit_recovery(source.clone()));
    } else {
        jobs.push(orchestrator.submit(source.clone(), JobKind::Parse));
    }
    for format in [ExportFormat::Omni, ExportFormat::Tvn, ExportFormat::Ld] {
        jobs.push(orchestrator.submit(
            source.clone(),
            JobKind::Export {
                format: format.name().to_string(),
                output: compute_export_path(input, format, None),
            },
        ));
    }

    for id in jobs {
        for (job, status) in orchestrator.run_chain(id).await? {
            let kind = orchestrator
                .store()
                .get(job)
                .map(|j| j.kind.name())
                .unwrap_or("unknown");
            println!("  {job} {kind:<8} {}", status.status);
        }
    }

    Ok(())
}
