//! Parity command: runs a case matrix and reports per-case results.

use crate::ParityArgs;
use anyhow::{bail, Context, Result};
use tracing::info;
use vfx_tests::{builtin_matrix, load_matrix, run_matrix, RunOptions};

pub fn run(args: ParityArgs, verbose: u8) -> Result<()> {
    let mut cases = match &args.matrix {
        Some(path) => load_matrix(path)
            .with_context(|| format!("Failed to load matrix: {}", path.display()))?,
        None => builtin_matrix(),
    };

    if let Some(filter) = &args.filter {
        cases.retain(|c| c.name.contains(filter.as_str()));
        if cases.is_empty() {
            bail!("No cases match '{filter}'");
        }
    }

    if verbose > 0 {
        eprintln!("Running {} cases on {} ({})", cases.len(), args.backend, args.numeric);
    }

    let options = RunOptions { diagnostic_budget: args.budget };
    let report = run_matrix(&cases, args.backend, args.numeric, &options);

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }

    info!(passed = report.summary.passed, failed = report.summary.failed, "parity done");
    if !report.all_passed() {
        bail!("{} of {} cases failed", report.summary.failed, report.summary.total);
    }
    Ok(())
}
