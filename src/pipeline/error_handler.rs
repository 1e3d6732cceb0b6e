use anyhow::Result;
use log::{error, warn};

use crate::{CopyFailure, Opts, RunReport};

/// Log one failed copy with enough context to diagnose it.
pub fn report_copy_failure(failure: &CopyFailure) {
    let code = failure
        .error
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    error!(
        "worker #{}: cannot copy \"{}\" to \"{}\": {} (code {})",
        failure.worker_id,
        failure.source.display(),
        failure.dest.display(),
        failure.error,
        code
    );
}

/// Check run result: in strict mode a walk error or any failed file is an error; otherwise log them.
/// Call after the report is complete.
pub fn check_for_walk_error_or_failures(opts: &Opts, report: &RunReport) -> Result<()> {
    if opts.strict {
        if let Some(msg) = &report.walk_error {
            anyhow::bail!("strict mode: walk stopped early: {}", msg);
        }
        if !report.failures.is_empty() {
            anyhow::bail!("strict mode: {} files failed to copy", report.failures.len());
        }
    }
    if let Some(msg) = &report.walk_error {
        warn!("Walk stopped early, some files were never discovered: {}", msg);
    }
    if !report.failures.is_empty() {
        warn!("{} files failed to copy", report.failures.len());
        if opts.verbose {
            for f in &report.failures {
                eprintln!("  failed: {} ({})", f.source.display(), f.error);
            }
        }
    }
    Ok(())
}
