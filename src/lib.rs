//! mirrorcp: parallel, filtered, recursive directory copier

pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::path::Path;

use crate::engine::tools::ExtensionFilter;

/// Result alias used by public mirrorcp API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: mirror `source` into `dest`, copying files whose extension matches `filter`
/// (`"all"` copies everything), and return the run's [`RunReport`].
///
/// `dest` is created when missing. Files that fail to copy are listed in
/// [`RunReport::failures`] and do not make this call fail; setup problems (bad source, blank
/// filter, uncreatable destination, thread spawn failure) do.
///
/// ```ignore
/// let report = mirrorcp::copy_tree(Path::new("src"), Path::new("backup"), "rs", &CopyOpts::default())?;
/// println!("{} of {} files copied", report.files_copied, report.files_checked);
/// ```
pub fn copy_tree(source: &Path, dest: &Path, filter: &str, opts: &CopyOpts) -> Result<RunReport> {
    let filter = ExtensionFilter::parse(filter)?;
    let opts = Opts::from(opts);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    pipeline::run_copy(source, dest, &filter, &opts)
}

/// Returns the `(workers, queue_capacity)` a run with default [`CopyOpts`] would use on this host.
pub fn default_tuning() -> Result<(usize, usize)> {
    let tuning = pipeline::PipelineTuning::resolve(
        &Opts::default(),
        &utils::config::WorkerThreadLimits::current(),
    )?;
    Ok((tuning.workers, tuning.queue_capacity))
}
