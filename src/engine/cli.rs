//! CLI command handler: resolve options, run the copy, print the summary.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;

use crate::engine::arg_parser::Cli;
use crate::engine::tools::ExtensionFilter;
use crate::pipeline::{check_for_walk_error_or_failures, run_copy};
use crate::utils::{
    Colors, apply_file_to_opts, default_config_path, read_mirrorcp_toml, setup_logging,
};
use crate::{Opts, RunReport};

/// Defaults < config file < CLI flags. Sets up logging once the verbosity is known.
fn setup_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(Path::new(".")));
    let file = read_mirrorcp_toml(&config_path);
    if cli.config.is_some() && file.is_none() {
        anyhow::bail!("cannot read config file {}", config_path.display());
    }
    let mut file_error = None;
    match file {
        Some(Ok(parsed)) => apply_file_to_opts(&parsed, &mut opts),
        Some(Err(e)) => file_error = Some(e),
        None => {}
    }

    if let Some(v) = cli.workers {
        opts.workers = Some(v);
    }
    if let Some(v) = cli.producers {
        opts.producers = Some(v);
    }
    if let Some(v) = cli.batch_size {
        opts.batch_size = Some(v);
    }
    if let Some(v) = cli.worker_batch_size {
        opts.worker_batch_size = Some(v);
    }
    if let Some(v) = cli.queue_capacity {
        opts.queue_capacity = Some(v);
    }
    opts.verbose = cli.verbose.unwrap_or(opts.verbose);
    opts.strict = cli.strict.unwrap_or(opts.strict);
    opts.json = cli.json.unwrap_or(opts.json);

    setup_logging(opts.verbose);
    if let Some(e) = file_error {
        warn!("{}: {}", config_path.display(), e);
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);
    Ok(opts)
}

/// Print the final counters: colored lines, or one JSON object with `--json`.
fn print_summary(
    source: &Path,
    filter: &ExtensionFilter,
    report: &RunReport,
    opts: &Opts,
) -> Result<()> {
    if opts.json {
        let json = serde_json::to_string_pretty(report).context("serialize summary")?;
        println!("{}", json);
        return Ok(());
    }
    println!();
    println!(
        "{}",
        Colors::colorize(
            Colors::COPIED,
            &format!("Search and copy in {} completed.", source.display())
        )
    );
    println!(
        "{}",
        Colors::colorize(
            Colors::COPIED,
            &format!("Total {} files copied: {}", filter, report.files_copied)
        )
    );
    println!(
        "{}",
        Colors::colorize(
            Colors::CHECKED,
            &format!("Total checked files count: {}", report.files_checked)
        )
    );
    println!(
        "{}",
        Colors::colorize(
            Colors::BYTES,
            &format!("Total copied files size: {} bytes", report.bytes_copied)
        )
    );
    if report.files_failed > 0 {
        println!(
            "{}",
            Colors::colorize(
                Colors::FAILED,
                &format!("Total failed files: {}", report.files_failed)
            )
        );
    }
    println!(
        "{}",
        Colors::colorize(
            Colors::ELAPSED,
            &format!("Total time: {:.2} sec", report.elapsed_ms as f64 / 1000.0)
        )
    );
    Ok(())
}

/// Run one copy. Per-file failures do not fail the command unless `--strict` is set.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli)?;
    let filter = ExtensionFilter::parse(&cli.filter)?;
    let report = run_copy(&cli.source, &cli.dest, &filter, &opts)?;
    print_summary(&cli.source, &filter, &report, &opts)?;
    check_for_walk_error_or_failures(&opts, &report)
}
