//! mirrorcp CLI: mirror SOURCE into DEST, copying files matching FILTER.

use anyhow::Result;
use clap::Parser;
use mirrorcp::engine::arg_parser::Cli;
use mirrorcp::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
