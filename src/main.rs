//! hashcrawl CLI: hash every file under a directory on a bounded worker pool.

use anyhow::Result;
use clap::Parser;
use hashcrawl::engine::arg_parser::Cli;
use hashcrawl::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
