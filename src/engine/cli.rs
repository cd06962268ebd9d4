//! CLI command handler: crawl DIR, print results, report failures.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::engine::arg_parser::Cli;
use crate::engine::tools::display_key;
use crate::pipeline::Crawler;
use crate::utils::{
    PackagePaths, apply_file_to_opts, load_hashcrawl_toml, max_workers_by_fd_limit, setup_logging,
};
use crate::{CrawlOpts, ResultMap};

/// Overwrite opts field from CLI when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $flag:ident => $($target:ident).+) => {
        if let Some(v) = $cli.$flag {
            $opts.$($target).+ = v;
        }
    };
}

/// Defaults, then `.hashcrawl.toml` in the crawl root, then CLI flags.
pub fn build_opts(cli: &Cli) -> Result<CrawlOpts> {
    let mut opts = CrawlOpts::default();
    if let Some(file) = load_hashcrawl_toml(&cli.dir, PackagePaths::get().config_filename()) {
        apply_file_to_opts(&file, &mut opts).context("apply settings file")?;
    }
    if let Some(ref name) = cli.algorithm {
        opts.algorithm = name.parse()?;
    }
    apply_cli_opt!(cli, opts, buffer_size => buffer_size);
    apply_cli_opt!(cli, opts, core => pool.core_workers);
    apply_cli_opt!(cli, opts, max => pool.max_workers);
    apply_cli_opt!(cli, opts, queue => pool.task_queue_capacity);
    if let Some(secs) = cli.idle {
        opts.pool.max_idle = Duration::from_secs(secs);
    }
    apply_cli_opt!(cli, opts, follow_links => follow_links);
    apply_cli_opt!(cli, opts, parallel_walk => parallel_walk);
    apply_cli_opt!(cli, opts, strict => strict);
    opts.show_progress = cli.verbose > 0;

    if let Some(fd_cap) = max_workers_by_fd_limit() {
        opts.pool = opts.pool.capped(fd_cap);
    }
    opts.pool.validate()?;
    Ok(opts)
}

/// Write results as text lines (case-insensitive path order) or a JSON object.
pub fn write_results<W: Write>(
    results: &ResultMap,
    root: &Path,
    relative: bool,
    json: bool,
    mut out: W,
) -> Result<()> {
    if json {
        let map: std::collections::BTreeMap<String, String> = results
            .to_btree()
            .into_iter()
            .map(|(k, v)| (display_key(&k, root, relative), v))
            .collect();
        serde_json::to_writer_pretty(&mut out, &map).context("write JSON results")?;
        writeln!(out)?;
    } else {
        for entry in results.sorted_entries() {
            writeln!(
                out,
                "{}  {}",
                entry.digest(),
                display_key(entry.file_path(), root, relative)
            )?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Run one crawl of `cli.dir` and print results. Partial results are still written when the
/// walk stops early; the error is returned afterwards.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose);
    let opts = build_opts(cli)?;
    debug!("{} CONFIG:{:#?}", PackagePaths::get().pkg_name().to_uppercase(), opts);

    let mut crawler = Crawler::new(&cli.dir, opts).context("configure crawler")?;
    let cancel = crawler.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let results = ResultMap::new();
    let outcome = crawler.execute(&results);
    crawler.quit();
    debug!("pool stats: {:?}", crawler.pool_stats());

    match cli.output {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("create output file {}", path.display()))?;
            write_results(&results, &cli.dir, cli.relative, cli.json, BufWriter::new(file))?;
            info!("Wrote {} results to {}", results.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_results(&results, &cli.dir, cli.relative, cli.json, stdout.lock())?;
        }
    }

    let report = outcome?;
    if !report.failures.is_empty() {
        info!(
            "{} of {} files hashed; {} failed",
            report.succeeded(),
            report.submitted,
            report.failures.len()
        );
    }
    Ok(())
}
