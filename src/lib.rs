pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod model;
pub mod processor;
pub mod report;
pub mod writer;

use anyhow::{Context, bail};
use clap::Parser;

use crate::driver::{Driver, Outcome};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Configure ──────────────────────────────────────────────────
    let config = config::Config::resolve(&args).with_context(|| "Loading configuration")?;
    logging::init(&config)?;
    logging::log_config(&config);

    // 2. ── Load the catalog ───────────────────────────────────────────
    let catalog = catalog::load(config.catalog.as_deref(), config.library.as_deref())
        .with_context(|| "Loading the library catalog")?;

    // 3. ── Build every script ─────────────────────────────────────────
    let driver = Driver::new(&config, &catalog);
    for script in &args.scripts {
        let outcome = driver
            .build(script)
            .with_context(|| format!("Building {}", script.display()))?;
        if outcome == Outcome::Rejected {
            bail!("{} was not built", script.display());
        }
    }

    Ok(())
}
