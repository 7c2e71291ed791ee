//! cvanalyzer CLI — resume field extraction and skill-based ranking.
//!
//! Ingests a directory of resumes into a local database, then ranks the
//! stored candidates against a set of required skills.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
