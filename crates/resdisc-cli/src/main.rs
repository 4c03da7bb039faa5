//! # resdisc-query Entry Point
//!
//! Runs one resource-discovery query and prints the overlay's answer.
//!
//! ## Usage
//!
//! ```bash
//! # Five nodes with more than 512 MB of memory, best KFlops first
//! resdisc-query --ip 10.0.0.7 --port 10000 \
//!   --ma-req 'Memory > 512' --ma-rank 'KFlops' \
//!   --num-res 5 --sort-descending
//!
//! # Underscore spelling from older scripts is accepted too
//! resdisc-query --ip=10.0.0.7 --port=10000 --ma_req="Memory > 512" --first_fit
//! ```
//!
//! ## Output
//!
//! stdout carries the raw result as JSON and a `total time taken = <seconds>`
//! line. Logs and errors go to stderr; set `RUST_LOG=info` (or `debug`) to see
//! the query's progress.

use anyhow::Result;
use resdisc_cli::{args, run_query, QueryConfig};

#[tokio::main]
async fn main() {
    let args = args::from_env();

    // Logs go to stderr so stdout stays pipeable. Default to WARN, but allow
    // RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: args::QueryArgs) -> Result<()> {
    let config = QueryConfig::from_args(args)?;
    let outcome = run_query(&config).await?;
    println!("{}", outcome.render()?);
    Ok(())
}
