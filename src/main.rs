//! esquery-rs command line entry point
//!
//! Reads a paging request as JSON and prints the matching page.

use anyhow::{Context, Result};
use esquery_rs::{config, EsClient, Paging, Search};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut explain = false;
    let mut input: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("esquery-rs {}", esquery_rs::VERSION);
                return Ok(());
            }
            "-e" | "--explain" => explain = true,
            "-" => input = None,
            path => input = Some(PathBuf::from(path)),
        }
    }

    let paging = read_paging(input.as_deref())?;

    let settings = config::load()?;

    if explain {
        let query = paging.compile_or(
            &settings.query.compiler(),
            settings.query.default_time_zone.as_deref(),
        )?;
        println!("{}", serde_json::to_string_pretty(&query.source())?);
        return Ok(());
    }

    settings.validate()?;
    info!(
        "Querying index {} on {} node(s)",
        settings.backend.index,
        settings.backend.urls.len()
    );

    let client = EsClient::with_settings(&settings.backend)?;
    let search = Search::with_settings(Arc::new(client), &settings.query);
    let page = search.page(&paging).await?;
    info!("Fetched {} of {} docs", page.docs.len(), page.total);

    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

/// Read the paging request from a file, or stdin when none is given
fn read_paging(path: Option<&std::path::Path>) -> Result<Paging> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("invalid paging request")
}

fn print_usage() {
    println!(
        r#"
esquery-rs v{}
Compile a condition tree into an Elasticsearch bool query and fetch the results

USAGE:
    esquery-rs [OPTIONS] [FILE]

Reads the paging request as JSON from FILE, or stdin when FILE is omitted or -.

OPTIONS:
    -e, --explain          Print the compiled query instead of running it
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    ESQUERY_SETTINGS_PATH  Path to settings.yml
    ESQUERY_URLS           Comma-separated node URLs
    ESQUERY_INDEX          Index to query
    ESQUERY_USERNAME       Basic auth user
    ESQUERY_PASSWORD       Basic auth password
    ESQUERY_STREAM_WORKERS Streaming worker count
    ESQUERY_TIME_ZONE      Zone used when the request names none
    RUST_LOG               Log filter, defaults to info
"#,
        esquery_rs::VERSION
    );
}
