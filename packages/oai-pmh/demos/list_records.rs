//! Page through `ListRecords` and print one line per record.
//!
//! ```sh
//! cargo run --example list_records -- https://export.arxiv.org/oai2 oai_dc
//! ```
//!
//! The harvest is cancelled after 60 seconds or on ctrl+c.

use std::time::Duration;

use futures::StreamExt;
use oai_pmh_client::{
    CancellationToken, ClientConfig, ListOptions, OaiPmhClient, OaiPmhError, RequestOptions,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => {}
        Err(OaiPmhError::Aborted) => eprintln!("Aborted"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run() -> oai_pmh_client::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(base_url) => ClientConfig::builder(base_url).build()?,
        None => ClientConfig::from_env()?,
    };
    let metadata_prefix = args.next().unwrap_or_else(|| "oai_dc".to_string());
    let client = OaiPmhClient::new(&config)?;

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = tokio::time::sleep(Duration::from_secs(60)) => {}
            }
            token.cancel();
        }
    });

    let mut pages = client.list_records(
        &ListOptions::new(metadata_prefix),
        RequestOptions::with_signal(token),
    );

    let mut total = 0;
    while let Some(page) = pages.next().await {
        for record in page? {
            total += 1;
            let status = if record.header.is_deleted { " (deleted)" } else { "" };
            println!(
                "{}\t{}{}",
                record.header.datestamp, record.header.identifier, status
            );
        }
    }

    println!("{total} records");
    Ok(())
}
