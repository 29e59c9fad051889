//! Print the `Identify` response of a repository.
//!
//! ```sh
//! cargo run --example identify -- https://export.arxiv.org/oai2
//! ```
//!
//! Without an argument the base URL is read from `OAI_PMH_BASE_URL`.

use oai_pmh_client::{ClientConfig, OaiPmhClient, RequestOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> oai_pmh_client::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(base_url) => ClientConfig::builder(base_url).build()?,
        None => ClientConfig::from_env()?,
    };
    let client = OaiPmhClient::new(&config)?;

    let identify = client.identify(&RequestOptions::default()).await?;

    println!("Repository:  {}", identify.repository_name);
    println!("Base URL:    {}", identify.base_url);
    println!("Protocol:    {}", identify.protocol_version);
    println!("Admin:       {}", identify.admin_email);
    println!("Earliest:    {}", identify.earliest_datestamp);
    println!("Deleted:     {}", identify.deleted_record.as_str());
    println!("Granularity: {}", identify.granularity.as_str());
    if let Some(compression) = &identify.compression {
        println!("Compression: {}", compression.join(", "));
    }
    for description in identify.description.iter().flatten() {
        println!("\n{}", description.to_xml_string());
    }
    Ok(())
}
