use std::collections::HashSet;
use std::time::Duration;

use clap::Parser;
use roku_scanner::{format, scan, Category, EcpClient, Scanner, SearchTarget};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roku-scanner")]
#[command(about = "Discover Roku devices on the local network and report their ECP status")]
struct Opt {
    /// Timeout for each device discovery query, in seconds
    #[clap(short, long, default_value_t = 2)]
    timeout: u64,

    /// Search for all UPnP devices on the network, not only Rokus
    #[clap(short, long, default_value_t = false)]
    search_target_all: bool,

    /// Output results as JSON (default format is XML)
    #[clap(long, default_value_t = false)]
    json: bool,

    /// Pretty-print JSON output
    #[clap(long, default_value_t = false)]
    pretty: bool,

    /// ECP data to exclude from the output
    /// (device-info, apps, active-app, media-player)
    #[clap(long, value_name = "CATEGORY")]
    exclude: Vec<Category>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let opt = Opt::parse();

    let mut scanner = Scanner::new().with_timeout(Duration::from_secs(opt.timeout));
    if opt.search_target_all {
        scanner = scanner.with_search_target(SearchTarget::UpnpRootDevice);
    }

    let discovered = scanner.discover().await?;

    let client = EcpClient::new()?;
    let devices = scan(&client, discovered).await?;

    let exclude: HashSet<Category> = opt.exclude.iter().copied().collect();

    let mut out = String::new();
    if !opt.json {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n");
    }

    for roku in &devices {
        if opt.json {
            out.push_str(&format::to_json(roku, &exclude, opt.pretty)?);
            out.push('\n');
        } else {
            out.push_str(&format::to_xml(roku, &exclude));
        }
    }

    print!("{out}");
    Ok(())
}
