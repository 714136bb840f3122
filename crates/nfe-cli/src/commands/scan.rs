//! Scan command - fetch and extract one or more receipt URLs.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{error, info, warn};

use nfe_core::{Nfe, NfeUrl, parse_nfe};

use crate::fetch;
use crate::report::{self, OutputFormat};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Receipt consultation URLs
    #[arg(required = true)]
    urls: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep scanning after a receipt fails
    #[arg(long)]
    keep_going: bool,
}

/// Outcome of scanning a single URL.
struct ScanResult {
    url: String,
    nfe: Option<Nfe>,
    error: Option<String>,
}

pub async fn run(args: ScanArgs) -> anyhow::Result<()> {
    let start = Instant::now();
    let client = reqwest::Client::new();

    let mut results = Vec::with_capacity(args.urls.len());

    for raw in &args.urls {
        match scan_one(&client, raw).await {
            Ok(nfe) => {
                info!("extracted receipt {}", nfe.access_key);
                results.push(ScanResult {
                    url: raw.clone(),
                    nfe: Some(nfe),
                    error: None,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.keep_going {
                    warn!("failed to scan {raw}: {error_msg}");
                    results.push(ScanResult {
                        url: raw.clone(),
                        nfe: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("failed to scan {raw}: {error_msg}");
                    anyhow::bail!("scan failed: {error_msg}");
                }
            }
        }
    }

    let mut nfes: Vec<Nfe> = results.iter().filter_map(|r| r.nfe.clone()).collect();
    nfes.sort_by_key(|nfe| nfe.issued_date);

    let output = report::render(&nfes, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{output}");
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Scanned {} receipts in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(nfes.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed receipts:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.url,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn scan_one(client: &reqwest::Client, raw: &str) -> anyhow::Result<Nfe> {
    let url = NfeUrl::parse(raw)?;
    let page = fetch::fetch(client, &url).await?;
    let nfe = parse_nfe(&page.host, page.content_type, &page.body)?;
    Ok(nfe)
}
