//! Parse command - extract a receipt from a local HTML file.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use nfe_core::{ContentType, parse_nfe};

use crate::report::{self, OutputFormat};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input HTML file
    #[arg(required = true)]
    input: PathBuf,

    /// Host the file was fetched from, selects the template
    #[arg(long)]
    host: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("parsing file: {}", args.input.display());

    let body = fs::read_to_string(&args.input)?;
    let nfe = parse_nfe(&args.host, ContentType::Html, &body)?;

    let output = report::render(std::slice::from_ref(&nfe), args.format)?;
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

    Ok(())
}
