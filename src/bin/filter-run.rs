//! CLI tool to filter a registry CSV export with a JSON filter document.
//!
//! Usage:
//!   filter-run input.csv --filter filter.json -o matches.csv
//!   filter-run input.csv --filter filter.json --encoding utf-8 --chunk-size 5000

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use cnpj_filter::expr::FilterSpec;
use cnpj_filter::pipeline::{filter_csv_path, RunOptions, Summary};
use cnpj_filter::progress::StdErrProgress;
use cnpj_filter::FilterResult;

#[derive(Parser, Debug)]
#[command(
    name = "filter-run",
    about = "Filter a CNPJ registry CSV export with a JSON filter document"
)]
struct Args {
    /// Input CSV file (semicolon-delimited, header first)
    input: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "output.csv")]
    output: PathBuf,

    /// JSON filter document
    #[arg(short, long)]
    filter: PathBuf,

    /// Rows per chunk
    #[arg(short, long, default_value_t = 1000)]
    chunk_size: usize,

    /// Input encoding label (e.g. utf-8, windows-1252); overrides detection
    #[arg(short, long)]
    encoding: Option<String>,

    /// Suppress per-chunk progress on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> FilterResult<Summary> {
    let document = std::fs::read_to_string(&args.filter)?;
    let expression = FilterSpec::from_json(&document)?.compile()?;

    let mut options = RunOptions::default();
    options.reader.chunk_size = args.chunk_size;
    options.encoding_override = args.encoding.clone();
    if !args.quiet {
        options.pipeline.observer = Some(Arc::new(StdErrProgress));
    }

    filter_csv_path(&args.input, &args.output, &expression, &options)
}
