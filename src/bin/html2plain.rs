//! Command line front end: HTML in, plain text out

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use html_plaintext::charset::decode_html;
use html_plaintext::{ConversionContext, ConversionError, ConverterOptions, PlainTextConverter};

#[derive(Debug, Parser)]
#[command(
    name = "html2plain",
    version,
    about = "Render HTML as the plain text alternative of an email"
)]
struct Cli {
    /// Input HTML file ("-" or omitted reads stdin)
    input: Option<PathBuf>,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON options document (tag classification, stroke text, size limit)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Content-Type of the input, used for charset detection
    #[arg(long, value_name = "CONTENT_TYPE")]
    content_type: Option<String>,

    /// Abort conversions running longer than this (0 disables the deadline)
    #[arg(long, value_name = "MS", default_value_t = 0)]
    timeout_ms: u64,
}

fn read_input(input: Option<&PathBuf>) -> Result<Vec<u8>, ConversionError> {
    match input {
        Some(path) if path.as_os_str() != "-" => Ok(fs::read(path)?),
        _ => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn load_options(config: Option<&PathBuf>) -> Result<ConverterOptions, ConversionError> {
    match config {
        Some(path) => {
            let document = fs::read_to_string(path)?;
            ConverterOptions::from_json_str(&document)
        }
        None => Ok(ConverterOptions::default()),
    }
}

fn run(cli: &Cli) -> Result<(), ConversionError> {
    let converter = PlainTextConverter::with_options(load_options(cli.config.as_ref())?);
    let bytes = read_input(cli.input.as_ref())?;
    let html = decode_html(&bytes, cli.content_type.as_deref())?;

    let mut ctx = ConversionContext::new(Duration::from_millis(cli.timeout_ms));
    let mut text = converter.convert_with_context(&html, &mut ctx)?;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    tracing::debug!(
        events = ctx.event_count(),
        elapsed_us = ctx.elapsed().as_micros() as u64,
        "conversion finished"
    );

    match &cli.output {
        Some(path) => fs::write(path, text)?,
        None => io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.code())
        }
    }
}
