//! Fetch a document from S3 and save it as a PDF.
//!
//! Usage:
//!   fetch_pdf <output.pdf>
//!   fetch_pdf --local <input> <output.pdf>
//!
//! The remote form reads its settings from the environment: `COURIER_BUCKET`,
//! `COURIER_KEY`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
//! `COURIER_REGION`, `AWS_SESSION_TOKEN`, `COURIER_PRESIGN_EXPIRY_SECS`,
//! `COURIER_MAX_ATTEMPTS`, `COURIER_BACKOFF_MS`, `COURIER_TIMEOUT_SECS`.
//! Set `RUST_LOG=debug` for detailed logs.

use pdf_courier::api::{PdfCourier, RetrievedPdf};
use pdf_courier::config::{CourierConfig, Settings};
use pdf_courier::converter::ConversionOutcome;
use pdf_courier::storage::{Credentials, FnProgress, ProgressEvent, ProgressSink};
use pdf_courier::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

enum Mode {
    Remote { output: PathBuf },
    Local { input: PathBuf, output: PathBuf },
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  fetch_pdf <output.pdf>");
    eprintln!("  fetch_pdf --local <input> <output.pdf>");
    process::exit(2);
}

fn parse_args() -> Mode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, input, output] if flag == "--local" => Mode::Local {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        },
        [flag] if flag == "--help" || flag == "-h" => usage(),
        [output] if !output.starts_with("--") => Mode::Remote {
            output: PathBuf::from(output),
        },
        _ => usage(),
    }
}

fn print_progress(event: &ProgressEvent) {
    println!("[{:>3}%] {}", event.percentage, event.message);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let start = Instant::now();
    let progress = FnProgress(print_progress);

    let result = match parse_args() {
        Mode::Local { input, output } => run_local(&input, &progress).map(|pdf| (pdf, output)),
        Mode::Remote { output } => run_remote(&progress).await.map(|pdf| (pdf, output)),
    };

    let (retrieved, output) = match result {
        Ok(done) => done,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            for step in e.remediation() {
                eprintln!("  - {}", step);
            }
            for attempt in e.attempts() {
                eprintln!("  {} x{}: {}", attempt.strategy, attempt.tries, attempt.message);
            }
            process::exit(1);
        },
    };

    if let Err(e) = retrieved.save(&output) {
        eprintln!("Error writing {}: {}", output.display(), e);
        process::exit(1);
    }

    println!();
    println!("Conversion: {}", retrieved.conversion_id);
    match &retrieved.outcome {
        ConversionOutcome::PassThrough => println!("Result:     original PDF"),
        ConversionOutcome::Synthesized { format, pages } => {
            println!("Result:     synthesized from {} ({} pages)", format, pages)
        },
        ConversionOutcome::Fallback { reason } => println!("Result:     fallback ({})", reason),
    }
    if let Some(download) = &retrieved.download {
        println!("Strategy:   {}", download.strategy);
        println!("Source:     {} bytes", download.size_bytes);
    }
    println!("Output:     {} ({} bytes)", output.display(), retrieved.pdf.len());
    println!("Time:       {:.2}s", start.elapsed().as_secs_f64());
}

fn run_local(input: &Path, progress: &dyn ProgressSink) -> Result<RetrievedPdf, Error> {
    let bytes = fs::read(input)?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    // Local conversion never touches the network; credentials are placeholders.
    let courier = PdfCourier::new(Credentials::new("", ""), &CourierConfig::default())?;
    Ok(courier.convert_local(bytes, &file_name, None, progress))
}

async fn run_remote(progress: &dyn ProgressSink) -> Result<RetrievedPdf, Error> {
    let settings = Settings::from_env()?;
    let courier = PdfCourier::from_settings(&settings)?;
    courier
        .fetch_pdf(&settings.locator, progress, &CancellationToken::new())
        .await
}
