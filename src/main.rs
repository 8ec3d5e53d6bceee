#![forbid(unsafe_code)]
mod cli;

use clap::Parser;
use color_eyre::eyre;
use std::sync::Arc;
use std::time::Duration;

use cli::Cli;
use upload_queue::model::event::UploadEvent;
use upload_queue::model::upload_item::UploadRequest;
use upload_queue::services::simulated_backend::SimulatedBackend;
use upload_queue::services::upload_queue::{QueueConfig, UploadQueue};
use upload_queue::settings::filter_config::load_filter_settings;
use upload_queue::utils::{
    format_bytes, format_progress_bar, initialize_logging, initialize_panic_handler,
};

/// Demo set used when no files are given on the command line; the .tmp
/// entry shows admission filtering when the config excludes *.tmp
const DEMO_FILES: &[&str] = &["report.pdf=2400000", "notes.txt=120000", "cache.tmp=9000"];

const DEFAULT_DEMO_SIZE: u64 = 250_000;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    initialize_logging()?;
    initialize_panic_handler()?;
    let args = Cli::parse();

    let settings = load_filter_settings(args.config.clone())?;
    let backend = Arc::new(SimulatedBackend::with_timing(
        5,
        Duration::from_millis(args.chunk_delay_ms),
    ));
    let queue = UploadQueue::with_config(
        backend.clone(),
        backend,
        Arc::new(settings),
        QueueConfig::default(),
    );

    let specs: Vec<String> = if args.files.is_empty() {
        DEMO_FILES.iter().map(|s| s.to_string()).collect()
    } else {
        args.files.clone()
    };
    let requests: Vec<UploadRequest> = specs.iter().map(|spec| parse_request(spec)).collect();
    let submitted = requests.len();

    let mut events = queue.events().subscribe_all();
    let accepted = queue.enqueue(requests).await;
    println!(
        "queued {} of {} file(s); {} rejected by exclusion rules",
        accepted.len(),
        submitted,
        submitted - accepted.len()
    );

    queue.pump().await;

    let mut remaining = accepted.len();
    while remaining > 0 {
        match events.recv().await {
            Ok(event) => {
                print_event(&event);
                if event.status().is_terminal() {
                    remaining -= 1;
                }
            }
            Err(_) => break,
        }
    }

    let (complete, aborted, errors) = queue.totals().await;
    println!(
        "done: {} complete, {} aborted, {} failed",
        complete, aborted, errors
    );

    Ok(())
}

fn parse_request(spec: &str) -> UploadRequest {
    match spec.split_once('=') {
        Some((name, size)) => {
            let size = size.trim().parse().unwrap_or(DEFAULT_DEMO_SIZE);
            UploadRequest::new(name.trim(), size)
        }
        None => UploadRequest::new(spec.trim(), DEFAULT_DEMO_SIZE),
    }
}

fn print_event(event: &UploadEvent) {
    let item = event.item();
    match event {
        UploadEvent::Starting { .. } => {
            println!("▶ {} ({})", item.name, format_bytes(item.size));
        }
        UploadEvent::Progress { .. } => {
            println!(
                "  {} {} {:.0}%",
                item.name,
                format_progress_bar(item.progress.percent, 20),
                item.progress.percent
            );
        }
        UploadEvent::Complete { data, .. } => {
            println!("✔ {} stored as {}", item.name, data.id);
        }
        UploadEvent::Error { error, .. } => {
            println!("✘ {} failed: {}", item.name, error);
        }
        UploadEvent::Aborted { .. } => {
            println!("■ {} aborted", item.name);
        }
        UploadEvent::Cancelled { .. } => {
            println!("- {} cancelled before start", item.name);
        }
        UploadEvent::Deleted { .. } => {
            println!("🗑 {} deleted", item.name);
        }
    }
}
