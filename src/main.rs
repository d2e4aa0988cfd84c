use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use api_pulse::cli::{missing_url_error, Args};
use api_pulse::client::build_client;
use api_pulse::executor::ReqwestTransport;
use api_pulse::export::export_results;
use api_pulse::history::UrlHistory;
use api_pulse::load_test::LoadTestRunner;
use api_pulse::metrics::{gather_metrics_string, register_metrics, start_metrics_server};
use api_pulse::recorder::ResultRecorder;
use api_pulse::report::{format_results, ConsoleProgress};

/// Logs go to stderr; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();
    let args = Args::parse();

    let mut history = UrlHistory::load(args.history_path()).await;
    if args.list_history {
        for (i, url) in history.recent().iter().enumerate() {
            println!("{}. {}", i + 1, url);
        }
        return Ok(());
    }

    let url = match args.target_url(&history) {
        Some(url) => url,
        None => {
            eprintln!("Configuration error: {}", missing_url_error());
            eprintln!("Run with --help for usage.");
            process::exit(1);
        }
    };

    let config = match args.load_test_config(&url) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Run with --help for usage.");
            process::exit(1);
        }
    };

    register_metrics()?;
    let registry_arc = Arc::new(Mutex::new(prometheus::default_registry().clone()));
    if let Some(port) = args.metrics_port {
        let registry = registry_arc.clone();
        tokio::spawn(async move {
            start_metrics_server(port, registry).await;
        });
    }

    let client_result = build_client(&args.client_config())?;

    config.print_summary();
    for (name, value) in client_result.parsed_headers.iter() {
        println!("  Header: {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!();

    history.add(&url);
    if let Err(e) = history.save().await {
        warn!(error = %e, "Failed to save URL history");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping load test");
                cancel.cancel();
            }
        });
    }

    let runner = LoadTestRunner::new(
        Arc::new(ReqwestTransport::new(client_result.client)),
        Arc::new(ResultRecorder::new()),
    );
    let progress = Arc::new(ConsoleProgress::new(config.duration_secs()));
    let outcome = match runner.run(&config, progress, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!();
            if let Some(report) = e.partial_report() {
                println!("{}", report.statistics.format());
            }
            return Err(e.into());
        }
    };
    eprintln!();

    println!("{}", format_results(&outcome));

    if let Some(export) = args.export_settings() {
        let path = export_results(&outcome, export.path.as_deref(), export.format).await?;
        println!("Results exported to {}", path.display());
    }

    if args.metrics_port.is_some() {
        println!("\n--- FINAL METRICS ---\n{}", gather_metrics_string(&registry_arc));
        println!("--- END OF FINAL METRICS ---");
    }

    if outcome.is_cancelled() {
        process::exit(1);
    }
    Ok(())
}
