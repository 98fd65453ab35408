use std::path::PathBuf;
use std::sync::Arc;

use caml_merge::{read_config, Coordinator, ErrorAggregator, UuidIds};
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(name = "camlmerge")]
#[command(about = "Repair CAML documents and merge them with chapter metadata")]
struct Cli {
    #[arg(short, long, default_value = "camlmerge.yaml", help = "Run configuration (YAML)")]
    config: PathBuf,

    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,

    #[arg(short, long, help = "Worker threads per year (default: CPU count - 1)")]
    workers: Option<usize>,

    #[arg(short, long = "year", help = "Year to process; repeat to list several. Replaces the configured years")]
    years: Vec<u16>,
}

fn setup_logging(level: &str) {
    let level = match level.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        other => {
            eprintln!("Invalid log level '{}', defaulting to INFO.", other);
            LevelFilter::Info
        }
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to install logger: {}", e);
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = read_config(&cli.config).and_then(|mut c| {
        if !cli.years.is_empty() {
            c.years = cli.years.clone();
        }
        if cli.workers.is_some() {
            c.workers = cli.workers;
        }
        c.validate()?;
        Ok(c)
    });
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::json!({
                    "tool": "load_config",
                    "file": cli.config,
                    "error": e.to_string(),
                    "error_code": 3
                })
            );
            std::process::exit(3);
        }
    };

    eprintln!(
        "{}",
        serde_json::json!({
            "tool": "load_config",
            "file": cli.config,
            "status": "ok",
            "years": config.years,
            "workers": config.worker_count(),
            "input_root": config.input_root,
            "output_root": config.output_root
        })
    );

    let errors = Arc::new(ErrorAggregator::new());
    let coordinator = Coordinator::new(config, Arc::clone(&errors), Arc::new(UuidIds));
    let summary = coordinator.run();

    eprintln!(
        "{}",
        serde_json::json!({
            "tool": "run",
            "summary": summary,
            "setup_error_messages": errors.setup_errors()
        })
    );
}
