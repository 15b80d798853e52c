use std::process::ExitCode;

use clap::Parser;
use edu_ai::retrieve::RetrievedPassage;
use edu_core::config::PipelineConfig;
use edu_core::error::AppError;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::{Args, Commands};

fn init_tracing() {
    // Logs go to stderr so stdout stays clean for answers and --json output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("OUTPUT_ENCODE_FAILED", "Failed to encode response").with_details(e.to_string())
    })?;
    println!("{out}");
    Ok(())
}

fn print_sources(passages: &[RetrievedPassage]) {
    if passages.is_empty() {
        return;
    }
    println!("\nSources:");
    for p in passages {
        match p.provenance.page {
            Some(page) => println!("  - {} (p. {page}) score={:.3}", p.provenance.source, p.score),
            None => println!("  - {} score={:.3}", p.provenance.source, p.score),
        }
    }
}

fn run(args: Args) -> Result<ExitCode, AppError> {
    let cfg = PipelineConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Ingest { data, index } => {
            let report = commands::ingest(&cfg, data.as_deref(), index.as_deref())?;
            if args.json {
                print_json(&report)?;
            } else {
                println!(
                    "Indexed {} chunks from {} documents ({} pages) into {} [model={}, dims={}]",
                    report.chunks,
                    report.documents,
                    report.pages,
                    report.index_dir,
                    report.embedding_model,
                    report.dims
                );
            }
        }
        Commands::Ask { question, k, common } => {
            let history = commands::load_history(common.history.as_deref())?;
            let engines = commands::open_engines(&cfg, common.index.as_deref())?;
            let res = engines.ask(&question, k, &history)?;
            if args.json {
                print_json(&res)?;
            } else {
                println!("{}", res.answer);
                print_sources(&res.passages);
            }
        }
        Commands::Quiz { topic, num, common } => {
            let history = commands::load_history(common.history.as_deref())?;
            let engines = commands::open_engines(&cfg, common.index.as_deref())?;
            let res = engines.quiz(&topic, num, &history)?;
            if args.json {
                print_json(&res)?;
            } else {
                println!("{}", res.questions);
                print_sources(&res.passages);
            }
        }
        Commands::Task { topic, common } => {
            let history = commands::load_history(common.history.as_deref())?;
            let engines = commands::open_engines(&cfg, common.index.as_deref())?;
            let res = engines.task(&topic, &history)?;
            if args.json {
                print_json(&res)?;
            } else {
                println!("{}", res.task);
                print_sources(&res.passages);
            }
        }
        Commands::Health { index } => {
            let report = commands::health(&cfg, index.as_deref())?;
            if args.json {
                print_json(&report)?;
            } else {
                let idx = &report.index;
                match (&idx.error, idx.entries) {
                    (None, Some(n)) => println!("index:      ready ({n} entries) at {}", idx.path),
                    (Some(e), _) => println!("index:      not ready at {}: {e}", idx.path),
                    (None, None) => println!("index:      not ready at {}", idx.path),
                }
                println!(
                    "embeddings: {} {:?}",
                    report.embeddings.descriptor, report.embeddings.availability
                );
                println!(
                    "generation: {} {:?}",
                    report.generation.descriptor, report.generation.availability
                );
            }
            if !report.ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    let json = args.json;

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!(code = %e.code, retryable = e.retryable, "command failed");
            if json {
                // Best effort; the error is already logged above.
                let _ = print_json(&e);
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
