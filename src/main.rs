//! vidresolve - resolve a social-media post link to a playable video URL
//!
//! Prints the resolved reference and exits 0, exits 2 when nothing was
//! found, 1 on error.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use vidresolve::{default_dispatcher, ErrorKind, Resolution, ResolverSettings, VideoReference};

#[derive(Parser)]
#[command(name = "vidresolve", version, about)]
struct Args {
    /// Post URL to resolve
    url: String,

    /// Re-resolve delegated hosting-platform references
    #[arg(long)]
    follow: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    message: String,
    retryable: bool,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for the result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let kind = e
                .downcast_ref::<vidresolve::ResolveError>()
                .map(|e| e.kind())
                .unwrap_or(ErrorKind::Transport);
            let retryable = e
                .downcast_ref::<vidresolve::ResolveError>()
                .is_some_and(|e| e.is_retryable());
            report_error(
                args.json,
                ErrorBody {
                    kind,
                    message: format!("{:#}", e),
                    retryable,
                },
            );
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let settings = ResolverSettings::load(args.config.as_deref())?;
    let dispatcher = default_dispatcher(&settings)?;

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let resolution = rt.block_on(async {
        if args.follow {
            dispatcher.resolve_following(&args.url).await
        } else {
            dispatcher.resolve(&args.url).await
        }
    })?;

    match resolution {
        Resolution::Found(reference) => {
            print_reference(args.json, &reference)?;
            Ok(ExitCode::SUCCESS)
        }
        Resolution::NotFound(exhausted) => {
            let tried: Vec<&str> = exhausted
                .attempts
                .iter()
                .map(|a| a.strategy.as_str())
                .collect();
            report_error(
                args.json,
                ErrorBody {
                    kind: ErrorKind::NotFound,
                    message: format!("no video found (tried: {})", tried.join(", ")),
                    retryable: exhausted.had_failures(),
                },
            );
            Ok(ExitCode::from(2))
        }
    }
}

fn print_reference(json: bool, reference: &VideoReference) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reference)?);
        return Ok(());
    }
    println!("{}", reference.video_url);
    eprintln!("Title: {}", reference.title);
    eprintln!("Platform: {}", reference.platform());
    if let Some(thumbnail) = &reference.thumbnail_url {
        eprintln!("Thumbnail: {}", thumbnail);
    }
    if let Some(target) = reference.delegation_target() {
        eprintln!("Delegates to: {} (use --follow)", target);
    }
    Ok(())
}

fn report_error(json: bool, body: ErrorBody) {
    if json {
        match serde_json::to_string(&body) {
            Ok(line) => println!("{}", line),
            Err(_) => eprintln!("{}: {}", body.kind.as_str(), body.message),
        }
    } else {
        eprintln!("Error ({}): {}", body.kind.as_str(), body.message);
        if body.retryable {
            eprintln!("A transient failure occurred; retrying may help.");
        }
    }
}
