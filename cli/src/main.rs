use clap::Parser;
mod app;
mod commands;
use commands::cli;
use querymix_core::config::LoggingConfig;
use querymix_core::error;
use querymix_core::{APP_LOG_TARGET, ENGINE_LOG_TARGET};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing::Subscriber;
use tracing_subscriber::filter::{Directive, LevelFilter, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static LOG_GUARDS: std::sync::OnceLock<Vec<WorkerGuard>> = std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let mut args = cli::Args::parse();
    let cfg = querymix_core::load_config(args.config.as_deref())?;
    init_tracing(&cfg.logging).map_err(error::CliError::Logging)?;

    match args.command.take() {
        Some(cli::Commands::Run(run_args)) => app::run_command(cfg, run_args).await,
        Some(cli::Commands::Plan) => app::plan_command(&cfg),
        None => app::run_command(cfg, cli::RunArgs::default()).await,
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: engine setup / logging / IO error
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Engine(_) => 20,
        error::CliError::Logging(_) => 20,
        error::CliError::Io(_) => 20,
        error::CliError::Run(_) => 50,
        error::CliError::Anyhow(_) => 50,
    }
}

fn file_writer(
    dir: &std::path::Path,
    file_name: &str,
    guards: &mut Vec<WorkerGuard>,
) -> NonBlocking {
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    guards.push(guard);
    non_blocking
}

/// Console filter: `RUST_LOG` or `logging.level`, with per-task outcome lines
/// kept to the app log unless they are errors.
fn console_filter(level: &str, rust_log: Option<String>) -> Result<EnvFilter, String> {
    let base = match rust_log {
        Some(v) if !v.trim().is_empty() => EnvFilter::try_new(v),
        _ => EnvFilter::try_new(level),
    }
    .map_err(|e| e.to_string())?;
    let app_errors_only = format!("{APP_LOG_TARGET}=error")
        .parse::<Directive>()
        .map_err(|e| e.to_string())?;
    Ok(base.add_directive(app_errors_only))
}

fn build_subscriber<W>(
    logging: &LoggingConfig,
    rust_log: Option<String>,
    console: W,
    ansi: bool,
) -> Result<(impl Subscriber + Send + Sync + 'static, Vec<WorkerGuard>), String>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = console_filter(&logging.level, rust_log)?;

    let mut guards = Vec::with_capacity(2);
    let mut writers = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => PathBuf::from(d),
            None => PathBuf::from("."),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let app = file_writer(&dir, "app.log", &mut guards);
        let engine = file_writer(&dir, "engine.log", &mut guards);
        writers = Some((app, engine));
    }

    if !logging.console && writers.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(console)
            .with_ansi(ansi)
            .with_filter(filter)
    });

    // File sinks ignore `logging.level`; each keeps its own target at debug.
    let (app_writer, engine_writer) = writers.unzip();
    let app_layer = app_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_filter(Targets::new().with_target(APP_LOG_TARGET, LevelFilter::DEBUG))
    });
    let engine_layer = engine_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .with_filter(Targets::new().with_target(ENGINE_LOG_TARGET, LevelFilter::DEBUG))
    });

    let subscriber = tracing_subscriber::registry()
        .with(console_layer)
        .with(app_layer)
        .with(engine_layer);
    Ok((subscriber, guards))
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let (subscriber, guards) = build_subscriber(
        logging,
        std::env::var("RUST_LOG").ok(),
        std::io::stderr,
        atty::is(atty::Stream::Stderr),
    )?;
    let _ = LOG_GUARDS.set(guards);
    subscriber.try_init().map_err(|e| e.to_string())
}
