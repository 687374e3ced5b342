//! nodectld entry point.
//!
//! Loads the configuration, registers the control commands, and serves them
//! on a Unix socket until `stop` is called or the process is interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nodectl_server::{RpcServer, ServerConfig, TokioTimerBackend, socket};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// nodectld - control-plane JSON-RPC server
#[derive(Parser, Debug)]
#[command(name = "nodectld")]
#[command(version, about, long_about = None)]
struct Args {
    /// Custom socket path (defaults to `$XDG_RUNTIME_DIR/nodectl.sock` or the temp dir)
    #[arg(long, value_name = "PATH")]
    socket_path: Option<PathBuf>,

    /// Config file (defaults to `<config dir>/nodectl/config.json`)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Stderr formatting layer, generic over the subscriber it is stacked on.
fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
}

/// Install the tracing subscriber.
///
/// Debug builds log at `debug` to stderr and to a timestamped file in the temp
/// dir; the returned guard must live until exit so the file writer flushes.
/// Release builds log at `info` to stderr only.
fn setup_logging() -> Option<WorkerGuard> {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nodectl={level}")));

    if !cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(stderr_layer())
            .with(filter)
            .init();
        return None;
    }

    let log_dir = std::env::temp_dir();
    let log_name = format!("nodectld-{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, &log_name));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(stderr_layer())
        .with(filter)
        .init();

    eprintln!("Logging to: {} (and stderr)", log_dir.join(&log_name).display());
    Some(guard)
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    match path.or_else(ServerConfig::default_path) {
        Some(path) => ServerConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging();

    let config = load_config(args.config)?;
    let path = args
        .socket_path
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(nodectl_rpc::socket_path);

    info!("Starting nodectld...");

    let server = Arc::new(RpcServer::with_config(config));
    server
        .timers()
        .set_backend_if_unset(Arc::new(TokioTimerBackend::new(
            tokio::runtime::Handle::current(),
        )));

    let listener = socket::bind(&path)
        .await
        .with_context(|| format!("Failed to bind {}", path.display()))?;

    server.start();
    server.warmup().set_status("Done loading");
    server.warmup().finish();

    let serving = tokio::spawn(socket::serve(Arc::clone(&server), listener, path));

    let shutdown = server.shutdown_token();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            server.request_shutdown();
        }
        () = shutdown.cancelled() => {}
    }

    server.interrupt();
    serving.await.context("Socket server task failed")??;
    server.stop();

    info!("nodectld stopped");
    Ok(())
}
