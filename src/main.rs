//! INSECURE API DEMO - FOR EDUCATIONAL PURPOSES ONLY
//!
//! Serves a user API over an in-memory mock dataset with its security flaws
//! left in on purpose: SQL injection, missing authentication and
//! authorization, IDOR, mass assignment, sensitive data exposure and leaked
//! stack traces. Do not deploy it anywhere reachable.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

mod api;
mod config;
mod handler;
mod http;
mod logger;
mod server;
mod store;

const USAGE: &str = "usage: insecure_api [CONFIG] [--event <FILE|->]";

/// Command line arguments
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    /// Config file path without extension
    config_path: Option<String>,
    /// Process one API Gateway event instead of serving HTTP
    event_path: Option<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut config_path = None;
    let mut event_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--event" => {
                event_path = Some(args.next().ok_or_else(|| format!("--event needs a file\n{USAGE}"))?);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}\n{USAGE}")),
            _ if config_path.is_none() => config_path = Some(arg),
            _ => return Err(format!("unexpected argument {arg}\n{USAGE}")),
        }
    }

    Ok(CliArgs {
        config_path,
        event_path,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    let cfg = match args.config_path.as_deref() {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };
    logger::init(&cfg)?;
    let store = build_store(&cfg)?;

    if let Some(event_path) = args.event_path {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        return runtime.block_on(run_event(&event_path, store, &cfg));
    }

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, store))
}

/// Seed the store from the configured file, or the built-in users
fn build_store(cfg: &config::Config) -> Result<store::UserStore, store::SeedError> {
    let seed = match cfg.data.seed_file.as_deref() {
        Some(path) => store::load_seed_file(path)?,
        None => store::builtin_users(),
    };
    Ok(store::UserStore::new(seed, store::MockSecrets::default()))
}

/// Run a single API Gateway proxy event and print the proxy response
async fn run_event(
    event_path: &str,
    store: store::UserStore,
    cfg: &config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if event_path == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(event_path)?
    };
    let event: serde_json::Value = serde_json::from_str(&raw)?;

    let store = RwLock::new(store);
    let access_log_format = cfg
        .logging
        .access_log
        .then_some(cfg.logging.access_log_format.as_str());
    let response = api::event::handle_event(&event, &store, access_log_format).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn async_main(
    cfg: config::Config,
    store: store::UserStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr, cfg.performance.backlog)?;

    let state = Arc::new(config::AppState::new(&cfg, store));
    let active_connections = Arc::new(AtomicUsize::new(0));
    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    logger::log_server_start(&addr, &cfg);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            state,
            active_connections,
            signals,
        ))
        .await
}
