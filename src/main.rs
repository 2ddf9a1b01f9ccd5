use clap::Parser;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod cli;
mod config;
mod handler;
mod http;
mod logger;
mod preload;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = cli::Cli::parse();
    let cfg = config::Config::from_cli(&cli)?;

    logger::init(&cfg)?;

    let root = config::StaticRoot::from_working_dir(&cfg.static_files.root)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, root))
}

async fn async_main(
    cfg: config::Config,
    root: config::StaticRoot,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let local_addr = listener.local_addr()?;

    logger::log_server_start(&local_addr, &cfg, &root);

    let state = Arc::new(config::AppState::new(cfg, root, local_addr));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run_server(listener, state, active_connections))
        .await;

    Ok(())
}
