use clap::Parser;
use std::sync::Arc;

use fsrouter::config::{AppState, Cli, Config};
use fsrouter::middleware::HandlerRegistry;
use fsrouter::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    logger::init(&config)?;

    // Connections are served with spawn_local, so one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = AppState::build(config, HandlerRegistry::with_builtins())
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    logger::log_server_start(&addr, &state.config);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            Arc::new(state),
            Arc::clone(&signals.shutdown),
        ))
        .await;

    tracing::info!("server stopped");
    Ok(())
}
