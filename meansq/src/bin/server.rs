use clap::Parser;
use meansq::config::ServerConfig;
use meansq::{logging, server, StopSignal};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::parse();
    logging::init(&config.log_file)?;

    let stop = StopSignal::new();
    stop.install_ctrlc_handler()?;
    tracing::info!("Server running. Press Ctrl-C to stop.");

    if let Err(e) = server::run_service(&config, stop) {
        tracing::error!(error = ?e, "Server failed");
        return Err(e.into());
    }

    Ok(())
}
