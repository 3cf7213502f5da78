use clap::Parser;
use meansq::client::Client;
use meansq::config::ClientConfig;
use meansq::{logging, StopSignal};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let config = ClientConfig::parse();
    logging::init(&config.log_file())?;

    let stop = StopSignal::new();
    stop.install_ctrlc_handler()?;

    let result = Client::connect((config.host.as_str(), config.port), config.delay(), stop)
        .and_then(|client| client.run(&mut rand::thread_rng()));

    if let Err(e) = result {
        tracing::error!(error = ?e, "Client failed");
        return Err(e.into());
    }

    Ok(())
}
