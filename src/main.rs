use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tokio::sync::watch;
use twitcast_rec::{
    config::{Args, Config},
    orchestrator::Orchestrator,
    probe::ConnectivityProbe,
    recorder::StreamRecorder,
    status::StatusResolver,
    util,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from(Args::parse());

    let client = match util::HttpClient::new(cfg.timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Could not create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // First Ctrl-C closes the current recording through its normal close
    // path, a second one exits immediately.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupted, finishing up");
        shutdown_tx.send_replace(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Interrupted again, exiting");
            std::process::exit(130);
        }
    });

    let mut orchestrator = Orchestrator::new(
        cfg.target.clone(),
        cfg.interval,
        ConnectivityProbe::new(&client, cfg.probe_url.as_str()),
        StatusResolver::new(&client, cfg.base_url.as_str()),
        StreamRecorder::new(cfg.output_dir.clone(), cfg.origin.as_str(), cfg.timeout),
    );

    match orchestrator.run(shutdown_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
