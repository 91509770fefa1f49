mod cli;
mod config;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use tokio::signal::ctrl_c;

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid --listen address");
            return ExitCode::FAILURE;
        }
    };

    let listen_addr = config.listen_addr;
    let bootstrap_config = config.bootstrap_config();

    let shutdown = async {
        let _ = ctrl_c().await;
    };

    match fractonkv_core::bootstrap::run(listen_addr, bootstrap_config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
