//! update-ipmc-fw: upgrade and activate IPMC firmware through a shelf manager

use clap::Parser;
use std::process;
use tracing::{error, info};

use ipmc_tools::logging::init_logging;
use ipmc_tools::updater;
use ipmc_tools::{UpdateArgs, UpdateConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = UpdateArgs::parse();
    if let Err(e) = init_logging(&args.log) {
        eprintln!("update-ipmc-fw: failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Starting update-ipmc-fw v{}", env!("CARGO_PKG_VERSION"));

    let config = UpdateConfig::from_args(&args);
    let report = match updater::update(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    for outcome in &report.outcomes {
        println!("{}", outcome);
    }

    if !report.is_success() {
        eprintln!("error: not every slot was upgraded and activated");
        process::exit(1);
    }
}
