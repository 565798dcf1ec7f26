//! configure-ipmc: write EEPROM configuration to an Apollo SM IPMC

use clap::Parser;
use std::process;
use tracing::{error, info};

use ipmc_tools::configurator;
use ipmc_tools::logging::init_logging;
use ipmc_tools::{ConfigureArgs, ConfigureConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = ConfigureArgs::parse();
    if let Err(e) = init_logging(&args.log) {
        eprintln!("configure-ipmc: failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Starting configure-ipmc v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigureConfig::from_args(&args);
    match configurator::configure(&config).await {
        Ok(report) => {
            if let Some(dump) = &report.eeprom_dump {
                println!("EEPROM reads as:\n{}", dump.trim_end());
            }
            info!("{} fields written to {}", report.commands.len(), report.target.endpoint());
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
