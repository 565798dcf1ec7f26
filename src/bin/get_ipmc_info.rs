//! get-ipmc-info: print the Apollo SM number stored on an IPMC

use clap::Parser;
use std::process;
use tracing::error;

use ipmc_tools::info;
use ipmc_tools::logging::init_logging;
use ipmc_tools::{InfoArgs, InfoConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = InfoArgs::parse();
    if let Err(e) = init_logging(&args.log) {
        eprintln!("get-ipmc-info: failed to initialize logging: {}", e);
        process::exit(1);
    }

    let config = InfoConfig::from_args(&args);
    match info::sm_number(&config).await {
        Ok(number) => println!("{}", number),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
