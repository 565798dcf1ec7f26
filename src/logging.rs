//! Logging setup shared by the IPMC tool binaries

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogArgs;

/// Install the global tracing subscriber; `RUST_LOG` overrides `--log-level`.
pub fn init_logging(args: &LogArgs) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        subscriber.with_writer(std::sync::Mutex::new(file)).with_ansi(false).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    debug!("Logging initialized with level: {}", args.log_level);
    Ok(())
}
