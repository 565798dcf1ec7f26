//! EEPROM configurator: push YAML field values to an IPMC over its console

use tracing::{info, warn};

use crate::config::ConfigureConfig;
use crate::eeprom::{self, EepromConfig};
use crate::error::Result;
use crate::ipmc_client::IpmcClient;
use crate::target::{Inventory, Target};

/// Outcome of a successful configurator run
#[derive(Debug, Clone)]
pub struct ConfigureReport {
    pub target: Target,
    /// Write commands in the order they were issued, without line terminators
    pub commands: Vec<String>,
    /// `eepromrd` output, when readback was requested
    pub eeprom_dump: Option<String>,
}

/// Load the configuration, connect to the IPMC and write every field.
///
/// All input is read and validated before the connection is opened. Writes
/// already applied are not undone when a later one fails.
pub async fn configure(config: &ConfigureConfig) -> Result<ConfigureReport> {
    let eeprom_config = EepromConfig::load(&config.config_path)?;
    if config.strict {
        eeprom_config.validate_complete()?;
    }
    // Readback expectations must be well formed before anything is written
    if config.verify {
        eeprom_config.expected_readback()?;
    }

    let inventory = match &config.inventory {
        Some(path) => Inventory::with_overrides(path)?,
        None => Inventory::builtin(),
    };
    let target = Target::resolve(&config.serial, config.host.as_deref(), config.port, &inventory)?;
    info!("Configuring IPMC for {} at {}", target.serial, target.endpoint());

    let mut client = IpmcClient::connect(&target.endpoint(), config.timeout).await?;
    info!("Executing update commands...");

    let mut commands = Vec::with_capacity(eeprom_config.fields().len());
    for (i, field) in eeprom_config.fields().iter().enumerate() {
        if i > 0 && !config.command_delay.is_zero() {
            tokio::time::sleep(config.command_delay).await;
        }

        let command = field.command();
        client.write_checked(&command).await?;
        info!(">> {} -> OK", command.trim_end());
        commands.push(command.trim_end().to_string());
    }

    let eeprom_dump = if config.verify {
        info!("Commands are done, reading back EEPROM");
        let dump = client.send_command(&format!("{}\r\n", eeprom::READ_COMMAND)).await?;
        eeprom::verify_readback(&dump, &eeprom_config)?;
        info!("EEPROM readback OK");
        Some(dump)
    } else {
        warn!("EEPROM readback skipped");
        None
    };

    Ok(ConfigureReport {
        target,
        commands,
        eeprom_dump,
    })
}
