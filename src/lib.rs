//! IPMC Tools
//!
//! Command-line utilities for Apollo Service Module IPMCs: write EEPROM
//! configuration over the IPMC telnet console, upgrade IPMC firmware through a
//! shelf manager with ipmitool, and read back the SM number an IPMC reports.

pub mod config;
pub mod configurator;
pub mod eeprom;
pub mod error;
pub mod info;
pub mod ipmc_client;
pub mod ipmitool;
pub mod logging;
pub mod target;
pub mod updater;

pub use config::{ConfigureArgs, ConfigureConfig, InfoArgs, InfoConfig, UpdateArgs, UpdateConfig};
pub use error::{IpmcError, Result};
