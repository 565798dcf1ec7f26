//! Command line arguments and runtime configuration for the IPMC tools

use std::path::PathBuf;
use std::time::Duration;
use clap::{Args, Parser};

use crate::target::IPMC_CONSOLE_PORT;

/// Default location of the EEPROM configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/ipmc_config.yaml";

/// Logging options shared by every tool
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Command line arguments for `configure-ipmc`
#[derive(Parser, Debug)]
#[command(name = "configure-ipmc")]
#[command(about = "Write EEPROM configuration values to an Apollo SM IPMC")]
#[command(version)]
pub struct ConfigureArgs {
    /// Serial number of the Apollo SM (e.g. 203 or SM203)
    pub serial: String,

    /// Path to the IPMC config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: PathBuf,

    /// IPMC address to use instead of the serial number lookup
    #[arg(long)]
    pub host: Option<String>,

    /// IPMC console port
    #[arg(long, default_value_t = IPMC_CONSOLE_PORT)]
    pub port: u16,

    /// YAML file of extra `serial: address` entries
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Socket timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Pause between write commands in milliseconds
    #[arg(long, default_value_t = 500)]
    pub command_delay_ms: u64,

    /// Require every known EEPROM field to be present in the config
    #[arg(long)]
    pub strict: bool,

    /// Skip reading back and checking the EEPROM after writing
    #[arg(long)]
    pub no_verify: bool,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Command line arguments for `update-ipmc-fw`
#[derive(Parser, Debug)]
#[command(name = "update-ipmc-fw")]
#[command(about = "Upgrade and activate IPMC firmware through a shelf manager")]
#[command(version)]
pub struct UpdateArgs {
    /// Path to the .hpm file to be used to update IPMC firmware
    #[arg(short, long)]
    pub upgrade_file: PathBuf,

    /// The shelf IP address where the blades to update are located
    #[arg(short, long)]
    pub shelf: String,

    /// Slot IPMB addresses (hex, e.g. 0x9a) of the IPMCs to update
    #[arg(short, long, required = true, num_args = 1..)]
    pub ipmb: Vec<String>,

    /// Path to ipmitool binary (defaults to searching PATH)
    #[arg(long)]
    pub ipmitool: Option<PathBuf>,

    /// Do not check the FRU description before upgrading
    #[arg(long)]
    pub skip_fru_check: bool,

    /// Pause between upgrade and activate in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub activate_delay_ms: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Command line arguments for `get-ipmc-info`
#[derive(Parser, Debug)]
#[command(name = "get-ipmc-info")]
#[command(about = "Print the Apollo SM number an IPMC reports")]
#[command(version)]
pub struct InfoArgs {
    /// IP address of the IPMC to poll
    pub ipmc_ip_addr: String,

    /// IPMC console port
    #[arg(long, default_value_t = IPMC_CONSOLE_PORT)]
    pub port: u16,

    /// Socket timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub log: LogArgs,
}

/// Runtime configuration for the EEPROM configurator
#[derive(Debug, Clone)]
pub struct ConfigureConfig {
    pub serial: String,
    pub config_path: PathBuf,
    pub host: Option<String>,
    pub port: u16,
    pub inventory: Option<PathBuf>,
    pub timeout: Duration,
    pub command_delay: Duration,
    pub strict: bool,
    pub verify: bool,
}

impl ConfigureConfig {
    pub fn from_args(args: &ConfigureArgs) -> Self {
        Self {
            serial: args.serial.clone(),
            config_path: args.config_path.clone(),
            host: args.host.clone(),
            port: args.port,
            inventory: args.inventory.clone(),
            timeout: Duration::from_secs(args.timeout_secs),
            command_delay: Duration::from_millis(args.command_delay_ms),
            strict: args.strict,
            verify: !args.no_verify,
        }
    }
}

impl Default for ConfigureConfig {
    fn default() -> Self {
        Self {
            serial: String::new(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            host: None,
            port: IPMC_CONSOLE_PORT,
            inventory: None,
            timeout: Duration::from_secs(5),
            command_delay: Duration::from_millis(500),
            strict: false,
            verify: true,
        }
    }
}

/// Runtime configuration for the firmware updater
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub upgrade_file: PathBuf,
    pub shelf: String,
    pub slots: Vec<String>,
    pub ipmitool_path: Option<PathBuf>,
    pub check_fru: bool,
    pub activate_delay: Duration,
}

impl UpdateConfig {
    pub fn from_args(args: &UpdateArgs) -> Self {
        Self {
            upgrade_file: args.upgrade_file.clone(),
            shelf: args.shelf.clone(),
            slots: args.ipmb.clone(),
            ipmitool_path: args.ipmitool.clone(),
            check_fru: !args.skip_fru_check,
            activate_delay: Duration::from_millis(args.activate_delay_ms),
        }
    }

    /// Find ipmitool binary path: config, then PATH
    pub fn find_ipmitool(&self) -> Result<PathBuf, String> {
        if let Some(path) = &self.ipmitool_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(format!("Configured ipmitool path does not exist: {}", path.display()));
        }

        which("ipmitool").map_err(|_| {
            "ipmitool not found. Install it with your package manager (e.g. dnf install ipmitool)".to_string()
        })
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            upgrade_file: PathBuf::new(),
            shelf: String::new(),
            slots: Vec::new(),
            ipmitool_path: None,
            check_fru: true,
            activate_delay: Duration::from_secs(1),
        }
    }
}

/// Runtime configuration for the IPMC info tool
#[derive(Debug, Clone)]
pub struct InfoConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl InfoConfig {
    pub fn from_args(args: &InfoArgs) -> Self {
        Self {
            host: args.ipmc_ip_addr.clone(),
            port: args.port,
            timeout: Duration::from_secs(args.timeout_secs),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Find an executable on PATH
fn which(name: &str) -> Result<PathBuf, ()> {
    if let Ok(path_var) = std::env::var("PATH") {
        for dir in path_var.split(':') {
            let candidate = PathBuf::from(dir).join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_configure_args_defaults() {
        let args = ConfigureArgs::parse_from(["configure-ipmc", "203"]);
        assert_eq!(args.serial, "203");
        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(args.port, 23);
        assert_eq!(args.log.log_level, "info");
        assert!(!args.strict);

        let config = ConfigureConfig::from_args(&args);
        assert!(config.verify);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.command_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_configure_args_with_options() {
        let args = ConfigureArgs::parse_from([
            "configure-ipmc", "ABC123",
            "-c", "test_config.yaml",
            "--host", "127.0.0.1",
            "--port", "2323",
            "--command-delay-ms", "0",
            "--no-verify",
            "--log-level", "debug",
        ]);
        let config = ConfigureConfig::from_args(&args);
        assert_eq!(config.serial, "ABC123");
        assert_eq!(config.config_path, PathBuf::from("test_config.yaml"));
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, 2323);
        assert_eq!(config.command_delay, Duration::ZERO);
        assert!(!config.verify);
        assert_eq!(args.log.log_level, "debug");
    }

    #[test]
    fn test_configure_args_requires_serial() {
        assert!(ConfigureArgs::try_parse_from(["configure-ipmc"]).is_err());
    }

    #[test]
    fn test_update_args() {
        let args = UpdateArgs::parse_from([
            "update-ipmc-fw",
            "-u", "ipmc.hpm",
            "-s", "192.168.10.171",
            "-i", "0x9a", "0x9c",
        ]);
        let config = UpdateConfig::from_args(&args);
        assert_eq!(config.upgrade_file, PathBuf::from("ipmc.hpm"));
        assert_eq!(config.shelf, "192.168.10.171");
        assert_eq!(config.slots, vec!["0x9a", "0x9c"]);
        assert!(config.check_fru);
        assert_eq!(config.activate_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_update_args_require_all_options() {
        assert!(UpdateArgs::try_parse_from(["update-ipmc-fw", "-u", "a.hpm", "-s", "10.0.0.1"]).is_err());
        assert!(UpdateArgs::try_parse_from(["update-ipmc-fw", "-s", "10.0.0.1", "-i", "0x9a"]).is_err());
    }

    #[test]
    fn test_info_args() {
        let args = InfoArgs::parse_from(["get-ipmc-info", "192.168.22.34"]);
        let config = InfoConfig::from_args(&args);
        assert_eq!(config.endpoint(), "192.168.22.34:23");
    }

    #[test]
    fn test_which_finds_sh() {
        assert!(which("sh").is_ok());
    }

    #[test]
    fn test_which_nonexistent() {
        assert!(which("nonexistent_binary_12345").is_err());
    }

    #[test]
    fn test_find_ipmitool_with_bad_path() {
        let config = UpdateConfig {
            ipmitool_path: Some(PathBuf::from("/nonexistent/ipmitool")),
            ..UpdateConfig::default()
        };
        assert!(config.find_ipmitool().is_err());
    }
}
