//! Target descriptors: which IPMC or shelf slot a run addresses

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::debug;

use crate::error::{IpmcError, Result};

/// Telnet console port on the IPMC
pub const IPMC_CONSOLE_PORT: u16 = 23;

/// Known Service Module serials and the IPMC address each one is reachable at
const SM_TO_IPMC: &[(&str, &str)] = &[
    ("SM203", "192.168.21.5"),
    ("SM204", "192.168.22.34"),
    ("SM207", "192.168.22.32"),
    ("SM208", "192.168.22.41"),
    ("SM209", "192.168.22.37"),
    ("SM211", "192.168.22.42"),
    ("SM212", "192.168.22.3"),
];

/// Serial number → IPMC address lookup table
#[derive(Debug, Clone)]
pub struct Inventory {
    entries: BTreeMap<String, String>,
}

impl Inventory {
    /// Inventory holding only the built-in Service Module table
    pub fn builtin() -> Self {
        let entries = SM_TO_IPMC
            .iter()
            .map(|(sm, ip)| (sm.to_string(), ip.to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in table extended (and overridden) by a YAML `serial: address` file
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IpmcError::ConfigNotFound(path.to_path_buf()),
            _ => IpmcError::Io(e),
        })?;
        let extra: BTreeMap<String, String> = serde_yaml::from_str(&contents)
            .map_err(|e| IpmcError::ConfigParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut inventory = Self::builtin();
        for (serial, address) in extra {
            debug!("Inventory override: {} -> {}", serial, address);
            inventory.entries.insert(normalize_serial(&serial), address);
        }
        Ok(inventory)
    }

    /// Look up the IPMC address for a serial; bare numbers are read as `SM<n>`
    pub fn lookup(&self, serial: &str) -> Option<&str> {
        self.entries.get(&normalize_serial(serial)).map(String::as_str)
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_serial(serial: &str) -> String {
    let serial = serial.trim();
    if !serial.is_empty() && serial.chars().all(|c| c.is_ascii_digit()) {
        format!("SM{}", serial)
    } else {
        serial.to_string()
    }
}

/// Resolved IPMC console endpoint for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub serial: String,
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Resolve the endpoint: an explicit host wins, otherwise the inventory decides
    pub fn resolve(
        serial: &str,
        host: Option<&str>,
        port: u16,
        inventory: &Inventory,
    ) -> Result<Self> {
        let host = match host {
            Some(h) => h.to_string(),
            None => inventory
                .lookup(serial)
                .ok_or_else(|| IpmcError::UnknownSerial(normalize_serial(serial)))?
                .to_string(),
        };

        Ok(Self {
            serial: serial.to_string(),
            host,
            port,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Slot address of an IPMC on the shelf's IPMB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpmbAddress(pub u8);

impl IpmbAddress {
    /// Parse a `0x`-prefixed hex slot address (e.g. "0x9a")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| IpmcError::InvalidIpmbAddress(s.to_string()))?;
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IpmcError::InvalidIpmbAddress(s.to_string()));
        }
        u8::from_str_radix(hex, 16)
            .map(IpmbAddress)
            .map_err(|_| IpmcError::InvalidIpmbAddress(s.to_string()))
    }
}

impl fmt::Display for IpmbAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Parse and validate the shelf manager address
pub fn parse_shelf_address(s: &str) -> Result<Ipv4Addr> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| IpmcError::InvalidShelfAddress(s.to_string()))
}
