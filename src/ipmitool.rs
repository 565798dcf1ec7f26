//! ipmitool CLI wrapper for shelf-routed IPMC operations
//!
//! Every request goes to the shelf manager over LAN and is bridged to the
//! slot's IPMC with `-t <ipmb>`. The IPMI framing itself is ipmitool's job.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{IpmcError, Result};
use crate::target::IpmbAddress;

/// FRU fields an IPMC must report before it is allowed to take an upgrade
pub const EXPECTED_FRU: &[(&str, &str)] = &[
    ("FRU Device Description", "Builtin FRU Device (ID 0)"),
];

/// ipmitool bound to one shelf manager
#[derive(Debug, Clone)]
pub struct Ipmitool {
    program: PathBuf,
    shelf: Ipv4Addr,
}

impl Ipmitool {
    pub fn new(program: impl Into<PathBuf>, shelf: Ipv4Addr) -> Self {
        Self {
            program: program.into(),
            shelf,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn shelf(&self) -> Ipv4Addr {
        self.shelf
    }

    /// `ipmitool -H <shelf> -P "" -t <slot>`
    fn command(&self, slot: IpmbAddress) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-H").arg(self.shelf.to_string())
            .arg("-P").arg("")
            .arg("-t").arg(slot.to_string());
        cmd
    }

    /// Read the FRU inventory of the IPMC in `slot`
    pub async fn fru(&self, slot: IpmbAddress) -> Result<String> {
        debug!("ipmitool fru ({})", slot);

        let output = self.command(slot)
            .arg("fru")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| IpmcError::IpmitoolFailed(format!("Failed to run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = latin1(&output.stderr);
            return Err(IpmcError::IpmitoolFailed(format!(
                "fru for slot {} exited with {}: {}",
                slot,
                output.status,
                stderr.trim()
            )));
        }

        Ok(latin1(&output.stdout))
    }

    /// Upload an HPM image to the IPMC in `slot`; ipmitool output goes to the terminal
    pub async fn hpm_upgrade(&self, slot: IpmbAddress, upgrade_file: &Path) -> Result<()> {
        info!("ipmitool hpm upgrade {} ({})", upgrade_file.display(), slot);

        let status = self.command(slot)
            .arg("hpm").arg("upgrade").arg(upgrade_file)
            .status()
            .await
            .map_err(|e| IpmcError::IpmitoolFailed(format!("Failed to run {}: {}", self.program.display(), e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(IpmcError::IpmitoolFailed(format!(
                "hpm upgrade for slot {} exited with {}",
                slot, status
            )))
        }
    }

    /// Activate the firmware previously uploaded to `slot`
    pub async fn hpm_activate(&self, slot: IpmbAddress) -> Result<()> {
        info!("ipmitool hpm activate ({})", slot);

        let status = self.command(slot)
            .arg("hpm").arg("activate")
            .status()
            .await
            .map_err(|e| IpmcError::IpmitoolFailed(format!("Failed to run {}: {}", self.program.display(), e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(IpmcError::IpmitoolFailed(format!(
                "hpm activate for slot {} exited with {}",
                slot, status
            )))
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Split `ipmitool fru` output into `(name, value)` rows
pub fn parse_fru(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|row| {
            let mut parts = row.split(':');
            let name = parts.next()?.trim();
            let value = parts.next()?.trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Check the FRU rows against `EXPECTED_FRU`
pub fn validate_fru(slot: IpmbAddress, output: &str) -> Result<()> {
    for (name, value) in parse_fru(output) {
        let Some((_, expected)) = EXPECTED_FRU.iter().find(|(field, _)| *field == name) else {
            continue;
        };
        if value != *expected {
            return Err(IpmcError::FruMismatch {
                slot: slot.to_string(),
                field: name,
                actual: value,
                expected: expected.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRU_OUTPUT: &str = "\
FRU Device Description : Builtin FRU Device (ID 0)
 Board Mfg Date        : Mon Jan  1 00:00:00 1996
 Board Mfg             : Boston University
 Board Product         : Apollo SM
";

    #[test]
    fn test_parse_fru() {
        let rows = parse_fru(FRU_OUTPUT);
        assert_eq!(rows[0], ("FRU Device Description".to_string(), "Builtin FRU Device (ID 0)".to_string()));
        assert_eq!(rows[2], ("Board Mfg".to_string(), "Boston University".to_string()));
        // Only the text up to the next ':' is kept as the value
        assert_eq!(rows[1].1, "Mon Jan  1 00");
    }

    #[test]
    fn test_parse_fru_skips_rows_without_separator() {
        assert!(parse_fru("\nno separator here\n").is_empty());
    }

    #[test]
    fn test_validate_fru_ok() {
        assert!(validate_fru(IpmbAddress(0x9a), FRU_OUTPUT).is_ok());
    }

    #[test]
    fn test_validate_fru_mismatch() {
        let output = FRU_OUTPUT.replace("Builtin FRU Device (ID 0)", "Shelf FRU Info (ID 1)");
        let err = validate_fru(IpmbAddress(0x9a), &output).unwrap_err();
        assert!(matches!(err, IpmcError::FruMismatch { ref slot, .. } if slot == "0x9a"));
    }

    #[test]
    fn test_latin1_decoding() {
        assert_eq!(latin1(&[0x41, 0xe9]), "Aé");
    }

    #[test]
    fn test_accessors() {
        let tool = Ipmitool::new("/usr/bin/ipmitool", Ipv4Addr::new(192, 168, 10, 171));
        assert_eq!(tool.program(), Path::new("/usr/bin/ipmitool"));
        assert_eq!(tool.shelf().to_string(), "192.168.10.171");
    }
}
