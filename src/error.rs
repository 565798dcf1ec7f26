//! Error types for the IPMC tools

use std::path::PathBuf;
use thiserror::Error;

/// Main error type shared by the configurator, updater and info tools
#[derive(Error, Debug)]
pub enum IpmcError {
    // Input errors
    #[error("Could not find IPMC configuration file: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IPMC cannot be found for Apollo: {0}")]
    UnknownSerial(String),

    #[error("Invalid slot address given: {0}")]
    InvalidIpmbAddress(String),

    #[error("Invalid IP address for the shelf: {0}")]
    InvalidShelfAddress(String),

    #[error("Could not read the upgrade file {}: {reason}", path.display())]
    UpgradeFileNotFound { path: PathBuf, reason: String },

    // Connectivity errors
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed by IPMC")]
    ConnectionClosed,

    #[error("Command timed out: {0}")]
    Timeout(String),

    // Protocol errors
    #[error("Command '{command}' rejected by IPMC: {response}")]
    CommandRejected { command: String, response: String },

    #[error("EEPROM verification failed: {0}")]
    VerificationFailed(String),

    #[error("ipmitool failed: {0}")]
    IpmitoolFailed(String),

    #[error("Wrong FRU information for slot {slot}: {field} is '{actual}' (expected '{expected}')")]
    FruMismatch {
        slot: String,
        field: String,
        actual: String,
        expected: String,
    },

    #[error("Could not retrieve the Apollo SM number")]
    SerialNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IpmcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IpmcError::ConfigNotFound(PathBuf::from("config/missing.yaml"));
        assert!(err.to_string().contains("config/missing.yaml"));

        let err = IpmcError::CommandRejected {
            command: "idwr 7".to_string(),
            response: "error: bad id".to_string(),
        };
        assert!(err.to_string().contains("idwr 7"));
        assert!(err.to_string().contains("bad id"));

        let err = IpmcError::FruMismatch {
            slot: "0x9a".to_string(),
            field: "FRU Device Description".to_string(),
            actual: "Other".to_string(),
            expected: "Builtin FRU Device (ID 0)".to_string(),
        };
        assert!(err.to_string().contains("0x9a"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: IpmcError = io.into();
        assert!(matches!(err, IpmcError::Io(_)));
    }
}
