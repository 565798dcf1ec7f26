//! EEPROM configuration model
//!
//! Loads the YAML field/value file, turns each field into an IPMC console
//! write command, and checks an `eepromrd` dump against the requested values.

use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{IpmcError, Result};

/// Console command that dumps the EEPROM contents
pub const READ_COMMAND: &str = "eepromrd";

/// Known EEPROM fields and the console command that writes each one
const FIELD_COMMANDS: &[(&str, &str)] = &[
    ("board.serial", "idwr"),
    ("board.rev", "revwr"),
    ("eeprom.version", "verwr"),
    ("zynq.bootmode", "bootmode"),
    ("mac.eth0", "ethmacwr 0"),
    ("mac.eth1", "ethmacwr 1"),
];

/// Console write command for a field name, if the field is a known one
pub fn command_for(field: &str) -> Option<&'static str> {
    FIELD_COMMANDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, cmd)| *cmd)
}

/// One field/value pair from the configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromField {
    /// Field name; section children are dotted (`board.serial`)
    pub name: String,
    /// Value as written in the file
    pub value: String,
}

impl EepromField {
    /// The console line that writes this field, `\r\n` terminated
    pub fn command(&self) -> String {
        let base = command_for(&self.name).unwrap_or(self.name.as_str());
        // MAC addresses are entered as space separated octets
        let value = self.value.replace(':', " ");
        format!("{} {}\r\n", base, value)
    }
}

/// Ordered set of EEPROM fields to write
#[derive(Debug, Clone, Default)]
pub struct EepromConfig {
    fields: Vec<EepromField>,
}

impl EepromConfig {
    /// Load the configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IpmcError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|e| match e {
            IpmcError::InvalidConfig(reason) => IpmcError::ConfigParse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse YAML text; top-level scalars are fields, top-level mappings are sections
    pub fn parse(contents: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(contents)
            .map_err(|e| IpmcError::InvalidConfig(e.to_string()))?;

        let mapping = match doc {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => {
                return Err(IpmcError::InvalidConfig(
                    "top level must be a mapping of field names to values".to_string(),
                ))
            }
        };

        let mut fields = Vec::new();
        for (key, value) in &mapping {
            let key = key_name(key)?;
            match value {
                Value::Mapping(section) => {
                    for (sub, sub_value) in section {
                        let name = format!("{}.{}", key, key_name(sub)?);
                        let value = scalar_text(&name, sub_value)?;
                        fields.push(EepromField { name, value });
                    }
                }
                other => {
                    let value = scalar_text(&key, other)?;
                    fields.push(EepromField { name: key, value });
                }
            }
        }

        if fields.is_empty() {
            warn!("IPMC configuration contains no fields");
        }
        debug!("Loaded {} EEPROM fields", fields.len());
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[EepromField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Write commands in file order
    pub fn commands(&self) -> Vec<String> {
        self.fields.iter().map(EepromField::command).collect()
    }

    /// Require every known field to be present
    pub fn validate_complete(&self) -> Result<()> {
        for &(name, _) in FIELD_COMMANDS {
            if self.get(name).is_none() {
                let (section, key) = name.split_once('.').unwrap_or(("", name));
                return Err(IpmcError::InvalidConfig(format!(
                    "Sub-key cannot be found: {} (under {})",
                    key, section
                )));
            }
        }
        Ok(())
    }

    /// `eepromrd` keys and the text each should read back as
    ///
    /// Only fields that have a readback representation are included.
    pub fn expected_readback(&self) -> Result<Vec<(&'static str, String)>> {
        let mut expected = Vec::new();

        if let Some(v) = self.get("eeprom.version") {
            expected.push(("prom version", format!("0x{:02X}", parse_int("eeprom.version", v)?)));
        }
        if let Some(v) = self.get("zynq.bootmode") {
            expected.push(("bootmode", format!("0x{:02X}", parse_int("zynq.bootmode", v)?)));
        }
        if let (Some(rev), Some(serial)) = (self.get("board.rev"), self.get("board.serial")) {
            expected.push(("hw", format!("rev{} #{}", rev, serial)));
        }
        if let Some(v) = self.get("mac.eth0") {
            expected.push(("eth0_mac", v.to_string()));
        }
        if let Some(v) = self.get("mac.eth1") {
            expected.push(("eth1_mac", v.to_string()));
        }

        Ok(expected)
    }
}

fn key_name(key: &Value) -> Result<String> {
    let name = match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Err(IpmcError::InvalidConfig(format!("unsupported key: {:?}", key))),
    };
    single_line(&name, &name)?;
    Ok(name)
}

fn scalar_text(field: &str, value: &Value) -> Result<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar_text(field, &tagged.value),
        _ => {
            return Err(IpmcError::InvalidConfig(format!(
                "value for '{}' must be a string, number or boolean",
                field
            )))
        }
    };
    single_line(field, &text)?;
    Ok(text)
}

/// Each field must go out as exactly one console line
fn single_line(field: &str, text: &str) -> Result<()> {
    if text.chars().any(char::is_control) {
        return Err(IpmcError::InvalidConfig(format!(
            "'{}' contains control characters: {:?}",
            field, text
        )));
    }
    Ok(())
}

fn parse_int(field: &str, value: &str) -> Result<u64> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => v.parse::<u64>(),
    };
    parsed.map_err(|_| {
        IpmcError::InvalidConfig(format!("'{}' must be an integer, got '{}'", field, value))
    })
}

/// Extract `key = value` pairs from `eepromrd` output
pub fn parse_eeprom_dump(output: &str) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for line in output.lines() {
        if !line.contains('=') {
            continue;
        }
        let mut parts = line.split('=');
        let key = parts.next().unwrap_or_default().trim();
        let value = parts.last().unwrap_or_default().trim();
        mapping.insert(key.to_string(), value.to_string());
    }
    mapping
}

/// Compare an `eepromrd` dump against the configured values
pub fn verify_readback(output: &str, config: &EepromConfig) -> Result<()> {
    let mapping = parse_eeprom_dump(output);

    for (key, expected) in config.expected_readback()? {
        match mapping.get(key) {
            None => {
                return Err(IpmcError::VerificationFailed(format!("Key not found: {}", key)));
            }
            Some(actual) if *actual != expected => {
                return Err(IpmcError::VerificationFailed(format!(
                    "Key value does not match: {} (read '{}', expected '{}')",
                    key, actual, expected
                )));
            }
            Some(_) => debug!("Readback OK: {} = {}", key, expected),
        }
    }
    Ok(())
}

/// Apollo SM number from the `hw  = revN #NNN` line of an `eepromrd` dump
pub fn parse_sm_number(output: &str) -> Result<u32> {
    let mut sm_number = None;
    for line in output.lines() {
        if !(line.starts_with("hw") && line.contains('#')) {
            continue;
        }
        let last = line.split_whitespace().last().unwrap_or_default();
        if let Some((_, rest)) = last.split_once('#') {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(n) = digits.parse::<u32>() {
                sm_number = Some(n);
            }
        }
    }
    sm_number.ok_or(IpmcError::SerialNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APOLLO_CONFIG: &str = "\
board:
  serial: 203
  rev: 2
eeprom:
  version: 1
zynq:
  bootmode: 3
mac:
  eth0: 00:50:51:FF:10:CB
  eth1: 00:50:51:FF:20:CB
";

    const EEPROM_DUMP: &str = "\
prom version = 0x01
bootmode     = 0x03
hw           = rev2 #203
eth0_mac     = 00:50:51:FF:10:CB
eth1_mac     = 00:50:51:FF:20:CB
";

    #[test]
    fn test_parse_sections_in_file_order() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        let names: Vec<&str> = config.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["board.serial", "board.rev", "eeprom.version", "zynq.bootmode", "mac.eth0", "mac.eth1"]
        );
        assert!(config.validate_complete().is_ok());
    }

    #[test]
    fn test_commands_for_known_fields() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        let commands = config.commands();
        assert_eq!(commands[0], "idwr 203\r\n");
        assert_eq!(commands[1], "revwr 2\r\n");
        assert_eq!(commands[2], "verwr 1\r\n");
        assert_eq!(commands[3], "bootmode 3\r\n");
        assert_eq!(commands[4], "ethmacwr 0 00 50 51 FF 10 CB\r\n");
        assert_eq!(commands[5], "ethmacwr 1 00 50 51 FF 20 CB\r\n");
    }

    #[test]
    fn test_flat_field_passthrough() {
        let config = EepromConfig::parse("board_name: Test\n").unwrap();
        assert_eq!(config.fields().len(), 1);
        assert_eq!(config.commands(), vec!["board_name Test\r\n".to_string()]);
        assert!(config.expected_readback().unwrap().is_empty());
    }

    #[test]
    fn test_validate_complete_missing_key() {
        let config = EepromConfig::parse("board:\n  serial: 203\n").unwrap();
        let err = config.validate_complete().unwrap_err();
        assert!(err.to_string().contains("rev"));
    }

    #[test]
    fn test_rejects_non_scalar_values() {
        assert!(EepromConfig::parse("board_name: [a, b]\n").is_err());
        assert!(EepromConfig::parse("board:\n  serial:\n    nested: 1\n").is_err());
        assert!(EepromConfig::parse("- a\n- b\n").is_err());
        assert!(EepromConfig::parse("board: [unclosed\n").is_err());
    }

    #[test]
    fn test_rejects_multiline_values() {
        let err = EepromConfig::parse("board_name: \"Test\\r\\nidwr 999\"\n").unwrap_err();
        assert!(matches!(err, IpmcError::InvalidConfig(ref m) if m.contains("board_name")));
        assert!(EepromConfig::parse("board:\n  rev: \"2\\n\"\n").is_err());
        assert!(EepromConfig::parse("\"board\\nname\": Test\n").is_err());
        assert!(EepromConfig::parse("board_name: \"Test\\tA\"\n").is_err());
    }

    #[test]
    fn test_empty_file_has_no_fields() {
        let config = EepromConfig::parse("").unwrap();
        assert!(config.fields().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EepromConfig::load(Path::new("/nonexistent/ipmc_config.yaml")).unwrap_err();
        assert!(matches!(err, IpmcError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "board: [unclosed\n").unwrap();
        let err = EepromConfig::load(&path).unwrap_err();
        assert!(matches!(err, IpmcError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_expected_readback() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        let expected = config.expected_readback().unwrap();
        assert!(expected.contains(&("prom version", "0x01".to_string())));
        assert!(expected.contains(&("bootmode", "0x03".to_string())));
        assert!(expected.contains(&("hw", "rev2 #203".to_string())));
    }

    #[test]
    fn test_expected_readback_hex_value() {
        let config = EepromConfig::parse("zynq:\n  bootmode: \"0x1f\"\n").unwrap();
        let expected = config.expected_readback().unwrap();
        assert_eq!(expected, vec![("bootmode", "0x1F".to_string())]);
    }

    #[test]
    fn test_verify_readback_ok() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        assert!(verify_readback(EEPROM_DUMP, &config).is_ok());
    }

    #[test]
    fn test_verify_readback_mismatch() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        let dump = EEPROM_DUMP.replace("#203", "#204");
        let err = verify_readback(&dump, &config).unwrap_err();
        assert!(err.to_string().contains("hw"));
    }

    #[test]
    fn test_verify_readback_missing_key() {
        let config = EepromConfig::parse(APOLLO_CONFIG).unwrap();
        let dump = EEPROM_DUMP.replace("bootmode", "boot");
        let err = verify_readback(&dump, &config).unwrap_err();
        assert!(err.to_string().contains("Key not found: bootmode"));
    }

    #[test]
    fn test_parse_sm_number() {
        assert_eq!(parse_sm_number(EEPROM_DUMP).unwrap(), 203);
        assert!(parse_sm_number("prom version = 0x01\n").is_err());
    }
}
