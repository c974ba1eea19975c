//! Device table configuration: built-in presets and JSON files.
//!
//! ```json
//! {
//!   "devices": [
//!     { "node": 1, "serial": 151061815,
//!       "registers": [{ "index": 24641, "subindex": 0, "value": 32768 }] }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::object::ObjectAddress;
use crate::registry::{Controller, DeviceRegistry};

/// Maximum accepted configuration file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// A list of devices to install into a [`DeviceRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// One configured controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub node: u8,
    /// Value of the serial-number object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<u32>,
    /// Initial register values, applied after the serial number.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registers: Vec<RegisterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterValue {
    pub index: u16,
    #[serde(default)]
    pub subindex: u8,
    pub value: u32,
}

impl DeviceConfig {
    pub fn with_serial(node: u8, serial: u32) -> Self {
        Self {
            node,
            serial: Some(serial),
            registers: Vec::new(),
        }
    }

    /// Build the controller this entry describes.
    pub fn controller(&self) -> Controller {
        let mut controller = self.serial.map(Controller::with_serial).unwrap_or_default();
        for register in &self.registers {
            controller.write(
                ObjectAddress::new(register.index, register.subindex),
                register.value,
            );
        }
        controller
    }
}

/// Built-in device sets matching the boat's controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Right rudder: node 1.
    Right,
    /// Left rudder: node 3.
    Left,
    /// Sail: nodes 2 and 8.
    Sail,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Right, Preset::Left, Preset::Sail];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Right => "right",
            Preset::Left => "left",
            Preset::Sail => "sail",
        }
    }

    pub fn devices(self) -> Vec<DeviceConfig> {
        match self {
            Preset::Right => vec![DeviceConfig::with_serial(1, 0x0901_0537)],
            Preset::Left => vec![DeviceConfig::with_serial(3, 0x0901_1145)],
            Preset::Sail => vec![
                DeviceConfig::with_serial(2, 0x0901_0506),
                DeviceConfig::with_serial(8, 0x1227),
            ],
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown preset '{s}' (expected right, left or sail)"))
    }
}

impl RegistryConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file, rejecting files over [`MAX_CONFIG_FILE_SIZE`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size,
                max: MAX_CONFIG_FILE_SIZE,
            });
        }

        let text = std::fs::read_to_string(path).map_err(io_err)?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), devices = config.devices.len(), "loaded device config");
        Ok(config)
    }

    pub fn from_presets(presets: &[Preset]) -> Self {
        Self {
            devices: presets.iter().flat_map(|preset| preset.devices()).collect(),
        }
    }

    /// Append the devices of `other`.
    pub fn extend(&mut self, other: RegistryConfig) {
        self.devices.extend(other.devices);
    }

    /// Build a registry, rejecting out-of-range and repeated nodes.
    pub fn build(&self) -> Result<DeviceRegistry, ConfigError> {
        let mut registry = DeviceRegistry::new();
        for device in &self.devices {
            if registry.is_configured(device.node) {
                return Err(ConfigError::DuplicateNode(device.node));
            }
            registry.configure(device.node, device.controller())?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::codes::{SUCCESS, UNKNOWN_DEVICE};
    use crate::registers::{SERIAL_NUMBER, STATUSWORD};

    #[test]
    fn presets_install_known_serials() {
        let registry = RegistryConfig::from_presets(&Preset::ALL).build().unwrap();

        assert_eq!(registry.nodes().collect::<Vec<_>>(), vec![1, 2, 3, 8]);
        assert_eq!(registry.read(1, SERIAL_NUMBER), (0x0901_0537, SUCCESS));
        assert_eq!(registry.read(3, SERIAL_NUMBER), (0x0901_1145, SUCCESS));
        assert_eq!(registry.read(2, SERIAL_NUMBER), (0x0901_0506, SUCCESS));
        assert_eq!(registry.read(8, SERIAL_NUMBER), (0x1227, SUCCESS));
    }

    #[test]
    fn right_preset_only_configures_node_one() {
        let registry = RegistryConfig::from_presets(&[Preset::Right])
            .build()
            .unwrap();

        assert_eq!(registry.read(3, SERIAL_NUMBER), (0, UNKNOWN_DEVICE));
    }

    #[test]
    fn parses_json_with_registers() {
        let config = RegistryConfig::from_json(
            r#"{"devices": [{"node": 4, "serial": 99,
                "registers": [{"index": 24641, "value": 32768}]}]}"#,
        )
        .unwrap();

        let registry = config.build().unwrap();

        assert_eq!(registry.read(4, SERIAL_NUMBER), (99, SUCCESS));
        assert_eq!(registry.read(4, STATUSWORD), (0x8000, SUCCESS));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = RegistryConfig::from_json(r#"{"devices": [{"node": 1, "colour": 2}]}"#)
            .unwrap_err();

        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn duplicate_nodes_rejected() {
        let mut config = RegistryConfig::from_presets(&[Preset::Right]);
        config.extend(RegistryConfig {
            devices: vec![DeviceConfig::with_serial(1, 5)],
        });

        assert!(matches!(config.build(), Err(ConfigError::DuplicateNode(1))));
    }

    #[test]
    fn node_out_of_range_rejected() {
        let config = RegistryConfig {
            devices: vec![DeviceConfig::with_serial(16, 5)],
        };

        assert!(matches!(
            config.build(),
            Err(ConfigError::NodeOutOfRange { node: 16, .. })
        ));
    }

    #[test]
    fn loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"devices": [{{"node": 5, "serial": 12}}]}}"#).unwrap();

        let config = RegistryConfig::from_file(file.path()).unwrap();

        assert_eq!(config.devices, vec![DeviceConfig::with_serial(5, 12)]);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = RegistryConfig::from_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn preset_names_parse() {
        assert_eq!("Sail".parse::<Preset>().unwrap(), Preset::Sail);
        assert!("port".parse::<Preset>().is_err());
        assert_eq!(Preset::Left.to_string(), "left");
    }
}
