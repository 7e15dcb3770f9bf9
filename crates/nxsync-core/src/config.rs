//! Configuration types for nxsync
//!
//! A manifest names the device to talk to and declares the resources that
//! should (or should not) exist on it.
//!
//! ```json
//! {
//!   "device": { "type": "file", "path": "/var/lib/nxsync/device.json" },
//!   "aces": [
//!     { "afi": "ipv4", "acl_name": "web_in", "seqno": 10,
//!       "action": "permit", "proto": "tcp",
//!       "src_addr": "any", "dst_addr": "10.0.0.0/24", "dst_port": "eq 443" }
//!   ],
//!   "portchannel_globals": [
//!     { "name": "default", "bundle_hash": "ip", "bundle_select": "src-dst",
//!       "symmetry": true, "concatenation": true, "rotate": 4 }
//!   ],
//!   "engine": { "noop": false, "run_interval_secs": 0 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::engine::Declared;
use crate::entity::{Ace, AceKey, Afi, Entity, PortChannelGlobal};
use crate::error::{Error, Result};
use crate::model::{DesiredState, Ensure};

type Fields = serde_json::Map<String, serde_json::Value>;

/// Main nxsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device back-end configuration
    #[serde(default)]
    pub device: DeviceConfig,

    /// Access-control entries to manage
    #[serde(default)]
    pub aces: Vec<AceDeclaration>,

    /// Port-channel globals to manage
    #[serde(default)]
    pub portchannel_globals: Vec<PortChannelGlobalDeclaration>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Parse a manifest; call [`SyncConfig::validate`] before use
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a manifest file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.aces.is_empty() && self.portchannel_globals.is_empty() {
            return Err(Error::config("No resources declared"));
        }

        self.device.validate()?;

        let mut seen = BTreeSet::new();
        for ace in &self.aces {
            let key = ace.key();
            if ace.acl_name.trim().is_empty() {
                return Err(Error::config("ACE acl_name cannot be empty"));
            }
            if ace.seqno == 0 {
                return Err(Error::config(format!("ACE {key}: seqno must be > 0")));
            }
            if !seen.insert(key.to_string()) {
                return Err(Error::config(format!("ACE {key} declared more than once")));
            }
            ace.desired()?;
        }

        let mut seen = BTreeSet::new();
        for global in &self.portchannel_globals {
            if global.name.trim().is_empty() {
                return Err(Error::config("Port-channel global name cannot be empty"));
            }
            if !seen.insert(global.name.as_str()) {
                return Err(Error::config(format!(
                    "Port-channel global {} declared more than once",
                    global.name
                )));
            }
            global.desired()?;
        }

        Ok(())
    }

    /// Typed ACE declarations
    pub fn ace_declarations(&self) -> Result<Vec<Declared<Ace>>> {
        self.aces
            .iter()
            .map(|ace| Ok(Declared::new(ace.key(), ace.ensure, ace.desired()?)))
            .collect()
    }

    /// Typed port-channel global declarations
    pub fn portchannel_global_declarations(&self) -> Result<Vec<Declared<PortChannelGlobal>>> {
        self.portchannel_globals
            .iter()
            .map(|global| {
                Ok(Declared::new(
                    global.name.clone(),
                    global.ensure,
                    global.desired()?,
                ))
            })
            .collect()
    }
}

/// Device back-end configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    /// In-memory device (not persistent)
    #[default]
    Memory,

    /// Device model persisted to a JSON file
    File {
        /// Path to the device file
        path: String,
    },

    /// Device provided by an externally registered factory
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DeviceConfig {
    /// Validate the device configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            DeviceConfig::Memory => Ok(()),
            DeviceConfig::File { path } => {
                if path.is_empty() {
                    return Err(Error::config("File device path cannot be empty"));
                }
                Ok(())
            }
            DeviceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom device factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom device config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the device type name
    pub fn type_name(&self) -> &str {
        match self {
            DeviceConfig::Memory => "memory",
            DeviceConfig::File { .. } => "file",
            DeviceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// One declared `cisco_ace`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AceDeclaration {
    pub afi: Afi,
    pub acl_name: String,
    pub seqno: u32,

    #[serde(default)]
    pub ensure: Ensure,

    /// Rule fields by property name; `null` means "don't care"
    #[serde(flatten)]
    pub properties: Fields,
}

impl AceDeclaration {
    pub fn key(&self) -> AceKey {
        AceKey::new(self.afi, self.acl_name.clone(), self.seqno)
    }

    pub fn desired(&self) -> Result<DesiredState<<Ace as Entity>::Property>> {
        DesiredState::from_json(Ace::KIND, &self.properties)
    }
}

/// One declared `cisco_portchannel_global`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortChannelGlobalDeclaration {
    #[serde(default = "default_global_name")]
    pub name: String,

    #[serde(default)]
    pub ensure: Ensure,

    /// Settings by property name; `null` means "don't care"
    #[serde(flatten)]
    pub properties: Fields,
}

impl PortChannelGlobalDeclaration {
    pub fn desired(&self) -> Result<DesiredState<<PortChannelGlobal as Entity>::Property>> {
        DesiredState::from_json(PortChannelGlobal::KIND, &self.properties)
    }
}

fn default_global_name() -> String {
    "default".to_string()
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Report what would change without writing to the device
    #[serde(default)]
    pub noop: bool,

    /// Seconds between passes; 0 runs a single pass
    #[serde(default = "default_run_interval_secs")]
    pub run_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            noop: false,
            run_interval_secs: default_run_interval_secs(),
        }
    }
}

fn default_run_interval_secs() -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PortChannelGlobalProperty as Pc;
    use crate::model::Value;

    const MANIFEST: &str = r#"{
        "device": { "type": "file", "path": "/tmp/nxsync-device.json" },
        "aces": [
            { "afi": "ipv4", "acl_name": "web_in", "seqno": 10,
              "action": "permit", "proto": "tcp",
              "src_addr": "any", "dst_addr": "any", "dst_port": null }
        ],
        "portchannel_globals": [
            { "bundle_hash": "ip", "rotate": "4", "symmetry": "true" },
            { "name": "legacy", "ensure": "absent" }
        ],
        "engine": { "noop": true }
    }"#;

    #[test]
    fn test_manifest_parses_and_validates() {
        let config = SyncConfig::from_json_str(MANIFEST).unwrap();
        config.validate().unwrap();

        assert_eq!(config.device.type_name(), "file");
        assert!(config.engine.noop);
        assert_eq!(config.engine.run_interval_secs, 0);

        let aces = config.ace_declarations().unwrap();
        assert_eq!(aces[0].key.to_string(), "ipv4 web_in 10");
        assert_eq!(aces[0].desired.len(), 4);

        let globals = config.portchannel_global_declarations().unwrap();
        assert_eq!(globals[0].key, "default");
        assert_eq!(globals[0].desired.get(Pc::Rotate), Some(&Value::Int(4)));
        assert_eq!(globals[0].desired.get(Pc::Symmetry), Some(&Value::Bool(true)));
        assert_eq!(globals[1].ensure, Ensure::Absent);
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let config = SyncConfig::from_json_str("{}").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let config = SyncConfig::from_json_str(
            r#"{ "portchannel_globals": [ { "name": "default" }, { "name": "default" } ] }"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn test_bad_ace_declarations() {
        let zero_seqno = SyncConfig::from_json_str(
            r#"{ "aces": [ { "afi": "ipv6", "acl_name": "edge", "seqno": 0 } ] }"#,
        )
        .unwrap();
        assert!(zero_seqno.validate().is_err());

        let unknown = SyncConfig::from_json_str(
            r#"{ "aces": [ { "afi": "ipv6", "acl_name": "edge", "seqno": 5, "log": true } ] }"#,
        )
        .unwrap();
        let err = unknown.validate().unwrap_err();
        assert!(matches!(err, Error::UnknownProperty { .. }));

        let ill_typed = SyncConfig::from_json_str(
            r#"{ "portchannel_globals": [ { "load_defer": "soon" } ] }"#,
        )
        .unwrap();
        let err = ill_typed.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_device_config_validation() {
        let config = DeviceConfig::File {
            path: String::new(),
        };
        assert!(config.validate().is_err());

        let config = DeviceConfig::Custom {
            factory: "nxapi".to_string(),
            config: serde_json::Value::Null,
        };
        assert!(config.validate().is_err());
        assert_eq!(DeviceConfig::default().type_name(), "memory");
    }
}
