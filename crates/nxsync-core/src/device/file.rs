// # File Device
//
// A `MemoryDevice` whose contents persist to a JSON file after every
// accepted write.
//
// ## Purpose
//
// Lets the daemon plan and apply against a device model that survives
// restarts, e.g. a lab inventory or an offline copy of a switch.
//
// ## Crash Recovery
//
// - Atomic writes: new contents go to `<file>.tmp`, then are renamed
// - Backup: the previous file is copied to `<file>.backup` before the rename
// - Recovery: an unparsable file falls back to the backup, then to empty
// - Write-through: each write lands in memory first, then the whole device
//   is saved. If saving fails the call returns the I/O error but the change
//   stays in memory, so the file lags until the next successful write
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "saved_at": "2026-01-09T12:00:00Z",
//   "aces": [
//     {
//       "key": { "afi": "ipv4", "acl_name": "web_in", "seqno": 10 },
//       "properties": { "action": "permit", "proto": "tcp" }
//     }
//   ],
//   "portchannel_globals": [
//     { "key": "default", "properties": { "rotate": 0, "symmetry": true } }
//   ]
// }
// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::memory::{Inventory, MemoryDevice};
use crate::config::DeviceConfig;
use crate::entity::{Ace, AceKey, AceProperty, Entity, PortChannelGlobal, PortChannelGlobalProperty};
use crate::error::{Error, Result};
use crate::model::{CallParams, Value};
use crate::traits::{Device, DeviceFactory, EntityHandle, EntityProvider};

/// Snapshot file format version
const DEVICE_FILE_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct DeviceFile {
    version: String,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    inventory: Inventory,
}

/// File-backed device
///
/// # Example
///
/// ```rust,no_run
/// use nxsync_core::device::FileDevice;
/// use nxsync_core::entity::PortChannelGlobal;
/// use nxsync_core::traits::EntityProvider;
///
/// let device = FileDevice::open("/var/lib/nxsync/device.json")?;
/// let globals = EntityProvider::<PortChannelGlobal>::list(&device)?;
/// println!("{} port-channel globals", globals.len());
/// # Ok::<(), nxsync_core::Error>(())
/// ```
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    inner: MemoryDevice,
}

impl FileDevice {
    /// Load a device file, creating parent directories as needed
    ///
    /// A missing file yields an empty device; nothing is written until the
    /// first accepted write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::config(format!(
                        "Failed to create device directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let inventory = Self::load_with_recovery(&path)?;
        Ok(Self {
            path,
            inner: MemoryDevice::from_inventory(inventory),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory model, including its write log and failure switches
    pub fn memory(&self) -> &MemoryDevice {
        &self.inner
    }

    fn load_with_recovery(path: &Path) -> Result<Inventory> {
        match Self::load(path) {
            Ok(inventory) => Ok(inventory),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Device file {} is corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup = Self::backup_path(path);
                if !backup.exists() {
                    tracing::warn!("No backup file found. Starting with an empty device.");
                    return Ok(Inventory::default());
                }

                match Self::load(&backup) {
                    Ok(inventory) => {
                        if let Err(restore_err) = fs::copy(&backup, path) {
                            tracing::error!(
                                "Failed to restore device file from backup: {}",
                                restore_err
                            );
                        }
                        tracing::info!("Recovered device file from backup");
                        Ok(inventory)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with an empty device.",
                            backup_err
                        );
                        Ok(Inventory::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    fn load(path: &Path) -> Result<Inventory> {
        if !path.exists() {
            tracing::debug!("Device file does not exist: {}", path.display());
            return Ok(Inventory::default());
        }

        let content = fs::read_to_string(path)?;
        let file: DeviceFile = serde_json::from_str(&content)?;

        if file.version != DEVICE_FILE_VERSION {
            tracing::warn!(
                "Device file version mismatch: expected {}, got {}. Attempting to load anyway.",
                DEVICE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.inventory)
    }

    fn persist(&self) -> Result<()> {
        let file = DeviceFile {
            version: DEVICE_FILE_VERSION.to_string(),
            saved_at: Utc::now(),
            inventory: self.inner.inventory(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path)?;
            temp.write_all(json.as_bytes())?;
            temp.flush()?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)) {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path)?;
        tracing::trace!("Device written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

impl EntityProvider<Ace> for FileDevice {
    fn list(&self) -> Result<Vec<EntityHandle<Ace>>> {
        EntityProvider::<Ace>::list(&self.inner)
    }

    fn get(&self, handle: &EntityHandle<Ace>, property: AceProperty) -> Result<Option<Value>> {
        self.inner.get(handle, property)
    }

    fn set(&self, handle: &EntityHandle<Ace>, property: AceProperty, value: &Value) -> Result<()> {
        self.inner.set(handle, property, value)?;
        self.persist()
    }

    fn set_combined(
        &self,
        handle: &EntityHandle<Ace>,
        call: <Ace as Entity>::Call,
        params: &CallParams<AceProperty>,
    ) -> Result<()> {
        self.inner.set_combined(handle, call, params)?;
        self.persist()
    }

    fn create(&self, key: &AceKey) -> Result<EntityHandle<Ace>> {
        let handle = EntityProvider::<Ace>::create(&self.inner, key)?;
        self.persist()?;
        Ok(handle)
    }

    fn destroy(&self, handle: EntityHandle<Ace>) -> Result<()> {
        self.inner.destroy(handle)?;
        self.persist()
    }
}

impl EntityProvider<PortChannelGlobal> for FileDevice {
    fn list(&self) -> Result<Vec<EntityHandle<PortChannelGlobal>>> {
        EntityProvider::<PortChannelGlobal>::list(&self.inner)
    }

    fn get(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        property: PortChannelGlobalProperty,
    ) -> Result<Option<Value>> {
        self.inner.get(handle, property)
    }

    fn set(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        property: PortChannelGlobalProperty,
        value: &Value,
    ) -> Result<()> {
        self.inner.set(handle, property, value)?;
        self.persist()
    }

    fn set_combined(
        &self,
        handle: &EntityHandle<PortChannelGlobal>,
        call: <PortChannelGlobal as Entity>::Call,
        params: &CallParams<PortChannelGlobalProperty>,
    ) -> Result<()> {
        self.inner.set_combined(handle, call, params)?;
        self.persist()
    }

    fn create(&self, key: &String) -> Result<EntityHandle<PortChannelGlobal>> {
        let handle = EntityProvider::<PortChannelGlobal>::create(&self.inner, key)?;
        self.persist()?;
        Ok(handle)
    }

    fn destroy(&self, handle: EntityHandle<PortChannelGlobal>) -> Result<()> {
        self.inner.destroy(handle)?;
        self.persist()
    }
}

impl Device for FileDevice {
    fn device_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for `DeviceConfig::File`
pub struct FileDeviceFactory;

impl DeviceFactory for FileDeviceFactory {
    fn create(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        match config {
            DeviceConfig::File { path } => Ok(Box::new(FileDevice::open(path)?)),
            other => Err(Error::config(format!(
                "file device factory cannot build a '{}' device",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Afi, LoadBalanceCall};
    use tempfile::tempdir;
    use PortChannelGlobalProperty as Pc;

    #[test]
    fn test_writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("device.json");

        {
            let device = FileDevice::open(&path).unwrap();
            let handle =
                EntityProvider::<PortChannelGlobal>::create(&device, &"default".to_string())
                    .unwrap();
            device.set(&handle, Pc::LoadDefer, &Value::from(120)).unwrap();

            let mut params = CallParams::new();
            params.insert(Pc::BundleHash, Value::from("ip"));
            params.insert(Pc::BundleSelect, Value::from("src-dst"));
            params.insert(Pc::HashPoly, Value::from("CRC10b"));
            device
                .set_combined(&handle, LoadBalanceCall::HashPolynomial, &params)
                .unwrap();
        }

        let device = FileDevice::open(&path).unwrap();
        let handles = EntityProvider::<PortChannelGlobal>::list(&device).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(
            device.get(&handles[0], Pc::LoadDefer).unwrap(),
            Some(Value::Int(120))
        );
        assert_eq!(
            device.get(&handles[0], Pc::HashPoly).unwrap(),
            Some(Value::from("CRC10b"))
        );
    }

    #[test]
    fn test_missing_file_is_empty_device() {
        let dir = tempdir().unwrap();
        let device = FileDevice::open(dir.path().join("nested/device.json")).unwrap();
        assert!(EntityProvider::<Ace>::list(&device).unwrap().is_empty());
        assert!(!device.path().exists());
    }

    #[test]
    fn test_corrupted_file_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("device.json");

        {
            let device = FileDevice::open(&path).unwrap();
            EntityProvider::<Ace>::create(&device, &AceKey::new(Afi::Ipv4, "web_in", 10)).unwrap();
            // Second write leaves the first one in the backup
            EntityProvider::<Ace>::create(&device, &AceKey::new(Afi::Ipv4, "web_in", 20)).unwrap();
        }

        fs::write(&path, "{ not json").unwrap();

        let device = FileDevice::open(&path).unwrap();
        let handles = EntityProvider::<Ace>::list(&device).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].key().seqno, 10);
    }

    #[test]
    fn test_corrupted_file_without_backup_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("device.json");
        fs::write(&path, "garbage").unwrap();

        let device = FileDevice::open(&path).unwrap();
        assert!(EntityProvider::<PortChannelGlobal>::list(&device).unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("device.json");

        let device = FileDevice::open(&path).unwrap();
        device.memory().fail_writes_to("create");
        assert!(EntityProvider::<Ace>::create(&device, &AceKey::new(Afi::Ipv6, "edge", 5)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_save_catches_up_on_next_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("device.json");
        let device = FileDevice::open(&path).unwrap();
        let first = AceKey::new(Afi::Ipv4, "web_in", 10);

        // A directory in the temp file's place makes the save fail
        fs::create_dir(dir.path().join("device.tmp")).unwrap();
        let err = EntityProvider::<Ace>::create(&device, &first).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");
        assert!(!path.exists());
        assert_eq!(EntityProvider::<Ace>::list(&device).unwrap().len(), 1);

        fs::remove_dir(dir.path().join("device.tmp")).unwrap();
        EntityProvider::<Ace>::create(&device, &AceKey::new(Afi::Ipv4, "web_in", 20)).unwrap();

        let reopened = FileDevice::open(&path).unwrap();
        let mut seqnos: Vec<u32> = EntityProvider::<Ace>::list(&reopened)
            .unwrap()
            .iter()
            .map(|h| h.key().seqno)
            .collect();
        seqnos.sort();
        assert_eq!(seqnos, vec![10, 20]);
    }
}
