//! Persistent config store
//!
//! Owns the [`DeviceConfig`] record and its fixed-layout image in the flash
//! region. The layout is versionless and offset-stable so records written by
//! older firmware keep loading:
//!
//! ```text
//!   offset  len  field
//!        0   15  composite_device_id  (14 + NUL)
//!       15   33  wifi_ssid            (32 + NUL)
//!       48   64  wifi_passphrase      (63 + NUL)
//!      112   65  device_key           (64 + NUL)
//!      177  136  4 × slot { pin u8, kind u8, name 31 + NUL }
//!      313    4  config_version       (i32 LE)
//!      317   33  backup ssid
//!      350   64  backup passphrase
//!      414    1  backup valid
//!      415    4  CRC-32               (LE, over bytes 0..415)
//! ```
//!
//! The checksum is CRC-32/ISO-HDLC, recomputed immediately before every
//! persist and verified immediately after every load; a mismatch invalidates
//! the whole record. [`ConfigStore::validate`] is the sole gate callers use
//! before trusting a loaded record.

use crc::{CRC_32_ISO_HDLC, Crc};
use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::config::{
    CONFIG_VERSION_MAX, DeviceConfig, DeviceId, DeviceKey, FieldOverflow, MAX_SENSOR_SLOTS,
    Passphrase, SensorKind, SensorSlot, SlotName, Ssid, WifiBackup,
};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Region offset of the record. The rest of the region is reserved.
const RECORD_OFFSET: usize = 0;

const OFF_DEVICE_ID: usize = 0;
const OFF_SSID: usize = OFF_DEVICE_ID + DeviceId::CAPACITY + 1;
const OFF_PASSPHRASE: usize = OFF_SSID + Ssid::CAPACITY + 1;
const OFF_DEVICE_KEY: usize = OFF_PASSPHRASE + Passphrase::CAPACITY + 1;
const OFF_SLOTS: usize = OFF_DEVICE_KEY + DeviceKey::CAPACITY + 1;
const SLOT_NAME_FIELD: usize = SlotName::CAPACITY + 1;
const SLOT_STRIDE: usize = 2 + SLOT_NAME_FIELD;
const OFF_VERSION: usize = OFF_SLOTS + MAX_SENSOR_SLOTS * SLOT_STRIDE;
const OFF_BACKUP_SSID: usize = OFF_VERSION + 4;
const OFF_BACKUP_PASS: usize = OFF_BACKUP_SSID + Ssid::CAPACITY + 1;
const OFF_BACKUP_VALID: usize = OFF_BACKUP_PASS + Passphrase::CAPACITY + 1;
const OFF_CRC: usize = OFF_BACKUP_VALID + 1;

/// Total record size in the region.
pub const RECORD_LEN: usize = OFF_CRC + 4;

const HEX_CHARSET: &[u8] = b"0123456789abcdef";

/// Why a record failed [`ConfigStore::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Stored checksum does not match the record contents.
    ChecksumMismatch,
    /// No composite device id has been provisioned.
    MissingDeviceId,
    /// No WiFi SSID has been provisioned.
    MissingSsid,
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChecksumMismatch => write!(f, "CRC32 mismatch"),
            Self::MissingDeviceId => write!(f, "no device id"),
            Self::MissingSsid => write!(f, "no WiFi SSID"),
        }
    }
}

/// Errors from [`ConfigStore::provision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionError {
    /// A provisioning input exceeded its record field.
    Field(FieldOverflow),
    /// The record could not be persisted.
    Storage(StorageError),
}

impl core::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Field(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl From<FieldOverflow> for ProvisionError {
    fn from(e: FieldOverflow) -> Self {
        Self::Field(e)
    }
}

impl From<StorageError> for ProvisionError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// What [`ConfigStore::load`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Stored checksum matched the record bytes.
    pub checksum_ok: bool,
    /// `config_version` was implausible and has been reset to 0.
    pub version_repaired: bool,
}

/// Explicit handle over the persisted record and its storage region.
pub struct ConfigStore<S: StoragePort> {
    storage: S,
    config: DeviceConfig,
    /// Checksum from the last load or save, compared by [`validate`].
    ///
    /// [`validate`]: ConfigStore::validate
    stored_crc: u32,
    /// Whether the last load verified against its stored checksum. Decoding
    /// drops string padding, so a corrupt image can re-encode to a clean
    /// record; [`validate`] must remember the verdict from the raw bytes.
    ///
    /// [`validate`]: ConfigStore::validate
    checksum_ok: bool,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: DeviceConfig::default(),
            stored_crc: 0,
            checksum_ok: false,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Mutable access for the sync path (slot table, config version).
    /// Changes are not persisted until [`save`](ConfigStore::save).
    pub fn config_mut(&mut self) -> &mut DeviceConfig {
        &mut self.config
    }

    /// Dissolve the handle and hand the region back.
    pub fn release(self) -> S {
        self.storage
    }

    /// Read and decode the record, verify its checksum and repair an
    /// implausible `config_version`.
    ///
    /// The repaired version is only re-persisted when the checksum was
    /// valid; re-saving a corrupt record would stamp a fresh checksum onto
    /// garbage. A corrupt record stays in memory (so provisioning can
    /// overwrite it) but [`validate`](ConfigStore::validate) rejects it.
    pub fn load(&mut self) -> Result<LoadReport, StorageError> {
        let mut buf = [0u8; RECORD_LEN];
        self.storage.read(RECORD_OFFSET, &mut buf)?;

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&buf[OFF_CRC..OFF_CRC + 4]);
        let stored = u32::from_le_bytes(crc_bytes);
        let checksum_ok = CRC32.checksum(&buf[..OFF_CRC]) == stored;

        self.config = decode_payload(&buf);
        self.stored_crc = stored;
        self.checksum_ok = checksum_ok;

        info!(
            "config loaded: id='{}' ssid='{}' version={} backup={}",
            self.config.device_id,
            self.config.wifi_ssid,
            self.config.config_version,
            if self.config.wifi_backup.valid { "yes" } else { "no" }
        );
        if !checksum_ok {
            warn!("stored config fails checksum (0x{stored:08x})");
        }

        let mut version_repaired = false;
        if !(0..=CONFIG_VERSION_MAX).contains(&self.config.config_version) {
            warn!(
                "implausible config_version {}, resetting to 0 to force cloud sync",
                self.config.config_version
            );
            self.config.config_version = 0;
            version_repaired = true;
            if checksum_ok {
                self.save()?;
            }
        }

        Ok(LoadReport {
            checksum_ok,
            version_repaired,
        })
    }

    /// Encode the record, stamp a fresh checksum and persist atomically.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let mut buf = [0u8; RECORD_LEN];
        encode_payload(&self.config, &mut buf);
        let crc = CRC32.checksum(&buf[..OFF_CRC]);
        buf[OFF_CRC..].copy_from_slice(&crc.to_le_bytes());

        self.storage.write(RECORD_OFFSET, &buf)?;
        self.storage.commit()?;
        self.stored_crc = crc;
        self.checksum_ok = true;
        info!("config saved (crc 0x{crc:08x})");
        Ok(())
    }

    /// The sole gate before trusting a record: checksum plus the two
    /// structural invariants.
    ///
    /// The checksum check has two halves: the verdict over the raw bytes of
    /// the last load (padding corruption does not survive a decode/encode
    /// trip and would otherwise be laundered) and a re-encode of the
    /// in-memory record against the stored checksum (unsaved mutations).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.checksum_ok {
            return Err(ValidationError::ChecksumMismatch);
        }
        let mut buf = [0u8; RECORD_LEN];
        encode_payload(&self.config, &mut buf);
        if CRC32.checksum(&buf[..OFF_CRC]) != self.stored_crc {
            return Err(ValidationError::ChecksumMismatch);
        }
        if self.config.device_id.is_empty() {
            return Err(ValidationError::MissingDeviceId);
        }
        if self.config.wifi_ssid.is_empty() {
            return Err(ValidationError::MissingSsid);
        }
        Ok(())
    }

    /// Zero the record and persist the blank state.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.config = DeviceConfig::default();
        self.save()?;
        info!("config erased");
        Ok(())
    }

    /// Mint a fresh 64-char lowercase-hex device key.
    pub fn generate_key(&mut self) {
        self.generate_key_with(&mut fastrand::Rng::new());
    }

    /// Key generation with a caller-supplied RNG (seeded in tests).
    pub fn generate_key_with(&mut self, rng: &mut fastrand::Rng) {
        let mut key = heapless::String::new();
        for _ in 0..DeviceKey::CAPACITY {
            let _ = key.push(HEX_CHARSET[rng.usize(..HEX_CHARSET.len())] as char);
        }
        self.config.device_key = DeviceKey::from_raw(key);
        info!("generated device key");
    }

    /// Apply externally gathered provisioning data: normalized device id,
    /// the credentials of the joined network, a device key if none exists,
    /// version 0 and no backup. Persists on success.
    pub fn provision(&mut self, id: &str, ssid: &str, passphrase: &str) -> Result<(), ProvisionError> {
        let device_id = DeviceId::normalized(id)?;
        if !device_id.is_empty() {
            self.config.device_id = device_id;
        }
        self.config.wifi_ssid = Ssid::new(ssid)?;
        self.config.wifi_passphrase = Passphrase::new(passphrase)?;
        if !self.config.device_key.is_set() {
            self.generate_key();
        }
        self.config.config_version = 0;
        self.config.wifi_backup.valid = false;
        self.save()?;
        info!("provisioned as '{}'", self.config.device_id);
        Ok(())
    }

    /// Copy the current credentials into the backup slot and persist.
    pub fn backup_current_wifi(&mut self) -> Result<(), StorageError> {
        self.config.wifi_backup = WifiBackup {
            ssid: self.config.wifi_ssid.clone(),
            passphrase: self.config.wifi_passphrase.clone(),
            valid: true,
        };
        self.save()?;
        info!("WiFi credentials backed up ('{}')", self.config.wifi_backup.ssid);
        Ok(())
    }

    /// Restore the backup into the primary slot and persist. The backup
    /// stays valid. Returns `Ok(false)` when there is nothing to restore.
    pub fn restore_backup_wifi(&mut self) -> Result<bool, StorageError> {
        if !self.has_valid_backup() {
            warn!("no valid WiFi backup to restore");
            return Ok(false);
        }
        self.config.wifi_ssid = self.config.wifi_backup.ssid.clone();
        self.config.wifi_passphrase = self.config.wifi_backup.passphrase.clone();
        self.save()?;
        info!("WiFi credentials restored from backup ('{}')", self.config.wifi_ssid);
        Ok(true)
    }

    pub fn has_valid_backup(&self) -> bool {
        self.config.wifi_backup.valid && !self.config.wifi_backup.ssid.is_empty()
    }
}

fn write_str(field: &mut [u8], s: &str) {
    field.fill(0);
    field[..s.len()].copy_from_slice(s.as_bytes());
}

/// Decode one NUL-terminated fixed-width field. Bytes that are not valid
/// UTF-8 are dropped from the first bad byte on; the checksum gate decides
/// whether the record is trusted.
fn read_str<const N: usize>(field: &[u8]) -> heapless::String<N> {
    let len = field.iter().position(|&b| b == 0).unwrap_or(N).min(N);
    let text = match core::str::from_utf8(&field[..len]) {
        Ok(t) => t,
        Err(e) => core::str::from_utf8(&field[..e.valid_up_to()]).unwrap_or(""),
    };
    let mut out = heapless::String::new();
    let _ = out.push_str(text);
    out
}

fn encode_payload(cfg: &DeviceConfig, buf: &mut [u8; RECORD_LEN]) {
    write_str(&mut buf[OFF_DEVICE_ID..OFF_SSID], cfg.device_id.as_str());
    write_str(&mut buf[OFF_SSID..OFF_PASSPHRASE], cfg.wifi_ssid.as_str());
    write_str(
        &mut buf[OFF_PASSPHRASE..OFF_DEVICE_KEY],
        cfg.wifi_passphrase.as_str(),
    );
    write_str(&mut buf[OFF_DEVICE_KEY..OFF_SLOTS], cfg.device_key.as_str());

    for (i, slot) in cfg.sensors.iter().enumerate() {
        let base = OFF_SLOTS + i * SLOT_STRIDE;
        buf[base] = slot.pin;
        buf[base + 1] = slot.kind.code();
        write_str(&mut buf[base + 2..base + 2 + SLOT_NAME_FIELD], slot.name.as_str());
    }

    buf[OFF_VERSION..OFF_VERSION + 4].copy_from_slice(&cfg.config_version.to_le_bytes());
    write_str(
        &mut buf[OFF_BACKUP_SSID..OFF_BACKUP_PASS],
        cfg.wifi_backup.ssid.as_str(),
    );
    write_str(
        &mut buf[OFF_BACKUP_PASS..OFF_BACKUP_VALID],
        cfg.wifi_backup.passphrase.as_str(),
    );
    buf[OFF_BACKUP_VALID] = u8::from(cfg.wifi_backup.valid);
}

fn decode_payload(buf: &[u8; RECORD_LEN]) -> DeviceConfig {
    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&buf[OFF_VERSION..OFF_VERSION + 4]);

    DeviceConfig {
        device_id: DeviceId::from_raw(read_str(&buf[OFF_DEVICE_ID..OFF_SSID])),
        wifi_ssid: Ssid::from_raw(read_str(&buf[OFF_SSID..OFF_PASSPHRASE])),
        wifi_passphrase: Passphrase::from_raw(read_str(&buf[OFF_PASSPHRASE..OFF_DEVICE_KEY])),
        device_key: DeviceKey::from_raw(read_str(&buf[OFF_DEVICE_KEY..OFF_SLOTS])),
        sensors: core::array::from_fn(|i| {
            let base = OFF_SLOTS + i * SLOT_STRIDE;
            SensorSlot {
                pin: buf[base],
                kind: SensorKind::from_code(buf[base + 1]),
                name: SlotName::from_raw(read_str(&buf[base + 2..base + 2 + SLOT_NAME_FIELD])),
            }
        }),
        config_version: i32::from_le_bytes(version_bytes),
        wifi_backup: WifiBackup {
            ssid: Ssid::from_raw(read_str(&buf[OFF_BACKUP_SSID..OFF_BACKUP_PASS])),
            passphrase: Passphrase::from_raw(read_str(&buf[OFF_BACKUP_PASS..OFF_BACKUP_VALID])),
            valid: buf[OFF_BACKUP_VALID] != 0,
        },
    }
}
