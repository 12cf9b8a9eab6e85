//! Config flash-region adapter.
//!
//! Implements [`StoragePort`] over the dedicated `config` data partition.
//! The whole region is mirrored in RAM: reads serve the last committed
//! image, writes land in a staging buffer, and `commit` erases the sector
//! and writes the staged image back in one pass. That mirrors classic
//! EEPROM-emulation semantics, where nothing reaches flash until commit.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_partition_*` calls against the real
//!   partition table entry.
//! - **all other targets**: RAM-only region for host-side tests.

use log::info;

use crate::app::ports::{StorageError, StoragePort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Partition-table label of the config region.
#[cfg(target_os = "espidf")]
pub const PARTITION_LABEL: &str = "config";

/// Bytes reserved for the device record.
pub const CONFIG_REGION_LEN: usize = 768;

/// Smallest erasable unit of the underlying flash.
#[cfg(target_os = "espidf")]
const SECTOR_LEN: usize = 4096;

pub struct FlashRegion {
    #[cfg(target_os = "espidf")]
    partition: *const esp_partition_t,
    committed: Vec<u8>,
    staged: Vec<u8>,
}

impl FlashRegion {
    /// Open the config partition and read the current image.
    #[cfg(target_os = "espidf")]
    pub fn mount() -> Result<Self, StorageError> {
        // NUL-terminated label for the C API.
        let label = b"config\0";
        // SAFETY: esp_partition_find_first only reads the partition table;
        // the returned pointer stays valid for the program lifetime.
        let partition = unsafe {
            esp_partition_find_first(
                esp_partition_type_t_ESP_PARTITION_TYPE_DATA,
                esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_ANY,
                label.as_ptr() as *const _,
            )
        };
        if partition.is_null() {
            return Err(StorageError::IoError);
        }

        let mut committed = vec![0u8; CONFIG_REGION_LEN];
        // SAFETY: partition is non-null and the read stays inside the
        // region covered by the partition entry.
        let ret = unsafe {
            esp_partition_read(
                partition,
                0,
                committed.as_mut_ptr() as *mut _,
                committed.len(),
            )
        };
        if ret != ESP_OK {
            return Err(StorageError::IoError);
        }

        info!("FlashRegion: mounted '{PARTITION_LABEL}' ({CONFIG_REGION_LEN} bytes)");
        let staged = committed.clone();
        Ok(Self {
            partition,
            committed,
            staged,
        })
    }

    /// RAM-only region, starting out fully erased (0xFF).
    #[cfg(not(target_os = "espidf"))]
    pub fn in_memory(len: usize) -> Self {
        info!("FlashRegion: simulation backend ({len} bytes)");
        Self {
            committed: vec![0xFF; len],
            staged: vec![0xFF; len],
        }
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<(), StorageError> {
        if offset.checked_add(len).is_none_or(|end| end > self.staged.len()) {
            return Err(StorageError::OutOfBounds);
        }
        Ok(())
    }
}

impl StoragePort for FlashRegion {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.committed[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, data.len())?;
        self.staged[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the partition pointer comes from mount() and both
            // ranges stay inside the first sector of the partition.
            let ret = unsafe { esp_partition_erase_range(self.partition, 0, SECTOR_LEN) };
            if ret != ESP_OK {
                return Err(StorageError::CommitFailed);
            }
            let ret = unsafe {
                esp_partition_write(
                    self.partition,
                    0,
                    self.staged.as_ptr() as *const _,
                    self.staged.len(),
                )
            };
            if ret != ESP_OK {
                return Err(StorageError::CommitFailed);
            }
        }

        self.committed.copy_from_slice(&self.staged);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.staged.len()
    }
}
