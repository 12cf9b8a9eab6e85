//! Unified error types for the firmware.
//!
//! Each subsystem defines its own small error enum next to its port or
//! module; everything funnels into a single `Error` here so the boot path
//! and the driver loop handle failures uniformly. All variants are `Copy`
//! and allocation-free.

use core::fmt;

use crate::app::ports::{NetworkError, OtaError, StorageError};
use crate::cloud::SyncError;
use crate::config::FieldOverflow;
use crate::store::{ProvisionError, ValidationError};

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The config region could not be read or written.
    Storage(StorageError),
    /// The stored record failed validation.
    Validation(ValidationError),
    /// An input exceeded its record field.
    Field(FieldOverflow),
    /// A cloud exchange failed.
    Sync(SyncError),
    /// The WiFi station failed.
    Network(NetworkError),
    /// A firmware update failed.
    Ota(OtaError),
    /// Platform or service initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::Sync(e) => write!(f, "sync: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Ota(e) => write!(f, "ota: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<FieldOverflow> for Error {
    fn from(e: FieldOverflow) -> Self {
        Self::Field(e)
    }
}

impl From<ProvisionError> for Error {
    fn from(e: ProvisionError) -> Self {
        match e {
            ProvisionError::Field(inner) => Self::Field(inner),
            ProvisionError::Storage(inner) => Self::Storage(inner),
        }
    }
}

impl From<SyncError> for Error {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

impl From<OtaError> for Error {
    fn from(e: OtaError) -> Self {
        Self::Ota(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
