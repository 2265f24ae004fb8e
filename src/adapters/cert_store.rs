//! Certificate store for the AWS IoT Core link.
//!
//! AWS IoT authenticates devices with mutual TLS. The device certificate,
//! its private key and the Amazon root CA are provisioned into the `certs`
//! NVS namespace. On simulation targets an in-memory map stands in.
//!
//! ## Flash layout
//!
//! | Key           | Content                              |
//! |---------------|--------------------------------------|
//! | `ca_cert`     | PEM-encoded Amazon root CA           |
//! | `device_cert` | PEM-encoded device certificate       |
//! | `private_key` | PEM-encoded device private key       |

use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

/// Maximum certificate size (PEM format, includes headers).
const MAX_CERT_SIZE: usize = 4096;

/// Maximum private key size.
const MAX_KEY_SIZE: usize = 2048;

pub const CA_CERT_KEY: &str = "ca_cert";
pub const DEVICE_CERT_KEY: &str = "device_cert";
pub const PRIVATE_KEY_KEY: &str = "private_key";

/// Loaded credential material. Every buffer is NUL-terminated for mbedTLS.
#[derive(Debug, Default)]
pub struct CertBundle {
    pub ca_cert: Vec<u8>,
    pub device_cert: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl CertBundle {
    pub fn is_complete(&self) -> bool {
        !self.ca_cert.is_empty() && !self.device_cert.is_empty() && !self.private_key.is_empty()
    }
}

/// Errors from the certificate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStoreError {
    PartitionNotFound,
    NvsError,
    WriteFailed,
    TooLarge,
}

impl core::fmt::Display for CertStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PartitionNotFound => write!(f, "cert partition not found"),
            Self::NvsError => write!(f, "NVS initialization error"),
            Self::WriteFailed => write!(f, "cert write failed"),
            Self::TooLarge => write!(f, "cert exceeds size limit"),
        }
    }
}

fn size_limit(key: &str) -> usize {
    if key == PRIVATE_KEY_KEY {
        MAX_KEY_SIZE
    } else {
        MAX_CERT_SIZE
    }
}

/// Append the terminating NUL mbedTLS expects, unless already present.
fn nul_terminated(mut data: Vec<u8>) -> Vec<u8> {
    if !data.is_empty() && data.last() != Some(&0) {
        data.push(0);
    }
    data
}

pub struct CertStore {
    #[cfg(target_os = "espidf")]
    partition: esp_idf_svc::nvs::EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl CertStore {
    #[cfg(target_os = "espidf")]
    pub fn new(partition: esp_idf_svc::nvs::EspDefaultNvsPartition) -> Self {
        Self { partition }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    /// Load the AWS IoT credential bundle.
    ///
    /// Returns `None` if any of the three items is missing.
    pub fn load_bundle(&self) -> Option<CertBundle> {
        let bundle = CertBundle {
            ca_cert: nul_terminated(self.platform_get(CA_CERT_KEY)?),
            device_cert: nul_terminated(self.platform_get(DEVICE_CERT_KEY)?),
            private_key: nul_terminated(self.platform_get(PRIVATE_KEY_KEY)?),
        };

        if !bundle.is_complete() {
            warn!("CertStore: incomplete certificate bundle");
            return None;
        }

        info!(
            "CertStore: loaded certificate bundle (ca={}B, cert={}B, key={}B)",
            bundle.ca_cert.len(),
            bundle.device_cert.len(),
            bundle.private_key.len(),
        );
        Some(bundle)
    }

    /// Store one credential item (provisioning).
    pub fn store_cert(&self, key: &str, data: &[u8]) -> Result<(), CertStoreError> {
        if data.len() > size_limit(key) {
            return Err(CertStoreError::TooLarge);
        }
        self.platform_set(key, data)?;
        info!("CertStore: stored '{}' ({}B)", key, data.len());
        Ok(())
    }

    // ── Platform-specific storage ────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_get(&self, key: &str) -> Option<Vec<u8>> {
        use esp_idf_svc::nvs::EspNvs;

        let nvs = EspNvs::new(self.partition.clone(), "certs", false).ok()?;
        let mut buf = vec![0u8; size_limit(key)];
        match nvs.get_blob(key, &mut buf) {
            Ok(Some(data)) => Some(data.to_vec()),
            _ => None,
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_set(&self, key: &str, data: &[u8]) -> Result<(), CertStoreError> {
        use esp_idf_svc::nvs::EspNvs;

        let mut nvs = EspNvs::new(self.partition.clone(), "certs", true)
            .map_err(|_| CertStoreError::NvsError)?;
        nvs.set_blob(key, data)
            .map_err(|_| CertStoreError::WriteFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_get(&self, key: &str) -> Option<Vec<u8>> {
        self.store.borrow().get(key).cloned()
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set(&self, key: &str, data: &[u8]) -> Result<(), CertStoreError> {
        self.store.borrow_mut().insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for CertStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────
