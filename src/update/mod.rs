//! Signed firmware updates.
//!
//! [`FirmwareGate`] is the path to `Device::apply_firmware` that a driver
//! should use. It checks a [`FirmwareBundle`] in a fixed order:
//!
//! 1. the key and signature are present (an empty image is allowed)
//! 2. the target version is not blank
//! 3. the vendor's RSA signature covers exactly the payload
//!
//! A rejected bundle never touches device state.

use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::device::Device;
use crate::security::verify_signature;

/// Lowercase hex SHA-256 fingerprint of a firmware image.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Everything a learner hands over for one update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareBundle {
    /// Vendor public key, PEM bytes.
    pub public_key_pem: Vec<u8>,
    /// Opaque firmware image.
    pub payload: Vec<u8>,
    /// Detached signature over `payload`.
    pub signature: Vec<u8>,
    /// Version string the device reports once the image is applied.
    pub target_version: String,
}

impl FirmwareBundle {
    pub fn new(
        public_key_pem: impl Into<Vec<u8>>,
        payload: impl Into<Vec<u8>>,
        signature: impl Into<Vec<u8>>,
        target_version: impl Into<String>,
    ) -> Self {
        Self {
            public_key_pem: public_key_pem.into(),
            payload: payload.into(),
            signature: signature.into(),
            target_version: target_version.into(),
        }
    }

    /// Read the three update inputs from disk.
    pub fn from_files(
        public_key: &Path,
        firmware: &Path,
        signature: &Path,
        target_version: impl Into<String>,
    ) -> Result<Self> {
        let read = |path: &Path, what: &str| {
            std::fs::read(path)
                .with_context(|| format!("failed to read {what} from {}", path.display()))
        };
        Ok(Self::new(
            read(public_key, "public key")?,
            read(firmware, "firmware image")?,
            read(signature, "signature")?,
            target_version,
        ))
    }

    /// Lowercase hex SHA-256 of the payload, for logs and reports.
    pub fn payload_digest(&self) -> String {
        sha256_hex(&self.payload)
    }

    /// An empty payload is a legitimate image and is left to the
    /// signature check.
    fn missing_inputs(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.public_key_pem.is_empty() {
            missing.push("public key");
        }
        if self.signature.is_empty() {
            missing.push("signature");
        }
        missing
    }
}

/// Why a bundle was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing update input: {}", .0.join(", "))]
    MissingInput(Vec<&'static str>),

    #[error("target version is empty")]
    EmptyVersion,

    #[error("signature is not valid for this firmware and public key")]
    BadSignature,
}

/// Result of one update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { previous: String, current: String },
    Rejected(RejectReason),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Signature gate in front of a device's firmware slot.
pub struct FirmwareGate<'a> {
    device: &'a Device,
}

impl<'a> FirmwareGate<'a> {
    pub fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// Run every check without applying anything.
    pub fn check(bundle: &FirmwareBundle) -> Result<(), RejectReason> {
        let missing = bundle.missing_inputs();
        if !missing.is_empty() {
            return Err(RejectReason::MissingInput(missing));
        }
        if bundle.target_version.trim().is_empty() {
            return Err(RejectReason::EmptyVersion);
        }
        if !verify_signature(&bundle.public_key_pem, &bundle.payload, &bundle.signature) {
            return Err(RejectReason::BadSignature);
        }
        Ok(())
    }

    /// Verify the bundle and, only if it passes, apply it to the device.
    ///
    /// A rejection is a normal outcome, not an error. Errors come from the
    /// state store.
    pub fn install(&self, bundle: &FirmwareBundle) -> Result<UpdateOutcome> {
        let digest = bundle.payload_digest();

        if let Err(reason) = Self::check(bundle) {
            tracing::warn!(
                version = %bundle.target_version,
                sha256 = %digest,
                %reason,
                "Firmware update rejected"
            );
            return Ok(UpdateOutcome::Rejected(reason));
        }

        let previous = self.device.apply_firmware(&bundle.target_version)?;
        tracing::info!(
            version = %bundle.target_version,
            sha256 = %digest,
            "Signed firmware verified and installed"
        );
        Ok(UpdateOutcome::Applied {
            previous,
            current: bundle.target_version.clone(),
        })
    }
}
