//! fwlab: an IoT device security lab.
//!
//! Simulates an embedded device that ships with default credentials,
//! cleartext secrets and open debug services, and lets learners remediate
//! it: change the admin password, harden the settings, and install a
//! vendor-signed firmware image.
//!
//! ## Layers
//! - [`security`]: Argon2id password hashing, RSA firmware signatures and
//!   the password strength policy
//! - [`device`]: the persisted device record and its state machine
//! - [`update`]: the signature gate in front of firmware installs
//! - [`report`]: the Markdown evidence report
//! - [`config`]: the TOML lab configuration

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::fn_params_excessive_bools
)]

pub mod config;
pub mod device;
pub mod report;
pub mod security;
pub mod update;

pub use config::LabConfig;
pub use device::{Device, DeviceState, JsonFileStore, MemoryStore, StateError, StateStore};
pub use update::{FirmwareBundle, FirmwareGate, RejectReason, UpdateOutcome};
