//! The simulated device and its security state machine.
//!
//! A [`Device`] is an explicit handle over a [`StateStore`]; nothing here is
//! global, so several devices (or test fixtures) can coexist in one process.
//!
//! ## Credential paths
//! - First boot: the factory password is compared in cleartext. This is the
//!   vulnerability the lab demonstrates.
//! - After `change_password`: only the Argon2id hash is consulted and the
//!   cleartext credential is gone for good (until `reset_device`).
//!
//! ## Trust boundary
//! `change_password` does not check password strength and `apply_firmware`
//! does not check signatures. Both checks belong to the caller
//! (`security::policy` and `update::FirmwareGate`).

pub mod posture;
pub mod state;
pub mod store;

pub use posture::Posture;
pub use state::{DeviceState, Settings};
pub use store::{JsonFileStore, MemoryStore, StateError, StateStore};

use anyhow::{bail, Result};
use parking_lot::Mutex;

use crate::security::{hash_password_with, verify_password, HashParams};

/// A simulated IoT device bound to one state store.
pub struct Device {
    store: Box<dyn StateStore>,
    hash_params: HashParams,
    /// Serializes read-modify-write cycles on the store.
    lock: Mutex<()>,
}

impl Device {
    pub fn new(store: impl StateStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            hash_params: HashParams::default(),
            lock: Mutex::new(()),
        }
    }

    /// A device backed by an in-process store. Call `reset_device` first.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Override the Argon2id cost used by `change_password`.
    pub fn with_hash_params(mut self, params: HashParams) -> Self {
        self.hash_params = params;
        self
    }

    /// Where the record is stored.
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Whether the device has a state record at all.
    pub fn is_provisioned(&self) -> bool {
        self.store.exists()
    }

    fn modify(&self, apply: impl FnOnce(&mut DeviceState)) -> Result<DeviceState> {
        let _guard = self.lock.lock();
        let mut state = self.store.load()?;
        apply(&mut state);
        self.store.save(&state)?;
        Ok(state)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Full snapshot of the record.
    pub fn state(&self) -> Result<DeviceState> {
        let _guard = self.lock.lock();
        Ok(self.store.load()?)
    }

    pub fn firmware_version(&self) -> Result<String> {
        Ok(self.state()?.firmware_version)
    }

    /// Owned copy of the settings; mutating it does not touch the device.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.state()?.settings)
    }

    pub fn posture(&self) -> Result<Posture> {
        Ok(Posture::from_state(&self.state()?))
    }

    /// Check credentials. Never mutates state, so it is safe to retry.
    pub fn login(&self, username: &str, password: &str) -> Result<bool> {
        let state = self.state()?;

        let accepted = if username != state.admin_user {
            false
        } else if state.default_credentials_active() {
            password == state.admin_pass_plain
        } else if !state.admin_pass_hash.is_empty() {
            verify_password(password, &state.admin_pass_hash)
        } else {
            false
        };

        tracing::debug!(username, accepted, "Login attempt");
        Ok(accepted)
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Store a hash of `new_password` and retire the first-boot credential.
    ///
    /// The caller is responsible for the strength policy.
    pub fn change_password(&self, new_password: &str) -> Result<()> {
        let hash = hash_password_with(new_password, &self.hash_params)?;
        self.modify(|state| {
            state.admin_pass_hash = hash;
            state.admin_pass_plain.clear();
            state.first_boot = false;
        })?;
        tracing::info!("Admin password changed; first-boot credential removed");
        Ok(())
    }

    /// Toggle debug services and OTA. Cleartext secrets are purged no matter
    /// which flags are passed.
    pub fn harden_settings(
        &self,
        disable_ssh: bool,
        disable_telnet: bool,
        enable_ota: bool,
    ) -> Result<Settings> {
        let state = self.modify(|state| {
            let settings = &mut state.settings;
            settings.ssh_enabled = !disable_ssh;
            settings.telnet_enabled = !disable_telnet;
            settings.ota_enabled = enable_ota;
            settings.wifi_pass_plain.clear();
            settings.api_key_plain.clear();
        })?;
        tracing::info!(
            ssh = state.settings.ssh_enabled,
            telnet = state.settings.telnet_enabled,
            ota = state.settings.ota_enabled,
            "Hardening applied; cleartext secrets purged"
        );
        Ok(state.settings)
    }

    /// Replace the firmware version and return the one it replaced.
    ///
    /// Performs no signature check; only call this after the update gate
    /// accepted the image.
    pub fn apply_firmware(&self, version: &str) -> Result<String> {
        if version.trim().is_empty() {
            bail!("firmware version cannot be empty");
        }
        let mut previous = String::new();
        self.modify(|state| {
            previous = std::mem::replace(&mut state.firmware_version, version.to_string());
        })?;
        tracing::info!(previous = %previous, current = version, "Firmware applied");
        Ok(previous)
    }

    /// Overwrite the record with the vulnerable factory defaults.
    pub fn reset_device(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.store.save(&DeviceState::factory_default())?;
        tracing::info!(location = %self.store.location(), "Device reset to factory defaults");
        Ok(())
    }
}
