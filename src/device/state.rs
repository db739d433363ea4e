//! The persisted device record and its factory defaults.

use serde::{Deserialize, Serialize};

/// Firmware the device ships with.
pub const FACTORY_FIRMWARE_VERSION: &str = "1.0.0-vulnerable";

/// The sole admin account.
pub const FACTORY_ADMIN_USER: &str = "admin";

/// Default credential printed on the label.
pub const FACTORY_ADMIN_PASSWORD: &str = "admin";

pub const FACTORY_WIFI_SSID: &str = "LabNet";
pub const FACTORY_WIFI_PASSWORD: &str = "12345678";
pub const FACTORY_API_KEY: &str = "ABCD-1234-SECRET";

/// Network and service settings, including the secrets leaked in cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub wifi_ssid: String,
    /// Cleartext until hardening empties it.
    #[serde(default)]
    pub wifi_pass_plain: String,
    /// Cleartext until hardening empties it.
    #[serde(default)]
    pub api_key_plain: String,
    pub ssh_enabled: bool,
    pub telnet_enabled: bool,
    pub ota_enabled: bool,
}

/// The whole device record. An empty string means "not set" for both
/// credential fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub firmware_version: String,
    pub admin_user: String,
    #[serde(default)]
    pub admin_pass_plain: String,
    #[serde(default)]
    pub admin_pass_hash: String,
    #[serde(default)]
    pub first_boot: bool,
    pub settings: Settings,
}

impl DeviceState {
    /// The known-insecure baseline every scenario starts from.
    pub fn factory_default() -> Self {
        Self {
            firmware_version: FACTORY_FIRMWARE_VERSION.to_string(),
            admin_user: FACTORY_ADMIN_USER.to_string(),
            admin_pass_plain: FACTORY_ADMIN_PASSWORD.to_string(),
            admin_pass_hash: String::new(),
            first_boot: true,
            settings: Settings {
                wifi_ssid: FACTORY_WIFI_SSID.to_string(),
                wifi_pass_plain: FACTORY_WIFI_PASSWORD.to_string(),
                api_key_plain: FACTORY_API_KEY.to_string(),
                ssh_enabled: true,
                telnet_enabled: true,
                ota_enabled: false,
            },
        }
    }

    /// Whether the cleartext factory credential is the active login path.
    pub fn default_credentials_active(&self) -> bool {
        self.first_boot && !self.admin_pass_plain.is_empty()
    }

    /// Check the record's structural invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.firmware_version.trim().is_empty() {
            return Err("firmware_version is empty".into());
        }
        if !self.first_boot && !self.admin_pass_plain.is_empty() {
            return Err("plaintext admin password present after first boot".into());
        }
        if self.admin_pass_plain.is_empty() == self.admin_pass_hash.is_empty() {
            return Err(
                "exactly one of admin_pass_plain and admin_pass_hash must be set".into(),
            );
        }
        Ok(())
    }
}
