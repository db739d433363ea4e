//! Security posture derived from the device record.
//!
//! Used by `fwlab status` and the evidence report to show which findings are
//! still open.

use serde::Serialize;

use super::state::{DeviceState, FACTORY_FIRMWARE_VERSION};

/// Snapshot of what an attacker could still exploit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posture {
    pub firmware_version: String,
    /// Still running the image the device shipped with.
    pub factory_firmware: bool,
    /// `admin`/`admin` still works.
    pub default_credentials_active: bool,
    /// Admin password is stored as a hash.
    pub password_hashed: bool,
    /// Setting names whose secrets are stored in cleartext.
    pub cleartext_secrets: Vec<&'static str>,
    /// Debug services still listening.
    pub exposed_services: Vec<&'static str>,
    pub ota_enabled: bool,
}

impl Posture {
    pub fn from_state(state: &DeviceState) -> Self {
        let settings = &state.settings;

        let mut cleartext_secrets = Vec::new();
        if !settings.wifi_pass_plain.is_empty() {
            cleartext_secrets.push("wifi_pass_plain");
        }
        if !settings.api_key_plain.is_empty() {
            cleartext_secrets.push("api_key_plain");
        }

        let mut exposed_services = Vec::new();
        if settings.ssh_enabled {
            exposed_services.push("ssh");
        }
        if settings.telnet_enabled {
            exposed_services.push("telnet");
        }

        Self {
            firmware_version: state.firmware_version.clone(),
            factory_firmware: state.firmware_version == FACTORY_FIRMWARE_VERSION,
            default_credentials_active: state.default_credentials_active(),
            password_hashed: !state.admin_pass_hash.is_empty(),
            cleartext_secrets,
            exposed_services,
            ota_enabled: settings.ota_enabled,
        }
    }

    /// Human-readable open findings, empty once fully remediated.
    pub fn findings(&self) -> Vec<String> {
        let mut findings = Vec::new();
        if self.factory_firmware {
            findings.push(format!(
                "Firmware {} is the vulnerable factory image",
                self.firmware_version
            ));
        }
        if self.default_credentials_active {
            findings.push("Default admin credentials are still accepted".to_string());
        }
        if !self.cleartext_secrets.is_empty() {
            findings.push(format!(
                "Secrets stored in cleartext: {}",
                self.cleartext_secrets.join(", ")
            ));
        }
        if !self.exposed_services.is_empty() {
            findings.push(format!(
                "Debug services enabled: {}",
                self.exposed_services.join(", ")
            ));
        }
        if !self.ota_enabled {
            findings.push("Signed OTA updates are disabled".to_string());
        }
        findings
    }

    pub fn is_remediated(&self) -> bool {
        self.findings().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_device_has_every_finding() {
        let posture = Posture::from_state(&DeviceState::factory_default());
        assert!(posture.factory_firmware);
        assert!(posture.default_credentials_active);
        assert!(!posture.password_hashed);
        assert_eq!(posture.cleartext_secrets, vec!["wifi_pass_plain", "api_key_plain"]);
        assert_eq!(posture.exposed_services, vec!["ssh", "telnet"]);
        assert_eq!(posture.findings().len(), 5);
        assert!(!posture.is_remediated());
    }

    #[test]
    fn fully_remediated_device_has_no_findings() {
        let mut state = DeviceState::factory_default();
        state.firmware_version = "1.1.0-segura".into();
        state.admin_pass_plain.clear();
        state.admin_pass_hash = "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA".into();
        state.first_boot = false;
        state.settings.wifi_pass_plain.clear();
        state.settings.api_key_plain.clear();
        state.settings.ssh_enabled = false;
        state.settings.telnet_enabled = false;
        state.settings.ota_enabled = true;

        let posture = Posture::from_state(&state);
        assert!(posture.password_hashed);
        assert!(posture.findings().is_empty());
        assert!(posture.is_remediated());
    }

    #[test]
    fn keeping_ssh_is_reported() {
        let mut state = DeviceState::factory_default();
        state.settings.telnet_enabled = false;
        let posture = Posture::from_state(&state);
        assert_eq!(posture.exposed_services, vec!["ssh"]);
        assert!(posture
            .findings()
            .iter()
            .any(|f| f == "Debug services enabled: ssh"));
    }
}
