//! Subcommand handlers. Each returns the process exit code: a refused login,
//! a rejected password or a rejected update is a failure exit, not an error.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use dialoguer::{Input, Password};
use serde_json::json;

use fwlab::config::LabConfig;
use fwlab::device::{Device, Settings, StateError};
use fwlab::report::EvidenceReport;
use fwlab::security::{self, PasswordPolicy};
use fwlab::update::{sha256_hex, FirmwareBundle, FirmwareGate, UpdateOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn print_settings(settings: &Settings) {
    let shown = |secret: &str| {
        if secret.is_empty() {
            "(removed)".to_string()
        } else {
            secret.to_string()
        }
    };
    println!("Network / services");
    println!("  wifi_ssid        {}", settings.wifi_ssid);
    println!("  ssh              {}", on_off(settings.ssh_enabled));
    println!("  telnet           {}", on_off(settings.telnet_enabled));
    println!("  ota              {}", on_off(settings.ota_enabled));
    println!("Sensitive data");
    println!("  wifi_pass_plain  {}", shown(&settings.wifi_pass_plain));
    println!("  api_key_plain    {}", shown(&settings.api_key_plain));
}

// ── Device lifecycle ────────────────────────────────────────────

pub fn reset(device: &Device, output: OutputFormat) -> Result<ExitCode> {
    device.reset_device()?;
    let version = device.firmware_version()?;
    match output {
        OutputFormat::Json => print_json(&json!({
            "reset": true,
            "firmware_version": version,
            "location": device.location(),
        }))?,
        OutputFormat::Table => {
            println!("Device restored to {version} with admin/admin.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn status(device: &Device, output: OutputFormat) -> Result<ExitCode> {
    let posture = device.posture()?;
    let findings = posture.findings();
    match output {
        OutputFormat::Json => print_json(&json!({
            "posture": posture,
            "findings": findings,
        }))?,
        OutputFormat::Table => {
            println!("Firmware version: {}", posture.firmware_version);
            if findings.is_empty() {
                println!("No open findings. Device is remediated.");
            } else {
                println!("Open findings:");
                for finding in &findings {
                    println!("  - {finding}");
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn settings(device: &Device, output: OutputFormat) -> Result<ExitCode> {
    let settings = device.settings()?;
    match output {
        OutputFormat::Json => print_json(&settings)?,
        OutputFormat::Table => print_settings(&settings),
    }
    Ok(ExitCode::SUCCESS)
}

// ── Credentials ─────────────────────────────────────────────────

pub fn login(
    device: &Device,
    user: Option<String>,
    password: Option<String>,
    output: OutputFormat,
) -> Result<ExitCode> {
    let username = match user {
        Some(user) => user,
        None => Input::<String>::new()
            .with_prompt("Username")
            .default("admin".to_string())
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .allow_empty_password(true)
            .interact()?,
    };

    let accepted = device.login(&username, &password)?;
    let first_boot = device.state()?.first_boot;
    match output {
        OutputFormat::Json => print_json(&json!({ "user": username, "accepted": accepted }))?,
        OutputFormat::Table => match (accepted, first_boot) {
            (true, true) => {
                println!("Login succeeded with the factory default credentials. This is the vulnerability.");
            }
            (true, false) => println!("Login succeeded with the new password."),
            (false, true) => println!("Login failed."),
            (false, false) => {
                println!("Login failed. Expected if you tried admin/admin after changing the password.");
            }
        },
    }
    Ok(exit_code(accepted))
}

pub fn passwd(
    device: &Device,
    policy: &PasswordPolicy,
    password: Option<String>,
    output: OutputFormat,
) -> Result<ExitCode> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("New admin password")
            .with_confirmation("Confirm new password", "Passwords do not match")
            .interact()?,
    };

    let violations = policy.check(&password);
    if !violations.is_empty() {
        tracing::warn!(violations = violations.len(), "Password rejected by policy");
        match output {
            OutputFormat::Json => print_json(&json!({
                "changed": false,
                "violations": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }))?,
            OutputFormat::Table => {
                eprintln!("Password does not meet the policy:");
                for violation in &violations {
                    eprintln!("  - {violation}");
                }
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    device.change_password(&password)?;
    match output {
        OutputFormat::Json => print_json(&json!({ "changed": true }))?,
        OutputFormat::Table => {
            println!("Password updated and stored as an Argon2id hash. First-boot login disabled.");
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ── Hardening and updates ───────────────────────────────────────

pub fn harden(
    device: &Device,
    disable_ssh: bool,
    disable_telnet: bool,
    enable_ota: bool,
    output: OutputFormat,
) -> Result<ExitCode> {
    let settings = device.harden_settings(disable_ssh, disable_telnet, enable_ota)?;
    match output {
        OutputFormat::Json => print_json(&settings)?,
        OutputFormat::Table => {
            println!("Hardening applied. Cleartext secrets removed.");
            print_settings(&settings);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn update(
    device: &Device,
    public_key: &Path,
    firmware: &Path,
    signature: &Path,
    version: String,
    output: OutputFormat,
) -> Result<ExitCode> {
    let bundle = FirmwareBundle::from_files(public_key, firmware, signature, version)?;
    let digest = bundle.payload_digest();
    let outcome = FirmwareGate::new(device).install(&bundle)?;

    match output {
        OutputFormat::Json => {
            let value = match &outcome {
                UpdateOutcome::Applied { previous, current } => json!({
                    "applied": true,
                    "previous": previous,
                    "current": current,
                    "sha256": digest,
                }),
                UpdateOutcome::Rejected(reason) => json!({
                    "applied": false,
                    "reason": reason.to_string(),
                    "sha256": digest,
                }),
            };
            print_json(&value)?;
        }
        OutputFormat::Table => {
            println!("Firmware SHA-256: {digest}");
            match &outcome {
                UpdateOutcome::Applied { previous, current } => {
                    println!("Signature valid. Firmware updated {previous} -> {current}.");
                }
                UpdateOutcome::Rejected(reason) => {
                    eprintln!("Update rejected: {reason}.");
                }
            }
        }
    }
    Ok(exit_code(outcome.is_applied()))
}

// ── Evidence ────────────────────────────────────────────────────

pub fn report(
    device: &Device,
    plan: Option<&Path>,
    out: Option<&Path>,
    output: OutputFormat,
) -> Result<ExitCode> {
    let plan = plan
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read plan {}", path.display()))
        })
        .transpose()?;
    let report = EvidenceReport::from_device(device, plan.as_deref())?;

    let rendered = match output {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Table => report.render_markdown(),
    };
    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            tracing::info!(path = %path.display(), "Evidence report written");
            println!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(ExitCode::SUCCESS)
}

// ── Configuration ───────────────────────────────────────────────

pub fn init_config(
    config: &LabConfig,
    path: &Path,
    state_override: Option<&Path>,
    force: bool,
    output: OutputFormat,
) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let mut starter = config.clone();
    starter.state_path = Some(config.state_path(state_override));
    starter.save(path)?;

    tracing::info!(path = %path.display(), "Config file written");
    match output {
        OutputFormat::Json => print_json(&json!({ "config": path.display().to_string() }))?,
        OutputFormat::Table => println!("Config written to {}", path.display()),
    }
    Ok(ExitCode::SUCCESS)
}

// ── Vendor tooling ──────────────────────────────────────────────

pub fn keygen(out_dir: &Path, bits: usize) -> Result<ExitCode> {
    let private_path = out_dir.join("private_key.pem");
    let public_path = out_dir.join("public_key.pem");
    for path in [&private_path, &public_path] {
        if path.exists() {
            bail!("{} already exists; refusing to overwrite", path.display());
        }
    }

    let pair = security::generate_keypair(bits)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    std::fs::write(&private_path, &pair.private_pem)
        .with_context(|| format!("Failed to write {}", private_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&private_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict {}", private_path.display()))?;
    }
    std::fs::write(&public_path, &pair.public_pem)
        .with_context(|| format!("Failed to write {}", public_path.display()))?;

    tracing::info!(bits, dir = %out_dir.display(), "Generated vendor signing key pair");
    println!("Private key: {}", private_path.display());
    println!("Public key:  {}", public_path.display());
    Ok(ExitCode::SUCCESS)
}

pub fn sign(
    private_key: &Path,
    firmware: &Path,
    out: &Path,
    output: OutputFormat,
) -> Result<ExitCode> {
    let key = std::fs::read(private_key)
        .with_context(|| format!("Failed to read private key {}", private_key.display()))?;
    let payload = std::fs::read(firmware)
        .with_context(|| format!("Failed to read firmware {}", firmware.display()))?;

    let signature = security::sign(&key, &payload)?;
    std::fs::write(out, &signature)
        .with_context(|| format!("Failed to write signature {}", out.display()))?;

    let digest = sha256_hex(&payload);
    match output {
        OutputFormat::Json => print_json(&json!({
            "signature": out.display().to_string(),
            "sha256": digest,
            "bytes": signature.len(),
        }))?,
        OutputFormat::Table => {
            println!("Signed {} (SHA-256 {digest})", firmware.display());
            println!("Signature: {} ({} bytes)", out.display(), signature.len());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Render an error chain, adding a recovery hint for a damaged state file.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<StateError>() {
        Some(StateError::Corrupt { path, .. } | StateError::Invalid { path, .. }) => {
            format!("{err:#}\nhint: run `fwlab reset --state {path}` to start over")
        }
        _ => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn init_config_writes_loadable_file_with_state_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fwlab").join("config.toml");
        let state = tmp.path().join("device_state.json");

        init_config(&LabConfig::default(), &path, Some(&state), false, OutputFormat::Json).unwrap();

        let written = LabConfig::load(&path).unwrap();
        assert_eq!(written.state_path, Some(state));
        assert_eq!(written.policy, PasswordPolicy::default());
    }

    #[test]
    fn init_config_refuses_to_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();

        assert!(init_config(&LabConfig::default(), &path, None, false, OutputFormat::Json).is_err());
        assert_eq!(LabConfig::load(&path).unwrap().log.level, "debug");

        let mut config = LabConfig::default();
        config.state_path = Some(PathBuf::from("/tmp/fwlab-state.json"));
        init_config(&config, &path, None, true, OutputFormat::Json).unwrap();
        let written = LabConfig::load(&path).unwrap();
        assert_eq!(written.log.level, "info");
        assert_eq!(written.state_path, Some(PathBuf::from("/tmp/fwlab-state.json")));
    }

    #[test]
    fn damaged_state_error_carries_reset_hint() {
        let err = anyhow::Error::new(StateError::Invalid {
            path: "/tmp/s.json".into(),
            reason: "firmware_version is empty".into(),
        });
        assert!(describe_error(&err).contains("fwlab reset --state /tmp/s.json"));
    }
}
