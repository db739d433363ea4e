//! `fwlab`: command-line driver for the IoT security lab.
//!
//! Walks a learner through the lab one subcommand at a time:
//! `status` → `login` → `settings` → `passwd` → `update` → `harden` → `report`.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::OutputFormat;
use fwlab::config::LabConfig;
use fwlab::device::{Device, JsonFileStore};
use fwlab::security::signature::DEFAULT_KEY_BITS;

/// IoT device security lab.
#[derive(Parser, Debug)]
#[command(
    name = "fwlab",
    version,
    about = "Vulnerable firmware and default credentials: an IoT remediation lab"
)]
struct Cli {
    /// Path to config file (default: platform config dir, fwlab/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the device state file (overrides the config file).
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Restore the vulnerable factory state (firmware 1.0.0, admin/admin).
    Reset,

    /// Show firmware version and open security findings.
    Status,

    /// Dump network and service settings, secrets included.
    Settings,

    /// Try to log in as the device admin.
    Login {
        /// Username (prompted when omitted).
        #[arg(long)]
        user: Option<String>,
        /// Password (not recommended; prompted when omitted).
        #[arg(long)]
        password: Option<String>,
    },

    /// Replace the admin password. Enforces the strength policy.
    Passwd {
        /// New password (not recommended; prompted twice when omitted).
        #[arg(long)]
        password: Option<String>,
    },

    /// Disable debug services, enable OTA, purge cleartext secrets.
    Harden {
        /// Leave SSH enabled.
        #[arg(long)]
        keep_ssh: bool,
        /// Leave Telnet enabled.
        #[arg(long)]
        keep_telnet: bool,
        /// Leave OTA disabled.
        #[arg(long)]
        no_ota: bool,
    },

    /// Verify a signed firmware image and install it.
    Update {
        /// Vendor public key (PEM).
        #[arg(long)]
        public_key: PathBuf,
        /// Firmware image.
        #[arg(long)]
        firmware: PathBuf,
        /// Detached signature over the image.
        #[arg(long)]
        signature: PathBuf,
        /// Version the device reports after the update.
        #[arg(long, default_value = "1.1.0-segura")]
        version: String,
    },

    /// Export the evidence report as Markdown.
    Report {
        /// File holding your technical plan (default: suggested outline).
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Write the report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a starter config file with the effective settings.
    InitConfig {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Vendor tooling: generate an RSA signing key pair.
    Keygen {
        /// Directory for private_key.pem and public_key.pem.
        #[arg(long)]
        out_dir: PathBuf,
        /// RSA modulus size.
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },

    /// Vendor tooling: sign a firmware image.
    Sign {
        /// Vendor private key (PEM).
        #[arg(long)]
        private_key: PathBuf,
        /// Firmware image.
        #[arg(long)]
        firmware: PathBuf,
        /// Where to write the signature.
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open the device, provisioning factory defaults on first use.
fn open_device(config: &LabConfig, state_override: Option<&Path>) -> Result<Device> {
    let device = Device::new(JsonFileStore::new(config.state_path(state_override)))
        .with_hash_params(config.hashing);
    if !device.is_provisioned() {
        tracing::info!(
            location = %device.location(),
            "No device state found, provisioning factory defaults"
        );
        device.reset_device()?;
    }
    Ok(device)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", commands::describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.clone().unwrap_or_else(LabConfig::default_path);
    let config = LabConfig::load(&config_path)?;
    init_logging(&config.log.level);

    let output = cli.output;
    let state = cli.state.as_deref();

    match cli.command {
        Commands::InitConfig { force } => {
            commands::init_config(&config, &config_path, state, force, output)
        }
        Commands::Keygen { out_dir, bits } => commands::keygen(&out_dir, bits),
        Commands::Sign {
            private_key,
            firmware,
            out,
        } => commands::sign(&private_key, &firmware, &out, output),

        Commands::Reset => {
            let device = Device::new(JsonFileStore::new(config.state_path(state)))
                .with_hash_params(config.hashing);
            commands::reset(&device, output)
        }
        Commands::Status => commands::status(&open_device(&config, state)?, output),
        Commands::Settings => commands::settings(&open_device(&config, state)?, output),
        Commands::Login { user, password } => {
            commands::login(&open_device(&config, state)?, user, password, output)
        }
        Commands::Passwd { password } => {
            commands::passwd(&open_device(&config, state)?, &config.policy, password, output)
        }
        Commands::Harden {
            keep_ssh,
            keep_telnet,
            no_ota,
        } => commands::harden(
            &open_device(&config, state)?,
            !keep_ssh,
            !keep_telnet,
            !no_ota,
            output,
        ),
        Commands::Update {
            public_key,
            firmware,
            signature,
            version,
        } => commands::update(
            &open_device(&config, state)?,
            &public_key,
            &firmware,
            &signature,
            version,
            output,
        ),
        Commands::Report { plan, out } => commands::report(
            &open_device(&config, state)?,
            plan.as_deref(),
            out.as_deref(),
            output,
        ),
    }
}
