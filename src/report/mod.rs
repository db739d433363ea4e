//! Evidence report exported at the end of a lab session.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::device::{Device, Posture};

/// Suggested plan outline offered to learners.
pub const DEFAULT_PLAN: &str = "\
- First boot: force a credential change and refuse admin/admin.
- Signed OTA: verify signatures with a public key embedded in ROM or a secure element.
- Secret storage: encrypted NVS or a secure element.
- Services to disable in production: telnet, ssh, serial console.
- Rotation and revocation: policy plus an operational mechanism.
- Compromise response: isolate, revoke, re-flash signed firmware, investigate.
";

/// Word budget for the learner's plan.
pub const PLAN_WORD_LIMIT: usize = 250;

/// Snapshot of the device plus the learner's remediation plan.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceReport {
    pub generated_at: DateTime<Utc>,
    pub posture: Posture,
    pub plan: String,
}

impl EvidenceReport {
    pub fn new(posture: Posture, plan: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            posture,
            plan: plan.into(),
        }
    }

    /// Capture the device's current posture. An empty plan falls back to
    /// [`DEFAULT_PLAN`].
    pub fn from_device(device: &Device, plan: Option<&str>) -> Result<Self> {
        let plan = match plan.map(str::trim) {
            Some(plan) if !plan.is_empty() => plan,
            _ => DEFAULT_PLAN.trim(),
        };
        let report = Self::new(device.posture()?, plan);
        if report.plan_exceeds_limit() {
            tracing::warn!(
                words = report.plan_word_count(),
                limit = PLAN_WORD_LIMIT,
                "Plan is longer than the word limit"
            );
        }
        Ok(report)
    }

    pub fn plan_word_count(&self) -> usize {
        self.plan.split_whitespace().count()
    }

    pub fn plan_exceeds_limit(&self) -> bool {
        self.plan_word_count() > PLAN_WORD_LIMIT
    }

    pub fn render_markdown(&self) -> String {
        let posture = &self.posture;
        let mut out = String::new();

        let _ = writeln!(out, "# Lab evidence\n");
        let _ = writeln!(
            out,
            "- Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(
            out,
            "- Current firmware version: **{}**",
            posture.firmware_version
        );
        let _ = writeln!(
            out,
            "- Screenshots: attach the captures taken during steps 1-6.\n"
        );

        let _ = writeln!(out, "## Security checklist\n");
        let checks = [
            (!posture.factory_firmware, "Signed firmware update applied"),
            (
                !posture.default_credentials_active,
                "Default credentials rejected",
            ),
            (posture.password_hashed, "Admin password stored as a hash"),
            (
                posture.cleartext_secrets.is_empty(),
                "No cleartext secrets in settings",
            ),
            (
                posture.exposed_services.is_empty(),
                "Debug services (SSH, Telnet) disabled",
            ),
            (posture.ota_enabled, "Signed OTA enabled"),
        ];
        for (done, label) in checks {
            let mark = if done { "x" } else { " " };
            let _ = writeln!(out, "- [{mark}] {label}");
        }

        let findings = posture.findings();
        if !findings.is_empty() {
            let _ = writeln!(out, "\n### Open findings\n");
            for finding in findings {
                let _ = writeln!(out, "- {finding}");
            }
        }

        let _ = writeln!(out, "\n## Technical plan (summary)\n");
        let _ = writeln!(out, "{}", self.plan.trim_end());
        if self.plan_exceeds_limit() {
            let _ = writeln!(
                out,
                "\n> Note: plan is {} words; the limit is {PLAN_WORD_LIMIT}.",
                self.plan_word_count()
            );
        }
        out
    }
}
