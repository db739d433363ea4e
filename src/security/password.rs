//! Argon2id password hashing for the device admin account.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so the
//! salt and cost parameters travel with the hash and verification never needs
//! out-of-band configuration.

use anyhow::{anyhow, bail, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::{Deserialize, Serialize};

/// Default memory cost in KiB (OWASP baseline for Argon2id).
const DEFAULT_MEMORY_KIB: u32 = 19_456;

/// Default number of passes.
const DEFAULT_ITERATIONS: u32 = 2;

/// Default degree of parallelism.
const DEFAULT_PARALLELISM: u32 = 1;

/// Highest memory cost (1 GiB) accepted when hashing or verifying.
pub const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Highest number of passes accepted when hashing or verifying.
pub const MAX_ITERATIONS: u32 = 64;

/// Highest number of lanes accepted when hashing or verifying.
pub const MAX_PARALLELISM: u32 = 16;

fn within_cost_ceiling(memory_kib: u32, iterations: u32, parallelism: u32) -> bool {
    memory_kib <= MAX_MEMORY_KIB && iterations <= MAX_ITERATIONS && parallelism <= MAX_PARALLELISM
}

/// Tunable Argon2id cost parameters (`[hashing]` in the config file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Time cost (number of passes).
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl HashParams {
    /// Build an Argon2id hasher, rejecting parameters Argon2 would refuse or
    /// that `verify_password` would not accept back.
    pub fn hasher(&self) -> Result<Argon2<'static>> {
        if !within_cost_ceiling(self.memory_kib, self.iterations, self.parallelism) {
            bail!(
                "invalid Argon2 parameters: cost exceeds m={MAX_MEMORY_KIB}, t={MAX_ITERATIONS}, p={MAX_PARALLELISM}"
            );
        }
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| anyhow!("invalid Argon2 parameters: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hash a password with the default cost parameters.
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with(password, &HashParams::default())
}

/// Hash a password with a fresh random salt and the given cost parameters.
pub fn hash_password_with(password: &str, params: &HashParams) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash.
///
/// Fails closed: an unparsable hash, an unknown algorithm, a cost above the
/// `MAX_*` ceilings or any internal error yields `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    let Ok(params) = Params::try_from(&parsed) else {
        return false;
    };
    if !within_cost_ceiling(params.m_cost(), params.t_cost(), params.p_cost()) {
        tracing::warn!(
            m = params.m_cost(),
            t = params.t_cost(),
            p = params.p_cost(),
            "Stored password hash exceeds the cost ceiling, refusing to verify"
        );
        return false;
    }
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
