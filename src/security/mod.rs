//! Cryptographic primitives and the password policy.
//!
//! - [`password`]: Argon2id hashing with fail-closed verification
//! - [`signature`]: RSA PKCS#1 v1.5 / SHA-256 firmware signatures
//! - [`policy`]: password strength rules checked by the driver

pub mod password;
pub mod policy;
pub mod signature;

pub use password::{hash_password, hash_password_with, verify_password, HashParams};
pub use policy::{PasswordPolicy, PolicyViolation};
pub use signature::{generate_keypair, sign, verify_signature, KeyPairPem};
