//! Break-glass bootstrap admin key generation (spec §2: `bootstrap-key`).
//!
//! Same shape as [`crate::credentials::api_key::generate_raw_key`] — 32
//! random bytes, hex-encoded behind a fixed prefix — but under its own
//! prefix, since a bootstrap key is a distinct credential class from a
//! cloud API key: it's never stored in the database, only compared
//! constant-time against `NERVE_BOOTSTRAP_ADMIN_KEY` at request time
//! (`auth/resolver.rs`).

use rand::RngCore;

pub const BOOTSTRAP_KEY_PREFIX: &str = "nrv_bootstrap_";

/// Generates a fresh break-glass key. The operator is expected to set the
/// printed value as `NERVE_BOOTSTRAP_ADMIN_KEY` before starting the server;
/// this function has no side effect of its own.
pub fn generate_bootstrap_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{BOOTSTRAP_KEY_PREFIX}{}", hex::encode(bytes))
}
