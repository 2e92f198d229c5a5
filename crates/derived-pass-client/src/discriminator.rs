//! Anchor discriminators.
//!
//! Instructions are tagged with the first 8 bytes of `sha256("global:<name>")`,
//! accounts with the first 8 bytes of `sha256("account:<TypeName>")`.

use sha2::{Digest, Sha256};

pub const SIGHASH_GLOBAL_NAMESPACE: &str = "global";
pub const ACCOUNT_NAMESPACE: &str = "account";

pub fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash(SIGHASH_GLOBAL_NAMESPACE, name)
}

pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    sighash(ACCOUNT_NAMESPACE, type_name)
}
