//! Constants shared between the on-chain derived pass program and clients.
//!
//! Keep these stable because they affect PDA derivation and account sizing.

use solana_program::pubkey::Pubkey;

/// PDA seed for the gatekeeper the derived pass program signs with.
pub const GATEKEEPER_SEED: &[u8] = b"gateway_derive_gk_seed";

/// PDA seed for gatekeeper fee accounts.
pub const FEE_SEED: &[u8] = b"gateway_derive_fee_seed";

/// Gateway program seed for gatekeeper accounts (gatekeeper <-> network link).
pub const GATEKEEPER_ACCOUNT_SEED: &[u8] = b"gatekeeper";

/// Gateway program seed for gateway token addresses.
pub const GATEWAY_TOKEN_SEED: &[u8] = b"gateway";

/// Additional seed used for the default gateway token of an owner.
pub const DEFAULT_GATEWAY_TOKEN_SEED: [u8; 8] = [0u8; 8];

/// Deployed derived pass program id.
pub const DERIVED_PASS_PROGRAM_ID: &str = "dpKGstEdwqh8pDfFh3Qrp1yJ85xbvbZtTcjRaq1yqip";

/// Deployed gateway program id.
pub const GATEWAY_PROGRAM_ID: &str = "gatem74V238djXdzWnJf94Wo1DcnuGkfijbf3AuBhfs";

/// Header bytes reserved in front of the source pass type list.
pub const DERIVED_PASS_HEADER_SIZE: usize = 16;

/// Bytes reserved after the source pass type list (authority-sized slot).
pub const DERIVED_PASS_TRAILER_SIZE: usize = 32;

/// expire_duration (i64) + expire_on_use (bool) + refresh_disabled (bool).
pub const DERIVED_PASS_PROPERTIES_SIZE: usize = 8 + 1 + 1;

pub const PUBKEY_SIZE: usize = 32;

/// Anchor account discriminator length.
pub const DISCRIMINATOR_SIZE: usize = 8;

pub fn derived_pass_program_id() -> Pubkey {
    DERIVED_PASS_PROGRAM_ID.parse().unwrap_or_default()
}

pub fn gateway_program_id() -> Pubkey {
    GATEWAY_PROGRAM_ID.parse().unwrap_or_default()
}

/// Program ids the client talks to.
///
/// The library never reads the environment; callers that target a different
/// deployment (localnet, a fork) pass their own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub derived_pass: Pubkey,
    pub gateway: Pubkey,
}

impl Default for ProgramIds {
    fn default() -> Self {
        Self {
            derived_pass: derived_pass_program_id(),
            gateway: gateway_program_id(),
        }
    }
}
