//! PDA derivation helpers for the derived pass and gateway programs.
//!
//! These helpers implement deterministic address derivation and must match the
//! on-chain programs' seeds exactly. They perform no I/O. The only failure mode
//! is bump exhaustion inside `find_program_address`, which panics.

use solana_program::pubkey::Pubkey;

use crate::constants::{
    ProgramIds, DEFAULT_GATEWAY_TOKEN_SEED, FEE_SEED, GATEKEEPER_ACCOUNT_SEED, GATEKEEPER_SEED,
    GATEWAY_TOKEN_SEED,
};

/// Addresses shared by the initialize, issue and refresh flows of one derived pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPassPdas {
    pub gatekeeper: (Pubkey, u8),
    pub gatekeeper_account: Pubkey,
}

impl DerivedPassPdas {
    pub fn new(ids: &ProgramIds, authority: &Pubkey, derived_pass: &Pubkey) -> Self {
        let gatekeeper = derive_gatekeeper(&ids.derived_pass, authority);
        let (gatekeeper_account, _) =
            derive_gatekeeper_account(&ids.gateway, &gatekeeper.0, derived_pass);
        Self { gatekeeper, gatekeeper_account }
    }
}

/// Derive the gatekeeper PDA the program signs gateway CPIs with.
///
/// There is exactly one per authority.
pub fn derive_gatekeeper(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GATEKEEPER_SEED, authority.as_ref()], program_id)
}

/// Derive the gateway program account that registers `gatekeeper` on `network`.
pub fn derive_gatekeeper_account(
    gateway_program_id: &Pubkey,
    gatekeeper: &Pubkey,
    network: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[gatekeeper.as_ref(), network.as_ref(), GATEKEEPER_ACCOUNT_SEED],
        gateway_program_id,
    )
}

/// Derive the fee account a gatekeeper registers for passes on `network`.
pub fn derive_gatekeeper_fee_address(
    program_id: &Pubkey,
    gatekeeper: &Pubkey,
    network: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[FEE_SEED, gatekeeper.as_ref(), network.as_ref()], program_id)
}

/// Derive the default gateway token address of `owner` on `network`.
///
/// For a derived pass, `network` is the derived pass address itself.
pub fn derive_gateway_token(
    gateway_program_id: &Pubkey,
    owner: &Pubkey,
    network: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            owner.as_ref(),
            GATEWAY_TOKEN_SEED,
            &DEFAULT_GATEWAY_TOKEN_SEED,
            network.as_ref(),
        ],
        gateway_program_id,
    )
}
