//! On-chain account layouts.
//!
//! `DerivedPass` and `Fee` are Anchor accounts owned by the derived pass program
//! (8-byte discriminator followed by Borsh). `GatewayToken` is owned by the
//! gateway program and is plain Borsh. Account data may be longer than the
//! encoded value (accounts are allocated with headroom), so decoding reads a
//! prefix and ignores trailing bytes.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use solana_program::pubkey::Pubkey;

use crate::constants::{
    DERIVED_PASS_HEADER_SIZE, DERIVED_PASS_PROPERTIES_SIZE, DERIVED_PASS_TRAILER_SIZE,
    DISCRIMINATOR_SIZE, PUBKEY_SIZE,
};
use crate::discriminator::account_discriminator;
use crate::errors::{DerivedPassError, DerivedPassResult};

/// Bytes to allocate for a derived pass with `source_count` source pass types.
pub fn calculate_derived_pass_size(source_count: usize) -> usize {
    DERIVED_PASS_HEADER_SIZE
        + source_count * PUBKEY_SIZE
        + DERIVED_PASS_TRAILER_SIZE
        + DERIVED_PASS_PROPERTIES_SIZE
}

/// The `size` argument of `initialize`, which the program takes as a `u8`.
pub fn derived_pass_size_arg(source_gkns: &[Pubkey]) -> DerivedPassResult<u8> {
    let size = calculate_derived_pass_size(source_gkns.len());
    u8::try_from(size).map_err(|_| DerivedPassError::TooManySourcePassTypes {
        count: source_gkns.len(),
        size,
    })
}

/// Anchor account with a type-name discriminator.
pub trait AnchorAccount: BorshSerialize + BorshDeserialize {
    const TYPE_NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        account_discriminator(Self::TYPE_NAME)
    }

    fn decode(address: &Pubkey, data: &[u8]) -> DerivedPassResult<Self> {
        let invalid = |reason: String| DerivedPassError::InvalidAccountData {
            address: *address,
            expected: Self::TYPE_NAME,
            reason,
        };
        if data.len() < DISCRIMINATOR_SIZE {
            return Err(invalid(format!("{} bytes is shorter than a discriminator", data.len())));
        }
        let (tag, mut body) = data.split_at(DISCRIMINATOR_SIZE);
        if tag != Self::discriminator().as_slice() {
            return Err(invalid("discriminator mismatch".to_string()));
        }
        Self::deserialize(&mut body).map_err(|e| invalid(e.to_string()))
    }

    fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

/// Expiry and refresh behaviour of tokens issued against a derived pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct DerivedPassProperties {
    /// Lifetime of issued tokens in seconds; `0` issues tokens without expiry.
    pub expire_duration: i64,
    /// Tokens expire when they are used.
    pub expire_on_use: bool,
    /// Issued tokens cannot be refreshed.
    pub refresh_disabled: bool,
}

impl DerivedPassProperties {
    pub fn new(expire_duration: Option<i64>, expire_on_use: bool, refresh_disabled: bool) -> Self {
        Self {
            expire_duration: expire_duration.unwrap_or(0),
            expire_on_use,
            refresh_disabled,
        }
    }

    pub fn expire_duration(&self) -> Option<i64> {
        (self.expire_duration != 0).then_some(self.expire_duration)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DerivedPass {
    pub version: u8,
    pub authority: Pubkey,
    pub gatekeeper_bump: u8,
    /// Gatekeeper networks the recipient must hold a pass in.
    pub source_gkns: Vec<Pubkey>,
    pub properties: DerivedPassProperties,
}

impl AnchorAccount for DerivedPass {
    const TYPE_NAME: &'static str = "DerivedPass";
}

/// Fee a gatekeeper charges per issuance of a pass on one network.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Fee {
    pub version: u8,
    /// Lamports, unless `mint` is set.
    pub amount: u64,
    pub mint: Option<Pubkey>,
}

impl AnchorAccount for Fee {
    const TYPE_NAME: &'static str = "Fee";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub enum GatewayTokenState {
    Active,
    Frozen,
    Revoked,
}

/// Gateway program token account (a pass).
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GatewayToken {
    pub features: u8,
    pub parent_gateway_token: Option<Pubkey>,
    pub owner_wallet: Pubkey,
    pub owner_identity: Option<Pubkey>,
    pub gatekeeper_network: Pubkey,
    pub issuing_gatekeeper: Pubkey,
    pub state: GatewayTokenState,
    pub expire_time: Option<i64>,
}

impl GatewayToken {
    pub const TYPE_NAME: &'static str = "GatewayToken";

    /// Offset of `owner_wallet` for tokens without a parent token.
    pub const OWNER_WALLET_OFFSET: usize = 2;

    /// Offset of `gatekeeper_network` for tokens without parent or identity.
    pub const GATEKEEPER_NETWORK_OFFSET: usize = 35;

    pub fn decode(address: &Pubkey, mut data: &[u8]) -> DerivedPassResult<Self> {
        Self::deserialize(&mut data).map_err(|e| DerivedPassError::InvalidAccountData {
            address: *address,
            expected: Self::TYPE_NAME,
            reason: e.to_string(),
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_time.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_valid(&self, now: i64) -> bool {
        self.state == GatewayTokenState::Active && !self.is_expired(now)
    }
}

/// A gateway token together with its account address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayTokenAccount {
    pub address: Pubkey,
    pub token: GatewayToken,
}

/// Pick the token to present for one network: the first valid one, otherwise
/// the first non-revoked one.
pub fn select_gateway_token(
    candidates: Vec<GatewayTokenAccount>,
    now: i64,
) -> Option<GatewayTokenAccount> {
    let mut usable = candidates
        .into_iter()
        .filter(|candidate| candidate.token.state != GatewayTokenState::Revoked)
        .peekable();
    let first = usable.peek().cloned();
    usable.find(|candidate| candidate.token.is_valid(now)).or(first)
}
