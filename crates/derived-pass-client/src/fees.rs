//! Fee resolution for issue and refresh, and the create/update decision for
//! fee writes.
//!
//! Each component pass contributes one entry to three parallel account
//! segments: the pass itself, the fee account of its issuing gatekeeper on its
//! network (which may not exist), and the gatekeeper that receives payment.
//! The program walks the segments positionally, so their order must match.
//! A gatekeeper that issued several component passes appears once per pass.

use std::collections::BTreeMap;

use serde::Serialize;
use solana_program::instruction::AccountMeta;
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;

use crate::pda::derive_gatekeeper_fee_address;
use crate::state::{Fee, GatewayTokenAccount};

/// Which fee instruction a `set_fee` call submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeAction {
    Create,
    Update,
}

impl FeeAction {
    /// Decide from a single read of the fee account: update only when it exists
    /// and is owned by the derived pass program.
    pub fn decide(existing: Option<&Account>, program_id: &Pubkey) -> Self {
        match existing {
            Some(account) if account.owner == *program_id => Self::Update,
            _ => Self::Create,
        }
    }

    pub fn instruction_name(self) -> &'static str {
        match self {
            Self::Create => "create_fee",
            Self::Update => "update_fee",
        }
    }
}

/// Fee accounts for one component pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPassFee {
    pub component_pass: Pubkey,
    pub network: Pubkey,
    pub gatekeeper: Pubkey,
    pub fee_address: Pubkey,
    pub fee_bump: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeResolution {
    entries: Vec<ComponentPassFee>,
}

impl FeeResolution {
    pub fn resolve(program_id: &Pubkey, component_passes: &[GatewayTokenAccount]) -> Self {
        let entries = component_passes
            .iter()
            .map(|pass| {
                let gatekeeper = pass.token.issuing_gatekeeper;
                let network = pass.token.gatekeeper_network;
                let (fee_address, fee_bump) =
                    derive_gatekeeper_fee_address(program_id, &gatekeeper, &network);
                ComponentPassFee {
                    component_pass: pass.address,
                    network,
                    gatekeeper,
                    fee_address,
                    fee_bump,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ComponentPassFee] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fee account bumps, passed to the program so it can check each derivation.
    pub fn fee_bumps(&self) -> Vec<u8> {
        self.entries.iter().map(|e| e.fee_bump).collect()
    }

    /// Read-only component passes, then read-only fee accounts, then writable
    /// gatekeepers.
    pub fn remaining_accounts(&self) -> Vec<AccountMeta> {
        let passes = self
            .entries
            .iter()
            .map(|e| AccountMeta::new_readonly(e.component_pass, false));
        let fees = self
            .entries
            .iter()
            .map(|e| AccountMeta::new_readonly(e.fee_address, false));
        let gatekeepers = self
            .entries
            .iter()
            .map(|e| AccountMeta::new(e.gatekeeper, false));
        passes.chain(fees).chain(gatekeepers).collect()
    }

    /// Sum the lamport fees each gatekeeper would receive.
    ///
    /// `fees` is aligned with `entries()`; `None` means no fee account exists.
    /// Fees denominated in a mint are listed separately and not summed.
    pub fn quote(&self, fees: &[Option<Fee>]) -> FeeQuote {
        let mut quote = FeeQuote::default();
        for (entry, fee) in self.entries.iter().zip(fees) {
            let Some(fee) = fee else { continue };
            match fee.mint {
                None => {
                    let owed = quote.lamports_by_gatekeeper.entry(entry.gatekeeper).or_insert(0);
                    *owed = owed.saturating_add(fee.amount);
                    quote.total_lamports = quote.total_lamports.saturating_add(fee.amount);
                }
                Some(mint) => quote.token_fees.push(TokenFee {
                    gatekeeper: entry.gatekeeper,
                    mint,
                    amount: fee.amount,
                }),
            }
        }
        quote
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFee {
    pub gatekeeper: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
}

/// Fees a recipient pays on issue, grouped by the gatekeeper paid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeQuote {
    pub lamports_by_gatekeeper: BTreeMap<Pubkey, u64>,
    pub total_lamports: u64,
    pub token_fees: Vec<TokenFee>,
}
