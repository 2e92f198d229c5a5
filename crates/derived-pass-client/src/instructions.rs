//! Instruction builders for the derived pass program.
//!
//! Instruction data is the Anchor sighash of the instruction name followed by
//! the Borsh-encoded arguments. Account lists follow the declaration order of
//! the program's account structs; the program matches them positionally.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_program::{system_program, sysvar};

use crate::discriminator::instruction_discriminator;
use crate::errors::DerivedPassResult;
use crate::state::DerivedPassProperties;

/// Borsh-encoded arguments of one program instruction.
pub trait InstructionArgs: BorshSerialize {
    const NAME: &'static str;

    fn data(&self) -> std::io::Result<Vec<u8>> {
        let mut data = instruction_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data)?;
        Ok(data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeArgs {
    pub source_gkns: Vec<Pubkey>,
    pub size: u8,
    pub gatekeeper_bump: u8,
    pub properties: DerivedPassProperties,
}

impl InstructionArgs for InitializeArgs {
    const NAME: &'static str = "initialize";
}

/// Arguments of `issue`: one fee account bump per component pass, in the same
/// order as the remaining accounts.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct IssueArgs {
    pub fee_bumps: Vec<u8>,
}

impl InstructionArgs for IssueArgs {
    const NAME: &'static str = "issue";
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RefreshArgs {
    pub fee_bumps: Vec<u8>,
}

impl InstructionArgs for RefreshArgs {
    const NAME: &'static str = "refresh";
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CreateFeeArgs {
    pub amount: u64,
    pub mint: Option<Pubkey>,
}

impl InstructionArgs for CreateFeeArgs {
    const NAME: &'static str = "create_fee";
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpdateFeeArgs {
    pub amount: u64,
    pub mint: Option<Pubkey>,
}

impl InstructionArgs for UpdateFeeArgs {
    const NAME: &'static str = "update_fee";
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RemoveFeeArgs {}

impl InstructionArgs for RemoveFeeArgs {
    const NAME: &'static str = "remove_fee";
}

#[derive(Debug, Clone)]
pub struct InitializeAccounts {
    /// Fresh account; signs the transaction.
    pub derived_pass: Pubkey,
    /// Payer and owner of the derived pass.
    pub authority: Pubkey,
    pub derived_gatekeeper: Pubkey,
    /// Created by the gateway program during initialize.
    pub derived_gatekeeper_account: Pubkey,
    pub gateway_program: Pubkey,
}

impl InitializeAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.derived_pass, true),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(self.derived_gatekeeper, false),
            AccountMeta::new(self.derived_gatekeeper_account, false),
            AccountMeta::new_readonly(self.gateway_program, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Fixed accounts of `issue` and `refresh`.
#[derive(Debug, Clone)]
pub struct IssueAccounts {
    pub derived_pass: Pubkey,
    /// Signer, payer of fees and rent.
    pub recipient: Pubkey,
    pub gateway_token: Pubkey,
    pub derived_gatekeeper: Pubkey,
    pub derived_gatekeeper_account: Pubkey,
    pub gateway_program: Pubkey,
}

impl IssueAccounts {
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.derived_pass, false),
            AccountMeta::new(self.recipient, true),
            AccountMeta::new(self.gateway_token, false),
            AccountMeta::new_readonly(self.derived_gatekeeper, false),
            AccountMeta::new_readonly(self.derived_gatekeeper_account, false),
            AccountMeta::new_readonly(self.gateway_program, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ]
    }
}

/// Accounts of `create_fee`, `update_fee` and `remove_fee`.
#[derive(Debug, Clone)]
pub struct FeeAccounts {
    pub fee: Pubkey,
    /// The gatekeeper charging the fee; signs.
    pub authority: Pubkey,
    pub gatekeeper_network: Pubkey,
}

impl FeeAccounts {
    fn base_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.fee, false),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(self.gatekeeper_network, false),
        ]
    }

    /// Accounts for create/update, which may allocate.
    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        let mut metas = self.base_metas();
        metas.push(AccountMeta::new_readonly(sysvar::rent::id(), false));
        metas.push(AccountMeta::new_readonly(system_program::id(), false));
        metas
    }
}

fn build<A: InstructionArgs>(
    program_id: &Pubkey,
    accounts: Vec<AccountMeta>,
    args: &A,
) -> DerivedPassResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: args.data()?,
    })
}

pub fn initialize(
    program_id: &Pubkey,
    accounts: &InitializeAccounts,
    args: &InitializeArgs,
) -> DerivedPassResult<Instruction> {
    build(program_id, accounts.to_account_metas(), args)
}

/// Build `issue`. `remaining` must hold the component pass, fee and gatekeeper
/// segments in that order, each aligned with `fee_bumps`.
pub fn issue(
    program_id: &Pubkey,
    accounts: &IssueAccounts,
    fee_bumps: Vec<u8>,
    remaining: Vec<AccountMeta>,
) -> DerivedPassResult<Instruction> {
    let mut metas = accounts.to_account_metas();
    metas.extend(remaining);
    build(program_id, metas, &IssueArgs { fee_bumps })
}

pub fn refresh(
    program_id: &Pubkey,
    accounts: &IssueAccounts,
    fee_bumps: Vec<u8>,
    remaining: Vec<AccountMeta>,
) -> DerivedPassResult<Instruction> {
    let mut metas = accounts.to_account_metas();
    metas.extend(remaining);
    build(program_id, metas, &RefreshArgs { fee_bumps })
}

pub fn create_fee(
    program_id: &Pubkey,
    accounts: &FeeAccounts,
    amount: u64,
    mint: Option<Pubkey>,
) -> DerivedPassResult<Instruction> {
    build(program_id, accounts.to_account_metas(), &CreateFeeArgs { amount, mint })
}

pub fn update_fee(
    program_id: &Pubkey,
    accounts: &FeeAccounts,
    amount: u64,
    mint: Option<Pubkey>,
) -> DerivedPassResult<Instruction> {
    build(program_id, accounts.to_account_metas(), &UpdateFeeArgs { amount, mint })
}

pub fn remove_fee(program_id: &Pubkey, accounts: &FeeAccounts) -> DerivedPassResult<Instruction> {
    build(program_id, accounts.base_metas(), &RemoveFeeArgs {})
}

/// Split instruction data into the discriminator and the encoded arguments.
///
/// Returns `None` for data shorter than a discriminator.
pub fn split_data(data: &[u8]) -> Option<([u8; 8], &[u8])> {
    if data.len() < 8 {
        return None;
    }
    let (tag, rest) = data.split_at(8);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(tag);
    Some((discriminator, rest))
}
