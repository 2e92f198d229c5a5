//! Derived pass service.
//!
//! This client can:
//! - create derived passes
//! - issue and refresh derived pass tokens, paying component pass fees
//! - create, update and remove gatekeeper fees
//! - read derived passes, fees and gateway tokens
//!
//! Every write signs with the service wallet, submits through the connection
//! and waits for confirmation. The service holds no mutable state; any number
//! of calls may share one instance.

use std::sync::Arc;

use futures::future::try_join_all;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::connection::{AccountFilter, Connection, RpcConnection};
use crate::constants::ProgramIds;
use crate::errors::{DerivedPassError, DerivedPassResult};
use crate::fees::{FeeAction, FeeQuote, FeeResolution};
use crate::instructions::{self, FeeAccounts, InitializeAccounts, InitializeArgs, IssueAccounts};
use crate::pda::{self, DerivedPassPdas};
use crate::state::{
    derived_pass_size_arg, select_gateway_token, AnchorAccount, DerivedPass,
    DerivedPassProperties, Fee, GatewayToken, GatewayTokenAccount,
};

/// Wallet capability: exposes a public key and signs transactions.
pub type Wallet = dyn Signer + Send + Sync;

/// Result of a `set_fee` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeUpdate {
    pub signature: Signature,
    pub fee_address: Pubkey,
    pub action: FeeAction,
}

#[derive(Clone)]
pub struct DerivedPassService {
    ids: ProgramIds,
    connection: Arc<dyn Connection>,
    wallet: Arc<Wallet>,
}

impl DerivedPassService {
    pub fn new(ids: ProgramIds, connection: Arc<dyn Connection>, wallet: Arc<Wallet>) -> Self {
        Self { ids, connection, wallet }
    }

    pub fn with_rpc(
        ids: ProgramIds,
        rpc_url: &str,
        commitment: CommitmentConfig,
        wallet: Arc<Wallet>,
    ) -> Self {
        Self::new(ids, Arc::new(RpcConnection::new(rpc_url, commitment)), wallet)
    }

    pub fn program_ids(&self) -> &ProgramIds {
        &self.ids
    }

    pub fn wallet_pubkey(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Create a derived pass requiring passes in every `source_pass_types`
    /// network. The wallet becomes its authority.
    ///
    /// Returns the transaction signature and the new derived pass address.
    pub async fn derive_pass(
        &self,
        source_pass_types: &[Pubkey],
        properties: DerivedPassProperties,
    ) -> DerivedPassResult<(Signature, Pubkey)> {
        let size = derived_pass_size_arg(source_pass_types)?;
        let derived_pass = Keypair::new();
        let authority = self.wallet.pubkey();
        let pdas = DerivedPassPdas::new(&self.ids, &authority, &derived_pass.pubkey());

        debug!(
            derived_pass = %derived_pass.pubkey(),
            %authority,
            gatekeeper = %pdas.gatekeeper.0,
            gatekeeper_account = %pdas.gatekeeper_account,
            sources = source_pass_types.len(),
            "initializing derived pass"
        );

        let accounts = InitializeAccounts {
            derived_pass: derived_pass.pubkey(),
            authority,
            derived_gatekeeper: pdas.gatekeeper.0,
            derived_gatekeeper_account: pdas.gatekeeper_account,
            gateway_program: self.ids.gateway,
        };
        let args = InitializeArgs {
            source_gkns: source_pass_types.to_vec(),
            size,
            gatekeeper_bump: pdas.gatekeeper.1,
            properties,
        };
        let ix = instructions::initialize(&self.ids.derived_pass, &accounts, &args)?;

        let signature = self.submit(&[ix], &[&derived_pass]).await?;
        Ok((signature, derived_pass.pubkey()))
    }

    /// Issue a token on `derived_pass` to the wallet.
    ///
    /// Returns the transaction signature and the issued gateway token address.
    pub async fn issue(
        &self,
        authority: &Pubkey,
        derived_pass: &Pubkey,
    ) -> DerivedPassResult<(Signature, Pubkey)> {
        let (accounts, fees) = self.token_accounts(authority, derived_pass).await?;
        let ix = instructions::issue(
            &self.ids.derived_pass,
            &accounts,
            fees.fee_bumps(),
            fees.remaining_accounts(),
        )?;
        let signature = self.submit(&[ix], &[]).await?;
        Ok((signature, accounts.gateway_token))
    }

    /// Refresh the wallet's token on `derived_pass`, paying component pass fees
    /// again.
    pub async fn refresh(
        &self,
        authority: &Pubkey,
        derived_pass: &Pubkey,
    ) -> DerivedPassResult<(Signature, Pubkey)> {
        let (accounts, fees) = self.token_accounts(authority, derived_pass).await?;
        let ix = instructions::refresh(
            &self.ids.derived_pass,
            &accounts,
            fees.fee_bumps(),
            fees.remaining_accounts(),
        )?;
        let signature = self.submit(&[ix], &[]).await?;
        Ok((signature, accounts.gateway_token))
    }

    async fn token_accounts(
        &self,
        authority: &Pubkey,
        derived_pass: &Pubkey,
    ) -> DerivedPassResult<(IssueAccounts, FeeResolution)> {
        let recipient = self.wallet.pubkey();
        let (gateway_token, _) = pda::derive_gateway_token(&self.ids.gateway, &recipient, derived_pass);
        let pdas = DerivedPassPdas::new(&self.ids, authority, derived_pass);

        let component_passes = self.find_component_passes(derived_pass, &recipient).await?;
        let fees = FeeResolution::resolve(&self.ids.derived_pass, &component_passes);

        debug!(
            %derived_pass,
            %recipient,
            %gateway_token,
            component_passes = fees.len(),
            "resolved issue accounts"
        );

        let accounts = IssueAccounts {
            derived_pass: *derived_pass,
            recipient,
            gateway_token,
            derived_gatekeeper: pdas.gatekeeper.0,
            derived_gatekeeper_account: pdas.gatekeeper_account,
            gateway_program: self.ids.gateway,
        };
        Ok((accounts, fees))
    }

    /// Set the wallet's fee for passes it issues on `gatekeeper_network`.
    ///
    /// Creates the fee account if it does not exist yet, otherwise updates it.
    /// The decision comes from one read made now; a concurrent creation makes
    /// the create fail on-chain.
    pub async fn set_fee(
        &self,
        gatekeeper_network: &Pubkey,
        amount: u64,
    ) -> DerivedPassResult<FeeUpdate> {
        let accounts = self.fee_accounts(gatekeeper_network);
        let existing = self.connection.get_account(&accounts.fee).await?;
        let action = FeeAction::decide(existing.as_ref(), &self.ids.derived_pass);

        debug!(
            fee = %accounts.fee,
            authority = %accounts.authority,
            %gatekeeper_network,
            amount,
            instruction = action.instruction_name(),
            "setting gatekeeper fee"
        );

        let ix = match action {
            FeeAction::Create => instructions::create_fee(&self.ids.derived_pass, &accounts, amount, None)?,
            FeeAction::Update => instructions::update_fee(&self.ids.derived_pass, &accounts, amount, None)?,
        };
        let signature = self.submit(&[ix], &[]).await?;
        Ok(FeeUpdate { signature, fee_address: accounts.fee, action })
    }

    /// Remove the wallet's fee on `gatekeeper_network`, closing the account.
    pub async fn unset_fee(
        &self,
        gatekeeper_network: &Pubkey,
    ) -> DerivedPassResult<(Signature, Pubkey)> {
        let accounts = self.fee_accounts(gatekeeper_network);
        debug!(
            fee = %accounts.fee,
            authority = %accounts.authority,
            %gatekeeper_network,
            "removing gatekeeper fee"
        );
        let ix = instructions::remove_fee(&self.ids.derived_pass, &accounts)?;
        let signature = self.submit(&[ix], &[]).await?;
        Ok((signature, accounts.fee))
    }

    fn fee_accounts(&self, gatekeeper_network: &Pubkey) -> FeeAccounts {
        let authority = self.wallet.pubkey();
        let (fee, _) =
            pda::derive_gatekeeper_fee_address(&self.ids.derived_pass, &authority, gatekeeper_network);
        FeeAccounts { fee, authority, gatekeeper_network: *gatekeeper_network }
    }

    pub async fn fetch_derived_pass(&self, address: &Pubkey) -> DerivedPassResult<DerivedPass> {
        let account = self
            .connection
            .get_account(address)
            .await?
            .ok_or(DerivedPassError::AccountNotFound(*address))?;
        if account.owner != self.ids.derived_pass {
            return Err(DerivedPassError::InvalidAccountData {
                address: *address,
                expected: DerivedPass::TYPE_NAME,
                reason: format!("owned by {}", account.owner),
            });
        }
        DerivedPass::decode(address, &account.data)
    }

    /// The fee `gatekeeper` charges on `network`, if one is registered.
    pub async fn fetch_fee(
        &self,
        gatekeeper: &Pubkey,
        network: &Pubkey,
    ) -> DerivedPassResult<Option<Fee>> {
        let (address, _) =
            pda::derive_gatekeeper_fee_address(&self.ids.derived_pass, gatekeeper, network);
        self.read_fee(&address).await
    }

    async fn read_fee(&self, address: &Pubkey) -> DerivedPassResult<Option<Fee>> {
        match self.connection.get_account(address).await? {
            Some(account) if account.owner == self.ids.derived_pass => {
                Fee::decode(address, &account.data).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Find the gateway token `owner` holds on `network`.
    pub async fn find_gateway_token(
        &self,
        owner: &Pubkey,
        network: &Pubkey,
    ) -> DerivedPassResult<Option<GatewayTokenAccount>> {
        let filters = [
            AccountFilter::memcmp(GatewayToken::OWNER_WALLET_OFFSET, owner),
            AccountFilter::memcmp(GatewayToken::GATEKEEPER_NETWORK_OFFSET, network),
        ];
        let accounts = self
            .connection
            .get_program_accounts(&self.ids.gateway, &filters)
            .await?;

        let candidates = accounts
            .into_iter()
            .filter_map(|(address, account)| match GatewayToken::decode(&address, &account.data) {
                Ok(token) => Some(GatewayTokenAccount { address, token }),
                Err(err) => {
                    warn!(%address, %err, "skipping undecodable gateway token");
                    None
                }
            })
            .collect();
        Ok(select_gateway_token(candidates, unix_now()))
    }

    /// The wallet's (or any owner's) token on a derived pass, used to tell
    /// whether the pass is already held.
    pub async fn find_derived_pass_token(
        &self,
        owner: &Pubkey,
        derived_pass: &Pubkey,
    ) -> DerivedPassResult<Option<GatewayTokenAccount>> {
        self.find_gateway_token(owner, derived_pass).await
    }

    /// Look up `owner`'s pass in every source network of `derived_pass`.
    ///
    /// Lookups run concurrently. Networks without a pass are skipped, and the
    /// result keeps the source network order.
    pub async fn find_component_passes(
        &self,
        derived_pass: &Pubkey,
        owner: &Pubkey,
    ) -> DerivedPassResult<Vec<GatewayTokenAccount>> {
        let pass = self.fetch_derived_pass(derived_pass).await?;
        let lookups = pass
            .source_gkns
            .iter()
            .map(|network| self.find_gateway_token(owner, network));
        let found = try_join_all(lookups).await?;

        let missing = found.iter().filter(|token| token.is_none()).count();
        if missing > 0 {
            debug!(%derived_pass, %owner, missing, "owner lacks component passes");
        }
        Ok(found.into_iter().flatten().collect())
    }

    /// Fees `recipient` would pay to issue a token on `derived_pass` now.
    pub async fn quote_fees(
        &self,
        derived_pass: &Pubkey,
        recipient: &Pubkey,
    ) -> DerivedPassResult<FeeQuote> {
        let component_passes = self.find_component_passes(derived_pass, recipient).await?;
        let resolution = FeeResolution::resolve(&self.ids.derived_pass, &component_passes);
        let reads = resolution
            .entries()
            .iter()
            .map(|entry| self.read_fee(&entry.fee_address));
        let fees = try_join_all(reads).await?;
        Ok(resolution.quote(&fees))
    }

    pub async fn balance(&self, address: &Pubkey) -> DerivedPassResult<u64> {
        self.connection.get_balance(address).await
    }

    async fn submit(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> DerivedPassResult<Signature> {
        let payer = self.wallet.pubkey();
        let blockhash = self.connection.get_latest_blockhash().await?;
        let transaction = self.sign(instructions, extra_signers, &payer, blockhash)?;

        let signature = self.connection.send_and_confirm_transaction(&transaction).await?;
        info!(%signature, %payer, "transaction confirmed");
        Ok(signature)
    }

    fn sign(
        &self,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
        payer: &Pubkey,
        blockhash: Hash,
    ) -> DerivedPassResult<Transaction> {
        let mut signers: Vec<&dyn Signer> = Vec::with_capacity(1 + extra_signers.len());
        signers.push(&*self.wallet);
        signers.extend(extra_signers.iter().map(|keypair| *keypair as &dyn Signer));

        let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
        transaction.try_sign(&signers, blockhash)?;
        Ok(transaction)
    }
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
