//! End-to-end service flows against an in-memory ledger.
//!
//! The ledger verifies signatures and emulates the derived pass program's
//! account effects closely enough to exercise fee creation, issuance with
//! fee payment, and the error paths the service classifies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use borsh::BorshDeserialize;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::InstructionError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};

use derived_pass_client::discriminator::instruction_discriminator;
use derived_pass_client::instructions::{
    split_data, CreateFeeArgs, InitializeArgs, IssueArgs, UpdateFeeArgs,
};
use derived_pass_client::state::AnchorAccount;
use derived_pass_client::{
    derive_gatekeeper, derive_gatekeeper_fee_address, derive_gateway_token, user_message,
    AccountFilter, Connection, DerivedPass, DerivedPassError, DerivedPassProperties,
    DerivedPassResult, DerivedPassService, Fee, FeeAction, GatewayToken, GatewayTokenState,
    ProgramErrorCode, ProgramFailure, ProgramIds,
};

const FIXED_ISSUE_ACCOUNTS: usize = 8;

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

struct Ledger {
    ids: ProgramIds,
    accounts: Mutex<HashMap<Pubkey, Account>>,
}

impl Ledger {
    fn new(ids: ProgramIds) -> Arc<Self> {
        Arc::new(Self { ids, accounts: Mutex::new(HashMap::new()) })
    }

    fn fund(&self, address: &Pubkey, lamports: u64) {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.entry(*address).or_default().lamports += lamports;
    }

    /// Seed a pass issued by `gatekeeper` to `owner` on `network`.
    fn grant_pass(&self, owner: &Pubkey, network: &Pubkey, gatekeeper: &Pubkey) -> Pubkey {
        let (address, _) = derive_gateway_token(&self.ids.gateway, owner, network);
        let token = GatewayToken {
            features: 0,
            parent_gateway_token: None,
            owner_wallet: *owner,
            owner_identity: None,
            gatekeeper_network: *network,
            issuing_gatekeeper: *gatekeeper,
            state: GatewayTokenState::Active,
            expire_time: None,
        };
        let account = Account {
            lamports: 1,
            data: borsh::to_vec(&token).unwrap(),
            owner: self.ids.gateway,
            ..Account::default()
        };
        self.accounts.lock().unwrap().insert(address, account);
        address
    }

    fn execute(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        keys: &[Pubkey],
        data: &[u8],
    ) -> Result<(), u32> {
        let (tag, args) = split_data(data).ok_or(ANCHOR_FALLBACK_NOT_FOUND)?;
        if tag == instruction_discriminator("initialize") {
            self.initialize(accounts, keys, args)
        } else if tag == instruction_discriminator("create_fee") {
            let args = CreateFeeArgs::try_from_slice(args).map_err(|_| DID_NOT_DESERIALIZE)?;
            self.write_fee(accounts, keys, args.amount, args.mint, true)
        } else if tag == instruction_discriminator("update_fee") {
            let args = UpdateFeeArgs::try_from_slice(args).map_err(|_| DID_NOT_DESERIALIZE)?;
            self.write_fee(accounts, keys, args.amount, args.mint, false)
        } else if tag == instruction_discriminator("remove_fee") {
            self.check_fee_address(keys)?;
            accounts.remove(&keys[0]).ok_or(ACCOUNT_NOT_INITIALIZED)?;
            Ok(())
        } else if tag == instruction_discriminator("issue") {
            self.issue(accounts, keys, args, false)
        } else if tag == instruction_discriminator("refresh") {
            self.issue(accounts, keys, args, true)
        } else {
            Err(ANCHOR_FALLBACK_NOT_FOUND)
        }
    }

    fn initialize(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        keys: &[Pubkey],
        args: &[u8],
    ) -> Result<(), u32> {
        let args = InitializeArgs::try_from_slice(args).map_err(|_| DID_NOT_DESERIALIZE)?;
        let (derived_pass, authority) = (keys[0], keys[1]);
        if derive_gatekeeper(&self.ids.derived_pass, &authority) != (keys[2], args.gatekeeper_bump) {
            return Err(CONSTRAINT_SEEDS);
        }
        let pass = DerivedPass {
            version: 0,
            authority,
            gatekeeper_bump: args.gatekeeper_bump,
            source_gkns: args.source_gkns,
            properties: args.properties,
        };
        let mut data = pass.encode().unwrap();
        data.resize(args.size as usize, 0);
        accounts.insert(
            derived_pass,
            Account { lamports: 1, data, owner: self.ids.derived_pass, ..Account::default() },
        );
        Ok(())
    }

    fn check_fee_address(&self, keys: &[Pubkey]) -> Result<(), u32> {
        let (fee, _) = derive_gatekeeper_fee_address(&self.ids.derived_pass, &keys[1], &keys[2]);
        if fee != keys[0] {
            return Err(CONSTRAINT_SEEDS);
        }
        Ok(())
    }

    fn write_fee(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        keys: &[Pubkey],
        amount: u64,
        mint: Option<Pubkey>,
        create: bool,
    ) -> Result<(), u32> {
        self.check_fee_address(keys)?;
        let exists = accounts.contains_key(&keys[0]);
        match (create, exists) {
            (true, true) => return Err(NON_EMPTY_ACCOUNT),
            (false, false) => return Err(ACCOUNT_NOT_INITIALIZED),
            _ => {}
        }
        let data = Fee { version: 0, amount, mint }.encode().unwrap();
        accounts.insert(
            keys[0],
            Account { lamports: 1, data, owner: self.ids.derived_pass, ..Account::default() },
        );
        Ok(())
    }

    fn issue(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        keys: &[Pubkey],
        args: &[u8],
        refresh: bool,
    ) -> Result<(), u32> {
        let args = IssueArgs::try_from_slice(args).map_err(|_| DID_NOT_DESERIALIZE)?;
        let (derived_pass, recipient, gateway_token) = (keys[0], keys[1], keys[2]);
        let pass_account = accounts.get(&derived_pass).ok_or(ACCOUNT_NOT_INITIALIZED)?;
        let pass = DerivedPass::decode(&derived_pass, &pass_account.data).map_err(|_| DID_NOT_DESERIALIZE)?;

        let remaining = &keys[FIXED_ISSUE_ACCOUNTS..];
        let n = args.fee_bumps.len();
        if remaining.len() != 3 * n {
            return Err(ProgramErrorCode::IncorrectFeeBumpCount.code());
        }
        if n < pass.source_gkns.len() {
            return Err(ProgramErrorCode::MissingComponentPass.code());
        }

        for (i, bump) in args.fee_bumps.iter().enumerate() {
            let (component, fee_address, gatekeeper) = (remaining[i], remaining[n + i], remaining[2 * n + i]);
            let token = accounts
                .get(&component)
                .and_then(|a| GatewayToken::decode(&component, &a.data).ok())
                .ok_or(ProgramErrorCode::InvalidComponentPass.code())?;
            if token.issuing_gatekeeper != gatekeeper {
                return Err(ProgramErrorCode::GatekeeperMismatch.code());
            }
            let expected = derive_gatekeeper_fee_address(
                &self.ids.derived_pass,
                &gatekeeper,
                &token.gatekeeper_network,
            );
            if expected != (fee_address, *bump) {
                return Err(ProgramErrorCode::InvalidFeeAccount.code());
            }
            let Some(fee) = accounts
                .get(&fee_address)
                .and_then(|a| Fee::decode(&fee_address, &a.data).ok())
            else {
                continue;
            };
            let payer = accounts.entry(recipient).or_default();
            payer.lamports = payer
                .lamports
                .checked_sub(fee.amount)
                .ok_or(ProgramErrorCode::PaymentUnderflow.code())?;
            let payee = accounts.entry(gatekeeper).or_default();
            payee.lamports = payee
                .lamports
                .checked_add(fee.amount)
                .ok_or(ProgramErrorCode::PaymentOverflow.code())?;
        }

        if refresh != accounts.contains_key(&gateway_token) {
            return Err(ProgramErrorCode::IssueError.code());
        }
        let token = GatewayToken {
            features: 0,
            parent_gateway_token: None,
            owner_wallet: recipient,
            owner_identity: None,
            gatekeeper_network: derived_pass,
            issuing_gatekeeper: keys[3],
            state: GatewayTokenState::Active,
            expire_time: pass.properties.expire_duration().map(|d| now() + d),
        };
        accounts.insert(
            gateway_token,
            Account {
                lamports: 1,
                data: borsh::to_vec(&token).unwrap(),
                owner: self.ids.gateway,
                ..Account::default()
            },
        );
        Ok(())
    }
}

const CONSTRAINT_SEEDS: u32 = 2006;
const NON_EMPTY_ACCOUNT: u32 = 6003;
const ANCHOR_FALLBACK_NOT_FOUND: u32 = 101;
const ACCOUNT_NOT_INITIALIZED: u32 = 3012;
const DID_NOT_DESERIALIZE: u32 = 3003;

fn program_failure(code: u32) -> DerivedPassError {
    let error = TransactionError::InstructionError(0, InstructionError::Custom(code));
    let mut logs = vec![format!("Program log: AnchorError occurred. Error Number: {code}.")];
    if let Some(known) = ProgramErrorCode::from_code(code) {
        logs.push(format!("Program log: Error Message: {}.", known.message()));
    }
    DerivedPassError::Program(ProgramFailure::new(
        &error,
        format!("custom program error: {code:#x}"),
        logs,
    ))
}

#[async_trait]
impl Connection for Ledger {
    async fn get_account(&self, address: &Pubkey) -> DerivedPassResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> DerivedPassResult<Vec<(Pubkey, Account)>> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .filter(|(_, a)| a.owner == *program_id)
            .filter(|(_, a)| filters.iter().all(|f| f.matches(&a.data)))
            .map(|(k, a)| (*k, a.clone()))
            .collect())
    }

    async fn get_balance(&self, address: &Pubkey) -> DerivedPassResult<u64> {
        Ok(self.accounts.lock().unwrap().get(address).map_or(0, |a| a.lamports))
    }

    async fn get_latest_blockhash(&self) -> DerivedPassResult<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> DerivedPassResult<Signature> {
        transaction.verify().map_err(|err| {
            DerivedPassError::Program(ProgramFailure::new(&err, err.to_string(), Vec::new()))
        })?;

        let message = &transaction.message;
        let mut accounts = self.accounts.lock().unwrap();
        let mut staged = accounts.clone();
        for ix in &message.instructions {
            let program_id = message.account_keys[ix.program_id_index as usize];
            assert_eq!(program_id, self.ids.derived_pass);
            let keys: Vec<Pubkey> =
                ix.accounts.iter().map(|i| message.account_keys[*i as usize]).collect();
            self.execute(&mut staged, &keys, &ix.data).map_err(program_failure)?;
        }
        *accounts = staged;
        Ok(transaction.signatures[0])
    }
}

fn service(ledger: &Arc<Ledger>, wallet: &Arc<Keypair>) -> DerivedPassService {
    DerivedPassService::new(ledger.ids, ledger.clone(), wallet.clone())
}

fn test_ids() -> ProgramIds {
    ProgramIds { derived_pass: Pubkey::new_unique(), gateway: Pubkey::new_unique() }
}

#[tokio::test]
async fn derive_pass_stores_sources_and_properties() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let svc = service(&ledger, &authority);

    let sources = vec![Pubkey::new_unique(), Pubkey::new_unique()];
    let properties = DerivedPassProperties::new(Some(3600), false, true);
    let (_, address) = svc.derive_pass(&sources, properties).await.unwrap();

    let pass = svc.fetch_derived_pass(&address).await.unwrap();
    assert_eq!(pass.authority, authority.pubkey());
    assert_eq!(pass.source_gkns, sources);
    assert_eq!(pass.properties, properties);
    assert_eq!(pass.gatekeeper_bump, derive_gatekeeper(&ledger.ids.derived_pass, &authority.pubkey()).1);

    let account = ledger.get_account(&address).await.unwrap().unwrap();
    assert_eq!(account.data.len(), derived_pass_client::calculate_derived_pass_size(2));
}

#[tokio::test]
async fn derive_pass_rejects_oversize_source_list_before_sending() {
    let ledger = Ledger::new(test_ids());
    let svc = service(&ledger, &Arc::new(Keypair::new()));

    let sources: Vec<Pubkey> = (0..7).map(|_| Pubkey::new_unique()).collect();
    let err = svc.derive_pass(&sources, DerivedPassProperties::default()).await.unwrap_err();
    assert!(matches!(err, DerivedPassError::TooManySourcePassTypes { count: 7, .. }));
    assert!(ledger.accounts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn set_fee_creates_then_updates_and_unset_removes() {
    let ledger = Ledger::new(test_ids());
    let gatekeeper = Arc::new(Keypair::new());
    let svc = service(&ledger, &gatekeeper);
    let network = Pubkey::new_unique();

    let created = svc.set_fee(&network, 100).await.unwrap();
    assert_eq!(created.action, FeeAction::Create);
    assert_eq!(
        created.fee_address,
        derive_gatekeeper_fee_address(&ledger.ids.derived_pass, &gatekeeper.pubkey(), &network).0
    );
    let fee = svc.fetch_fee(&gatekeeper.pubkey(), &network).await.unwrap().unwrap();
    assert_eq!((fee.amount, fee.mint), (100, None));

    let updated = svc.set_fee(&network, 250).await.unwrap();
    assert_eq!(updated.action, FeeAction::Update);
    assert_eq!(updated.fee_address, created.fee_address);
    assert_eq!(svc.fetch_fee(&gatekeeper.pubkey(), &network).await.unwrap().unwrap().amount, 250);

    let (_, removed) = svc.unset_fee(&network).await.unwrap();
    assert_eq!(removed, created.fee_address);
    assert!(svc.fetch_fee(&gatekeeper.pubkey(), &network).await.unwrap().is_none());
}

#[tokio::test]
async fn unset_fee_without_a_fee_is_a_program_failure() {
    let ledger = Ledger::new(test_ids());
    let svc = service(&ledger, &Arc::new(Keypair::new()));

    let err = svc.unset_fee(&Pubkey::new_unique()).await.unwrap_err();
    let DerivedPassError::Program(failure) = err else { panic!("expected program failure") };
    assert_eq!(failure.code, Some(ACCOUNT_NOT_INITIALIZED));
    assert_eq!(failure.code_name(), Some("AccountNotInitialized"));
}

#[tokio::test]
async fn issue_without_component_passes_fails_with_missing_component_pass() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let recipient = Arc::new(Keypair::new());
    let (_, derived_pass) = service(&ledger, &authority)
        .derive_pass(&[Pubkey::new_unique()], DerivedPassProperties::default())
        .await
        .unwrap();

    let err = service(&ledger, &recipient)
        .issue(&authority.pubkey(), &derived_pass)
        .await
        .unwrap_err();

    assert_eq!(err.program_error(), Some(ProgramErrorCode::MissingComponentPass));
    assert_eq!(user_message(&err), "At least one component pass is missing.");
}

#[tokio::test]
async fn issue_pays_a_shared_gatekeeper_once_per_component_pass() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let gatekeeper = Arc::new(Keypair::new());
    let recipient = Arc::new(Keypair::new());
    let (network_a, network_b) = (Pubkey::new_unique(), Pubkey::new_unique());

    let gk = service(&ledger, &gatekeeper);
    gk.set_fee(&network_a, 100).await.unwrap();
    gk.set_fee(&network_b, 1000).await.unwrap();

    let (_, derived_pass) = service(&ledger, &authority)
        .derive_pass(&[network_a, network_b], DerivedPassProperties::new(Some(60), false, false))
        .await
        .unwrap();

    ledger.grant_pass(&recipient.pubkey(), &network_a, &gatekeeper.pubkey());
    ledger.grant_pass(&recipient.pubkey(), &network_b, &gatekeeper.pubkey());
    ledger.fund(&recipient.pubkey(), 5_000);

    let svc = service(&ledger, &recipient);
    let quote = svc.quote_fees(&derived_pass, &recipient.pubkey()).await.unwrap();
    assert_eq!(quote.total_lamports, 1100);
    assert_eq!(quote.lamports_by_gatekeeper.get(&gatekeeper.pubkey()), Some(&1100));

    assert!(svc.find_derived_pass_token(&recipient.pubkey(), &derived_pass).await.unwrap().is_none());
    let (_, token_address) = svc.issue(&authority.pubkey(), &derived_pass).await.unwrap();

    assert_eq!(svc.balance(&gatekeeper.pubkey()).await.unwrap(), 1100);
    assert_eq!(svc.balance(&recipient.pubkey()).await.unwrap(), 3_900);

    let held = svc
        .find_derived_pass_token(&recipient.pubkey(), &derived_pass)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(held.address, token_address);
    assert!(held.token.is_valid(now()));
    assert!(held.token.expire_time.is_some());
}

#[tokio::test]
async fn issue_without_funds_to_pay_fees_underflows() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let gatekeeper = Arc::new(Keypair::new());
    let recipient = Arc::new(Keypair::new());
    let network = Pubkey::new_unique();

    service(&ledger, &gatekeeper).set_fee(&network, 500).await.unwrap();
    let (_, derived_pass) = service(&ledger, &authority)
        .derive_pass(&[network], DerivedPassProperties::default())
        .await
        .unwrap();
    ledger.grant_pass(&recipient.pubkey(), &network, &gatekeeper.pubkey());

    let svc = service(&ledger, &recipient);
    let err = svc.issue(&authority.pubkey(), &derived_pass).await.unwrap_err();
    assert_eq!(err.program_error(), Some(ProgramErrorCode::PaymentUnderflow));
    assert!(svc.find_derived_pass_token(&recipient.pubkey(), &derived_pass).await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_charges_fees_again_for_a_held_pass() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let gatekeeper = Arc::new(Keypair::new());
    let recipient = Arc::new(Keypair::new());
    let network = Pubkey::new_unique();

    service(&ledger, &gatekeeper).set_fee(&network, 40).await.unwrap();
    let (_, derived_pass) = service(&ledger, &authority)
        .derive_pass(&[network], DerivedPassProperties::default())
        .await
        .unwrap();
    ledger.grant_pass(&recipient.pubkey(), &network, &gatekeeper.pubkey());
    ledger.fund(&recipient.pubkey(), 100);

    let svc = service(&ledger, &recipient);
    let refresh_before_issue = svc.refresh(&authority.pubkey(), &derived_pass).await.unwrap_err();
    assert_eq!(refresh_before_issue.program_error(), Some(ProgramErrorCode::IssueError));

    let (_, issued) = svc.issue(&authority.pubkey(), &derived_pass).await.unwrap();
    let (_, refreshed) = svc.refresh(&authority.pubkey(), &derived_pass).await.unwrap();
    assert_eq!(issued, refreshed);
    assert_eq!(svc.balance(&gatekeeper.pubkey()).await.unwrap(), 80);
}

#[tokio::test]
async fn component_passes_skip_missing_networks_and_keep_order() {
    let ledger = Ledger::new(test_ids());
    let authority = Arc::new(Keypair::new());
    let recipient = Arc::new(Keypair::new());
    let networks = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];

    let (_, derived_pass) = service(&ledger, &authority)
        .derive_pass(&networks, DerivedPassProperties::default())
        .await
        .unwrap();
    let third = ledger.grant_pass(&recipient.pubkey(), &networks[2], &Pubkey::new_unique());
    let first = ledger.grant_pass(&recipient.pubkey(), &networks[0], &Pubkey::new_unique());

    let found = service(&ledger, &recipient)
        .find_component_passes(&derived_pass, &recipient.pubkey())
        .await
        .unwrap();
    let addresses: Vec<Pubkey> = found.iter().map(|p| p.address).collect();
    assert_eq!(addresses, vec![first, third]);
}

#[tokio::test]
async fn fetch_derived_pass_reports_missing_account() {
    let ledger = Ledger::new(test_ids());
    let svc = service(&ledger, &Arc::new(Keypair::new()));
    let address = Pubkey::new_unique();

    let err = svc.fetch_derived_pass(&address).await.unwrap_err();
    assert!(matches!(err, DerivedPassError::AccountNotFound(a) if a == address));
}
