//! Chain connection abstraction.
//!
//! The service only needs a handful of reads plus send-and-confirm. Keeping
//! them behind [`Connection`] lets the same flows run against a node
//! ([`RpcConnection`]) or an in-memory ledger in tests. Timeouts, retries and
//! commitment are the connection's business.

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType};
use solana_program::pubkey::Pubkey;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::errors::DerivedPassResult;

/// Server-side filter for program account scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data at `offset` starts with `bytes`.
    Memcmp { offset: usize, bytes: Vec<u8> },
    DataSize(u64),
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl AsRef<[u8]>) -> Self {
        Self::Memcmp { offset, bytes: bytes.as_ref().to_vec() }
    }

    /// Evaluate the filter locally.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
            Self::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

impl From<&AccountFilter> for RpcFilterType {
    fn from(filter: &AccountFilter) -> Self {
        match filter {
            AccountFilter::Memcmp { offset, bytes } => RpcFilterType::Memcmp(Memcmp::new(
                *offset,
                MemcmpEncodedBytes::Base58(bs58::encode(bytes).into_string()),
            )),
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
        }
    }
}

#[async_trait]
pub trait Connection: Send + Sync {
    /// `None` when the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> DerivedPassResult<Option<Account>>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> DerivedPassResult<Vec<(Pubkey, Account)>>;

    async fn get_balance(&self, address: &Pubkey) -> DerivedPassResult<u64>;

    async fn get_latest_blockhash(&self) -> DerivedPassResult<Hash>;

    /// Submit a signed transaction and wait for the connection's commitment.
    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> DerivedPassResult<Signature>;
}

/// [`Connection`] backed by a JSON-RPC node.
pub struct RpcConnection {
    rpc: RpcClient,
}

impl RpcConnection {
    pub fn new(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.to_string(), commitment),
        }
    }

    pub fn from_client(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl Connection for RpcConnection {
    async fn get_account(&self, address: &Pubkey) -> DerivedPassResult<Option<Account>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> DerivedPassResult<Vec<(Pubkey, Account)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(RpcFilterType::from).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.rpc.commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        Ok(self
            .rpc
            .get_program_accounts_with_config(program_id, config)
            .await?)
    }

    async fn get_balance(&self, address: &Pubkey) -> DerivedPassResult<u64> {
        Ok(self.rpc.get_balance(address).await?)
    }

    async fn get_latest_blockhash(&self) -> DerivedPassResult<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> DerivedPassResult<Signature> {
        Ok(self.rpc.send_and_confirm_transaction(transaction).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memcmp_matches_window() {
        let data = [0u8, 1, 2, 3, 4, 5];
        assert!(AccountFilter::memcmp(2, [2u8, 3]).matches(&data));
        assert!(!AccountFilter::memcmp(2, [3u8]).matches(&data));
        assert!(!AccountFilter::memcmp(5, [5u8, 6]).matches(&data));
        assert!(!AccountFilter::memcmp(usize::MAX, [1u8]).matches(&data));
    }

    #[test]
    fn data_size_matches_exact_length() {
        assert!(AccountFilter::DataSize(3).matches(&[0, 0, 0]));
        assert!(!AccountFilter::DataSize(3).matches(&[0, 0]));
    }

    #[test]
    fn memcmp_converts_to_base58_rpc_filter() {
        let key = Pubkey::new_unique();
        let filter = RpcFilterType::from(&AccountFilter::memcmp(2, key));
        let json = serde_json::to_value(&filter).unwrap();

        assert_eq!(json["memcmp"]["offset"], 2);
        assert_eq!(json["memcmp"]["bytes"], key.to_string());
    }
}
