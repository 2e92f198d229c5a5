//! Error types for the derived pass client.
//!
//! Three kinds of failure reach callers:
//! - local preconditions (oversize source lists, undecodable accounts, signing)
//! - RPC transport failures, passed through untouched
//! - on-chain failures, classified into [`ProgramFailure`] with the program's
//!   custom error code and the simulation logs when the node returned them
//!
//! Nothing here retries. Derivation exhaustion is not represented: it panics
//! inside `Pubkey::find_program_address`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_program::pubkey::Pubkey;
use solana_sdk::instruction::InstructionError;
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

pub type DerivedPassResult<T> = Result<T, DerivedPassError>;

#[derive(Debug, Error)]
pub enum DerivedPassError {
    #[error("rpc request failed: {0}")]
    Rpc(Box<ClientError>),

    #[error("{0}")]
    Program(#[from] ProgramFailure),

    #[error("account {0} does not exist")]
    AccountNotFound(Pubkey),

    #[error("account {address} is not a valid {expected}: {reason}")]
    InvalidAccountData {
        address: Pubkey,
        expected: &'static str,
        reason: String,
    },

    #[error("{count} source pass types need {size} bytes, more than a derived pass can hold")]
    TooManySourcePassTypes { count: usize, size: usize },

    #[error("signing failed: {0}")]
    Signer(#[from] SignerError),

    #[error("failed to encode instruction data: {0}")]
    Encode(#[from] std::io::Error),
}

impl From<ClientError> for DerivedPassError {
    fn from(err: ClientError) -> Self {
        match ProgramFailure::from_client_error(&err) {
            Some(failure) => Self::Program(failure),
            None => Self::Rpc(Box::new(err)),
        }
    }
}

impl DerivedPassError {
    /// The classified program error, if the transaction failed on-chain with one.
    pub fn program_error(&self) -> Option<ProgramErrorCode> {
        match self {
            Self::Program(failure) => failure.program_error(),
            _ => None,
        }
    }
}

/// A transaction that was rejected by a program.
#[derive(Debug, Clone)]
pub struct ProgramFailure {
    /// Custom error code returned by the failing instruction.
    pub code: Option<u32>,
    /// Raw error text as reported by the node.
    pub message: String,
    /// Program logs from preflight simulation, empty when unavailable.
    pub logs: Vec<String>,
}

impl ProgramFailure {
    pub fn new(error: &TransactionError, message: impl Into<String>, logs: Vec<String>) -> Self {
        let code = match error {
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
            _ => None,
        };
        Self { code, message: message.into(), logs }
    }

    fn from_client_error(err: &ClientError) -> Option<Self> {
        let transaction_error = err.get_transaction_error()?;
        let logs = match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
                ..
            }) => simulation.logs.clone().unwrap_or_default(),
            _ => Vec::new(),
        };
        Some(Self::new(&transaction_error, err.to_string(), logs))
    }

    pub fn program_error(&self) -> Option<ProgramErrorCode> {
        self.code.and_then(ProgramErrorCode::from_code)
    }

    /// Symbolic name of the error code, covering both the derived pass program
    /// and the Anchor framework constraint errors.
    pub fn code_name(&self) -> Option<&'static str> {
        let code = self.code?;
        ProgramErrorCode::from_code(code)
            .map(ProgramErrorCode::name)
            .or_else(|| anchor_error_name(code))
    }
}

impl fmt::Display for ProgramFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.program_error(), self.code_name()) {
            (Some(known), _) => write!(f, "{}: {} ({})", known.name(), known.message(), self.message),
            (None, Some(name)) => write!(f, "{name}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProgramFailure {}

/// Custom errors raised by the derived pass program.
///
/// Anchor numbers user errors from 6000 in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramErrorCode {
    MissingComponentPass,
    InvalidComponentPass,
    IssueError,
    NonEmptyAccount,
    GatekeeperMismatch,
    InvalidFeeAccount,
    PaymentOverflow,
    PaymentUnderflow,
    IncorrectFeeBumpCount,
}

const ERROR_CODE_OFFSET: u32 = 6000;

impl ProgramErrorCode {
    const ALL: [Self; 9] = [
        Self::MissingComponentPass,
        Self::InvalidComponentPass,
        Self::IssueError,
        Self::NonEmptyAccount,
        Self::GatekeeperMismatch,
        Self::InvalidFeeAccount,
        Self::PaymentOverflow,
        Self::PaymentUnderflow,
        Self::IncorrectFeeBumpCount,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        let index = code.checked_sub(ERROR_CODE_OFFSET)?;
        Self::ALL.get(index as usize).copied()
    }

    pub fn code(self) -> u32 {
        ERROR_CODE_OFFSET + self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MissingComponentPass => "MissingComponentPass",
            Self::InvalidComponentPass => "InvalidComponentPass",
            Self::IssueError => "IssueError",
            Self::NonEmptyAccount => "NonEmptyAccount",
            Self::GatekeeperMismatch => "GatekeeperMismatch",
            Self::InvalidFeeAccount => "InvalidFeeAccount",
            Self::PaymentOverflow => "PaymentOverflow",
            Self::PaymentUnderflow => "PaymentUnderflow",
            Self::IncorrectFeeBumpCount => "IncorrectFeeBumpCount",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::MissingComponentPass => "At least one component pass is missing",
            Self::InvalidComponentPass => "At least one of the passed-in component passes is invalid",
            Self::IssueError => "An error occurred during pass issuance",
            Self::NonEmptyAccount => "The passed account must be empty",
            Self::GatekeeperMismatch => {
                "A gatekeeper account was passed that does not match the associated component pass gatekeeper"
            }
            Self::InvalidFeeAccount => "At least one of the passed-in fee accounts is invalid",
            Self::PaymentOverflow => "An overflow error occurred during payment",
            Self::PaymentUnderflow => "An underflow error occurred during payment",
            Self::IncorrectFeeBumpCount => {
                "The list of fee bumps must be equal to the number of component gateway tokens"
            }
        }
    }
}

/// Names of the Anchor framework errors a client of this program can hit.
fn anchor_error_name(code: u32) -> Option<&'static str> {
    let name = match code {
        2000 => "ConstraintMut",
        2001 => "ConstraintHasOne",
        2002 => "ConstraintSigner",
        2003 => "ConstraintRaw",
        2004 => "ConstraintOwner",
        2005 => "ConstraintRentExempt",
        2006 => "ConstraintSeeds",
        2011 => "ConstraintClose",
        2012 => "ConstraintAddress",
        3001 => "AccountDiscriminatorNotFound",
        3002 => "AccountDiscriminatorMismatch",
        3003 => "AccountDidNotDeserialize",
        3007 => "AccountOwnedByWrongProgram",
        3012 => "AccountNotInitialized",
        _ => return None,
    };
    Some(name)
}

fn error_message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Error Message: (.*)").expect("static regex"))
}

/// Human-readable message for display.
///
/// Anchor logs carry an `Error Message: ...` line; when the error text or the
/// logs contain one, that message is returned. Otherwise the error's own text.
pub fn user_message(err: &DerivedPassError) -> String {
    let text = err.to_string();
    let logs: &[String] = match err {
        DerivedPassError::Program(failure) => &failure.logs,
        _ => &[],
    };

    std::iter::once(text.as_str())
        .chain(logs.iter().map(String::as_str))
        .find_map(extract_error_message)
        .unwrap_or(text)
}

fn extract_error_message(text: &str) -> Option<String> {
    error_message_pattern()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty())
}
