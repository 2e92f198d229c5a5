use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Parser, Debug, Clone)]
#[command(name = "derived-pass", version, about = "Create, issue and manage gateway derived passes")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// RPC endpoint.
    #[arg(long, short = 'u', global = true, env = "SOLANA_URL", default_value = DEFAULT_RPC_URL)]
    pub url: String,

    /// Wallet keypair file (default: ~/.config/solana/id.json).
    #[arg(long, short = 'k', global = true, env = "DERIVED_PASS_KEYPAIR")]
    pub keypair: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Commitment::Confirmed)]
    pub commitment: Commitment,

    /// Derived pass program id override.
    #[arg(long, global = true, env = "DERIVED_PASS_PROGRAM_ID")]
    pub program_id: Option<Pubkey>,

    /// Gateway program id override.
    #[arg(long, global = true, env = "GATEWAY_PROGRAM_ID")]
    pub gateway_program_id: Option<Pubkey>,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// The deployed derived pass a command acts on.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Authority that created the derived pass.
    #[arg(long, global = true, env = "DERIVED_PASS_AUTHORITY")]
    pub authority: Option<Pubkey>,

    /// Derived pass address.
    #[arg(long, global = true, env = "DERIVED_PASS")]
    pub derived_pass: Option<Pubkey>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a derived pass over one or more source gatekeeper networks.
    Create {
        /// Source gatekeeper network; repeat for each network.
        #[arg(long = "source", required = true)]
        sources: Vec<Pubkey>,

        /// Lifetime of issued tokens in seconds.
        #[arg(long)]
        expire_duration: Option<i64>,

        /// Issued tokens expire when used.
        #[arg(long)]
        expire_on_use: bool,

        /// Issued tokens cannot be refreshed.
        #[arg(long)]
        refresh_disabled: bool,
    },

    /// Issue the derived pass to the wallet, paying component pass fees.
    Issue,

    /// Refresh the wallet's derived pass token.
    Refresh,

    /// Set the wallet's fee for passes it issues on a gatekeeper network.
    SetFee {
        #[arg(long)]
        network: Pubkey,

        /// Fee in lamports.
        amount: u64,
    },

    /// Remove the wallet's fee on a gatekeeper network.
    UnsetFee {
        #[arg(long)]
        network: Pubkey,
    },

    /// Show the derived pass, its source networks and whether the wallet holds it.
    Status,

    /// Show the fees the wallet would pay to issue the derived pass.
    Quote,

    /// Derive program addresses offline.
    #[command(subcommand)]
    Pda(PdaCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum PdaCommand {
    /// Gatekeeper PDA of the target authority.
    Gatekeeper,

    /// Gateway program account registering the target authority's gatekeeper
    /// on the target derived pass.
    GatekeeperAccount,

    /// Fee account of a gatekeeper on a network.
    Fee {
        #[arg(long)]
        gatekeeper: Pubkey,
        #[arg(long)]
        network: Pubkey,
    },

    /// Gateway token of an owner on a network (or derived pass).
    Token {
        #[arg(long)]
        owner: Pubkey,
        #[arg(long)]
        network: Pubkey,
    },

    /// Account size for a number of source networks.
    Size {
        count: usize,
    },
}
