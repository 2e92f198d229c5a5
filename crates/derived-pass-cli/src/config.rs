//! Resolve CLI flags and environment into the values commands act on.
//!
//! Everything here is local. Commands resolve their configuration before the
//! first network call, so a missing target or unreadable wallet fails fast.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use derived_pass_client::{DerivedPassService, ProgramIds};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::read_keypair_file;

use crate::args::Cli;

/// The deployed derived pass and its authority.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub authority: Pubkey,
    pub derived_pass: Pubkey,
}

impl Target {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            authority: authority(cli)?,
            derived_pass: cli.target.derived_pass.ok_or_else(|| {
                anyhow!("no derived pass configured: set DERIVED_PASS or pass --derived-pass")
            })?,
        })
    }
}

pub fn authority(cli: &Cli) -> Result<Pubkey> {
    cli.target.authority.ok_or_else(|| {
        anyhow!("no derived pass authority configured: set DERIVED_PASS_AUTHORITY or pass --authority")
    })
}

pub fn program_ids(cli: &Cli) -> ProgramIds {
    let defaults = ProgramIds::default();
    ProgramIds {
        derived_pass: cli.program_id.unwrap_or(defaults.derived_pass),
        gateway: cli.gateway_program_id.unwrap_or(defaults.gateway),
    }
}

pub fn keypair_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.keypair {
        return Ok(path.clone());
    }
    let home = std::env::var_os("HOME")
        .ok_or_else(|| anyhow!("no wallet configured: pass --keypair or set DERIVED_PASS_KEYPAIR"))?;
    Ok(PathBuf::from(home).join(".config").join("solana").join("id.json"))
}

pub fn load_wallet(cli: &Cli) -> Result<Keypair> {
    let path = keypair_path(cli)?;
    if !path.exists() {
        return Err(anyhow!("no wallet configured: keypair file {} not found", path.display()));
    }
    read_keypair_file(&path).map_err(|err| anyhow!("failed to read keypair {}: {err}", path.display()))
}

/// Service signing with the configured wallet against the configured RPC.
pub fn service(cli: &Cli) -> Result<DerivedPassService> {
    let wallet = load_wallet(cli).context("wallet unavailable")?;
    Ok(DerivedPassService::with_rpc(
        program_ids(cli),
        &cli.url,
        cli.commitment.into(),
        Arc::new(wallet),
    ))
}
