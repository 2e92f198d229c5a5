use std::io;

use anyhow::Result;
use derived_pass_client::FeeAction;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use termcolor::WriteColor;

use crate::args::Cli;
use crate::config;
use crate::output::{self, Render};

#[derive(Debug, Serialize)]
pub struct SetFeeOut {
    pub action: FeeAction,
    pub fee_address: String,
    pub gatekeeper: String,
    pub network: String,
    pub amount: u64,
    pub signature: String,
}

impl Render for SetFeeOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        let action = match self.action {
            FeeAction::Create => "created",
            FeeAction::Update => "updated",
        };
        output::field(out, "fee", action)?;
        output::field(out, "fee account", &self.fee_address)?;
        output::field(out, "gatekeeper", &self.gatekeeper)?;
        output::field(out, "network", &self.network)?;
        output::field(out, "amount", format!("{} lamports", self.amount))?;
        output::field(out, "signature", &self.signature)
    }
}

#[derive(Debug, Serialize)]
pub struct UnsetFeeOut {
    pub fee_address: String,
    pub network: String,
    pub signature: String,
}

impl Render for UnsetFeeOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "fee", "removed")?;
        output::field(out, "fee account", &self.fee_address)?;
        output::field(out, "network", &self.network)?;
        output::field(out, "signature", &self.signature)
    }
}

pub async fn set(cli: &Cli, network: &Pubkey, amount: u64) -> Result<()> {
    let service = config::service(cli)?;

    let pb = output::spinner("setting fee");
    let outcome = service.set_fee(network, amount).await;
    pb.finish_and_clear();
    let update = outcome?;

    output::print(&SetFeeOut {
        action: update.action,
        fee_address: update.fee_address.to_string(),
        gatekeeper: service.wallet_pubkey().to_string(),
        network: network.to_string(),
        amount,
        signature: update.signature.to_string(),
    })
}

pub async fn unset(cli: &Cli, network: &Pubkey) -> Result<()> {
    let service = config::service(cli)?;

    let pb = output::spinner("removing fee");
    let outcome = service.unset_fee(network).await;
    pb.finish_and_clear();
    let (signature, fee_address) = outcome?;

    output::print(&UnsetFeeOut {
        fee_address: fee_address.to_string(),
        network: network.to_string(),
        signature: signature.to_string(),
    })
}
