use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use termcolor::{Color, WriteColor};

use crate::args::Cli;
use crate::config::{self, Target};
use crate::output::{self, Render};

#[derive(Debug, Serialize)]
pub struct GatekeeperFeeOut {
    pub gatekeeper: String,
    pub lamports: u64,
}

#[derive(Debug, Serialize)]
pub struct TokenFeeOut {
    pub gatekeeper: String,
    pub mint: String,
    pub amount: u64,
}

#[derive(Debug, Serialize)]
pub struct QuoteOut {
    pub derived_pass: String,
    pub recipient: String,
    pub gatekeepers: Vec<GatekeeperFeeOut>,
    pub total_lamports: u64,
    pub token_fees: Vec<TokenFeeOut>,
    pub balance: u64,
    pub sufficient: bool,
}

impl Render for QuoteOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "derived pass", &self.derived_pass)?;
        output::field(out, "recipient", &self.recipient)?;
        for fee in &self.gatekeepers {
            output::field(out, "gatekeeper", format!("{} ({} lamports)", fee.gatekeeper, fee.lamports))?;
        }
        for fee in &self.token_fees {
            output::field(
                out,
                "token fee",
                format!("{} ({} of mint {})", fee.gatekeeper, fee.amount, fee.mint),
            )?;
        }
        output::field(out, "total", format!("{} lamports", self.total_lamports))?;
        output::field(out, "balance", format!("{} lamports", self.balance))?;
        if !self.sufficient {
            output::colored(out, Color::Yellow, "balance does not cover the fees")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

pub async fn run(cli: &Cli) -> Result<()> {
    let target = Target::from_cli(cli)?;
    let service = config::service(cli)?;
    let recipient = service.wallet_pubkey();

    let pb = output::spinner("quoting fees");
    let quote = service.quote_fees(&target.derived_pass, &recipient).await?;
    let balance = service.balance(&recipient).await?;
    pb.finish_and_clear();

    output::print(&QuoteOut {
        derived_pass: target.derived_pass.to_string(),
        recipient: recipient.to_string(),
        gatekeepers: quote
            .lamports_by_gatekeeper
            .iter()
            .map(|(gatekeeper, lamports)| GatekeeperFeeOut {
                gatekeeper: gatekeeper.to_string(),
                lamports: *lamports,
            })
            .collect(),
        total_lamports: quote.total_lamports,
        token_fees: quote
            .token_fees
            .iter()
            .map(|fee| TokenFeeOut {
                gatekeeper: fee.gatekeeper.to_string(),
                mint: fee.mint.to_string(),
                amount: fee.amount,
            })
            .collect(),
        balance,
        sufficient: balance >= quote.total_lamports,
    })
}
