use std::io;

use anyhow::Result;
use derived_pass_client::{
    calculate_derived_pass_size, derive_gatekeeper, derive_gatekeeper_account,
    derive_gatekeeper_fee_address, derive_gateway_token,
};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use termcolor::WriteColor;

use crate::args::{Cli, PdaCommand};
use crate::config;
use crate::output::{self, Render};

#[derive(Debug, Serialize)]
pub struct PdaOut {
    pub kind: &'static str,
    pub address: String,
    pub bump: u8,
    pub program_id: String,
}

impl Render for PdaOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, self.kind, &self.address)?;
        output::field(out, "bump", self.bump)?;
        output::field(out, "program", &self.program_id)
    }
}

#[derive(Debug, Serialize)]
pub struct SizeOut {
    pub sources: usize,
    pub size: usize,
    /// Whether the size fits the program's one-byte size argument.
    pub fits: bool,
}

impl Render for SizeOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "sources", self.sources)?;
        output::field(out, "size", format!("{} bytes", self.size))?;
        output::field(out, "fits", self.fits)
    }
}

pub fn run(cli: &Cli, command: &PdaCommand) -> Result<()> {
    let ids = config::program_ids(cli);
    let pda = |kind, (address, bump): (Pubkey, u8), program_id: Pubkey| PdaOut {
        kind,
        address: address.to_string(),
        bump,
        program_id: program_id.to_string(),
    };

    match command {
        PdaCommand::Gatekeeper => {
            let authority = config::authority(cli)?;
            let derived = derive_gatekeeper(&ids.derived_pass, &authority);
            output::print(&pda("gatekeeper", derived, ids.derived_pass))
        }
        PdaCommand::GatekeeperAccount => {
            let target = config::Target::from_cli(cli)?;
            let (gatekeeper, _) = derive_gatekeeper(&ids.derived_pass, &target.authority);
            let derived = derive_gatekeeper_account(&ids.gateway, &gatekeeper, &target.derived_pass);
            output::print(&pda("gatekeeper account", derived, ids.gateway))
        }
        PdaCommand::Fee { gatekeeper, network } => {
            let derived = derive_gatekeeper_fee_address(&ids.derived_pass, gatekeeper, network);
            output::print(&pda("fee", derived, ids.derived_pass))
        }
        PdaCommand::Token { owner, network } => {
            let derived = derive_gateway_token(&ids.gateway, owner, network);
            output::print(&pda("gateway token", derived, ids.gateway))
        }
        PdaCommand::Size { count } => {
            let size = calculate_derived_pass_size(*count);
            output::print(&SizeOut {
                sources: *count,
                size,
                fits: u8::try_from(size).is_ok(),
            })
        }
    }
}
