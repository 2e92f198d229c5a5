use std::io::{self, Write};

use anyhow::Result;
use derived_pass_client::DerivedPassProperties;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use termcolor::WriteColor;

use crate::args::Cli;
use crate::config;
use crate::output::{self, Render};

#[derive(Debug, Serialize)]
pub struct CreateOut {
    pub signature: String,
    pub derived_pass: String,
    pub authority: String,
    pub sources: Vec<String>,
    pub properties: DerivedPassProperties,
}

impl Render for CreateOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "derived pass", &self.derived_pass)?;
        output::field(out, "authority", &self.authority)?;
        for source in &self.sources {
            output::field(out, "source", source)?;
        }
        let expiry = match self.properties.expire_duration() {
            Some(seconds) => format!("{seconds}s"),
            None => "never".to_string(),
        };
        output::field(out, "expires", expiry)?;
        output::field(out, "expire on use", self.properties.expire_on_use)?;
        output::field(out, "refresh disabled", self.properties.refresh_disabled)?;
        output::field(out, "signature", &self.signature)?;
        writeln!(out)?;
        writeln!(out, "export DERIVED_PASS_AUTHORITY={}", self.authority)?;
        writeln!(out, "export DERIVED_PASS={}", self.derived_pass)
    }
}

pub async fn run(
    cli: &Cli,
    sources: &[Pubkey],
    expire_duration: Option<i64>,
    expire_on_use: bool,
    refresh_disabled: bool,
) -> Result<()> {
    let service = config::service(cli)?;
    let properties = DerivedPassProperties::new(expire_duration, expire_on_use, refresh_disabled);

    let pb = output::spinner("creating derived pass");
    let outcome = service.derive_pass(sources, properties).await;
    pb.finish_and_clear();
    let (signature, derived_pass) = outcome?;

    output::print(&CreateOut {
        signature: signature.to_string(),
        derived_pass: derived_pass.to_string(),
        authority: service.wallet_pubkey().to_string(),
        sources: sources.iter().map(Pubkey::to_string).collect(),
        properties,
    })
}
