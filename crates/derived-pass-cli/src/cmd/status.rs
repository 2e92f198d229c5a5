use std::io;

use anyhow::Result;
use derived_pass_client::{DerivedPassProperties, GatewayTokenAccount, GatewayTokenState};
use serde::Serialize;
use termcolor::WriteColor;

use crate::args::Cli;
use crate::config::{self, Target};
use crate::output::{self, Render};
use crate::shell::PassStatus;

#[derive(Debug, Serialize)]
pub struct SourceOut {
    pub network: String,
    pub component_pass: Option<String>,
    pub gatekeeper: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub address: String,
    pub state: GatewayTokenState,
    pub expire_time: Option<i64>,
}

impl From<&GatewayTokenAccount> for TokenOut {
    fn from(account: &GatewayTokenAccount) -> Self {
        Self {
            address: account.address.to_string(),
            state: account.token.state,
            expire_time: account.token.expire_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOut {
    pub derived_pass: String,
    pub authority: String,
    pub wallet: String,
    pub properties: DerivedPassProperties,
    pub sources: Vec<SourceOut>,
    #[serde(flatten)]
    pub status: PassStatus,
    pub token: Option<TokenOut>,
}

impl Render for StatusOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "derived pass", &self.derived_pass)?;
        output::field(out, "authority", &self.authority)?;
        output::field(out, "wallet", &self.wallet)?;
        for source in &self.sources {
            output::field(out, "source", &source.network)?;
            let pass = source.component_pass.as_deref().unwrap_or("missing");
            output::field(out, "component pass", pass)?;
        }
        if let Some(token) = &self.token {
            output::field(out, "gateway token", &token.address)?;
            output::field(out, "state", format!("{:?}", token.state))?;
            if let Some(expiry) = token.expire_time {
                output::field(out, "expires at", expiry)?;
            }
        }
        self.status.render(out)
    }
}

pub async fn run(cli: &Cli) -> Result<()> {
    let target = Target::from_cli(cli)?;
    let service = config::service(cli)?;
    let wallet = service.wallet_pubkey();

    let pb = output::spinner("reading derived pass");
    let pass = service.fetch_derived_pass(&target.derived_pass).await?;
    let components = service.find_component_passes(&target.derived_pass, &wallet).await?;
    let token = service.find_derived_pass_token(&wallet, &target.derived_pass).await?;
    pb.finish_and_clear();

    let sources = pass
        .source_gkns
        .iter()
        .map(|network| {
            let found = components.iter().find(|c| c.token.gatekeeper_network == *network);
            SourceOut {
                network: network.to_string(),
                component_pass: found.map(|c| c.address.to_string()),
                gatekeeper: found.map(|c| c.token.issuing_gatekeeper.to_string()),
            }
        })
        .collect();

    output::print(&StatusOut {
        derived_pass: target.derived_pass.to_string(),
        authority: pass.authority.to_string(),
        wallet: wallet.to_string(),
        properties: pass.properties,
        sources,
        status: PassStatus::new(token.is_some()),
        token: token.as_ref().map(TokenOut::from),
    })
}
