use std::io;

use anyhow::Result;
use serde::Serialize;
use termcolor::WriteColor;
use tracing::debug;

use crate::args::Cli;
use crate::config::{self, Target};
use crate::output::{self, Render};
use crate::shell::PassStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Issue,
    Refresh,
}

#[derive(Debug, Serialize)]
pub struct IssueOut {
    pub action: Action,
    pub derived_pass: String,
    #[serde(flatten)]
    pub status: PassStatus,
    pub signature: Option<String>,
    pub gateway_token: Option<String>,
}

impl Render for IssueOut {
    fn render(&self, out: &mut dyn WriteColor) -> io::Result<()> {
        output::field(out, "derived pass", &self.derived_pass)?;
        if let Some(token) = &self.gateway_token {
            output::field(out, "gateway token", token)?;
        }
        if let Some(signature) = &self.signature {
            output::field(out, "signature", signature)?;
        }
        self.status.render(out)
    }
}

pub async fn run(cli: &Cli, action: Action) -> Result<()> {
    let target = Target::from_cli(cli)?;
    let service = config::service(cli)?;
    let wallet = service.wallet_pubkey();

    let held = service
        .find_derived_pass_token(&wallet, &target.derived_pass)
        .await?
        .is_some();
    debug!(%wallet, derived_pass = %target.derived_pass, held, "checked existing pass");
    let mut status = PassStatus::new(held);
    let mut signature = None;
    let mut gateway_token = None;

    if action == Action::Issue && held {
        status.refuse("the wallet already holds this derived pass; refresh it instead");
    } else {
        let pb = output::spinner(match action {
            Action::Issue => "issuing derived pass",
            Action::Refresh => "refreshing derived pass",
        });
        let outcome = match action {
            Action::Issue => service.issue(&target.authority, &target.derived_pass).await,
            Action::Refresh => service.refresh(&target.authority, &target.derived_pass).await,
        };
        pb.finish_and_clear();

        status.record(&outcome, true);
        if let Ok((sig, token)) = &outcome {
            signature = Some(sig.to_string());
            gateway_token = Some(token.to_string());
        }
    }

    let report = IssueOut {
        action,
        derived_pass: target.derived_pass.to_string(),
        status,
        signature,
        gateway_token,
    };
    output::print(&report)?;
    report.status.settle()
}
