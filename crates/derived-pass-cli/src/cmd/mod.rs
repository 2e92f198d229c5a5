use anyhow::Result;

use crate::args::{Cli, Command};

mod create;
mod fee;
mod issue;
mod pda;
mod quote;
mod status;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Create { sources, expire_duration, expire_on_use, refresh_disabled } => {
            create::run(&cli, sources, *expire_duration, *expire_on_use, *refresh_disabled).await
        }
        Command::Issue => issue::run(&cli, issue::Action::Issue).await,
        Command::Refresh => issue::run(&cli, issue::Action::Refresh).await,
        Command::SetFee { network, amount } => fee::set(&cli, network, *amount).await,
        Command::UnsetFee { network } => fee::unset(&cli, network).await,
        Command::Status => status::run(&cli).await,
        Command::Quote => quote::run(&cli).await,
        Command::Pda(command) => pda::run(&cli, command),
    }
}
