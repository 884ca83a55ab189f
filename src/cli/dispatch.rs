use super::config::cmd_config;
use super::env::CliArgs;
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Config => cmd_config(ctx).await,
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
    }
}
