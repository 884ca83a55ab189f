use anyhow::{Context, Result};

use crate::cli::context::CliContext;

pub async fn cmd_config(ctx: &CliContext) -> Result<()> {
    let yaml = ctx
        .config()
        .to_yaml()
        .context("Failed to serialize configuration")?;
    println!("# source: {}", ctx.source());
    print!("{yaml}");
    Ok(())
}
