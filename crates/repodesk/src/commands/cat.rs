use std::io::Write as _;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;

use crate::commands::Command;
use crate::commands::Context;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Cat {
    /// File to print, relative to the workspace root.
    path: String,
}

impl Command for Cat {
    async fn execute(&self, ctx: &Context) -> Result<Exit> {
        let content = ctx.workspace.read(&self.path).await?;
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .and_then(|()| stdout.flush())
            .context("Failed to write to stdout")?;
        Ok(Exit::success())
    }
}
