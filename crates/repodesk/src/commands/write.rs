use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncReadExt;

use crate::commands::Command;
use crate::commands::Context;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Write {
    /// File to replace or create, relative to the workspace root.
    path: String,

    /// Refuse to write content that is not valid JSON.
    #[arg(long)]
    require_json: bool,
}

impl Command for Write {
    async fn execute(&self, ctx: &Context) -> Result<Exit> {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read stdin")?;

        if self.require_json {
            if let Err(error) = repodesk_json::format(&content) {
                println!(
                    "{}",
                    error.render(&self.path, &content, &ctx.renderer())
                );
                return Ok(Exit::error().with_message(format!("Refusing to write {}.", self.path)));
            }
        }

        ctx.workspace.write(&self.path, &content).await?;
        ctx.note(&format!("Wrote {} bytes to {}.", content.len(), self.path));
        Ok(Exit::success())
    }
}
