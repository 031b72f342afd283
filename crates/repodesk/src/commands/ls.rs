use std::fmt::Write as _;

use anyhow::Result;
use clap::Parser;
use repodesk_workspace::EntryKind;
use repodesk_workspace::Listing;

use crate::commands::Command;
use crate::commands::Context;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Ls {
    /// Directory to list, relative to the workspace root.
    #[arg(default_value = ".")]
    path: String,

    /// Print the listing as JSON.
    #[arg(long)]
    json: bool,

    /// Only list files the editor can open.
    #[arg(long)]
    editable: bool,
}

impl Command for Ls {
    async fn execute(&self, ctx: &Context) -> Result<Exit> {
        let mut listing = ctx.workspace.list(&self.path).await?;
        if self.editable {
            listing = listing.editable_files(&ctx.settings.editor.extensions);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            print!("{}", render(&listing));
            for warning in &listing.warnings {
                ctx.note(&format!("warning: skipped {}: {}", warning.path, warning.reason));
            }
        }
        Ok(Exit::success())
    }
}

/// One line per entry: size column, then the path. Directories end in `/`.
fn render(listing: &Listing) -> String {
    let mut out = String::new();
    for entry in &listing.entries {
        let _ = match (entry.kind, entry.size) {
            (EntryKind::Directory, _) => writeln!(out, "{:>10}  {}/", "-", entry.path),
            (EntryKind::File, Some(size)) => writeln!(out, "{size:>10}  {}", entry.path),
            (EntryKind::File, None) => writeln!(out, "{:>10}  {}", "?", entry.path),
        };
    }
    out
}
