mod cat;
mod check;
mod fmt;
mod ls;
mod write;

use std::io::IsTerminal;

use anyhow::Result;
use clap::Subcommand;
use repodesk_conf::Settings;
use repodesk_source::DiagnosticRenderer;
use repodesk_workspace::Workspace;

use crate::args::GlobalArgs;
use crate::exit::Exit;

/// Everything a command needs: the guarded workspace and the merged settings.
pub struct Context {
    pub workspace: Workspace,
    pub settings: Settings,
    pub global: GlobalArgs,
}

impl Context {
    /// Editable files to act on when a command is given no paths.
    async fn default_paths(&self) -> Result<Vec<String>> {
        let listing = self
            .workspace
            .list(".")
            .await?
            .editable_files(&self.settings.editor.extensions);
        Ok(listing.entries.into_iter().map(|entry| entry.path).collect())
    }

    fn renderer(&self) -> DiagnosticRenderer {
        if std::io::stdout().is_terminal() {
            DiagnosticRenderer::styled()
        } else {
            DiagnosticRenderer::plain()
        }
    }

    /// Progress notes for the user; silenced by `--quiet`.
    fn note(&self, message: &str) {
        if !self.global.quiet {
            eprintln!("{message}");
        }
    }
}

pub trait Command {
    async fn execute(&self, ctx: &Context) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum RepodeskCommand {
    /// List the files and directories of the workspace
    Ls(self::ls::Ls),
    /// Print a file
    Cat(self::cat::Cat),
    /// Replace a file with what is read from stdin
    Write(self::write::Write),
    /// Report JSON syntax errors
    Check(self::check::Check),
    /// Pretty-print JSON files in place
    Fmt(self::fmt::Fmt),
}

impl RepodeskCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<Exit> {
        match self {
            Self::Ls(cmd) => cmd.execute(ctx).await,
            Self::Cat(cmd) => cmd.execute(ctx).await,
            Self::Write(cmd) => cmd.execute(ctx).await,
            Self::Check(cmd) => cmd.execute(ctx).await,
            Self::Fmt(cmd) => cmd.execute(ctx).await,
        }
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
