use anyhow::Context as _;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use repodesk_conf::Settings;
use repodesk_workspace::WalkOptions;
use repodesk_workspace::Workspace;
use repodesk_workspace::WorkspaceRoot;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::Context;
use crate::commands::RepodeskCommand;
use crate::exit::Exit;
use crate::logging;

/// The main CLI structure that defines the command-line interface
#[derive(Parser)]
#[command(name = "repodesk")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: RepodeskCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments, set up the workspace and execute the chosen command
pub async fn run(args: Vec<String>) -> Result<Exit> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });
    let global = cli.args.global;

    let root = match &global.root {
        Some(root) => root.clone(),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Utf8PathBuf::from_path_buf(cwd)
                .map_err(|path| anyhow::anyhow!("{} is not valid UTF-8", path.display()))?
        }
    };

    let settings = Settings::new(&root).context("Failed to load settings")?;
    let _guard = logging::init_tracing(&global, settings.debug);

    let root = WorkspaceRoot::new(&root)
        .with_context(|| format!("Cannot use {root} as the workspace root"))?;
    tracing::debug!(root = %root.as_path(), ?settings, "workspace ready");

    let workspace = Workspace::new(root, WalkOptions::from(&settings.walk));
    let ctx = Context {
        workspace,
        settings,
        global,
    };

    cli.command.execute(&ctx).await
}
