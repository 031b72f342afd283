use anyhow::Result;
use clap::Parser;
use repodesk_json::ValidationResult;
use serde::Serialize;

use crate::commands::plural;
use crate::commands::Command;
use crate::commands::Context;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Check {
    /// Files to check, relative to the workspace root. If omitted, checks
    /// every editable file in the workspace.
    paths: Vec<String>,

    /// Print one JSON report per file instead of annotated snippets.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Validated(ValidationResult),
    #[serde(rename_all = "camelCase")]
    Unreadable { ok: bool, read_error: String },
}

impl Outcome {
    fn is_ok(&self) -> bool {
        matches!(self, Self::Validated(result) if result.is_ok())
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

impl Command for Check {
    async fn execute(&self, ctx: &Context) -> Result<Exit> {
        let paths = if self.paths.is_empty() {
            ctx.default_paths().await?
        } else {
            self.paths.clone()
        };

        let renderer = ctx.renderer();
        let mut checked = Vec::with_capacity(paths.len());
        let mut unreadable = 0;
        for path in &paths {
            let content = match ctx.workspace.read(path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::debug!(%path, %err, "could not read file");
                    eprintln!("error: {err}");
                    unreadable += 1;
                    checked.push((
                        path.as_str(),
                        Outcome::Unreadable {
                            ok: false,
                            read_error: err.to_string(),
                        },
                    ));
                    continue;
                }
            };
            let result = repodesk_json::validate(&content);
            if let Some(error) = result.error() {
                tracing::debug!(%path, %error, "invalid JSON");
                if !self.json {
                    println!("{}\n", error.render(path, &content, &renderer));
                }
            }
            checked.push((path.as_str(), Outcome::Validated(result)));
        }

        if self.json {
            let reports: Vec<FileReport<'_>> = checked
                .iter()
                .map(|(path, outcome)| FileReport { path, outcome })
                .collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }

        let invalid = checked.iter().filter(|(_, outcome)| !outcome.is_ok()).count() - unreadable;
        let mut problems = Vec::new();
        if invalid > 0 {
            problems.push(format!(
                "Found invalid JSON in {} of {} checked.",
                plural(invalid, "file"),
                plural(checked.len(), "file")
            ));
        }
        if unreadable > 0 {
            problems.push(format!("Could not read {}.", plural(unreadable, "file")));
        }

        if problems.is_empty() {
            ctx.note(&format!("All {} valid.", plural(checked.len(), "file")));
            Ok(Exit::success())
        } else {
            Ok(Exit::error().with_message(problems.join(" ")))
        }
    }
}
