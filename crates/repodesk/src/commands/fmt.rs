use anyhow::Result;
use clap::Parser;
use repodesk_editor::EditorSession;
use repodesk_editor::SessionError;
use repodesk_source::ByteOffset;
use repodesk_source::Diagnostic;
use repodesk_source::DiagnosticRenderer;
use repodesk_source::Severity;
use repodesk_source::Span;

use crate::commands::plural;
use crate::commands::Command;
use crate::commands::Context;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Fmt {
    /// Files to format, relative to the workspace root. If omitted, formats
    /// every editable file in the workspace.
    paths: Vec<String>,

    /// Report files that would change without writing them.
    #[arg(long)]
    check: bool,
}

#[derive(Default)]
struct Tally {
    changed: usize,
    invalid: usize,
    unreadable: usize,
}

impl Command for Fmt {
    async fn execute(&self, ctx: &Context) -> Result<Exit> {
        let paths = if self.paths.is_empty() {
            ctx.default_paths().await?
        } else {
            self.paths.clone()
        };

        let tally = if self.check {
            check_formatting(ctx, &paths).await
        } else {
            format_in_place(ctx, &paths).await?
        };

        let unchanged = paths.len() - tally.changed - tally.invalid - tally.unreadable;
        let mut summary = if self.check {
            format!(
                "{} would be reformatted, {} already formatted.",
                plural(tally.changed, "file"),
                plural(unchanged, "file")
            )
        } else {
            format!(
                "{} reformatted, {} left unchanged.",
                plural(tally.changed, "file"),
                plural(unchanged, "file")
            )
        };
        if tally.invalid > 0 {
            summary.push_str(&format!(
                " Skipped {} with invalid JSON.",
                plural(tally.invalid, "file")
            ));
        }
        if tally.unreadable > 0 {
            summary.push_str(&format!(
                " Could not read {}.",
                plural(tally.unreadable, "file")
            ));
        }

        if tally.invalid > 0 || tally.unreadable > 0 || (self.check && tally.changed > 0) {
            Ok(Exit::error().with_message(summary))
        } else {
            ctx.note(&summary);
            Ok(Exit::success())
        }
    }
}

/// Report what formatting would change without touching any file.
async fn check_formatting(ctx: &Context, paths: &[String]) -> Tally {
    let renderer = ctx.renderer();
    let mut tally = Tally::default();
    for path in paths {
        let content = match ctx.workspace.read(path).await {
            Ok(content) => content,
            Err(err) => {
                eprintln!("error: {err}");
                tally.unreadable += 1;
                continue;
            }
        };
        match repodesk_json::unformatted_at(&content) {
            Ok(None) => {}
            Ok(Some(offset)) => {
                tally.changed += 1;
                println!("{}\n", render_unformatted(path, &content, offset, &renderer));
            }
            Err(error) => {
                tally.invalid += 1;
                println!("{}\n", error.render(path, &content, &renderer));
            }
        }
    }
    tally
}

/// Formatting goes through an editor session, the same load/format/save cycle
/// an interactive user gets.
async fn format_in_place(ctx: &Context, paths: &[String]) -> Result<Tally> {
    let mut session = EditorSession::new(ctx.workspace.clone(), ctx.settings.editor.clone());
    let renderer = ctx.renderer();
    let mut tally = Tally::default();

    for path in paths {
        if let Err(err) = session.open(path).await {
            eprintln!("error: {err}");
            tally.unreadable += 1;
            continue;
        }
        match session.format() {
            Ok(false) => {}
            Ok(true) => {
                tally.changed += 1;
                session.save().await?;
                tracing::debug!(%path, "reformatted");
            }
            Err(SessionError::Invalid(error)) => {
                tally.invalid += 1;
                if let Some(document) = session.document() {
                    println!("{}\n", error.render(path, document.content(), &renderer));
                }
            }
            Err(err) => return Err(err.into()),
        }
        session.close();
    }
    Ok(tally)
}

fn render_unformatted(
    path: &str,
    content: &str,
    offset: ByteOffset,
    renderer: &DiagnosticRenderer,
) -> String {
    let note = format!("run `repodesk fmt {path}` to rewrite it");
    let diagnostic = Diagnostic::new(
        content,
        path,
        repodesk_json::UNFORMATTED_CODE,
        "would reformat",
        Severity::Warning,
        Span::at_char(content, offset),
        "formatting differs from here",
    )
    .note(&note);
    renderer.render(&diagnostic)
}
