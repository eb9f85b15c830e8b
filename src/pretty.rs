//! # Terminal output
//!
//! Everything the CLI prints on stdout goes through here. Answers are printed
//! raw, or rendered as markdown with a [`termimad`] skin when `--pretty` is
//! given and stdout is a terminal; the editor reads the raw form. Summaries are
//! styled with [`console`], which drops the colors when stdout is piped.

use crate::{actions::KnowledgeFile, state::SessionState, sync::SyncReport};
use chrono::{DateTime, Local, Utc};
use console::{Term, style};
use std::{error::Error, path::Path, time::SystemTime};
use termimad::{MadSkin, crossterm::style::Color};

fn skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(Color::Cyan);
    skin.bold.set_fg(Color::White);
    skin.inline_code.set_fg(Color::Yellow);
    skin.code_block.set_fg(Color::Yellow);
    skin
}

/// Print an answer of the assistant.
pub fn print_answer(text: &str, pretty: bool) -> Result<(), Box<dyn Error>> {
    if pretty && Term::stdout().is_term() {
        skin().print_text(text);
    } else {
        println!("{text}");
    }
    Ok(())
}

/// One line describing what a sync did.
pub fn format_sync_report(report: &SyncReport) -> String {
    format!(
        "{} {} uploaded, {} kept, {} removed; {} files in the knowledge base",
        style("✓").green(),
        style(report.uploaded).bold(),
        report.kept,
        report.removed,
        style(report.remote_files).bold()
    )
}

/// One line per knowledge-base document: path, size, upload time.
pub fn format_document(document: &KnowledgeFile) -> String {
    let uploaded = DateTime::<Utc>::from_timestamp(i64::from(document.file.created_at), 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {}  {}",
        document.path.display(),
        style(format!("{} B", document.file.bytes)).dim(),
        style(uploaded).dim()
    )
}

/// The session record, one field per line.
pub fn format_status(state: &SessionState, record: &Path, saved: Option<SystemTime>) -> String {
    let value = |id: &str| {
        if id.is_empty() {
            style("(none)".to_string()).dim().to_string()
        } else {
            id.to_string()
        }
    };
    let saved = saved
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    [
        format!("{}  {}", style("record").bold(), record.display()),
        format!("{}   {}", style("saved").bold(), saved),
        format!("{}  {}", style("doc_dir").bold(), value(&state.doc_dir)),
        format!("{} {}", style("assistant").bold(), value(&state.assistant_id)),
        format!("{}  {}", style("vector_store").bold(), value(&state.vector_store_id)),
        format!("{}  {}", style("thread").bold(), value(&state.thread_id)),
    ]
    .join("\n")
}
