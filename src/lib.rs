//! # VimAssist (library root)
//!
//! This crate provides the plumbing behind the `vimassist` CLI, which an editor
//! plugin drives to chat with an OpenAI assistant over a directory of documents
//! and to revise selected text:
//! - The Assistants v2 surface behind one trait, served by `async-openai`
//!   (`api`), plus small lookups over its types (`models`).
//! - The persisted session record (`state`) and the YAML settings (`config`).
//! - Knowledge-base sync (`sync`), remote session bookkeeping (`session`),
//!   question/answer runs (`messaging`) and text revision (`reviser`).
//! - The editor-facing entry points (`actions`), the CLI (`commands`) and its
//!   terminal output (`pretty`).
//!
//! ## Modules
//! - [`actions`], [`api`], [`commands`], [`config`], [`messaging`], [`models`],
//!   [`pretty`], [`reviser`], [`session`], [`state`], [`sync`]

use directories::ProjectDirs;
use std::{error::Error, path::PathBuf};

pub mod actions;
pub mod api;
pub mod commands;
pub mod config;
pub mod messaging;
pub mod models;
pub mod pretty;
pub mod reviser;
pub mod session;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod fake;

/// Return the per-platform configuration directory used by VimAssist.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "vimassist", "vimassist")`, e.g. `~/.config/vimassist` on Linux.
/// The settings file and, unless overridden, the session record live here.
///
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "vimassist", "vimassist")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Expand a leading `~` to the home directory, as the editor passes paths unexpanded.
///
/// ```
/// use std::path::PathBuf;
///
/// assert_eq!(vim_assist::expand_home("/srv/notes"), PathBuf::from("/srv/notes"));
/// ```
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}
