//! # Document sync
//!
//! Mirrors a local directory into the assistant's vector store.
//!
//! Only regular files directly inside the directory take part; hidden files
//! (names starting with `.`) and subdirectories are ignored. Two strategies
//! reconcile the remote side:
//!
//! - [`SyncStrategy::Replace`] deletes every file of the store, then uploads
//!   every local document again. Simple and always exact, but re-uploads
//!   unchanged documents.
//! - [`SyncStrategy::Diff`] matches remote files to local documents by file
//!   name and byte size, keeps the matches, deletes the rest and uploads only
//!   what is missing.
//!
//! Nothing is rolled back: a failure halfway leaves the store with whatever had
//! been deleted or uploaded so far, and the next sync starts from there.
//!
//! A store entry whose file object is already gone is only detached. Deleting a
//! file object after its entry was detached is best effort, since the store
//! already mirrors the directory without it.

use crate::api::AssistantApi;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    error::Error,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// How the remote file set is reconciled with the local directory.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Delete every remote file, then upload every local document.
    #[default]
    Replace,
    /// Keep remote files whose name and size match a local document.
    Diff,
}

/// Outcome of a successful sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote files detached and deleted.
    pub removed: usize,
    /// Remote files left in place because they match a local document.
    pub kept: usize,
    /// Local documents uploaded and attached.
    pub uploaded: usize,
    /// Files attached to the vector store once the sync finished.
    pub remote_files: usize,
}

/// List the documents of `dir`: regular, non-hidden files at the top level, sorted by path.
pub fn list_documents(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        documents.push(path);
    }
    documents.sort();
    Ok(documents)
}

/// A remote file to take out of the vector store.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Removal {
    file_id: String,
    /// The file object no longer resolves; only the store entry is left.
    detach_only: bool,
}

impl Removal {
    fn new(file_id: String) -> Self {
        Removal {
            file_id,
            detach_only: false,
        }
    }
}

/// Make the files of `vector_store_id` mirror `documents`.
///
/// Every document is attempted even if an earlier one failed; the call fails
/// afterwards if any document could not be uploaded or attached. A file object
/// that uploads but cannot be attached is deleted again. A failed detach
/// aborts immediately.
///
/// # Errors
/// Returns the first remote error, or an error naming the documents that failed.
pub async fn sync_documents<A: AssistantApi>(
    api: &A,
    vector_store_id: &str,
    documents: &[PathBuf],
    strategy: SyncStrategy,
) -> Result<SyncReport, Box<dyn Error>> {
    let remote = api.list_vector_store_files(vector_store_id).await?;
    debug!(
        "Vector store {} holds {} files before sync",
        vector_store_id,
        remote.len()
    );

    let (stale, pending, kept) = match strategy {
        SyncStrategy::Replace => (
            remote
                .into_iter()
                .map(|file| Removal::new(file.id))
                .collect::<Vec<_>>(),
            documents.to_vec(),
            0,
        ),
        SyncStrategy::Diff => {
            let remote_ids: Vec<String> = remote.into_iter().map(|file| file.id).collect();
            plan_diff(api, &remote_ids, documents).await?
        }
    };

    let stale_ids: Vec<&str> = stale.iter().map(|r| r.file_id.as_str()).collect();
    info!("To be deleted file ids: {:?}", stale_ids);
    for removal in &stale {
        api.detach_file(vector_store_id, &removal.file_id).await?;
        if removal.detach_only {
            continue;
        }
        if let Err(e) = api.delete_file(&removal.file_id).await {
            warn!(
                "Detached {} but could not delete its file object: {}",
                removal.file_id, e
            );
        }
    }

    let progress = upload_progress(pending.len());
    let mut failed = Vec::new();
    let mut uploaded = 0;
    for path in &pending {
        progress.set_message(display_name(path));
        match upload_and_attach(api, vector_store_id, path).await {
            Ok(()) => uploaded += 1,
            Err(e) => {
                warn!("Failed to add {}: {}", path.display(), e);
                failed.push(path.display().to_string());
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if !failed.is_empty() {
        return Err(format!(
            "{} of {} documents failed to upload: {}",
            failed.len(),
            pending.len(),
            failed.join(", ")
        )
        .into());
    }

    let remote_files = api.list_vector_store_files(vector_store_id).await?.len();
    info!("Added {} files to the vector store.", uploaded);

    Ok(SyncReport {
        removed: stale.len(),
        kept,
        uploaded,
        remote_files,
    })
}

/// Upload one document and attach it; a file object left unattached is deleted again.
async fn upload_and_attach<A: AssistantApi>(
    api: &A,
    vector_store_id: &str,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let file = api.upload_file(path).await?;
    if let Err(e) = api.attach_file(vector_store_id, &file.id).await {
        if let Err(cleanup) = api.delete_file(&file.id).await {
            warn!("Could not delete unattached file {}: {}", file.id, cleanup);
        }
        return Err(e);
    }
    Ok(())
}

/// Split the remote files into removals, documents still to upload, and the kept count.
async fn plan_diff<A: AssistantApi>(
    api: &A,
    remote_ids: &[String],
    documents: &[PathBuf],
) -> Result<(Vec<Removal>, Vec<PathBuf>, usize), Box<dyn Error>> {
    // name -> (size, path) of every local document not matched yet
    let mut unmatched: HashMap<String, (u64, &PathBuf)> = HashMap::new();
    for path in documents {
        let size = fs::metadata(path)?.len();
        unmatched.insert(display_name(path), (size, path));
    }

    let mut stale = Vec::new();
    let mut kept = 0;
    for file_id in remote_ids {
        let file = match api.retrieve_file(file_id).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Dropping unresolvable remote file {}: {}", file_id, e);
                stale.push(Removal {
                    file_id: file_id.clone(),
                    detach_only: true,
                });
                continue;
            }
        };

        let unchanged = unmatched
            .get(&file.filename)
            .is_some_and(|(size, _)| *size == u64::from(file.bytes));
        if unchanged {
            debug!("Keeping {} ({})", file.filename, file_id);
            unmatched.remove(&file.filename);
            kept += 1;
        } else {
            stale.push(Removal::new(file_id.clone()));
        }
    }

    let mut pending: Vec<PathBuf> = unmatched.into_values().map(|(_, path)| path.clone()).collect();
    pending.sort();
    Ok((stale, pending, kept))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn upload_progress(len: usize) -> ProgressBar {
    let progress = ProgressBar::new(len as u64);
    let template = "{spinner} uploading [{pos}/{len}] {wide_msg}";
    if let Ok(style) = ProgressStyle::with_template(template) {
        progress.set_style(style);
    }
    progress
}
