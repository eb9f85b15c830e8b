//! # Editor actions
//!
//! The entry points the editor plugin drives, each composing the session
//! record, the remote session manager, document sync, messaging and the
//! reviser.
//!
//! The `Result`-returning methods are what the CLI calls. The two
//! string-returning methods, [`Assist::send_message_to_assistant`] and
//! [`Assist::revise`], follow the plugin's convention of answering with an
//! empty string when anything goes wrong; the cause is logged.

use crate::{
    api::AssistantApi,
    config::VimAssistConfig,
    messaging::{PollSettings, send_message},
    reviser::{RevisionRequest, revise_content},
    session::SessionManager,
    state::{SessionState, StateStore},
    sync::{SyncReport, SyncStrategy, list_documents, sync_documents},
};
use async_openai::types::OpenAIFile;
use std::{
    error::Error,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

/// A document of the knowledge base, located in the synced directory.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeFile {
    pub path: PathBuf,
    pub file: OpenAIFile,
}

/// Editor-facing operations over one session record.
pub struct Assist<'a, A> {
    api: &'a A,
    config: &'a VimAssistConfig,
    store: &'a StateStore,
}

impl<'a, A: AssistantApi> Assist<'a, A> {
    pub fn new(api: &'a A, config: &'a VimAssistConfig, store: &'a StateStore) -> Self {
        Assist { api, config, store }
    }

    fn session(&self) -> SessionManager<'a, A> {
        SessionManager::new(self.api, self.config, self.store)
    }

    /// Mirror `doc_dir` into the knowledge base and start a fresh conversation.
    ///
    /// Records `doc_dir` (logging a switch away from another directory),
    /// ensures the vector store, syncs the directory's documents with
    /// `strategy`, ensures the assistant searches the store, then replaces the
    /// thread.
    pub async fn update_docs(
        &self,
        doc_dir: &Path,
        strategy: SyncStrategy,
    ) -> Result<SyncReport, Box<dyn Error>> {
        if !doc_dir.is_dir() {
            return Err(format!("{} is not a directory", doc_dir.display()).into());
        }

        let mut state = self.store.load_or_create()?;
        let doc_dir_name = doc_dir.display().to_string();
        if !state.is_doc_dir(&doc_dir_name) {
            if !state.doc_dir.is_empty() {
                info!(
                    "Switching the knowledge base from {} to {}",
                    state.doc_dir, doc_dir_name
                );
            }
            state.doc_dir = doc_dir_name;
            self.store.save(&state)?;
        }

        let session = self.session();
        let vector_store_id = session.ensure_vector_store(&mut state).await?;

        let documents = list_documents(doc_dir)?;
        info!("Found {} files in the working directory.", documents.len());
        let report = sync_documents(self.api, &vector_store_id, &documents, strategy)
            .await
            .map_err(|e| format!("Failed to update the vector store with the documents: {e}"))?;

        session.ensure_assistant(&mut state, &vector_store_id).await?;
        session.reset_thread(&mut state).await?;

        Ok(report)
    }

    /// Ask the assistant about the knowledge base.
    ///
    /// The session is ensured first, so a replaced vector store or thread is
    /// repaired and the assistant searches the current store.
    ///
    /// # Errors
    /// Fails on an empty message, when no assistant has been created yet, or
    /// when any step of the exchange fails.
    pub async fn ask(&self, message: &str) -> Result<String, Box<dyn Error>> {
        if message.trim().is_empty() {
            return Err("Message is empty.".into());
        }

        let mut state = self.store.load_or_create()?;
        if !state.has_assistant() {
            return Err("No assistant yet, run `vimassist update-docs <dir>` first".into());
        }
        self.session().ensure_session(&mut state).await?;

        let message = format!("{}{}", self.config.message_prefix, message);
        send_message(
            self.api,
            &state.assistant_id,
            &state.thread_id,
            &message,
            self.config.run_instructions.as_deref(),
            &PollSettings::from(self.config),
        )
        .await
    }

    /// [`Assist::ask`], answering with an empty string on failure.
    pub async fn send_message_to_assistant(&self, message: &str) -> String {
        if message.trim().is_empty() {
            warn!("Message is empty.");
            return String::new();
        }

        match self.ask(message).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to get answer: {}", e);
                String::new()
            }
        }
    }

    /// The documents currently in the knowledge base, sorted by path.
    pub async fn list_docs(&self) -> Result<Vec<KnowledgeFile>, Box<dyn Error>> {
        let state = self.store.load()?;
        if !state.has_vector_store() {
            return Err("No knowledge base yet, run `vimassist update-docs <dir>` first".into());
        }

        let doc_dir = Path::new(&state.doc_dir);
        let mut documents = Vec::new();
        for entry in self
            .api
            .list_vector_store_files(&state.vector_store_id)
            .await?
        {
            let file = self.api.retrieve_file(&entry.id).await?;
            documents.push(KnowledgeFile {
                path: doc_dir.join(&file.filename),
                file,
            });
        }
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    /// Revise text with the configured model; empty string on failure.
    pub async fn revise(&self, request: &RevisionRequest) -> String {
        revise_content(self.api, &self.config.model, request).await
    }

    /// Start a new conversation without touching the knowledge base.
    pub async fn new_thread(&self) -> Result<String, Box<dyn Error>> {
        let mut state = self.store.load_or_create()?;
        self.session().reset_thread(&mut state).await
    }

    /// The session record as stored.
    pub fn status(&self) -> Result<SessionState, Box<dyn Error>> {
        self.store.load_or_create()
    }
}
