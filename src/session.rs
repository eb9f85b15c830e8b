//! # Remote session manager
//!
//! Makes sure the assistant, its vector store and a conversation thread exist
//! on the remote service, and keeps their ids in the [`SessionState`] record.
//!
//! Resources are created lazily the first time they are needed and retrieved
//! by id afterwards. When a stored id no longer resolves (the resource was
//! deleted remotely, or the record came from another account) a replacement
//! is created and the record is overwritten. Every change is saved right away,
//! so an interrupted command never forgets a resource it already created.
//!
//! There is no locking: two processes ensuring the same session concurrently
//! can both create a resource, and the last writer's id wins.

use crate::{
    api::AssistantApi,
    config::VimAssistConfig,
    models::{file_search_resources, searches_vector_store},
    state::{SessionState, StateStore},
};
use async_openai::types::{
    AssistantTools, AssistantToolsFileSearch, CreateAssistantRequest, CreateAssistantRequestArgs,
    CreateAssistantToolFileSearchResources,
};
use std::error::Error;
use tracing::{debug, info, warn};

/// Creates, retrieves and replaces the remote resources of one editing session.
pub struct SessionManager<'a, A> {
    api: &'a A,
    config: &'a VimAssistConfig,
    store: &'a StateStore,
}

impl<'a, A: AssistantApi> SessionManager<'a, A> {
    pub fn new(api: &'a A, config: &'a VimAssistConfig, store: &'a StateStore) -> Self {
        SessionManager { api, config, store }
    }

    /// Ensure the vector store, the assistant searching it, and a thread.
    pub async fn ensure_session(&self, state: &mut SessionState) -> Result<(), Box<dyn Error>> {
        let vector_store_id = self.ensure_vector_store(state).await?;
        self.ensure_assistant(state, &vector_store_id).await?;
        self.ensure_thread(state).await?;
        Ok(())
    }

    /// Return the id of a usable vector store, creating one when needed.
    ///
    /// A stored store whose name differs from the configured one is treated
    /// like a missing one.
    pub async fn ensure_vector_store(
        &self,
        state: &mut SessionState,
    ) -> Result<String, Box<dyn Error>> {
        if state.has_vector_store() {
            match self.api.retrieve_vector_store(&state.vector_store_id).await {
                Ok(store)
                    if store.name.as_deref() == Some(self.config.vector_store_name.as_str()) =>
                {
                    debug!("Reusing vector store {}", store.id);
                    return Ok(store.id);
                }
                Ok(store) => warn!(
                    "Vector store {} is named {:?}, not {:?}. Creating a new vector store.",
                    store.id, store.name, self.config.vector_store_name
                ),
                Err(e) => warn!(
                    "Failed to retrieve the vector store with ID {}: {}. Creating a new one.",
                    state.vector_store_id, e
                ),
            }
        }

        let store = self
            .api
            .create_vector_store(&self.config.vector_store_name)
            .await?;
        info!("Created a new vector store with ID {}.", store.id);
        state.vector_store_id = store.id.clone();
        self.store.save(state)?;
        Ok(store.id)
    }

    /// Return the id of a usable assistant whose `file_search` tool searches `vector_store_id`.
    pub async fn ensure_assistant(
        &self,
        state: &mut SessionState,
        vector_store_id: &str,
    ) -> Result<String, Box<dyn Error>> {
        if state.has_assistant() {
            match self.api.retrieve_assistant(&state.assistant_id).await {
                Ok(assistant) if searches_vector_store(&assistant, vector_store_id) => {
                    debug!("Reusing assistant {}", assistant.id);
                    return Ok(assistant.id);
                }
                Ok(assistant) => {
                    info!(
                        "Attaching vector store {} to assistant {}",
                        vector_store_id, assistant.id
                    );
                    let resources = file_search_resources(vector_store_id);
                    let assistant = self.api.modify_assistant(&assistant.id, resources).await?;
                    return Ok(assistant.id);
                }
                Err(e) => warn!(
                    "Failed to retrieve the assistant with ID {}: {}. Creating a new assistant.",
                    state.assistant_id, e
                ),
            }
        }

        let assistant = self
            .api
            .create_assistant(self.assistant_request(vector_store_id)?)
            .await?;
        info!("Created a new assistant with ID {}.", assistant.id);
        state.assistant_id = assistant.id.clone();
        self.store.save(state)?;
        Ok(assistant.id)
    }

    /// Return the id of a usable thread, creating one when needed.
    pub async fn ensure_thread(&self, state: &mut SessionState) -> Result<String, Box<dyn Error>> {
        if state.has_thread() {
            match self.api.retrieve_thread(&state.thread_id).await {
                Ok(thread) => return Ok(thread.id),
                Err(e) => warn!(
                    "Failed to retrieve the thread with ID {}: {}. Creating a new thread.",
                    state.thread_id, e
                ),
            }
        }

        self.create_thread(state).await
    }

    /// Drop the current conversation and start a new thread.
    ///
    /// Deleting the old thread is best effort; a failure is logged and the new
    /// thread is created anyway.
    pub async fn reset_thread(&self, state: &mut SessionState) -> Result<String, Box<dyn Error>> {
        if state.has_thread() {
            if let Err(e) = self.api.delete_thread(&state.thread_id).await {
                warn!("Failed to delete the old thread {}: {}", state.thread_id, e);
            } else {
                debug!("Deleted the old thread with ID {}.", state.thread_id);
            }
            state.thread_id.clear();
            self.store.save(state)?;
        }

        self.create_thread(state).await
    }

    async fn create_thread(&self, state: &mut SessionState) -> Result<String, Box<dyn Error>> {
        let thread = self.api.create_thread().await?;
        info!("Created a new thread with ID {}.", thread.id);
        state.thread_id = thread.id.clone();
        self.store.save(state)?;
        Ok(thread.id)
    }

    fn assistant_request(
        &self,
        vector_store_id: &str,
    ) -> Result<CreateAssistantRequest, Box<dyn Error>> {
        let file_search = CreateAssistantToolFileSearchResources {
            vector_store_ids: Some(vec![vector_store_id.to_string()]),
            vector_stores: None,
        };
        let request = CreateAssistantRequestArgs::default()
            .name(self.config.assistant_name.as_str())
            .model(self.config.model.as_str())
            .instructions(self.config.assistant_instructions.as_str())
            .tools(vec![
                AssistantTools::CodeInterpreter,
                AssistantToolsFileSearch::default().into(),
            ])
            .tool_resources(file_search)
            .build()?;
        Ok(request)
    }
}
