//! # Assistant models
//!
//! The Assistants v2 objects (assistants, vector stores, files, threads,
//! messages, runs) are `async_openai::types`. This module holds the few
//! lookups the crate makes on them.
//!
//! ```
//! use async_openai::types::RunStatus;
//! use vim_assist::models::is_terminal;
//!
//! assert!(is_terminal(&RunStatus::Expired));
//! assert!(!is_terminal(&RunStatus::InProgress));
//! ```

use async_openai::types::{
    AssistantObject, AssistantToolFileSearchResources, AssistantToolResources, MessageContent,
    MessageObject, RunStatus,
};

/// Whether the assistant's `file_search` tool searches `vector_store_id`.
pub fn searches_vector_store(assistant: &AssistantObject, vector_store_id: &str) -> bool {
    assistant
        .tool_resources
        .as_ref()
        .and_then(|resources| resources.file_search.as_ref())
        .is_some_and(|search| search.vector_store_ids.iter().any(|id| id == vector_store_id))
}

/// Resources pointing the `file_search` tool at a single vector store.
pub fn file_search_resources(vector_store_id: &str) -> AssistantToolResources {
    AssistantToolFileSearchResources {
        vector_store_ids: vec![vector_store_id.to_string()],
    }
    .into()
}

/// The first text part of the message, if any.
pub fn message_text(message: &MessageObject) -> Option<&str> {
    message.content.iter().find_map(|part| match part {
        MessageContent::Text(text) => Some(text.text.value.as_str()),
        _ => None,
    })
}

/// A run in a terminal status will never change again.
pub fn is_terminal(status: &RunStatus) -> bool {
    matches!(
        status,
        RunStatus::Cancelled
            | RunStatus::Failed
            | RunStatus::Completed
            | RunStatus::Incomplete
            | RunStatus::Expired
    )
}
