//! # Content reviser
//!
//! One-shot text revision for the editor: the selection, the text around it
//! and a free-form instruction are folded into a fixed prompt and sent to the
//! chat-completion endpoint. Nothing is remembered between calls.
//!
//! ```
//! use vim_assist::reviser::{RevisionRequest, build_user_prompt};
//!
//! let request = RevisionRequest {
//!     selected_text: "Teh cat sat.".into(),
//!     instruction: "Fix the typo".into(),
//!     ..RevisionRequest::default()
//! };
//! assert!(build_user_prompt(&request).contains("Teh cat sat."));
//! ```

use crate::api::AssistantApi;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{debug, error, warn};

/// System prompt of every revision request.
pub const SYSTEM_PROMPT: &str = "You are a text content editor with great logic and writing skills. You are revising the content based on the user's request.
Instructions:
* If the selected text is not empty, you only rewrite the selected text. Otherwise, you are adding new content based on the user's request.
* Write concise and clear sentences to fulfill the user's request.
* Make your writing logically consistent with the context, by considering the text before and after the selected text.
* Make your writing follow the original language style, and keep the tone consistent.
* Only return the revised text, do not include your own comments or explanations.";

/// What the editor sends for one revision. An empty selection asks for new content.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RevisionRequest {
    pub selected_text: String,
    pub text_before: String,
    pub text_after: String,
    pub instruction: String,
}

/// The user message embedding the three text spans and the instruction.
pub fn build_user_prompt(request: &RevisionRequest) -> String {
    format!(
        "The text before the selected text:
{}

The selected text by user:
{}

The text after the selected text:
{}

User's request is:
{}

Your revision is:
",
        request.text_before, request.selected_text, request.text_after, request.instruction
    )
}

/// Request a revision, propagating failures.
///
/// # Errors
/// Fails on a blank instruction (without contacting the service) or on any remote error.
pub async fn try_revise<A: AssistantApi>(
    api: &A,
    model: &str,
    request: &RevisionRequest,
) -> Result<String, Box<dyn Error>> {
    if request.instruction.trim().is_empty() {
        return Err("User request is empty.".into());
    }

    debug!(
        "Revising {} selected chars with {} chars of context",
        request.selected_text.len(),
        request.text_before.len() + request.text_after.len()
    );
    api.complete_chat(model, SYSTEM_PROMPT, &build_user_prompt(request))
        .await
}

/// Request a revision; returns the revised text, or an empty string on a
/// blank instruction or any failure.
pub async fn revise_content<A: AssistantApi>(
    api: &A,
    model: &str,
    request: &RevisionRequest,
) -> String {
    if request.instruction.trim().is_empty() {
        warn!("User request is empty.");
        return String::new();
    }

    match try_revise(api, model, request).await {
        Ok(text) => text,
        Err(e) => {
            error!("Revision failed: {}", e);
            String::new()
        }
    }
}
