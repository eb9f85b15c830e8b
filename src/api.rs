//! # API Module
//!
//! The remote surface vim_assist consumes, as a trait, plus the client that
//! implements it against an OpenAI-compatible server.
//!
//! [`OpenAiClient`] drives the whole surface through `async-openai`: the
//! assistant family (assistants, vector stores, files, threads, messages,
//! runs) with its request and response types, and chat completions for
//! revisions. `async-openai` adds the `OpenAI-Beta: assistants=v2` header to
//! every request.
//!
//! Higher-level modules ([`crate::session`], [`crate::sync`],
//! [`crate::messaging`], [`crate::reviser`]) are generic over [`AssistantApi`],
//! so their tests run against an in-memory double instead of a server.
//!
//! # Example
//!
//! ```no_run
//! use vim_assist::api::{AssistantApi, OpenAiClient};
//! use vim_assist::config::VimAssistConfig;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new(&VimAssistConfig::default())?;
//! let store = client.create_vector_store("vimassist_vector_store").await?;
//! println!("created {}", store.id);
//! # Ok(()) }
//! ```

use crate::config::VimAssistConfig;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        AssistantObject, AssistantToolResources, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateAssistantRequest, CreateChatCompletionRequestArgs, CreateFileRequestArgs,
        CreateMessageRequestArgs, CreateRunRequestArgs, CreateThreadRequest,
        CreateVectorStoreFileRequestArgs, CreateVectorStoreRequestArgs, FilePurpose, MessageObject,
        MessageRole, ModifyAssistantRequestArgs, OpenAIFile, RunObject, ThreadObject,
        VectorStoreFileObject, VectorStoreObject,
    },
};
use std::{error::Error, path::Path, time::Duration};
use tracing::debug;

/// Page size used when walking list endpoints.
const PAGE_LIMIT: u32 = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations consumed from the remote service.
///
/// Failures are returned as-is.
#[allow(async_fn_in_trait)]
pub trait AssistantApi {
    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreObject, Box<dyn Error>>;

    async fn retrieve_vector_store(
        &self,
        vector_store_id: &str,
    ) -> Result<VectorStoreObject, Box<dyn Error>>;

    /// Every file attached to the vector store, across all pages.
    async fn list_vector_store_files(
        &self,
        vector_store_id: &str,
    ) -> Result<Vec<VectorStoreFileObject>, Box<dyn Error>>;

    async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<VectorStoreFileObject, Box<dyn Error>>;

    /// Remove a file from the vector store. The file object itself survives.
    async fn detach_file(&self, vector_store_id: &str, file_id: &str)
    -> Result<(), Box<dyn Error>>;

    /// Upload a local file with purpose `assistants`.
    async fn upload_file(&self, path: &Path) -> Result<OpenAIFile, Box<dyn Error>>;

    async fn retrieve_file(&self, file_id: &str) -> Result<OpenAIFile, Box<dyn Error>>;

    async fn delete_file(&self, file_id: &str) -> Result<(), Box<dyn Error>>;

    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> Result<AssistantObject, Box<dyn Error>>;

    async fn retrieve_assistant(
        &self,
        assistant_id: &str,
    ) -> Result<AssistantObject, Box<dyn Error>>;

    /// Point the assistant's tools at other resources.
    async fn modify_assistant(
        &self,
        assistant_id: &str,
        tool_resources: AssistantToolResources,
    ) -> Result<AssistantObject, Box<dyn Error>>;

    async fn create_thread(&self) -> Result<ThreadObject, Box<dyn Error>>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<ThreadObject, Box<dyn Error>>;

    async fn delete_thread(&self, thread_id: &str) -> Result<(), Box<dyn Error>>;

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<MessageObject, Box<dyn Error>>;

    /// The `limit` most recent messages of the thread, newest first.
    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<MessageObject>, Box<dyn Error>>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<RunObject, Box<dyn Error>>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str)
    -> Result<RunObject, Box<dyn Error>>;

    /// One chat completion with a system and a user message; returns the first choice's text.
    async fn complete_chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, Box<dyn Error>>;
}

/// `async-openai` implementation of [`AssistantApi`].
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiClient {
    /// Creates a client from the settings, resolving the API key from the
    /// environment when the settings leave it empty.
    pub fn new(config: &VimAssistConfig) -> Result<Self, Box<dyn Error>> {
        let api_key = config.resolve_api_key()?;
        Self::with_credentials(&config.api_base, &api_key)
    }

    pub fn with_credentials(api_base: &str, api_key: &str) -> Result<Self, Box<dyn Error>> {
        let api_base = api_base.trim_end_matches('/');
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        debug!("Client created for {}", api_base);

        Ok(OpenAiClient {
            client: Client::with_config(openai_config).with_http_client(http),
        })
    }
}

impl AssistantApi for OpenAiClient {
    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreObject, Box<dyn Error>> {
        let request = CreateVectorStoreRequestArgs::default().name(name).build()?;
        debug!("Creating vector store {}", name);
        Ok(self.client.vector_stores().create(request).await?)
    }

    async fn retrieve_vector_store(
        &self,
        vector_store_id: &str,
    ) -> Result<VectorStoreObject, Box<dyn Error>> {
        Ok(self.client.vector_stores().retrieve(vector_store_id).await?)
    }

    async fn list_vector_store_files(
        &self,
        vector_store_id: &str,
    ) -> Result<Vec<VectorStoreFileObject>, Box<dyn Error>> {
        let vector_stores = self.client.vector_stores();
        let store_files = vector_stores.files(vector_store_id);
        let mut files = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }
            debug!("Listing files of {} {:?}", vector_store_id, query);
            let page = store_files.list(&query).await?;

            files.extend(page.data);
            match page.last_id {
                Some(last_id) if page.has_more => after = Some(last_id),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<VectorStoreFileObject, Box<dyn Error>> {
        let request = CreateVectorStoreFileRequestArgs::default()
            .file_id(file_id)
            .build()?;
        let attached = self
            .client
            .vector_stores()
            .files(vector_store_id)
            .create(request)
            .await?;
        Ok(attached)
    }

    async fn detach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<(), Box<dyn Error>> {
        let status = self
            .client
            .vector_stores()
            .files(vector_store_id)
            .delete(file_id)
            .await?;
        deleted(status.deleted, &status.id)
    }

    async fn upload_file(&self, path: &Path) -> Result<OpenAIFile, Box<dyn Error>> {
        let request = CreateFileRequestArgs::default()
            .file(path)
            .purpose(FilePurpose::Assistants)
            .build()?;
        debug!("Uploading {}", path.display());
        Ok(self.client.files().create(request).await?)
    }

    async fn retrieve_file(&self, file_id: &str) -> Result<OpenAIFile, Box<dyn Error>> {
        Ok(self.client.files().retrieve(file_id).await?)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), Box<dyn Error>> {
        let status = self.client.files().delete(file_id).await?;
        deleted(status.deleted, &status.id)
    }

    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        debug!("Creating assistant {:?}", request.name);
        Ok(self.client.assistants().create(request).await?)
    }

    async fn retrieve_assistant(
        &self,
        assistant_id: &str,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        Ok(self.client.assistants().retrieve(assistant_id).await?)
    }

    async fn modify_assistant(
        &self,
        assistant_id: &str,
        tool_resources: AssistantToolResources,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        let request = ModifyAssistantRequestArgs::default()
            .tool_resources(tool_resources)
            .build()?;
        Ok(self.client.assistants().update(assistant_id, request).await?)
    }

    async fn create_thread(&self) -> Result<ThreadObject, Box<dyn Error>> {
        Ok(self
            .client
            .threads()
            .create(CreateThreadRequest::default())
            .await?)
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<ThreadObject, Box<dyn Error>> {
        Ok(self.client.threads().retrieve(thread_id).await?)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), Box<dyn Error>> {
        let status = self.client.threads().delete(thread_id).await?;
        deleted(status.deleted, &status.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<MessageObject, Box<dyn Error>> {
        let request = CreateMessageRequestArgs::default()
            .role(MessageRole::User)
            .content(content)
            .build()?;
        Ok(self
            .client
            .threads()
            .messages(thread_id)
            .create(request)
            .await?)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<MessageObject>, Box<dyn Error>> {
        let query = [("limit", limit.to_string()), ("order", "desc".to_string())];
        let page = self
            .client
            .threads()
            .messages(thread_id)
            .list(&query)
            .await?;
        Ok(page.data)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<RunObject, Box<dyn Error>> {
        let mut args = CreateRunRequestArgs::default();
        args.assistant_id(assistant_id);
        if let Some(instructions) = instructions {
            args.instructions(instructions);
        }
        let request = args.build()?;
        Ok(self.client.threads().runs(thread_id).create(request).await?)
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, Box<dyn Error>> {
        Ok(self.client.threads().runs(thread_id).retrieve(run_id).await?)
    }

    async fn complete_chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, Box<dyn Error>> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()?;

        debug!("Sending request: {:?}", request);

        let response = self.client.chat().create(request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(text)
    }
}

/// The delete endpoints answer 200 with `deleted: false` when they refuse.
fn deleted(deleted: bool, id: &str) -> Result<(), Box<dyn Error>> {
    if deleted {
        Ok(())
    } else {
        Err(format!("Server refused to delete {id}").into())
    }
}
