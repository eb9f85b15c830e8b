//! In-memory [`AssistantApi`] used by the unit tests.
//!
//! Remote objects are built from the JSON the server would send, so they go
//! through the same deserialization as real responses.

use crate::api::AssistantApi;
use async_openai::types::{
    AssistantObject, AssistantToolResources, CreateAssistantRequest, LastError, LastErrorCode,
    MessageObject, OpenAIFile, RunObject, RunStatus, ThreadObject, VectorStoreFileObject,
    VectorStoreObject,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::{collections::HashMap, collections::HashSet, error::Error, path::Path, sync::Mutex};

const CREATED_AT: u32 = 1_714_000_000;

#[derive(Default)]
pub struct FakeState {
    next_id: u32,
    pub vector_stores: HashMap<String, String>,
    pub files: HashMap<String, OpenAIFile>,
    pub vector_store_files: HashMap<String, Vec<String>>,
    pub assistants: HashMap<String, AssistantObject>,
    pub threads: HashSet<String>,
    pub messages: HashMap<String, Vec<MessageObject>>,
    runs: HashMap<String, (RunObject, usize)>,
    /// Statuses returned by successive `retrieve_run` calls; the last one sticks.
    pub run_script: Vec<RunStatus>,
    /// Text of the assistant message appended when a run completes.
    pub reply: String,
    /// `None` makes `complete_chat` fail.
    pub chat_reply: Option<String>,
    /// File names whose upload fails.
    pub failing_uploads: HashSet<String>,
    /// File names that upload but cannot be attached to a vector store.
    pub failing_attaches: HashSet<String>,
    /// Name of every remote call, in order.
    pub calls: Vec<&'static str>,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

pub struct FakeApi {
    pub state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        FakeApi {
            state: Mutex::new(FakeState {
                run_script: vec![RunStatus::InProgress, RunStatus::Completed],
                reply: "The answer.".to_string(),
                chat_reply: Some("Revised.".to_string()),
                ..FakeState::default()
            }),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn call(&self, name: &'static str) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name);
        state
    }

    /// Filenames currently attached to `vector_store_id`, sorted.
    pub fn remote_filenames(&self, vector_store_id: &str) -> Vec<String> {
        self.with(|state| {
            let mut names: Vec<String> = state
                .vector_store_files
                .get(vector_store_id)
                .into_iter()
                .flatten()
                .filter_map(|id| state.files.get(id).map(|f| f.filename.clone()))
                .collect();
            names.sort();
            names
        })
    }

    /// Ids attached to `vector_store_id`, including ones whose file object is gone.
    pub fn remote_ids(&self, vector_store_id: &str) -> Vec<String> {
        self.with(|state| {
            state
                .vector_store_files
                .get(vector_store_id)
                .cloned()
                .unwrap_or_default()
        })
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.with(|state| state.calls.iter().filter(|c| **c == name).count())
    }
}

fn not_found(kind: &str, id: &str) -> Box<dyn Error> {
    format!("invalid_request_error: No {kind} found with id '{id}'.").into()
}

fn object<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

fn vector_store(id: &str, name: &str) -> VectorStoreObject {
    object(json!({
        "id": id,
        "object": "vector_store",
        "created_at": CREATED_AT,
        "name": name,
        "usage_bytes": 0,
        "file_counts": {"in_progress": 0, "completed": 0, "failed": 0, "cancelled": 0, "total": 0},
        "status": "completed"
    }))
}

fn store_file(id: &str, vector_store_id: &str, status: &str) -> VectorStoreFileObject {
    object(json!({
        "id": id,
        "object": "vector_store.file",
        "usage_bytes": 0,
        "created_at": CREATED_AT,
        "vector_store_id": vector_store_id,
        "status": status
    }))
}

fn thread(id: &str) -> ThreadObject {
    object(json!({"id": id, "object": "thread", "created_at": CREATED_AT}))
}

fn message(id: &str, thread_id: &str, role: &str, text: &str) -> MessageObject {
    object(json!({
        "id": id,
        "object": "thread.message",
        "created_at": CREATED_AT,
        "thread_id": thread_id,
        "role": role,
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    }))
}

impl AssistantApi for FakeApi {
    async fn create_vector_store(&self, name: &str) -> Result<VectorStoreObject, Box<dyn Error>> {
        let mut state = self.call("create_vector_store");
        let id = state.id("vs");
        state.vector_stores.insert(id.clone(), name.to_string());
        state.vector_store_files.insert(id.clone(), Vec::new());
        Ok(vector_store(&id, name))
    }

    async fn retrieve_vector_store(
        &self,
        vector_store_id: &str,
    ) -> Result<VectorStoreObject, Box<dyn Error>> {
        let state = self.call("retrieve_vector_store");
        let name = state
            .vector_stores
            .get(vector_store_id)
            .ok_or_else(|| not_found("vector store", vector_store_id))?;
        Ok(vector_store(vector_store_id, name))
    }

    async fn list_vector_store_files(
        &self,
        vector_store_id: &str,
    ) -> Result<Vec<VectorStoreFileObject>, Box<dyn Error>> {
        let state = self.call("list_vector_store_files");
        let ids = state
            .vector_store_files
            .get(vector_store_id)
            .ok_or_else(|| not_found("vector store", vector_store_id))?;
        Ok(ids
            .iter()
            .map(|id| store_file(id, vector_store_id, "completed"))
            .collect())
    }

    async fn attach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<VectorStoreFileObject, Box<dyn Error>> {
        let mut state = self.call("attach_file");
        let filename = state
            .files
            .get(file_id)
            .map(|file| file.filename.clone())
            .ok_or_else(|| not_found("file", file_id))?;
        if state.failing_attaches.contains(&filename) {
            return Err(format!("Failed to attach {filename} to {vector_store_id}").into());
        }
        state
            .vector_store_files
            .get_mut(vector_store_id)
            .ok_or_else(|| not_found("vector store", vector_store_id))?
            .push(file_id.to_string());
        Ok(store_file(file_id, vector_store_id, "in_progress"))
    }

    async fn detach_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<(), Box<dyn Error>> {
        let mut state = self.call("detach_file");
        let files = state
            .vector_store_files
            .get_mut(vector_store_id)
            .ok_or_else(|| not_found("vector store", vector_store_id))?;
        let before = files.len();
        files.retain(|id| id != file_id);
        if files.len() == before {
            return Err(not_found("vector store file", file_id));
        }
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<OpenAIFile, Box<dyn Error>> {
        let mut state = self.call("upload_file");
        let filename = path.file_name().unwrap().to_string_lossy().to_string();
        if state.failing_uploads.contains(&filename) {
            return Err(format!("Upload of {filename} failed").into());
        }
        let bytes = std::fs::metadata(path)?.len();
        let id = state.id("file");
        let file: OpenAIFile = object(json!({
            "id": id,
            "object": "file",
            "bytes": bytes,
            "created_at": CREATED_AT,
            "filename": filename,
            "purpose": "assistants"
        }));
        state.files.insert(id, file.clone());
        Ok(file)
    }

    async fn retrieve_file(&self, file_id: &str) -> Result<OpenAIFile, Box<dyn Error>> {
        let state = self.call("retrieve_file");
        state
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| not_found("file", file_id))
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), Box<dyn Error>> {
        let mut state = self.call("delete_file");
        state
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| not_found("file", file_id))
    }

    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        let mut state = self.call("create_assistant");
        let id = state.id("asst");
        let vector_store_ids = request
            .tool_resources
            .and_then(|resources| resources.file_search)
            .and_then(|search| search.vector_store_ids)
            .unwrap_or_default();
        let assistant: AssistantObject = object(json!({
            "id": id,
            "object": "assistant",
            "created_at": CREATED_AT,
            "name": request.name,
            "model": request.model,
            "instructions": request.instructions,
            "tools": request.tools.unwrap_or_default(),
            "tool_resources": {"file_search": {"vector_store_ids": vector_store_ids}}
        }));
        state.assistants.insert(id, assistant.clone());
        Ok(assistant)
    }

    async fn retrieve_assistant(
        &self,
        assistant_id: &str,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        let state = self.call("retrieve_assistant");
        state
            .assistants
            .get(assistant_id)
            .cloned()
            .ok_or_else(|| not_found("assistant", assistant_id))
    }

    async fn modify_assistant(
        &self,
        assistant_id: &str,
        tool_resources: AssistantToolResources,
    ) -> Result<AssistantObject, Box<dyn Error>> {
        let mut state = self.call("modify_assistant");
        let assistant = state
            .assistants
            .get_mut(assistant_id)
            .ok_or_else(|| not_found("assistant", assistant_id))?;
        assistant.tool_resources = Some(tool_resources);
        Ok(assistant.clone())
    }

    async fn create_thread(&self) -> Result<ThreadObject, Box<dyn Error>> {
        let mut state = self.call("create_thread");
        let id = state.id("thread");
        state.threads.insert(id.clone());
        state.messages.insert(id.clone(), Vec::new());
        Ok(thread(&id))
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<ThreadObject, Box<dyn Error>> {
        let state = self.call("retrieve_thread");
        if state.threads.contains(thread_id) {
            Ok(thread(thread_id))
        } else {
            Err(not_found("thread", thread_id))
        }
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), Box<dyn Error>> {
        let mut state = self.call("delete_thread");
        if state.threads.remove(thread_id) {
            state.messages.remove(thread_id);
            Ok(())
        } else {
            Err(not_found("thread", thread_id))
        }
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<MessageObject, Box<dyn Error>> {
        let mut state = self.call("create_message");
        let id = state.id("msg");
        let message = message(&id, thread_id, "user", content);
        state
            .messages
            .get_mut(thread_id)
            .ok_or_else(|| not_found("thread", thread_id))?
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<MessageObject>, Box<dyn Error>> {
        let state = self.call("list_messages");
        let messages = state
            .messages
            .get(thread_id)
            .ok_or_else(|| not_found("thread", thread_id))?;
        Ok(messages.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: Option<&str>,
    ) -> Result<RunObject, Box<dyn Error>> {
        let mut state = self.call("create_run");
        if !state.threads.contains(thread_id) {
            return Err(not_found("thread", thread_id));
        }
        let model = state
            .assistants
            .get(assistant_id)
            .map(|assistant| assistant.model.clone())
            .ok_or_else(|| not_found("assistant", assistant_id))?;
        let id = state.id("run");
        let run: RunObject = object(json!({
            "id": id,
            "object": "thread.run",
            "created_at": CREATED_AT,
            "thread_id": thread_id,
            "assistant_id": assistant_id,
            "status": "queued",
            "model": model,
            "instructions": instructions.unwrap_or_default(),
            "tools": [],
            "parallel_tool_calls": true
        }));
        state.runs.insert(id, (run.clone(), 0));
        Ok(run)
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, Box<dyn Error>> {
        let mut state = self.call("retrieve_run");
        let script = state.run_script.clone();
        let reply = state.reply.clone();
        let (run, polls) = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| not_found("run", run_id))?;
        let previous = run.status.clone();
        let index = (*polls).min(script.len().saturating_sub(1));
        *polls += 1;
        run.status = script.get(index).cloned().unwrap_or(RunStatus::Completed);
        if run.status == RunStatus::Failed {
            run.last_error = Some(LastError {
                code: LastErrorCode::ServerError,
                message: "Sorry, something went wrong.".to_string(),
            });
        }
        let run = run.clone();

        if run.status == RunStatus::Completed && previous != RunStatus::Completed {
            let id = state.id("msg");
            state
                .messages
                .get_mut(thread_id)
                .ok_or_else(|| not_found("thread", thread_id))?
                .push(message(&id, thread_id, "assistant", &reply));
        }
        Ok(run)
    }

    async fn complete_chat(
        &self,
        _model: &str,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, Box<dyn Error>> {
        let state = self.call("complete_chat");
        state
            .chat_reply
            .clone()
            .ok_or_else(|| "invalid_request_error: Incorrect API key provided".into())
    }
}
