#![allow(dead_code)]

use async_trait::async_trait;
use quill_application::{
    ActionExecutor, AgentRoster, ConversationOrchestrator, SessionStore, TurnScheduler,
};
use quill_core::config::{EngineConfig, ExecutorConfig, StaticConfigSource};
use quill_core::document::{ActiveDocument, DocumentHost, TextRange, WorkspaceFile};
use quill_core::error::{QuillError, Result};
use quill_core::llm::{LanguageModel, ModelReply};
use quill_core::persona::{AgentProfile, PersonaSource, get_default_presets};
use quill_core::session::{Session, SessionKind, SessionRepository};
use quill_infrastructure::{InMemoryDocumentHost, InMemorySessionRepository};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub fn profile(id: &str, name: &str) -> AgentProfile {
    AgentProfile {
        id: id.to_string(),
        display_name: name.to_string(),
        specialty_tag: "story".to_string(),
        persona_prompt_template: String::new(),
        is_available: true,
        is_active_in_config: true,
        source: PersonaSource::User,
    }
}

pub fn quiet_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.scheduler.turn_delay_ms = 0;
    config
}

pub struct Harness {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub host: Arc<InMemoryDocumentHost>,
    pub config: Arc<StaticConfigSource>,
    pub session_id: String,
}

pub async fn harness(
    model: Arc<dyn LanguageModel>,
    agents: Vec<AgentProfile>,
    host: InMemoryDocumentHost,
) -> Harness {
    harness_with_repository(model, agents, host, Arc::new(InMemorySessionRepository::new())).await
}

pub async fn harness_with_repository(
    model: Arc<dyn LanguageModel>,
    agents: Vec<AgentProfile>,
    host: InMemoryDocumentHost,
    repository: Arc<dyn SessionRepository>,
) -> Harness {
    let host = Arc::new(host);
    let config = Arc::new(StaticConfigSource::new(quiet_config()));
    let sessions = SessionStore::new(repository);
    let session = sessions.create_session(SessionKind::MultiAgent).await.unwrap();
    let roster = AgentRoster::new(agents, config.clone());

    let executor = ActionExecutor::with_config(
        host.clone(),
        &ExecutorConfig {
            stream_char_delay_ms: 0,
        },
    );
    let orchestrator = ConversationOrchestrator::new(
        sessions,
        roster,
        model,
        host.clone(),
        config.clone(),
    )
    .with_scheduler(TurnScheduler::with_seed(11))
    .with_executor(executor)
    .with_lookup(host.clone());

    Harness {
        orchestrator: Arc::new(orchestrator),
        host,
        config,
        session_id: session.id,
    }
}

pub fn presets() -> Vec<AgentProfile> {
    get_default_presets()
}

/// Always rejects.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn send(&self, _prompt: &str, persona_id: &str) -> Result<ModelReply> {
        Err(QuillError::model(persona_id, "service unavailable"))
    }
}

/// Never answers within a test's patience.
pub struct StalledModel;

#[async_trait]
impl LanguageModel for StalledModel {
    async fn send(&self, _prompt: &str, _persona_id: &str) -> Result<ModelReply> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ModelReply::new("too late"))
    }
}

/// Answers every call, but parks the `gate_at`-th call until released.
pub struct GatedModel {
    calls: AtomicUsize,
    gate_at: usize,
    pub reached: Notify,
    pub release: Notify,
}

impl GatedModel {
    pub fn new(gate_at: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate_at,
            reached: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for GatedModel {
    async fn send(&self, _prompt: &str, persona_id: &str) -> Result<ModelReply> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.gate_at {
            self.reached.notify_one();
            self.release.notified().await;
        }
        Ok(ModelReply::new(format!("{} has a thought", persona_id)))
    }
}

/// In-memory sessions whose saves can be made to fail.
#[derive(Default)]
pub struct FlakySessionRepository {
    inner: InMemorySessionRepository,
    pub fail_saves: AtomicBool,
}

#[async_trait]
impl SessionRepository for FlakySessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        self.inner.find_by_id(session_id).await
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(QuillError::io("disk full"));
        }
        self.inner.save(session).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.inner.delete(session_id).await
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        self.inner.list_all().await
    }

    async fn get_active_session_id(&self) -> Result<Option<String>> {
        self.inner.get_active_session_id().await
    }

    async fn set_active_session_id(&self, session_id: &str) -> Result<()> {
        self.inner.set_active_session_id(session_id).await
    }
}

/// An in-memory host whose writes and opens can be made to fail.
pub struct FlakyHost {
    pub inner: InMemoryDocumentHost,
    pub fail_set_text: AtomicBool,
    pub fail_open: AtomicBool,
    /// `replace_range` calls left before they start failing.
    replaces_left: AtomicUsize,
}

impl FlakyHost {
    pub fn new(inner: InMemoryDocumentHost) -> Self {
        Self {
            inner,
            fail_set_text: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            replaces_left: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn fail_replaces_after(&self, calls: usize) {
        self.replaces_left.store(calls, Ordering::SeqCst);
    }

    pub fn text_of(&self, uri: &str) -> Option<String> {
        self.inner.text_of(uri)
    }
}

#[async_trait]
impl DocumentHost for FlakyHost {
    async fn active_document(&self) -> Result<Option<ActiveDocument>> {
        self.inner.active_document().await
    }

    async fn read_document(&self, uri: &str) -> Result<String> {
        self.inner.read_document(uri).await
    }

    async fn replace_range(&self, uri: &str, range: TextRange, text: &str) -> Result<()> {
        let left = self
            .replaces_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left.is_err() {
            return Err(QuillError::document("host write failed"));
        }
        self.inner.replace_range(uri, range, text).await
    }

    async fn set_text(&self, uri: &str, text: &str) -> Result<()> {
        if self.fail_set_text.load(Ordering::SeqCst) {
            return Err(QuillError::document("host write failed"));
        }
        self.inner.set_text(uri, text).await
    }

    async fn list_workspace_files(
        &self,
        extensions: &[String],
        limit: usize,
    ) -> Result<Vec<WorkspaceFile>> {
        self.inner.list_workspace_files(extensions, limit).await
    }

    async fn document_exists(&self, name: &str) -> Result<bool> {
        self.inner.document_exists(name).await
    }

    async fn create_document(&self, name: &str, content: &str) -> Result<String> {
        self.inner.create_document(name, content).await
    }

    async fn open_document(&self, uri: &str) -> Result<()> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(QuillError::document("editor refused to open"));
        }
        self.inner.open_document(uri).await
    }
}
