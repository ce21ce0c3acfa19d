//! Conversation control flow.
//!
//! One pass per incoming user message (or per discussion): pick respondents,
//! build each persona's context, call the model, record the reply, execute
//! the actions it contains. After the last turn, the pass's text is scanned
//! once for creation intent so a discussed document still gets created when
//! no persona emitted a structured `create`.
//!
//! Turns run strictly one after another. A per-session guard rejects a new
//! pass while one is in flight.

use crate::executor::{ActionExecutor, ActionOutcome};
use crate::roster::AgentRoster;
use crate::scheduler::{Selection, TurnScheduler};
use crate::session_store::SessionStore;
use quill_core::config::{ConfigSource, ContextConfig, EngineConfig};
use quill_core::document::{
    ActionKind, ActiveDocument, DocumentAction, DocumentHost, DocumentLookup, WorkspaceFile,
    line_count,
};
use quill_core::error::{QuillError, Result};
use quill_core::intent::IntentTable;
use quill_core::llm::{LanguageModel, ModelReply};
use quill_core::persona::AgentProfile;
use quill_core::session::{Message, SYSTEM_AUTHOR_ID, Session, SessionKind};
use quill_interaction::{ContextBuilder, InterpretContext, ResponseInterpreter, TurnContext};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one user-message pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Agent ids that were asked to respond, in order.
    pub respondents: Vec<String>,
    pub addressed: bool,
    /// Agent ids whose model call failed.
    pub failures: Vec<String>,
    pub outcomes: Vec<ActionOutcome>,
}

/// What one bounded discussion did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionReport {
    pub rounds_completed: usize,
    pub turns_attempted: usize,
    pub stopped_early: bool,
    pub failures: Vec<String>,
    pub outcomes: Vec<ActionOutcome>,
}

#[derive(Default)]
struct Pass {
    respondents: Vec<String>,
    texts: Vec<String>,
    failures: Vec<String>,
    outcomes: Vec<ActionOutcome>,
}

impl Pass {
    fn seeded(text: &str) -> Self {
        Self {
            texts: vec![text.to_string()],
            ..Self::default()
        }
    }

    fn created_document(&self) -> bool {
        self.outcomes.iter().any(|o| o.kind() == ActionKind::Create)
    }
}

type SessionSet = Arc<Mutex<HashSet<String>>>;

/// Marks a session busy until dropped.
struct InFlightGuard {
    set: SessionSet,
    session_id: String,
}

impl InFlightGuard {
    fn acquire(set: &SessionSet, session_id: &str) -> Result<Self> {
        let mut busy = set.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(session_id.to_string()) {
            return Err(QuillError::Busy {
                session_id: session_id.to_string(),
            });
        }
        Ok(Self {
            set: set.clone(),
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut busy = self.set.lock().unwrap_or_else(|e| e.into_inner());
        busy.remove(&self.session_id);
    }
}

type DiscussionFlags = Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>;

/// Keeps a discussion's `is_active` flag registered until dropped.
struct DiscussionGuard {
    flags: DiscussionFlags,
    session_id: String,
    active: Arc<AtomicBool>,
}

impl DiscussionGuard {
    fn register(flags: &DiscussionFlags, session_id: &str) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), active.clone());
        Self {
            flags: flags.clone(),
            session_id: session_id.to_string(),
            active,
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for DiscussionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.session_id);
    }
}

pub struct ConversationOrchestrator {
    sessions: SessionStore,
    roster: AgentRoster,
    scheduler: TurnScheduler,
    context: ContextBuilder,
    interpreter: ResponseInterpreter,
    intents: IntentTable,
    executor: Arc<ActionExecutor>,
    model: Arc<dyn LanguageModel>,
    host: Arc<dyn DocumentHost>,
    lookup: Option<Arc<dyn DocumentLookup>>,
    config: Arc<dyn ConfigSource>,
    in_flight: SessionSet,
    discussions: DiscussionFlags,
}

impl ConversationOrchestrator {
    pub fn new(
        sessions: SessionStore,
        roster: AgentRoster,
        model: Arc<dyn LanguageModel>,
        host: Arc<dyn DocumentHost>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        let context = ContextBuilder::from_profiles(roster.profiles());
        Self {
            sessions,
            roster,
            scheduler: TurnScheduler::new(),
            context,
            interpreter: ResponseInterpreter::standard(),
            intents: IntentTable::standard(),
            executor: Arc::new(ActionExecutor::new(host.clone())),
            model,
            host,
            lookup: None,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            discussions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_scheduler(mut self, scheduler: TurnScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replaces the intent table used for read requests and creation fallback.
    pub fn with_intents(mut self, intents: IntentTable) -> Self {
        self.interpreter = ResponseInterpreter::with_intents(intents.clone());
        self.intents = intents;
        self
    }

    pub fn with_interpreter(mut self, interpreter: ResponseInterpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn DocumentLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Handles a user message: addressed persona, or a shuffled ensemble.
    pub async fn handle_user_message(&self, session_id: &str, text: &str) -> Result<TurnReport> {
        if text.trim().is_empty() {
            return Err(QuillError::validation("message must not be empty"));
        }
        let _guard = InFlightGuard::acquire(&self.in_flight, session_id)?;
        let config = self.config.load().await?;
        let session = self.sessions.get(session_id).await?;

        self.sessions.append(session_id, Message::user(text)).await?;

        let eligible = self.eligible_for(&session, &config);
        let selection = match self.pinned_agent(&session, &eligible) {
            Some(agent) => Selection::Addressed(agent),
            None => self
                .scheduler
                .select_respondents(text, &eligible, &config.scheduler),
        };
        tracing::info!(
            "[ConversationOrchestrator] Session {}: {} respondent(s), addressed={}",
            session_id,
            selection.agents().len(),
            selection.is_addressed()
        );

        let references = self.lookup_references(text).await;
        let mut pass = Pass::seeded(text);
        for agent in selection.agents() {
            self.run_turn(session_id, &agent, &config, None, &references, &mut pass)
                .await?;
        }
        self.finish_pass(session_id, &mut pass).await?;

        Ok(TurnReport {
            respondents: pass.respondents,
            addressed: selection.is_addressed(),
            failures: pass.failures,
            outcomes: pass.outcomes,
        })
    }

    /// Sends a message to one named persona, bypassing the scheduler.
    ///
    /// Unknown or ineligible agents are rejected before any model call.
    pub async fn address_agent(
        &self,
        session_id: &str,
        agent_id: &str,
        text: &str,
    ) -> Result<TurnReport> {
        let config = self.config.load().await?;
        let agent = self.known_agent(agent_id, &config)?;
        if !agent.is_eligible() {
            return Err(QuillError::validation(format!(
                "agent '{}' is not available",
                agent_id
            )));
        }
        if text.trim().is_empty() {
            return Err(QuillError::validation("message must not be empty"));
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, session_id)?;
        self.sessions.get(session_id).await?;
        self.sessions.append(session_id, Message::user(text)).await?;

        let references = self.lookup_references(text).await;
        let mut pass = Pass::seeded(text);
        self.run_turn(session_id, &agent, &config, None, &references, &mut pass)
            .await?;
        self.finish_pass(session_id, &mut pass).await?;

        Ok(TurnReport {
            respondents: pass.respondents,
            addressed: true,
            failures: pass.failures,
            outcomes: pass.outcomes,
        })
    }

    /// Runs a bounded discussion: every listed agent speaks once per round,
    /// in list order, for up to `max_rounds` rounds (configured default when
    /// `None`). [`stop_discussion`](Self::stop_discussion) ends it before the
    /// next turn.
    pub async fn start_discussion(
        &self,
        session_id: &str,
        agent_ids: &[String],
        topic: &str,
        max_rounds: Option<usize>,
    ) -> Result<DiscussionReport> {
        TurnScheduler::validate_discussion(agent_ids)?;
        if topic.trim().is_empty() {
            return Err(QuillError::validation("discussion topic must not be empty"));
        }
        let config = self.config.load().await?;
        let agents = agent_ids
            .iter()
            .map(|id| self.known_agent(id, &config))
            .collect::<Result<Vec<_>>>()?;
        let rounds = max_rounds.unwrap_or(config.scheduler.max_rounds);

        let _guard = InFlightGuard::acquire(&self.in_flight, session_id)?;
        self.sessions.get(session_id).await?;
        let discussion = DiscussionGuard::register(&self.discussions, session_id);

        let names: Vec<&str> = agents.iter().map(|a| a.display_name.as_str()).collect();
        self.sessions
            .append(
                session_id,
                Message::system(format!(
                    "Discussion on \"{}\" with {} for up to {} round(s).",
                    topic.trim(),
                    names.join(", "),
                    rounds
                )),
            )
            .await?;
        tracing::info!(
            "[ConversationOrchestrator] Discussion started in {} ({} agents, {} rounds)",
            session_id,
            agents.len(),
            rounds
        );

        let delay = Duration::from_millis(config.scheduler.turn_delay_ms);
        let references = self.lookup_references(topic).await;
        let mut pass = Pass::seeded(topic);
        let mut report = DiscussionReport::default();

        'rounds: for round in 1..=rounds {
            for agent in &agents {
                if report.turns_attempted > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if !discussion.is_active() {
                    report.stopped_early = true;
                    break 'rounds;
                }
                let focus = format!(
                    "Discussion topic: {} (round {} of {}). Build on what the others said.",
                    topic.trim(),
                    round,
                    rounds
                );
                self.run_turn(session_id, agent, &config, Some(focus.as_str()), &references, &mut pass)
                    .await?;
                report.turns_attempted += 1;
            }
            report.rounds_completed += 1;
        }
        drop(discussion);

        self.finish_pass(session_id, &mut pass).await?;
        tracing::info!(
            "[ConversationOrchestrator] Discussion in {} ended after {} round(s), {} turn(s)",
            session_id,
            report.rounds_completed,
            report.turns_attempted
        );

        report.failures = pass.failures;
        report.outcomes = pass.outcomes;
        Ok(report)
    }

    /// Asks a running discussion to stop before its next turn. Returns
    /// false when no discussion is running for the session.
    pub fn stop_discussion(&self, session_id: &str) -> bool {
        let flags = self.discussions.lock().unwrap_or_else(|e| e.into_inner());
        match flags.get(session_id) {
            Some(active) => {
                active.store(false, Ordering::SeqCst);
                tracing::info!("[ConversationOrchestrator] Stop requested for {}", session_id);
                true
            }
            None => false,
        }
    }

    pub fn is_discussion_active(&self, session_id: &str) -> bool {
        self.discussions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .is_some_and(|active| active.load(Ordering::SeqCst))
    }

    /// Whether a pass is currently running for the session.
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(session_id)
    }

    async fn run_turn(
        &self,
        session_id: &str,
        agent: &AgentProfile,
        config: &EngineConfig,
        focus: Option<&str>,
        references: &[WorkspaceFile],
        pass: &mut Pass,
    ) -> Result<()> {
        pass.respondents.push(agent.id.clone());

        let document = self.active_document().await;
        let workspace = self.workspace_files(&config.context).await;
        let session = self.sessions.get(session_id).await?;
        let prompt = self.context.build(
            &TurnContext::new(agent, &session.messages)
                .with_document(document.as_ref())
                .with_workspace_files(&workspace)
                .with_referenced_documents(references)
                .with_focus(focus),
            &config.context,
        );

        let reply = match self.call_model(&prompt, agent, config.model.timeout_secs).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    "[ConversationOrchestrator] {} failed to respond: {}",
                    agent.id,
                    e
                );
                pass.failures.push(agent.id.clone());
                self.sessions
                    .append(
                        session_id,
                        Message::system(format!("{} could not respond: {}", agent.display_name, e)),
                    )
                    .await?;
                return Ok(());
            }
        };

        self.sessions
            .append(
                session_id,
                Message::agent(&agent.id, &agent.display_name, &reply.text),
            )
            .await?;

        let ctx = InterpretContext::new(&agent.id, document.as_ref().map(|d| line_count(&d.text)));
        let actions = self.interpreter.interpret_primary(&reply.text, &ctx);
        pass.texts.push(reply.text);
        for action in actions {
            self.execute_and_record(session_id, &agent.display_name, action, pass)
                .await?;
        }
        Ok(())
    }

    /// A zero timeout waits indefinitely.
    async fn call_model(
        &self,
        prompt: &str,
        agent: &AgentProfile,
        timeout_secs: u64,
    ) -> Result<ModelReply> {
        let call = self.model.send(prompt, &agent.id);
        if timeout_secs == 0 {
            return call.await;
        }
        match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
            Ok(result) => result,
            Err(_) => Err(QuillError::Timeout {
                agent_id: agent.id.clone(),
                seconds: timeout_secs,
            }),
        }
    }

    /// Synthesizes a document from the pass's text when nobody created one.
    async fn finish_pass(&self, session_id: &str, pass: &mut Pass) -> Result<()> {
        if pass.created_document() {
            return Ok(());
        }
        let text = pass.texts.join("\n");
        let fallback = self
            .interpreter
            .fallback_actions(&text, &InterpretContext::new(SYSTEM_AUTHOR_ID, None))
            .into_iter()
            .find(|a| a.kind == ActionKind::Create);

        if let Some(action) = fallback {
            tracing::info!(
                "[ConversationOrchestrator] Creation intent without a structured create in {}",
                session_id
            );
            self.execute_and_record(session_id, "System", action, pass)
                .await?;
        }
        Ok(())
    }

    /// Executes one action and echoes it into the session log.
    ///
    /// Executor failures become system messages; only session-store failures propagate.
    async fn execute_and_record(
        &self,
        session_id: &str,
        author: &str,
        action: DocumentAction,
        pass: &mut Pass,
    ) -> Result<()> {
        let audit = match self.executor.execute(&action).await {
            Ok(outcome) => {
                let mut audit = format!("{} {}.", author, outcome.describe());
                if let Some(reasoning) = action.reasoning.as_deref().filter(|r| !r.is_empty()) {
                    audit.push_str(&format!("\nReasoning: {}", reasoning));
                }
                if let Some(content) = action.content.as_deref().filter(|c| !c.is_empty()) {
                    audit.push_str(&format!("\nContent:\n{}", content));
                }
                pass.outcomes.push(outcome);
                audit
            }
            Err(e) => {
                tracing::warn!(
                    "[ConversationOrchestrator] {} action from {} failed: {}",
                    action.kind,
                    action.origin_agent_id,
                    e
                );
                format!("{}'s {} action could not be executed: {}", author, action.kind, e)
            }
        };
        self.sessions
            .append(session_id, Message::system(audit))
            .await?;
        Ok(())
    }

    fn known_agent(&self, agent_id: &str, config: &EngineConfig) -> Result<AgentProfile> {
        self.roster.get_with(agent_id, config).map_err(|e| {
            if e.is_not_found() {
                QuillError::validation(format!("unknown agent '{}'", agent_id))
            } else {
                e
            }
        })
    }

    /// Eligible agents, narrowed to the session's selection when it has one.
    fn eligible_for(&self, session: &Session, config: &EngineConfig) -> Vec<AgentProfile> {
        let eligible = self.roster.eligible_with(config);
        if session.selected_agent_ids.is_empty() {
            return eligible;
        }
        eligible
            .into_iter()
            .filter(|a| session.selected_agent_ids.contains(&a.id))
            .collect()
    }

    /// A single-agent session always talks to its active agent.
    fn pinned_agent(&self, session: &Session, eligible: &[AgentProfile]) -> Option<AgentProfile> {
        if session.kind != SessionKind::SingleAgent {
            return None;
        }
        let id = session.active_agent_id.as_deref()?;
        eligible.iter().find(|a| a.id == id).cloned()
    }

    async fn lookup_references(&self, text: &str) -> Vec<WorkspaceFile> {
        let Some(lookup) = &self.lookup else {
            return Vec::new();
        };
        let mut found: Vec<WorkspaceFile> = Vec::new();
        for name in self.intents.read_requests(text) {
            match lookup.find_document(&name).await {
                Ok(Some(file)) => {
                    if !found.iter().any(|f| f.uri == file.uri) {
                        tracing::debug!(
                            "[ConversationOrchestrator] Read request '{}' resolved to {}",
                            name,
                            file.uri
                        );
                        found.push(file);
                    }
                }
                Ok(None) => {
                    tracing::debug!("[ConversationOrchestrator] No document matches '{}'", name)
                }
                Err(e) => tracing::warn!(
                    "[ConversationOrchestrator] Lookup of '{}' failed: {}",
                    name,
                    e
                ),
            }
        }
        found
    }

    async fn active_document(&self) -> Option<ActiveDocument> {
        match self.host.active_document().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("[ConversationOrchestrator] Active document unavailable: {}", e);
                None
            }
        }
    }

    async fn workspace_files(&self, config: &ContextConfig) -> Vec<WorkspaceFile> {
        // One extra so the active document can be filtered out.
        let limit = config.max_workspace_files + 1;
        match self
            .host
            .list_workspace_files(&config.workspace_extensions, limit)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("[ConversationOrchestrator] Workspace listing failed: {}", e);
                Vec::new()
            }
        }
    }
}
