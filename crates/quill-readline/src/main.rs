mod commands;
mod helper;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use colored::Colorize;
use rustyline::Editor;
use tokio::sync::Mutex;

use quill_application::{
    ActionExecutor, AgentRoster, ConversationOrchestrator, SessionStore, TurnReport,
};
use quill_core::config::{ConfigSource, EngineConfig};
use quill_core::document::{ActionKind, DocumentAction, DocumentHost};
use quill_core::llm::LanguageModel;
use quill_core::session::{Message, MessageKind, SessionKind, USER_AUTHOR_ID};
use quill_execution::{ActionEventLayer, LogTarget, LoggingConfig, init_logging};
use quill_infrastructure::paths::QuillPaths;
use quill_infrastructure::{
    FsDocumentHost, TomlConfigSource, TomlPersonaRepository, TomlSessionRepository,
};
use quill_interaction::{OpenAiCompatibleModel, ScriptedModel};

use crate::commands::{Command, HELP};
use crate::helper::CliHelper;

const OFFLINE_REPLY: &str = "(offline) Set QUILL_API_KEY to hear from a real model.";
const PRINT_INTERVAL: Duration = Duration::from_millis(250);

/// Which session is on screen and how much of it has been printed.
struct Transcript {
    session_id: String,
    printed: usize,
}

#[derive(Clone)]
struct Repl {
    orchestrator: Arc<ConversationOrchestrator>,
    host: Arc<FsDocumentHost>,
    config: Arc<TomlConfigSource>,
    transcript: Arc<Mutex<Transcript>>,
}

/// The Quill writers' room REPL.
///
/// Usage: `quill [workspace-dir]`. The workspace defaults to the current
/// directory; sessions, personas and config live under `QUILL_HOME`.
#[tokio::main]
async fn main() -> Result<()> {
    let (action_layer, mut action_events) = ActionEventLayer::channel();
    let log_file = QuillPaths::log_file()?;
    init_logging(
        &LoggingConfig {
            target: LogTarget::File(log_file.clone()),
            ..LoggingConfig::default()
        },
        Some(action_layer),
    )?;

    let workspace = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let repl = Repl::build(workspace.clone()).await?;

    // Document actions, as they happen.
    tokio::spawn(async move {
        while let Some(event) = action_events.recv().await {
            println!(
                "{}",
                format!("✎ {} {} {}", event.agent_id, event.kind, event.document).yellow()
            );
            if !event.reasoning.is_empty() {
                println!("{}", format!("  {}", event.reasoning).bright_black());
            }
        }
    });

    // Replies, including those from background discussions.
    let printer = repl.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRINT_INTERVAL);
        loop {
            ticker.tick().await;
            printer.flush().await;
        }
    });

    let mut rl = Editor::new()?;
    let agent_ids = repl
        .orchestrator
        .roster()
        .profiles()
        .iter()
        .map(|p| p.id.clone())
        .collect();
    rl.set_helper(Some(CliHelper::new(agent_ids)));

    println!("{}", "=== Quill writers' room ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Workspace: {}  Logs: {}",
            workspace.display(),
            log_file.display()
        )
        .bright_black()
    );
    println!(
        "{}",
        "Type a message for the room, '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let command = match Command::parse(trimmed) {
                    Ok(command) => command,
                    Err(usage) => {
                        println!("{}", usage.yellow());
                        continue;
                    }
                };
                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if let Err(e) = repl.run(command).await {
                    eprintln!("{}", format!("Error: {:#}", e).red());
                }
                repl.flush().await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    let session_id = repl.session_id().await;
    repl.orchestrator.stop_discussion(&session_id);
    Ok(())
}

impl Repl {
    async fn build(workspace: PathBuf) -> Result<Self> {
        let config = Arc::new(TomlConfigSource::new()?);
        let engine_config = config.load().await?;
        let personas = TomlPersonaRepository::new()?;
        let roster = AgentRoster::load(&personas, config.clone()).await?;
        let sessions = SessionStore::new(Arc::new(TomlSessionRepository::default_location()?));
        let host = Arc::new(FsDocumentHost::new(workspace));

        let orchestrator = ConversationOrchestrator::new(
            sessions.clone(),
            roster,
            build_model(&engine_config),
            host.clone(),
            config.clone(),
        )
        .with_executor(ActionExecutor::with_config(
            host.clone(),
            &engine_config.executor,
        ))
        .with_lookup(host.clone());

        let session = match sessions.active_session().await? {
            Some(session) => session,
            None => sessions.create_session(SessionKind::MultiAgent).await?,
        };
        sessions.set_active_session(&session.id).await?;
        println!(
            "{}",
            format!(
                "Session {} ({} messages)",
                session.title,
                session.messages.len()
            )
            .bright_black()
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            host,
            config,
            transcript: Arc::new(Mutex::new(Transcript {
                printed: session.messages.len(),
                session_id: session.id,
            })),
        })
    }

    async fn session_id(&self) -> String {
        self.transcript.lock().await.session_id.clone()
    }

    /// Prints messages appended since the last flush. User messages were
    /// already echoed by the prompt.
    async fn flush(&self) {
        let mut transcript = self.transcript.lock().await;
        let Ok(session) = self.orchestrator.sessions().get(&transcript.session_id).await else {
            return;
        };
        if session.messages.len() < transcript.printed {
            // Cleared elsewhere.
            transcript.printed = 0;
        }
        for message in &session.messages[transcript.printed..] {
            print_message(message);
        }
        transcript.printed = session.messages.len();
    }

    async fn switch_to(&self, session_id: String, printed: usize) -> Result<()> {
        self.orchestrator
            .sessions()
            .set_active_session(&session_id)
            .await?;
        *self.transcript.lock().await = Transcript {
            session_id,
            printed,
        };
        Ok(())
    }

    async fn active_uri(&self) -> Result<String> {
        self.host
            .active_document()
            .await?
            .map(|doc| doc.uri)
            .ok_or_else(|| anyhow!("no file is open (use /open <file>)"))
    }

    /// Flips an agent's flag in config.toml; takes effect on the next turn.
    async fn toggle(&self, agent_id: &str, active: bool) -> Result<()> {
        let agent = self.orchestrator.roster().get(agent_id).await?;
        self.config.set_agent_active(agent_id, active)?;
        let state = if active { "enabled" } else { "disabled" };
        println!("{}", format!("{} {}.", agent.display_name, state).bright_black());
        Ok(())
    }

    async fn run(&self, command: Command) -> Result<()> {
        let session_id = self.session_id().await;
        let orchestrator = &self.orchestrator;
        let executor = orchestrator.executor();

        match command {
            Command::Say(text) => {
                let report = orchestrator.handle_user_message(&session_id, &text).await?;
                print_report(&report);
            }
            Command::Ask { agent_id, text } => {
                let report = orchestrator
                    .address_agent(&session_id, &agent_id, &text)
                    .await?;
                print_report(&report);
            }
            Command::Discuss {
                agent_ids,
                rounds,
                topic,
            } => {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    match orchestrator
                        .start_discussion(&session_id, &agent_ids, &topic, rounds)
                        .await
                    {
                        Ok(report) => {
                            let status = if report.stopped_early {
                                "stopped"
                            } else {
                                "finished"
                            };
                            println!(
                                "{}",
                                format!(
                                    "Discussion {} after {} round(s), {} turn(s).",
                                    status, report.rounds_completed, report.turns_attempted
                                )
                                .bright_black()
                            );
                        }
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    }
                });
            }
            Command::Stop => {
                if orchestrator.stop_discussion(&session_id) {
                    println!("{}", "Stopping after the current turn.".bright_black());
                } else {
                    println!("{}", "No discussion is running.".bright_black());
                }
            }
            Command::Agents => {
                for agent in orchestrator.roster().list().await? {
                    let status = if agent.is_eligible() {
                        "ready".green()
                    } else if !agent.is_active_in_config {
                        "disabled".bright_black()
                    } else {
                        "unavailable".bright_black()
                    };
                    println!(
                        "{:<10} {:<20} {:<12} {}",
                        agent.id, agent.display_name, agent.specialty_tag, status
                    );
                }
            }
            Command::Enable(agent_id) => self.toggle(&agent_id, true).await?,
            Command::Disable(agent_id) => self.toggle(&agent_id, false).await?,
            Command::Select(agent_ids) => {
                for id in &agent_ids {
                    orchestrator.roster().get(id).await?;
                }
                orchestrator
                    .sessions()
                    .select_agents(&session_id, agent_ids)
                    .await?;
                println!("{}", "Selection updated.".bright_black());
            }
            Command::Open(name) => {
                let uri = self.host.focus_file(&name)?;
                println!("{}", format!("Focused {}", uri).bright_black());
            }
            Command::Files => {
                let config: EngineConfig = self.config.load().await?;
                let files = self
                    .host
                    .list_workspace_files(
                        &config.context.workspace_extensions,
                        config.context.max_workspace_files,
                    )
                    .await?;
                for file in files {
                    println!("{}", file.display_name);
                }
            }
            Command::Rollback => {
                let uri = self.active_uri().await?;
                let outcome = executor
                    .execute(
                        &DocumentAction::new(ActionKind::Rollback, USER_AUTHOR_ID).with_target(uri),
                    )
                    .await?;
                println!("{}", format!("You {}.", outcome.describe()).bright_black());
            }
            Command::History => {
                let uri = self.active_uri().await?;
                for snapshot in executor.snapshot_history(&uri).await.iter().rev() {
                    println!(
                        "{}  {}  {} chars",
                        snapshot.id,
                        snapshot.created_at.format("%H:%M:%S"),
                        snapshot.content.chars().count()
                    );
                }
            }
            Command::Restore(snapshot_id) => {
                let uri = self.active_uri().await?;
                executor.restore_snapshot(&uri, &snapshot_id).await?;
                println!("{}", format!("Restored {}", snapshot_id).bright_black());
            }
            Command::Suggestions => {
                let pending = executor.pending_suggestions(None).await;
                if pending.is_empty() {
                    println!("{}", "No pending suggestions.".bright_black());
                }
                for suggestion in pending {
                    println!(
                        "{} {} from {} (lines {}-{})",
                        suggestion.id.bright_cyan(),
                        suggestion.document_uri,
                        suggestion.origin_agent_id,
                        suggestion.range.start.line + 1,
                        suggestion.range.end.line.max(suggestion.range.start.line + 1)
                    );
                    if let Some(reasoning) = &suggestion.reasoning {
                        println!("  {}", reasoning.bright_black());
                    }
                    for line in suggestion.content.lines() {
                        println!("  {}", line.green());
                    }
                }
            }
            Command::Apply(id) => {
                let outcome = executor.apply_suggestion(&id).await?;
                println!("{}", format!("You {}.", outcome.describe()).bright_black());
            }
            Command::Discard(id) => {
                executor.discard_suggestion(&id).await?;
                println!("{}", "Suggestion discarded.".bright_black());
            }
            Command::Sessions => {
                for session in orchestrator.sessions().list_recent(10).await? {
                    let marker = if session.id == session_id { "*" } else { " " };
                    println!(
                        "{} {}  {}  {} messages  {}",
                        marker,
                        session.id,
                        session.title,
                        session.messages.len(),
                        session.updated_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Command::Switch(id) => {
                let session = orchestrator.sessions().get(&id).await?;
                let shown = session.messages.len().saturating_sub(10);
                self.switch_to(session.id, shown).await?;
            }
            Command::New => {
                let session = orchestrator
                    .sessions()
                    .create_session(SessionKind::MultiAgent)
                    .await?;
                println!("{}", format!("Started {}", session.title).bright_black());
                self.switch_to(session.id, 0).await?;
            }
            Command::Clear => {
                orchestrator.sessions().clear(&session_id).await?;
                self.transcript.lock().await.printed = 0;
                println!("{}", "Conversation cleared.".bright_black());
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }
}

fn build_model(config: &EngineConfig) -> Arc<dyn LanguageModel> {
    match OpenAiCompatibleModel::from_config(&config.model) {
        Ok(model) => {
            tracing::info!("Using model {}", model.model());
            Arc::new(model)
        }
        Err(e) => {
            tracing::warn!("Falling back to offline replies: {}", e);
            println!("{}", format!("Offline mode: {}", e).yellow());
            Arc::new(ScriptedModel::echoing(OFFLINE_REPLY))
        }
    }
}

fn print_message(message: &Message) {
    match message.kind {
        MessageKind::User => {}
        MessageKind::Agent => {
            println!("{}", format!("[{}]", message.agent_display_name).bright_magenta());
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
            println!();
        }
        MessageKind::System => {
            for line in message.content.lines() {
                println!("{}", line.bright_black());
            }
        }
    }
}

fn print_report(report: &TurnReport) {
    if !report.failures.is_empty() {
        println!(
            "{}",
            format!("No reply from: {}", report.failures.join(", ")).red()
        );
    }
}
