//! Per-turn prompt assembly.
//!
//! A prompt is built from fixed sections in a fixed order:
//!
//! 1. the persona's voice template
//! 2. the current document (full text, numbered lines)
//! 3. documents the user asked to read
//! 4. other workspace files, each capped at a character budget
//! 5. the recent conversation, minus system messages and the persona's own lines
//! 6. the grounding instruction

use crate::prompt::render_prompt;
use minijinja::context;
use quill_core::config::ContextConfig;
use quill_core::document::{ActiveDocument, WorkspaceFile};
use quill_core::persona::AgentProfile;
use quill_core::session::Message;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Used for personas with no registered or embedded template.
pub const GENERIC_PERSONA_TEMPLATE: &str = "You are {{ name }}, a member of a writers' room who specializes in {{ specialty }}. Give specific, honest notes in your own voice.";

/// Appended to a workspace file cut at the character budget.
pub const TRUNCATION_MARKER: &str = "[... truncated]";

/// Everything the builder needs for one agent turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub agent: &'a AgentProfile,
    pub document: Option<&'a ActiveDocument>,
    pub workspace_files: &'a [WorkspaceFile],
    pub referenced_documents: &'a [WorkspaceFile],
    pub transcript: &'a [Message],
    /// Extra framing for this turn, e.g. the discussion topic.
    pub focus: Option<&'a str>,
}

impl<'a> TurnContext<'a> {
    pub fn new(agent: &'a AgentProfile, transcript: &'a [Message]) -> Self {
        Self {
            agent,
            document: None,
            workspace_files: &[],
            referenced_documents: &[],
            transcript,
            focus: None,
        }
    }

    pub fn with_document(mut self, document: Option<&'a ActiveDocument>) -> Self {
        self.document = document;
        self
    }

    pub fn with_workspace_files(mut self, files: &'a [WorkspaceFile]) -> Self {
        self.workspace_files = files;
        self
    }

    pub fn with_referenced_documents(mut self, files: &'a [WorkspaceFile]) -> Self {
        self.referenced_documents = files;
        self
    }

    pub fn with_focus(mut self, focus: Option<&'a str>) -> Self {
        self.focus = focus;
        self
    }
}

/// Assembles prompts. Templates are keyed by agent id.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    templates: HashMap<String, String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every profile's embedded template.
    pub fn from_profiles(profiles: &[AgentProfile]) -> Self {
        let mut builder = Self::new();
        for profile in profiles {
            if !profile.persona_prompt_template.trim().is_empty() {
                builder.register_template(&profile.id, &profile.persona_prompt_template);
            }
        }
        builder
    }

    pub fn register_template(&mut self, agent_id: &str, template: &str) {
        self.templates
            .insert(agent_id.to_string(), template.to_string());
    }

    /// Renders the persona section for `agent`.
    ///
    /// Resolution order: registered template, the profile's own template,
    /// then the generic one. A template that fails to render is used verbatim.
    pub fn persona_section(&self, agent: &AgentProfile) -> String {
        let template = self
            .templates
            .get(&agent.id)
            .map(String::as_str)
            .or_else(|| {
                let own = agent.persona_prompt_template.as_str();
                (!own.trim().is_empty()).then_some(own)
            })
            .unwrap_or(GENERIC_PERSONA_TEMPLATE);

        render_prompt(
            template,
            context! { name => agent.display_name, specialty => agent.specialty_tag },
        )
        .unwrap_or_else(|e| {
            tracing::warn!(agent_id = %agent.id, "Persona template failed to render: {}", e);
            template.to_string()
        })
    }

    /// Builds the full prompt for one turn.
    pub fn build(&self, turn: &TurnContext<'_>, config: &ContextConfig) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "# Persona\n{}\n", self.persona_section(turn.agent));

        if let Some(focus) = turn.focus.filter(|f| !f.trim().is_empty()) {
            let _ = writeln!(prompt, "# Focus\n{}\n", focus.trim());
        }

        match turn.document {
            Some(document) => {
                let _ = writeln!(prompt, "# Current Document: {}", document.display_name);
                if let Some(selection) = document.selection.filter(|s| !s.is_empty()) {
                    let last = if selection.end.character == 0 {
                        selection.end.line
                    } else {
                        selection.end.line + 1
                    };
                    let _ = writeln!(
                        prompt,
                        "(selected lines {}-{})",
                        selection.start.line + 1,
                        last.max(selection.start.line + 1)
                    );
                }
                let _ = writeln!(prompt, "{}\n", number_lines(&document.text));
            }
            None => {
                let _ = writeln!(prompt, "# Current Document\n(no document is open)\n");
            }
        }

        if !turn.referenced_documents.is_empty() {
            let _ = writeln!(prompt, "# Referenced Documents");
            for file in turn.referenced_documents {
                let _ = writeln!(
                    prompt,
                    "## {}\n{}\n",
                    file.display_name,
                    truncate_chars(&file.text, config.workspace_file_char_budget)
                );
            }
        }

        let active_uri = turn.document.map(|d| d.uri.as_str());
        let others: Vec<&WorkspaceFile> = turn
            .workspace_files
            .iter()
            .filter(|f| Some(f.uri.as_str()) != active_uri)
            .filter(|f| !turn.referenced_documents.iter().any(|r| r.uri == f.uri))
            .take(config.max_workspace_files)
            .collect();
        if !others.is_empty() {
            let _ = writeln!(prompt, "# Workspace Files");
            for file in others {
                let _ = writeln!(
                    prompt,
                    "## {}\n{}\n",
                    file.display_name,
                    truncate_chars(&file.text, config.workspace_file_char_budget)
                );
            }
        }

        let tail = transcript_tail(turn.transcript, &turn.agent.id, config.transcript_tail);
        let _ = writeln!(prompt, "# Recent Conversation");
        if tail.is_empty() {
            let _ = writeln!(prompt, "(nothing yet)");
        }
        for message in tail {
            let _ = writeln!(prompt, "{}: {}", message.agent_display_name, message.content);
        }
        prompt.push('\n');

        let _ = write!(prompt, "# Instructions\n{}\n", config.grounding_instruction.trim());
        prompt
    }
}

/// The last `limit` non-system messages not authored by `agent_id`, oldest first.
pub fn transcript_tail<'m>(messages: &'m [Message], agent_id: &str, limit: usize) -> Vec<&'m Message> {
    let eligible: Vec<&Message> = messages
        .iter()
        .filter(|m| !m.is_system() && m.agent_id != agent_id)
        .collect();
    let skip = eligible.len().saturating_sub(limit);
    eligible.into_iter().skip(skip).collect()
}

/// Caps `text` at `budget` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((offset, _)) => format!("{}\n{}", &text[..offset], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn number_lines(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(index, line)| format!("{:>4} | {}", index + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
