//! Slash-command parsing.

/// Every command the REPL understands, for completion and hints.
pub const COMMANDS: &[&str] = &[
    "/help",
    "/agents",
    "/enable",
    "/disable",
    "/select",
    "/ask",
    "/discuss",
    "/stop",
    "/open",
    "/files",
    "/rollback",
    "/history",
    "/restore",
    "/suggestions",
    "/apply",
    "/discard",
    "/sessions",
    "/switch",
    "/new",
    "/clear",
];

pub const HELP: &str = "\
/agents                          list personas and whether they can take turns
/enable <id> | /disable <id>     toggle a persona in config.toml
/select <id> [id...]             restrict this session to some personas (no ids: everyone)
/ask <id> <message>              send a message to one persona
/discuss <id,id,...> [rounds] <topic>
                                 start a bounded discussion in the background
/stop                            stop the running discussion before its next turn
/open <file>                     focus a file in the workspace
/files                           list workspace files
/rollback                        undo the last change to the focused file
/history                         list snapshots of the focused file
/restore <snapshot-id>           restore a specific snapshot
/suggestions                     list pending suggestions
/apply <id> | /discard <id>      resolve a pending suggestion
/sessions | /switch <id>         list or resume sessions
/new | /clear                    start a new session or empty this one
quit                             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the whole room.
    Say(String),
    Help,
    Agents,
    Enable(String),
    Disable(String),
    Select(Vec<String>),
    Ask {
        agent_id: String,
        text: String,
    },
    Discuss {
        agent_ids: Vec<String>,
        rounds: Option<usize>,
        topic: String,
    },
    Stop,
    Open(String),
    Files,
    Rollback,
    History,
    Restore(String),
    Suggestions,
    Apply(String),
    Discard(String),
    Sessions,
    Switch(String),
    New,
    Clear,
    Quit,
}

impl Command {
    /// Parses one input line. `Err` carries a usage message.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Ok(Command::Quit);
        }
        if !line.starts_with('/') {
            return Ok(Command::Say(line.to_string()));
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let required = |usage: &str| {
            if rest.is_empty() {
                Err(format!("usage: {} {}", name, usage))
            } else {
                Ok(rest.to_string())
            }
        };

        match name {
            "/help" => Ok(Command::Help),
            "/agents" => Ok(Command::Agents),
            "/enable" => required("<id>").map(Command::Enable),
            "/disable" => required("<id>").map(Command::Disable),
            "/select" => Ok(Command::Select(
                rest.split_whitespace().map(str::to_string).collect(),
            )),
            "/ask" => {
                let (agent_id, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: /ask <id> <message>".to_string())?;
                Ok(Command::Ask {
                    agent_id: agent_id.to_string(),
                    text: text.trim().to_string(),
                })
            }
            "/discuss" => parse_discussion(rest),
            "/stop" => Ok(Command::Stop),
            "/open" => required("<file>").map(Command::Open),
            "/files" => Ok(Command::Files),
            "/rollback" => Ok(Command::Rollback),
            "/history" => Ok(Command::History),
            "/restore" => required("<snapshot-id>").map(Command::Restore),
            "/suggestions" => Ok(Command::Suggestions),
            "/apply" => required("<suggestion-id>").map(Command::Apply),
            "/discard" => required("<suggestion-id>").map(Command::Discard),
            "/sessions" => Ok(Command::Sessions),
            "/switch" => required("<session-id>").map(Command::Switch),
            "/new" => Ok(Command::New),
            "/clear" => Ok(Command::Clear),
            other => Err(format!("unknown command {} (try /help)", other)),
        }
    }
}

fn parse_discussion(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: /discuss <id,id,...> [rounds] <topic>";

    let (ids, rest) = rest.split_once(char::is_whitespace).ok_or(USAGE)?;
    let agent_ids: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let rest = rest.trim();
    let (rounds, topic) = match rest.split_once(char::is_whitespace) {
        Some((first, topic)) => match first.parse::<usize>() {
            Ok(rounds) => (Some(rounds), topic.trim()),
            Err(_) => (None, rest),
        },
        None => (None, rest),
    };

    if topic.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(Command::Discuss {
        agent_ids,
        rounds,
        topic: topic.to_string(),
    })
}
