use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::commands::COMMANDS;

/// Commands whose first argument is an agent id, with the usage shown after it.
const AGENT_COMMANDS: &[(&str, &str)] = &[
    ("/ask", "<message>"),
    ("/enable", ""),
    ("/disable", ""),
    ("/select", "[id...]"),
];

/// Completes slash commands and agent ids, colors commands, and hints usage.
#[derive(Clone)]
pub struct CliHelper {
    agent_ids: Vec<String>,
}

impl CliHelper {
    pub fn new(agent_ids: Vec<String>) -> Self {
        Self { agent_ids }
    }

    fn pairs<'a>(candidates: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<Pair> {
        candidates
            .filter(|c| c.starts_with(prefix))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c.to_string(),
            })
            .collect()
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        match line.split_once(' ') {
            None => Ok((0, Self::pairs(COMMANDS.iter().copied(), line))),
            Some((command, rest)) => {
                let takes_agent = AGENT_COMMANDS.iter().any(|(c, _)| *c == command)
                    || command == "/discuss";
                if !takes_agent || rest.contains(' ') {
                    return Ok((pos, vec![]));
                }
                // `/discuss` takes a comma list; complete the last entry.
                let start = rest.rfind(',').map(|i| i + 1).unwrap_or(0);
                let prefix = &rest[start..];
                let offset = command.len() + 1 + start;
                Ok((offset, Self::pairs(self.agent_ids.iter().map(String::as_str), prefix)))
            }
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        let (command, rest) = match line.find(' ') {
            Some(i) => line.split_at(i),
            None => (line, ""),
        };
        let command = if COMMANDS.contains(&command) {
            command.bright_cyan()
        } else {
            command.red()
        };
        Owned(format!("{}{}", command, rest))
    }

    fn highlight_char(&self, line: &str, _pos: usize, _forced: bool) -> bool {
        line.starts_with('/')
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return None;
        }

        match line.split_once(' ') {
            None => COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string()),
            Some((command, "")) => match command {
                "/discuss" => Some("<id,id,...> [rounds] <topic>".to_string()),
                _ => AGENT_COMMANDS
                    .iter()
                    .find(|(c, _)| *c == command)
                    .map(|(_, usage)| format!("<id> {}", usage).trim_end().to_string()),
            },
            Some(_) => None,
        }
    }
}

impl Validator for CliHelper {}
