// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Slash command definitions and their effect on the session.

use std::path::{Path, PathBuf};

use reqwest::Client;

use crate::cli::clipboard;
use crate::config::{Config, Setting};
use crate::error::{Error, Result};
use crate::provider::Role;
use crate::provider::ollama;
use crate::reasoning;
use crate::session::{self, ChatSession};

/// A parsed slash command with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Bye,
    Help,
    Clear,
    Retry,
    /// Save under the given name, or a timestamp when empty.
    Save(String),
    Load(Option<ListRef>),
    List,
    /// List models, or switch to the model at a list index.
    Models(Option<usize>),
    /// Show settings, or change one.
    Set(Option<Setting>),
    Info,
    Message(Option<Role>),
    Copy(CopyTarget),
    Paste,
    Image(String),
}

/// An entry of the last list shown, or a plain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CopyTarget {
    /// Content of the last message.
    Last,
    /// Content of the last message with this role.
    Role(Role),
    /// Last message with its reasoning wrapped in think tags.
    Think,
    /// First fenced code block of the last message.
    Code,
}

#[derive(Debug, Clone)]
pub struct SlashCommand {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        name: "bye",
        aliases: &["quit", "exit"],
        usage: "",
        description: "Exit the chat",
    },
    SlashCommand {
        name: "clear",
        aliases: &[],
        usage: "",
        description: "Clear the conversation, keeping the system prompt",
    },
    SlashCommand {
        name: "copy",
        aliases: &["c"],
        usage: "[role|think|code]",
        description: "Copy the last message to the clipboard",
    },
    SlashCommand {
        name: "help",
        aliases: &["?"],
        usage: "",
        description: "Show available commands",
    },
    SlashCommand {
        name: "image",
        aliases: &[],
        usage: "<path>",
        description: "Attach an image to the next message",
    },
    SlashCommand {
        name: "info",
        aliases: &[],
        usage: "",
        description: "Show model, context and server details",
    },
    SlashCommand {
        name: "list",
        aliases: &[],
        usage: "",
        description: "List saved sessions",
    },
    SlashCommand {
        name: "load",
        aliases: &[],
        usage: "<name|#n>",
        description: "Load a saved session",
    },
    SlashCommand {
        name: "message",
        aliases: &[],
        usage: "[role]",
        description: "Print the last message, optionally of one role",
    },
    SlashCommand {
        name: "models",
        aliases: &[],
        usage: "[#n]",
        description: "List available models, or switch to one",
    },
    SlashCommand {
        name: "paste",
        aliases: &["v"],
        usage: "",
        description: "Send the clipboard contents as a message",
    },
    SlashCommand {
        name: "retry",
        aliases: &[],
        usage: "",
        description: "Send the last user message again",
    },
    SlashCommand {
        name: "save",
        aliases: &[],
        usage: "[name]",
        description: "Save the current session",
    },
    SlashCommand {
        name: "set",
        aliases: &[],
        usage: "[key=value]",
        description: "Show settings, or change one",
    },
];

/// Look up a command by name or alias.
fn lookup(name: &str) -> Option<&'static SlashCommand> {
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Parse a command line such as `/load #2` into a [`Command`].
pub(crate) fn parse(input: &str) -> Result<Command> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input);

    let (name, args) = match input.find(char::is_whitespace) {
        Some(pos) => {
            let (name, rest) = input.split_at(pos);
            (name.to_lowercase(), rest.trim())
        }
        None => (input.to_lowercase(), ""),
    };

    let Some(cmd) = lookup(&name) else {
        return Err(Error::Other(format!(
            "unknown command '/{name}', type /help for a list"
        )));
    };

    let command = match cmd.name {
        "bye" => Command::Bye,
        "help" => Command::Help,
        "clear" => Command::Clear,
        "retry" => Command::Retry,
        "list" => Command::List,
        "info" => Command::Info,
        "paste" => Command::Paste,
        "save" => Command::Save(args.to_string()),
        "load" => Command::Load(match args {
            "" => None,
            _ => Some(match args.strip_prefix('#') {
                Some(index) => ListRef::Index(parse_index(index)?),
                None => ListRef::Name(args.to_string()),
            }),
        }),
        "models" => Command::Models(match args {
            "" => None,
            _ => Some(parse_index(args.strip_prefix('#').unwrap_or(args))?),
        }),
        "set" => Command::Set(match args {
            "" => None,
            _ => Some(Setting::parse(args)?),
        }),
        "message" => Command::Message(match args {
            "" => None,
            _ => Some(args.parse()?),
        }),
        "copy" => Command::Copy(match args {
            "" => CopyTarget::Last,
            "think" => CopyTarget::Think,
            "code" => CopyTarget::Code,
            _ => match args.parse::<Role>() {
                Ok(role) => CopyTarget::Role(role),
                Err(_) => {
                    return Err(Error::Other(format!(
                        "unknown copy argument '{args}', expected a role, think or code"
                    )));
                }
            },
        }),
        "image" => {
            if args.is_empty() {
                return Err(Error::Other("no image file path provided".into()));
            }
            Command::Image(args.to_string())
        }
        other => return Err(Error::Other(format!("command '/{other}' is not handled"))),
    };

    Ok(command)
}

fn parse_index(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .map_err(|_| Error::Other(format!("'{s}' is not a list number")))
}

pub(crate) fn help_text() -> String {
    let rows: Vec<(String, &str)> = COMMANDS
        .iter()
        .map(|cmd| {
            let mut names = vec![format!("/{}", cmd.name)];
            names.extend(cmd.aliases.iter().map(|a| format!("/{a}")));
            let mut left = names.join(", ");
            if !cmd.usage.is_empty() {
                left.push(' ');
                left.push_str(cmd.usage);
            }
            (left, cmd.description)
        })
        .collect();

    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    let mut out = String::from("Available commands:");
    for (left, description) in rows {
        out.push_str(&format!("\n  {left:<width$}  {description}"));
    }
    out.push_str("\n\nEnter starts a new line, Ctrl+D sends the message.");
    out
}

/// Render a titled list, numbered as `(01)` or bulleted.
pub(crate) fn format_list(heading: &str, items: &[String], numbered: bool) -> String {
    if items.is_empty() {
        return format!("no {} found.", heading.to_lowercase());
    }

    let lines: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if numbered {
                format!("({:02}) {item}", i + 1)
            } else {
                format!(" - {item}")
            }
        })
        .collect();

    let mut chars = heading.chars();
    let heading = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{heading}:\n{}", lines.join("\n"))
}

/// What the session loop does after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Continue,
    Quit,
    /// Send the last user message again.
    Retry,
    /// Send this text as a user message.
    Send(String),
}

/// Result of a command: an action plus text for the user. `output` is
/// content and printed as is, `info` is a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub action: Action,
    pub output: Option<String>,
    pub info: Option<String>,
}

impl Reply {
    fn info(message: impl Into<String>) -> Self {
        Self {
            action: Action::Continue,
            output: None,
            info: Some(message.into()),
        }
    }

    fn output(text: impl Into<String>) -> Self {
        Self {
            action: Action::Continue,
            output: Some(text.into()),
            info: None,
        }
    }

    fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }
}

/// Runs commands against the session and configuration. Remembers the last
/// model and session lists so `#n` can refer to their entries.
pub(crate) struct Dispatcher {
    client: Client,
    config_path: PathBuf,
    history_dir: PathBuf,
    models: Vec<String>,
    sessions: Vec<String>,
}

impl Dispatcher {
    pub(crate) fn new(client: Client, config_path: PathBuf, history_dir: PathBuf) -> Self {
        Self {
            client,
            config_path,
            history_dir,
            models: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub(crate) async fn execute(
        &mut self,
        command: Command,
        session: &mut ChatSession,
        config: &mut Config,
    ) -> Result<Reply> {
        tracing::debug!(?command, "executing command");

        match command {
            Command::Bye => Ok(Reply::info("Chat has ended.").with_action(Action::Quit)),
            Command::Help => Ok(Reply::output(help_text())),
            Command::Clear => {
                session.clear_except_system();
                Ok(Reply::info("History cleared (system prompt retained)."))
            }
            Command::Retry => {
                session.discard_last();
                match session.last() {
                    Some(message) if message.role == Role::User => {
                        Ok(Reply::info("Repeating the last user prompt.")
                            .with_action(Action::Retry))
                    }
                    _ => Err(Error::Other("no user prompt to repeat".into())),
                }
            }
            Command::Save(name) => {
                let filename = session::save_session(&self.history_dir, &name, session.messages())?;
                Ok(Reply::info(format!("History saved as '{filename}'.")))
            }
            Command::Load(None) => {
                let mut reply = self.list_sessions()?;
                reply.info = Some("Use /load <name> or /load #n to load a session.".into());
                Ok(reply)
            }
            Command::Load(Some(target)) => {
                let name = match target {
                    ListRef::Index(i) => pick(&self.sessions, i)?.to_string(),
                    ListRef::Name(name) => name,
                };
                let messages = session::load_session(&self.history_dir, &name)?;
                session.replace_all(messages)?;
                Ok(Reply::info(format!(
                    "History '{name}' loaded ({} messages).",
                    session.len()
                )))
            }
            Command::List => self.list_sessions(),
            Command::Models(None) => {
                let models = ollama::list_models(&self.client, &config.url).await?;
                if models.is_empty() {
                    return Err(Error::Other("no models available".into()));
                }
                let text = format_list("language models", &models, true);
                self.models = models;
                Ok(Reply::output(text))
            }
            Command::Models(Some(i)) => {
                let model = pick(&self.models, i)?.to_string();
                config.apply(Setting::Model(model.clone()))?;
                Ok(Reply::info(format!("Switched model to '{model}'.")))
            }
            Command::Set(None) => {
                let items: Vec<String> = config
                    .settings()
                    .into_iter()
                    .map(|(key, value)| format!("{key} = {value}"))
                    .collect();
                Ok(Reply::output(format_list("config settings", &items, false)))
            }
            Command::Set(Some(setting)) => {
                let context = match &setting {
                    Setting::Context(n) => Some(*n),
                    _ => None,
                };
                let shown = format!("{setting}");
                config.apply(setting)?;
                if let Some(n) = context {
                    session.set_context_size(n)?;
                }
                Ok(Reply::info(format!("Config updated: {shown}")))
            }
            Command::Info => {
                let version = ollama::server_version(&self.client, &config.url).await?;
                let items = vec![
                    format!("Configuration file: {}", self.config_path.display()),
                    format!("Output format: {}", config.format),
                    format!("Current model is '{}'", config.model),
                    format!("System prompt: {}", session.system_prompt()),
                    format!(
                        "Context has {} messages (max. {}){}",
                        session.len(),
                        session.max_context(),
                        if session.context_limit_reached() {
                            ", oldest messages are being dropped"
                        } else {
                            ""
                        }
                    ),
                    format!("Context token estimation: {}", session.estimate_tokens()),
                    format!("Server version is {version}"),
                ];
                Ok(Reply::output(format_list("server info", &items, false)))
            }
            Command::Message(role) => {
                let message = match role {
                    Some(role) => session.last_by_role(role),
                    None => session.last(),
                };
                match (message, role) {
                    (Some(message), _) => Ok(Reply::output(message.content.clone())),
                    (None, Some(role)) => Ok(Reply::info(format!(
                        "No message with role '{role}' found."
                    ))),
                    (None, None) => Ok(Reply::info("No messages yet.")),
                }
            }
            Command::Copy(target) => match copy_payload(session, target) {
                Some((text, info)) => {
                    clipboard::copy_text(&text)?;
                    Ok(Reply::info(info))
                }
                None => Ok(Reply::info("Nothing to copy.")),
            },
            Command::Paste => {
                let text = clipboard::paste_text()?;
                Ok(Reply::info(format!(
                    "Pasted {} characters from clipboard.",
                    text.chars().count()
                ))
                .with_action(Action::Send(text)))
            }
            Command::Image(path) => {
                let path = expand_home(&path);
                if !path.is_file() {
                    return Err(Error::Other(format!(
                        "image file not found: {}",
                        path.display()
                    )));
                }
                let reply = Reply::info(format!(
                    "Image {} will be attached to the next message.",
                    path.display()
                ));
                config.image_path = Some(path);
                Ok(reply)
            }
        }
    }

    fn list_sessions(&mut self) -> Result<Reply> {
        let sessions = session::list_sessions(&self.history_dir)?;
        let text = format_list("history files", &sessions, true);
        self.sessions = sessions;
        Ok(Reply::output(text))
    }
}

/// Entry `i` (1-based) of a previously shown list.
fn pick(list: &[String], i: usize) -> Result<&str> {
    i.checked_sub(1)
        .and_then(|i| list.get(i))
        .map(String::as_str)
        .ok_or_else(|| Error::Other(format!("no list entry #{i}, list the entries first")))
}

/// The text `/copy` puts on the clipboard and the status line to show, or
/// `None` when there is nothing to copy.
fn copy_payload(session: &ChatSession, target: CopyTarget) -> Option<(String, String)> {
    let last = session.last().filter(|_| !session.is_empty())?;

    let (text, info) = match target {
        CopyTarget::Last => (
            last.content.clone(),
            "Last message written to clipboard.".to_string(),
        ),
        CopyTarget::Role(role) => {
            let message = session.last_by_role(role)?;
            (
                message.content.clone(),
                format!("Last {role} message written to clipboard."),
            )
        }
        CopyTarget::Think => {
            let text = if last.reasoning.is_empty() {
                last.content.clone()
            } else {
                reasoning::enclose_in_think_tags(&last.reasoning) + &last.content
            };
            (text, "Last message with reasoning written to clipboard.".to_string())
        }
        CopyTarget::Code => (
            reasoning::extract_code_block(&last.content)?,
            "First code block written to clipboard.".to_string(),
        ),
    };

    if text.is_empty() {
        return None;
    }
    Some((text, info))
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => Path::new(path).to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(dir: &Path) -> Dispatcher {
        Dispatcher::new(
            Client::new(),
            dir.join("config.toml"),
            dir.join("history"),
        )
    }

    fn config(url: &str) -> Config {
        Config {
            url: url.to_string(),
            model: "llama3".to_string(),
            prompt: "be brief".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!(parse("/bye").unwrap(), Command::Bye);
        assert_eq!(parse("/quit").unwrap(), Command::Bye);
        assert_eq!(parse("/EXIT").unwrap(), Command::Bye);
        assert_eq!(parse("/?").unwrap(), Command::Help);
        assert_eq!(parse("/c").unwrap(), Command::Copy(CopyTarget::Last));
        assert_eq!(parse("/v").unwrap(), Command::Paste);
        assert_eq!(parse("  /clear  ").unwrap(), Command::Clear);
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse("/save").unwrap(), Command::Save(String::new()));
        assert_eq!(
            parse("/save my notes").unwrap(),
            Command::Save("my notes".to_string())
        );
        assert_eq!(parse("/load").unwrap(), Command::Load(None));
        assert_eq!(
            parse("/load #2").unwrap(),
            Command::Load(Some(ListRef::Index(2)))
        );
        assert_eq!(
            parse("/load notes").unwrap(),
            Command::Load(Some(ListRef::Name("notes".to_string())))
        );
        assert_eq!(parse("/models").unwrap(), Command::Models(None));
        assert_eq!(parse("/models #3").unwrap(), Command::Models(Some(3)));
        assert_eq!(parse("/models 3").unwrap(), Command::Models(Some(3)));
        assert_eq!(
            parse("/set temperature=0.5").unwrap(),
            Command::Set(Some(Setting::Temperature(0.5)))
        );
        assert_eq!(
            parse("/message user").unwrap(),
            Command::Message(Some(Role::User))
        );
        assert_eq!(parse("/copy code").unwrap(), Command::Copy(CopyTarget::Code));
        assert_eq!(
            parse("/copy assistant").unwrap(),
            Command::Copy(CopyTarget::Role(Role::Assistant))
        );
        assert_eq!(
            parse("/image ~/cat.png").unwrap(),
            Command::Image("~/cat.png".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("/nope").unwrap_err();
        assert!(err.to_string().contains("unknown command '/nope'"));
        assert!(matches!(parse("/message bot"), Err(Error::InvalidRole(_))));
        assert!(parse("/copy everything").is_err());
        assert!(parse("/models two").is_err());
        assert!(parse("/load #x").is_err());
        assert!(parse("/image").is_err());
        assert!(parse("/set colour=blue").is_err());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for cmd in COMMANDS {
            assert!(help.contains(&format!("/{}", cmd.name)), "{}", cmd.name);
        }
        assert!(help.contains("/?"));
    }

    #[test]
    fn test_format_list() {
        let items = vec!["a.chat".to_string(), "b.chat".to_string()];
        assert_eq!(
            format_list("history files", &items, true),
            "History files:\n(01) a.chat\n(02) b.chat"
        );
        assert_eq!(
            format_list("config settings", &items[..1], false),
            "Config settings:\n - a.chat"
        );
        assert_eq!(format_list("History files", &[], true), "no history files found.");
    }

    #[test]
    fn test_copy_payload() {
        let mut session = ChatSession::new("sys", 0);
        assert_eq!(copy_payload(&session, CopyTarget::Last), None);

        session.add_message(Role::User, "question", None).unwrap();
        session
            .add_message(
                Role::Assistant,
                "Here:\n```rust\nfn main() {}\n```\n",
                Some("thinking"),
            )
            .unwrap();

        let (text, _) = copy_payload(&session, CopyTarget::Code).unwrap();
        assert_eq!(text, "fn main() {}\n");

        let (text, _) = copy_payload(&session, CopyTarget::Role(Role::User)).unwrap();
        assert_eq!(text, "question");

        let (text, _) = copy_payload(&session, CopyTarget::Think).unwrap();
        assert!(text.starts_with("<think>\nthinking\n</think>"));
        assert!(text.ends_with("```\n"));

        session.add_message(Role::User, "no code here", None).unwrap();
        assert_eq!(copy_payload(&session, CopyTarget::Code), None);
    }

    #[tokio::test]
    async fn test_clear_retry_and_message() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(dir.path());
        let mut config = config("http://localhost:1");
        let mut session = ChatSession::new("sys", 0);

        let err = d
            .execute(Command::Retry, &mut session, &mut config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no user prompt"));

        session.add_message(Role::User, "hi", None).unwrap();
        session.add_message(Role::Assistant, "hello", None).unwrap();

        let reply = d
            .execute(Command::Message(None), &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(reply.output.as_deref(), Some("hello"));

        let reply = d
            .execute(Command::Retry, &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(reply.action, Action::Retry);
        assert_eq!(session.len(), 2);

        let reply = d
            .execute(Command::Message(Some(Role::Assistant)), &mut session, &mut config)
            .await
            .unwrap();
        assert!(reply.output.is_none());
        assert!(reply.info.unwrap().contains("assistant"));

        d.execute(Command::Clear, &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(session.len(), 1);

        let reply = d
            .execute(Command::Bye, &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(reply.action, Action::Quit);
    }

    #[tokio::test]
    async fn test_save_list_and_load_by_index() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(dir.path());
        let mut config = config("http://localhost:1");
        let mut session = ChatSession::new("sys", 0);
        session.add_message(Role::User, "remember me", None).unwrap();

        let reply = d
            .execute(Command::Save("notes".into()), &mut session, &mut config)
            .await
            .unwrap();
        assert!(reply.info.unwrap().contains("notes.chat"));

        // Selecting by number needs a list first.
        assert!(
            d.execute(
                Command::Load(Some(ListRef::Index(1))),
                &mut session,
                &mut config
            )
            .await
            .is_err()
        );

        let reply = d
            .execute(Command::Load(None), &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(reply.output.as_deref(), Some("History files:\n(01) notes.chat"));
        assert!(reply.info.is_some());

        session.clear_except_system();
        d.execute(
            Command::Load(Some(ListRef::Index(1))),
            &mut session,
            &mut config,
        )
        .await
        .unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().content, "remember me");
    }

    #[tokio::test]
    async fn test_set_context_resizes_session() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(dir.path());
        let mut config = config("http://localhost:1");
        let mut session = ChatSession::new("sys", 0);
        for i in 0..6 {
            session.add_message(Role::User, format!("m{i}"), None).unwrap();
        }

        d.execute(
            Command::Set(Some(Setting::Context(4))),
            &mut session,
            &mut config,
        )
        .await
        .unwrap();
        assert_eq!(config.context, 4);
        assert_eq!(session.max_context(), 4);
        assert!(session.len() <= 4);

        let err = d
            .execute(
                Command::Set(Some(Setting::Context(200))),
                &mut session,
                &mut config,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContextSize { .. }));
        assert_eq!(config.context, 4);

        let reply = d
            .execute(Command::Set(None), &mut session, &mut config)
            .await
            .unwrap();
        assert!(reply.output.unwrap().contains("context = 4"));
    }

    #[tokio::test]
    async fn test_models_and_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3"}, {"name": "qwen3"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.9.1"})),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(dir.path());
        let mut config = config(&server.uri());
        let mut session = ChatSession::new("sys", 10);

        let reply = d
            .execute(Command::Models(None), &mut session, &mut config)
            .await
            .unwrap();
        assert!(reply.output.unwrap().contains("(02) qwen3"));

        d.execute(Command::Models(Some(2)), &mut session, &mut config)
            .await
            .unwrap();
        assert_eq!(config.model, "qwen3");
        assert!(
            d.execute(Command::Models(Some(3)), &mut session, &mut config)
                .await
                .is_err()
        );

        let reply = d
            .execute(Command::Info, &mut session, &mut config)
            .await
            .unwrap();
        let text = reply.output.unwrap();
        assert!(text.contains("Server version is 0.9.1"));
        assert!(text.contains("Current model is 'qwen3'"));
        assert!(text.contains("Context has 1 messages (max. 10)"));
    }

    #[tokio::test]
    async fn test_image_must_exist() {
        let dir = TempDir::new().unwrap();
        let mut d = dispatcher(dir.path());
        let mut config = config("http://localhost:1");
        let mut session = ChatSession::new("sys", 0);

        let missing = dir.path().join("missing.png");
        assert!(
            d.execute(
                Command::Image(missing.display().to_string()),
                &mut session,
                &mut config
            )
            .await
            .is_err()
        );
        assert!(config.image_path.is_none());

        let image = dir.path().join("cat.png");
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
        d.execute(
            Command::Image(image.display().to_string()),
            &mut session,
            &mut config,
        )
        .await
        .unwrap();
        assert_eq!(config.image_path.as_deref(), Some(image.as_path()));
    }
}
