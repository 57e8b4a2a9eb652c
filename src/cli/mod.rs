// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! The interactive chat loop.

pub(crate) mod clipboard;
mod input;
mod spinner;
pub(crate) mod terminal;
mod width;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use colored::Colorize;
use reqwest::Client;

use crate::commands::{self, Action, Dispatcher};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output;
use crate::provider::Role;
use crate::provider::ollama::{self, ChatSink};
use crate::session::{self, ChatSession};
use crate::version::VERSION;

use input::{InputEngine, InputEvent};
use spinner::{Spinner, SpinnerHandle};
use terminal::{StdTerminal, TerminalControl};

/// Consecutive terminal failures after which the session gives up.
const MAX_INPUT_FAILURES: usize = 3;

pub(crate) struct CliArgs {
    pub config: Config,
    pub config_path: PathBuf,
    pub history_dir: PathBuf,
    /// Saved session to start from.
    pub history: Option<String>,
}

/// What to do after an entry was read.
enum Turn {
    Skip,
    Quit,
    Send(String),
    Resend,
}

pub(crate) async fn run(args: CliArgs) -> Result<()> {
    let CliArgs {
        mut config,
        config_path,
        history_dir,
        history,
    } = args;

    let client = ollama::build_client()?;
    let mut session = ChatSession::new(config.prompt.clone(), config.context);

    if let Some(name) = history {
        let messages = session::load_session(&history_dir, &name)?;
        session.replace_all(messages)?;
        tracing::info!(name = %name, messages = session.len(), "session restored");
    }

    let mut dispatcher = Dispatcher::new(client.clone(), config_path, history_dir);
    let mut engine = InputEngine::new(StdTerminal::new(), io::stdout());
    if engine.is_interactive() && !config.quiet {
        output::print_info(&format!(
            "picochat {VERSION} using '{}'. Type /? for help.",
            config.model
        ));
    }

    let mut failures = 0;
    loop {
        let Some(event) =
            tokio::task::block_in_place(|| next_event(&mut engine, &mut failures))?
        else {
            continue;
        };

        let (turn, end_of_input) = match event {
            InputEvent::Aborted => (Turn::Skip, false),
            InputEvent::Text { text, end_of_input } => {
                if text.trim().is_empty() {
                    (Turn::Skip, end_of_input)
                } else {
                    (Turn::Send(text), end_of_input)
                }
            }
            InputEvent::Command { text, end_of_input } => (
                run_command(&mut dispatcher, &text, &mut session, &mut config).await,
                end_of_input,
            ),
        };

        match turn {
            Turn::Quit => break,
            Turn::Skip => {}
            Turn::Send(text) => {
                if let Err(e) = add_user_message(&mut session, &mut config, text) {
                    report(&e);
                } else if let Err(e) = chat_turn(&client, &mut session, &config).await {
                    report(&e);
                }
            }
            Turn::Resend => {
                if let Err(e) = chat_turn(&client, &mut session, &config).await {
                    report(&e);
                }
            }
        }

        if end_of_input {
            break;
        }
    }

    Ok(())
}

/// Read one entry. A terminal failure is reported and the caller prompts
/// again, until `MAX_INPUT_FAILURES` happen in a row.
fn next_event<T: TerminalControl, W: Write>(
    engine: &mut InputEngine<T, W>,
    failures: &mut usize,
) -> Result<Option<InputEvent>> {
    match engine.read_multiline_input() {
        Ok(event) => {
            *failures = 0;
            Ok(Some(event))
        }
        Err(e) => {
            *failures += 1;
            tracing::warn!(error = %e, failures = *failures, "reading input failed");
            if *failures >= MAX_INPUT_FAILURES {
                return Err(e);
            }
            report(&e);
            Ok(None)
        }
    }
}

async fn run_command(
    dispatcher: &mut Dispatcher,
    text: &str,
    session: &mut ChatSession,
    config: &mut Config,
) -> Turn {
    let reply = match commands::parse(text) {
        Ok(command) => dispatcher.execute(command, session, config).await,
        Err(e) => Err(e),
    };

    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            report(&e);
            return Turn::Skip;
        }
    };

    if let Some(output) = &reply.output {
        println!("{output}");
    }
    if let Some(info) = &reply.info {
        output::print_info(info);
    }

    match reply.action {
        Action::Continue => Turn::Skip,
        Action::Quit => Turn::Quit,
        Action::Retry => Turn::Resend,
        Action::Send(text) => Turn::Send(text),
    }
}

/// Append the user's message, attaching a pending image once.
fn add_user_message(session: &mut ChatSession, config: &mut Config, text: String) -> Result<()> {
    match config.image_path.take() {
        Some(path) => {
            let image = encode_image(&path)?;
            session.add_user_with_images(text, vec![image]);
            Ok(())
        }
        None => session.add_message(Role::User, text, None),
    }
}

fn encode_image(path: &Path) -> Result<String> {
    let data = fs::read(path)
        .map_err(|e| Error::Other(format!("could not read image {}: {e}", path.display())))?;
    Ok(STANDARD.encode(data))
}

async fn chat_turn(client: &Client, session: &mut ChatSession, config: &Config) -> Result<()> {
    let echo = config.format.streams_text();
    let spinner = if echo && !config.quiet {
        Spinner::start()
    } else {
        Spinner::disabled()
    };

    let mut sink = TerminalSink::new(spinner.handle(), echo, io::stdout());
    let result = ollama::send_chat(client, session, config, &mut sink).await;
    spinner.stop().await;
    let summary = result?;

    if session.take_limit_notice() {
        output::print_warning(&format!(
            "Context limit of {} messages reached, the oldest messages are dropped from now on.",
            session.max_context()
        ));
    }

    output::render_summary(&mut io::stdout(), &summary, config.format, config.quiet)
}

/// Echoes streamed text and stops the spinner on the first token.
struct TerminalSink<W> {
    spinner: SpinnerHandle,
    echo: bool,
    out: W,
    in_reasoning: bool,
}

impl<W: Write> TerminalSink<W> {
    fn new(spinner: SpinnerHandle, echo: bool, out: W) -> Self {
        Self {
            spinner,
            echo,
            out,
            in_reasoning: false,
        }
    }

    fn write(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write> ChatSink for TerminalSink<W> {
    fn on_content(&mut self, text: &str) {
        self.spinner.stop();
        if !self.echo {
            return;
        }
        if self.in_reasoning {
            self.in_reasoning = false;
            self.write("\n\n");
        }
        self.write(text);
    }

    fn on_reasoning(&mut self, text: &str) {
        self.spinner.stop();
        if !self.echo {
            return;
        }
        self.in_reasoning = true;
        self.write(&text.dimmed().to_string());
    }
}

fn report(e: &Error) {
    output::print_error(&e.display_message());
    if e.is_configuration_hint() {
        output::print_info("Check the url and model in the configuration file, see /info.");
    }
}
