//! CLI (Command Line Interface) mode
//!
//! Interactive chat REPL. The HTTP API runs in the background so the chat
//! tools can reach it over loopback; the conversation lives here and is sent
//! in full to `/api/chat` on every turn, as the browser client does.

use std::time::Duration;

use crm_api::{AppState, Shutdown, ShutdownReason};
use crm_core::{ChatMessage, Config, Role};
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show help"),
    ("/exit", "Exit the program"),
    ("/quit", "Exit the program"),
    ("/clear", "Clear the conversation"),
    ("/history", "Show the conversation"),
];

/// Characters of each message shown by `/history`
const HISTORY_PREVIEW_CHARS: usize = 100;

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                ..Default::default()
            })
            .collect()
    }
}

/// Custom prompt with colored styling
struct ColoredPrompt {
    style: Style,
}

impl ColoredPrompt {
    fn new() -> Self {
        Self {
            style: Color::Cyan.bold(),
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Owned(self.style.paint("crm> ").to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// Outcome of a line that starts with `/`
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Exit,
    Handled,
    NotACommand,
}

/// Client for the local `/api/chat` endpoint
struct ChatSession {
    http: reqwest::Client,
    chat_url: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            messages: Vec::new(),
        }
    }

    /// Send the whole conversation plus `input`; the user turn is kept only on success
    async fn send(&mut self, input: &str) -> anyhow::Result<String> {
        self.messages.push(ChatMessage::user(input));

        match self.request().await {
            Ok(content) => {
                self.messages.push(ChatMessage::assistant(content.clone()));
                Ok(content)
            }
            Err(e) => {
                self.messages.pop();
                Err(e)
            }
        }
    }

    async fn request(&self) -> anyhow::Result<String> {
        let response = self
            .http
            .post(&self.chat_url)
            .json(&json!({ "messages": self.messages }))
            .send()
            .await?;

        let status = response.status();
        let body: JsonValue = response.json().await?;

        if !status.is_success() {
            anyhow::bail!("{} ({}): {}", body["error"].as_str().unwrap_or("Request failed"), status, body["details"]);
        }

        Ok(body["content"].as_str().unwrap_or_default().to_string())
    }
}

/// Run CLI interactive mode
pub async fn run_cli(config: &Config, state: AppState) -> anyhow::Result<()> {
    // Local API for the tools; bound before the first prompt so loopback calls succeed
    let listener = TcpListener::bind((config.api.host.as_str(), config.api.port)).await?;
    let shutdown = Shutdown::new();
    let app = crm_api::build_router(state, &config.api, &shutdown);
    let server = tokio::spawn(crm_api::serve(
        listener,
        app,
        shutdown.clone(),
        Duration::from_secs(config.api.shutdown_grace_secs),
    ));

    let mut session = ChatSession::new(&config.gateway_url());
    info!("CLI chat using {}", session.chat_url);

    // Welcome message
    print_welcome();

    // Setup keybindings
    let mut keybindings = default_keybindings();

    // Trigger completion on '/' key
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    // Setup menu - with_only_buffer_difference(false) makes menu show even without buffer changes
    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(40))
            .with_only_buffer_difference(false),
    );

    // Setup hinter
    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    // Create line editor
    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let prompt = ColoredPrompt::new();

    loop {
        let signal = line_editor.read_line(&prompt);

        match signal {
            Ok(Signal::Success(line)) => {
                let input = line.trim();

                // Handle empty input
                if input.is_empty() {
                    continue;
                }

                // Handle special commands
                match handle_command(input, &mut session.messages) {
                    Command::Exit => break,
                    Command::Handled => continue,
                    Command::NotACommand => {}
                }

                match session.send(input).await {
                    Ok(response) => println!("\n{}\n", response),
                    Err(e) => eprintln!("\n{} {}\n", Color::Red.paint("Error:"), e),
                }

                if shutdown.reason().is_some() {
                    eprintln!("The local API stopped; exiting.");
                    break;
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("\n{} {}\n", Color::Red.paint("Error:"), err);
                break;
            }
        }
    }

    println!("\nGoodbye!\n");

    shutdown.trigger(ShutdownReason::Requested);
    match server.await {
        Ok(result) => result?,
        Err(e) => warn!("API server task failed: {}", e),
    }

    Ok(())
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    // Tab key triggers completion
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    // Esc key clears/closes menus
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

/// Handle special commands (/exit, /clear, /help, /history)
fn handle_command(input: &str, messages: &mut Vec<ChatMessage>) -> Command {
    let lower = input.to_lowercase();

    match lower.as_str() {
        "/exit" | "/quit" | "/q" => Command::Exit,
        "/clear" => {
            messages.clear();
            println!("\nConversation cleared.\n");
            Command::Handled
        }
        "/help" | "/?" => {
            print_help();
            Command::Handled
        }
        "/history" => {
            print_history(messages);
            Command::Handled
        }
        _ if lower.starts_with('/') => {
            eprintln!("\nUnknown command: {}. Type /help for the command list.\n", input);
            Command::Handled
        }
        _ => Command::NotACommand,
    }
}

/// Print welcome message
fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          crm-gateway CLI - chat mode                       ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Ask about contacts and deals, then press Enter            ║");
    println!("║  Commands: /help, /exit, /clear, /history                  ║");
    println!("║  Type / to see command suggestions                         ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

/// Print help message
fn print_help() {
    println!();
    println!("Available commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {} - {}", cmd, desc);
    }
    println!();
    println!("Examples:");
    println!("  list all contacts");
    println!("  create a deal \"Pro Plan\" for 99 in closedwon for contact 123");
    println!();
}

/// One `/history` line
fn history_line(index: usize, message: &ChatMessage) -> String {
    let role = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
        other => other.as_str(),
    };
    let text = message.text_content();
    let mut preview: String = text.chars().take(HISTORY_PREVIEW_CHARS).collect();
    if text.chars().count() > HISTORY_PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("{}. {}: {}", index + 1, role, preview.replace('\n', " "))
}

/// Print conversation history
fn print_history(messages: &[ChatMessage]) {
    println!();
    println!("Conversation ({} messages):", messages.len());
    println!("{}", "─".repeat(50));

    for (i, msg) in messages.iter().enumerate() {
        println!("{}", history_line(i, msg));
    }

    println!("{}", "─".repeat(50));
    println!();
}
