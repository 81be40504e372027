mod interrupt;
mod repl;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use client::consumer::{ChatClient, ClientError};
use client::models::{self, MODELS};
use client::render::render_transcript;
use client::state::{ChatError, ChatSession, ChatState, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use interrupt::{Interrupts, cancel_on_interrupt};
use repl::{HELP, Input, parse_line};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("turn did not complete")]
    TurnNotCompleted,
}

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Terminal client for the streaming chat relay")]
struct Cli {
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "CHAT_MODEL", default_value = models::default_model().id)]
    model: String,

    #[arg(long, help = "System prompt sent as the first message")]
    system: Option<String>,

    #[arg(long, value_name = "PATH", help = "Rewrite an HTML transcript after every turn")]
    transcript_html: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the relay is up.
    Ping,
    /// Interactive chat (default).
    Chat,
    /// Send one message, stream the reply, exit.
    Ask { prompt: String },
}

struct CliContext {
    client: ChatClient,
    session: ChatSession,
    transcript_html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();
    if matches!(cli.command, Some(Command::Ping)) {
        return run_ping(&cli.base_url).await;
    }

    let session = ChatSession::new(models::default_model().id);
    session.set_model(&cli.model)?;
    if let Some(system) = &cli.system {
        session.seed_system(system);
    }
    let ctx = CliContext { client: ChatClient::new(&cli.base_url)?, session, transcript_html: cli.transcript_html };

    let mut interrupts = interrupt::listen();
    match cli.command {
        Some(Command::Ask { prompt }) => run_ask(&ctx, &prompt, &mut interrupts).await,
        _ => run_repl(&ctx, &mut interrupts).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_ask(ctx: &CliContext, prompt: &str, interrupts: &mut Interrupts) -> Result<(), CliError> {
    match run_turn(ctx, prompt, interrupts).await? {
        TurnOutcome::Completed => Ok(()),
        TurnOutcome::Failed | TurnOutcome::Cancelled => Err(CliError::TurnNotCompleted),
    }
}

async fn run_repl(ctx: &CliContext, interrupts: &mut Interrupts) -> Result<(), CliError> {
    eprintln!(
        "relay: {}  model: {} (/help for commands)",
        ctx.client.endpoint(),
        ctx.session.snapshot().model
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(()) = interrupts.recv() => {
                println!();
                break;
            }
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Help => eprintln!("{HELP}"),
            Input::Models => {
                let current = ctx.session.snapshot().model;
                for model in MODELS {
                    let marker = if model.id == current { "*" } else { " " };
                    println!("{marker} {:<12} {}", model.id, model.label);
                }
            }
            Input::Model(None) => eprintln!("usage: /model <id>"),
            Input::Model(Some(id)) => match ctx.session.set_model(id) {
                Ok(()) => eprintln!("model: {id}"),
                Err(e) => eprintln!("{e}"),
            },
            Input::Unknown(name) => eprintln!("unknown command: /{name}"),
            Input::Message(text) => {
                run_turn(ctx, text, interrupts).await?;
            }
        }
    }
    Ok(())
}

/// Drive one turn: print fragments as they land, cancel on Ctrl-C, report
/// failures on stderr and refresh the transcript.
async fn run_turn(ctx: &CliContext, text: &str, interrupts: &mut Interrupts) -> Result<TurnOutcome, CliError> {
    let cancel = CancellationToken::new();
    let printer = tokio::spawn(print_reply(ctx.session.subscribe()));

    let turn = ctx.client.run_turn(&ctx.session, text, &cancel);
    let result = cancel_on_interrupt(turn, interrupts, &cancel).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            printer.abort();
            return Err(e.into());
        }
    };
    let _ = printer.await;

    let state = ctx.session.snapshot();
    match outcome {
        TurnOutcome::Completed => {}
        TurnOutcome::Cancelled => eprintln!("[cancelled]"),
        TurnOutcome::Failed => {
            if let Some(notice) = &state.notice {
                eprintln!("{notice}");
            }
        }
    }

    if let Some(path) = &ctx.transcript_html {
        write_transcript(path, &state)?;
    }
    Ok(outcome)
}

/// Print the growing reply until the turn leaves its loading phases.
async fn print_reply(mut rx: watch::Receiver<ChatState>) {
    let mut printed = 0;
    let mut stdout = std::io::stdout();

    while rx.changed().await.is_ok() {
        let (fresh, done) = {
            let state = rx.borrow_and_update();
            let fresh = state
                .last_reply()
                .and_then(|reply| reply.content.get(printed..))
                .unwrap_or_default()
                .to_owned();
            (fresh, !state.is_loading())
        };
        if !fresh.is_empty() {
            let _ = write!(stdout, "{fresh}");
            let _ = stdout.flush();
            printed += fresh.len();
        }
        if done {
            break;
        }
    }
    println!();
}

fn write_transcript(path: &Path, state: &ChatState) -> Result<(), CliError> {
    std::fs::write(path, render_transcript(&state.messages))?;
    Ok(())
}
