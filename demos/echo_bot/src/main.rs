//! Echo Bot Example
//!
//! A mucbot bot driven from the terminal instead of a chat server. Each line
//! read from stdin is one room event:
//!
//! ```text
//! alice: hello everyone      room message from alice
//! /msg alice psst            private message from alice
//! /join bob                  bob enters the room
//! /leave bob                 bob leaves the room
//! /topic alice Release day   alice changes the subject
//! hello                      room message from "you"
//! ```
//!
//! Bot output is printed as `<nick> text` for the room and `-> user: text`
//! for private messages.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --nick echo --admin you
//! ```

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use mucbot::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tracing::info;

/// Sender used for lines without a `nick:` prefix.
const CONSOLE_USER: &str = "you";

/// Room settings used when neither file nor environment provide them.
const CONSOLE_DEFAULTS: [(&str, &str); 3] = [
    ("login", "echo@localhost"),
    ("channel", "lounge"),
    ("server", "conference.localhost"),
];

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "A console echo bot")]
struct Args {
    /// Configuration file (defaults to ./mucbot.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Nick to use in the room
    #[arg(short, long)]
    nick: Option<String>,

    /// Users allowed to stop the bot with `!quit`
    #[arg(short, long, default_value = CONSOLE_USER)]
    admin: Vec<String>,

    /// Enable runtime tracing
    #[arg(long)]
    debug: bool,
}

// ============================================================================
// Console Transport
// ============================================================================

/// A room simulated on stdin/stdout.
struct ConsoleTransport {
    lines: Lines<BufReader<Stdin>>,
    stdout: Stdout,
    nick: String,
}

impl ConsoleTransport {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
            nick: String::new(),
        }
    }

    async fn print(&mut self, line: &str) -> TransportResult<()> {
        self.stdout.write_all(line.as_bytes()).await?;
        self.stdout.write_all(b"\n").await?;
        self.stdout.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn connect(&mut self, config: &BotConfig) -> TransportResult<()> {
        self.nick = config.nick.clone();
        let room = config.room().unwrap_or_default();
        self.print(&format!("* {} joined {room}", self.nick)).await
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(inbound) = parse_line(&line) {
                        return Some(inbound.into());
                    }
                }
                Ok(None) => return None,
                Err(e) => return Some(TransportEvent::Fatal(e.to_string())),
            }
        }
    }

    async fn send(&mut self, message: Outgoing) -> TransportResult<()> {
        let line = match &message.to {
            Some(user) => format!("-> {user}: {}", message.text),
            None => format!("<{}> {}", self.nick, message.text),
        };
        self.print(&line).await
    }

    async fn close(&mut self) -> TransportResult<()> {
        let line = format!("* {} left", self.nick);
        self.print(&line).await
    }
}

/// Turns one console line into an inbound event; blank lines are skipped.
fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(command) = line.strip_prefix('/') {
        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        let (who, text) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
        if who.is_empty() {
            return None;
        }
        let kind = match name {
            "msg" => EventKind::PrivateMessage,
            "join" => EventKind::Join,
            "leave" => EventKind::Leave,
            "topic" => EventKind::Subject,
            _ => return Some(Inbound::new(EventKind::Message, CONSOLE_USER, line)),
        };
        return Some(Inbound::new(kind, who, text.trim()));
    }

    match line.split_once(": ") {
        Some((nick, text)) if !nick.contains(' ') => {
            Some(Inbound::new(EventKind::Message, nick, text))
        }
        _ => Some(Inbound::new(EventKind::Message, CONSOLE_USER, line)),
    }
}

// ============================================================================
// Handlers
// ============================================================================

const HELP: &str = "commands: !echo <text>, !ping, !users, !help, !quit (admins)";

fn register_handlers(bot: &mut Bot, admins: Vec<String>) -> Result<()> {
    let handle = bot.handle();

    // Logs every room message, matches everything
    bot.message(any().name("log").handle(|event: Arc<Event>, _: Params| async move {
        info!(sender = %event.sender(), "{}", event.text());
    }))?;

    bot.message_and_query(on("!echo").name("echo").handle({
        let handle = handle.clone();
        move |event: Arc<Event>, params: Params| {
            let handle = handle.clone();
            async move {
                match params.text() {
                    Some(text) if !text.is_empty() => handle.reply(&event, text),
                    _ => handle.reply(&event, "echo what?"),
                }
            }
        }
    }))?;

    bot.message_and_query(exact("!ping").name("ping").handle({
        let handle = handle.clone();
        move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.reply(&event, "pong") }
        }
    }))?;

    bot.message_and_query(exact("!help").name("help").handle({
        let handle = handle.clone();
        move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.reply(&event, HELP) }
        }
    }))?;

    bot.message(exact("!users").name("users").handle({
        let handle = handle.clone();
        move |_: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.post(format!("here: {}", handle.users().join(", "))) }
        }
    }))?;

    bot.join(HandlerBuilder::new().name("greet").handle({
        let handle = handle.clone();
        move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.post(format!("welcome, {}!", event.sender())) }
        }
    }))?;

    bot.subject(any().name("topic").handle({
        let handle = handle.clone();
        move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move {
                handle.post(format!("{} set the topic to '{}'", event.sender(), event.text()));
            }
        }
    }))?;

    bot.message_and_query(exact("!quit").name("quit").from(admins).handle({
        let handle = handle.clone();
        move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move {
                info!(by = %event.sender(), "Quit requested");
                handle.post("bye!");
                handle.close();
            }
        }
    }))?;

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(nick) = &args.nick {
        loader = loader.set("nick", nick.as_str());
    }
    if args.debug {
        loader = loader.set("debug", true);
    }

    let mut config = loader.load()?;
    let mut fallback = Config::new();
    for (key, value) in CONSOLE_DEFAULTS {
        if config.get(key).is_none() {
            fallback.set(key, value)?;
        }
    }
    config.push(fallback);

    let mut bot = Bot::from_config(&config)?;
    register_handlers(&mut bot, args.admin)?;

    bot.run(ConsoleTransport::new()).await?;
    Ok(())
}
