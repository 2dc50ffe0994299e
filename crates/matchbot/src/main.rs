//! MatchBot binary: config + logging wiring and a line-based console
//! transport for driving the bot locally.
//!
//! Console input:
//! - `<nick> <text>`      a channel message from `nick` (e.g. `Bob !list`)
//! - `/pm <nick> <text>`  a private message from `nick`
//! - `/join <nick>`       `nick` joins the public channel
//! - `/quit` or EOF       shut down

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use matchbot_core::{
    bot::MatchBot,
    config::Config,
    messaging::{
        port::ChatPort,
        types::{JoinEvent, MessageEvent, Origin, Phase, TransportEvent},
    },
};

struct ConsolePort;

#[async_trait::async_trait]
impl ChatPort for ConsolePort {
    async fn send_notice(&self, to: &str, text: &str) -> matchbot_core::Result<()> {
        println!("[notice -> {to}] {text}");
        Ok(())
    }

    async fn send_message(&self, channel: &str, text: &str) -> matchbot_core::Result<()> {
        println!("[{channel}] {text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    matchbot_core::logging::init("matchbot")?;

    let cfg = Arc::new(Config::load().context("loading configuration")?);
    let port = Arc::new(ConsolePort);

    // Corrupt persisted data refuses to start the process at all.
    let bot = match MatchBot::load(cfg.clone(), port) {
        Ok(bot) => bot,
        Err(e) => {
            error!("refusing to start: {e}");
            std::process::exit(1);
        }
    };

    info!(
        nick = %cfg.nick,
        data_file = %cfg.data_file.display(),
        "matchbot starting"
    );

    let (tx, rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    let reader = tokio::spawn(read_console(cfg.clone(), tx, shutdown.clone()));

    bot.run(rx, shutdown).await;
    let _ = reader.await;
    Ok(())
}

/// Turn stdin lines into transport events until EOF or shutdown.
async fn read_console(
    cfg: Arc<Config>,
    tx: mpsc::Sender<TransportEvent>,
    shutdown: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let Some(event) = parse_console_line(&cfg, line) else {
            eprintln!("expected: `<nick> <text>`, `/pm <nick> <text>`, `/join <nick>` or `/quit`");
            continue;
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }

    shutdown.cancel();
}

fn parse_console_line(cfg: &Config, line: &str) -> Option<TransportEvent> {
    if let Some(rest) = line.strip_prefix("/join ") {
        let user = rest.trim();
        if user.is_empty() {
            return None;
        }
        return Some(TransportEvent::Join(JoinEvent {
            user: user.to_string(),
            channel: cfg.public_channel.clone(),
            phase: Phase::After,
        }));
    }

    if let Some(rest) = line.strip_prefix("/pm ") {
        let (nick, text) = rest.split_once(' ')?;
        return Some(TransportEvent::Message(MessageEvent {
            sender: nick.to_string(),
            origin: Origin::User(nick.to_string()),
            text: text.to_string(),
            phase: Phase::After,
        }));
    }

    let (nick, text) = line.split_once(' ')?;
    Some(TransportEvent::Message(MessageEvent {
        sender: nick.to_string(),
        origin: Origin::Channel(cfg.public_channel.clone()),
        text: text.to_string(),
        phase: Phase::After,
    }))
}
