//! Terminal host for the relay.
//!
//! Plays the part of a browser: one tab with a page context, a popup, and the
//! coordinator on its own thread. Each stdin line is a user action.

use agent_relay::command_center::{LineKind, BANNER};
use agent_relay::config::RelayConfig;
use agent_relay::gateway::{AgentService, HttpGateway};
use agent_relay::keybindings::KeyBindings;
use agent_relay::overlay::OverlayState;
use agent_relay::page::{MemoryClipboard, PageController, PageEvent, PageHandle, PageSnapshot};
use agent_relay::popup::HistoryFetcher;
use agent_relay::runtime::RelayBridge;
use agent_relay::storage::{JsonFileStore, MemoryStore, StateStore};
use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const TAB: u32 = 1;

#[derive(Debug, Parser)]
#[command(name = "agent-relay", about = "Relay selections and commands to a local agent service")]
struct Args {
    /// Config file (defaults to ~/.agent-relay/relay.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the agent service base URL.
    #[arg(long)]
    base_url: Option<String>,
}

const HELP: &str = "\
commands:
  explain <text>   select <text> and press the explain chord
  console          press the console chord
  run <command>    type <command> into the console and press Enter
  dismiss          close the overlay
  copy             press the overlay's Copy control
  history          open the popup
  health           check the agent service
  show             print the page
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RelayConfig::load_from(path),
        None => RelayConfig::load(),
    };
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    log::info!("Agent service at {}", config.base_url);

    let gateway: Arc<dyn AgentService> =
        Arc::new(HttpGateway::from_config(&config).context("failed to build HTTP client")?);
    let store: Arc<dyn StateStore> = match &config.state_file {
        Some(path) => Arc::new(JsonFileStore::open(path)),
        None => Arc::new(MemoryStore::new()),
    };
    let bridge = RelayBridge::start(Arc::clone(&gateway), store)
        .context("failed to start coordinator thread")?;

    let pushes = bridge.tabs().open(TAB);
    bridge.tabs().activate(TAB);
    let keys = KeyBindings::from_config(&config);
    let clipboard = Arc::new(MemoryClipboard::new());
    let page = PageController::spawn(keys, bridge.router(), clipboard.clone(), pushes);
    let popup = HistoryFetcher::new(Arc::clone(&gateway), config.history_agent.clone());
    let settle_timeout = config.request_timeout() + Duration::from_secs(1);

    println!("{HELP}");
    for (chord, action) in keys.describe() {
        println!("  [{chord}] {action}");
    }

    let lines = spawn_stdin_reader();
    while let Ok(line) = lines.recv_async().await {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => continue,
            "explain" => {
                page.key_down(keys.explain_chord(), rest);
                settle(&page, settle_timeout, |s| s.overlay != OverlayState::Loading).await;
            }
            "console" => {
                page.key_down(keys.console_chord(), "");
            }
            "run" => {
                page.run_command(rest);
                settle(&page, settle_timeout, |s| s.pending_commands == 0).await;
            }
            "dismiss" => {
                page.send(PageEvent::DismissOverlay);
            }
            "copy" => {
                page.send(PageEvent::CopyExplanation);
                page.snapshot().await;
                match clipboard.contents() {
                    Some(text) => println!("copied {} chars", text.chars().count()),
                    None => println!("nothing to copy"),
                }
                continue;
            }
            "history" => {
                println!("{}", popup.open().await.render_text());
                continue;
            }
            "health" => {
                match gateway.health().await {
                    Ok(health) => println!("{} (agents: {})", health.status, health.agents.join(", ")),
                    Err(e) => println!("{e}"),
                }
                continue;
            }
            "show" => {}
            "quit" | "exit" => break,
            other => {
                println!("unknown command '{other}'\n{HELP}");
                continue;
            }
        }
        if let Some(snapshot) = page.snapshot().await {
            print_snapshot(&snapshot);
        }
    }

    tokio::task::spawn_blocking(move || bridge.shutdown())
        .await
        .context("coordinator shutdown")?;
    Ok(())
}

/// Forward stdin lines from a blocking reader thread.
fn spawn_stdin_reader() -> flume::Receiver<String> {
    let (tx, rx) = flume::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Poll the page until `done` holds or `timeout` passes.
async fn settle(page: &PageHandle, timeout: Duration, done: impl Fn(&PageSnapshot) -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        match page.snapshot().await {
            Some(snapshot) if !done(&snapshot) => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            _ => return,
        }
    }
}

fn print_snapshot(snapshot: &PageSnapshot) {
    match &snapshot.overlay {
        OverlayState::Hidden => {}
        OverlayState::Loading => println!("[overlay] Analyzing text..."),
        OverlayState::Shown(text) => println!("[overlay]\n{text}"),
        OverlayState::Error(message) => println!("[overlay] {message}"),
    }
    if snapshot.console_open {
        println!("[console]");
        for line in BANNER {
            println!("  {line}");
        }
        for line in &snapshot.transcript {
            let marker = match line.kind {
                LineKind::Echo => " ",
                LineKind::Result => ">",
                LineKind::SystemError => "!",
            };
            println!("{marker} {}", line.text);
        }
        if snapshot.pending_commands > 0 {
            println!("  ({} pending)", snapshot.pending_commands);
        }
    }
}
