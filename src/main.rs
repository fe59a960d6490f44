use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use now_playing_card::compositor::Compositor;
use now_playing_card::state::{self, MountedWidget};
use now_playing_card::{Config, Exporter, HttpSource, Refresher, Widget, WidgetState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Download,
    DataUri,
    Links,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "d" | "download" => Some(Command::Download),
        "uri" => Some(Command::DataUri),
        "l" | "links" => Some(Command::Links),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting now playing card");

    let config = Config::from_env().context("Invalid configuration")?;
    let source = HttpSource::new(&config.endpoint, config.request_timeout)?;
    let compositor = Compositor::load(config.font_path.as_deref())
        .context("Failed to initialize compositor")?;
    let exporter = Exporter::new(compositor, source.clone(), &config.export_dir);

    let (state_tx, mut state_rx) = state::create_state();
    let mounted = state::create_mount();
    mount(&mounted, &state_rx.borrow_and_update());

    // Start polling; the first fetch goes out immediately
    log::info!("Polling {}", source.endpoint());
    let refresher = Refresher::start(source, config.poll_interval, state_tx);

    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let interrupt_tx = command_tx.clone();
    ctrlc::set_handler(move || {
        log::info!("Received interrupt signal (Ctrl+C), shutting down...");
        let _ = interrupt_tx.send(Command::Quit);
    })
    .context("Failed to set Ctrl+C handler")?;
    tokio::spawn(read_commands(command_tx));

    log::info!(
        "Commands: d/download (save PNG to {}), uri (print data URI), links, q/quit",
        exporter.out_dir().display()
    );

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    log::warn!("Refresher went away");
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                mount(&mounted, &state);
            }
            Some(command) = command_rx.recv() => {
                let widget = mounted.read().clone();
                match command {
                    Command::Download => {
                        exporter.export(widget.as_ref()).await;
                    }
                    Command::DataUri => {
                        if let Some(snapshot) = exporter.snapshot(widget.as_ref()).await {
                            println!("{}", snapshot.data_uri());
                        }
                    }
                    Command::Links => match widget.as_ref().and_then(|w| w.view.track()) {
                        Some(card) => {
                            println!("song:   {}", card.song_url);
                            println!("artist: {}", card.artist_search_url);
                        }
                        None => log::info!("Nothing is playing"),
                    },
                    Command::Quit => break,
                }
            }
        }
    }

    refresher.stop().await;
    log::info!("Bye");

    Ok(())
}

/// Replace the on-screen card with a fresh render of `state`.
fn mount(mounted: &MountedWidget, state: &WidgetState) {
    let widget = Widget::mount(state);
    log::info!("{}", widget.view);
    *mounted.write() = Some(widget);
}

async fn read_commands(commands: mpsc::UnboundedSender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_command(&line) {
                Some(command) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                None => log::warn!("Unknown command: {}", line.trim()),
            },
            Ok(None) => {
                log::debug!("stdin closed, commands disabled");
                break;
            }
            Err(e) => {
                log::error!("Error reading stdin: {}", e);
                break;
            }
        }
    }
}
