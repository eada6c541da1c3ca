use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod ai;
mod app;
mod config;
mod db;
mod error;
mod feed;
mod models;
mod services;
mod state;
mod store;
mod tui;

use app::App;
use config::Config;
use error::Result;
use tui::{draw, handle_key_event};

enum Command {
    Tui,
    Import(PathBuf),
    Refresh,
    Add(String),
}

fn parse_args(args: &[String]) -> Command {
    match args.get(1).map(String::as_str) {
        Some("--import") if args.len() >= 3 => Command::Import(PathBuf::from(&args[2])),
        Some("--add") if args.len() >= 3 => Command::Add(args[2].clone()),
        Some("--refresh") => Command::Refresh,
        _ => Command::Tui,
    }
}

/// The terminal belongs to the TUI, so logs go to a file.
fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    // Only warnings and errors by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;
    init_logging(&config)?;

    // Initialize app
    let mut app = App::new(&config).await?;

    match parse_args(&args) {
        Command::Import(path) => {
            app.import_dataset(&path).await?;
            println!("Imported dataset from {:?}", path);
            return Ok(());
        }
        Command::Refresh => {
            let added = app.pull_all_blocking().await?;
            println!(
                "Refreshed {} sources, {} new items",
                app.snapshot().sources().len(),
                added
            );
            return Ok(());
        }
        Command::Add(url) => {
            let source = app.add_source_blocking(&url).await?;
            println!("Added source {} ({})", source.title, source.url);
            return Ok(());
        }
        Command::Tui => {}
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!("Exited with error: {}", e);
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Apply finished background work
        app.poll_generation_result().await?;
        app.poll_ingest_result().await?;
        app.poll_pull_result().await?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.input_mode()) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
