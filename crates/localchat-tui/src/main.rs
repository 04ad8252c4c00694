use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use localchat_core::Config;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

/// The terminal belongs to the UI, so logs only go somewhere when a log file
/// is configured.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(())
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::new(), Some(e)),
    };

    init_logging(&config)?;
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "using default config");
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new();
    let mut app = App::new(&config, events.sender());
    tracing::info!(ollama = app.relay.ollama_url(), "starting localchat");

    // Model list is loaded once per session
    app.fetch_models();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}
