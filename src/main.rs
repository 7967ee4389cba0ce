use anyhow::Result;

mod app;
mod backend;
mod config;
mod content;
mod handler;
mod history;
mod links;
mod markdown;
mod tui;
mod ui;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Config::load().unwrap_or_else(|_| Config::new()).resolve();
    let mut app = App::new(settings);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        // Pick up finished backend replies and content loads
        app.poll_background().await?;
    }
    Ok(())
}
