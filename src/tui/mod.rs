// TUI module - Terminal User Interface
//
// Terminal setup/teardown and the event loop. The loop multiplexes keyboard
// input, a redraw tick, and AppEvents coming back from spawned fetches and
// the poll supervisor, so all state mutation stays on this one task.

pub mod app;
pub mod components;
pub mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::api::Transport;
use crate::config::Config;
use crate::events::AppEvent;
use crate::logging::LogBuffer;

use app::App;

/// Run the TUI
///
/// Sets up the terminal, runs the event loop, and restores the terminal on
/// the way out, including on error.
pub async fn run_tui(
    api: Arc<dyn Transport>,
    events_tx: mpsc::Sender<AppEvent>,
    mut events_rx: mpsc::Receiver<AppEvent>,
    log_buffer: LogBuffer,
    config: &Config,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(api, events_tx, log_buffer, config.per_page);
    app.bootstrap();

    let result = run_event_loop(&mut terminal, &mut app, &mut events_rx).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Main event loop
///
/// tokio::select! waits on three sources: keyboard input, a 200ms redraw
/// tick, and the AppEvent channel. Events are applied one at a time, which
/// keeps job-finished handling ordered: stop polling, toast, then refresh.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        tokio::select! {
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key)) = event::read() {
                        app.handle_key(key);
                    }
                }
            } => {}

            _ = tick_interval.tick() => {
                app.tick();
            }

            Some(app_event) = events_rx.recv() => {
                app.handle_event(app_event);
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.supervisor.shutdown();
    Ok(())
}
