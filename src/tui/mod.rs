//! Terminal User Interface Module
//!
//! The interactive DataInsight client, built with Ratatui.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  📊 DataInsight AI data analysis        sales.csv (d1)          │
//! ├──────────────────────────────────────────┬──────────────────────┤
//! │ ┌─ Conversation ───────────────────────┐ │ ┌─ Insights ───────┐ │
//! │ │ Assistant: Great! I've analyzed ...  │ │ │ ▼ Dataset Overview│ │
//! │ │   • What are the average values...   │ │ │ ▼ Data Quality    │ │
//! │ └──────────────────────────────────────┘ │ │ ▼ Recommendations │ │
//! │ ┌─ Ask a question ─────────────────────┐ │ │                   │ │
//! │ │ > average of column a                │ │ │                   │ │
//! │ └──────────────────────────────────────┘ │ └───────────────────┘ │
//! ├──────────────────────────────────────────┴──────────────────────┤
//! │ Ready │ [Enter] Send [Tab] Focus [Ctrl+O] Upload [F1] Help      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, AppEvent, Focus, View};
pub use event::{AppAction, EventHandler};

use crate::config::Config;
use crate::gateway::Gateway;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application, optionally uploading `initial_file` right away.
pub async fn run(
    config: Config,
    gateway: Arc<dyn Gateway>,
    initial_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("Starting TUI against {}", config.api.base_url);

    let mut terminal = init_terminal()?;
    let mut app = App::new(config, gateway);
    let mut events = EventHandler::new(std::time::Duration::from_millis(100));

    if let Some(path) = initial_file {
        app.start_upload(&path).await;
    }

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    loop {
        // Results from background uploads and queries
        app.poll_events();

        let size = terminal.size()?;
        let viewport = ui::transcript_viewport(Rect::new(0, 0, size.width, size.height));
        let content_height = ui::transcript_lines(app, viewport.width).len();
        app.update_scroll_bounds(
            u16::try_from(content_height).unwrap_or(u16::MAX),
            viewport.height,
        );

        terminal.draw(|frame| ui::render(frame, app))?;

        // Ticks wake the loop so settled events get drawn
        match events.next().await {
            Some(AppAction::Quit) => {
                if app.confirm_quit() {
                    break;
                }
            }
            Some(AppAction::ForceQuit) | None => break,
            Some(action) => app.handle_action(action).await,
        }
    }

    info!("TUI exited normally");
    Ok(())
}
