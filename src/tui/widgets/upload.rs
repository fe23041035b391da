//! Upload Widget
//!
//! Modal asking for the path of the file to analyze.

use crate::tui::app::App;
use crate::tui::theme::Theme;
use crate::tui::ui::centered_rect;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the upload modal
pub fn render_upload(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 40, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Upload a file ")
        .borders(Borders::ALL)
        .border_style(Theme::border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Instructions
            Constraint::Length(3), // Path input
            Constraint::Min(1),    // Footer
        ])
        .split(inner);

    render_instructions(frame, chunks[0]);
    render_path_input(frame, chunks[1], app);
    render_footer(frame, chunks[2], app);
}

fn render_instructions(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Supported formats: Excel (.xlsx, .xls) and CSV (.csv)",
            Theme::text(),
        )),
        Line::from(vec![
            Span::styled("[Enter]", Theme::shortcut_key()),
            Span::styled(" Upload ", Theme::shortcut_desc()),
            Span::styled("[Esc]", Theme::shortcut_key()),
            Span::styled(" Close", Theme::shortcut_desc()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_path_input(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Path ")
        .borders(Borders::ALL)
        .border_style(Theme::border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(&app.upload_input, inner);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(notice.clone(), Theme::error()))
    } else if app.session.is_uploading() {
        Line::from(Span::styled(
            "An upload is already in progress",
            Theme::active(),
        ))
    } else if let Some(session) = app.session.session() {
        Line::from(Span::styled(
            format!("Replaces the current dataset {}", session.filename),
            Theme::text_secondary(),
        ))
    } else {
        Line::from(Span::styled(
            "The file is analyzed as soon as it is uploaded",
            Theme::text_secondary(),
        ))
    };

    frame.render_widget(Paragraph::new(line), area);
}
