//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::conversation::{Message, Role};
use crate::tui::app::{App, Focus, View};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const INDENT: &str = "  ";

pub const UPLOADING_TEXT: &str = "Processing your file... Analyzing data and generating insights";
const PENDING_TEXT: &str = "Analyzing your question...";

/// Screen regions of the chat view
pub struct MainLayout {
    pub header: Rect,
    pub transcript: Rect,
    pub input: Rect,
    pub insights: Rect,
    pub status: Rect,
}

impl MainLayout {
    pub fn new(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(8),    // Body
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(67), Constraint::Percentage(33)])
            .split(rows[1]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(columns[0]);

        Self {
            header: rows[0],
            transcript: left[0],
            input: left[1],
            insights: columns[1],
            status: rows[2],
        }
    }
}

/// Inner area the transcript is drawn into, for scroll bounds.
pub fn transcript_viewport(area: Rect) -> Rect {
    Block::default()
        .borders(Borders::ALL)
        .inner(MainLayout::new(area).transcript)
}

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let layout = MainLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_transcript(frame, layout.transcript, app);
    render_input(frame, layout.input, app);
    widgets::render_insights(frame, layout.insights, app);
    render_status_bar(frame, layout.status, app);

    match app.view {
        View::Upload => widgets::render_upload(frame, app),
        View::Help => render_help(frame),
        View::Chat => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let dataset = match app.session.session() {
        Some(session) => vec![
            Span::styled(session.filename.clone(), Theme::text()),
            Span::styled(format!(" ({})", session.id), Theme::text_dim()),
        ],
        None => vec![Span::styled("no dataset", Theme::text_dim())],
    };

    let mut spans = vec![
        Span::raw("📊 "),
        Span::styled("DataInsight", Theme::title()),
        Span::styled(" AI data analysis", Theme::text_secondary()),
        Span::raw("   "),
    ];
    spans.extend(dataset);
    spans.push(Span::styled(
        format!("   {}", app.config.api.base_url),
        Theme::text_dim(),
    ));

    let title = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

    frame.render_widget(title, area);
}

fn render_transcript(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view == View::Chat && app.focus == Focus::Examples;
    let block = Block::default()
        .title(" Conversation ")
        .borders(Borders::ALL)
        .border_style(Theme::border_for(focused));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = transcript_lines(app, inner.width);
    let paragraph = Paragraph::new(lines).scroll((app.scroll_offset, 0));
    frame.render_widget(paragraph, inner);
}

/// Transcript as display lines, pre-wrapped to `width` so the line count
/// matches what ends up on screen.
pub fn transcript_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    let mut lines = Vec::new();

    let messages = app.conversation.messages();
    if messages.is_empty() && app.session.session().is_none() {
        if app.session.is_uploading() {
            push_wrapped(&mut lines, UPLOADING_TEXT, width, Theme::active());
        } else {
            push_welcome(&mut lines, width);
        }
        return lines;
    }

    let examples_focused = app.view == View::Chat && app.focus == Focus::Examples;
    for message in messages {
        let selected = examples_focused.then_some(app.example_index);
        push_message(&mut lines, message, width, selected);
    }

    if app.conversation.is_pending() {
        lines.push(Line::from(vec![
            Span::styled("Assistant: ", Theme::bot_message()),
            Span::styled(PENDING_TEXT, Theme::active()),
            Span::styled(Icons::CURSOR, Theme::active()),
        ]));
    }
    if app.session.is_uploading() {
        push_wrapped(&mut lines, UPLOADING_TEXT, width, Theme::active());
    }

    lines
}

fn push_welcome(lines: &mut Vec<Line<'static>>, width: usize) {
    lines.push(Line::from(Span::styled(
        "Welcome to DataInsight!",
        Theme::heading(),
    )));
    lines.push(Line::from(""));
    push_wrapped(
        lines,
        "Upload an Excel (.xlsx, .xls) or CSV file to get instant insights, then ask questions about your data in plain English.",
        width,
        Theme::text(),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw(INDENT),
        Span::styled("Press ", Theme::text_secondary()),
        Span::styled("Ctrl+O", Theme::shortcut_key()),
        Span::styled(" to choose a file.", Theme::text_secondary()),
    ]));
}

fn push_message(
    lines: &mut Vec<Line<'static>>,
    message: &Message,
    width: usize,
    selected_example: Option<usize>,
) {
    let (who, style) = match message.role {
        Role::User => ("You", Theme::user_message()),
        Role::Bot => ("Assistant", Theme::bot_message()),
    };
    let time = message
        .created_at
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();
    lines.push(Line::from(vec![
        Span::styled(format!("{}: ", who), style),
        Span::styled(time, Theme::text_dim()),
    ]));

    let text_style = if message.is_error {
        Theme::error()
    } else if message.succeeded == Some(false) {
        Theme::warning()
    } else {
        Theme::text()
    };
    push_wrapped(lines, &message.text, width, text_style);

    if let Some(detail) = &message.error_detail {
        push_wrapped(lines, detail, width, Theme::text_dim());
    }

    if let Some(examples) = &message.example_suggestions {
        for (i, example) in examples.iter().enumerate() {
            let is_selected = selected_example == Some(i);
            let (marker, style) = if is_selected {
                (Icons::SELECTED, Theme::selected())
            } else {
                (Icons::DOT, Theme::text_secondary())
            };
            lines.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(format!("{} {}", marker, example), style),
            ]));
        }
    }

    if let Some(answer) = &message.structured_answer {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("Answer", Theme::heading()),
        ]));
        push_wrapped(lines, &answer.preview(), width, Theme::text());
    }

    if let Some(code) = &message.generated_code {
        lines.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled(" python ", Theme::badge_primary()),
        ]));
        push_wrapped(lines, code, width, Theme::code());
    }

    lines.push(Line::from(""));
}

fn push_wrapped(lines: &mut Vec<Line<'static>>, text: &str, width: usize, style: Style) {
    let max_width = width.saturating_sub(INDENT.len());
    for line in text.lines() {
        for chunk in wrap_text(line, max_width) {
            lines.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(chunk, style),
            ]));
        }
    }
}

/// Break `line` into pieces of at most `max_width` characters, preferring
/// whitespace and separators as break points.
pub fn wrap_text(line: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut out = Vec::new();
    let mut remaining = line;

    while remaining.chars().count() > max_width {
        let mut break_at = None;
        for (seen, (idx, ch)) in remaining.char_indices().enumerate() {
            if seen > max_width {
                break;
            }
            if ch.is_whitespace() && idx > 0 {
                break_at = Some(idx);
            } else if (ch == ',' || ch == ';') && seen < max_width {
                break_at = Some(idx + ch.len_utf8());
            }
        }

        let split_at = break_at.unwrap_or_else(|| {
            remaining
                .char_indices()
                .nth(max_width)
                .map_or(remaining.len(), |(idx, _)| idx)
        });

        let (chunk, rest) = remaining.split_at(split_at);
        out.push(chunk.trim_end().to_string());
        remaining = rest.trim_start();
    }

    if !remaining.is_empty() || out.is_empty() {
        out.push(remaining.to_string());
    }
    out
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view == View::Chat && app.focus == Focus::Input;
    let title = if app.conversation.is_pending() {
        " Waiting for the answer... "
    } else {
        " Ask a question "
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Theme::border_for(focused));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(&app.input, inner);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let status = if let Some(error) = app.session.last_error() {
        Span::styled(format!("Upload failed: {}", error), Theme::error())
    } else if let Some(notice) = &app.notice {
        Span::styled(notice.clone(), Theme::warning())
    } else if app.session.is_uploading() {
        Span::styled("Uploading...", Theme::active())
    } else if app.conversation.is_pending() {
        Span::styled("Analyzing...", Theme::active())
    } else if app.session.session().is_some() {
        Span::styled("Ready", Theme::text_secondary())
    } else {
        Span::styled("No dataset", Theme::text_secondary())
    };

    let shortcuts = vec![
        Span::styled(" [Enter]", Theme::shortcut_key()),
        Span::styled(" Send ", Theme::shortcut_desc()),
        Span::styled("[Tab]", Theme::shortcut_key()),
        Span::styled(" Focus ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+O]", Theme::shortcut_key()),
        Span::styled(" Upload ", Theme::shortcut_desc()),
        Span::styled("[Ctrl+N]", Theme::shortcut_key()),
        Span::styled(" New ", Theme::shortcut_desc()),
        Span::styled("[F1]", Theme::shortcut_key()),
        Span::styled(" Help", Theme::shortcut_desc()),
    ];

    let line = Line::from(
        std::iter::once(status)
            .chain(std::iter::once(Span::raw(" │ ")))
            .chain(shortcuts)
            .collect::<Vec<_>>(),
    );

    frame.render_widget(Paragraph::new(line), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);

    let rows = [
        ("Enter        ", "Send question / pick example / toggle section"),
        ("Tab          ", "Cycle focus: input, examples, insights"),
        ("Shift+Tab    ", "Cycle focus backwards"),
        ("↑/↓          ", "Scroll, or move the selection"),
        ("Space        ", "Toggle insight section"),
        ("PageUp/Down  ", "Scroll page"),
        ("Ctrl+O       ", "Upload a file"),
        ("Ctrl+N       ", "New dataset (start over)"),
        ("Esc          ", "Close modal / dismiss error"),
        ("Ctrl+Q       ", "Quit (press twice while a request runs)"),
        ("Ctrl+C       ", "Force quit"),
        ("F1           ", "Show this help"),
    ];

    let mut help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
    ];
    help_lines.extend(rows.iter().map(|(key, desc)| {
        Line::from(vec![
            Span::styled(*key, Theme::shortcut_key()),
            Span::styled(*desc, Theme::text()),
        ])
    }));
    help_lines.push(Line::from(""));
    help_lines.push(Line::from(Span::styled(
        "Press any key to close",
        Theme::text_dim(),
    )));

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::border_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
