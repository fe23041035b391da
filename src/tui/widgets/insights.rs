//! Insights Widget
//!
//! Collapsible sections describing the active dataset.

use crate::insights::{present, SectionBody, SectionView};
use crate::tui::app::{App, Focus, View};
use crate::tui::theme::{Icons, Theme};
use crate::tui::ui::UPLOADING_TEXT;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the insights panel
pub fn render_insights(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.view == View::Chat && app.focus == Focus::Insights;
    let block = Block::default()
        .title(" Insights ")
        .borders(Borders::ALL)
        .border_style(Theme::border_for(focused));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match app.session.insights() {
        Some(snapshot) => {
            let selected = focused.then_some(app.section_index);
            present(snapshot, &app.expanded)
                .iter()
                .enumerate()
                .flat_map(|(i, section)| section_lines(section, selected == Some(i)))
                .collect()
        }
        None if app.session.is_uploading() => {
            vec![Line::from(Span::styled(UPLOADING_TEXT, Theme::active()))]
        }
        None => vec![Line::from(Span::styled(
            "Insights appear here once a file is uploaded.",
            Theme::text_dim(),
        ))],
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}

fn section_lines(section: &SectionView, selected: bool) -> Vec<Line<'static>> {
    let icon = if section.expanded {
        Icons::EXPANDED
    } else {
        Icons::COLLAPSED
    };
    let title_style = if selected {
        Theme::selected()
    } else {
        Theme::heading()
    };

    let mut header = vec![
        Span::styled(if selected { Icons::SELECTED } else { " " }, Theme::selected()),
        Span::styled(format!("{} {}", icon, section.title), title_style),
    ];
    if let Some(count) = section.count {
        header.push(Span::styled(format!(" ({})", count), Theme::text_dim()));
    }

    let mut lines = vec![Line::from(header)];
    if let Some(body) = &section.body {
        lines.extend(body_lines(body));
    }
    lines.push(Line::from(""));
    lines
}

fn body_lines(body: &SectionBody) -> Vec<Line<'static>> {
    match body {
        SectionBody::Overview {
            rows,
            columns,
            numeric_columns,
            categorical_columns,
        } => vec![
            stat_line("Rows", count_or_na(*rows)),
            stat_line("Columns", count_or_na(*columns)),
            stat_line("Numeric columns", numeric_columns.to_string()),
            stat_line("Categorical columns", categorical_columns.to_string()),
        ],
        SectionBody::Quality {
            completeness_percent,
            tier,
            duplicate_rows,
        } => vec![
            Line::from(vec![
                Span::styled("   Completeness: ", Theme::text_secondary()),
                Span::styled(
                    format!("{:.1}%", completeness_percent),
                    Theme::quality(*tier),
                ),
            ]),
            stat_line("Duplicate rows", duplicate_rows.to_string()),
        ],
        SectionBody::Items(items) => items
            .iter()
            .map(|item| {
                Line::from(vec![
                    Span::styled(format!("   {} ", Icons::DOT), Theme::text_dim()),
                    Span::styled(item.clone(), Theme::text()),
                ])
            })
            .collect(),
    }
}

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("   {}: ", label), Theme::text_secondary()),
        Span::styled(value, Theme::text()),
    ])
}

fn count_or_na(count: Option<u64>) -> String {
    count.map_or_else(|| "N/A".to_string(), |n| n.to_string())
}
