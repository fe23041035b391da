//! Theme and Styling
//!
//! Defines colors and styles for the TUI interface.

use crate::insights::QualityTier;
use ratatui::style::{Color, Modifier, Style};

/// Application theme
pub struct Theme;

impl Theme {
    // === Primary Colors ===

    /// Primary accent color (cyan/teal)
    pub const ACCENT: Color = Color::Rgb(0, 212, 255);

    pub const SUCCESS: Color = Color::Rgb(34, 197, 94);

    pub const WARNING: Color = Color::Rgb(251, 191, 36);

    pub const ERROR: Color = Color::Rgb(239, 68, 68);

    // === Text Colors ===

    pub const TEXT_PRIMARY: Color = Color::Rgb(229, 229, 229);

    /// Secondary text color (muted)
    pub const TEXT_SECONDARY: Color = Color::Rgb(161, 161, 161);

    pub const TEXT_DIM: Color = Color::Rgb(82, 82, 82);

    // === Background Colors ===

    /// Background of generated code blocks
    pub const BG_CODE: Color = Color::Rgb(26, 26, 26);

    // === Border Colors ===

    pub const BORDER: Color = Color::Rgb(51, 51, 51);

    pub const BORDER_FOCUSED: Color = Color::Rgb(59, 130, 246);

    // === Role Colors ===

    pub const USER: Color = Color::Rgb(34, 197, 94);

    pub const BOT: Color = Color::Rgb(0, 212, 255);

    // === Styles ===

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn heading() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::BORDER_FOCUSED)
    }

    /// Border for a pane, highlighted when it has focus
    pub fn border_for(focused: bool) -> Style {
        if focused {
            Self::border_focused()
        } else {
            Self::border()
        }
    }

    /// Selected item style
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn user_message() -> Style {
        Style::default()
            .fg(Self::USER)
            .add_modifier(Modifier::BOLD)
    }

    pub fn bot_message() -> Style {
        Style::default()
            .fg(Self::BOT)
            .add_modifier(Modifier::BOLD)
    }

    /// Keyboard shortcut style
    pub fn shortcut_key() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn shortcut_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Active/in-progress indicator
    pub fn active() -> Style {
        Style::default()
            .fg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    pub fn code() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY).bg(Self::BG_CODE)
    }

    /// Label badge, e.g. the `python` tag above generated code
    pub fn badge_primary() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Completeness colored by quality tier
    pub fn quality(tier: QualityTier) -> Style {
        let color = match tier {
            QualityTier::Good => Self::SUCCESS,
            QualityTier::Warn => Self::WARNING,
            QualityTier::Poor => Self::ERROR,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

/// Status icons
pub struct Icons;

impl Icons {
    pub const EXPANDED: &'static str = "▼";
    pub const COLLAPSED: &'static str = "▶";
    pub const CURSOR: &'static str = "▌";
    pub const SELECTED: &'static str = "›";
    pub const DOT: &'static str = "•";
}
