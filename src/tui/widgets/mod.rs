//! TUI Widgets
//!
//! Panels and modals of the DataInsight TUI.

mod insights;
mod upload;

pub use insights::render_insights;
pub use upload::render_upload;
