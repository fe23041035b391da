// DataInsight - terminal client for an AI tabular-data analysis service

pub mod config;
pub mod types;
pub mod models;
pub mod gateway;      // Backend HTTP API
pub mod session;      // Active dataset + insight snapshot
pub mod conversation; // Transcript and single-flight querying
pub mod insights;     // Insight Presenter
pub mod utils;
pub mod tui;          // Terminal User Interface

// Re-exports for convenience
pub use config::Config;
pub use conversation::ConversationEngine;
pub use gateway::{Gateway, HttpGateway};
pub use session::SessionController;
pub use types::{GatewayError, GatewayResult, StructuredAnswer};
