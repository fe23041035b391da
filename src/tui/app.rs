//! Application State
//!
//! Holds the session, conversation and view state of the TUI. Network calls
//! run on spawned tasks and report back through [`AppEvent`]s, so the session
//! and transcript are only mutated from the UI loop.

use crate::config::Config;
use crate::conversation::{ConversationEngine, PendingQuery, Settled};
use crate::gateway::Gateway;
use crate::insights::{present, ExpandedSections, SectionKind};
use crate::models::{LoadedDataset, QueryReply, UploadFile};
use crate::session::{spawn_teardown, SessionController, UploadOutcome, UploadTicket};
use crate::tui::event::AppAction;
use crate::types::GatewayResult;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tui_textarea::{CursorMove, TextArea};

const QUESTION_PLACEHOLDER: &str = "Ask a question about your data...";
const PATH_PLACEHOLDER: &str = "Path to an .xlsx, .xls or .csv file";

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Chat,
    Upload,
    Help,
}

/// Which pane receives keys in the chat view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Examples,
    Insights,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Input => Focus::Examples,
            Focus::Examples => Focus::Insights,
            Focus::Insights => Focus::Input,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Input => Focus::Insights,
            Focus::Examples => Focus::Input,
            Focus::Insights => Focus::Examples,
        }
    }
}

/// Results coming back from background gateway calls
#[derive(Debug)]
pub enum AppEvent {
    UploadSettled {
        ticket: UploadTicket,
        result: GatewayResult<LoadedDataset>,
    },
    QuerySettled {
        query: PendingQuery,
        result: GatewayResult<QueryReply>,
    },
}

/// Main application state
pub struct App {
    pub config: Config,

    // UI State
    pub view: View,
    pub focus: Focus,

    // Domain State
    pub session: SessionController,
    pub conversation: ConversationEngine,
    pub expanded: ExpandedSections,

    // Widgets
    pub input: TextArea<'static>,
    pub upload_input: TextArea<'static>,
    pub example_index: usize,
    pub section_index: usize,
    pub scroll_offset: u16,
    pub max_scroll: u16,
    follow_tail: bool,
    quit_armed: bool,

    /// Local message for the status bar (unreadable file, no dataset yet...)
    pub notice: Option<String>,

    gateway: Arc<dyn Gateway>,
    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
}

fn text_input(placeholder: &str, text: &str) -> TextArea<'static> {
    let mut input = TextArea::new(vec![text.to_string()]);
    input.set_cursor_line_style(ratatui::style::Style::default());
    input.set_placeholder_text(placeholder.to_string());
    input.move_cursor(CursorMove::End);
    input
}

impl App {
    pub fn new(config: Config, gateway: Arc<dyn Gateway>) -> Self {
        let (tx, rx) = mpsc::channel(100);

        Self {
            config,
            view: View::Chat,
            focus: Focus::Input,
            session: SessionController::new(),
            conversation: ConversationEngine::new(),
            expanded: ExpandedSections::new(),
            input: text_input(QUESTION_PLACEHOLDER, ""),
            upload_input: text_input(PATH_PLACEHOLDER, ""),
            example_index: 0,
            section_index: 0,
            scroll_offset: 0,
            max_scroll: 0,
            follow_tail: true,
            quit_armed: false,
            notice: None,
            gateway,
            event_rx: rx,
            event_tx: tx,
        }
    }

    /// Whether a quit request should end the app. While an upload or query
    /// is running the first request only arms the quit and warns.
    pub fn confirm_quit(&mut self) -> bool {
        let busy = self.conversation.is_pending() || self.session.is_uploading();
        if !busy || self.quit_armed {
            return true;
        }
        self.quit_armed = true;
        self.notice = Some("A request is still running. Press Ctrl+Q again to quit".to_string());
        false
    }

    /// Apply every background result that has arrived so far.
    pub fn poll_events(&mut self) {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }

        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::UploadSettled { ticket, result } => {
                let outcome = self
                    .session
                    .finish_upload(ticket, result, &mut self.conversation);
                if let UploadOutcome::Installed(session) = outcome {
                    debug!("Showing dataset {}", session.id);
                    self.reset_view_state();
                }
            }
            AppEvent::QuerySettled { query, result } => {
                if self.conversation.settle(query, result) == Settled::Applied {
                    self.scroll_to_bottom();
                }
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        if action != AppAction::Tick {
            self.quit_armed = false;
        }
        match action {
            AppAction::Quit | AppAction::ForceQuit | AppAction::Tick => {}
            AppAction::Submit => match self.view {
                View::Upload => self.confirm_upload().await,
                View::Help => self.view = View::Chat,
                View::Chat => match self.focus {
                    Focus::Input => self.submit_question(),
                    Focus::Examples => self.pick_example(),
                    Focus::Insights => self.toggle_selected_section(),
                },
            },
            AppAction::OpenUpload => {
                if self.view != View::Upload {
                    self.view = View::Upload;
                    self.notice = None;
                    self.upload_input = text_input(PATH_PLACEHOLDER, "");
                }
            }
            AppAction::NewDataset => self.new_dataset(),
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Chat
                } else {
                    View::Help
                };
            }
            AppAction::Escape => {
                if self.view != View::Chat {
                    self.view = View::Chat;
                } else {
                    self.session.dismiss_error();
                    self.notice = None;
                }
            }
            AppAction::Up => match self.focus {
                Focus::Input => self.scroll_up(1),
                Focus::Examples => {
                    self.example_index = self.example_index.saturating_sub(1);
                }
                Focus::Insights => {
                    self.section_index = self.section_index.saturating_sub(1);
                }
            },
            AppAction::Down => match self.focus {
                Focus::Input => self.scroll_down(1),
                Focus::Examples => {
                    let count = self.conversation.example_suggestions().len();
                    if self.example_index + 1 < count {
                        self.example_index += 1;
                    }
                }
                Focus::Insights => {
                    if self.section_index + 1 < self.visible_sections().len() {
                        self.section_index += 1;
                    }
                }
            },
            AppAction::ScrollPageUp => self.scroll_up(10),
            AppAction::ScrollPageDown => self.scroll_down(10),
            AppAction::NextFocus => {
                if self.view == View::Chat {
                    self.focus = self.focus.next();
                }
            }
            AppAction::PrevFocus => {
                if self.view == View::Chat {
                    self.focus = self.focus.prev();
                }
            }
            AppAction::Input(key) => self.handle_input(key),
        }
    }

    fn handle_input(&mut self, key: KeyEvent) {
        match self.view {
            View::Upload => {
                self.upload_input.input(key);
            }
            View::Help => self.view = View::Chat,
            View::Chat => match self.focus {
                Focus::Input => {
                    self.input.input(key);
                }
                Focus::Insights if key.code == KeyCode::Char(' ') => {
                    self.toggle_selected_section();
                }
                _ => {}
            },
        }
    }

    /// Read `path` and hand it to the gateway on a background task.
    pub async fn start_upload(&mut self, path: &Path) {
        let file = match UploadFile::from_path(path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                self.notice = Some(format!("Could not read {}: {}", path.display(), e));
                return;
            }
        };

        let Some(ticket) = self.session.begin_upload(&file.filename) else {
            self.notice = Some("An upload is already in progress".to_string());
            return;
        };
        self.notice = None;

        let gateway = self.gateway.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.upload(file).await;
            tx.send(AppEvent::UploadSettled { ticket, result }).await.ok();
        });
    }

    async fn confirm_upload(&mut self) {
        let path = self.upload_input.lines().join("");
        let path = path.trim();
        if path.is_empty() {
            return;
        }

        let path = Path::new(path).to_path_buf();
        self.start_upload(&path).await;
        if self.notice.is_none() {
            self.view = View::Chat;
        }
    }

    fn submit_question(&mut self) {
        let Some(dataset_id) = self.session.dataset_id().map(str::to_string) else {
            self.notice = Some("Upload a file before asking questions (Ctrl+O)".to_string());
            return;
        };

        // Rejected submissions leave the input box as typed
        let text = self.input.lines().join("\n");
        let Some(query) = self.conversation.begin_submit(&dataset_id, &text) else {
            return;
        };

        self.input = text_input(QUESTION_PLACEHOLDER, "");
        self.notice = None;
        self.scroll_to_bottom();

        let gateway = self.gateway.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = gateway.query(&query.dataset_id, &query.question).await;
            tx.send(AppEvent::QuerySettled { query, result }).await.ok();
        });
    }

    fn pick_example(&mut self) {
        let Some(example) = self
            .conversation
            .example_suggestions()
            .get(self.example_index)
            .cloned()
        else {
            return;
        };

        self.conversation.select_example(&example);
        self.input = text_input(QUESTION_PLACEHOLDER, self.conversation.draft());
        self.focus = Focus::Input;
    }

    /// Sections currently on screen, in display order.
    pub fn visible_sections(&self) -> Vec<SectionKind> {
        self.session
            .insights()
            .map(|snapshot| {
                present(snapshot, &self.expanded)
                    .into_iter()
                    .map(|section| section.kind)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn toggle_selected_section(&mut self) {
        if let Some(kind) = self.visible_sections().get(self.section_index).copied() {
            self.expanded.toggle(kind);
        }
    }

    fn new_dataset(&mut self) {
        if let Some(dropped) = self.session.reset(&mut self.conversation) {
            info!("Starting over, dropping dataset {}", dropped.id);
            if self.config.session.teardown_on_reset {
                spawn_teardown(self.gateway.clone(), dropped);
            }
        }
        self.input = text_input(QUESTION_PLACEHOLDER, "");
        self.notice = None;
        self.reset_view_state();
    }

    fn reset_view_state(&mut self) {
        self.expanded = ExpandedSections::new();
        self.focus = Focus::Input;
        self.example_index = 0;
        self.section_index = 0;
        self.scroll_offset = 0;
        self.follow_tail = true;
    }

    fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.follow_tail = false;
    }

    fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_scroll);
        self.follow_tail = self.scroll_offset == self.max_scroll;
    }

    fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.scroll_offset = self.max_scroll;
    }

    /// Update max scroll based on content
    pub fn update_scroll_bounds(&mut self, content_height: u16, viewport_height: u16) {
        self.max_scroll = content_height.saturating_sub(viewport_height);
        if self.follow_tail || self.scroll_offset > self.max_scroll {
            self.scroll_offset = self.max_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{answered, sales_dataset, ScriptedGateway};
    use crate::types::{GatewayError, StructuredAnswer};
    use crossterm::event::KeyModifiers;
    use std::io::Write;

    fn app_with(gateway: Arc<ScriptedGateway>) -> App {
        let config = Config::from_lookup(|_| None).unwrap();
        App::new(config, gateway)
    }

    async fn drain(app: &mut App) {
        for _ in 0..50 {
            tokio::task::yield_now().await;
            app.poll_events();
        }
    }

    fn csv_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b\n1,2").unwrap();
        file
    }

    async fn loaded_app(gateway: Arc<ScriptedGateway>) -> App {
        gateway.push_upload(Ok(sales_dataset()));
        let mut app = app_with(gateway);
        let file = csv_file();
        app.start_upload(file.path()).await;
        drain(&mut app).await;
        app
    }

    fn type_text(app: &mut App, text: &str) {
        app.input.insert_str(text);
    }

    #[tokio::test]
    async fn test_upload_installs_dataset() {
        let gateway = Arc::new(ScriptedGateway::new());
        let app = loaded_app(gateway.clone()).await;

        assert_eq!(app.session.dataset_id(), Some("d1"));
        assert!(!app.session.is_uploading());
        assert_eq!(app.conversation.messages().len(), 1);
        assert_eq!(gateway.calls().len(), 1);
        assert!(gateway.calls()[0].starts_with("upload "));
    }

    #[tokio::test]
    async fn test_unreadable_path_sets_notice() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut app = app_with(gateway.clone());

        app.start_upload(Path::new("/definitely/not/here.csv")).await;

        assert!(app.notice.as_deref().unwrap().starts_with("Could not read"));
        assert!(!app.session.is_uploading());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_question_round_trip() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Ok(answered("The average is 42", StructuredAnswer::integer(42))));
        let mut app = loaded_app(gateway.clone()).await;

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;
        assert!(app.conversation.is_pending());
        assert_eq!(app.input.lines(), [""]);

        drain(&mut app).await;

        assert!(!app.conversation.is_pending());
        let messages = app.conversation.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, "The average is 42");
        assert!(gateway.calls().contains(&"query d1 average of a".to_string()));
    }

    #[tokio::test]
    async fn test_question_without_dataset_is_refused() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut app = app_with(gateway.clone());

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;

        assert!(app.notice.is_some());
        assert!(app.conversation.messages().is_empty());
        assert_eq!(app.input.lines(), ["average of a"]);
    }

    #[tokio::test]
    async fn test_pick_example_fills_input_without_sending() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut app = loaded_app(gateway.clone()).await;

        app.handle_action(AppAction::NextFocus).await;
        assert_eq!(app.focus, Focus::Examples);
        app.handle_action(AppAction::Down).await;
        app.handle_action(AppAction::Submit).await;

        assert_eq!(app.focus, Focus::Input);
        assert_eq!(app.input.lines(), ["Show me the correlation between columns"]);
        assert_eq!(app.conversation.messages().len(), 1);
        assert!(!app.conversation.is_pending());
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_insight_section() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut app = loaded_app(gateway).await;

        app.focus = Focus::Insights;
        app.handle_action(AppAction::Down).await;
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        app.handle_action(AppAction::Input(space)).await;

        assert!(!app.expanded.is_expanded(SectionKind::Quality));
        assert!(app.expanded.is_expanded(SectionKind::Overview));
    }

    #[tokio::test]
    async fn test_new_dataset_drops_late_reply_and_tears_down() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Ok(answered("late", StructuredAnswer::integer(1))));
        let mut app = loaded_app(gateway.clone()).await;

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;
        app.handle_action(AppAction::NewDataset).await;
        drain(&mut app).await;

        assert!(app.session.session().is_none());
        assert!(app.conversation.messages().is_empty());
        assert!(!app.conversation.is_pending());
        assert!(gateway.calls().contains(&"teardown d1".to_string()));
    }

    #[tokio::test]
    async fn test_failed_query_shows_error_reply() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Err(GatewayError::status(500)));
        let mut app = loaded_app(gateway).await;

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;
        drain(&mut app).await;

        let last = app.conversation.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(
            last.error_detail.as_deref(),
            Some("Request failed with status code 500")
        );
        assert_eq!(app.session.dataset_id(), Some("d1"));
    }

    #[tokio::test]
    async fn test_question_is_sent_as_typed() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Ok(answered("ok", StructuredAnswer::integer(1))));
        let mut app = loaded_app(gateway.clone()).await;

        type_text(&mut app, "  average of a ");
        app.handle_action(AppAction::Submit).await;
        drain(&mut app).await;

        assert_eq!(app.conversation.messages()[1].text, "  average of a ");
        assert!(gateway.calls().contains(&"query d1   average of a ".to_string()));
        assert_eq!(app.conversation.draft(), "");
    }

    #[tokio::test]
    async fn test_quit_is_immediate_when_idle() {
        let gateway = Arc::new(ScriptedGateway::new());
        let mut app = loaded_app(gateway).await;

        assert!(app.confirm_quit());
    }

    #[tokio::test]
    async fn test_quit_needs_confirmation_while_query_runs() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Ok(answered("ok", StructuredAnswer::integer(1))));
        let mut app = loaded_app(gateway).await;

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;
        assert!(app.conversation.is_pending());

        assert!(!app.confirm_quit());
        assert!(app.notice.as_deref().unwrap().contains("Ctrl+Q"));
        app.handle_action(AppAction::Tick).await;
        assert!(app.confirm_quit());
    }

    #[tokio::test]
    async fn test_other_key_disarms_quit() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(Ok(answered("ok", StructuredAnswer::integer(1))));
        let mut app = loaded_app(gateway).await;

        type_text(&mut app, "average of a");
        app.handle_action(AppAction::Submit).await;

        assert!(!app.confirm_quit());
        app.handle_action(AppAction::Down).await;
        assert!(!app.confirm_quit());
    }

    #[test]
    fn test_scroll_bounds_follow_tail() {
        let mut app = app_with(Arc::new(ScriptedGateway::new()));

        app.update_scroll_bounds(50, 20);
        assert_eq!(app.scroll_offset, 30);

        app.scroll_up(10);
        app.update_scroll_bounds(60, 20);
        assert_eq!(app.scroll_offset, 20);

        app.scroll_down(100);
        app.update_scroll_bounds(70, 20);
        assert_eq!(app.scroll_offset, 50);
    }

    #[test]
    fn test_scroll_down_saturates_at_u16_max() {
        let mut app = app_with(Arc::new(ScriptedGateway::new()));

        app.update_scroll_bounds(u16::MAX, 3);
        app.scroll_down(10);

        assert_eq!(app.scroll_offset, app.max_scroll);
        assert_eq!(app.max_scroll, u16::MAX - 3);
    }
}
