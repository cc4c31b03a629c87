//! Terminal front end: app state, event dispatch and the main loop.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::Color,
    widgets::ListState,
    Terminal,
};

use crate::drag::{DragState, DropIntent};
use crate::error::StoreError;
use crate::kanban_board::{EditorField, KanbanBoard};
use crate::logging;
use crate::store::TaskStore;
use crate::task::Status;
use crate::ui::{self, BoardLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Move around the board
    Normal,
    /// Typing into the new-task box
    Insert,
    /// Holding a card
    Drag,
    /// Edit modal open
    Edit,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Normal => "BOARD",
            Mode::Insert => "ADD",
            Mode::Drag => "MOVE",
            Mode::Edit => "EDIT",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Mode::Normal => Color::Cyan,
            Mode::Insert => Color::Green,
            Mode::Drag => Color::Yellow,
            Mode::Edit => Color::Magenta,
        }
    }

    pub fn hints(&self) -> &'static str {
        match self {
            Mode::Normal => {
                "←→↑↓ select | a add | e edit | d delete | space move | r reload | q quit"
            }
            Mode::Insert => "enter add | esc back",
            Mode::Drag => "←→ choose column | space/enter drop | esc cancel",
            Mode::Edit => "tab switch field | ctrl+s save | esc close",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub struct App<S> {
    pub board: KanbanBoard<S>,
    pub mode: Mode,
    pub drag: Option<DragState>,
    pub notice: Option<Notice>,
    pub list_states: [ListState; 3],
    pub layout: BoardLayout,
    /// Card under a held mouse button that hasn't moved yet.
    pressed: Option<(String, Status)>,
    should_quit: bool,
}

impl<S: TaskStore> App<S> {
    pub fn new(board: KanbanBoard<S>) -> Self {
        Self {
            board,
            mode: Mode::Normal,
            drag: None,
            notice: None,
            list_states: Default::default(),
            layout: BoardLayout::default(),
            pressed: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub async fn reload(&mut self) {
        let result = self.board.load().await;
        self.report(result, None);
    }

    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse).await,
            _ => {}
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(key).await,
            Mode::Insert => self.handle_insert_key(key).await,
            Mode::Drag => self.handle_drag_key(key).await,
            Mode::Edit => self.handle_edit_key(key).await,
        }
    }

    async fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => self.board.move_column(-1),
            KeyCode::Right | KeyCode::Char('l') => self.board.move_column(1),
            KeyCode::Up | KeyCode::Char('k') => self.board.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.board.move_selection(1),
            KeyCode::Char('a') | KeyCode::Char('i') => {
                self.notice = None;
                self.mode = Mode::Insert;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    if self.board.open_editor(&id) {
                        self.notice = None;
                        self.mode = Mode::Edit;
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    let result = self.board.delete_task(&id).await;
                    self.report(result, Some("Task deleted"));
                }
            }
            KeyCode::Char(' ') => {
                if let Some(task) = self.board.selected() {
                    self.drag = Some(DragState::pick_up(task.id.clone(), task.status));
                    self.notice = None;
                    self.mode = Mode::Drag;
                }
            }
            KeyCode::Char('r') => {
                self.reload().await;
                if self.notice.is_none() {
                    self.info("Reloaded");
                }
            }
            KeyCode::Esc => self.notice = None,
            _ => {}
        }
    }

    async fn handle_insert_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => match self.board.add_task().await {
                Ok(true) => self.info("Task added"),
                Ok(false) => {}
                Err(err) => self.error(err),
            },
            _ => {
                self.board.new_task.handle_key(key, false);
            }
        }
    }

    async fn handle_drag_key(&mut self, key: KeyEvent) {
        let Some(drag) = self.drag.as_mut() else {
            self.mode = Mode::Normal;
            return;
        };
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => drag.step(-1),
            KeyCode::Right | KeyCode::Char('l') => drag.step(1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(drag) = self.drag.take() {
                    self.finish_drop(drag.release()).await;
                }
            }
            KeyCode::Esc => {
                if let Some(drag) = self.drag.take() {
                    self.finish_drop(drag.cancel()).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.board.editor_mut() else {
            self.mode = Mode::Normal;
            return;
        };

        let save = match key.code {
            KeyCode::Esc => {
                self.board.close_editor();
                self.mode = Mode::Normal;
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                editor.toggle_focus();
                false
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Enter if editor.focus == EditorField::Title => true,
            _ => {
                let multiline = editor.focus == EditorField::Explanation;
                editor.focused_mut().handle_key(key, multiline);
                false
            }
        };

        if save {
            match self.board.save_editor().await {
                Ok(_) => {
                    self.mode = Mode::Normal;
                    self.info("Task saved");
                }
                Err(err) => self.error(err),
            }
        }
    }

    pub async fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (x, y) = (mouse.column, mouse.row);

        if self.mode == Mode::Edit {
            // A click outside the modal closes it without saving.
            if mouse.kind == MouseEventKind::Down(MouseButton::Left) && !self.layout.in_modal(x, y)
            {
                self.board.close_editor();
                self.mode = Mode::Normal;
            }
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.layout.in_input(x, y) {
                    self.drag = None;
                    self.pressed = None;
                    self.mode = Mode::Insert;
                    return;
                }
                if self.mode == Mode::Insert {
                    self.mode = Mode::Normal;
                }
                let offsets = self.list_offsets();
                if let Some((status, index)) = self.layout.card_at(x, y, offsets) {
                    let id = self
                        .board
                        .get_tasks_by_status(status)
                        .get(index)
                        .map(|t| t.id.clone());
                    if let Some(id) = id {
                        self.board.select_task(&id);
                        self.pressed = Some((id, status));
                    }
                } else if let Some(status) = self.layout.column_at(x, y) {
                    self.board.selected_status = status.index();
                    self.board.move_selection(0);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.drag.is_none() {
                    if let Some((id, origin)) = self.pressed.take() {
                        self.drag = Some(DragState::pick_up(id, origin));
                        self.notice = None;
                        self.mode = Mode::Drag;
                    }
                }
                let hover = self.layout.column_at(x, y);
                if let Some(drag) = self.drag.as_mut() {
                    drag.hover(hover);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.pressed = None;
                if self.mode == Mode::Drag {
                    if let Some(mut drag) = self.drag.take() {
                        drag.hover(self.layout.column_at(x, y));
                        self.finish_drop(drag.release()).await;
                    }
                }
            }
            MouseEventKind::ScrollUp => self.board.move_selection(-1),
            MouseEventKind::ScrollDown => self.board.move_selection(1),
            _ => {}
        }
    }

    async fn finish_drop(&mut self, intent: DropIntent) {
        self.mode = Mode::Normal;
        match self.board.drop_task(&intent.task_id, intent.target).await {
            Ok(true) => {
                if let Some(target) = intent.target {
                    self.info(format!("Moved to {}", target.title()));
                }
            }
            Ok(false) => {}
            Err(err) => self.error(err),
        }
    }

    fn selected_id(&self) -> Option<String> {
        self.board.selected().map(|t| t.id.clone())
    }

    fn list_offsets(&self) -> [usize; 3] {
        [
            self.list_states[0].offset(),
            self.list_states[1].offset(),
            self.list_states[2].offset(),
        ]
    }

    fn report(&mut self, result: Result<(), StoreError>, success: Option<&str>) {
        match result {
            Ok(()) => {
                if let Some(message) = success {
                    self.info(message);
                }
            }
            Err(err) => self.error(err),
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        });
    }

    fn error(&mut self, err: StoreError) {
        tracing::error!(error = %err, "store operation failed");
        self.notice = Some(Notice {
            level: NoticeLevel::Error,
            message: err.to_string(),
        });
    }
}

/// Poll for events with timeout
fn poll_event(timeout: Duration) -> io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    // Give the shell back before the panic message is printed.
    logging::chain_panic_hook(|_| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    });

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

pub async fn run_app<S: TaskStore, B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    app.reload().await;
    while !app.should_quit() {
        terminal.draw(|f| ui::render(f, app))?;
        if let Some(event) = poll_event(Duration::from_millis(250))? {
            app.handle_event(event).await;
        }
    }
    Ok(())
}

/// Open the board on `store` and run until the user quits.
pub async fn run<S: TaskStore>(store: S) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut app = App::new(KanbanBoard::new(store));

    let result = run_app(&mut terminal, &mut app).await;
    restore_terminal(&mut terminal)?;
    result
}
